//! Material classification of grid cells.
//!
//! Every cell is assigned one of three materials once, from its own
//! coordinates only, so classification is order independent and runs
//! row-parallel.

use rayon::prelude::*;

use crate::error::{Result, WaveSimError};

use super::config::{constants, GridConfig};
use super::geometry::Parabola;

/// Material occupying a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum MaterialType {
    /// Ambient medium in the cavity between the reflectors.
    #[default]
    OpenMedium = 0,
    /// Reflector body, propagates faster than ambient.
    ShellMedium = 1,
    /// Hard node, held at zero displacement and velocity.
    Rigid = 2,
}

impl MaterialType {
    /// All material types.
    pub const ALL: [MaterialType; 3] = [
        MaterialType::OpenMedium,
        MaterialType::ShellMedium,
        MaterialType::Rigid,
    ];

    /// True for cells that propagate waves.
    #[inline]
    pub fn propagates(self) -> bool {
        self != MaterialType::Rigid
    }
}

/// How the shell propagation speed is derived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShellSpeed {
    /// Fixed speed in mm/s.
    Fixed(f64),
    /// Ambient speed scaled by a factor.
    AmbientRatio(f64),
}

impl Default for ShellSpeed {
    fn default() -> Self {
        ShellSpeed::Fixed(constants::SHELL_SPEED)
    }
}

impl ShellSpeed {
    /// Resolve to a speed given the ambient speed.
    pub fn resolve(self, ambient_speed: f64) -> f64 {
        match self {
            ShellSpeed::Fixed(speed) => speed,
            ShellSpeed::AmbientRatio(ratio) => ambient_speed * ratio,
        }
    }
}

/// Reflector body properties used during classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaConfig {
    /// Shell band thickness behind each reflecting surface (mm).
    pub shell_thickness: f64,
    /// Shell propagation speed model.
    pub shell_speed: ShellSpeed,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            shell_thickness: constants::SHELL_THICKNESS,
            shell_speed: ShellSpeed::default(),
        }
    }
}

impl MediaConfig {
    /// Speed table for the given ambient speed.
    pub fn speeds(&self, ambient_speed: f64) -> MediumSpeeds {
        MediumSpeeds::new(ambient_speed, self.shell_speed.resolve(ambient_speed))
    }
}

/// Propagation speed lookup per material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediumSpeeds {
    /// OPEN_MEDIUM speed (mm/s).
    pub open: f64,
    /// SHELL_MEDIUM speed (mm/s).
    pub shell: f64,
}

impl Default for MediumSpeeds {
    fn default() -> Self {
        Self::new(constants::AMBIENT_SPEED, constants::SHELL_SPEED)
    }
}

impl MediumSpeeds {
    pub fn new(open: f64, shell: f64) -> Self {
        Self { open, shell }
    }

    /// Speed for a material; zero for rigid cells.
    #[inline]
    pub fn speed(&self, material: MaterialType) -> f64 {
        match material {
            MaterialType::OpenMedium => self.open,
            MaterialType::ShellMedium => self.shell,
            MaterialType::Rigid => 0.0,
        }
    }

    /// Fastest propagation speed over all materials.
    pub fn fastest(&self) -> f64 {
        MaterialType::ALL
            .iter()
            .map(|&m| self.speed(m))
            .fold(0.0, f64::max)
    }
}

/// Per-cell material classification, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialMap {
    resolution: usize,
    cells: Vec<MaterialType>,
}

impl MaterialMap {
    /// Classify every cell of `config` against the two reflectors.
    ///
    /// A cell is OPEN_MEDIUM when it is inside both apertures and on the
    /// concave side of both surfaces, SHELL_MEDIUM when it lies in the band of
    /// `shell_thickness` behind either surface, and RIGID otherwise. Cells in
    /// the edge margin are RIGID regardless of geometry.
    pub fn classify(
        config: &GridConfig,
        outer: &Parabola,
        inner: &Parabola,
        shell_thickness: f64,
    ) -> Result<Self> {
        config.validate()?;
        if !shell_thickness.is_finite() || shell_thickness < 0.0 {
            return Err(WaveSimError::invalid_geometry(format!(
                "shell thickness must be non-negative, got {shell_thickness}"
            )));
        }

        let n = config.resolution;
        let mut cells = vec![MaterialType::Rigid; n * n];

        cells
            .par_chunks_mut(n)
            .enumerate()
            .for_each(|(row, row_cells)| {
                for (col, cell) in row_cells.iter_mut().enumerate() {
                    *cell = classify_cell(config, outer, inner, shell_thickness, row, col);
                }
            });

        Ok(Self {
            resolution: n,
            cells,
        })
    }

    /// Build a map directly from a cell vector (row-major, `resolution^2` long).
    pub fn from_cells(resolution: usize, cells: Vec<MaterialType>) -> Result<Self> {
        if cells.len() != resolution * resolution {
            return Err(WaveSimError::invalid_grid(format!(
                "expected {} cells, got {}",
                resolution * resolution,
                cells.len()
            )));
        }
        Ok(Self { resolution, cells })
    }

    /// Cells per side.
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Material at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Option<MaterialType> {
        if row < self.resolution && col < self.resolution {
            Some(self.cells[row * self.resolution + col])
        } else {
            None
        }
    }

    /// Material at a linear index.
    #[inline(always)]
    pub fn at(&self, idx: usize) -> MaterialType {
        self.cells[idx]
    }

    /// All cells, row-major.
    pub fn as_slice(&self) -> &[MaterialType] {
        &self.cells
    }

    /// Number of cells of the given material.
    pub fn count(&self, material: MaterialType) -> usize {
        self.cells.iter().filter(|&&m| m == material).count()
    }

    /// True if any 4-neighbour of an interior cell has a different material.
    pub fn is_interface(&self, row: usize, col: usize) -> bool {
        let n = self.resolution;
        let idx = row * n + col;
        let own = self.cells[idx];
        (row > 0 && self.cells[idx - n] != own)
            || (row + 1 < n && self.cells[idx + n] != own)
            || (col > 0 && self.cells[idx - 1] != own)
            || (col + 1 < n && self.cells[idx + 1] != own)
    }
}

fn classify_cell(
    config: &GridConfig,
    outer: &Parabola,
    inner: &Parabola,
    shell_thickness: f64,
    row: usize,
    col: usize,
) -> MaterialType {
    if config.in_edge_margin(row, col) {
        return MaterialType::Rigid;
    }

    let point = config.coordinates(row, col);
    if outer.encloses(point) && inner.encloses(point) {
        MaterialType::OpenMedium
    } else if outer.shell_contains(point, shell_thickness)
        || inner.shell_contains(point, shell_thickness)
    {
        MaterialType::ShellMedium
    } else {
        MaterialType::Rigid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::config::Point2D;
    use crate::simulation::geometry::Opening;

    fn reflectors() -> (Parabola, Parabola) {
        let outer =
            Parabola::new(508.0, 100.0, Point2D::new(0.0, 100.0), Opening::Downward).unwrap();
        let inner = Parabola::new(200.0, 50.0, Point2D::new(0.0, -50.0), Opening::Upward).unwrap();
        (outer, inner)
    }

    fn canonical_map() -> (GridConfig, MaterialMap) {
        let config = GridConfig::default();
        let (outer, inner) = reflectors();
        let map = MaterialMap::classify(&config, &outer, &inner, 40.0).unwrap();
        (config, map)
    }

    #[test]
    fn test_cavity_point_is_open() {
        let (config, map) = canonical_map();
        let (row, col) = config.cell_of(Point2D::new(0.0, 90.0));
        assert_eq!(map.get(row, col), Some(MaterialType::OpenMedium));

        let (row, col) = config.cell_of(Point2D::origin());
        assert_eq!(map.get(row, col), Some(MaterialType::OpenMedium));
    }

    #[test]
    fn test_edge_margin_is_rigid() {
        let (_, map) = canonical_map();
        let n = map.resolution();
        for k in 0..n {
            assert_eq!(map.get(0, k), Some(MaterialType::Rigid));
            assert_eq!(map.get(4, k), Some(MaterialType::Rigid));
            assert_eq!(map.get(n - 1, k), Some(MaterialType::Rigid));
            assert_eq!(map.get(k, 0), Some(MaterialType::Rigid));
            assert_eq!(map.get(k, n - 5), Some(MaterialType::Rigid));
        }
    }

    #[test]
    fn test_shells_behind_both_reflectors() {
        let (config, map) = canonical_map();

        let (row, col) = config.cell_of(Point2D::new(0.0, 120.0));
        assert_eq!(map.get(row, col), Some(MaterialType::ShellMedium));

        let (row, col) = config.cell_of(Point2D::new(0.0, -70.0));
        assert_eq!(map.get(row, col), Some(MaterialType::ShellMedium));
    }

    #[test]
    fn test_exterior_is_rigid() {
        let (config, map) = canonical_map();

        // Beyond the outer shell
        let (row, col) = config.cell_of(Point2D::new(0.0, 145.0));
        assert_eq!(map.get(row, col), Some(MaterialType::Rigid));

        // Outside the inner aperture, below the outer shell
        let (row, col) = config.cell_of(Point2D::new(200.0, -60.0));
        assert_eq!(map.get(row, col), Some(MaterialType::Rigid));
    }

    #[test]
    fn test_all_materials_present() {
        let (_, map) = canonical_map();
        let total: usize = MaterialType::ALL.iter().map(|&m| map.count(m)).sum();
        assert_eq!(total, 300 * 300);
        for m in MaterialType::ALL {
            assert!(map.count(m) > 0, "{m:?} should occur in the canonical grid");
        }
    }

    #[test]
    fn test_classification_is_deterministic() {
        let (_, a) = canonical_map();
        let (_, b) = canonical_map();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_negative_thickness() {
        let (outer, inner) = reflectors();
        let result = MaterialMap::classify(&GridConfig::default(), &outer, &inner, -1.0);
        assert!(matches!(result, Err(WaveSimError::InvalidGeometry(_))));
    }

    #[test]
    fn test_speed_table() {
        let speeds = MediumSpeeds::default();
        assert_eq!(speeds.speed(MaterialType::OpenMedium), 343_000.0);
        assert_eq!(speeds.speed(MaterialType::ShellMedium), 1_500_000.0);
        assert_eq!(speeds.speed(MaterialType::Rigid), 0.0);
        assert_eq!(speeds.fastest(), 1_500_000.0);

        let slow_shell = MediumSpeeds::new(343_000.0, ShellSpeed::AmbientRatio(1e-3).resolve(343_000.0));
        assert!((slow_shell.shell - 343.0).abs() < 1e-9);
        assert_eq!(slow_shell.fastest(), 343_000.0);
    }

    #[test]
    fn test_interface_detection() {
        use MaterialType::*;
        #[rustfmt::skip]
        let cells = vec![
            Rigid, Rigid,      Rigid,      Rigid,
            Rigid, OpenMedium, OpenMedium, Rigid,
            Rigid, OpenMedium, OpenMedium, Rigid,
            Rigid, Rigid,      Rigid,      Rigid,
        ];
        let map = MaterialMap::from_cells(4, cells).unwrap();
        assert!(map.is_interface(1, 1));
        assert!(!map.is_interface(0, 0));
        assert!(MaterialMap::from_cells(3, vec![Rigid; 4]).is_err());
    }
}
