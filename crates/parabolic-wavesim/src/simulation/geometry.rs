//! Parabolic reflector geometry.
//!
//! A reflector is the parabola `y = a(x - x0)^2 + y0` with `a = ±1/(4f)`,
//! limited to `|x - x0| <= diameter / 2`. The geometry is only consulted
//! while classifying cells; it is never evaluated per time step.

use crate::error::{Result, WaveSimError};

use super::config::Point2D;

/// Magnitude below which a normal is returned unnormalized.
const NORMAL_EPSILON: f64 = 1e-10;

/// Which way the concave side of a parabola faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opening {
    /// Bowl shape, concave side above the curve.
    Upward,
    /// Umbrella shape, concave side below the curve.
    Downward,
}

/// A parabolic reflector.
#[derive(Debug, Clone, PartialEq)]
pub struct Parabola {
    diameter: f64,
    focal_length: f64,
    vertex: Point2D,
    opening: Opening,
    coefficient: f64,
}

impl Parabola {
    /// Create a parabola from its vertex, focal length, opening and aperture.
    ///
    /// Rejects non-positive or non-finite focal lengths and diameters.
    pub fn new(diameter: f64, focal_length: f64, vertex: Point2D, opening: Opening) -> Result<Self> {
        if !focal_length.is_finite() || focal_length <= 0.0 {
            return Err(WaveSimError::invalid_geometry(format!(
                "focal length must be positive, got {focal_length}"
            )));
        }
        if !diameter.is_finite() || diameter <= 0.0 {
            return Err(WaveSimError::invalid_geometry(format!(
                "diameter must be positive, got {diameter}"
            )));
        }
        if !vertex.x.is_finite() || !vertex.y.is_finite() {
            return Err(WaveSimError::invalid_geometry("vertex must be finite"));
        }

        let magnitude = 1.0 / (4.0 * focal_length);
        let coefficient = match opening {
            Opening::Upward => magnitude,
            Opening::Downward => -magnitude,
        };

        Ok(Self {
            diameter,
            focal_length,
            vertex,
            opening,
            coefficient,
        })
    }

    /// Aperture width.
    pub fn diameter(&self) -> f64 {
        self.diameter
    }

    /// Distance from vertex to focus.
    pub fn focal_length(&self) -> f64 {
        self.focal_length
    }

    /// Vertex point.
    pub fn vertex(&self) -> Point2D {
        self.vertex
    }

    /// Opening direction.
    pub fn opening(&self) -> Opening {
        self.opening
    }

    /// Curvature coefficient `a`.
    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }

    /// Focus point of the parabola.
    pub fn focus(&self) -> Point2D {
        let offset = match self.opening {
            Opening::Upward => self.focal_length,
            Opening::Downward => -self.focal_length,
        };
        Point2D::new(self.vertex.x, self.vertex.y + offset)
    }

    /// Surface height at `x`. Callers enforce the aperture.
    #[inline]
    pub fn evaluate(&self, x: f64) -> f64 {
        let dx = x - self.vertex.x;
        self.coefficient * dx * dx + self.vertex.y
    }

    /// Tangent slope `dy/dx` at `x`.
    #[inline]
    pub fn slope(&self, x: f64) -> f64 {
        2.0 * self.coefficient * (x - self.vertex.x)
    }

    /// Unit normal at `x`: the tangent `(1, slope)` rotated by 90 degrees.
    pub fn normal(&self, x: f64) -> Point2D {
        let slope = self.slope(x);
        let rotated = Point2D::new(-slope, 1.0);
        let magnitude = rotated.length();
        if magnitude < NORMAL_EPSILON {
            return Point2D::new(1.0, slope);
        }
        Point2D::new(rotated.x / magnitude, rotated.y / magnitude)
    }

    /// Mirror `incoming` about the surface normal at `x`: `I - 2(I.N)N`.
    pub fn reflect(&self, x: f64, incoming: Point2D) -> Point2D {
        let normal = self.normal(x);
        let d = incoming.dot(&normal);
        Point2D::new(incoming.x - 2.0 * d * normal.x, incoming.y - 2.0 * d * normal.y)
    }

    /// True if `x` lies within the aperture.
    #[inline]
    pub fn spans(&self, x: f64) -> bool {
        (x - self.vertex.x).abs() <= self.diameter / 2.0
    }

    /// True if `point` is within the aperture and on the concave side of the
    /// surface (surface included).
    pub fn encloses(&self, point: Point2D) -> bool {
        if !self.spans(point.x) {
            return false;
        }
        let surface = self.evaluate(point.x);
        match self.opening {
            Opening::Upward => point.y >= surface,
            Opening::Downward => point.y <= surface,
        }
    }

    /// True if `point` is within the aperture, strictly behind the surface and
    /// no further than `thickness` from it, measured along y.
    pub fn shell_contains(&self, point: Point2D, thickness: f64) -> bool {
        if !self.spans(point.x) {
            return false;
        }
        let surface = self.evaluate(point.x);
        let behind = match self.opening {
            Opening::Upward => surface - point.y,
            Opening::Downward => point.y - surface,
        };
        behind > 0.0 && behind <= thickness
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn umbrella() -> Parabola {
        Parabola::new(508.0, 100.0, Point2D::new(0.0, 100.0), Opening::Downward).unwrap()
    }

    fn bowl() -> Parabola {
        Parabola::new(200.0, 50.0, Point2D::new(0.0, -50.0), Opening::Upward).unwrap()
    }

    #[test]
    fn test_coefficient_sign() {
        assert!((umbrella().coefficient() + 1.0 / 400.0).abs() < 1e-15);
        assert!((bowl().coefficient() - 1.0 / 200.0).abs() < 1e-15);
    }

    #[test]
    fn test_evaluate() {
        let outer = umbrella();
        assert_eq!(outer.evaluate(0.0), 100.0);
        assert!((outer.evaluate(200.0) - 0.0).abs() < 1e-12);

        let inner = bowl();
        assert_eq!(inner.evaluate(0.0), -50.0);
        assert!((inner.evaluate(100.0) - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_confocal_focus() {
        assert_eq!(umbrella().focus(), Point2D::origin());
        assert_eq!(bowl().focus(), Point2D::origin());
    }

    #[test]
    fn test_normal_is_unit_and_perpendicular() {
        let p = bowl();
        for x in [-80.0, -10.0, 0.0, 35.0, 90.0] {
            let n = p.normal(x);
            assert!((n.length() - 1.0).abs() < 1e-12);
            let tangent = Point2D::new(1.0, p.slope(x));
            assert!(n.dot(&tangent).abs() < 1e-12);
        }
        assert_eq!(p.normal(0.0), Point2D::new(0.0, 1.0));
    }

    #[test]
    fn test_reflect_vertical_ray_through_focus() {
        // A ray travelling straight down onto the bowl reflects towards the focus.
        let p = bowl();
        let x = 60.0;
        let hit = Point2D::new(x, p.evaluate(x));
        let reflected = p.reflect(x, Point2D::new(0.0, -1.0));
        let to_focus = Point2D::new(p.focus().x - hit.x, p.focus().y - hit.y);
        let cross = reflected.x * to_focus.y - reflected.y * to_focus.x;
        assert!(cross.abs() < 1e-9);
        assert!(reflected.dot(&to_focus) > 0.0);
    }

    #[test]
    fn test_encloses_and_spans() {
        let outer = umbrella();
        assert!(outer.encloses(Point2D::new(0.0, 90.0)));
        assert!(outer.encloses(Point2D::new(0.0, 100.0)));
        assert!(!outer.encloses(Point2D::new(0.0, 101.0)));
        assert!(!outer.encloses(Point2D::new(255.0, -100.0)));

        let inner = bowl();
        assert!(inner.encloses(Point2D::new(0.0, 0.0)));
        assert!(!inner.encloses(Point2D::new(0.0, -60.0)));
        assert!(!inner.spans(100.5));
    }

    #[test]
    fn test_shell_lies_behind_surface() {
        let outer = umbrella();
        assert!(!outer.shell_contains(Point2D::new(0.0, 100.0), 40.0));
        assert!(outer.shell_contains(Point2D::new(0.0, 120.0), 40.0));
        assert!(outer.shell_contains(Point2D::new(0.0, 140.0), 40.0));
        assert!(!outer.shell_contains(Point2D::new(0.0, 141.0), 40.0));
        assert!(!outer.shell_contains(Point2D::new(0.0, 90.0), 40.0));

        let inner = bowl();
        assert!(inner.shell_contains(Point2D::new(0.0, -70.0), 40.0));
        assert!(!inner.shell_contains(Point2D::new(0.0, -40.0), 40.0));
    }

    #[test]
    fn test_rejects_malformed() {
        let v = Point2D::origin();
        assert!(Parabola::new(100.0, 0.0, v, Opening::Upward).is_err());
        assert!(Parabola::new(100.0, -5.0, v, Opening::Upward).is_err());
        assert!(Parabola::new(0.0, 5.0, v, Opening::Upward).is_err());
        assert!(Parabola::new(100.0, f64::NAN, v, Opening::Upward).is_err());
    }
}
