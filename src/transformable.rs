use std::f32::consts::{PI, TAU};

use crate::nodes::Point;
use crate::transform::Transform;

/// Local placement of a node relative to its parent.
///
/// The origin is the pivot for rotation and scale and is expressed in the
/// node's own coordinates, so a node with origin `(w/2, h/2)` rotates about
/// its middle and is positioned by its middle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transformable {
    position: Point,
    origin: Point,
    scale: (f32, f32),
    rotation: f32,
}

impl Transformable {
    pub fn new() -> Self {
        Self {
            position: Point::ZERO,
            origin: Point::ZERO,
            scale: (1.0, 1.0),
            rotation: 0.0,
        }
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn set_origin(&mut self, origin: Point) {
        self.origin = origin;
    }

    pub fn scale(&self) -> (f32, f32) {
        self.scale
    }

    pub fn set_scale(&mut self, sx: f32, sy: f32) {
        self.scale = (sx, sy);
    }

    /// Rotation in radians, normalized to `(-π, π]`.
    pub fn rotation(&self) -> f32 {
        let rotation = self.rotation.rem_euclid(TAU);
        if rotation > PI {
            rotation - TAU
        } else {
            rotation
        }
    }

    pub fn set_rotation(&mut self, radians: f32) {
        self.rotation = radians;
    }

    /// The local transform: `translate(position) * rotate * scale * translate(-origin)`.
    pub fn transform(&self) -> Transform {
        Transform::translate(self.position.x, self.position.y)
            .then(&Transform::rotate(self.rotation))
            .then(&Transform::scale_xy(self.scale.0, self.scale.1))
            .then(&Transform::translate(-self.origin.x, -self.origin.y))
    }
}

impl Default for Transformable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_default_is_identity() {
        assert!(Transformable::new().transform().is_identity());
    }

    #[test]
    fn test_origin_is_pivot() {
        let mut t = Transformable::new();
        t.set_origin(Point::new(50.0, 25.0));
        t.set_position(Point::new(200.0, 100.0));
        t.set_scale(2.0, 2.0);

        // The origin lands exactly on the position regardless of scale.
        let p = t.transform().transform_point(Point::new(50.0, 25.0));
        assert!(approx_eq(p.x, 200.0));
        assert!(approx_eq(p.y, 100.0));

        let corner = t.transform().transform_point(Point::new(0.0, 0.0));
        assert!(approx_eq(corner.x, 100.0));
        assert!(approx_eq(corner.y, 50.0));
    }

    #[test]
    fn test_rotation_normalized() {
        let mut t = Transformable::new();
        t.set_rotation(1.5 * PI);
        assert!(approx_eq(t.rotation(), -0.5 * PI));

        t.set_rotation(PI);
        assert!(approx_eq(t.rotation(), PI));

        t.set_rotation(-0.5 * PI);
        assert!(approx_eq(t.rotation(), -0.5 * PI));

        t.set_rotation(0.25);
        assert!(approx_eq(t.rotation(), 0.25));
    }
}
