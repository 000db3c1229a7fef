use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stores in radians. Not normalized; call `normalized_radians` when a canonical range matters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Angle(f64);

impl Angle {
    pub const ZERO: Angle = Angle(0.0);

    pub fn new(rads: f64) -> Angle {
        Angle(rads)
    }

    pub fn degrees(degs: f64) -> Angle {
        Angle(degs.to_radians())
    }

    pub fn radians(self) -> f64 {
        self.0
    }

    pub fn opposite(self) -> Angle {
        Angle(self.0 + PI)
    }

    pub fn rotate_degs(self, degrees: f64) -> Angle {
        Angle(self.0 + degrees.to_radians())
    }

    pub fn rotate_rads(self, rads: f64) -> Angle {
        Angle(self.0 + rads)
    }

    /// In [0, 2pi)
    pub fn normalized_radians(self) -> f64 {
        let rads = self.0.rem_euclid(2.0 * PI);
        // rem_euclid can round up to exactly 2pi
        if rads >= 2.0 * PI {
            0.0
        } else {
            rads
        }
    }

    pub fn normalized_degrees(self) -> f64 {
        self.normalized_radians().to_degrees()
    }

    /// The signed rotation in (-pi, pi] that turns this angle into `other`. Positive is
    /// counter-clockwise.
    pub fn shortest_rotation_towards(self, other: Angle) -> f64 {
        let diff = (other.0 - self.0).rem_euclid(2.0 * PI);
        if diff > PI {
            diff - 2.0 * PI
        } else {
            diff
        }
    }

    pub fn approx_eq(self, other: Angle, within_degrees: f64) -> bool {
        self.shortest_rotation_towards(other).abs().to_degrees() <= within_degrees
    }

    /// Unit vector pointing this way
    pub fn direction(self) -> (f64, f64) {
        (self.0.cos(), self.0.sin())
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Angle({} degrees)", self.normalized_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortest_rotation() {
        let a = Angle::degrees(350.0);
        let b = Angle::degrees(10.0);
        assert!((a.shortest_rotation_towards(b).to_degrees() - 20.0).abs() < 1e-9);
        assert!((b.shortest_rotation_towards(a).to_degrees() + 20.0).abs() < 1e-9);
        assert!(Angle::degrees(-90.0).approx_eq(Angle::degrees(270.0), 1e-6));
    }

    #[test]
    fn normalized() {
        assert!((Angle::degrees(-90.0).normalized_degrees() - 270.0).abs() < 1e-9);
        assert!((Angle::degrees(720.0).normalized_degrees()).abs() < 1e-9);
    }
}
