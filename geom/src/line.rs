use serde::{Deserialize, Serialize};

use crate::{Angle, Pt2D, EPSILON_DIST};

/// A line segment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Line(Pt2D, Pt2D);

impl Line {
    pub fn new(pt1: Pt2D, pt2: Pt2D) -> Line {
        Line(pt1, pt2)
    }

    pub fn pt1(self) -> Pt2D {
        self.0
    }

    pub fn pt2(self) -> Pt2D {
        self.1
    }

    pub fn length(self) -> f64 {
        self.0.dist_to(self.1)
    }

    pub fn angle(self) -> Angle {
        self.0.angle_to(self.1)
    }

    pub fn reverse(self) -> Line {
        Line(self.1, self.0)
    }

    /// Doesn't clamp to the segment; distances past either end extrapolate.
    pub fn unbounded_dist_along(self, dist: f64) -> Pt2D {
        let len = self.length();
        if len < EPSILON_DIST {
            return self.0;
        }
        let percent = dist / len;
        Pt2D::new(
            self.0.x() + percent * (self.1.x() - self.0.x()),
            self.0.y() + percent * (self.1.y() - self.0.y()),
        )
    }

    /// Positive when `pt` is to the left of the infinite line through this segment.
    pub fn signed_distance(self, pt: Pt2D) -> f64 {
        let len = self.length();
        if len < EPSILON_DIST {
            return self.0.dist_to(pt);
        }
        let (dx, dy) = (self.1.x() - self.0.x(), self.1.y() - self.0.y());
        (dx * (pt.y() - self.0.y()) - dy * (pt.x() - self.0.x())) / len
    }
}
