use serde::{Deserialize, Serialize};

use crate::{Angle, Bounds, CurvePrimitive, GeometryError, Pose, Pt2D, EPSILON_DIST};

const NEAREST_POINT_TOLERANCE: f64 = 1e-2;

/// The centerline of one road: contiguous curve primitives, starting at arc-length 0.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct ReferenceLine {
    primitives: Vec<CurvePrimitive>,
}

/// The result of projecting a point onto a reference line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NearestPoint {
    pub s: f64,
    /// Signed lateral offset. Positive means the point is to the left of the direction of travel.
    pub t: f64,
    pub heading: Angle,
    /// The projected point on the line
    pub pt: Pt2D,
}

impl ReferenceLine {
    pub fn new() -> ReferenceLine {
        ReferenceLine {
            primitives: Vec::new(),
        }
    }

    /// Chains the primitives one after another, ignoring their own starting arc-lengths.
    pub fn from_primitives(primitives: Vec<CurvePrimitive>) -> ReferenceLine {
        let mut line = ReferenceLine::new();
        for p in primitives {
            line.add_primitive(p);
        }
        line
    }

    /// Appends a primitive, shifting its starting arc-length to the current end of the line.
    pub fn add_primitive(&mut self, primitive: CurvePrimitive) {
        let s = self.total_length();
        self.primitives.push(primitive.with_start_s(s));
    }

    pub fn primitives(&self) -> &[CurvePrimitive] {
        &self.primitives
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn total_length(&self) -> f64 {
        self.primitives.iter().map(|p| p.length()).sum()
    }

    // A boundary shared by two primitives resolves to the later one.
    fn primitive_idx(&self, s: f64) -> Result<usize, GeometryError> {
        let idx = self
            .primitives
            .partition_point(|p| p.s() <= s + EPSILON_DIST);
        if idx == 0 {
            return Err(GeometryError::NotFound { s });
        }
        if self.primitives[idx - 1].contains(s) {
            Ok(idx - 1)
        } else {
            Err(GeometryError::NotFound { s })
        }
    }

    pub fn primitive_at(&self, s: f64) -> Result<&CurvePrimitive, GeometryError> {
        let idx = self.primitive_idx(s)?;
        Ok(&self.primitives[idx])
    }

    pub fn pose_at(&self, s: f64) -> Result<Pose, GeometryError> {
        self.primitive_at(s)?.pose_at(s)
    }

    pub fn position_at(&self, s: f64) -> Result<Pt2D, GeometryError> {
        Ok(self.pose_at(s)?.pt)
    }

    pub fn heading_at(&self, s: f64) -> Result<Angle, GeometryError> {
        Ok(self.pose_at(s)?.heading)
    }

    pub fn start_pose(&self) -> Result<Pose, GeometryError> {
        match self.primitives.first() {
            Some(p) => Ok(p.start_pose()),
            None => Err(GeometryError::NotFound { s: 0.0 }),
        }
    }

    pub fn end_pose(&self) -> Result<Pose, GeometryError> {
        match self.primitives.last() {
            Some(p) => Ok(p.end_pose()),
            None => Err(GeometryError::NotFound { s: 0.0 }),
        }
    }

    /// Splits into `[0, s]` and `[s, end]`. The trailing half starts over at arc-length 0. If `s`
    /// lands on the boundary between two primitives, they're partitioned without cutting either.
    pub fn cut(&self, s: f64) -> Result<(ReferenceLine, ReferenceLine), GeometryError> {
        let total = self.total_length();
        if s <= EPSILON_DIST || s >= total - EPSILON_DIST {
            return Err(GeometryError::OutOfRange {
                s,
                start: 0.0,
                end: total,
            });
        }
        let idx = self.primitive_idx(s)?;
        let owner = &self.primitives[idx];

        let mut lead: Vec<CurvePrimitive> = Vec::new();
        let mut trail: Vec<CurvePrimitive> = Vec::new();
        if (s - owner.s()).abs() <= EPSILON_DIST {
            lead.extend(self.primitives[..idx].iter().cloned());
            trail.extend(self.primitives[idx..].iter().cloned());
        } else if (owner.end_s() - s).abs() <= EPSILON_DIST {
            lead.extend(self.primitives[..=idx].iter().cloned());
            trail.extend(self.primitives[idx + 1..].iter().cloned());
        } else {
            let (first, second) = owner.cut(s)?;
            lead.extend(self.primitives[..idx].iter().cloned());
            lead.push(first);
            trail.push(second);
            trail.extend(self.primitives[idx + 1..].iter().cloned());
        }

        Ok((
            ReferenceLine { primitives: lead },
            ReferenceLine::from_primitives(trail),
        ))
    }

    /// The piece over `[start, end]`, starting over at arc-length 0. Ends of the line are taken
    /// without cutting.
    pub fn slice(&self, start: f64, end: f64) -> Result<ReferenceLine, GeometryError> {
        let total = self.total_length();
        if start < -EPSILON_DIST || end > total + EPSILON_DIST {
            return Err(GeometryError::OutOfRange {
                s: if start < 0.0 { start } else { end },
                start: 0.0,
                end: total,
            });
        }
        if end - start <= EPSILON_DIST {
            return Err(GeometryError::Degenerate(format!(
                "empty slice [{}, {}]",
                start, end
            )));
        }

        let mut line = self.clone();
        if end < total - EPSILON_DIST {
            line = line.cut(end)?.0;
        }
        if start > EPSILON_DIST {
            line = line.cut(start)?.1;
        }
        Ok(line)
    }

    /// Points every `step` along the line, always including the exact end. Pairs each point with
    /// its arc-length.
    pub fn sample(&self, step: f64) -> Vec<(Pt2D, f64)> {
        assert!(step > 0.0, "sampling step must be positive, not {}", step);
        let mut results = Vec::new();
        let last = match self.primitives.last() {
            Some(p) => p,
            None => {
                return results;
            }
        };
        let total = self.total_length();

        let mut idx = 0;
        let mut i = 0;
        loop {
            let s = (i as f64) * step;
            if s >= total - EPSILON_DIST {
                break;
            }
            while idx + 1 < self.primitives.len() && self.primitives[idx + 1].s() <= s {
                idx += 1;
            }
            results.push((self.primitives[idx].pose_at_clamped(s).pt, s));
            i += 1;
        }
        results.push((last.end_pose().pt, total));
        results
    }

    /// Projects a point onto the line. Each primitive is searched with a golden-section search,
    /// so this finds a local minimum per primitive; the best one wins.
    pub fn nearest_point(&self, pt: Pt2D) -> Result<NearestPoint, GeometryError> {
        if self.primitives.is_empty() {
            return Err(GeometryError::NotFound { s: 0.0 });
        }

        let mut best: Option<(f64, f64)> = None;
        for p in &self.primitives {
            let dist = |s: f64| p.pose_at_clamped(s).pt.dist_to(pt);
            let candidate = golden_section(p.s(), p.end_s(), &dist);
            for s in [p.s(), candidate, p.end_s()] {
                let d = dist(s);
                if best.map(|(_, best_d)| d < best_d).unwrap_or(true) {
                    best = Some((s, d));
                }
            }
        }
        let (s, dist) = best.ok_or(GeometryError::NotFound { s: 0.0 })?;

        let pose = self.pose_at(s)?;
        let (cos, sin) = pose.heading.direction();
        let dx = pt.x() - pose.pt.x();
        let dy = pt.y() - pose.pt.y();
        // The cross product of the heading and the vector to the point decides the side
        let cross = cos * dy - sin * dx;
        Ok(NearestPoint {
            s,
            t: dist.copysign(cross),
            heading: pose.heading,
            pt: pose.pt,
        })
    }

    pub fn bounds(&self) -> Bounds {
        let pts: Vec<Pt2D> = self.sample(1.0).into_iter().map(|(pt, _)| pt).collect();
        Bounds::from(&pts)
    }
}

fn golden_section<F: Fn(f64) -> f64>(mut lo: f64, mut hi: f64, f: &F) -> f64 {
    let ratio = (5.0_f64.sqrt() - 1.0) / 2.0;
    let mut x1 = hi - ratio * (hi - lo);
    let mut x2 = lo + ratio * (hi - lo);
    let mut f1 = f(x1);
    let mut f2 = f(x2);
    while hi - lo > NEAREST_POINT_TOLERANCE {
        if f1 < f2 {
            hi = x2;
            x2 = x1;
            f2 = f1;
            x1 = hi - ratio * (hi - lo);
            f1 = f(x1);
        } else {
            lo = x1;
            x1 = x2;
            f1 = f2;
            x2 = lo + ratio * (hi - lo);
            f2 = f(x2);
        }
    }
    (lo + hi) / 2.0
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;

    use super::*;

    // A straight stretch, a left-hand quarter circle of radius 10, and another straight stretch
    fn l_shape() -> ReferenceLine {
        let mut line = ReferenceLine::new();
        line.add_primitive(CurvePrimitive::line(0.0, Pt2D::new(0.0, 0.0), 0.0, 20.0).unwrap());
        line.add_primitive(
            CurvePrimitive::arc(0.0, Pt2D::new(20.0, 0.0), 0.0, PI * 5.0, 0.1).unwrap(),
        );
        line.add_primitive(
            CurvePrimitive::line(0.0, Pt2D::new(30.0, 10.0), PI / 2.0, 15.0).unwrap(),
        );
        line
    }

    #[test]
    fn total_length_is_sum_of_primitives() {
        let mut rng = XorShiftRng::seed_from_u64(42);
        let mut line = ReferenceLine::new();
        let mut expected = 0.0;
        for _ in 0..50 {
            let length = rng.gen_range(0.0..30.0);
            let prim = if rng.gen_bool(0.5) {
                CurvePrimitive::line(0.0, Pt2D::new(0.0, 0.0), 0.0, length).unwrap()
            } else {
                CurvePrimitive::arc(0.0, Pt2D::new(0.0, 0.0), 0.0, length, 0.05).unwrap()
            };
            line.add_primitive(prim);
            expected += length;
            assert!((line.total_length() - expected).abs() < 1e-9);
        }
        for pair in line.primitives().windows(2) {
            assert!((pair[0].end_s() - pair[1].s()).abs() < 1e-9);
        }
    }

    #[test]
    fn boundary_resolves_to_later_primitive() {
        let line = l_shape();
        assert_eq!(line.primitive_at(20.0).unwrap().s(), 20.0);
        assert_eq!(line.primitive_at(0.0).unwrap().s(), 0.0);
        assert!(line.primitive_at(line.total_length()).is_ok());
        assert!(matches!(
            line.primitive_at(line.total_length() + 1.0),
            Err(GeometryError::NotFound { .. })
        ));
        assert!(matches!(
            line.primitive_at(-1.0),
            Err(GeometryError::NotFound { .. })
        ));
    }

    #[test]
    fn cut_inside_arc() {
        let line = l_shape();
        let total = line.total_length();
        let cut_at = 25.0;
        let (lead, trail) = line.cut(cut_at).unwrap();
        assert!((lead.total_length() - cut_at).abs() < 1e-9);
        assert!((trail.total_length() - (total - cut_at)).abs() < 1e-9);
        assert_eq!(trail.primitives()[0].s(), 0.0);

        let mut s = 0.0;
        while s <= total {
            let expected = line.pose_at(s).unwrap();
            let actual = if s <= cut_at {
                lead.pose_at(s).unwrap()
            } else {
                trail.pose_at(s - cut_at).unwrap()
            };
            assert!(expected.pt.approx_eq(actual.pt, 1e-6));
            assert!(expected.heading.approx_eq(actual.heading, 1e-6));
            s += 0.25;
        }
    }

    #[test]
    fn cut_on_boundary_partitions() {
        let line = l_shape();
        let (lead, trail) = line.cut(20.0).unwrap();
        assert_eq!(lead.primitives().len(), 1);
        assert_eq!(trail.primitives().len(), 2);
        assert!(matches!(line.cut(0.0), Err(GeometryError::OutOfRange { .. })));
        assert!(matches!(
            line.cut(line.total_length()),
            Err(GeometryError::OutOfRange { .. })
        ));
    }

    #[test]
    fn slice_middle() {
        let line = l_shape();
        let piece = line.slice(10.0, 40.0).unwrap();
        assert!((piece.total_length() - 30.0).abs() < 1e-9);
        assert!(piece
            .start_pose()
            .unwrap()
            .pt
            .approx_eq(Pt2D::new(10.0, 0.0), 1e-9));
        let whole = line.slice(0.0, line.total_length()).unwrap();
        assert_eq!(whole, line);
    }

    #[test]
    fn sample_includes_end() {
        let line = l_shape();
        let samples = line.sample(1.0);
        let total = line.total_length();
        assert_eq!(samples[0].1, 0.0);
        assert_eq!(samples.last().unwrap().1, total);
        assert!(samples
            .last()
            .unwrap()
            .0
            .approx_eq(Pt2D::new(30.0, 25.0), 1e-6));
        for pair in samples.windows(2) {
            assert!(pair[1].1 > pair[0].1);
            assert!(pair[0].0.dist_to(pair[1].0) <= 1.0 + 1e-9);
        }
    }

    #[test]
    fn nearest_point_sign() {
        let line = l_shape();
        let left = line.nearest_point(Pt2D::new(5.0, 2.0)).unwrap();
        assert!((left.s - 5.0).abs() < 0.02);
        assert!((left.t - 2.0).abs() < 0.02);

        let right = line.nearest_point(Pt2D::new(5.0, -3.0)).unwrap();
        assert!((right.t + 3.0).abs() < 0.02);

        // Inside the curve is to the left, since it turns left
        let inner = line.nearest_point(Pt2D::new(25.0, 5.0)).unwrap();
        assert!(inner.t > 0.0);
        // Along the final leg, heading north, east is to the right
        let east = line.nearest_point(Pt2D::new(33.0, 20.0)).unwrap();
        assert!((east.t + 3.0).abs() < 0.02);
        assert!(east.heading.approx_eq(Angle::degrees(90.0), 0.1));
    }
}
