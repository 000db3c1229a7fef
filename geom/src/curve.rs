use serde::{Deserialize, Serialize};

use crate::{Angle, GeometryError, Pt2D, ARC_EPSILON_CURVATURE, EPSILON_DIST};

/// How the parameter `p` of a ParamPoly3 relates to the arc-length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamRange {
    /// p runs over [0, length]
    ArcLength,
    /// p runs over [0, 1]
    Normalized,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CurveKind {
    Line,
    /// Constant curvature; positive turns left.
    Arc { curvature: f64 },
    /// Euler spiral (clothoid), with curvature changing linearly over the length.
    Spiral { curv_start: f64, curv_end: f64 },
    /// Lateral offset `v = a + b*u + c*u^2 + d*u^3` in the local frame. `u` is approximated by
    /// the arc-length travelled.
    Poly3 { a: f64, b: f64, c: f64, d: f64 },
    ParamPoly3 {
        au: f64,
        bu: f64,
        cu: f64,
        du: f64,
        av: f64,
        bv: f64,
        cv: f64,
        dv: f64,
        p_range: ParamRange,
    },
}

impl CurveKind {
    pub fn name(&self) -> &'static str {
        match self {
            CurveKind::Line => "line",
            CurveKind::Arc { .. } => "arc",
            CurveKind::Spiral { .. } => "spiral",
            CurveKind::Poly3 { .. } => "poly3",
            CurveKind::ParamPoly3 { .. } => "paramPoly3",
        }
    }
}

/// A position on a curve, with the direction of travel there.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub pt: Pt2D,
    pub heading: Angle,
}

/// One analytic geometry block of a plan view, valid over `[s, s + length]`. Immutable once
/// built; `cut` and `with_start_s` return new primitives.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurvePrimitive {
    s: f64,
    start: Pt2D,
    hdg: f64,
    length: f64,
    kind: CurveKind,
}

impl CurvePrimitive {
    pub fn new(
        s: f64,
        start: Pt2D,
        hdg: f64,
        length: f64,
        kind: CurveKind,
    ) -> Result<CurvePrimitive, GeometryError> {
        if !length.is_finite() || length < 0.0 {
            return Err(GeometryError::Degenerate(format!(
                "{} primitive with length {}",
                kind.name(),
                length
            )));
        }
        if !s.is_finite() || !hdg.is_finite() {
            return Err(GeometryError::Degenerate(format!(
                "{} primitive at s = {}, hdg = {}",
                kind.name(),
                s,
                hdg
            )));
        }
        Ok(CurvePrimitive {
            s,
            start,
            hdg,
            length,
            kind,
        })
    }

    pub fn line(s: f64, start: Pt2D, hdg: f64, length: f64) -> Result<CurvePrimitive, GeometryError> {
        CurvePrimitive::new(s, start, hdg, length, CurveKind::Line)
    }

    pub fn arc(
        s: f64,
        start: Pt2D,
        hdg: f64,
        length: f64,
        curvature: f64,
    ) -> Result<CurvePrimitive, GeometryError> {
        CurvePrimitive::new(s, start, hdg, length, CurveKind::Arc { curvature })
    }

    pub fn spiral(
        s: f64,
        start: Pt2D,
        hdg: f64,
        length: f64,
        curv_start: f64,
        curv_end: f64,
    ) -> Result<CurvePrimitive, GeometryError> {
        CurvePrimitive::new(
            s,
            start,
            hdg,
            length,
            CurveKind::Spiral {
                curv_start,
                curv_end,
            },
        )
    }

    pub fn s(&self) -> f64 {
        self.s
    }

    pub fn end_s(&self) -> f64 {
        self.s + self.length
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn start(&self) -> Pt2D {
        self.start
    }

    /// Heading at the start, in radians
    pub fn hdg(&self) -> f64 {
        self.hdg
    }

    pub fn kind(&self) -> &CurveKind {
        &self.kind
    }

    pub fn contains(&self, s: f64) -> bool {
        s >= self.s - EPSILON_DIST && s <= self.end_s() + EPSILON_DIST
    }

    /// The same curve, but starting at arc-length `s`.
    pub fn with_start_s(&self, s: f64) -> CurvePrimitive {
        let mut copy = self.clone();
        copy.s = s;
        copy
    }

    pub fn pose_at(&self, s: f64) -> Result<Pose, GeometryError> {
        if !self.contains(s) {
            return Err(GeometryError::OutOfRange {
                s,
                start: self.s,
                end: self.end_s(),
            });
        }
        Ok(self.pose_at_clamped(s))
    }

    /// Like `pose_at`, but clamps `s` into the primitive's domain.
    pub(crate) fn pose_at_clamped(&self, s: f64) -> Pose {
        self.pose_at_offset((s - self.s).clamp(0.0, self.length))
    }

    pub fn start_pose(&self) -> Pose {
        Pose {
            pt: self.start,
            heading: Angle::new(self.hdg),
        }
    }

    pub fn end_pose(&self) -> Pose {
        self.pose_at_offset(self.length)
    }

    // Caller guarantees 0 <= ds <= length
    fn pose_at_offset(&self, ds: f64) -> Pose {
        let (u, v, dh) = self.local(ds);
        let (sin, cos) = self.hdg.sin_cos();
        Pose {
            pt: Pt2D::new(
                self.start.x() + u * cos - v * sin,
                self.start.y() + u * sin + v * cos,
            ),
            heading: Angle::new(self.hdg + dh),
        }
    }

    /// Position and heading change in the primitive's local frame, where the start is the origin
    /// and the start heading points along +u.
    fn local(&self, ds: f64) -> (f64, f64, f64) {
        match self.kind {
            CurveKind::Line => (ds, 0.0, 0.0),
            CurveKind::Arc { curvature } => {
                let k = effective_curvature(curvature);
                let theta = k * ds;
                // The chord is stable even for nearly straight arcs, unlike sin(theta) / k.
                let chord = 2.0 * (theta / 2.0).sin() / k;
                let (sin, cos) = (theta / 2.0).sin_cos();
                (chord * cos, chord * sin, theta)
            }
            CurveKind::Spiral {
                curv_start,
                curv_end,
            } => spiral_local(ds, curv_start, curv_end, self.length),
            CurveKind::Poly3 { a, b, c, d } => {
                let v = a + b * ds + c * ds * ds + d * ds * ds * ds;
                let dv = b + 2.0 * c * ds + 3.0 * d * ds * ds;
                (ds, v, dv.atan())
            }
            CurveKind::ParamPoly3 {
                au,
                bu,
                cu,
                du,
                av,
                bv,
                cv,
                dv,
                p_range,
            } => {
                let p = match p_range {
                    ParamRange::ArcLength => ds,
                    ParamRange::Normalized => {
                        if self.length > 0.0 {
                            ds / self.length
                        } else {
                            0.0
                        }
                    }
                };
                let u = au + bu * p + cu * p * p + du * p * p * p;
                let v = av + bv * p + cv * p * p + dv * p * p * p;
                let du_dp = bu + 2.0 * cu * p + 3.0 * du * p * p;
                let dv_dp = bv + 2.0 * cv * p + 3.0 * dv * p * p;
                let dh = if du_dp == 0.0 && dv_dp == 0.0 {
                    0.0
                } else {
                    dv_dp.atan2(du_dp)
                };
                (u, v, dh)
            }
        }
    }

    /// Splits into `[start, s]` and `[s, end]`. Only lines and arcs can be cut exactly; `s` must
    /// be strictly inside the primitive.
    pub fn cut(&self, s: f64) -> Result<(CurvePrimitive, CurvePrimitive), GeometryError> {
        let ds = s - self.s;
        if ds <= EPSILON_DIST || ds >= self.length - EPSILON_DIST {
            return Err(GeometryError::OutOfRange {
                s,
                start: self.s,
                end: self.end_s(),
            });
        }
        match self.kind {
            CurveKind::Line | CurveKind::Arc { .. } => {}
            _ => {
                return Err(GeometryError::UnsupportedCut {
                    kind: self.kind.name(),
                });
            }
        }

        let mid = self.pose_at_offset(ds);
        let first = CurvePrimitive {
            s: self.s,
            start: self.start,
            hdg: self.hdg,
            length: ds,
            kind: self.kind.clone(),
        };
        let second = CurvePrimitive {
            s,
            start: mid.pt,
            hdg: mid.heading.radians(),
            length: self.length - ds,
            kind: self.kind.clone(),
        };
        Ok((first, second))
    }
}

fn effective_curvature(curvature: f64) -> f64 {
    if curvature == 0.0 {
        ARC_EPSILON_CURVATURE
    } else {
        curvature
    }
}

// Heading along a clothoid is quadratic in the distance travelled; integrate cos/sin of it with
// composite Simpson.
fn spiral_local(ds: f64, curv_start: f64, curv_end: f64, length: f64) -> (f64, f64, f64) {
    let rate = if length > 0.0 {
        (curv_end - curv_start) / length
    } else {
        0.0
    };
    let theta = |t: f64| curv_start * t + 0.5 * rate * t * t;
    if ds <= 0.0 {
        return (0.0, 0.0, 0.0);
    }

    let mut steps = ((ds / 0.25).ceil() as usize).clamp(16, 4096);
    if steps % 2 == 1 {
        steps += 1;
    }
    let h = ds / steps as f64;
    let mut sum_u = 0.0;
    let mut sum_v = 0.0;
    for i in 0..=steps {
        let weight = if i == 0 || i == steps {
            1.0
        } else if i % 2 == 1 {
            4.0
        } else {
            2.0
        };
        let (sin, cos) = theta(h * i as f64).sin_cos();
        sum_u += weight * cos;
        sum_v += weight * sin;
    }
    (sum_u * h / 3.0, sum_v * h / 3.0, theta(ds))
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use super::*;

    fn assert_pose_eq(a: Pose, b: Pose) {
        assert!(a.pt.approx_eq(b.pt, 1e-6), "{} vs {}", a.pt, b.pt);
        assert!(
            a.heading.approx_eq(b.heading, 1e-6_f64.to_degrees()),
            "{} vs {}",
            a.heading,
            b.heading
        );
    }

    #[test]
    fn quarter_circle() {
        let radius = 10.0;
        let arc = CurvePrimitive::arc(0.0, Pt2D::new(0.0, 0.0), 0.0, PI * radius / 2.0, 0.1)
            .unwrap();
        let end = arc.end_pose();
        assert!(end.pt.approx_eq(Pt2D::new(10.0, 10.0), 1e-6));
        assert!(end.heading.approx_eq(Angle::degrees(90.0), 1e-6));
    }

    #[test]
    fn zero_curvature_arc_is_a_line() {
        let arc = CurvePrimitive::arc(0.0, Pt2D::new(1.0, 1.0), PI / 2.0, 50.0, 0.0).unwrap();
        let line = CurvePrimitive::line(0.0, Pt2D::new(1.0, 1.0), PI / 2.0, 50.0).unwrap();
        for s in [0.0, 12.5, 49.0, 50.0] {
            assert_pose_eq(arc.pose_at(s).unwrap(), line.pose_at(s).unwrap());
        }
    }

    #[test]
    fn cut_reproduces_line_and_arc() {
        let prims = vec![
            CurvePrimitive::line(5.0, Pt2D::new(3.0, -2.0), 0.7, 40.0).unwrap(),
            CurvePrimitive::arc(5.0, Pt2D::new(3.0, -2.0), 0.7, 40.0, -0.03).unwrap(),
            CurvePrimitive::arc(5.0, Pt2D::new(3.0, -2.0), 2.0, 40.0, 0.0).unwrap(),
        ];
        for prim in prims {
            for cut_at in [5.5, 17.0, 44.0] {
                let (first, second) = prim.cut(cut_at).unwrap();
                assert!((first.length() + second.length() - prim.length()).abs() < 1e-9);
                assert_pose_eq(first.end_pose(), second.start_pose());
                let mut s = prim.s();
                while s <= prim.end_s() {
                    let piece = if s <= cut_at { &first } else { &second };
                    assert_pose_eq(piece.pose_at(s).unwrap(), prim.pose_at(s).unwrap());
                    s += 0.5;
                }
            }
        }
    }

    #[test]
    fn cut_rejections() {
        let line = CurvePrimitive::line(0.0, Pt2D::new(0.0, 0.0), 0.0, 10.0).unwrap();
        assert!(matches!(
            line.cut(10.0),
            Err(GeometryError::OutOfRange { .. })
        ));
        assert!(matches!(line.cut(-1.0), Err(GeometryError::OutOfRange { .. })));

        let spiral =
            CurvePrimitive::spiral(0.0, Pt2D::new(0.0, 0.0), 0.0, 10.0, 0.0, 0.1).unwrap();
        assert_eq!(
            spiral.cut(5.0),
            Err(GeometryError::UnsupportedCut { kind: "spiral" })
        );
    }

    #[test]
    fn spiral_matches_arc_when_curvature_constant() {
        let spiral =
            CurvePrimitive::spiral(0.0, Pt2D::new(0.0, 0.0), 0.3, 30.0, 0.05, 0.05).unwrap();
        let arc = CurvePrimitive::arc(0.0, Pt2D::new(0.0, 0.0), 0.3, 30.0, 0.05).unwrap();
        for s in [0.0, 7.0, 19.5, 30.0] {
            assert_pose_eq(spiral.pose_at(s).unwrap(), arc.pose_at(s).unwrap());
        }
    }

    #[test]
    fn spiral_heading_is_continuous() {
        let spiral =
            CurvePrimitive::spiral(0.0, Pt2D::new(0.0, 0.0), 0.0, 20.0, 0.0, 0.2).unwrap();
        // Final heading is the integral of a linear curvature ramp
        assert!((spiral.end_pose().heading.radians() - 2.0).abs() < 1e-9);
        let mut prev = spiral.pose_at(0.0).unwrap();
        let mut s = 0.1;
        while s <= 20.0 {
            let next = spiral.pose_at(s).unwrap();
            assert!(next.pt.dist_to(prev.pt) <= 0.1 + 1e-6);
            prev = next;
            s += 0.1;
        }
    }

    #[test]
    fn param_poly3_normalized() {
        // A straight line of length 10 expressed as a parametric cubic
        let prim = CurvePrimitive::new(
            0.0,
            Pt2D::new(1.0, 2.0),
            PI / 2.0,
            10.0,
            CurveKind::ParamPoly3 {
                au: 0.0,
                bu: 10.0,
                cu: 0.0,
                du: 0.0,
                av: 0.0,
                bv: 0.0,
                cv: 0.0,
                dv: 0.0,
                p_range: ParamRange::Normalized,
            },
        )
        .unwrap();
        let end = prim.end_pose();
        assert!(end.pt.approx_eq(Pt2D::new(1.0, 12.0), 1e-6));
        assert!(end.heading.approx_eq(Angle::degrees(90.0), 1e-6));
    }

    #[test]
    fn pose_out_of_range() {
        let line = CurvePrimitive::line(10.0, Pt2D::new(0.0, 0.0), 0.0, 10.0).unwrap();
        assert!(line.pose_at(9.0).is_err());
        assert!(line.pose_at(20.0).is_ok());
        assert!(CurvePrimitive::line(0.0, Pt2D::new(0.0, 0.0), 0.0, -1.0).is_err());
    }
}
