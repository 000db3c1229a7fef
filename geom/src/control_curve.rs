use serde::{Deserialize, Serialize};

use crate::{CurvePrimitive, GeometryError, Line, Pt2D, ReferenceLine, EPSILON_DIST};

// Control points closer than this are collapsed into one
const MIN_CONTROL_POINT_SPACING: f64 = 1e-6;
// Turns smaller than this (in radians) don't get a fillet
const MIN_TURN: f64 = 1e-6;

/// An editable polyline of control points. Interior corners are rounded off with circular
/// fillets, so the resulting reference line only has lines and arcs, and can always be cut.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlCurve {
    points: Vec<Pt2D>,
    corner_radius: f64,
}

impl ControlCurve {
    pub fn new(points: Vec<Pt2D>, corner_radius: f64) -> Result<ControlCurve, GeometryError> {
        let mut deduped: Vec<Pt2D> = Vec::with_capacity(points.len());
        for pt in points {
            if deduped
                .last()
                .map(|last| !last.approx_eq(pt, MIN_CONTROL_POINT_SPACING))
                .unwrap_or(true)
            {
                deduped.push(pt);
            }
        }
        if deduped.len() < 2 {
            return Err(GeometryError::Degenerate(format!(
                "need at least 2 distinct control points, got {}",
                deduped.len()
            )));
        }
        if !corner_radius.is_finite() || corner_radius < 0.0 {
            return Err(GeometryError::Degenerate(format!(
                "corner radius {}",
                corner_radius
            )));
        }
        Ok(ControlCurve {
            points: deduped,
            corner_radius,
        })
    }

    pub fn points(&self) -> &[Pt2D] {
        &self.points
    }

    pub fn corner_radius(&self) -> f64 {
        self.corner_radius
    }

    pub fn to_reference_line(&self) -> Result<ReferenceLine, GeometryError> {
        let legs: Vec<Line> = self
            .points
            .windows(2)
            .map(|pair| Line::new(pair[0], pair[1]))
            .collect();

        // How far back from each interior corner the fillet starts, and its signed turn
        let mut fillets: Vec<(f64, f64)> = Vec::new();
        for pair in legs.windows(2) {
            let (incoming, outgoing) = (pair[0], pair[1]);
            let turn = incoming.angle().shortest_rotation_towards(outgoing.angle());
            if turn.abs() > std::f64::consts::PI - MIN_TURN {
                return Err(GeometryError::Degenerate(format!(
                    "control curve doubles back on itself at {}",
                    incoming.pt2()
                )));
            }
            if turn.abs() < MIN_TURN || self.corner_radius == 0.0 {
                fillets.push((0.0, turn));
                continue;
            }
            let half_tan = (turn.abs() / 2.0).tan();
            let max_tangent = (incoming.length() / 2.0).min(outgoing.length() / 2.0);
            let tangent = (self.corner_radius * half_tan).min(max_tangent);
            fillets.push((tangent, turn));
        }

        let mut line = ReferenceLine::new();
        let mut cursor = self.points[0];
        for (idx, leg) in legs.iter().enumerate() {
            let angle = leg.angle();
            let leg_end = match fillets.get(idx) {
                Some((tangent, _)) => leg.pt2().project_away(-tangent, angle),
                None => leg.pt2(),
            };
            let straight = cursor.dist_to(leg_end);
            if straight > EPSILON_DIST {
                line.add_primitive(CurvePrimitive::line(0.0, cursor, angle.radians(), straight)?);
            }
            cursor = leg_end;

            if let Some((tangent, turn)) = fillets.get(idx).cloned() {
                if tangent > EPSILON_DIST {
                    let radius = tangent / (turn.abs() / 2.0).tan();
                    let curvature = turn.signum() / radius;
                    line.add_primitive(CurvePrimitive::arc(
                        0.0,
                        cursor,
                        angle.radians(),
                        radius * turn.abs(),
                        curvature,
                    )?);
                    cursor = leg.pt2().project_away(tangent, legs[idx + 1].angle());
                }
            }
        }
        Ok(line)
    }
}
