use anyhow::Result;

use geom::{CurveKind, CurvePrimitive, ParamRange, Pose, Pt2D, ReferenceLine};

// Within this, two headings count as the same
const COLLINEAR_DEGREES: f64 = 0.1;
const LENGTH_INTEGRATION_STEPS: usize = 64;

/// The reference line of a connector road, leaving `start` and arriving at `end` with their
/// headings. When both poses already line up, that's a straight line. Otherwise it's a cubic
/// Bezier curve whose control points are a third of the distance out along each heading, stored
/// as a parametric cubic.
pub fn connector_geometry(start: Pose, end: Pose) -> Result<ReferenceLine> {
    let chord = start.pt.dist_to(end.pt);
    if chord < geom::EPSILON_DIST {
        bail!("connector from {} to {} has no length", start.pt, end.pt);
    }

    let chord_angle = start.pt.angle_to(end.pt);
    if start.heading.approx_eq(chord_angle, COLLINEAR_DEGREES)
        && end.heading.approx_eq(chord_angle, COLLINEAR_DEGREES)
    {
        let line = CurvePrimitive::line(0.0, start.pt, chord_angle.radians(), chord)?;
        return Ok(ReferenceLine::from_primitives(vec![line]));
    }

    // The control points are straight out/in from the roads, so that traffic leaves and enters
    // at the same angle as the road.
    let p0 = start.pt;
    let p1 = start.pt.project_away(chord / 3.0, start.heading);
    let p2 = end.pt.project_away(-chord / 3.0, end.heading);
    let p3 = end.pt;

    // Work in the frame of the start pose
    let hdg = start.heading.radians();
    let (sin, cos) = hdg.sin_cos();
    let local = |pt: Pt2D| {
        let dx = pt.x() - p0.x();
        let dy = pt.y() - p0.y();
        (dx * cos + dy * sin, -dx * sin + dy * cos)
    };
    let (u1, v1) = local(p1);
    let (u2, v2) = local(p2);
    let (u3, v3) = local(p3);

    // Bernstein to power basis, with P0 at the origin
    let bu = 3.0 * u1;
    let cu = 3.0 * (u2 - 2.0 * u1);
    let du = 3.0 * u1 - 3.0 * u2 + u3;
    let bv = 3.0 * v1;
    let cv = 3.0 * (v2 - 2.0 * v1);
    let dv = 3.0 * v1 - 3.0 * v2 + v3;

    let length = curve_length(|p| {
        let du_dp = bu + 2.0 * cu * p + 3.0 * du * p * p;
        let dv_dp = bv + 2.0 * cv * p + 3.0 * dv * p * p;
        (du_dp * du_dp + dv_dp * dv_dp).sqrt()
    });
    let prim = CurvePrimitive::new(
        0.0,
        p0,
        hdg,
        length,
        CurveKind::ParamPoly3 {
            au: 0.0,
            bu,
            cu,
            du,
            av: 0.0,
            bv,
            cv,
            dv,
            p_range: ParamRange::Normalized,
        },
    )?;
    Ok(ReferenceLine::from_primitives(vec![prim]))
}

// Simpson's rule over p in [0, 1]
fn curve_length<F: Fn(f64) -> f64>(speed: F) -> f64 {
    let n = LENGTH_INTEGRATION_STEPS;
    let h = 1.0 / n as f64;
    let mut sum = speed(0.0) + speed(1.0);
    for i in 1..n {
        let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
        sum += weight * speed(h * i as f64);
    }
    sum * h / 3.0
}
