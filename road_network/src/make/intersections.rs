use anyhow::Result;

use geom::{Pt2D, ReferenceLine};

use crate::{RoadNetwork, SplineID};

/// Two samples are the same point if they're closer than this fraction of the sampling step.
const HIT_FRACTION: f64 = 0.9;

/// Where two splines come close enough to cross.
#[derive(Clone, Debug, PartialEq)]
pub struct IntersectionRecord {
    pub spline_a: SplineID,
    pub s_a: f64,
    pub spline_b: SplineID,
    pub s_b: f64,
    pub point: Pt2D,
}

/// Finds where one spline crosses every other spline in the network, by sampling both reference
/// lines every `step`. Crossings at a very shallow angle can slip between samples and go
/// undetected. The order of the results isn't meaningful.
pub fn find_intersections(
    network: &RoadNetwork,
    spline: SplineID,
    step: f64,
) -> Result<Vec<IntersectionRecord>> {
    let this = network.try_get_s(spline)?;
    let bounds = this.reference_line.bounds();
    let samples = this.reference_line.sample(step);

    let mut results = Vec::new();
    for other in network.all_splines().values() {
        if other.id == spline {
            continue;
        }
        if !bounds.overlaps(&other.reference_line.bounds(), step) {
            continue;
        }
        for (s_a, s_b, point) in crossings(&samples, &other.reference_line.sample(step), step) {
            results.push(IntersectionRecord {
                spline_a: spline,
                s_a,
                spline_b: other.id,
                s_b,
                point,
            });
        }
    }
    Ok(results)
}

/// Like `find_intersections`, for two bare reference lines. Returns (s on a, s on b, point).
pub fn find_crossings(a: &ReferenceLine, b: &ReferenceLine, step: f64) -> Vec<(f64, f64, Pt2D)> {
    crossings(&a.sample(step), &b.sample(step), step)
}

fn crossings(a: &[(Pt2D, f64)], b: &[(Pt2D, f64)], step: f64) -> Vec<(f64, f64, Pt2D)> {
    let threshold = HIT_FRACTION * step;
    let mut hits = Vec::new();
    let mut i = 0;
    while i < a.len() {
        let mut j = 0;
        while j < b.len() && i < a.len() {
            let (pt_a, s_a) = a[i];
            let (pt_b, s_b) = b[j];
            if pt_a.dist_to(pt_b) < threshold {
                hits.push((s_a, s_b, Pt2D::center(&[pt_a, pt_b])));
                // Skip ahead on both lines, so one crossing doesn't produce a cluster of hits
                i += 2;
                j += 2;
                continue;
            }
            j += 1;
        }
        i += 1;
    }
    hits
}
