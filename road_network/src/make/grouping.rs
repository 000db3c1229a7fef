use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use petgraph::unionfind::UnionFind;

use geom::Pt2D;

use crate::{IntersectionRecord, SplineID};

/// Crossings that belong to the same junction.
#[derive(Clone, Debug, PartialEq)]
pub struct IntersectionGroup {
    /// Sorted, so groups can be compared
    pub records: Vec<IntersectionRecord>,
    /// Per spline, the lowest and highest arc-length among its crossings. Junction sizing widens
    /// these later.
    pub ranges: BTreeMap<SplineID, (f64, f64)>,
    pub centroid: Pt2D,
}

impl IntersectionGroup {
    pub fn splines(&self) -> BTreeSet<SplineID> {
        self.ranges.keys().cloned().collect()
    }

    fn from_records(mut records: Vec<IntersectionRecord>) -> IntersectionGroup {
        records.sort_by(cmp_records);
        let mut ranges: BTreeMap<SplineID, (f64, f64)> = BTreeMap::new();
        for rec in &records {
            for (spline, s) in [(rec.spline_a, rec.s_a), (rec.spline_b, rec.s_b)] {
                let range = ranges.entry(spline).or_insert((s, s));
                range.0 = range.0.min(s);
                range.1 = range.1.max(s);
            }
        }
        let pts: Vec<Pt2D> = records.iter().map(|rec| rec.point).collect();
        IntersectionGroup {
            centroid: Pt2D::center(&pts),
            records,
            ranges,
        }
    }
}

fn cmp_records(a: &IntersectionRecord, b: &IntersectionRecord) -> Ordering {
    a.spline_a
        .cmp(&b.spline_a)
        .then_with(|| a.s_a.total_cmp(&b.s_a))
        .then_with(|| a.spline_b.cmp(&b.spline_b))
        .then_with(|| a.s_b.total_cmp(&b.s_b))
}

/// Do two records involve a common spline, at nearby places along it?
fn related(a: &IntersectionRecord, b: &IntersectionRecord, merge_distance: f64) -> bool {
    let a_pts = [(a.spline_a, a.s_a), (a.spline_b, a.s_b)];
    let b_pts = [(b.spline_a, b.s_a), (b.spline_b, b.s_b)];
    a_pts.iter().any(|(spline1, s1)| {
        b_pts
            .iter()
            .any(|(spline2, s2)| spline1 == spline2 && (s1 - s2).abs() <= merge_distance)
    })
}

/// Clusters crossings into junction candidates: the transitive closure of "shares a spline, at
/// most `merge_distance` apart along it". The result doesn't depend on the order of the input.
pub fn group_intersections(
    records: &[IntersectionRecord],
    merge_distance: f64,
) -> Vec<IntersectionGroup> {
    let mut sorted: Vec<IntersectionRecord> = records.to_vec();
    sorted.sort_by(cmp_records);

    let mut sets = UnionFind::new(sorted.len());
    for i in 0..sorted.len() {
        for j in (i + 1)..sorted.len() {
            if related(&sorted[i], &sorted[j], merge_distance) {
                sets.union(i, j);
            }
        }
    }

    let mut by_root: BTreeMap<usize, Vec<IntersectionRecord>> = BTreeMap::new();
    for (idx, rec) in sorted.into_iter().enumerate() {
        by_root.entry(sets.find(idx)).or_insert_with(Vec::new).push(rec);
    }
    let mut groups: Vec<IntersectionGroup> = by_root
        .into_values()
        .map(IntersectionGroup::from_records)
        .collect();
    groups.sort_by(|a, b| cmp_records(&a.records[0], &b.records[0]));
    groups
}
