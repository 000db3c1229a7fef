use std::collections::BTreeSet;

use anyhow::Result;

use geom::Pt2D;
use netutil::Timer;

use crate::make::grouping::group_intersections;
use crate::make::intersections::{find_intersections, IntersectionRecord};
use crate::make::junctions::{
    make_junction_from_group, make_junction_from_links, JunctionCandidate, RoadEnd,
};
use crate::make::roads::{detach_road, dissolve_junction, sync_spline_roads, DissolvedJunction};
use crate::{
    ControlPointEdit, JunctionID, LaneSection, Link, RoadID, RoadNetwork, Segment, SegmentMap,
    Spline, SplineID, Staged, TopologyConfig, TopologyError,
};

/// What one edit did to the network.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PassReport {
    pub junctions_created: BTreeSet<JunctionID>,
    /// Regenerated in place, keeping their ID
    pub junctions_updated: BTreeSet<JunctionID>,
    pub junctions_removed: BTreeSet<JunctionID>,
    pub roads_added: BTreeSet<RoadID>,
    pub roads_removed: BTreeSet<RoadID>,
    /// Work that was skipped, like connections that couldn't be built
    pub warnings: Vec<String>,
}

/// Keeps junctions in sync with the geometry of splines. Every operation runs one full pass
/// against a staged copy of the network; the network is only modified if the whole pass
/// succeeds.
pub struct Topology {
    config: TopologyConfig,
}

impl Topology {
    pub fn new(config: TopologyConfig) -> Result<Topology> {
        config.validate()?;
        Ok(Topology { config })
    }

    pub fn config(&self) -> &TopologyConfig {
        &self.config
    }

    /// Creates a new spline as a single road, then carves junctions wherever it crosses other
    /// splines.
    pub fn add_spline(
        &self,
        network: &mut RoadNetwork,
        name: &str,
        control_points: Vec<Pt2D>,
        corner_radius: f64,
        lane_profile: LaneSection,
    ) -> Result<(SplineID, PassReport)> {
        let mut timer = Timer::new(&format!("add spline {}", name));
        let mut staged = Staged::new(network);
        let id = staged.alloc_spline_id();
        let mut spline = Spline::new(
            id,
            name.to_string(),
            control_points,
            corner_radius,
            lane_profile,
        )?;
        let road = staged.alloc_road_id();
        spline.segments = SegmentMap::with_road(spline.length(), road);
        staged.put_spline(spline);
        sync_spline_roads(&mut staged, id)?;

        let mut splines = BTreeSet::new();
        splines.insert(id);
        self.run_pass(&mut staged, splines, Vec::new(), &mut timer)?;
        Ok((id, finish(network, staged, &mut timer)))
    }

    /// Changes one control point of a spline. The spline's automatic junctions are dissolved and
    /// synthesized again against the new geometry; junctions that come back over the same splines
    /// keep their ID.
    pub fn edit_spline(
        &self,
        network: &mut RoadNetwork,
        id: SplineID,
        edit: &ControlPointEdit,
    ) -> Result<PassReport> {
        let mut timer = Timer::new(&format!("edit {}", id));
        let mut staged = Staged::new(network);
        let (splines, dissolved) = dissolve_auto_junctions(&mut staged, id)?;

        let mut spline = staged.try_get_s(id)?.clone();
        let dropped = spline.apply_edit(edit)?;
        if spline.segments.is_empty() {
            let road = staged.alloc_road_id();
            spline.segments.insert(0.0, Segment::Road(road));
        }
        staged.put_spline(spline);
        for (_, segment) in dropped {
            match segment {
                Segment::Road(r) => detach_road(&mut staged, r),
                Segment::Junction(j) => {
                    if staged.maybe_get_j(j).is_some() {
                        timer.warn(format!("{} fell off the end of {}; removing it", j, id));
                        dissolve_junction(&mut staged, j)?;
                    }
                }
            }
        }
        sync_spline_roads(&mut staged, id)?;

        self.run_pass(&mut staged, splines, dissolved, &mut timer)?;
        Ok(finish(network, staged, &mut timer))
    }

    /// Replaces the lanes of every road along a spline. Junctions are regenerated, since their
    /// size and lane links depend on the lanes.
    pub fn set_lane_profile(
        &self,
        network: &mut RoadNetwork,
        id: SplineID,
        lane_profile: LaneSection,
    ) -> Result<PassReport> {
        let mut timer = Timer::new(&format!("change lanes of {}", id));
        let mut staged = Staged::new(network);
        let (splines, dissolved) = dissolve_auto_junctions(&mut staged, id)?;

        let mut spline = staged.try_get_s(id)?.clone();
        spline.lane_profile = lane_profile;
        staged.put_spline(spline);
        sync_spline_roads(&mut staged, id)?;

        self.run_pass(&mut staged, splines, dissolved, &mut timer)?;
        Ok(finish(network, staged, &mut timer))
    }

    /// Deletes a spline and its roads. Junctions it took part in are regenerated for the
    /// remaining splines.
    pub fn remove_spline(&self, network: &mut RoadNetwork, id: SplineID) -> Result<PassReport> {
        let mut timer = Timer::new(&format!("remove {}", id));
        let mut staged = Staged::new(network);
        let (mut splines, dissolved) = dissolve_auto_junctions(&mut staged, id)?;
        splines.remove(&id);

        let roads = staged.try_get_s(id)?.roads();
        for road in roads {
            detach_road(&mut staged, road);
        }
        staged.remove_spline(id);

        self.run_pass(&mut staged, splines, dissolved, &mut timer)?;
        Ok(finish(network, staged, &mut timer))
    }

    /// Creates a user-authored junction joining explicit road ends. The topology pass never
    /// touches these afterwards.
    pub fn create_junction(
        &self,
        network: &mut RoadNetwork,
        links: &[RoadEnd],
    ) -> Result<(JunctionID, PassReport)> {
        let mut timer = Timer::new("create junction");
        let mut staged = Staged::new(network);
        let id = make_junction_from_links(&mut staged, links, &self.config, &mut timer)?;
        Ok((id, finish(network, staged, &mut timer)))
    }

    /// Removes any junction. Roads of splines merge back together over its range.
    pub fn remove_junction(&self, network: &mut RoadNetwork, id: JunctionID) -> Result<PassReport> {
        let mut timer = Timer::new(&format!("remove {}", id));
        let mut staged = Staged::new(network);
        dissolve_junction(&mut staged, id)?;
        Ok(finish(network, staged, &mut timer))
    }

    /// Detects crossings of the given splines, groups them, and makes one junction per group.
    /// `dissolved` are junctions removed earlier in this pass; a group over exactly the same
    /// splines as one of them takes over its identity.
    fn run_pass(
        &self,
        staged: &mut Staged,
        splines: BTreeSet<SplineID>,
        mut dissolved: Vec<DissolvedJunction>,
        timer: &mut Timer,
    ) -> Result<()> {
        timer.start("find crossings");
        let mut records: Vec<IntersectionRecord> = Vec::new();
        for id in &splines {
            for rec in find_intersections(staged, *id, self.config.sample_step)? {
                let rec = canonical(rec);
                if !records.contains(&rec) && !already_joined(staged, &rec) {
                    records.push(rec);
                }
            }
        }
        timer.stop("find crossings");

        timer.start("size junctions");
        let groups = group_intersections(&records, self.config.merge_distance);
        let mut candidates = Vec::new();
        for group in &groups {
            candidates.push(JunctionCandidate::from_group(staged, group, &self.config)?);
        }
        timer.stop("size junctions");
        timer.note(format!(
            "{} crossings form {} junction candidates",
            records.len(),
            candidates.len()
        ));

        for (idx, c1) in candidates.iter().enumerate() {
            for c2 in &candidates[idx + 1..] {
                if c1.overlaps(c2, self.config.min_road_length) {
                    let err = TopologyError::AmbiguousMerge(format!(
                        "junctions near {} and {} overlap",
                        c1.centroid, c2.centroid
                    ));
                    warn!("{}", err);
                    bail!(err);
                }
            }
        }

        timer.start("synthesize junctions");
        for mut candidate in candidates {
            let existing = overlapping_junctions(staged, &candidate, self.config.min_road_length);
            if existing.len() > 1 {
                let err = TopologyError::AmbiguousMerge(format!(
                    "a junction near {} would merge {:?}",
                    candidate.centroid, existing
                ));
                warn!("{}", err);
                bail!(err);
            }

            let mut reuse = None;
            if let Some(j) = existing.into_iter().next() {
                if !staged.try_get_j(j)?.auto {
                    timer.warn(format!(
                        "Not touching user-created {}, although a crossing near {} overlaps it",
                        j, candidate.centroid
                    ));
                    continue;
                }
                let absorbed = dissolve_junction(staged, j)?;
                candidate.absorb(&absorbed);
                reuse = Some(absorbed);
            } else if let Some(idx) = dissolved.iter().position(|d| {
                d.auto && d.ranges.keys().cloned().collect::<BTreeSet<_>>() == candidate.splines()
            }) {
                reuse = Some(dissolved.remove(idx));
            }

            make_junction_from_group(staged, &candidate, reuse, &self.config, timer)?;
        }
        timer.stop("synthesize junctions");

        for d in dissolved {
            debug!("{} no longer has a crossing; it's gone", d.id);
        }
        Ok(())
    }
}

/// Dissolves every automatic junction on a spline, or linked to one of its ends. Returns the
/// splines they touched, including this one, and what's needed to recreate them.
fn dissolve_auto_junctions(
    staged: &mut Staged,
    id: SplineID,
) -> Result<(BTreeSet<SplineID>, Vec<DissolvedJunction>)> {
    let mut splines = BTreeSet::new();
    splines.insert(id);
    let mut dissolved = Vec::new();
    let spline = staged.try_get_s(id)?;
    let mut junctions = spline.junctions();
    for link in [spline.predecessor, spline.successor] {
        if let Some(Link::Junction(j)) = link {
            if !junctions.contains(&j) {
                junctions.push(j);
            }
        }
    }
    for j in junctions {
        match staged.maybe_get_j(j) {
            Some(junction) if junction.auto => {}
            _ => {
                continue;
            }
        }
        let d = dissolve_junction(staged, j)?;
        splines.extend(d.ranges.keys().cloned());
        dissolved.push(d);
    }
    Ok((splines, dissolved))
}

/// The same crossing is found from both splines; store it one way.
fn canonical(rec: IntersectionRecord) -> IntersectionRecord {
    if rec.spline_a <= rec.spline_b {
        return rec;
    }
    IntersectionRecord {
        spline_a: rec.spline_b,
        s_a: rec.s_b,
        spline_b: rec.spline_a,
        s_b: rec.s_a,
        point: rec.point,
    }
}

/// Is the crossing already inside a junction joining both splines?
fn already_joined(staged: &Staged, rec: &IntersectionRecord) -> bool {
    let at = |spline: SplineID, s: f64| {
        staged
            .maybe_get_s(spline)
            .and_then(|sp| sp.segments.segment_at(s))
    };
    match (at(rec.spline_a, rec.s_a), at(rec.spline_b, rec.s_b)) {
        (Some(Segment::Junction(j1)), Some(Segment::Junction(j2))) => j1 == j2,
        _ => false,
    }
}

/// Existing junctions the candidate would run into on any of its splines. That includes junctions
/// linked to an end of a spline the candidate reaches, which aren't in its segment map.
fn overlapping_junctions(
    staged: &Staged,
    candidate: &JunctionCandidate,
    buffer: f64,
) -> BTreeSet<JunctionID> {
    let mut found = BTreeSet::new();
    for (id, (start, end)) in &candidate.ranges {
        let spline = match staged.maybe_get_s(*id) {
            Some(s) => s,
            None => {
                continue;
            }
        };
        for (k, e, seg) in spline.segments.ranges() {
            if let Segment::Junction(j) = seg {
                if k <= end + buffer && e >= start - buffer {
                    found.insert(j);
                }
            }
        }
        if *start <= buffer {
            if let Some(Link::Junction(j)) = spline.predecessor {
                found.insert(j);
            }
        }
        if *end >= spline.length() - buffer {
            if let Some(Link::Junction(j)) = spline.successor {
                found.insert(j);
            }
        }
    }
    found.retain(|j| staged.maybe_get_j(*j).is_some());
    found
}

fn finish(network: &mut RoadNetwork, staged: Staged, timer: &mut Timer) -> PassReport {
    let summary = network.apply(staged.finish());
    let report = PassReport {
        junctions_created: summary.junctions_added,
        junctions_updated: summary.junctions_changed,
        junctions_removed: summary.junctions_removed,
        roads_added: summary.roads_added,
        roads_removed: summary.roads_removed,
        warnings: timer.take_warnings(),
    };
    info!(
        "{} junctions created, {} updated, {} removed; {} warnings",
        report.junctions_created.len(),
        report.junctions_updated.len(),
        report.junctions_removed.len(),
        report.warnings.len()
    );
    report
}
