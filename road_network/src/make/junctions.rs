use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use ordered_float::NotNan;

use geom::Pt2D;

use crate::make::connector::connector_geometry;
use crate::make::lane_links::match_lanes;
use crate::make::roads::{
    detach_road, move_road_end, replace_links, set_road_link, sync_spline_roads,
    DissolvedJunction,
};
use crate::{
    ContactPoint, Connection, IntersectionGroup, Junction, JunctionID, LaneLink, LaneRef, Link,
    Road, RoadID, RoadNetwork, Segment, SplineID, Staged, TopologyConfig, TopologyError,
};
use netutil::{Timer, Warn};

/// One end of one road.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct RoadEnd {
    pub road: RoadID,
    pub contact: ContactPoint,
}

/// Where a junction will be carved out of each spline, after sizing an intersection group.
#[derive(Clone, Debug, PartialEq)]
pub struct JunctionCandidate {
    pub ranges: BTreeMap<SplineID, (f64, f64)>,
    pub centroid: Pt2D,
}

impl JunctionCandidate {
    /// Sizes a group. Each spline's range is widened by the widest of the other splines, plus a
    /// margin. Ranges stop at the ends of the spline, and snap to them when they get close.
    pub fn from_group(
        network: &RoadNetwork,
        group: &IntersectionGroup,
        config: &TopologyConfig,
    ) -> Result<JunctionCandidate> {
        let mut half_widths = BTreeMap::new();
        for id in group.ranges.keys() {
            half_widths.insert(*id, network.try_get_s(*id)?.max_half_width());
        }

        let mut ranges = BTreeMap::new();
        for (id, (lo, hi)) in &group.ranges {
            let length = network.get_s(*id).length();
            let pad = half_widths
                .iter()
                .filter(|(other, _)| *other != id)
                .map(|(_, w)| *w)
                .fold(0.0, f64::max)
                + config.junction_margin;

            let mut start = (lo - pad).max(0.0);
            let mut end = (hi + pad).min(length);
            if start < config.min_road_length {
                start = 0.0;
            }
            if length - end < config.min_road_length {
                end = length;
            }
            if end - start <= geom::EPSILON_DIST {
                bail!(
                    "junction on {} would be empty at [{}, {}]; is junction_margin 0?",
                    id,
                    start,
                    end
                );
            }
            ranges.insert(*id, (start, end));
        }
        Ok(JunctionCandidate {
            ranges,
            centroid: group.centroid,
        })
    }

    pub fn splines(&self) -> BTreeSet<SplineID> {
        self.ranges.keys().cloned().collect()
    }

    /// Do the two candidates claim overlapping ranges of some spline? Ranges within `buffer` of
    /// each other count, since carving out one would swallow the road left between them.
    pub fn overlaps(&self, other: &JunctionCandidate, buffer: f64) -> bool {
        self.ranges.iter().any(|(id, (start1, end1))| {
            other
                .ranges
                .get(id)
                .map(|(start2, end2)| *start1 <= end2 + buffer && *start2 <= end1 + buffer)
                .unwrap_or(false)
        })
    }

    /// Takes over the ranges of a junction being merged into this one.
    pub fn absorb(&mut self, dissolved: &DissolvedJunction) {
        for (id, (start, end)) in &dissolved.ranges {
            let range = self.ranges.entry(*id).or_insert((*start, *end));
            range.0 = range.0.min(*start);
            range.1 = range.1.max(*end);
        }
    }
}

/// Builds an automatic junction from a sized intersection group: the junction is carved out of
/// every spline, and the road segments left on either side become its arms, with a connection
/// for every ordered pair of different arms. Roads linked directly to an end of a spline that the
/// junction covers are arms as well. When `reuse` is given, the junction takes over its ID, name
/// and metadata.
pub fn make_junction_from_group(
    staged: &mut Staged,
    candidate: &JunctionCandidate,
    reuse: Option<DissolvedJunction>,
    config: &TopologyConfig,
    timer: &mut Timer,
) -> Result<JunctionID> {
    let id = match reuse {
        Some(ref dissolved) => dissolved.id,
        None => staged.alloc_junction_id(),
    };

    let mut arms = Vec::new();
    for (sid, (start, end)) in &candidate.ranges {
        let mut spline = staged.try_get_s(*sid)?.clone();
        let insertion = spline.segments.insert_junction(
            *start,
            *end,
            id,
            config.min_road_length,
            || staged.alloc_road_id(),
        );
        if insertion.junction != id || !insertion.absorbed_junctions.is_empty() {
            bail!(TopologyError::AmbiguousMerge(format!(
                "a new junction on {} at [{}, {}] runs into {}",
                sid, insertion.start, insertion.end, insertion.junction
            )));
        }
        let (before, after) = spline.segments.neighbors(Segment::Junction(id));

        // Roads linked to an end of the spline that the junction now covers become arms too
        let mut outside = Vec::new();
        if before.is_none() {
            if let Some(Link::Road { road, contact }) = spline.predecessor {
                outside.push(RoadEnd { road, contact });
                spline.predecessor = Some(Link::Junction(id));
            }
        }
        if after.is_none() {
            if let Some(Link::Road { road, contact }) = spline.successor {
                outside.push(RoadEnd { road, contact });
                spline.successor = Some(Link::Junction(id));
            }
        }
        staged.put_spline(spline);
        for end in outside {
            if staged.maybe_get_r(end.road).is_some() {
                set_road_link(staged, end.road, end.contact, Some(Link::Junction(id)))?;
                arms.push(end);
            }
        }

        for r in insertion.removed_roads {
            detach_road(staged, r);
        }
        for (orig, split) in insertion.split_roads {
            // The far end of the road now belongs to the second half
            move_road_end(staged, orig, split, ContactPoint::End);
        }
        // The ends next to the junction moved; anything still linking to them touches the
        // junction now
        if let Some(Segment::Road(r)) = before {
            replace_links(
                staged,
                Link::Road {
                    road: r,
                    contact: ContactPoint::End,
                },
                Some(Link::Junction(id)),
            );
        }
        if let Some(Segment::Road(r)) = after {
            replace_links(
                staged,
                Link::Road {
                    road: r,
                    contact: ContactPoint::Start,
                },
                Some(Link::Junction(id)),
            );
        }
        sync_spline_roads(staged, *sid)?;

        if let Some(Segment::Road(r)) = before {
            arms.push(RoadEnd {
                road: r,
                contact: ContactPoint::End,
            });
        }
        if let Some(Segment::Road(r)) = after {
            arms.push(RoadEnd {
                road: r,
                contact: ContactPoint::Start,
            });
        }
    }
    // An outside road can be claimed from both sides, or covered by a later spline's range
    arms.retain(|a| staged.maybe_get_r(a.road).is_some());
    arms.sort();
    arms.dedup();

    let arms = sort_around(staged, &arms, candidate.centroid)?;
    let mut connections = Vec::new();
    for i in 0..arms.len() {
        for j in 0..arms.len() {
            if i == j {
                continue;
            }
            let corner = is_corner(i, j, arms.len());
            if let Some(c) = try_connection(
                staged,
                id,
                connections.len(),
                arms[i],
                arms[j],
                corner,
                config,
                timer,
            ) {
                connections.push(c);
            }
        }
    }

    let arm_roads: BTreeSet<RoadID> = arms.iter().map(|a| a.road).collect();
    let (name, mut priorities, controllers) = match reuse {
        Some(dissolved) => (dissolved.name, dissolved.priorities, dissolved.controllers),
        None => (format!("Junction {}", id.0), Vec::new(), Vec::new()),
    };
    priorities.retain(|p| arm_roads.contains(&p.high) && arm_roads.contains(&p.low));

    info!(
        "{} joins {} arms with {} connections",
        id,
        arms.len(),
        connections.len()
    );
    staged.put_junction(Junction {
        id,
        name,
        auto: true,
        center: candidate.centroid,
        connections,
        priorities,
        controllers,
    });
    Ok(id)
}

/// Drops links to missing or connector roads, and duplicates.
fn resolve_links(staged: &Staged, links: &[RoadEnd]) -> Warn<Vec<RoadEnd>> {
    let mut resolved: Vec<RoadEnd> = Vec::new();
    let mut warnings = Vec::new();
    for end in links {
        match staged.maybe_get_r(end.road) {
            Some(r) if !r.is_connector() => {
                if !resolved.contains(end) {
                    resolved.push(*end);
                }
            }
            Some(_) => warnings.push(format!(
                "Can't attach connector road {} to a new junction",
                end.road
            )),
            None => warnings.push(format!("{} doesn't exist; not attaching it", end.road)),
        }
    }
    Warn::warnings(resolved, warnings)
}

/// Builds a user-authored junction from explicit road ends. Ends that don't resolve are skipped
/// with a warning. Pairs of roads that some other junction already connects are left alone;
/// every other pair gets a connection each way.
pub fn make_junction_from_links(
    staged: &mut Staged,
    links: &[RoadEnd],
    config: &TopologyConfig,
    timer: &mut Timer,
) -> Result<JunctionID> {
    let resolved = resolve_links(staged, links).get(timer);
    if resolved.len() < 2 {
        bail!(
            "A junction needs at least 2 roads, but only {} of {} links resolved",
            resolved.len(),
            links.len()
        );
    }

    let mut pts = Vec::new();
    for end in &resolved {
        pts.push(staged.get_r(end.road).endpoint(end.contact)?);
    }
    let centroid = Pt2D::center(&pts);
    let arms = sort_around(staged, &resolved, centroid)?;

    // Only connections through other junctions count as already existing
    let existing: Vec<Junction> = staged.all_junctions().values().cloned().collect();
    let id = staged.alloc_junction_id();
    for end in &arms {
        set_road_link(staged, end.road, end.contact, Some(Link::Junction(id)))?;
    }

    let mut connections = Vec::new();
    for i in 0..arms.len() {
        for j in (i + 1)..arms.len() {
            if existing
                .iter()
                .any(|junction| junction.connects(arms[i].road, arms[j].road))
            {
                continue;
            }
            let corner = is_corner(i, j, arms.len());
            for (from, to) in [(arms[i], arms[j]), (arms[j], arms[i])] {
                if let Some(c) = try_connection(
                    staged,
                    id,
                    connections.len(),
                    from,
                    to,
                    corner,
                    config,
                    timer,
                ) {
                    connections.push(c);
                }
            }
        }
    }

    info!(
        "Created {} from {} roads with {} connections",
        id,
        arms.len(),
        connections.len()
    );
    staged.put_junction(Junction {
        id,
        name: format!("Junction {}", id.0),
        auto: false,
        center: centroid,
        connections,
        priorities: Vec::new(),
        controllers: Vec::new(),
    });
    Ok(id)
}

/// Orders road ends counter-clockwise around a point, by the direction they leave it in.
fn sort_around(staged: &Staged, ends: &[RoadEnd], center: Pt2D) -> Result<Vec<RoadEnd>> {
    let mut keyed = Vec::new();
    for end in ends {
        let pose = staged
            .try_get_r(end.road)?
            .contact_pose(end.contact, false)?;
        // Roads whose end sits on the center are ordered by heading alone
        let angle = if pose.pt.dist_to(center) > geom::EPSILON_DIST {
            center.angle_to(pose.pt)
        } else {
            pose.heading
        };
        let key = NotNan::new(angle.normalized_radians())
            .map_err(|_| anyhow!("{} has no direction from {}", end.road, center))?;
        keyed.push((key, *end));
    }
    keyed.sort();
    Ok(keyed.into_iter().map(|(_, end)| end).collect())
}

/// Angularly adjacent arms, including the last and the first.
fn is_corner(i: usize, j: usize, num_arms: usize) -> bool {
    let (lo, hi) = if i < j { (i, j) } else { (j, i) };
    hi - lo == 1 || (lo == 0 && hi == num_arms - 1)
}

/// Builds one connection, logging and skipping it if it fails.
fn try_connection(
    staged: &mut Staged,
    junction: JunctionID,
    conn_id: usize,
    from: RoadEnd,
    to: RoadEnd,
    corner: bool,
    config: &TopologyConfig,
    timer: &mut Timer,
) -> Option<Connection> {
    match build_connection(staged, junction, conn_id, from, to, corner, config) {
        Ok(c) => Some(c),
        Err(err) => {
            timer.warn(format!(
                "Skipping connection from {} to {} in {}: {}",
                from.road, to.road, junction, err
            ));
            None
        }
    }
}

fn build_connection(
    staged: &mut Staged,
    junction: JunctionID,
    conn_id: usize,
    from: RoadEnd,
    to: RoadEnd,
    corner: bool,
    config: &TopologyConfig,
) -> Result<Connection> {
    let incoming = staged.try_get_r(from.road)?;
    let outgoing = staged.try_get_r(to.road)?;
    let start = incoming.contact_pose(from.contact, true)?;
    let end = outgoing.contact_pose(to.contact, false)?;

    let in_section = incoming.end_lane_section(from.contact).ok_or_else(|| {
        TopologyError::NotFound(format!("lanes at the {} of {}", from.contact, from.road))
    })?;
    let out_section = outgoing.end_lane_section(to.contact).ok_or_else(|| {
        TopologyError::NotFound(format!("lanes at the {} of {}", to.contact, to.road))
    })?;
    let entry_ds = match from.contact {
        ContactPoint::Start => 0.0,
        ContactPoint::End => (incoming.length() - in_section.s).max(0.0),
    };
    let matched = match_lanes(
        &in_section.entry_lanes(from.contact),
        &out_section.exit_lanes(to.contact),
        corner,
        entry_ds,
        config.default_lane_width,
    );
    if matched.links.is_empty() {
        bail!(TopologyError::InvalidConnection {
            junction,
            incoming: from.road,
            outgoing: to.road,
        });
    }
    let name = format!("{} to {}", incoming.name, outgoing.name);
    let reference_line = connector_geometry(start, end)?;

    // Only allocate once nothing else can fail, so discarded connections don't leave a road
    let road_id = staged.alloc_road_id();
    let lane_links = matched
        .links
        .iter()
        .map(|(from_lane, conn_lane, _)| LaneLink {
            from: *from_lane,
            to: *conn_lane,
            from_lane: LaneRef {
                road: from.road,
                lane: *from_lane,
            },
            to_lane: LaneRef {
                road: road_id,
                lane: *conn_lane,
            },
        })
        .collect();

    let mut road = Road::new(road_id, name, reference_line);
    road.lane_sections.push(matched.section);
    road.junction = Some(junction);
    road.predecessor = Some(Link::Road {
        road: from.road,
        contact: from.contact,
    });
    road.successor = Some(Link::Road {
        road: to.road,
        contact: to.contact,
    });
    staged.put_road(road);

    Ok(Connection {
        id: conn_id,
        incoming_road: from.road,
        incoming_contact: from.contact,
        connecting_road: road_id,
        contact_point: ContactPoint::Start,
        outgoing_road: to.road,
        outgoing_contact: to.contact,
        lane_links,
        corner,
    })
}

#[cfg(test)]
mod tests {
    use geom::{CurvePrimitive, ReferenceLine};

    use super::*;
    use crate::LaneSection;

    // Three straight roads ending near the origin, from the west, south and east
    fn three_arms() -> RoadNetwork {
        let mut network = RoadNetwork::new();
        let ends = [
            (0, Pt2D::new(-50.0, 0.0), 0.0),
            (1, Pt2D::new(0.0, -50.0), 90.0_f64.to_radians()),
            (2, Pt2D::new(50.0, 0.0), 180.0_f64.to_radians()),
        ];
        for (id, start, hdg) in ends {
            let line = ReferenceLine::from_primitives(vec![
                CurvePrimitive::line(0.0, start, hdg, 45.0).unwrap()
            ]);
            let mut road = Road::new(RoadID(id), format!("arm {}", id), line);
            road.lane_sections.push(LaneSection::driving(1, 1, 3.0));
            network.add_road(road);
        }
        network
    }

    fn ends(ids: &[usize]) -> Vec<RoadEnd> {
        ids.iter()
            .map(|id| RoadEnd {
                road: RoadID(*id),
                contact: ContactPoint::End,
            })
            .collect()
    }

    #[test]
    fn manual_junction() {
        let network = three_arms();
        let mut staged = Staged::new(&network);
        let mut timer = Timer::throwaway();
        let id = make_junction_from_links(
            &mut staged,
            &ends(&[0, 1, 2, 7]),
            &TopologyConfig::default(),
            &mut timer,
        )
        .unwrap();
        // Road 7 doesn't exist
        assert_eq!(timer.warnings().len(), 1);

        let junction = staged.get_j(id);
        assert!(!junction.auto);
        // 3 pairs, both ways
        assert_eq!(junction.connections.len(), 6);
        assert!(junction.connects(RoadID(0), RoadID(2)));
        for c in &junction.connections {
            assert_eq!(c.lane_links.len(), 1);
            let connector = staged.get_r(c.connecting_road);
            assert_eq!(connector.junction, Some(id));
            assert_eq!(
                connector.predecessor,
                Some(Link::Road {
                    road: c.incoming_road,
                    contact: ContactPoint::End
                })
            );
        }
        for r in 0..3 {
            assert_eq!(
                staged.get_r(RoadID(r)).successor,
                Some(Link::Junction(id))
            );
        }
        // Every pair of 3 arms is adjacent
        assert!(junction.connections.iter().all(|c| c.corner));
    }

    #[test]
    fn skips_pairs_connected_elsewhere() {
        let network = three_arms();
        let mut staged = Staged::new(&network);
        let config = TopologyConfig::default();
        let mut timer = Timer::throwaway();
        make_junction_from_links(&mut staged, &ends(&[0, 2]), &config, &mut timer).unwrap();
        let second =
            make_junction_from_links(&mut staged, &ends(&[0, 1, 2]), &config, &mut timer)
                .unwrap();
        let junction = staged.get_j(second);
        assert_eq!(junction.connections.len(), 4);
        assert!(!junction.connects(RoadID(0), RoadID(2)));
    }

    #[test]
    fn too_few_links() {
        let network = three_arms();
        let mut staged = Staged::new(&network);
        assert!(make_junction_from_links(
            &mut staged,
            &ends(&[0, 9]),
            &TopologyConfig::default(),
            &mut Timer::throwaway(),
        )
        .is_err());
    }

    #[test]
    fn corners() {
        assert!(is_corner(0, 1, 4));
        assert!(is_corner(3, 0, 4));
        assert!(!is_corner(0, 2, 4));
        assert!(is_corner(0, 1, 2));
    }
}
