use std::collections::BTreeMap;

use anyhow::Result;

use geom::ReferenceLine;

use crate::{
    Connection, ContactPoint, JunctionController, JunctionID, Link, Priority, Road, RoadID, Segment,
    SplineID, Staged, TopologyError,
};

/// What's left of a junction after dissolving it. Enough to recreate it with the same identity.
#[derive(Clone, Debug)]
pub struct DissolvedJunction {
    pub id: JunctionID,
    pub name: String,
    pub auto: bool,
    pub priorities: Vec<Priority>,
    pub controllers: Vec<JunctionController>,
    /// Per spline, the range the junction used to cover
    pub ranges: BTreeMap<SplineID, (f64, f64)>,
}

fn segment_link(segment: Segment, contact: ContactPoint) -> Link {
    match segment {
        Segment::Road(road) => Link::Road { road, contact },
        Segment::Junction(j) => Link::Junction(j),
    }
}

/// Makes the roads of a spline match its segment map: every road segment is re-sliced from the
/// spline's reference line, gets a copy of the lane profile, and links to its neighbors. Road
/// segments without a road yet get a new one.
pub fn sync_spline_roads(staged: &mut Staged, id: SplineID) -> Result<()> {
    let spline = staged.try_get_s(id)?.clone();
    let ranges = spline.segments.ranges();
    for (idx, (start, end, segment)) in ranges.iter().enumerate() {
        let road_id = match segment {
            Segment::Road(r) => *r,
            Segment::Junction(_) => {
                continue;
            }
        };

        let mut road = match staged.maybe_get_r(road_id) {
            Some(r) => r.clone(),
            None => Road::new(road_id, spline.name.clone(), ReferenceLine::new()),
        };
        road.reference_line = spline
            .reference_line
            .slice(*start, *end)
            .map_err(|err| {
                TopologyError::from_geometry(
                    err,
                    format!("{} over [{}, {}] of {}", road_id, start, end, id),
                )
            })?;
        let mut section = spline.lane_profile.clone();
        section.s = 0.0;
        road.lane_sections = vec![section];
        road.spline = Some(id);
        road.predecessor = if idx == 0 {
            spline.predecessor
        } else {
            Some(segment_link(ranges[idx - 1].2, ContactPoint::End))
        };
        road.successor = match ranges.get(idx + 1) {
            Some((_, _, next)) => Some(segment_link(*next, ContactPoint::Start)),
            None => spline.successor,
        };

        if staged.maybe_get_r(road_id) != Some(&road) {
            staged.put_road(road);
        }
    }
    Ok(())
}

/// Sets the link at one end of a road. If that end is also an end of the road's spline, the
/// spline remembers the link too, so it survives re-slicing.
pub fn set_road_link(
    staged: &mut Staged,
    road: RoadID,
    contact: ContactPoint,
    link: Option<Link>,
) -> Result<()> {
    let mut r = staged.try_get_r(road)?.clone();
    r.set_link(contact, link);
    if let Some(mut spline) = r.spline.and_then(|s| staged.maybe_get_s(s)).cloned() {
        let list = spline.segments.to_ordered_list();
        let outer = match contact {
            ContactPoint::Start => list.first(),
            ContactPoint::End => list.last(),
        };
        if outer.map(|(_, seg)| *seg) == Some(Segment::Road(road)) {
            match contact {
                ContactPoint::Start => {
                    spline.predecessor = link;
                }
                ContactPoint::End => {
                    spline.successor = link;
                }
            }
            staged.put_spline(spline);
        }
    }
    staged.put_road(r);
    Ok(())
}

/// Everything attached to one end of `old` is moved to the same end of `new`: connections and
/// lane links of junctions, links of other roads, and the external links of splines. Needed when
/// a road is split or merged and a different road now owns that end.
pub fn move_road_end(staged: &mut Staged, old: RoadID, new: RoadID, contact: ContactPoint) {
    if old == new {
        return;
    }
    let from = Link::Road { road: old, contact };
    let to = Link::Road { road: new, contact };

    let junctions: Vec<JunctionID> = staged
        .all_junctions()
        .values()
        .filter(|j| {
            j.connections.iter().any(|c| {
                (c.incoming_road == old && c.incoming_contact == contact)
                    || (c.outgoing_road == old && c.outgoing_contact == contact)
            })
        })
        .map(|j| j.id)
        .collect();
    for id in junctions {
        let mut junction = staged.get_j(id).clone();
        for c in &mut junction.connections {
            if c.incoming_road == old && c.incoming_contact == contact {
                c.incoming_road = new;
                for link in &mut c.lane_links {
                    link.from_lane.road = new;
                }
            }
            if c.outgoing_road == old && c.outgoing_contact == contact {
                c.outgoing_road = new;
            }
        }
        for p in &mut junction.priorities {
            if p.high == old {
                p.high = new;
            }
            if p.low == old {
                p.low = new;
            }
        }
        staged.put_junction(junction);
    }

    replace_links(staged, from, Some(to));
}

/// Every road and spline linking to `from` links to `to` instead.
pub fn replace_links(staged: &mut Staged, from: Link, to: Option<Link>) {
    let roads: Vec<RoadID> = staged
        .all_roads()
        .values()
        .filter(|r| r.predecessor == Some(from) || r.successor == Some(from))
        .map(|r| r.id)
        .collect();
    for id in roads {
        let mut road = staged.get_r(id).clone();
        if road.predecessor == Some(from) {
            road.predecessor = to;
        }
        if road.successor == Some(from) {
            road.successor = to;
        }
        staged.put_road(road);
    }

    let splines: Vec<SplineID> = staged
        .all_splines()
        .values()
        .filter(|s| s.predecessor == Some(from) || s.successor == Some(from))
        .map(|s| s.id)
        .collect();
    for id in splines {
        let mut spline = staged.get_s(id).clone();
        if spline.predecessor == Some(from) {
            spline.predecessor = to;
        }
        if spline.successor == Some(from) {
            spline.successor = to;
        }
        staged.put_spline(spline);
    }
}

/// Removes a road, first cutting it out of everything: connections through it are dropped along
/// with their connector roads, and links to it are cleared.
pub fn detach_road(staged: &mut Staged, road: RoadID) {
    let junctions: Vec<JunctionID> = staged
        .all_junctions()
        .values()
        .filter(|j| j.arm_roads().contains(&road))
        .map(|j| j.id)
        .collect();
    for id in junctions {
        let mut junction = staged.get_j(id).clone();
        let (gone, kept): (Vec<Connection>, Vec<Connection>) = junction
            .connections
            .into_iter()
            .partition(|c| c.incoming_road == road || c.outgoing_road == road);
        for c in gone {
            staged.remove_road(c.connecting_road);
        }
        junction.connections = kept;
        junction
            .priorities
            .retain(|p| p.high != road && p.low != road);
        staged.put_junction(junction);
    }

    for contact in [ContactPoint::Start, ContactPoint::End] {
        replace_links(staged, Link::Road { road, contact }, None);
    }
    staged.remove_road(road);
}

/// Removes a junction and its connector roads. Its segment is handed back to the neighboring
/// roads of every spline it was carved out of. Other roads that ended at the junction get linked
/// directly to each other if there are exactly two of them; otherwise they lose the link.
pub fn dissolve_junction(staged: &mut Staged, id: JunctionID) -> Result<DissolvedJunction> {
    let junction = staged.try_get_j(id)?.clone();
    for r in junction.connector_roads() {
        staged.remove_road(r);
    }

    let mut ranges = BTreeMap::new();
    let splines: Vec<SplineID> = staged
        .all_splines()
        .values()
        .filter(|s| s.junctions().contains(&id))
        .map(|s| s.id)
        .collect();
    for sid in splines {
        let mut spline = staged.get_s(sid).clone();
        let removal = match spline
            .segments
            .remove_junction(id, || staged.alloc_road_id())
        {
            Some(removal) => removal,
            None => {
                continue;
            }
        };
        ranges.insert(sid, (removal.start, removal.end));
        staged.put_spline(spline);
        for merged in removal.removed_roads {
            move_road_end(staged, merged, removal.road, ContactPoint::End);
            staged.remove_road(merged);
        }
        sync_spline_roads(staged, sid)?;
    }

    let attached: Vec<(RoadID, ContactPoint)> = staged
        .all_roads()
        .values()
        .flat_map(|r| {
            let mut ends = Vec::new();
            if r.predecessor == Some(Link::Junction(id)) {
                ends.push((r.id, ContactPoint::Start));
            }
            if r.successor == Some(Link::Junction(id)) {
                ends.push((r.id, ContactPoint::End));
            }
            ends
        })
        .collect();
    if attached.len() == 2 && attached[0].0 != attached[1].0 {
        let (r1, c1) = attached[0];
        let (r2, c2) = attached[1];
        set_road_link(
            staged,
            r1,
            c1,
            Some(Link::Road {
                road: r2,
                contact: c2,
            }),
        )?;
        set_road_link(
            staged,
            r2,
            c2,
            Some(Link::Road {
                road: r1,
                contact: c1,
            }),
        )?;
    } else {
        for (r, contact) in attached {
            set_road_link(staged, r, contact, None)?;
        }
    }

    staged.remove_junction(id);
    debug!("Dissolved {}, which covered {} splines", id, ranges.len());
    Ok(DissolvedJunction {
        id,
        name: junction.name,
        auto: junction.auto,
        priorities: junction.priorities,
        controllers: junction.controllers,
        ranges,
    })
}
