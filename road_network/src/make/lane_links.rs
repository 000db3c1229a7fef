use crate::{Lane, LaneSection};

/// The lanes of a connector road, and how they line up with the roads on either side.
#[derive(Clone, Debug, PartialEq)]
pub struct LaneMatch {
    /// The connector road's only lane section
    pub section: LaneSection,
    /// (lane on the incoming road, lane on the connector, lane on the outgoing road)
    pub links: Vec<(i32, i32, i32)>,
}

/// Pairs up the lanes driving into a junction with the lanes driving out of it, for one
/// connection. Each entry lane takes the exit lane of the same type with the same ID if there is
/// one, and otherwise the one whose distance from the center (`|id|`) is closest, favoring the
/// first on a tie. Entry lanes without any exit lane of their type are skipped.
///
/// Every match gets a connector lane on the right side, numbered -1, -2, ... in the order of
/// `entry`. Connector lanes keep the road marks of their entry lane only on corners.
pub fn match_lanes(
    entry: &[&Lane],
    exit: &[&Lane],
    corner: bool,
    entry_ds: f64,
    default_width: f64,
) -> LaneMatch {
    // The center lane comes first
    let mut section = LaneSection::new(0.0);
    let mut links = Vec::new();

    for entry_lane in entry {
        if !entry_lane.lane_type.is_for_moving_vehicles() {
            continue;
        }
        let exit_lane = match best_exit(entry_lane, exit) {
            Some(l) => l,
            None => {
                continue;
            }
        };

        let id = -(links.len() as i32 + 1);
        let width = entry_lane.width_at(entry_ds);
        let mut lane = Lane::new(
            id,
            entry_lane.lane_type,
            if width > 0.0 { width } else { default_width },
        );
        lane.predecessor = Some(entry_lane.id);
        lane.successor = Some(exit_lane.id);
        if corner {
            lane.road_marks = entry_lane.road_marks.clone();
        }
        section.add_lane(lane);
        links.push((entry_lane.id, id, exit_lane.id));
    }

    LaneMatch { section, links }
}

fn best_exit<'a>(entry: &Lane, exit: &[&'a Lane]) -> Option<&'a Lane> {
    let distance = |lane: &Lane| (lane.id.abs() - entry.id.abs()).abs();
    let mut best: Option<&'a Lane> = None;
    for candidate in exit.iter().filter(|l| l.lane_type == entry.lane_type) {
        if candidate.id == entry.id {
            return Some(*candidate);
        }
        if best
            .map(|b| distance(*candidate) < distance(b))
            .unwrap_or(true)
        {
            best = Some(*candidate);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    use super::*;
    use crate::{LaneType, RoadMark, RoadMarkColor, RoadMarkType};

    fn lanes(ids: &[i32], lane_type: LaneType) -> Vec<Lane> {
        ids.iter().map(|id| Lane::new(*id, lane_type, 3.0)).collect()
    }

    #[test]
    fn exact_id_wins_regardless_of_order() {
        let entry = lanes(&[3], LaneType::Driving);
        let mut exit = lanes(&[1, 2, 3, 4], LaneType::Driving);
        let mut rng = XorShiftRng::seed_from_u64(3);
        for _ in 0..10 {
            exit.shuffle(&mut rng);
            let entry_refs: Vec<&Lane> = entry.iter().collect();
            let exit_refs: Vec<&Lane> = exit.iter().collect();
            let result = match_lanes(&entry_refs, &exit_refs, false, 0.0, 3.5);
            assert_eq!(result.links, vec![(3, -1, 3)]);
        }
    }

    #[test]
    fn closest_by_distance_from_center() {
        // Entering at the end of one road (right lanes), leaving at the end of another (left
        // lanes)
        let entry = lanes(&[-1, -2], LaneType::Driving);
        let exit = lanes(&[1, 2, 3], LaneType::Driving);
        let entry_refs: Vec<&Lane> = entry.iter().collect();
        let exit_refs: Vec<&Lane> = exit.iter().collect();
        let result = match_lanes(&entry_refs, &exit_refs, false, 0.0, 3.5);
        assert_eq!(result.links, vec![(-1, -1, 1), (-2, -2, 2)]);

        let connector_lane = result.section.get(-2).unwrap();
        assert_eq!(connector_lane.predecessor, Some(-2));
        assert_eq!(connector_lane.successor, Some(2));
        assert!(result.section.get(0).is_some());
    }

    #[test]
    fn ties_favor_the_first_candidate() {
        let entry = lanes(&[-2], LaneType::Driving);
        let exit = lanes(&[1, 3], LaneType::Driving);
        let entry_refs: Vec<&Lane> = entry.iter().collect();
        let exit_refs: Vec<&Lane> = exit.iter().collect();
        let result = match_lanes(&entry_refs, &exit_refs, false, 0.0, 3.5);
        assert_eq!(result.links, vec![(-2, -1, 1)]);
    }

    #[test]
    fn types_must_match() {
        let mut entry = lanes(&[-1], LaneType::Driving);
        entry.push(Lane::new(-2, LaneType::Biking, 1.5));
        entry.push(Lane::new(-3, LaneType::Sidewalk, 2.0));
        let mut exit = lanes(&[-1], LaneType::Bus);
        exit.push(Lane::new(-2, LaneType::Biking, 1.5));
        exit.push(Lane::new(-3, LaneType::Sidewalk, 2.0));
        let entry_refs: Vec<&Lane> = entry.iter().collect();
        let exit_refs: Vec<&Lane> = exit.iter().collect();
        let result = match_lanes(&entry_refs, &exit_refs, false, 0.0, 3.5);
        // Driving has nowhere to go, and sidewalks aren't linked
        assert_eq!(result.links, vec![(-2, -1, -2)]);
        assert_eq!(result.section.get(-1).unwrap().lane_type, LaneType::Biking);
        assert_eq!(result.section.get(-1).unwrap().width_at(0.0), 1.5);
    }

    #[test]
    fn road_marks_only_on_corners() {
        let mut entry = lanes(&[-1], LaneType::Driving);
        entry[0].road_marks.push(RoadMark {
            s_offset: 0.0,
            mark_type: RoadMarkType::Solid,
            color: RoadMarkColor::White,
            width: 0.12,
        });
        let exit = lanes(&[-1], LaneType::Driving);
        let entry_refs: Vec<&Lane> = entry.iter().collect();
        let exit_refs: Vec<&Lane> = exit.iter().collect();

        let straight = match_lanes(&entry_refs, &exit_refs, false, 0.0, 3.5);
        assert!(straight.section.get(-1).unwrap().road_marks.is_empty());
        let corner = match_lanes(&entry_refs, &exit_refs, true, 0.0, 3.5);
        assert_eq!(corner.section.get(-1).unwrap().road_marks.len(), 1);
    }
}
