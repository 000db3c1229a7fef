use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ContactPoint;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LaneType {
    Driving,
    Biking,
    Bus,
    Tram,
    Entry,
    Exit,
    OnRamp,
    OffRamp,
    Sidewalk,
    Shoulder,
    Border,
    Parking,
    Median,
    Stop,
    Restricted,
    None,
}

impl LaneType {
    /// Only these lanes get linked through junctions.
    pub fn is_for_moving_vehicles(self) -> bool {
        match self {
            LaneType::Driving => true,
            LaneType::Biking => true,
            LaneType::Bus => true,
            LaneType::Tram => true,
            LaneType::Entry => true,
            LaneType::Exit => true,
            LaneType::OnRamp => true,
            LaneType::OffRamp => true,
            LaneType::Sidewalk => false,
            LaneType::Shoulder => false,
            LaneType::Border => false,
            LaneType::Parking => false,
            LaneType::Median => false,
            LaneType::Stop => false,
            LaneType::Restricted => false,
            LaneType::None => false,
        }
    }
}

/// Width as a cubic polynomial `a + b*ds + c*ds^2 + d*ds^3`, where `ds` is measured from
/// `s_offset` (itself relative to the start of the lane section).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaneWidth {
    pub s_offset: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl LaneWidth {
    pub fn constant(width: f64) -> LaneWidth {
        LaneWidth {
            s_offset: 0.0,
            a: width,
            b: 0.0,
            c: 0.0,
            d: 0.0,
        }
    }

    pub fn at(&self, ds: f64) -> f64 {
        let ds = ds - self.s_offset;
        self.a + self.b * ds + self.c * ds * ds + self.d * ds * ds * ds
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum RoadMarkType {
    None,
    Solid,
    Broken,
    SolidSolid,
    SolidBroken,
    BrokenSolid,
    Curb,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum RoadMarkColor {
    Standard,
    White,
    Yellow,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoadMark {
    pub s_offset: f64,
    pub mark_type: RoadMarkType,
    pub color: RoadMarkColor,
    pub width: f64,
}

/// Lanes are keyed by a signed id: 0 is the center lane, positive ids count outwards on the
/// left, negative ids on the right.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    pub id: i32,
    pub lane_type: LaneType,
    /// Sorted by `s_offset`. Empty for the center lane.
    pub widths: Vec<LaneWidth>,
    pub road_marks: Vec<RoadMark>,
    pub predecessor: Option<i32>,
    pub successor: Option<i32>,
}

impl Lane {
    pub fn new(id: i32, lane_type: LaneType, width: f64) -> Lane {
        Lane {
            id,
            lane_type,
            widths: vec![LaneWidth::constant(width)],
            road_marks: Vec::new(),
            predecessor: None,
            successor: None,
        }
    }

    pub fn center() -> Lane {
        Lane {
            id: 0,
            lane_type: LaneType::None,
            widths: Vec::new(),
            road_marks: Vec::new(),
            predecessor: None,
            successor: None,
        }
    }

    /// Width at `ds` from the start of the lane section, using the last width record starting
    /// before that.
    pub fn width_at(&self, ds: f64) -> f64 {
        let record = self
            .widths
            .iter()
            .rev()
            .find(|w| w.s_offset <= ds)
            .or_else(|| self.widths.first());
        match record {
            Some(w) => w.at(ds).max(0.0),
            None => 0.0,
        }
    }
}

/// A stretch of a road over which the set of lanes doesn't change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaneSection {
    /// Where this section starts along the road
    pub s: f64,
    pub lanes: BTreeMap<i32, Lane>,
}

impl LaneSection {
    /// A section with only the center lane.
    pub fn new(s: f64) -> LaneSection {
        let mut lanes = BTreeMap::new();
        lanes.insert(0, Lane::center());
        LaneSection { s, lanes }
    }

    /// A section with `left` and `right` driving lanes of the same width.
    pub fn driving(left: usize, right: usize, width: f64) -> LaneSection {
        let mut section = LaneSection::new(0.0);
        for idx in 1..=left {
            section.add_lane(Lane::new(idx as i32, LaneType::Driving, width));
        }
        for idx in 1..=right {
            section.add_lane(Lane::new(-(idx as i32), LaneType::Driving, width));
        }
        section
    }

    /// Replaces any lane with the same id.
    pub fn add_lane(&mut self, lane: Lane) {
        self.lanes.insert(lane.id, lane);
    }

    pub fn get(&self, id: i32) -> Option<&Lane> {
        self.lanes.get(&id)
    }

    /// Left lanes, from the center outwards
    pub fn left_lanes(&self) -> Vec<&Lane> {
        self.lanes.range(1..).map(|(_, l)| l).collect()
    }

    /// Right lanes, from the center outwards
    pub fn right_lanes(&self) -> Vec<&Lane> {
        self.lanes.range(..0).rev().map(|(_, l)| l).collect()
    }

    /// Total width of the (left, right) side at `ds` from the start of the section.
    pub fn half_widths(&self, ds: f64) -> (f64, f64) {
        let left = self.left_lanes().into_iter().map(|l| l.width_at(ds)).sum();
        let right = self.right_lanes().into_iter().map(|l| l.width_at(ds)).sum();
        (left, right)
    }

    // Right-hand traffic: right lanes travel along the reference line, left lanes against it.

    /// Lanes that drive into whatever touches the road at `contact`.
    pub fn entry_lanes(&self, contact: ContactPoint) -> Vec<&Lane> {
        match contact {
            ContactPoint::End => self.right_lanes(),
            ContactPoint::Start => self.left_lanes(),
        }
    }

    /// Lanes that drive away from whatever touches the road at `contact`.
    pub fn exit_lanes(&self, contact: ContactPoint) -> Vec<&Lane> {
        match contact {
            ContactPoint::Start => self.right_lanes(),
            ContactPoint::End => self.left_lanes(),
        }
    }
}
