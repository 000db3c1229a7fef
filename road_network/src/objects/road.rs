use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use geom::{Pose, Pt2D, ReferenceLine};

use crate::{JunctionID, LaneSection, SplineID, TopologyError};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoadID(pub usize);

impl fmt::Display for RoadID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Road #{}", self.0)
    }
}

/// Which end of a road touches something else.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContactPoint {
    Start,
    End,
}

impl fmt::Display for ContactPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ContactPoint::Start => write!(f, "start"),
            ContactPoint::End => write!(f, "end"),
        }
    }
}

/// What a road continues into at one of its ends.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Link {
    /// Another road, touching it at `contact`
    Road { road: RoadID, contact: ContactPoint },
    Junction(JunctionID),
}

/// A stretch of road with one reference line. Roads are either segments of a spline, connector
/// roads owned by a junction, or supplied as-is by an importer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Road {
    pub id: RoadID,
    pub name: String,
    pub reference_line: ReferenceLine,
    /// Sorted by `s`. The first one starts at 0.
    pub lane_sections: Vec<LaneSection>,
    pub predecessor: Option<Link>,
    pub successor: Option<Link>,

    /// Set when this road is one segment of an editable spline
    pub spline: Option<SplineID>,
    /// Set for connector roads, which belong to exactly one junction
    pub junction: Option<JunctionID>,
}

impl Road {
    pub fn new(id: RoadID, name: String, reference_line: ReferenceLine) -> Road {
        Road {
            id,
            name,
            reference_line,
            lane_sections: Vec::new(),
            predecessor: None,
            successor: None,
            spline: None,
            junction: None,
        }
    }

    pub fn length(&self) -> f64 {
        self.reference_line.total_length()
    }

    pub fn is_connector(&self) -> bool {
        self.junction.is_some()
    }

    /// The predecessor for `Start`, the successor for `End`
    pub fn link(&self, contact: ContactPoint) -> Option<Link> {
        match contact {
            ContactPoint::Start => self.predecessor,
            ContactPoint::End => self.successor,
        }
    }

    pub fn set_link(&mut self, contact: ContactPoint, link: Option<Link>) {
        match contact {
            ContactPoint::Start => {
                self.predecessor = link;
            }
            ContactPoint::End => {
                self.successor = link;
            }
        }
    }

    pub fn endpoint(&self, contact: ContactPoint) -> Result<Pt2D> {
        Ok(self.end_pose(contact)?.pt)
    }

    /// Position and heading at one end, heading along the reference line.
    pub fn end_pose(&self, contact: ContactPoint) -> Result<Pose> {
        let pose = match contact {
            ContactPoint::Start => self.reference_line.start_pose(),
            ContactPoint::End => self.reference_line.end_pose(),
        };
        pose.map_err(|err| {
            anyhow::Error::new(TopologyError::NotFound(format!(
                "reference line of {} ({})",
                self.id, err
            )))
        })
    }

    /// The pose at one end, with the heading pointing into whatever is attached there (for
    /// `incoming`) or away from it.
    pub fn contact_pose(&self, contact: ContactPoint, incoming: bool) -> Result<Pose> {
        let mut pose = self.end_pose(contact)?;
        let along = match contact {
            ContactPoint::Start => !incoming,
            ContactPoint::End => incoming,
        };
        if !along {
            pose.heading = pose.heading.opposite();
        }
        Ok(pose)
    }

    /// The end nearer to some point. Ties go to the start.
    pub fn nearer_contact(&self, pt: Pt2D) -> Result<ContactPoint> {
        let start = self.endpoint(ContactPoint::Start)?.dist_to(pt);
        let end = self.endpoint(ContactPoint::End)?.dist_to(pt);
        Ok(if end < start {
            ContactPoint::End
        } else {
            ContactPoint::Start
        })
    }

    /// The lane section covering one end.
    pub fn end_lane_section(&self, contact: ContactPoint) -> Option<&LaneSection> {
        match contact {
            ContactPoint::Start => self.lane_sections.first(),
            ContactPoint::End => self.lane_sections.last(),
        }
    }

    /// The widest a side of this road gets, measured at the start of each lane section.
    pub fn max_half_width(&self) -> f64 {
        self.lane_sections
            .iter()
            .map(|ls| {
                let (left, right) = ls.half_widths(0.0);
                left.max(right)
            })
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use geom::{Angle, CurvePrimitive};

    use super::*;
    use crate::{Lane, LaneType};

    fn east_road() -> Road {
        let line = ReferenceLine::from_primitives(vec![CurvePrimitive::line(
            0.0,
            Pt2D::new(0.0, 0.0),
            0.0,
            50.0,
        )
        .unwrap()]);
        let mut road = Road::new(RoadID(1), "Main".to_string(), line);
        let mut section = LaneSection::new(0.0);
        section.add_lane(Lane::new(1, LaneType::Driving, 3.0));
        section.add_lane(Lane::new(-1, LaneType::Driving, 3.0));
        section.add_lane(Lane::new(-2, LaneType::Sidewalk, 2.0));
        road.lane_sections.push(section);
        road
    }

    #[test]
    fn contact_headings() {
        let road = east_road();
        let east = Angle::degrees(0.0);
        let west = Angle::degrees(180.0);
        // Driving into something at the end means heading east
        assert!(road
            .contact_pose(ContactPoint::End, true)
            .unwrap()
            .heading
            .approx_eq(east, 1e-6));
        assert!(road
            .contact_pose(ContactPoint::End, false)
            .unwrap()
            .heading
            .approx_eq(west, 1e-6));
        assert!(road
            .contact_pose(ContactPoint::Start, true)
            .unwrap()
            .heading
            .approx_eq(west, 1e-6));
        assert!(road
            .contact_pose(ContactPoint::Start, false)
            .unwrap()
            .heading
            .approx_eq(east, 1e-6));
    }

    #[test]
    fn nearer_contact_and_width() {
        let road = east_road();
        assert_eq!(
            road.nearer_contact(Pt2D::new(45.0, 3.0)).unwrap(),
            ContactPoint::End
        );
        assert_eq!(
            road.nearer_contact(Pt2D::new(-5.0, 0.0)).unwrap(),
            ContactPoint::Start
        );
        assert_eq!(road.max_half_width(), 5.0);
    }

    #[test]
    fn links_by_contact() {
        let mut road = east_road();
        road.set_link(ContactPoint::End, Some(Link::Junction(JunctionID(3))));
        assert_eq!(road.successor, Some(Link::Junction(JunctionID(3))));
        assert_eq!(road.link(ContactPoint::Start), None);
    }
}
