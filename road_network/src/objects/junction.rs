use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use geom::Pt2D;

use crate::{ContactPoint, RoadID};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JunctionID(pub usize);

impl fmt::Display for JunctionID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Junction #{}", self.0)
    }
}

/// Where roads meet. Every way through the junction is a Connection, realized by a short
/// connector road that only this junction uses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Junction {
    pub id: JunctionID,
    pub name: String,
    /// Synthesized by the topology pass, rather than created by the user. Only these are
    /// regenerated when roads change.
    pub auto: bool,
    pub center: Pt2D,
    pub connections: Vec<Connection>,
    pub priorities: Vec<Priority>,
    pub controllers: Vec<JunctionController>,
}

impl Junction {
    pub fn connector_roads(&self) -> BTreeSet<RoadID> {
        self.connections.iter().map(|c| c.connecting_road).collect()
    }

    /// Roads entering or leaving the junction, excluding connectors.
    pub fn arm_roads(&self) -> BTreeSet<RoadID> {
        let mut roads = BTreeSet::new();
        for c in &self.connections {
            roads.insert(c.incoming_road);
            roads.insert(c.outgoing_road);
        }
        roads
    }

    /// Is there a connection between these two roads, either way?
    pub fn connects(&self, r1: RoadID, r2: RoadID) -> bool {
        self.connections.iter().any(|c| {
            (c.incoming_road == r1 && c.outgoing_road == r2)
                || (c.incoming_road == r2 && c.outgoing_road == r1)
        })
    }
}

/// One way through a junction, from an incoming road to an outgoing road.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Unique within the junction
    pub id: usize,
    pub incoming_road: RoadID,
    /// The end of the incoming road touching the junction
    pub incoming_contact: ContactPoint,
    pub connecting_road: RoadID,
    /// The end of the connecting road attached to the incoming road
    pub contact_point: ContactPoint,
    pub outgoing_road: RoadID,
    pub outgoing_contact: ContactPoint,
    pub lane_links: Vec<LaneLink>,
    /// Connects angularly adjacent arms. Lane markings are kept on these.
    pub corner: bool,
}

/// Points at one lane of one road.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LaneRef {
    pub road: RoadID,
    pub lane: i32,
}

/// A lane of the incoming road, linked to a lane of the connecting road.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct LaneLink {
    pub from: i32,
    pub to: i32,
    pub from_lane: LaneRef,
    pub to_lane: LaneRef,
}

/// Traffic on `high` has priority over traffic on `low`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct Priority {
    pub high: RoadID,
    pub low: RoadID,
}

/// A reference to signal control, owned by some external system.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct JunctionController {
    pub id: usize,
    pub control_type: String,
    pub sequence: Option<usize>,
}
