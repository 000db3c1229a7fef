//! The topology and geometry engine behind an editable road network. Roads are drawn as splines
//! of control points; wherever two splines cross, a junction is carved out of both, with
//! connector roads and lane links for every way through it.
//!
//! The network is a plain registry (`RoadNetwork`) owned by the caller. `Topology` runs one edit
//! to completion against it, staging every change and applying them all at once at the end.

#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod changes;
mod config;
mod error;
mod make;
mod network;
mod objects;
mod segment_map;

pub use crate::changes::{Change, ChangeSet, ChangeSummary, Staged};
pub use crate::config::TopologyConfig;
pub use crate::error::TopologyError;
pub use crate::make::connector::connector_geometry;
pub use crate::make::grouping::{group_intersections, IntersectionGroup};
pub use crate::make::intersections::{find_crossings, find_intersections, IntersectionRecord};
pub use crate::make::junctions::{JunctionCandidate, RoadEnd};
pub use crate::make::lane_links::{match_lanes, LaneMatch};
pub use crate::make::topology::{PassReport, Topology};
pub use crate::network::RoadNetwork;
pub use crate::objects::junction::{
    Connection, Junction, JunctionController, JunctionID, LaneLink, LaneRef, Priority,
};
pub use crate::objects::lane::{
    Lane, LaneSection, LaneType, LaneWidth, RoadMark, RoadMarkColor, RoadMarkType,
};
pub use crate::objects::road::{ContactPoint, Link, Road, RoadID};
pub use crate::objects::spline::{ControlPointEdit, Spline, SplineID};
pub use crate::segment_map::{JunctionInsertion, JunctionRemoval, Segment, SegmentMap};
