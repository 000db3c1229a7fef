use std::collections::BTreeSet;
use std::ops::Deref;

use crate::{Junction, JunctionID, Road, RoadID, RoadNetwork, Spline, SplineID};

/// One modification to the network. `Put` inserts or replaces.
#[derive(Clone, Debug, PartialEq)]
pub enum Change {
    PutRoad(Road),
    RemoveRoad(RoadID),
    PutJunction(Junction),
    RemoveJunction(JunctionID),
    PutSpline(Spline),
    RemoveSpline(SplineID),
}

/// Everything one topology pass wants to do to the network, in order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChangeSet {
    pub changes: Vec<Change>,
}

/// The net effect of applying a ChangeSet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChangeSummary {
    pub roads_added: BTreeSet<RoadID>,
    pub roads_changed: BTreeSet<RoadID>,
    pub roads_removed: BTreeSet<RoadID>,
    pub junctions_added: BTreeSet<JunctionID>,
    pub junctions_changed: BTreeSet<JunctionID>,
    pub junctions_removed: BTreeSet<JunctionID>,
    pub splines_changed: BTreeSet<SplineID>,
}

/// A scratch copy of the network that records every modification. Reads see the modifications
/// made so far. Nothing reaches the real network until the caller applies `finish()`, so a pass
/// that fails halfway leaves no trace.
pub struct Staged {
    scratch: RoadNetwork,
    changes: Vec<Change>,
}

impl Staged {
    pub fn new(network: &RoadNetwork) -> Staged {
        Staged {
            scratch: network.clone(),
            changes: Vec::new(),
        }
    }

    fn record(&mut self, change: Change) {
        self.scratch.apply_change(change.clone());
        self.changes.push(change);
    }

    pub fn put_road(&mut self, road: Road) {
        self.record(Change::PutRoad(road));
    }

    pub fn remove_road(&mut self, id: RoadID) {
        self.record(Change::RemoveRoad(id));
    }

    pub fn put_junction(&mut self, junction: Junction) {
        self.record(Change::PutJunction(junction));
    }

    pub fn remove_junction(&mut self, id: JunctionID) {
        self.record(Change::RemoveJunction(id));
    }

    pub fn put_spline(&mut self, spline: Spline) {
        self.record(Change::PutSpline(spline));
    }

    pub fn remove_spline(&mut self, id: SplineID) {
        self.record(Change::RemoveSpline(id));
    }

    pub fn alloc_road_id(&mut self) -> RoadID {
        self.scratch.alloc_road_id()
    }

    pub fn alloc_junction_id(&mut self) -> JunctionID {
        self.scratch.alloc_junction_id()
    }

    pub fn alloc_spline_id(&mut self) -> SplineID {
        self.scratch.alloc_spline_id()
    }

    pub fn finish(self) -> ChangeSet {
        ChangeSet {
            changes: self.changes,
        }
    }
}

impl Deref for Staged {
    type Target = RoadNetwork;

    fn deref(&self) -> &RoadNetwork {
        &self.scratch
    }
}
