use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{
    Change, ChangeSet, ChangeSummary, Junction, JunctionID, Road, RoadID, Spline, SplineID,
    TopologyError,
};

/// Every road, junction and spline. The caller owns this and hands it to `Topology` for each
/// edit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoadNetwork {
    roads: BTreeMap<RoadID, Road>,
    junctions: BTreeMap<JunctionID, Junction>,
    splines: BTreeMap<SplineID, Spline>,

    next_road: usize,
    next_junction: usize,
    next_spline: usize,
}

impl RoadNetwork {
    pub fn new() -> RoadNetwork {
        RoadNetwork::default()
    }

    pub fn all_roads(&self) -> &BTreeMap<RoadID, Road> {
        &self.roads
    }

    pub fn all_junctions(&self) -> &BTreeMap<JunctionID, Junction> {
        &self.junctions
    }

    pub fn all_splines(&self) -> &BTreeMap<SplineID, Spline> {
        &self.splines
    }

    pub fn maybe_get_r(&self, id: RoadID) -> Option<&Road> {
        self.roads.get(&id)
    }

    pub fn maybe_get_j(&self, id: JunctionID) -> Option<&Junction> {
        self.junctions.get(&id)
    }

    pub fn maybe_get_s(&self, id: SplineID) -> Option<&Spline> {
        self.splines.get(&id)
    }

    pub fn get_r(&self, id: RoadID) -> &Road {
        &self.roads[&id]
    }

    pub fn get_j(&self, id: JunctionID) -> &Junction {
        &self.junctions[&id]
    }

    pub fn get_s(&self, id: SplineID) -> &Spline {
        &self.splines[&id]
    }

    /// Like `maybe_get_r`, but with an error the caller can propagate.
    pub fn try_get_r(&self, id: RoadID) -> Result<&Road> {
        self.roads
            .get(&id)
            .ok_or_else(|| anyhow::Error::new(TopologyError::NotFound(id.to_string())))
    }

    pub fn try_get_j(&self, id: JunctionID) -> Result<&Junction> {
        self.junctions
            .get(&id)
            .ok_or_else(|| anyhow::Error::new(TopologyError::NotFound(id.to_string())))
    }

    pub fn try_get_s(&self, id: SplineID) -> Result<&Spline> {
        self.splines
            .get(&id)
            .ok_or_else(|| anyhow::Error::new(TopologyError::NotFound(id.to_string())))
    }

    /// Adds a fully-formed road, like one from an importer. Replaces any road with the same ID.
    pub fn add_road(&mut self, road: Road) {
        self.next_road = self.next_road.max(road.id.0 + 1);
        self.roads.insert(road.id, road);
    }

    /// Adds a fully-formed junction, like one from an importer.
    pub fn add_junction(&mut self, junction: Junction) {
        self.next_junction = self.next_junction.max(junction.id.0 + 1);
        self.junctions.insert(junction.id, junction);
    }

    pub(crate) fn add_spline(&mut self, spline: Spline) {
        self.next_spline = self.next_spline.max(spline.id.0 + 1);
        self.splines.insert(spline.id, spline);
    }

    pub(crate) fn alloc_road_id(&mut self) -> RoadID {
        let id = RoadID(self.next_road);
        self.next_road += 1;
        id
    }

    pub(crate) fn alloc_junction_id(&mut self) -> JunctionID {
        let id = JunctionID(self.next_junction);
        self.next_junction += 1;
        id
    }

    pub(crate) fn alloc_spline_id(&mut self) -> SplineID {
        let id = SplineID(self.next_spline);
        self.next_spline += 1;
        id
    }

    pub(crate) fn apply_change(&mut self, change: Change) {
        match change {
            Change::PutRoad(road) => self.add_road(road),
            Change::RemoveRoad(id) => {
                self.roads.remove(&id);
            }
            Change::PutJunction(junction) => self.add_junction(junction),
            Change::RemoveJunction(id) => {
                self.junctions.remove(&id);
            }
            Change::PutSpline(spline) => self.add_spline(spline),
            Change::RemoveSpline(id) => {
                self.splines.remove(&id);
            }
        }
    }

    /// Applies every change in order, and summarizes the net effect.
    pub fn apply(&mut self, changes: ChangeSet) -> ChangeSummary {
        let roads_before: BTreeSet<RoadID> = self.roads.keys().cloned().collect();
        let junctions_before: BTreeSet<JunctionID> = self.junctions.keys().cloned().collect();
        let mut touched_roads = BTreeSet::new();
        let mut touched_junctions = BTreeSet::new();
        let mut touched_splines = BTreeSet::new();

        for change in changes.changes {
            match &change {
                Change::PutRoad(r) => {
                    touched_roads.insert(r.id);
                }
                Change::PutJunction(j) => {
                    touched_junctions.insert(j.id);
                }
                Change::PutSpline(s) => {
                    touched_splines.insert(s.id);
                }
                Change::RemoveSpline(id) => {
                    touched_splines.insert(*id);
                }
                Change::RemoveRoad(_) | Change::RemoveJunction(_) => {}
            }
            self.apply_change(change);
        }

        let roads_after: BTreeSet<RoadID> = self.roads.keys().cloned().collect();
        let junctions_after: BTreeSet<JunctionID> = self.junctions.keys().cloned().collect();
        ChangeSummary {
            roads_added: roads_after.difference(&roads_before).cloned().collect(),
            roads_changed: touched_roads
                .iter()
                .filter(|r| roads_before.contains(r) && roads_after.contains(r))
                .cloned()
                .collect(),
            roads_removed: roads_before.difference(&roads_after).cloned().collect(),
            junctions_added: junctions_after
                .difference(&junctions_before)
                .cloned()
                .collect(),
            junctions_changed: touched_junctions
                .iter()
                .filter(|j| junctions_before.contains(j) && junctions_after.contains(j))
                .cloned()
                .collect(),
            junctions_removed: junctions_before
                .difference(&junctions_after)
                .cloned()
                .collect(),
            splines_changed: touched_splines,
        }
    }
}
