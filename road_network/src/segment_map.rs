use serde::{Deserialize, Serialize};

use crate::{JunctionID, RoadID};

// Keys closer than this are the same key
const KEY_EPSILON: f64 = 1e-9;

/// What owns one stretch of a spline.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Segment {
    Road(RoadID),
    Junction(JunctionID),
}

/// Splits the arc-length range of one spline into segments. Each key starts a segment, which
/// lasts until the next key; the last one lasts until the end of the spline.
///
/// Keys are strictly increasing and the first key is always 0. Violating that is a bug in the
/// caller, so every mutation checks and panics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentMap {
    entries: Vec<(f64, Segment)>,
    length: f64,
}

/// The effects of carving a junction out of a segment map.
#[derive(Clone, Debug, PartialEq)]
pub struct JunctionInsertion {
    /// The junction that now covers the range. This is an existing junction if the new range
    /// overlapped or touched one.
    pub junction: JunctionID,
    /// The final range, after growing over neighbors
    pub start: f64,
    pub end: f64,
    /// Roads covered entirely by the junction
    pub removed_roads: Vec<RoadID>,
    /// A road cut in two by the junction keeps its ID for the first part. The second part needs
    /// a new road: (original, new)
    pub split_roads: Vec<(RoadID, RoadID)>,
    /// Other junctions merged into this one
    pub absorbed_junctions: Vec<JunctionID>,
}

/// The effects of removing a junction from a segment map.
#[derive(Clone, Debug, PartialEq)]
pub struct JunctionRemoval {
    pub start: f64,
    pub end: f64,
    /// The road now covering the junction's old range
    pub road: RoadID,
    /// The road after the junction, merged into the one before it
    pub removed_roads: Vec<RoadID>,
    /// No neighboring road existed, so `road` is new
    pub created_road: bool,
}

impl SegmentMap {
    pub fn new(length: f64) -> SegmentMap {
        assert!(length >= 0.0, "segment map with length {}", length);
        SegmentMap {
            entries: Vec::new(),
            length,
        }
    }

    /// A map covered by one road
    pub fn with_road(length: f64, road: RoadID) -> SegmentMap {
        let mut map = SegmentMap::new(length);
        map.insert(0.0, Segment::Road(road));
        map
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find_key(&self, key: f64) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| (k - key).abs() <= KEY_EPSILON)
    }

    /// Starts a segment at `key`, replacing the segment already starting there.
    pub fn insert(&mut self, key: f64, segment: Segment) {
        assert!(
            key.is_finite() && key >= 0.0,
            "can't insert {:?} at key {}",
            segment,
            key
        );
        if self.entries.is_empty() {
            assert!(
                key == 0.0,
                "the first segment must start at 0, not {} ({:?})",
                key,
                segment
            );
        }
        if let Some(idx) = self.find_key(key) {
            self.entries[idx].1 = segment;
        } else {
            let idx = self.entries.partition_point(|(k, _)| *k < key);
            self.entries.insert(idx, (key, segment));
        }
        self.check_invariants();
    }

    /// Removes the segment starting at `key`. The previous segment grows to cover its range; if
    /// it was the first segment, the next one starts at 0 instead.
    pub fn remove(&mut self, key: f64) -> Option<Segment> {
        let idx = self.find_key(key)?;
        let (_, segment) = self.entries.remove(idx);
        if idx == 0 {
            if let Some(first) = self.entries.first_mut() {
                first.0 = 0.0;
            }
        }
        self.check_invariants();
        Some(segment)
    }

    /// The segment covering `s`. Past the end, this is the last segment.
    pub fn segment_at(&self, s: f64) -> Option<Segment> {
        let idx = self.entries.partition_point(|(k, _)| *k <= s + KEY_EPSILON);
        if idx == 0 {
            return self.entries.first().map(|(_, seg)| *seg);
        }
        Some(self.entries[idx - 1].1)
    }

    pub fn next_key(&self, current: f64) -> Option<f64> {
        self.entries
            .iter()
            .map(|(k, _)| *k)
            .find(|k| *k > current + KEY_EPSILON)
    }

    pub fn to_ordered_list(&self) -> Vec<(f64, Segment)> {
        self.entries.clone()
    }

    /// Every segment with its [start, end) range
    pub fn ranges(&self) -> Vec<(f64, f64, Segment)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(idx, (k, seg))| {
                let end = match self.entries.get(idx + 1) {
                    Some((next, _)) => *next,
                    None => self.length.max(*k),
                };
                (*k, end, *seg)
            })
            .collect()
    }

    pub fn range_of(&self, segment: Segment) -> Option<(f64, f64)> {
        self.ranges()
            .into_iter()
            .find(|(_, _, seg)| *seg == segment)
            .map(|(start, end, _)| (start, end))
    }

    /// The segments just before and after this one
    pub fn neighbors(&self, segment: Segment) -> (Option<Segment>, Option<Segment>) {
        match self.entries.iter().position(|(_, seg)| *seg == segment) {
            Some(idx) => {
                let prev = if idx == 0 {
                    None
                } else {
                    Some(self.entries[idx - 1].1)
                };
                (prev, self.entries.get(idx + 1).map(|(_, seg)| *seg))
            }
            None => (None, None),
        }
    }

    pub fn roads(&self) -> Vec<RoadID> {
        self.entries
            .iter()
            .filter_map(|(_, seg)| match seg {
                Segment::Road(r) => Some(*r),
                Segment::Junction(_) => None,
            })
            .collect()
    }

    pub fn junctions(&self) -> Vec<JunctionID> {
        self.entries
            .iter()
            .filter_map(|(_, seg)| match seg {
                Segment::Road(_) => None,
                Segment::Junction(j) => Some(*j),
            })
            .collect()
    }

    /// Changes the length of the underlying spline. Segments that would start at or beyond the
    /// new end are dropped and returned. The first segment is never dropped.
    pub fn set_length(&mut self, length: f64) -> Vec<(f64, Segment)> {
        assert!(length >= 0.0, "segment map with length {}", length);
        self.length = length;
        let mut dropped = Vec::new();
        while self.entries.len() > 1 {
            let last = self.entries.len() - 1;
            if self.entries[last].0 < length - KEY_EPSILON {
                break;
            }
            dropped.push(self.entries.remove(last));
        }
        dropped.reverse();
        self.check_invariants();
        dropped
    }

    /// Carves out `[start, end]` for a junction. Roads partly covered are trimmed (and split in
    /// two if the junction lands in their middle), roads fully covered are removed. The range
    /// grows to swallow junctions it overlaps or touches, and road remnants shorter than
    /// `min_road_length`, so the map never ends up with slivers of road between junctions.
    pub fn insert_junction<F: FnMut() -> RoadID>(
        &mut self,
        start: f64,
        end: f64,
        junction: JunctionID,
        min_road_length: f64,
        mut alloc_road: F,
    ) -> JunctionInsertion {
        assert!(
            !self.entries.is_empty(),
            "can't insert {} into an empty segment map",
            junction
        );
        let mut start = start.max(0.0);
        let mut end = end.min(self.length);
        assert!(start < end, "empty range [{}, {}] for {}", start, end, junction);

        let ranges = self.ranges();
        loop {
            let mut changed = false;
            for (k, e, seg) in &ranges {
                match seg {
                    Segment::Junction(_) => {
                        if *k <= end + KEY_EPSILON && *e >= start - KEY_EPSILON {
                            if *k < start {
                                start = *k;
                                changed = true;
                            }
                            if *e > end {
                                end = *e;
                                changed = true;
                            }
                        }
                    }
                    Segment::Road(_) => {
                        if *k < end && *e > start {
                            if *k < start && start - *k < min_road_length {
                                start = *k;
                                changed = true;
                            }
                            if *e > end && *e - end < min_road_length {
                                end = *e;
                                changed = true;
                            }
                        }
                    }
                }
            }
            if !changed {
                break;
            }
        }

        let existing: Vec<JunctionID> = ranges
            .iter()
            .filter_map(|(k, e, seg)| match seg {
                Segment::Junction(j) if *k < end - KEY_EPSILON && *e > start + KEY_EPSILON => {
                    Some(*j)
                }
                _ => None,
            })
            .collect();
        let effective = existing.first().cloned().unwrap_or(junction);

        let mut result = JunctionInsertion {
            junction: effective,
            start,
            end,
            removed_roads: Vec::new(),
            split_roads: Vec::new(),
            absorbed_junctions: Vec::new(),
        };
        let mut entries = Vec::new();
        let mut placed = false;
        for (k, e, seg) in ranges {
            if e <= start + KEY_EPSILON {
                entries.push((k, seg));
                continue;
            }
            if k >= end - KEY_EPSILON {
                if !placed {
                    entries.push((start, Segment::Junction(effective)));
                    placed = true;
                }
                entries.push((k, seg));
                continue;
            }

            match seg {
                Segment::Junction(j) => {
                    if !placed {
                        entries.push((start, Segment::Junction(effective)));
                        placed = true;
                    }
                    if j != effective {
                        result.absorbed_junctions.push(j);
                    }
                }
                Segment::Road(r) => {
                    let keeps_before = k < start - KEY_EPSILON;
                    let keeps_after = e > end + KEY_EPSILON;
                    if keeps_before {
                        entries.push((k, seg));
                    }
                    if !placed {
                        entries.push((start, Segment::Junction(effective)));
                        placed = true;
                    }
                    if keeps_after {
                        let id = if keeps_before {
                            let new = alloc_road();
                            result.split_roads.push((r, new));
                            new
                        } else {
                            r
                        };
                        entries.push((end, Segment::Road(id)));
                    }
                    if !keeps_before && !keeps_after {
                        result.removed_roads.push(r);
                    }
                }
            }
        }
        if !placed {
            entries.push((start, Segment::Junction(effective)));
        }

        self.entries = entries;
        self.check_invariants();
        result
    }

    /// Removes a junction's segment, handing its range back to the neighboring roads. If there
    /// are roads on both sides, they merge into the first one.
    pub fn remove_junction<F: FnMut() -> RoadID>(
        &mut self,
        junction: JunctionID,
        mut alloc_road: F,
    ) -> Option<JunctionRemoval> {
        let idx = self
            .entries
            .iter()
            .position(|(_, seg)| *seg == Segment::Junction(junction))?;
        let (start, end, _) = self.ranges()[idx];
        let prev = if idx == 0 {
            None
        } else {
            Some(self.entries[idx - 1].1)
        };
        let next = self.entries.get(idx + 1).map(|(_, seg)| *seg);

        let mut removal = JunctionRemoval {
            start,
            end,
            road: RoadID(0),
            removed_roads: Vec::new(),
            created_road: false,
        };
        match (prev, next) {
            (Some(Segment::Road(before)), Some(Segment::Road(after))) => {
                self.entries.remove(idx + 1);
                self.entries.remove(idx);
                removal.road = before;
                removal.removed_roads.push(after);
            }
            (Some(Segment::Road(before)), _) => {
                self.entries.remove(idx);
                removal.road = before;
            }
            (_, Some(Segment::Road(after))) => {
                self.entries.remove(idx);
                self.entries[idx].0 = start;
                removal.road = after;
            }
            _ => {
                let road = alloc_road();
                self.entries[idx].1 = Segment::Road(road);
                removal.road = road;
                removal.created_road = true;
            }
        }
        self.check_invariants();
        Some(removal)
    }

    pub fn check_invariants(&self) {
        if let Some((first, seg)) = self.entries.first() {
            assert!(
                *first == 0.0,
                "first segment {:?} starts at {}, not 0",
                seg,
                first
            );
        }
        for pair in self.entries.windows(2) {
            assert!(
                pair[0].0 < pair[1].0,
                "segment keys out of order: {:?} then {:?}",
                pair[0],
                pair[1]
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;

    use super::*;

    fn kinds(map: &SegmentMap) -> Vec<(f64, &'static str)> {
        map.to_ordered_list()
            .into_iter()
            .map(|(k, seg)| {
                (
                    k,
                    match seg {
                        Segment::Road(_) => "road",
                        Segment::Junction(_) => "junction",
                    },
                )
            })
            .collect()
    }

    #[test]
    fn junction_in_the_middle_splits_the_road() {
        let mut map = SegmentMap::with_road(100.0, RoadID(1));
        let result = map.insert_junction(40.0, 60.0, JunctionID(7), 0.5, || RoadID(2));
        assert_eq!(
            kinds(&map),
            vec![(0.0, "road"), (40.0, "junction"), (60.0, "road")]
        );
        assert_eq!(result.split_roads, vec![(RoadID(1), RoadID(2))]);
        assert_eq!(map.segment_at(70.0), Some(Segment::Road(RoadID(2))));
        assert_eq!(map.segment_at(50.0), Some(Segment::Junction(JunctionID(7))));
        assert_eq!(map.next_key(40.0), Some(60.0));
        assert_eq!(map.next_key(60.0), None);
    }

    #[test]
    fn fully_covered_road_collapses() {
        let mut map = SegmentMap::with_road(100.0, RoadID(1));
        map.insert(40.0, Segment::Road(RoadID(2)));
        let result = map.insert_junction(0.0, 50.0, JunctionID(7), 0.5, || {
            panic!("nothing should be split")
        });
        assert_eq!(kinds(&map), vec![(0.0, "junction"), (50.0, "road")]);
        assert_eq!(result.removed_roads, vec![RoadID(1)]);
        assert_eq!(map.segment_at(60.0), Some(Segment::Road(RoadID(2))));
    }

    #[test]
    fn touching_junctions_merge() {
        let mut map = SegmentMap::with_road(100.0, RoadID(1));
        map.insert_junction(40.0, 60.0, JunctionID(7), 0.5, || RoadID(2));
        // Leaves only a 0.2 sliver of road between the two junctions
        let result = map.insert_junction(60.2, 70.0, JunctionID(8), 0.5, || RoadID(3));
        assert_eq!(result.junction, JunctionID(7));
        assert_eq!((result.start, result.end), (40.0, 70.0));
        assert_eq!(
            kinds(&map),
            vec![(0.0, "road"), (40.0, "junction"), (70.0, "road")]
        );
        assert_eq!(map.junctions(), vec![JunctionID(7)]);
        assert_eq!(map.roads(), vec![RoadID(1), RoadID(2)]);
    }

    #[test]
    fn junction_at_the_end() {
        let mut map = SegmentMap::with_road(100.0, RoadID(1));
        map.insert_junction(90.0, 100.0, JunctionID(7), 0.5, || RoadID(2));
        assert_eq!(kinds(&map), vec![(0.0, "road"), (90.0, "junction")]);
        assert_eq!(map.range_of(Segment::Junction(JunctionID(7))), Some((90.0, 100.0)));
    }

    #[test]
    fn removing_junctions() {
        let mut map = SegmentMap::with_road(100.0, RoadID(1));
        map.insert_junction(40.0, 60.0, JunctionID(7), 0.5, || RoadID(2));
        let removal = map
            .remove_junction(JunctionID(7), || panic!("roads exist on both sides"))
            .unwrap();
        assert_eq!(removal.road, RoadID(1));
        assert_eq!(removal.removed_roads, vec![RoadID(2)]);
        assert_eq!(kinds(&map), vec![(0.0, "road")]);

        map.insert_junction(0.0, 30.0, JunctionID(8), 0.5, || RoadID(3));
        let removal = map.remove_junction(JunctionID(8), || RoadID(4)).unwrap();
        assert_eq!(removal.road, RoadID(1));
        assert_eq!(map.to_ordered_list(), vec![(0.0, Segment::Road(RoadID(1)))]);

        let mut only_junction = SegmentMap::new(50.0);
        only_junction.insert(0.0, Segment::Junction(JunctionID(9)));
        let removal = only_junction
            .remove_junction(JunctionID(9), || RoadID(5))
            .unwrap();
        assert!(removal.created_road);
        assert_eq!(
            only_junction.to_ordered_list(),
            vec![(0.0, Segment::Road(RoadID(5)))]
        );
        assert!(only_junction.remove_junction(JunctionID(9), || RoadID(6)).is_none());
    }

    #[test]
    fn removing_the_first_key_rekeys() {
        let mut map = SegmentMap::with_road(100.0, RoadID(1));
        map.insert(30.0, Segment::Junction(JunctionID(1)));
        map.insert(50.0, Segment::Road(RoadID(2)));
        assert_eq!(map.remove(0.0), Some(Segment::Road(RoadID(1))));
        assert_eq!(map.to_ordered_list()[0], (0.0, Segment::Junction(JunctionID(1))));
        assert_eq!(map.remove(12.0), None);
    }

    #[test]
    #[should_panic]
    fn first_key_must_be_zero() {
        let mut map = SegmentMap::new(100.0);
        map.insert(5.0, Segment::Road(RoadID(1)));
    }

    #[test]
    fn keys_stay_ordered() {
        let mut rng = XorShiftRng::seed_from_u64(7);
        let mut map = SegmentMap::with_road(200.0, RoadID(0));
        let mut next_id = 1;
        for _ in 0..200 {
            match rng.gen_range(0..4) {
                0 => {
                    let key = rng.gen_range(0.0..200.0);
                    map.insert(key, Segment::Road(RoadID(next_id)));
                    next_id += 1;
                }
                1 => {
                    let keys: Vec<f64> = map.to_ordered_list().into_iter().map(|(k, _)| k).collect();
                    let key = keys[rng.gen_range(0..keys.len())];
                    if map.len() > 1 {
                        map.remove(key);
                    }
                }
                2 => {
                    let start = rng.gen_range(0.0..190.0);
                    let length = rng.gen_range(1.0..20.0);
                    let j = JunctionID(next_id);
                    next_id += 1;
                    let mut alloc_id = next_id;
                    next_id += 1;
                    map.insert_junction(start, start + length, j, 0.5, || {
                        alloc_id += 1;
                        RoadID(alloc_id)
                    });
                    next_id = alloc_id + 1;
                }
                _ => {
                    if let Some(j) = map.junctions().first().cloned() {
                        let mut alloc_id = next_id;
                        map.remove_junction(j, || {
                            alloc_id += 1;
                            RoadID(alloc_id)
                        });
                        next_id = alloc_id + 1;
                    }
                }
            }

            let list = map.to_ordered_list();
            assert_eq!(list[0].0, 0.0);
            for pair in list.windows(2) {
                assert!(pair[0].0 < pair[1].0);
            }
        }
    }
}
