use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use geom::{ControlCurve, Pt2D, ReferenceLine};

use crate::{JunctionID, LaneSection, Link, RoadID, Segment, SegmentMap, TopologyError};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SplineID(pub usize);

impl fmt::Display for SplineID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Spline #{}", self.0)
    }
}

/// A change to the control points of a spline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ControlPointEdit {
    /// Insert before `index`; `index` may be the number of points to append.
    Add { index: usize, pt: Pt2D },
    Move { index: usize, pt: Pt2D },
    Remove { index: usize },
}

/// An editable road, drawn as control points. Its reference line is split into alternating road
/// and junction segments by the segment map; each road segment is a `Road` in the network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spline {
    pub id: SplineID,
    pub name: String,
    control_points: Vec<Pt2D>,
    corner_radius: f64,
    pub reference_line: ReferenceLine,
    pub segments: SegmentMap,
    /// Every road segment gets a copy of this.
    pub lane_profile: LaneSection,
    /// What the start of the spline links to outside of it
    pub predecessor: Option<Link>,
    /// What the end of the spline links to outside of it
    pub successor: Option<Link>,
}

impl Spline {
    /// The segment map starts out empty; fill it in before the spline's roads are created.
    pub fn new(
        id: SplineID,
        name: String,
        control_points: Vec<Pt2D>,
        corner_radius: f64,
        lane_profile: LaneSection,
    ) -> Result<Spline> {
        let curve = ControlCurve::new(control_points, corner_radius)?;
        let reference_line = curve.to_reference_line()?;
        let length = reference_line.total_length();
        Ok(Spline {
            id,
            name,
            control_points: curve.points().to_vec(),
            corner_radius,
            reference_line,
            segments: SegmentMap::new(length),
            lane_profile,
            predecessor: None,
            successor: None,
        })
    }

    pub fn control_points(&self) -> &[Pt2D] {
        &self.control_points
    }

    pub fn corner_radius(&self) -> f64 {
        self.corner_radius
    }

    pub fn length(&self) -> f64 {
        self.reference_line.total_length()
    }

    /// Changes the control points and rebuilds the reference line. Segments starting beyond the
    /// new end are dropped from the segment map and returned. On error, nothing changes.
    pub fn apply_edit(&mut self, edit: &ControlPointEdit) -> Result<Vec<(f64, Segment)>> {
        let mut points = self.control_points.clone();
        match edit {
            ControlPointEdit::Add { index, pt } => {
                if *index > points.len() {
                    bail!(self.missing_point(*index));
                }
                points.insert(*index, *pt);
            }
            ControlPointEdit::Move { index, pt } => {
                match points.get_mut(*index) {
                    Some(existing) => {
                        *existing = *pt;
                    }
                    None => bail!(self.missing_point(*index)),
                }
            }
            ControlPointEdit::Remove { index } => {
                if *index >= points.len() {
                    bail!(self.missing_point(*index));
                }
                if points.len() <= 2 {
                    bail!("{} needs at least 2 control points", self.id);
                }
                points.remove(*index);
            }
        }

        let curve = ControlCurve::new(points, self.corner_radius)?;
        self.reference_line = curve.to_reference_line()?;
        self.control_points = curve.points().to_vec();
        Ok(self.segments.set_length(self.reference_line.total_length()))
    }

    fn missing_point(&self, index: usize) -> TopologyError {
        TopologyError::NotFound(format!(
            "control point {} of {} (has {})",
            index,
            self.id,
            self.control_points.len()
        ))
    }

    /// The widest side of the lane profile.
    pub fn max_half_width(&self) -> f64 {
        let (left, right) = self.lane_profile.half_widths(0.0);
        left.max(right)
    }

    pub fn roads(&self) -> Vec<RoadID> {
        self.segments.roads()
    }

    pub fn junctions(&self) -> Vec<JunctionID> {
        self.segments.junctions()
    }
}
