use std::{error, fmt};

use geom::GeometryError;

use crate::{JunctionID, RoadID};

/// Failures of the topology engine that callers may want to tell apart. These travel inside
/// `anyhow::Error`; recover them with `downcast_ref::<TopologyError>()`.
#[derive(Clone, Debug, PartialEq)]
pub enum TopologyError {
    /// A road, junction, spline, lane or control point couldn't be resolved.
    NotFound(String),
    /// A reference line couldn't be split where an edit needed it.
    UnsupportedCut(String),
    /// A pass found overlapping junction candidates. Nothing was applied; the caller has to
    /// resolve this manually.
    AmbiguousMerge(String),
    /// A connection ended up without any lane links.
    InvalidConnection {
        junction: JunctionID,
        incoming: RoadID,
        outgoing: RoadID,
    },
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TopologyError::NotFound(what) => write!(f, "{} not found", what),
            TopologyError::UnsupportedCut(what) => write!(f, "can't cut {}", what),
            TopologyError::AmbiguousMerge(what) => write!(f, "ambiguous merge: {}", what),
            TopologyError::InvalidConnection {
                junction,
                incoming,
                outgoing,
            } => write!(
                f,
                "connection from {} to {} in {} has no lane links",
                incoming, outgoing, junction
            ),
        }
    }
}

impl error::Error for TopologyError {}

impl TopologyError {
    /// A failed cut becomes `UnsupportedCut`, so callers can tell it apart. Other geometry
    /// errors pass through with some context.
    pub(crate) fn from_geometry(err: GeometryError, context: String) -> anyhow::Error {
        match err {
            GeometryError::UnsupportedCut { .. } => anyhow::Error::new(
                TopologyError::UnsupportedCut(format!("{} ({})", context, err)),
            ),
            _ => anyhow::Error::new(err).context(context),
        }
    }
}
