use std::{error, fmt};

/// Why a geometric query or edit couldn't be answered.
#[derive(Clone, Debug, PartialEq)]
pub enum GeometryError {
    /// An arc-length outside the domain of the primitive or reference line.
    OutOfRange { s: f64, start: f64, end: f64 },
    /// This kind of primitive has no exact analytic split.
    UnsupportedCut { kind: &'static str },
    /// No primitive covers the requested arc-length, or the reference line is empty.
    NotFound { s: f64 },
    /// The input can't describe a curve, like a single control point or a negative length.
    Degenerate(String),
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GeometryError::OutOfRange { s, start, end } => {
                write!(f, "s = {} is outside [{}, {}]", s, start, end)
            }
            GeometryError::UnsupportedCut { kind } => {
                write!(f, "can't cut a {} primitive exactly", kind)
            }
            GeometryError::NotFound { s } => write!(f, "no primitive covers s = {}", s),
            GeometryError::Degenerate(msg) => write!(f, "degenerate geometry: {}", msg),
        }
    }
}

impl error::Error for GeometryError {}
