//! Plane geometry for road reference lines: points and angles, the analytic curve primitives an
//! OpenDRIVE-style plan view is made of, and the reference lines built by chaining them.

mod angle;
mod bounds;
mod control_curve;
mod curve;
mod error;
mod line;
mod pt;
mod reference_line;

pub use crate::angle::Angle;
pub use crate::bounds::Bounds;
pub use crate::control_curve::ControlCurve;
pub use crate::curve::{CurveKind, CurvePrimitive, ParamRange, Pose};
pub use crate::error::GeometryError;
pub use crate::line::Line;
pub use crate::pt::Pt2D;
pub use crate::reference_line::{NearestPoint, ReferenceLine};

/// Arc-lengths and positions closer than this are considered equal.
pub const EPSILON_DIST: f64 = 1e-9;

/// An Arc with a curvature of exactly zero is evaluated with this curvature instead, so the radius
/// stays finite.
pub const ARC_EPSILON_CURVATURE: f64 = 1e-12;
