//! Everything that derives topology from geometry: finding where splines cross, turning the
//! crossings into junctions, and keeping it all up to date as splines are edited.

pub mod connector;
pub mod grouping;
pub mod intersections;
pub mod junctions;
pub mod lane_links;
mod roads;
pub mod topology;
