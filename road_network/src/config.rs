use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Tunable parameters of the topology pass. Missing fields in a config file fall back to the
/// defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Distance between samples when looking for crossings.
    pub sample_step: f64,
    /// Crossings on the same spline closer than this along it belong to the same junction.
    pub merge_distance: f64,
    /// Extra room added around a junction, beyond the half-width of the crossing roads.
    pub junction_margin: f64,
    /// Road segments shorter than this aren't left over next to a junction; the junction grows
    /// to swallow them.
    pub min_road_length: f64,
    /// Width of connector lanes when the incoming lane has no width records.
    pub default_lane_width: f64,
}

impl Default for TopologyConfig {
    fn default() -> TopologyConfig {
        TopologyConfig {
            sample_step: 1.0,
            merge_distance: 10.0,
            junction_margin: 1.0,
            min_road_length: 0.5,
            default_lane_width: 3.5,
        }
    }
}

impl TopologyConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<TopologyConfig> {
        let path = path.as_ref();
        let contents = fs_err::read_to_string(path)?;
        let config: TopologyConfig = serde_json::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.sample_step > 0.0) {
            bail!("sample_step must be positive, not {}", self.sample_step);
        }
        if self.merge_distance < 0.0 || self.junction_margin < 0.0 || self.min_road_length < 0.0 {
            bail!("distances in {:?} can't be negative", self);
        }
        if !(self.default_lane_width > 0.0) {
            bail!(
                "default_lane_width must be positive, not {}",
                self.default_lane_width
            );
        }
        Ok(())
    }
}
