use std::path::Path;

use serde::Deserialize;

use super::geometry::meters_to_degrees;
use crate::{Error, Meters};

/// Radius searched around a point for street edges and stops
pub const MAX_SEARCH_RADIUS_METERS: Meters = 1000.0;

/// Candidates closer to each other than this are treated as the same
/// distance, so duplicate ways and back edges are always linked together
pub const DUPLICATE_WAY_EPSILON_METERS: Meters = 0.001;

/// Fraction of a segment within which a projection snaps to an endpoint
/// instead of splitting the edge
pub const ENDPOINT_SNAP_EPSILON: f64 = 1e-8;

/// Transit stops linked farther than this get a build annotation
pub const WARNING_DISTANCE_METERS: Meters = 20.0;

/// Linking parameters
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LinkerConfig {
    pub search_radius_m: Meters,
    pub duplicate_way_epsilon_m: Meters,
    pub endpoint_snap_epsilon: f64,
    pub warning_distance_m: Meters,
    /// Connect stops that split an area edge to every vertex of that area
    pub add_extra_edges_to_areas: bool,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            search_radius_m: MAX_SEARCH_RADIUS_METERS,
            duplicate_way_epsilon_m: DUPLICATE_WAY_EPSILON_METERS,
            endpoint_snap_epsilon: ENDPOINT_SNAP_EPSILON,
            warning_distance_m: WARNING_DISTANCE_METERS,
            add_extra_edges_to_areas: true,
        }
    }
}

impl LinkerConfig {
    /// Parses and validates a TOML document; missing keys take their defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML or a value is out of range
    pub fn from_toml_str(source: &str) -> Result<Self, Error> {
        let config: LinkerConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its content is invalid
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!("Failed to read config '{}': {}", path.display(), e),
            )
        })?;
        Self::from_toml_str(&source)
    }

    /// # Errors
    ///
    /// Returns an error naming the first field that is out of range
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.search_radius_m.is_finite() && self.search_radius_m > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "search_radius_m must be positive, got {}",
                self.search_radius_m
            )));
        }
        if !(self.duplicate_way_epsilon_m.is_finite() && self.duplicate_way_epsilon_m > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "duplicate_way_epsilon_m must be positive, got {}",
                self.duplicate_way_epsilon_m
            )));
        }
        if !(0.0..0.5).contains(&self.endpoint_snap_epsilon) {
            return Err(Error::InvalidConfig(format!(
                "endpoint_snap_epsilon must be in [0, 0.5), got {}",
                self.endpoint_snap_epsilon
            )));
        }
        if self.warning_distance_m.is_nan() || self.warning_distance_m < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "warning_distance_m must not be negative, got {}",
                self.warning_distance_m
            )));
        }
        Ok(())
    }

    pub fn search_radius_degrees(&self) -> f64 {
        meters_to_degrees(self.search_radius_m)
    }

    pub fn duplicate_way_epsilon_degrees(&self) -> f64 {
        meters_to_degrees(self.duplicate_way_epsilon_m)
    }
}
