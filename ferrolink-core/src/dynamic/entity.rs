//! Descriptors of dynamically reported entities

use std::fmt;

use geo::Point;
use serde::Deserialize;

use crate::{linking::LinkKind, model::TraverseMode};

/// Stable identity of an entity across polling cycles
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub struct EntityKey {
    pub provider: String,
    pub id: String,
}

impl EntityKey {
    pub fn new(provider: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Car,
    Motorbike,
    KickScooter,
    Bike,
}

impl VehicleType {
    /// Mode whose edges the vehicle can be reached from
    pub fn traverse_mode(self) -> TraverseMode {
        match self {
            VehicleType::Car | VehicleType::Motorbike => TraverseMode::Car,
            VehicleType::KickScooter | VehicleType::Bike => TraverseMode::Bicycle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Vehicle(VehicleType),
    BikeStation { capacity: u32 },
}

impl EntityKind {
    pub fn link_kind(self) -> LinkKind {
        match self {
            EntityKind::Vehicle(_) => LinkKind::RentVehicle,
            EntityKind::BikeStation { .. } => LinkKind::BikeStation,
        }
    }

    pub fn linking_mode(self) -> TraverseMode {
        match self {
            EntityKind::Vehicle(vehicle) => vehicle.traverse_mode(),
            EntityKind::BikeStation { .. } => TraverseMode::Walk,
        }
    }
}

/// One entity as reported by a feed
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDescriptor {
    pub key: EntityKey,
    pub kind: EntityKind,
    pub name: String,
    pub position: Point<f64>,
}

impl EntityDescriptor {
    pub fn vehicle(key: EntityKey, vehicle: VehicleType, position: Point<f64>) -> Self {
        Self {
            name: key.to_string(),
            key,
            kind: EntityKind::Vehicle(vehicle),
            position,
        }
    }

    pub fn bike_station(
        key: EntityKey,
        name: impl Into<String>,
        capacity: u32,
        position: Point<f64>,
    ) -> Self {
        Self {
            key,
            kind: EntityKind::BikeStation { capacity },
            name: name.into(),
            position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicles_link_for_the_mode_they_are_driven_in() {
        assert_eq!(
            EntityKind::Vehicle(VehicleType::Motorbike).linking_mode(),
            TraverseMode::Car
        );
        assert_eq!(
            EntityKind::Vehicle(VehicleType::KickScooter).linking_mode(),
            TraverseMode::Bicycle
        );
        assert_eq!(
            EntityKind::BikeStation { capacity: 10 }.link_kind(),
            LinkKind::BikeStation
        );
    }

    #[test]
    fn vehicle_types_deserialize_from_snake_case() {
        #[derive(Deserialize)]
        struct Entry {
            vehicle: VehicleType,
        }
        let entry: Entry = toml::from_str("vehicle = \"kick_scooter\"").unwrap();
        assert_eq!(entry.vehicle, VehicleType::KickScooter);
    }
}
