//! Spatial queries over the zone catalog.
//!
//! This module provides:
//!
//! - **GeoIndex**: point → zone resolution and nearest-zone queries
//! - **ZoneResolution**: how overlapping zone radii are disambiguated
//!
//! Catalogs are small (tens of zones per city), so queries are linear scans over the
//! registry in catalog order. That keeps first-match semantics trivially stable.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;
use crate::zones::{Zone, ZoneRegistry};

/// Strategy used when a point falls inside more than one zone radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneResolution {
    /// First containing zone in registry order.
    #[default]
    FirstMatch,
    /// Containing zone whose center is closest to the point.
    Nearest,
}

#[derive(Debug, Clone)]
pub struct GeoIndex {
    registry: Arc<ZoneRegistry>,
    resolution: ZoneResolution,
}

impl GeoIndex {
    pub fn new(registry: Arc<ZoneRegistry>) -> Self {
        Self::with_resolution(registry, ZoneResolution::default())
    }

    pub fn with_resolution(registry: Arc<ZoneRegistry>, resolution: ZoneResolution) -> Self {
        Self {
            registry,
            resolution,
        }
    }

    pub fn registry(&self) -> &Arc<ZoneRegistry> {
        &self.registry
    }

    pub fn resolution(&self) -> ZoneResolution {
        self.resolution
    }

    /// Resolve the zone whose radius covers `point`, or `None` if no zone does.
    pub fn resolve_zone(&self, point: &GeoPoint) -> Option<&Zone> {
        match self.resolution {
            ZoneResolution::FirstMatch => self
                .registry
                .zones()
                .iter()
                .find(|zone| zone.contains(point)),
            ZoneResolution::Nearest => self
                .registry
                .zones()
                .iter()
                .map(|zone| (zone, zone.center.distance_km(point)))
                .filter(|(zone, dist)| *dist <= zone.radius_km)
                .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal))
                .map(|(zone, _)| zone),
        }
    }

    /// The `k` zones with the smallest center distance to `point`, ascending,
    /// regardless of radius. Equal distances keep registry order.
    pub fn nearest_zones(&self, point: &GeoPoint, k: usize) -> Vec<&Zone> {
        let mut ranked = self
            .registry
            .zones()
            .iter()
            .map(|zone| (zone, zone.center.distance_km(point)))
            .collect::<Vec<_>>();
        ranked.sort_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        ranked.into_iter().take(k).map(|(zone, _)| zone).collect()
    }

    /// Closest zone center to `point`, unbounded by radius.
    pub fn nearest_zone(&self, point: &GeoPoint) -> Option<&Zone> {
        self.registry
            .zones()
            .iter()
            .map(|zone| (zone, zone.center.distance_km(point)))
            .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal))
            .map(|(zone, _)| zone)
    }
}
