//! Zone catalog: immutable named catchment areas loaded once at startup.
//!
//! A [ZoneRegistry] is built from a static catalog (the built-in Berlin catalog or a
//! JSON file) and never changes afterwards, so it is shared behind an `Arc` without
//! any locking. Registry order matters: first-match zone resolution walks zones in
//! the order they appear in the catalog.

use std::collections::HashMap;
use std::path::Path;

use h3o::{CellIndex, Resolution};
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::geo::GeoPoint;

pub type ZoneId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    Commercial,
    Residential,
    Transit,
    Airport,
    Nightlife,
    University,
    Tourist,
    Industrial,
    #[default]
    Mixed,
}

/// A static named geographic catchment area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    pub city: String,
    pub center: GeoPoint,
    pub radius_km: f64,
    #[serde(default)]
    pub kind: ZoneKind,
    #[serde(default)]
    pub landmarks: Vec<String>,
}

impl Zone {
    /// True when `point` lies within this zone's radius (great-circle).
    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.center.distance_km(point) <= self.radius_km
    }

    /// H3 cell of the zone center, used for heatmap output.
    pub fn cell(&self, resolution: Resolution) -> Option<CellIndex> {
        self.center.to_cell(resolution)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    zones: Vec<Zone>,
}

/// Immutable catalog of zones in registry order.
#[derive(Debug, Clone, Default)]
pub struct ZoneRegistry {
    zones: Vec<Zone>,
    by_id: HashMap<ZoneId, usize>,
}

impl ZoneRegistry {
    /// Build a registry, rejecting duplicate ids, invalid centers and non-positive radii.
    pub fn new(zones: Vec<Zone>) -> Result<Self, CatalogError> {
        let mut by_id = HashMap::with_capacity(zones.len());
        for (idx, zone) in zones.iter().enumerate() {
            if zone.id.is_empty() {
                return Err(CatalogError::EmptyId { index: idx });
            }
            if !zone.center.is_valid() {
                return Err(CatalogError::InvalidCenter {
                    zone_id: zone.id.clone(),
                    lat: zone.center.lat,
                    lng: zone.center.lng,
                });
            }
            if !(zone.radius_km.is_finite() && zone.radius_km > 0.0) {
                return Err(CatalogError::InvalidRadius {
                    zone_id: zone.id.clone(),
                    radius_km: zone.radius_km,
                });
            }
            if by_id.insert(zone.id.clone(), idx).is_some() {
                return Err(CatalogError::DuplicateId(zone.id.clone()));
            }
        }
        Ok(Self { zones, by_id })
    }

    /// Parse a catalog of the form `{"zones": [...]}`.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::new(file.zones)
    }

    pub fn load_json(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_json_str(&raw)?;
        tracing::info!(path = %path.display(), zones = registry.len(), "loaded zone catalog");
        Ok(registry)
    }

    /// Built-in catalog of Berlin demand zones.
    pub fn berlin() -> Self {
        let zones = BERLIN_ZONES
            .iter()
            .map(|(id, name, lat, lng, radius_km, kind, landmarks)| Zone {
                id: (*id).to_string(),
                name: (*name).to_string(),
                city: "berlin".to_string(),
                center: GeoPoint::new(*lat, *lng),
                radius_km: *radius_km,
                kind: *kind,
                landmarks: landmarks.iter().map(|l| (*l).to_string()).collect(),
            })
            .collect::<Vec<_>>();
        let by_id = zones
            .iter()
            .enumerate()
            .map(|(idx, zone)| (zone.id.clone(), idx))
            .collect();
        Self { zones, by_id }
    }

    pub fn zone(&self, id: &str) -> Option<&Zone> {
        self.by_id.get(id).map(|&idx| &self.zones[idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Zones in registry order.
    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.zones.iter().map(|zone| zone.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

type CatalogRow = (
    &'static str,
    &'static str,
    f64,
    f64,
    f64,
    ZoneKind,
    &'static [&'static str],
);

const BERLIN_ZONES: &[CatalogRow] = &[
    ("ber-mitte", "Mitte", 52.520, 13.405, 1.5, ZoneKind::Commercial, &["Alexanderplatz", "Fernsehturm"]),
    ("ber-hbf", "Hauptbahnhof", 52.525, 13.369, 1.0, ZoneKind::Transit, &["Berlin Hauptbahnhof"]),
    ("ber-potsdamer", "Potsdamer Platz", 52.509, 13.376, 1.0, ZoneKind::Commercial, &["Sony Center", "Mall of Berlin"]),
    ("ber-kreuzberg", "Kreuzberg", 52.497, 13.391, 1.8, ZoneKind::Nightlife, &["Bergmannkiez", "Checkpoint Charlie"]),
    ("ber-friedrichshain", "Friedrichshain", 52.516, 13.454, 1.6, ZoneKind::Nightlife, &["East Side Gallery", "Warschauer Strasse"]),
    ("ber-prenzlauer", "Prenzlauer Berg", 52.538, 13.424, 1.6, ZoneKind::Residential, &["Mauerpark", "Kollwitzplatz"]),
    ("ber-zoo", "Zoologischer Garten", 52.507, 13.332, 1.2, ZoneKind::Tourist, &["Berlin Zoo", "Kurfuerstendamm"]),
    ("ber-charlottenburg", "Charlottenburg", 52.507, 13.304, 1.8, ZoneKind::Residential, &["Schloss Charlottenburg"]),
    ("ber-schoeneberg", "Schoeneberg", 52.484, 13.353, 1.6, ZoneKind::Residential, &["Rathaus Schoeneberg"]),
    ("ber-neukoelln", "Neukoelln", 52.477, 13.442, 1.8, ZoneKind::Mixed, &["Tempelhofer Feld", "Hermannplatz"]),
    ("ber-wedding", "Wedding", 52.549, 13.359, 1.6, ZoneKind::Mixed, &["Leopoldplatz"]),
    ("ber-tegel", "Urban Tech Republic", 52.554, 13.292, 1.5, ZoneKind::University, &["Former Tegel Airport"]),
    ("ber-spandau", "Spandau", 52.535, 13.197, 2.5, ZoneKind::Residential, &["Spandau Citadel"]),
    ("ber-airport", "BER Airport", 52.366, 13.503, 3.0, ZoneKind::Airport, &["Terminal 1", "Terminal 2"]),
    ("ber-adlershof", "Adlershof", 52.431, 13.531, 2.0, ZoneKind::Industrial, &["Science City Adlershof"]),
];
