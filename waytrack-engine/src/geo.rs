//! Static city lookup table and coordinate helpers.
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::constants::LOG_TARGET_ROUTE;

const BUNDLED_CITIES: &str = include_str!("../assets/cities.json");

const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Coordinate used for any city missing from the table (central Dhaka).
pub const DEFAULT_COORDINATES: Coordinates = Coordinates {
    lat: 23.8103,
    lng: 90.4125,
};

static BUNDLED: Lazy<CityTable> = Lazy::new(CityTable::load_from_static);

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both components are finite and inside the WGS84 ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl Default for Coordinates {
    fn default() -> Self {
        DEFAULT_COORDINATES
    }
}

/// Great-circle distance between two points in kilometres.
#[must_use]
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let d_lat = lat2 - lat1;
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

#[derive(Debug, Clone, Deserialize)]
struct CityEntry {
    name: String,
    lat: f64,
    lng: f64,
    #[serde(default)]
    aliases: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CityTableData {
    #[serde(default)]
    default: Option<Coordinates>,
    #[serde(default)]
    cities: Vec<CityEntry>,
}

/// Fixed mapping from known city names to coordinates.
///
/// Lookups ignore case and surrounding or repeated whitespace. Aliases share
/// the coordinates of their canonical entry.
#[derive(Debug, Clone)]
pub struct CityTable {
    default: Coordinates,
    entries: Vec<(String, Coordinates)>,
    index: HashMap<String, usize>,
}

impl CityTable {
    /// The table compiled into the crate.
    #[must_use]
    pub fn bundled() -> &'static Self {
        &BUNDLED
    }

    /// Parse a table from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe a city table.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let data: CityTableData = serde_json::from_str(json)?;
        Ok(Self::from_data(data))
    }

    fn load_from_static() -> Self {
        Self::from_json(BUNDLED_CITIES).unwrap_or_else(|err| {
            log::error!(target: LOG_TARGET_ROUTE, "bundled city table is unreadable: {err}");
            Self::empty()
        })
    }

    /// A table with no entries; every lookup yields the default coordinate.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            default: DEFAULT_COORDINATES,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn from_data(data: CityTableData) -> Self {
        let mut table = Self::empty();
        if let Some(default) = data.default.filter(Coordinates::is_valid) {
            table.default = default;
        }
        let mut cities: Vec<CityEntry> = data
            .cities
            .into_iter()
            .filter(|entry| {
                Coordinates::new(entry.lat, entry.lng).is_valid()
                    && !normalize_city(&entry.name).is_empty()
            })
            .collect();
        cities.sort_by(|a, b| a.name.trim().cmp(b.name.trim()));

        for (slot, entry) in cities.iter().enumerate() {
            table.entries.push((
                entry.name.trim().to_string(),
                Coordinates::new(entry.lat, entry.lng),
            ));
            table.index.insert(normalize_city(&entry.name), slot);
        }
        // Canonical names win over aliases that collide with them.
        for (slot, entry) in cities.iter().enumerate() {
            for alias in &entry.aliases {
                table.index.entry(normalize_city(alias)).or_insert(slot);
            }
        }
        table
    }

    /// Coordinates for `city`, or `None` when the table has no entry.
    #[must_use]
    pub fn get(&self, city: &str) -> Option<Coordinates> {
        self.index
            .get(&normalize_city(city))
            .and_then(|slot| self.entries.get(*slot))
            .map(|(_, coords)| *coords)
    }

    /// Coordinates for `city`, falling back to the table default.
    #[must_use]
    pub fn lookup(&self, city: &str) -> Coordinates {
        self.get(city).unwrap_or(self.default)
    }

    #[must_use]
    pub fn contains(&self, city: &str) -> bool {
        self.get(city).is_some()
    }

    #[must_use]
    pub const fn default_coordinates(&self) -> Coordinates {
        self.default
    }

    /// Canonical entries sorted by name.
    pub fn cities(&self) -> impl Iterator<Item = (&str, Coordinates)> {
        self.entries.iter().map(|(name, coords)| (name.as_str(), *coords))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Canonical key used to compare city names.
#[must_use]
pub fn normalize_city(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
