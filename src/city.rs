//! Static mapping from the city ids used by navigation items to IANA time
//! zone names

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

/// Built-in cities, in navigation order: (id, zone, label)
const DEFAULT_CITIES: &[(&str, &str, &str)] = &[
    ("cupertino", "America/Los_Angeles", "Cupertino"),
    ("new-york-city", "America/New_York", "New York City"),
    ("london", "Europe/London", "London"),
    ("amsterdam", "Europe/Brussels", "Amsterdam"),
    ("tokyo", "Asia/Tokyo", "Tokyo"),
    ("hong-kong", "Asia/Hong_Kong", "Hong Kong"),
    ("sydney", "Australia/Sydney", "Sydney"),
];

/// A city id that has no zone mapping
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("Unknown city `{0}`")]
pub struct UnknownCityError(pub String);

/// City id → IANA zone name. Immutable once loaded.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(transparent)]
pub struct CityTable {
    zones: IndexMap<String, String>,
}

impl CityTable {
    /// Look up the zone for a city
    pub fn resolve_time_zone(
        &self,
        city: &str,
    ) -> Result<&str, UnknownCityError> {
        self.zones
            .get(city)
            .map(String::as_str)
            .ok_or_else(|| UnknownCityError(city.to_owned()))
    }

    pub fn contains(&self, city: &str) -> bool {
        self.zones.contains_key(city)
    }

    /// City ids, in table order
    pub fn cities(&self) -> impl '_ + Iterator<Item = &str> {
        self.zones.keys().map(String::as_str)
    }

    /// Default display label for a built-in city. Unknown ids get the id
    /// itself.
    pub fn default_label(city: &str) -> String {
        DEFAULT_CITIES
            .iter()
            .find(|(id, _, _)| *id == city)
            .map(|(_, _, label)| (*label).to_owned())
            .unwrap_or_else(|| city.to_owned())
    }
}

impl Default for CityTable {
    fn default() -> Self {
        Self {
            zones: DEFAULT_CITIES
                .iter()
                .map(|(id, zone, _)| ((*id).to_owned(), (*zone).to_owned()))
                .collect(),
        }
    }
}
