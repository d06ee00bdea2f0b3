use crate::{
    city::CityTable,
    nav::NavIndicator,
    session::DEFAULT_POLL_INTERVAL,
    surface::{bind_items, NavItem},
    time_api::HttpTimeApi,
};
use anyhow::{bail, Context};
use log::info;
use serde::Deserialize;
use std::{fs::File, io, path::Path, time::Duration};

/// App configuration. Every field is optional; missing fields (or a missing
/// file) get the defaults.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub api_host: String,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub transition_ms: u64,
    pub cities: CityTable,
    /// Navigation items, in order. Defaults to one item per city.
    pub nav: Option<Vec<NavEntry>>,
    /// City that starts active. Defaults to the first item.
    pub active: Option<String>,
    /// Initial terminal width, in columns
    pub width: u16,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NavEntry {
    pub label: String,
    pub city: String,
}

impl Config {
    const PATH: &'static str = "./config.json";

    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Self::PATH)
    }

    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        info!("Loading config from `{}`", path.display());
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!("No config at `{}`, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("Error opening config file {}", path.display())
                })
            }
        };
        let config: Self = serde_json::from_reader(file).with_context(|| {
            format!("Error parsing config file {}", path.display())
        })?;
        config.validate().with_context(|| {
            format!("Invalid config file {}", path.display())
        })?;
        Ok(config)
    }

    /// Reject values that would stall the event loop or every request
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_interval_ms == 0 {
            bail!("`poll_interval_ms` must be greater than 0");
        }
        if self.request_timeout_ms == 0 {
            bail!("`request_timeout_ms` must be greater than 0");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn transition(&self) -> Duration {
        Duration::from_millis(self.transition_ms)
    }

    /// Build the navigation items, checking every city against the table
    pub fn nav_items(&self) -> anyhow::Result<Vec<NavItem>> {
        let entries: Vec<NavItem> = match &self.nav {
            Some(entries) => entries
                .iter()
                .map(|entry| NavItem::new(&entry.label, &entry.city))
                .collect(),
            None => self
                .cities
                .cities()
                .map(|city| NavItem::new(CityTable::default_label(city), city))
                .collect(),
        };
        bind_items(&self.cities, entries, self.active.as_deref())
            .context("Error binding navigation bar")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_host: HttpTimeApi::DEFAULT_HOST.to_owned(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            request_timeout_ms: HttpTimeApi::DEFAULT_TIMEOUT.as_millis() as u64,
            transition_ms: NavIndicator::DEFAULT_TRANSITION.as_millis() as u64,
            cities: CityTable::default(),
            nav: None,
            active: None,
            width: 80,
        }
    }
}
