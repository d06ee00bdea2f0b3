//! The rendering surface the widget draws on. Everything the widget reads
//! from or writes to the screen goes through [Surface], so the logic on top
//! doesn't care whether it's a terminal or something in memory.

use crate::{
    city::{CityTable, UnknownCityError},
    state::DisplayState,
};
use std::time::Duration;

/// Index of an item in the navigation bar
pub type ItemIndex = usize;

/// One selectable city in the navigation bar
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NavItem {
    pub label: String,
    pub city: String,
    pub active: bool,
}

impl NavItem {
    pub fn new(label: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            city: city.into(),
            active: false,
        }
    }
}

/// Horizontal on-screen geometry, in whatever unit the surface uses
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Bounds {
    pub left: i32,
    pub width: i32,
}

/// The bar under the active item
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Indicator {
    pub bounds: Bounds,
    /// Set while the indicator is animating to new bounds
    pub transition: Option<Duration>,
}

pub trait Surface {
    fn items(&self) -> &[NavItem];

    /// Set or clear the active flag on one item
    fn set_active(&mut self, index: ItemIndex, active: bool);

    /// Current layout of an item. Changes whenever the surface reflows.
    fn item_bounds(&self, index: ItemIndex) -> Bounds;

    fn indicator(&mut self) -> &mut Indicator;

    /// Show exactly one of the loading/loaded/failed views
    fn show(&mut self, state: &DisplayState);

    fn active_item(&self) -> Option<ItemIndex> {
        self.items().iter().position(|item| item.active)
    }

    fn find_city(&self, city: &str) -> Option<ItemIndex> {
        self.items().iter().position(|item| item.city == city)
    }
}

/// Build the initial item list. The item for `active` (or the first item if
/// not given) starts active. Every city must be in the table, so lookups can't
/// fail later on.
pub fn bind_items(
    table: &CityTable,
    entries: impl IntoIterator<Item = NavItem>,
    active: Option<&str>,
) -> Result<Vec<NavItem>, BindError> {
    let mut items: Vec<NavItem> = entries.into_iter().collect();
    if let Some(item) = items.iter().find(|item| !table.contains(&item.city)) {
        return Err(UnknownCityError(item.city.clone()).into());
    }
    let active_index = match active {
        Some(city) => items
            .iter()
            .position(|item| item.city == city)
            .ok_or_else(|| UnknownCityError(city.to_owned()))?,
        None if items.is_empty() => return Err(BindError::Empty),
        None => 0,
    };
    for (index, item) in items.iter_mut().enumerate() {
        item.active = index == active_index;
    }
    Ok(items)
}

#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum BindError {
    #[error("Navigation bar has no items")]
    Empty,
    #[error(transparent)]
    UnknownCity(#[from] UnknownCityError),
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// In-memory surface. Items are laid out left to right, each as wide as
    /// its label plus `gap`.
    #[derive(Debug)]
    pub struct MemorySurface {
        pub items: Vec<NavItem>,
        pub indicator: Indicator,
        pub gap: i32,
        /// Every state shown, in order
        pub shown: Vec<DisplayState>,
        pub indicator_writes: usize,
    }

    impl MemorySurface {
        pub fn new(items: Vec<NavItem>) -> Self {
            Self {
                items,
                indicator: Indicator::default(),
                gap: 2,
                shown: Vec::new(),
                indicator_writes: 0,
            }
        }

        pub fn default_cities() -> Self {
            let table = CityTable::default();
            let entries = table.cities().map(|city| {
                NavItem::new(CityTable::default_label(city), city)
            });
            Self::new(bind_items(&table, entries, None).unwrap())
        }

        pub fn active_count(&self) -> usize {
            self.items.iter().filter(|item| item.active).count()
        }

        pub fn visible(&self) -> Option<&DisplayState> {
            self.shown.last()
        }
    }

    impl Surface for MemorySurface {
        fn items(&self) -> &[NavItem] {
            &self.items
        }

        fn set_active(&mut self, index: ItemIndex, active: bool) {
            self.items[index].active = active;
        }

        fn item_bounds(&self, index: ItemIndex) -> Bounds {
            let left = self.items[..index]
                .iter()
                .map(|item| item.label.len() as i32 + self.gap)
                .sum();
            Bounds {
                left,
                width: self.items[index].label.len() as i32,
            }
        }

        fn indicator(&mut self) -> &mut Indicator {
            self.indicator_writes += 1;
            &mut self.indicator
        }

        fn show(&mut self, state: &DisplayState) {
            self.shown.push(state.clone());
        }
    }

    #[test]
    fn test_bind_default_active() {
        let surface = MemorySurface::default_cities();
        assert_eq!(surface.active_count(), 1);
        assert_eq!(surface.active_item(), Some(0));
        assert_eq!(surface.find_city("sydney"), Some(6));
    }

    #[test]
    fn test_bind_named_active() {
        let table = CityTable::default();
        let items = bind_items(
            &table,
            [NavItem::new("London", "london"), NavItem::new("Tokyo", "tokyo")],
            Some("tokyo"),
        )
        .unwrap();
        assert!(!items[0].active);
        assert!(items[1].active);
    }

    #[test]
    fn test_bind_unknown_city() {
        let table = CityTable::default();
        assert_eq!(
            bind_items(&table, [NavItem::new("Paris", "paris")], None),
            Err(BindError::UnknownCity(UnknownCityError("paris".into())))
        );
        assert_eq!(
            bind_items(&table, [NavItem::new("Tokyo", "tokyo")], Some("lima")),
            Err(BindError::UnknownCity(UnknownCityError("lima".into())))
        );
    }

    #[test]
    fn test_bind_empty() {
        let table = CityTable::default();
        assert_eq!(bind_items(&table, Vec::new(), None), Err(BindError::Empty));
    }

    #[test]
    fn test_memory_layout() {
        let surface = MemorySurface::default_cities();
        assert_eq!(surface.item_bounds(0), Bounds { left: 0, width: 9 });
        // "Cupertino" + gap
        assert_eq!(surface.item_bounds(1), Bounds { left: 11, width: 13 });
    }
}
