use crate::{
    session::Tick,
    surface::{ItemIndex, Surface},
    timer::Timers,
};
use log::trace;
use std::time::{Duration, Instant};

/// Keeps the indicator bar lined up under the active navigation item
#[derive(Debug)]
pub struct NavIndicator {
    transition: Duration,
}

impl NavIndicator {
    pub const DEFAULT_TRANSITION: Duration = Duration::from_millis(200);

    pub fn new(transition: Duration) -> Self {
        Self { transition }
    }

    /// Move the indicator to match an item's current bounds. With `animate`,
    /// the indicator gets a transition that a single-shot timer clears once
    /// it's done. That timer is not cancelled by a later reposition.
    pub fn reposition(
        &self,
        surface: &mut impl Surface,
        timers: &mut Timers<Tick>,
        now: Instant,
        index: ItemIndex,
        animate: bool,
    ) {
        let bounds = surface.item_bounds(index);
        trace!("Moving indicator to {bounds:?} (animate: {animate})");
        let indicator = surface.indicator();
        if animate {
            indicator.transition = Some(self.transition);
        }
        indicator.bounds = bounds;
        if animate {
            timers.once(Tick::ClearTransition, now, self.transition);
        }
    }

    /// Make `clicked` the active item. Clicking the item that's already
    /// active does nothing. Return whether anything changed.
    pub fn handle_activation(
        &self,
        surface: &mut impl Surface,
        timers: &mut Timers<Tick>,
        now: Instant,
        clicked: ItemIndex,
    ) -> bool {
        if surface.items()[clicked].active {
            return false;
        }
        // Deactivate before activating, so there's only ever one
        if let Some(previous) = surface.active_item() {
            surface.set_active(previous, false);
        }
        surface.set_active(clicked, true);
        self.reposition(surface, timers, now, clicked, true);
        true
    }

    /// Track a layout reflow, without animating
    pub fn on_resize(
        &self,
        surface: &mut impl Surface,
        timers: &mut Timers<Tick>,
        now: Instant,
    ) {
        if let Some(active) = surface.active_item() {
            self.reposition(surface, timers, now, active, false);
        }
    }

    pub fn on_load(
        &self,
        surface: &mut impl Surface,
        timers: &mut Timers<Tick>,
        now: Instant,
    ) {
        self.on_resize(surface, timers, now);
    }

    pub fn clear_transition(&self, surface: &mut impl Surface) {
        surface.indicator().transition = None;
    }
}

impl Default for NavIndicator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TRANSITION)
    }
}
