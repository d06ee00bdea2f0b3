//! Glue between the navigation bar and the time API. The session owns all
//! mutable widget state and is driven one event at a time: load, click,
//! resize, timer ticks and fetch completions.

use crate::{
    city::CityTable,
    nav::NavIndicator,
    state::DisplayState,
    surface::{ItemIndex, Surface},
    time_api::{CurrentTime, FetchError},
    timer::{PollHandle, Timers},
};
use log::{debug, error, info, trace, warn};
use std::time::{Duration, Instant};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Payload for the session's timers
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Tick {
    Poll,
    ClearTransition,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FetchPurpose {
    /// First fetch after selecting a city; its result goes on screen
    Load,
    /// Periodic check for whether the time changed
    Poll,
}

/// Attached to every fetch so that a completion can be matched against the
/// session's state when it comes back. Anything issued before the latest
/// refresh is stale.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FetchTag {
    pub city: String,
    pub generation: u64,
    pub purpose: FetchPurpose,
}

/// Starts a fetch without waiting on it. The result must be handed back to
/// [Session::on_fetched] with the same tag.
pub trait Fetcher {
    fn fetch(&mut self, tag: FetchTag, zone: &str);
}

pub struct Session<S, F> {
    cities: CityTable,
    surface: S,
    fetcher: F,
    nav: NavIndicator,
    timers: Timers<Tick>,
    poll: PollHandle,
    poll_interval: Duration,
    display: DisplayState,
    /// City the current generation of fetches is for
    city: Option<String>,
    /// Bumped on every refresh and stop; completions from older generations
    /// are thrown away
    generation: u64,
    /// Time string from the last successful load, which polls compare
    /// against
    baseline: Option<String>,
}

impl<S: Surface, F: Fetcher> Session<S, F> {
    pub fn new(
        cities: CityTable,
        surface: S,
        fetcher: F,
        nav: NavIndicator,
        poll_interval: Duration,
    ) -> Self {
        Self {
            cities,
            surface,
            fetcher,
            nav,
            timers: Timers::default(),
            poll: PollHandle::default(),
            poll_interval,
            display: DisplayState::default(),
            city: None,
            generation: 0,
            baseline: None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    pub fn is_polling(&self) -> bool {
        self.poll.is_running()
    }

    /// When the session next needs [Self::fire_due] to be called
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn on_load(&mut self, now: Instant) {
        info!("Loading");
        self.nav.on_load(&mut self.surface, &mut self.timers, now);
        self.refresh();
    }

    pub fn on_resize(&mut self, now: Instant) {
        self.nav.on_resize(&mut self.surface, &mut self.timers, now);
    }

    /// Handle a click on a navigation item. Clicking the active item does
    /// nothing.
    pub fn on_click(&mut self, index: ItemIndex, now: Instant) {
        if !self
            .nav
            .handle_activation(&mut self.surface, &mut self.timers, now, index)
        {
            trace!("Item {index} is already active");
            return;
        }
        info!("Selected {}", self.surface.items()[index].city);
        self.stop_polling();
        self.refresh();
    }

    /// Run every timer that's due
    pub fn fire_due(&mut self, now: Instant) {
        while let Some((_, tick)) = self.timers.pop_due(now) {
            match tick {
                Tick::Poll => self.poll_tick(),
                Tick::ClearTransition => {
                    self.nav.clear_transition(&mut self.surface)
                }
            }
        }
    }

    /// Handle a finished fetch
    pub fn on_fetched(
        &mut self,
        tag: FetchTag,
        result: Result<CurrentTime, FetchError>,
        now: Instant,
    ) {
        if tag.generation != self.generation
            || self.city.as_deref() != Some(tag.city.as_str())
        {
            debug!(
                "Discarding stale {:?} result for {} (generation {}, current {})",
                tag.purpose, tag.city, tag.generation, self.generation
            );
            return;
        }

        match (tag.purpose, result) {
            (FetchPurpose::Load, Ok(time)) => {
                let label = self.display.label().unwrap_or_default().to_owned();
                self.baseline = Some(time.time.clone());
                self.set_display(DisplayState::Loaded { label, time });
                self.poll.start(
                    &mut self.timers,
                    Tick::Poll,
                    now,
                    self.poll_interval,
                );
            }
            (FetchPurpose::Load, Err(err)) => {
                error!("{err}");
                self.set_display(DisplayState::Failed);
            }
            (FetchPurpose::Poll, Ok(time)) => {
                if self.baseline.as_deref() != Some(time.time.as_str()) {
                    info!(
                        "Time in {} changed from {:?} to {}",
                        tag.city, self.baseline, time.time
                    );
                    self.refresh();
                } else {
                    trace!("Time in {} unchanged", tag.city);
                }
            }
            (FetchPurpose::Poll, Err(err)) => {
                warn!("Error polling time in {}: {err}", tag.city);
            }
        }
    }

    /// Stop polling and ignore anything still in flight
    pub fn shutdown(&mut self) {
        info!("Shutting down");
        self.stop_polling();
        self.generation += 1;
    }

    /// Show the loading view for the active city, then fetch its time. The
    /// poll is only restarted once the fetch succeeds.
    fn refresh(&mut self) {
        let Some(active) = self.surface.active_item() else {
            error!("No active navigation item");
            self.set_display(DisplayState::Failed);
            return;
        };
        let item = &self.surface.items()[active];
        let (label, city) = (item.label.clone(), item.city.clone());

        self.generation += 1;
        self.set_display(DisplayState::Loading { label });
        self.stop_polling();

        let zone = match self.cities.resolve_time_zone(&city) {
            Ok(zone) => zone.to_owned(),
            Err(err) => {
                // Binding checks every city, so this is a programming error
                error!("{err}");
                self.city = None;
                self.set_display(DisplayState::Failed);
                return;
            }
        };
        self.city = Some(city.clone());
        self.fetcher.fetch(
            FetchTag {
                city,
                generation: self.generation,
                purpose: FetchPurpose::Load,
            },
            &zone,
        );
    }

    fn poll_tick(&mut self) {
        let Some(city) = self.city.clone() else {
            return;
        };
        match self.cities.resolve_time_zone(&city) {
            Ok(zone) => {
                let zone = zone.to_owned();
                trace!("Polling time in {zone}");
                self.fetcher.fetch(
                    FetchTag {
                        city,
                        generation: self.generation,
                        purpose: FetchPurpose::Poll,
                    },
                    &zone,
                );
            }
            Err(err) => error!("{err}"),
        }
    }

    fn stop_polling(&mut self) {
        if self.poll.stop(&mut self.timers) {
            debug!("Stopped polling");
        }
    }

    fn set_display(&mut self, state: DisplayState) {
        trace!("Display: {}", state.name());
        self.surface.show(&state);
        self.display = state;
    }
}
