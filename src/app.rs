//! The event loop. Everything that can happen (input, finished fetches,
//! Ctrl-C) arrives as an [Event] on one channel, and the loop handles events
//! one at a time. Timers are handled by sleeping on the channel until the next
//! deadline.

use crate::{
    config::Config,
    nav::NavIndicator,
    session::{FetchTag, Fetcher, Session},
    surface::Surface,
    terminal::{Command, TerminalSurface},
    time_api::{CurrentTime, FetchError, TimeApi},
};
use log::{debug, info, warn};
use std::{
    io::{BufRead, Write},
    sync::{
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
        Arc,
    },
    thread,
    time::Instant,
};

#[derive(Debug, PartialEq)]
pub enum Event {
    Input(Command),
    Fetched(FetchTag, Result<CurrentTime, FetchError>),
    Quit,
}

/// Runs each fetch on its own thread and posts the result back to the loop
pub struct ThreadFetcher {
    api: Arc<dyn TimeApi>,
    events: Sender<Event>,
}

impl Fetcher for ThreadFetcher {
    fn fetch(&mut self, tag: FetchTag, zone: &str) {
        let api = Arc::clone(&self.api);
        let events = self.events.clone();
        let zone = zone.to_owned();
        thread::spawn(move || {
            let result = api.fetch_current_time(&zone);
            // The loop may have exited while we were waiting, in which case
            // nobody cares about the result
            if events.send(Event::Fetched(tag, result)).is_err() {
                debug!("Dropping fetch result for {zone}, loop is gone");
            }
        });
    }
}

pub struct App<W> {
    session: Session<TerminalSurface<W>, ThreadFetcher>,
    sender: Sender<Event>,
    events: Receiver<Event>,
}

impl<W: Write> App<W> {
    pub fn new(
        config: &Config,
        api: Arc<dyn TimeApi>,
        out: W,
    ) -> anyhow::Result<Self> {
        let items = config.nav_items()?;
        let (sender, events) = mpsc::channel();
        let fetcher = ThreadFetcher {
            api,
            events: sender.clone(),
        };
        let session = Session::new(
            config.cities.clone(),
            TerminalSurface::new(out, items, config.width),
            fetcher,
            NavIndicator::new(config.transition()),
            config.poll_interval(),
        );
        Ok(Self {
            session,
            sender,
            events,
        })
    }

    /// Handle for posting events from other threads
    pub fn sender(&self) -> Sender<Event> {
        self.sender.clone()
    }

    pub fn session(&self) -> &Session<TerminalSurface<W>, ThreadFetcher> {
        &self.session
    }

    /// Read commands from `input` on a background thread. End of input quits.
    pub fn spawn_input(&self, input: impl 'static + BufRead + Send) {
        let items = self.session.surface().items().to_vec();
        let sender = self.sender();
        thread::spawn(move || {
            for line in input.lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        warn!("Error reading input: {err}");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match Command::parse(&line, &items) {
                    Ok(command) => {
                        if sender.send(Event::Input(command)).is_err() {
                            return;
                        }
                    }
                    Err(err) => warn!("{err:#}"),
                }
            }
            let _ = sender.send(Event::Quit);
        });
    }

    /// Run until told to quit. The poll is cancelled on the way out.
    pub fn run(&mut self) -> anyhow::Result<()> {
        self.start()?;
        while self.step()? {}
        self.session.shutdown();
        Ok(())
    }

    /// Initial load
    fn start(&mut self) -> anyhow::Result<()> {
        info!("Starting");
        self.session.on_load(Instant::now());
        self.session.surface_mut().flush()?;
        Ok(())
    }

    /// Wait for the next event or timer, handle it and redraw. Return `false`
    /// once it's time to quit.
    fn step(&mut self) -> anyhow::Result<bool> {
        let event = match self.session.next_deadline() {
            Some(deadline) => {
                let timeout =
                    deadline.saturating_duration_since(Instant::now());
                match self.events.recv_timeout(timeout) {
                    Ok(event) => Some(event),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => return Ok(false),
                }
            }
            None => match self.events.recv() {
                Ok(event) => Some(event),
                Err(_) => return Ok(false),
            },
        };

        let now = Instant::now();
        match event {
            None => {}
            Some(Event::Input(Command::Click(index))) => {
                self.session.on_click(index, now)
            }
            Some(Event::Input(Command::Resize(width))) => {
                self.session.surface_mut().set_width(width);
                self.session.on_resize(now);
            }
            Some(Event::Input(Command::Quit) | Event::Quit) => {
                return Ok(false)
            }
            Some(Event::Fetched(tag, result)) => {
                self.session.on_fetched(tag, result, now)
            }
        }
        self.session.fire_due(Instant::now());
        self.session.surface_mut().flush()?;
        Ok(true)
    }
}
