//! Terminal front end. Draws the navigation bar, indicator and time panel as
//! plain text, and turns lines of input into commands.

use crate::{
    state::DisplayState,
    surface::{Bounds, Indicator, ItemIndex, NavItem, Surface},
};
use anyhow::{anyhow, bail, Context};
use itertools::Itertools;
use log::trace;
use std::io::Write;

/// Columns between navigation labels
const GAP: usize = 3;
const INDICATOR_CHAR: char = '‾';
const FAILED_MESSAGE: &str =
    "Failed to load the time. Pick another city to try again.";

/// Draws to any writer. Only redraws when the text actually changed.
pub struct TerminalSurface<W> {
    out: W,
    items: Vec<NavItem>,
    indicator: Indicator,
    state: DisplayState,
    /// Terminal width, in columns. The bar is centered within it.
    width: u16,
    /// Lines currently on screen
    frame: Vec<String>,
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W, items: Vec<NavItem>, width: u16) -> Self {
        Self {
            out,
            items,
            indicator: Indicator::default(),
            state: DisplayState::default(),
            width,
            frame: Vec::new(),
        }
    }

    pub fn set_width(&mut self, width: u16) {
        self.width = width;
    }

    /// Write the current state if it differs from what's on screen. Return
    /// whether anything was written.
    pub fn flush(&mut self) -> anyhow::Result<bool> {
        let next_frame = self.render();
        if next_frame == self.frame {
            return Ok(false);
        }
        trace!("Redrawing: old={:?}; new={:?}", self.frame, next_frame);
        self.frame = next_frame;
        writeln!(self.out)?;
        for line in &self.frame {
            writeln!(self.out, "{line}")?;
        }
        self.out.flush().context("Error writing to terminal")?;
        Ok(true)
    }

    #[cfg(test)]
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    #[cfg(test)]
    pub fn indicator_bounds(&self) -> Bounds {
        self.indicator.bounds
    }

    /// Columns to the left of the first label
    fn margin(&self) -> usize {
        let total = self
            .items
            .iter()
            .map(|item| label_width(&item.label))
            .sum::<usize>()
            + GAP * self.items.len().saturating_sub(1);
        (self.width as usize).saturating_sub(total) / 2
    }

    fn render(&self) -> Vec<String> {
        let margin = " ".repeat(self.margin());
        let labels = self
            .items
            .iter()
            .map(|item| item.label.as_str())
            .join(&" ".repeat(GAP));

        let Bounds { left, width } = self.indicator.bounds;
        let mut indicator = format!(
            "{}{}",
            " ".repeat(left.max(0) as usize),
            INDICATOR_CHAR.to_string().repeat(width.max(0) as usize)
        );
        if self.indicator.transition.is_some() {
            indicator.push_str(" »");
        }

        let mut lines =
            vec![format!("{margin}{labels}"), indicator, String::new()];
        match &self.state {
            DisplayState::Loading { label } => {
                lines.push(format!("Loading time in {label}..."));
            }
            DisplayState::Loaded { label, time } => {
                lines.push(format!("{label}: {}", time.time));
                if let Some(date) = time.date_label() {
                    lines.push(date);
                }
            }
            DisplayState::Failed => {
                lines.push(FAILED_MESSAGE.into());
            }
        }
        lines
    }
}

impl<W: Write> Surface for TerminalSurface<W> {
    fn items(&self) -> &[NavItem] {
        &self.items
    }

    fn set_active(&mut self, index: ItemIndex, active: bool) {
        self.items[index].active = active;
    }

    fn item_bounds(&self, index: ItemIndex) -> Bounds {
        let left = self.margin()
            + self.items[..index]
                .iter()
                .map(|item| label_width(&item.label) + GAP)
                .sum::<usize>();
        Bounds {
            left: left as i32,
            width: label_width(&self.items[index].label) as i32,
        }
    }

    fn indicator(&mut self) -> &mut Indicator {
        &mut self.indicator
    }

    fn show(&mut self, state: &DisplayState) {
        self.state = state.clone();
    }
}

fn label_width(label: &str) -> usize {
    label.chars().count()
}

/// A line of user input
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    Click(ItemIndex),
    Resize(u16),
    Quit,
}

impl Command {
    /// Parse a command. Items can be picked by city id or 1-based position.
    pub fn parse(input: &str, items: &[NavItem]) -> anyhow::Result<Self> {
        let input = input.trim();
        let mut words = input.split_whitespace();
        match (words.next(), words.next(), words.next()) {
            (Some("quit" | "q"), None, None) => Ok(Self::Quit),
            (Some("resize"), Some(width), None) => {
                let width = width
                    .parse()
                    .with_context(|| format!("Invalid width `{width}`"))?;
                Ok(Self::Resize(width))
            }
            (Some(word), None, None) => {
                if let Ok(position) = word.parse::<usize>() {
                    if position == 0 || position > items.len() {
                        bail!("No item {position}, pick 1-{}", items.len());
                    }
                    return Ok(Self::Click(position - 1));
                }
                items
                    .iter()
                    .position(|item| item.city == word)
                    .map(Self::Click)
                    .ok_or_else(|| anyhow!("Unknown city `{word}`"))
            }
            _ => Err(anyhow!("Unrecognized command `{input}`")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_api::CurrentTime;
    use std::time::Duration;

    fn surface(width: u16) -> TerminalSurface<Vec<u8>> {
        let mut items = vec![
            NavItem::new("London", "london"),
            NavItem::new("Tokyo", "tokyo"),
        ];
        items[0].active = true;
        TerminalSurface::new(Vec::new(), items, width)
    }

    #[test]
    fn test_layout_centered() {
        // "London   Tokyo" is 14 wide
        let surface = surface(30);
        assert_eq!(surface.margin(), 8);
        assert_eq!(surface.item_bounds(0), Bounds { left: 8, width: 6 });
        assert_eq!(surface.item_bounds(1), Bounds { left: 17, width: 5 });
    }

    #[test]
    fn test_layout_narrow() {
        let surface = surface(10);
        assert_eq!(surface.margin(), 0);
        assert_eq!(surface.item_bounds(1), Bounds { left: 9, width: 5 });
    }

    #[test]
    fn test_flush_only_on_change() {
        let mut surface = surface(14);
        let bounds = surface.item_bounds(1);
        surface.indicator().bounds = bounds;
        surface.show(&DisplayState::Loaded {
            label: "Tokyo".into(),
            time: CurrentTime::from_time("10:00"),
        });
        assert!(surface.flush().unwrap());
        assert!(!surface.flush().unwrap());

        let output = String::from_utf8(surface.into_inner()).unwrap();
        assert_eq!(
            output,
            "\nLondon   Tokyo\n         ‾‾‾‾‾\n\nTokyo: 10:00\n"
        );
    }

    #[test]
    fn test_render_transition_and_views() {
        let mut surface = surface(14);
        surface.indicator().transition = Some(Duration::from_millis(200));
        surface.indicator().bounds = Bounds { left: 0, width: 2 };
        assert_eq!(surface.render()[1], "‾‾ »");

        surface.show(&DisplayState::Failed);
        assert_eq!(surface.render()[3], FAILED_MESSAGE);
        // The active city can't be re-picked, so point somewhere else
        assert!(FAILED_MESSAGE.contains("another city"));
        surface.show(&DisplayState::Loading {
            label: "London".into(),
        });
        assert_eq!(surface.render()[3], "Loading time in London...");
        assert_eq!(surface.render().len(), 4);
    }

    #[test]
    fn test_parse_commands() {
        let items = surface(80).items;
        assert_eq!(Command::parse("tokyo\n", &items).unwrap(), Command::Click(1));
        assert_eq!(Command::parse("1", &items).unwrap(), Command::Click(0));
        assert_eq!(
            Command::parse("resize 120", &items).unwrap(),
            Command::Resize(120)
        );
        assert_eq!(Command::parse(" q ", &items).unwrap(), Command::Quit);
        assert!(Command::parse("0", &items).is_err());
        assert!(Command::parse("3", &items).is_err());
        assert!(Command::parse("paris", &items).is_err());
        assert!(Command::parse("resize wide", &items).is_err());
        assert!(Command::parse("", &items).is_err());
    }
}
