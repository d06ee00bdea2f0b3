use crate::time_api::CurrentTime;

/// What the time panel is showing. Only one view is ever visible, so this is
/// an enum rather than three visibility flags.
#[derive(Clone, Debug, PartialEq)]
pub enum DisplayState {
    /// Waiting on a fetch for this city label
    Loading { label: String },
    Loaded { label: String, time: CurrentTime },
    Failed,
}

impl DisplayState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Loading { .. } => "loading",
            Self::Loaded { .. } => "loaded",
            Self::Failed => "failed",
        }
    }

    /// The time string on screen, if any
    pub fn time(&self) -> Option<&str> {
        match self {
            Self::Loaded { time, .. } => Some(&time.time),
            Self::Loading { .. } | Self::Failed => None,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Loading { label } | Self::Loaded { label, .. } => Some(label),
            Self::Failed => None,
        }
    }
}

impl Default for DisplayState {
    fn default() -> Self {
        Self::Loading {
            label: String::new(),
        }
    }
}
