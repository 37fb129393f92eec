use serde::Serialize;
use std::fmt;

/// One discrete analytics action reported to the collection endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportAction {
    Load,
    FirstPlay,
    Play,
    Pause,
    Stop,
    Hit,
    Finish,
    Error,
}

impl ReportAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "LOAD",
            Self::FirstPlay => "FIRST_PLAY",
            Self::Play => "PLAY",
            Self::Pause => "PAUSE",
            Self::Stop => "STOP",
            Self::Hit => "HIT",
            Self::Finish => "FINISH",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for ReportAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionOwner {
    Household,
    User,
}

/// A decided report, queued for asynchronous delivery. Position and finished
/// flag are frozen at decision time; the delivery task never consults player
/// state again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReport {
    pub action: ReportAction,
    pub media_id: String,
    pub file_id: String,
    pub position_secs: u64,
    pub finished: bool,
}

/// Domain events re-broadcast to the host and other plugins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReporterEvent {
    /// The endpoint signaled its concurrency-limit restriction.
    ConcurrencyRestriction,
    /// A report was acknowledged (plain success or restricted).
    ReportSent { action: ReportAction },
}
