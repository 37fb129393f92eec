use std::time::Duration;

/// Media configuration handed over when the host selects a new source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSelection {
    pub media_id: String,
    pub file_id: String,
    /// Resume offset when the host does not start from the beginning.
    pub start_position: Option<Duration>,
}

/// Lifecycle events observed from the host player, player and ad signals in
/// one closed set. Events the reporter does not care about simply have no
/// variant here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    SourceSelected(MediaSelection),
    /// Play was requested; frames are not necessarily flowing yet.
    PlayRequested,
    /// The player resumed producing frames.
    Playing,
    Paused,
    Stopped,
    Ended,
    PlaybackError,
    Seeked,
    Replay,
    PlayheadUpdated { position: Duration },
    /// An ad interrupted content playback.
    AdContentPause,
    /// Content playback resumed after an ad.
    AdContentResume,
}

/// Live position/duration queries against the host player. Implemented by the
/// embedding application; called from the reporter's background task.
pub trait PlayerProbe: Send + Sync {
    fn position(&self) -> Duration;
    fn duration(&self) -> Duration;
}
