use crate::events::PlayerEvent;
use crate::model::ReportAction;

/// Sentinel media id used until a source-selected event arrives. Reports are
/// never sent while this is current.
pub const UNKNOWN_MEDIA_ID: &str = "UnKnown";

/// Heartbeat side effect decided alongside the actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerCommand {
    #[default]
    None,
    /// Cancel the interval.
    Stop,
    /// Cancel the interval and discard it; the next Start schedules a clean one.
    Reset,
    /// Schedule the interval if it is not already running.
    Start,
}

/// Output of one classification step: zero or more actions to report, in
/// order, plus the heartbeat command to apply after they are queued.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Classification {
    pub actions: Vec<ReportAction>,
    pub timer: TimerCommand,
}

impl Classification {
    fn none() -> Self {
        Self::default()
    }

    fn action(action: ReportAction, timer: TimerCommand) -> Self {
        Self {
            actions: vec![action],
            timer,
        }
    }
}

/// Mutable playback session, one instance per active media load. Mutated only
/// through [`SessionState::classify`] and the heartbeat tick in the reporter
/// actor, so every invariant check happens in one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub media_id: String,
    pub file_id: String,
    pub last_known_position_secs: u64,
    pub is_ad_playing: bool,
    pub is_media_finished: bool,
    pub is_first_play: bool,
    pub play_outstanding: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            media_id: UNKNOWN_MEDIA_ID.to_string(),
            file_id: String::new(),
            last_known_position_secs: 0,
            is_ad_playing: false,
            is_media_finished: false,
            is_first_play: true,
            play_outstanding: false,
        }
    }
}

impl SessionState {
    pub fn has_valid_media(&self) -> bool {
        !self.media_id.is_empty() && self.media_id != UNKNOWN_MEDIA_ID
    }

    /// Classifies one inbound lifecycle event: applies the state mutations and
    /// returns the actions to report plus the heartbeat command.
    ///
    /// The suppression rules live here: the first-play gate and the
    /// play-outstanding flag deduplicate PLAY/PAUSE when the player emits
    /// several transitional signals for one logical transition, and
    /// `is_media_finished` swallows the late pause/stop signals some players
    /// fire shortly after "ended".
    pub fn classify(&mut self, event: &PlayerEvent) -> Classification {
        match event {
            PlayerEvent::SourceSelected(selection) => {
                self.media_id = selection.media_id.clone();
                self.file_id = selection.file_id.clone();
                self.last_known_position_secs = selection
                    .start_position
                    .map(|offset| offset.as_secs())
                    .unwrap_or(0);
                self.is_first_play = true;
                self.is_media_finished = false;
                self.play_outstanding = false;
                Classification::action(ReportAction::Load, TimerCommand::None)
            }
            PlayerEvent::PlayRequested => {
                if self.is_media_finished {
                    return Classification::none();
                }
                let mut actions = Vec::new();
                if self.is_first_play {
                    self.play_outstanding = true;
                    actions.push(ReportAction::FirstPlay);
                    actions.push(ReportAction::Hit);
                }
                Classification {
                    actions,
                    timer: TimerCommand::Start,
                }
            }
            PlayerEvent::Playing => {
                self.is_media_finished = false;
                let mut actions = Vec::new();
                if !self.is_first_play && !self.play_outstanding {
                    actions.push(ReportAction::Play);
                    self.play_outstanding = true;
                } else {
                    self.is_first_play = false;
                }
                self.is_ad_playing = false;
                Classification {
                    actions,
                    timer: TimerCommand::None,
                }
            }
            PlayerEvent::Paused => {
                if self.is_media_finished {
                    return Classification::none();
                }
                let mut actions = Vec::new();
                if self.play_outstanding {
                    actions.push(ReportAction::Pause);
                    self.play_outstanding = false;
                }
                Classification {
                    actions,
                    timer: TimerCommand::Stop,
                }
            }
            PlayerEvent::Stopped => {
                if self.is_media_finished {
                    return Classification::none();
                }
                self.is_ad_playing = false;
                Classification::action(ReportAction::Stop, TimerCommand::Reset)
            }
            PlayerEvent::Ended => {
                self.play_outstanding = false;
                self.is_media_finished = true;
                Classification::action(ReportAction::Finish, TimerCommand::Stop)
            }
            PlayerEvent::PlaybackError => {
                Classification::action(ReportAction::Error, TimerCommand::Stop)
            }
            PlayerEvent::Seeked | PlayerEvent::Replay => {
                // Either one means the media position was reset.
                self.is_media_finished = false;
                Classification::none()
            }
            PlayerEvent::PlayheadUpdated { position } => {
                if !self.is_ad_playing && !position.is_zero() {
                    self.last_known_position_secs = position.as_secs();
                }
                Classification::none()
            }
            PlayerEvent::AdContentPause => {
                self.is_ad_playing = true;
                Classification::none()
            }
            PlayerEvent::AdContentResume => {
                self.is_ad_playing = false;
                self.is_media_finished = false;
                Classification::none()
            }
        }
    }
}
