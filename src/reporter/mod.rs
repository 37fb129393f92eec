use crate::collector::{ActionAddOutcome, CollectorClient, CollectorError};
use crate::config::ReporterConfig;
use crate::events::{PlayerEvent, PlayerProbe};
use crate::heartbeat::Heartbeat;
use crate::model::{OutboundReport, ReportAction, ReporterEvent};
use crate::session::{SessionState, TimerCommand};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Position past this share of the duration counts as watched to the end.
/// Covers streams that tear down without ever firing an explicit "ended".
const MEDIA_ENDED_THRESHOLD: f64 = 0.98;

const EVENT_BUS_CAPACITY: usize = 64;

/// The playback analytics reporter. Spawning it starts two tasks: the session
/// actor that owns all mutable state (player events and heartbeat ticks are
/// serialized through its select loop) and the delivery task draining the
/// report queue. Dropping the reporter aborts both; no timer outlives it.
#[derive(Debug)]
pub struct Reporter {
    events_tx: mpsc::UnboundedSender<PlayerEvent>,
    bus: broadcast::Sender<ReporterEvent>,
    actor_task: JoinHandle<()>,
    delivery_task: JoinHandle<()>,
}

impl Reporter {
    /// Refuses to spawn when the config disables reporting (missing base url
    /// or non-positive partner id); the host then attaches no listener at all.
    pub fn spawn(
        config: &ReporterConfig,
        probe: Arc<dyn PlayerProbe>,
    ) -> Result<Self, CollectorError> {
        let client = CollectorClient::from_config(config)?;
        let (bus, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        let (report_tx, report_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let actor = SessionActor::new(probe, config.hit_interval(), report_tx);
        let actor_task = tokio::spawn(actor.run(events_rx));
        let delivery_task = tokio::spawn(run_delivery(client, report_rx, bus.clone()));

        Ok(Self {
            events_tx,
            bus,
            actor_task,
            delivery_task,
        })
    }

    /// Sender the host wires its event bus into. Sending never blocks.
    pub fn handle(&self) -> mpsc::UnboundedSender<PlayerEvent> {
        self.events_tx.clone()
    }

    /// Subscribes to the reporter's domain events (restriction, report-sent).
    pub fn subscribe(&self) -> broadcast::Receiver<ReporterEvent> {
        self.bus.subscribe()
    }

    pub fn shutdown(&self) {
        self.actor_task.abort();
        self.delivery_task.abort();
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

enum Step {
    Event(Option<PlayerEvent>),
    Tick,
}

/// Single owner of the session state and the heartbeat interval.
struct SessionActor {
    state: SessionState,
    heartbeat: Heartbeat,
    probe: Arc<dyn PlayerProbe>,
    report_tx: mpsc::UnboundedSender<OutboundReport>,
}

impl SessionActor {
    fn new(
        probe: Arc<dyn PlayerProbe>,
        hit_interval: std::time::Duration,
        report_tx: mpsc::UnboundedSender<OutboundReport>,
    ) -> Self {
        Self {
            state: SessionState::default(),
            heartbeat: Heartbeat::new(hit_interval),
            probe,
            report_tx,
        }
    }

    async fn run(mut self, mut events_rx: mpsc::UnboundedReceiver<PlayerEvent>) {
        loop {
            let step = tokio::select! {
                event = events_rx.recv() => Step::Event(event),
                _ = self.heartbeat.tick() => Step::Tick,
            };
            match step {
                Step::Event(Some(event)) => self.on_event(event),
                Step::Event(None) => break,
                Step::Tick => self.on_tick(),
            }
        }
        self.heartbeat.stop();
    }

    fn on_event(&mut self, event: PlayerEvent) {
        if !matches!(event, PlayerEvent::PlayheadUpdated { .. }) {
            tracing::debug!(
                ?event,
                position = self.state.last_known_position_secs,
                "player event"
            );
        }
        let classified = self.state.classify(&event);
        for action in &classified.actions {
            self.dispatch(*action);
        }
        match classified.timer {
            TimerCommand::None => {}
            TimerCommand::Stop => self.heartbeat.stop(),
            TimerCommand::Reset => self.heartbeat.reset(),
            TimerCommand::Start => {
                if !self.state.is_ad_playing {
                    self.heartbeat.start();
                }
            }
        }
    }

    fn on_tick(&mut self) {
        self.dispatch(ReportAction::Hit);
        let position = self.probe.position();
        if !self.state.is_ad_playing && !position.is_zero() {
            self.state.last_known_position_secs = position.as_secs();
        }
        let duration = self.probe.duration();
        if !duration.is_zero() {
            let progress = self.state.last_known_position_secs as f64 / duration.as_secs_f64();
            if progress > MEDIA_ENDED_THRESHOLD {
                self.dispatch(ReportAction::Finish);
                self.state.play_outstanding = false;
                self.state.is_media_finished = true;
                self.heartbeat.stop();
            }
        }
    }

    /// The action dispatcher's guard clauses, then freeze the payload and hand
    /// it to the delivery queue. Never blocks; a dropped report is logged and
    /// forgotten.
    fn dispatch(&mut self, action: ReportAction) {
        if self.state.is_ad_playing {
            return;
        }
        // STOP keeps the position captured at stop time; everything else
        // refreshes from the live player first.
        if action != ReportAction::Stop {
            let position = self.probe.position();
            if !position.is_zero() {
                self.state.last_known_position_secs = position.as_secs();
            }
        }
        if !self.state.has_valid_media() {
            tracing::error!(action = %action, "dropping report: no valid media id");
            return;
        }
        if action == ReportAction::Finish {
            self.state.last_known_position_secs = self.probe.duration().as_secs();
        }
        let finished = match action {
            ReportAction::Finish => true,
            ReportAction::Stop => {
                let duration = self.probe.duration();
                !duration.is_zero() && self.probe.position() >= duration
            }
            _ => false,
        };
        let report = OutboundReport {
            action,
            media_id: self.state.media_id.clone(),
            file_id: self.state.file_id.clone(),
            position_secs: self.state.last_known_position_secs,
            finished,
        };
        tracing::debug!(action = %action, position = report.position_secs, "report queued");
        if self.report_tx.send(report).is_err() {
            tracing::warn!(action = %action, "delivery queue closed; report dropped");
        }
    }
}

async fn run_delivery(
    client: CollectorClient,
    mut report_rx: mpsc::UnboundedReceiver<OutboundReport>,
    bus: broadcast::Sender<ReporterEvent>,
) {
    while let Some(report) = report_rx.recv().await {
        let action = report.action;
        match client.send(&report).await {
            Ok(outcome) => publish_outcome(&bus, action, &outcome),
            Err(err) => {
                tracing::warn!(action = %action, error = %err, "report delivery failed; dropping");
            }
        }
    }
}

fn publish_outcome(
    bus: &broadcast::Sender<ReporterEvent>,
    action: ReportAction,
    outcome: &ActionAddOutcome,
) {
    match outcome {
        ActionAddOutcome::Accepted => {
            tracing::debug!(action = %action, "report acknowledged");
            let _ = bus.send(ReporterEvent::ReportSent { action });
        }
        ActionAddOutcome::Restricted => {
            tracing::info!(action = %action, "concurrency restriction signaled");
            let _ = bus.send(ReporterEvent::ConcurrencyRestriction);
            let _ = bus.send(ReporterEvent::ReportSent { action });
        }
        ActionAddOutcome::Failed { status, code } => {
            tracing::warn!(action = %action, status = %status, code = ?code, "report rejected; dropping");
        }
    }
}
