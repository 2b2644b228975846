use crate::metrics;
use crate::schedule::{Ad, AdBreak, Schedule};
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::debug;

/// Buffered events per subscriber before it starts lagging
const EVENT_CAPACITY: usize = 256;

/// Event published on the outward event stream
#[derive(Debug, Clone)]
pub struct AdEvent {
    /// Time at which the event was emitted
    pub timestamp: DateTime<Utc>,
    pub kind: AdEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdEventKind {
    /// Playback of an ad started. `index_in_queue` is the ad's index within its break.
    AdStarted { ad: Ad, index_in_queue: usize },
    AdFinished { ad: Ad },
    AdBreakStarted { ad_break: AdBreak },
    AdBreakFinished { ad_break: AdBreak },
    /// Upcoming ad break changed, `None` when none is known
    UpcomingAdBreakUpdated { ad_break: Option<AdBreak> },
    AdBreakScheduleUpdated { ad_breaks: Schedule },
    Info { message: String },
    Error { message: String },
}

impl AdEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            AdEventKind::AdStarted { .. } => "ad_started",
            AdEventKind::AdFinished { .. } => "ad_finished",
            AdEventKind::AdBreakStarted { .. } => "ad_break_started",
            AdEventKind::AdBreakFinished { .. } => "ad_break_finished",
            AdEventKind::UpcomingAdBreakUpdated { .. } => "upcoming_ad_break_updated",
            AdEventKind::AdBreakScheduleUpdated { .. } => "ad_break_schedule_updated",
            AdEventKind::Info { .. } => "info",
            AdEventKind::Error { .. } => "error",
        }
    }
}

/// Publishes timestamped [`AdEvent`]s to every subscriber
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<AdEvent>,
}

impl EventEmitter {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AdEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, kind: AdEventKind) {
        debug!(event = kind.name(), "Emitting event");
        metrics::record_lifecycle_event(kind.name());
        // Nobody listening is not an error
        let _ = self.tx.send(AdEvent {
            timestamp: Utc::now(),
            kind,
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(AdEventKind::Info {
            message: message.into(),
        });
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(AdEventKind::Error {
            message: message.into(),
        });
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

/// Drain everything currently buffered for `rx`
#[cfg(test)]
pub(crate) fn drain(rx: &mut broadcast::Receiver<AdEvent>) -> Vec<AdEventKind> {
    let mut kinds = Vec::new();
    while let Ok(event) = rx.try_recv() {
        kinds.push(event.kind);
    }
    kinds
}
