pub mod beaconing;
pub mod emitter;
pub mod events;
pub mod timeline;

pub use beaconing::{AdBeaconing, BEACON_MATCH_PADDING_SECS};
pub use emitter::LifecycleEmitter;
pub use events::{AdEvent, AdEventKind, EventEmitter};
pub use timeline::{PlayingPosition, TimelineTracker, TrackerCursor};

/// Tracking events that can be sent manually through the session manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingEventType {
    /// The user clicked on the ad, see [`Ad::click_through_url`](crate::schedule::Ad::click_through_url)
    ClickTracking,
    /// Any event type without a dedicated variant
    Other(String),
}

impl TrackingEventType {
    pub fn as_str(&self) -> &str {
        match self {
            TrackingEventType::ClickTracking => "clickTracking",
            TrackingEventType::Other(event_type) => event_type,
        }
    }
}
