//! Host player capability set consumed by the tracker

pub mod simulated;

pub use simulated::SimulatedPlayer;

use tokio::sync::broadcast;

/// Notifications delivered by the host player
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerEvent {
    /// Playback time advanced (seconds on the player timeline)
    TimeChanged { time: f64 },
    Seeked,
    /// Live timeline was rebased
    TimeShifted,
    SourceLoaded,
    SourceUnloaded,
    Muted,
    Unmuted,
    Play,
    Paused,
    FullscreenEnter,
    FullscreenExit,
    /// Player is being torn down, the session has to stop
    Destroyed,
}

impl PlayerEvent {
    /// The interaction this event represents, if any
    pub fn interaction(&self) -> Option<PlayerInteraction> {
        match self {
            PlayerEvent::Muted => Some(PlayerInteraction::Mute),
            PlayerEvent::Unmuted => Some(PlayerInteraction::Unmute),
            PlayerEvent::Play => Some(PlayerInteraction::Play),
            PlayerEvent::Paused => Some(PlayerInteraction::Pause),
            PlayerEvent::FullscreenEnter => Some(PlayerInteraction::FullscreenEnter),
            PlayerEvent::FullscreenExit => Some(PlayerInteraction::FullscreenExit),
            _ => None,
        }
    }
}

/// User-facing player interactions that map onto tracking event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerInteraction {
    Mute,
    Unmute,
    Play,
    Pause,
    FullscreenEnter,
    FullscreenExit,
}

impl PlayerInteraction {
    /// Tracking event type fired for this interaction
    pub fn tracking_event_type(&self) -> &'static str {
        match self {
            PlayerInteraction::Mute => "mute",
            PlayerInteraction::Unmute => "unmute",
            PlayerInteraction::Play => "resume",
            PlayerInteraction::Pause => "pause",
            PlayerInteraction::FullscreenEnter => "fullscreen",
            PlayerInteraction::FullscreenExit => "exitFullscreen",
        }
    }
}

/// Host media player
///
/// Implementations publish [`PlayerEvent`]s in the order they happen. Dropping
/// the receiver returned by [`Player::subscribe`] unsubscribes.
pub trait Player: Send + Sync {
    /// Current playback time in seconds
    fn current_time(&self) -> f64;

    fn is_live(&self) -> bool;

    fn is_playing(&self) -> bool;

    fn subscribe(&self) -> broadcast::Receiver<PlayerEvent>;
}
