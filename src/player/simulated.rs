use crate::player::{Player, PlayerEvent};
use std::sync::Mutex;
use tokio::sync::broadcast;

/// Capacity of the player event channel
///
/// Large enough that a 5 Hz clock never laps a subscriber between polls.
const EVENT_CAPACITY: usize = 1024;

#[derive(Debug, Default)]
struct PlaybackState {
    time: f64,
    playing: bool,
    muted: bool,
    fullscreen: bool,
}

/// In-process [`Player`] with a manually driven clock
///
/// Used by the demo binary and the tests to stand in for a real host player.
#[derive(Debug)]
pub struct SimulatedPlayer {
    state: Mutex<PlaybackState>,
    live: bool,
    events: broadcast::Sender<PlayerEvent>,
}

impl SimulatedPlayer {
    pub fn new(live: bool) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Mutex::new(PlaybackState::default()),
            live,
            events,
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut PlaybackState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    fn publish(&self, event: PlayerEvent) {
        // No subscribers is fine, nobody is tracking yet
        let _ = self.events.send(event);
    }

    pub fn load(&self) {
        self.publish(PlayerEvent::SourceLoaded);
    }

    pub fn unload(&self) {
        self.with_state(|s| s.playing = false);
        self.publish(PlayerEvent::SourceUnloaded);
    }

    pub fn play(&self) {
        if !self.with_state(|s| std::mem::replace(&mut s.playing, true)) {
            self.publish(PlayerEvent::Play);
        }
    }

    pub fn pause(&self) {
        if self.with_state(|s| std::mem::replace(&mut s.playing, false)) {
            self.publish(PlayerEvent::Paused);
        }
    }

    pub fn set_muted(&self, muted: bool) {
        if self.with_state(|s| std::mem::replace(&mut s.muted, muted)) != muted {
            self.publish(if muted {
                PlayerEvent::Muted
            } else {
                PlayerEvent::Unmuted
            });
        }
    }

    pub fn set_fullscreen(&self, fullscreen: bool) {
        if self.with_state(|s| std::mem::replace(&mut s.fullscreen, fullscreen)) != fullscreen {
            self.publish(if fullscreen {
                PlayerEvent::FullscreenEnter
            } else {
                PlayerEvent::FullscreenExit
            });
        }
    }

    /// Advance the clock during normal playback
    pub fn advance_to(&self, time: f64) {
        self.with_state(|s| s.time = time);
        self.publish(PlayerEvent::TimeChanged { time });
    }

    /// Jump to `time`, publishing `Seeked` followed by a time update
    pub fn seek(&self, time: f64) {
        self.with_state(|s| s.time = time);
        self.publish(PlayerEvent::Seeked);
        self.publish(PlayerEvent::TimeChanged { time });
    }

    /// Rebase a live timeline to `time`
    pub fn time_shift(&self, time: f64) {
        self.with_state(|s| s.time = time);
        self.publish(PlayerEvent::TimeShifted);
        self.publish(PlayerEvent::TimeChanged { time });
    }

    pub fn destroy(&self) {
        self.publish(PlayerEvent::Destroyed);
    }
}

impl Player for SimulatedPlayer {
    fn current_time(&self) -> f64 {
        self.with_state(|s| s.time)
    }

    fn is_live(&self) -> bool {
        self.live
    }

    fn is_playing(&self) -> bool {
        self.with_state(|s| s.playing)
    }

    fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }
}
