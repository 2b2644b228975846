use crate::schedule::AdBreak;
use crate::tracking::events::{AdEventKind, EventEmitter};
use crate::tracking::timeline::{PlayingPosition, TimelineTracker};
use tokio::sync::watch;

/// Turns timeline tracker state into discrete lifecycle events
///
/// Observes the tracker's outputs and, on every [`LifecycleEmitter::process`],
/// diffs the settled playing position against the last one it saw. Finish
/// events for the old position are always emitted before start events for
/// the new one, so consumers never see two ads or breaks started at once.
#[derive(Debug)]
pub struct LifecycleEmitter {
    next_ad_break: watch::Receiver<Option<AdBreak>>,
    playing_ad_break: watch::Receiver<Option<PlayingPosition>>,
    previous_next: Option<AdBreak>,
    previous_playing: Option<PlayingPosition>,
    events: EventEmitter,
}

impl LifecycleEmitter {
    pub fn new(tracker: &TimelineTracker, events: EventEmitter) -> Self {
        Self {
            next_ad_break: tracker.subscribe_next_ad_break(),
            playing_ad_break: tracker.subscribe_playing_ad_break(),
            previous_next: None,
            previous_playing: None,
            events,
        }
    }

    /// Emit events for whatever changed since the last call
    ///
    /// Call after the tracker has settled for the current tick. Intermediate
    /// values (such as the cleared outputs after a reset) are never diffed.
    pub fn process(&mut self) {
        if self.next_ad_break.has_changed().unwrap_or(false) {
            let next = self.next_ad_break.borrow_and_update().clone();
            if next != self.previous_next {
                self.events.emit(AdEventKind::UpcomingAdBreakUpdated {
                    ad_break: next.clone(),
                });
                self.previous_next = next;
            }
        }

        if self.playing_ad_break.has_changed().unwrap_or(false) {
            let playing = self.playing_ad_break.borrow_and_update().clone();
            self.diff_playing(playing);
        }
    }

    fn diff_playing(&mut self, new: Option<PlayingPosition>) {
        match (&self.previous_playing, &new) {
            (None, Some(new)) => self.start(new),
            (Some(previous), None) => self.finish(previous),
            (Some(previous), Some(new)) if previous.ad_break().id != new.ad_break().id => {
                self.finish(previous);
                self.start(new);
            }
            (Some(previous), Some(new)) if previous.ad().id != new.ad().id => {
                self.events.emit(AdEventKind::AdFinished {
                    ad: previous.ad().clone(),
                });
                self.events.emit(AdEventKind::AdStarted {
                    ad: new.ad().clone(),
                    index_in_queue: new.ad_index,
                });
            }
            _ => {}
        }
        self.previous_playing = new;
    }

    fn start(&self, position: &PlayingPosition) {
        self.events.emit(AdEventKind::AdBreakStarted {
            ad_break: position.ad_break().clone(),
        });
        self.events.emit(AdEventKind::AdStarted {
            ad: position.ad().clone(),
            index_in_queue: position.ad_index,
        });
    }

    fn finish(&self, position: &PlayingPosition) {
        self.events.emit(AdEventKind::AdFinished {
            ad: position.ad().clone(),
        });
        self.events.emit(AdEventKind::AdBreakFinished {
            ad_break: position.ad_break().clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::Schedule;
    use crate::tracking::events::drain;
    use crate::tracking::timeline::tests::{ad, ad_break, two_break_schedule};

    /// Compact rendering of lifecycle events for assertions
    fn names(kinds: Vec<AdEventKind>) -> Vec<String> {
        kinds
            .into_iter()
            .map(|kind| match kind {
                AdEventKind::AdStarted { ad, index_in_queue } => {
                    format!("AdStarted({}, {})", ad.id, index_in_queue)
                }
                AdEventKind::AdFinished { ad } => format!("AdFinished({})", ad.id),
                AdEventKind::AdBreakStarted { ad_break } => {
                    format!("AdBreakStarted({})", ad_break.id)
                }
                AdEventKind::AdBreakFinished { ad_break } => {
                    format!("AdBreakFinished({})", ad_break.id)
                }
                AdEventKind::UpcomingAdBreakUpdated { ad_break } => format!(
                    "Upcoming({})",
                    ad_break.map(|b| b.id).unwrap_or_else(|| "none".into())
                ),
                other => other.name().to_string(),
            })
            .collect()
    }

    struct Harness {
        tracker: TimelineTracker,
        emitter: LifecycleEmitter,
        rx: tokio::sync::broadcast::Receiver<crate::tracking::events::AdEvent>,
    }

    impl Harness {
        fn new(schedule: Schedule) -> Self {
            let events = EventEmitter::new();
            let rx = events.subscribe();
            let tracker = TimelineTracker::new(schedule);
            let emitter = LifecycleEmitter::new(&tracker, events);
            Self { tracker, emitter, rx }
        }

        fn tick(&mut self, time: f64) -> Vec<String> {
            self.tracker.update(time);
            self.emitter.process();
            names(drain(&mut self.rx))
        }
    }

    #[test]
    fn test_enter_and_leave_break() {
        let mut h = Harness::new(two_break_schedule());

        assert_eq!(h.tick(1.0), vec!["Upcoming(A)"]);
        assert_eq!(
            h.tick(4.0),
            vec!["Upcoming(B)", "AdBreakStarted(A)", "AdStarted(A1, 0)"]
        );
        assert_eq!(h.tick(7.0), vec!["AdFinished(A1)", "AdBreakFinished(A)"]);
        assert_eq!(
            h.tick(10.0),
            vec!["Upcoming(none)", "AdBreakStarted(B)", "AdStarted(B1, 0)"]
        );
    }

    #[test]
    fn test_same_time_twice_is_idempotent() {
        let mut h = Harness::new(two_break_schedule());
        h.tick(5.0);
        assert!(h.tick(5.0).is_empty());
        assert!(h.tick(5.2).is_empty());
    }

    #[test]
    fn test_adjacent_breaks_finish_before_start() {
        let schedule = Schedule::from(vec![
            ad_break("A", 0.0, 5.0, vec![ad("A1", 0.0, 5.0)]),
            ad_break("B", 5.0, 5.0, vec![ad("B1", 5.0, 5.0)]),
        ]);
        let mut h = Harness::new(schedule);
        h.tick(1.0);

        assert_eq!(
            h.tick(5.0),
            vec![
                "Upcoming(none)",
                "AdFinished(A1)",
                "AdBreakFinished(A)",
                "AdBreakStarted(B)",
                "AdStarted(B1, 0)",
            ]
        );
    }

    #[test]
    fn test_next_ad_in_same_break() {
        let schedule = Schedule::from(vec![ad_break(
            "A",
            0.0,
            10.0,
            vec![ad("A1", 0.0, 5.0), ad("A2", 5.0, 5.0)],
        )]);
        let mut h = Harness::new(schedule);
        h.tick(0.0);

        assert_eq!(h.tick(5.0), vec!["AdFinished(A1)", "AdStarted(A2, 1)"]);
    }

    #[test]
    fn test_reset_then_same_position_emits_nothing() {
        let mut h = Harness::new(two_break_schedule());
        h.tick(5.0);

        h.tracker.reset();
        assert!(h.tick(5.5).is_empty());
    }

    #[test]
    fn test_seek_out_of_break_finishes_it() {
        let mut h = Harness::new(two_break_schedule());
        h.tick(5.0);

        h.tracker.reset();
        assert_eq!(
            h.tick(1.0),
            vec!["Upcoming(A)", "AdFinished(A1)", "AdBreakFinished(A)"]
        );
    }
}
