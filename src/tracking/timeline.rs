use crate::schedule::{Ad, AdBreak, Schedule};
use tokio::sync::watch;
use tracing::debug;

/// The ad break and ad currently intersecting the player time
#[derive(Debug, Clone)]
pub struct PlayingPosition {
    schedule: Schedule,
    ad_break_index: usize,
    /// 0-based index of the playing ad within its break
    pub ad_index: usize,
}

impl PlayingPosition {
    pub fn ad_break(&self) -> &AdBreak {
        &self.schedule[self.ad_break_index]
    }

    pub fn ad(&self) -> &Ad {
        &self.ad_break().ads[self.ad_index]
    }
}

impl PartialEq for PlayingPosition {
    fn eq(&self, other: &Self) -> bool {
        self.ad_index == other.ad_index && self.ad_break() == other.ad_break()
    }
}

/// Forward-only search position into the sorted schedule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerCursor {
    pub ad_break_index: usize,
    pub ad_index: usize,
}

/// Maps player time onto the ad break schedule
///
/// Keeps a cursor that only moves forward, so steady playback costs O(1) per
/// time update. Anything that makes the cursor invalid (seek, time shift,
/// schedule replacement) must go through [`TimelineTracker::reset`].
///
/// The schedule is assumed sorted by `schedule_time` and non-overlapping;
/// it is not validated.
#[derive(Debug)]
pub struct TimelineTracker {
    schedule: Schedule,
    cursor: TrackerCursor,
    next_ad_break: watch::Sender<Option<AdBreak>>,
    playing_ad_break: watch::Sender<Option<PlayingPosition>>,
}

impl TimelineTracker {
    pub fn new(schedule: Schedule) -> Self {
        let (next_ad_break, _) = watch::channel(None);
        let (playing_ad_break, _) = watch::channel(None);
        Self {
            schedule,
            cursor: TrackerCursor::default(),
            next_ad_break,
            playing_ad_break,
        }
    }

    pub fn next_ad_break(&self) -> Option<AdBreak> {
        self.next_ad_break.borrow().clone()
    }

    pub fn playing_ad_break(&self) -> Option<PlayingPosition> {
        self.playing_ad_break.borrow().clone()
    }

    pub fn cursor(&self) -> TrackerCursor {
        self.cursor
    }

    pub fn subscribe_next_ad_break(&self) -> watch::Receiver<Option<AdBreak>> {
        self.next_ad_break.subscribe()
    }

    pub fn subscribe_playing_ad_break(&self) -> watch::Receiver<Option<PlayingPosition>> {
        self.playing_ad_break.subscribe()
    }

    /// Install a new schedule and invalidate the cursor
    pub fn set_schedule(&mut self, schedule: Schedule) {
        self.schedule = schedule;
        self.reset();
    }

    /// Rewind the cursor and clear both outputs until the next update
    pub fn reset(&mut self) {
        debug!("Resetting timeline tracker");
        self.cursor = TrackerCursor::default();
        self.publish_next(None);
        self.publish_playing(None);
    }

    /// Recompute outputs for player time `time`
    pub fn update(&mut self, time: f64) {
        let schedule = self.schedule.clone();
        if schedule.is_empty() {
            self.publish_next(None);
            self.publish_playing(None);
            return;
        }

        let last_break = schedule.len() - 1;
        while self.cursor.ad_break_index < last_break
            && time >= schedule[self.cursor.ad_break_index].end_time()
        {
            self.cursor.ad_break_index += 1;
            self.cursor.ad_index = 0;
        }

        let break_index = self.cursor.ad_break_index;
        let ad_break = &schedule[break_index];
        let next = if time < ad_break.schedule_time {
            Some(ad_break)
        } else {
            schedule.get(break_index + 1)
        };
        self.publish_next(next);

        if !ad_break.contains(time) {
            self.publish_playing(None);
            return;
        }

        // An ad break without ads has nothing to report as playing
        if ad_break.ads.is_empty() {
            return;
        }

        let last_ad = ad_break.ads.len() - 1;
        while self.cursor.ad_index < last_ad && time >= ad_break.ads[self.cursor.ad_index].end_time()
        {
            self.cursor.ad_index += 1;
        }

        // Outside the ad means a gap between ads: keep the previous position
        if ad_break.ads[self.cursor.ad_index].contains(time) {
            self.publish_playing(Some(PlayingPosition {
                schedule: schedule.clone(),
                ad_break_index: break_index,
                ad_index: self.cursor.ad_index,
            }));
        }
    }

    fn publish_next(&self, next: Option<&AdBreak>) {
        self.next_ad_break.send_if_modified(|current| {
            if current.as_ref() == next {
                return false;
            }
            *current = next.cloned();
            true
        });
    }

    fn publish_playing(&self, playing: Option<PlayingPosition>) {
        self.playing_ad_break.send_if_modified(|current| {
            if *current == playing {
                return false;
            }
            *current = playing;
            true
        });
    }
}
