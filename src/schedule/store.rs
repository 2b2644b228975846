use crate::metrics;
use crate::schedule::model::AdBreak;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Immutable snapshot of the ad break schedule
pub type Schedule = Arc<[AdBreak]>;

/// Holds the current ad break schedule and publishes replacements
///
/// Only the session refresh path writes; everything else observes through
/// [`ScheduleStore::subscribe`]. Identical schedules are not re-published, so
/// a poll that returns the same avails does not invalidate the tracker.
#[derive(Debug)]
pub struct ScheduleStore {
    tx: watch::Sender<Schedule>,
}

impl ScheduleStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Schedule::from(Vec::new()));
        Self { tx }
    }

    /// Current schedule snapshot
    pub fn current(&self) -> Schedule {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Schedule> {
        self.tx.subscribe()
    }

    /// Replace the schedule wholesale. Returns whether anything changed.
    pub fn replace(&self, ad_breaks: Vec<AdBreak>) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if current.as_ref() == ad_breaks.as_slice() {
                return false;
            }
            *current = Schedule::from(ad_breaks);
            true
        });

        if changed {
            let count = self.tx.borrow().len();
            debug!("Ad break schedule replaced ({} ad breaks)", count);
            metrics::set_scheduled_ad_breaks(count);
        }
        changed
    }
}

impl Default for ScheduleStore {
    fn default() -> Self {
        Self::new()
    }
}
