use crate::http::HttpClient;
use crate::metrics;
use crate::player::PlayerInteraction;
use crate::schedule::TrackingEvent;
use crate::tracking::events::EventEmitter;
use crate::tracking::timeline::{PlayingPosition, TimelineTracker};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Padding around a tracking event's schedule time within which it fires
///
/// Host players update time roughly every 0.2s, so an exact match would be
/// missed. Revisit if the host reports time at a different cadence.
pub const BEACON_MATCH_PADDING_SECS: f64 = 0.3;

/// Tracking event types fired automatically from the schedule position
pub const LINEAR_AD_METRICS: [&str; 8] = [
    "loaded",
    "start",
    "firstQuartile",
    "midpoint",
    "thirdQuartile",
    "complete",
    "progress",
    "impression",
];

/// Identity of a fired tracking event within one ad break occurrence
///
/// Tracking event ids are a sequence number (HLS) or start time (DASH), so
/// several events of one ad can share an id (e.g. impression, start). All
/// available ids plus the event type are combined to keep keys unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FiredKey {
    ad_break_id: String,
    ad_id: String,
    tracking_event_id: String,
    event_type: String,
}

fn is_linear_ad_metric(event: &TrackingEvent) -> bool {
    LINEAR_AD_METRICS.contains(&event.event_type.as_str())
}

/// Whether `time` is within the padded window around the event's schedule time
fn is_within_padded_window(event: &TrackingEvent, time: f64) -> bool {
    time >= event.schedule_time - BEACON_MATCH_PADDING_SECS
        && time <= event.schedule_time + BEACON_MATCH_PADDING_SECS
}

/// Fires tracking beacons for the playing ad
///
/// Schedule-position beacons (quartiles, impression, ...) fire once per
/// playing ad break occurrence; leaving the break clears the fired set so
/// re-entering it fires them again. Player interactions are mapped onto
/// tracking event types. Both are skipped when automatic tracking is off;
/// [`AdBeaconing::track`] always works.
pub struct AdBeaconing {
    playing_ad_break: watch::Receiver<Option<PlayingPosition>>,
    http_client: Arc<dyn HttpClient>,
    events: EventEmitter,
    automatic_tracking_enabled: bool,
    fired: HashSet<FiredKey>,
    previous_ad_break_id: Option<String>,
    disposed: Arc<AtomicBool>,
}

impl AdBeaconing {
    pub fn new(
        tracker: &TimelineTracker,
        http_client: Arc<dyn HttpClient>,
        events: EventEmitter,
        automatic_tracking_enabled: bool,
        disposed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            playing_ad_break: tracker.subscribe_playing_ad_break(),
            http_client,
            events,
            automatic_tracking_enabled,
            fired: HashSet::new(),
            previous_ad_break_id: None,
            disposed,
        }
    }

    /// Evaluate schedule-position beacons after the tracker settled on `time`
    pub fn on_time_changed(&mut self, time: f64) {
        if !self.automatic_tracking_enabled {
            return;
        }

        let playing = self.playing_ad_break.borrow().clone();
        let ad_break_id = playing.as_ref().map(|p| p.ad_break().id.clone());
        if ad_break_id != self.previous_ad_break_id {
            // Left (or switched) the ad break, events may fire again on re-entry
            self.previous_ad_break_id = ad_break_id;
            self.fired.clear();
        }

        let Some(playing) = playing else {
            return;
        };
        let ad_break = playing.ad_break();
        let ad = playing.ad();

        for event in ad
            .tracking_events
            .iter()
            .filter(|e| is_linear_ad_metric(e) && is_within_padded_window(e, time))
        {
            let key = FiredKey {
                ad_break_id: ad_break.id.clone(),
                ad_id: ad.id.clone(),
                tracking_event_id: event.id.clone(),
                event_type: event.event_type.clone(),
            };
            if self.fired.insert(key) {
                for url in &event.beacon_urls {
                    self.fire_beacon(url, &event.event_type);
                }
            }
        }
    }

    /// Track a player interaction if automatic tracking is enabled
    pub fn on_interaction(&self, interaction: PlayerInteraction) {
        if self.automatic_tracking_enabled {
            self.track(interaction.tracking_event_type());
        }
    }

    /// Fire every beacon of the playing ad's tracking events of `event_type`
    ///
    /// Not deduplicated. Does nothing when no ad is playing.
    pub fn track(&self, event_type: &str) {
        let playing = self.playing_ad_break.borrow().clone();
        let Some(playing) = playing else {
            debug!(event_type, "No ad playing, ignoring tracking event");
            return;
        };

        for event in playing
            .ad()
            .tracking_events
            .iter()
            .filter(|e| e.event_type == event_type)
        {
            for url in &event.beacon_urls {
                self.fire_beacon(url, event_type);
            }
        }
    }

    /// Stop dispatching; results of in-flight beacons are discarded
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    /// Fire a tracking beacon (fire-and-forget)
    ///
    /// Spawns a background task. Does not block the caller.
    /// No retries, failures are only logged.
    fn fire_beacon(&self, url: &str, event_type: &str) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        self.events
            .info(format!("Tracking event '{}': {}", event_type, url));

        let request = self.http_client.get(url);
        let disposed = self.disposed.clone();
        let url = url.to_string();
        let event_type = event_type.to_string();
        tokio::spawn(async move {
            // Requests are lazy: nothing is sent if disposal won the race
            if disposed.load(Ordering::SeqCst) {
                return;
            }
            let response = request.await;
            if disposed.load(Ordering::SeqCst) {
                return;
            }
            if response.success {
                debug!("Tracking beacon: {} -> {}", event_type, url);
                info!("Tracking beacon: {} (ok)", event_type);
                metrics::record_beacon(&event_type, "success");
            } else {
                debug!("Tracking beacon URL: {}", url);
                warn!("Tracking beacon failed: {}", event_type);
                metrics::record_beacon(&event_type, "error");
            }
        });
    }
}

impl std::fmt::Debug for AdBeaconing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdBeaconing")
            .field("automatic_tracking_enabled", &self.automatic_tracking_enabled)
            .field("fired", &self.fired.len())
            .field("previous_ad_break_id", &self.previous_ad_break_id)
            .field("disposed", &self.disposed.load(Ordering::SeqCst))
            .finish()
    }
}
