use serde::Serialize;

/// A scheduled ad break (MediaTailor "avail")
///
/// All times are seconds on the player timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdBreak {
    /// MediaTailor `availId`
    pub id: String,
    pub schedule_time: f64,
    pub duration: f64,
    /// ISO 8601 duration as reported by the backend
    pub formatted_duration: String,
    /// Duration observed from the ad marker in the manifest
    pub ad_marker_duration: Option<String>,
    pub ads: Vec<Ad>,
}

impl AdBreak {
    pub fn end_time(&self) -> f64 {
        self.schedule_time + self.duration
    }

    /// Whether `time` falls within `[schedule_time, end_time)`
    pub fn contains(&self, time: f64) -> bool {
        time >= self.schedule_time && time < self.end_time()
    }
}

/// A linear ad within an ad break
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ad {
    /// MediaTailor `adId`
    pub id: String,
    pub schedule_time: f64,
    pub duration: f64,
    pub formatted_duration: String,
    pub tracking_events: Vec<TrackingEvent>,
}

impl Ad {
    pub fn end_time(&self) -> f64 {
        self.schedule_time + self.duration
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.schedule_time && time < self.end_time()
    }

    /// Click-through URL of the ad, if present
    ///
    /// Clicks are tracked with [`TrackingEventType::ClickTracking`](crate::tracking::TrackingEventType::ClickTracking).
    pub fn click_through_url(&self) -> Option<&str> {
        self.tracking_events
            .iter()
            .find(|e| e.event_type == "clickThrough")?
            .beacon_urls
            .iter()
            .find(|url| !url.trim().is_empty())
            .map(String::as_str)
    }
}

/// A schedule-positioned tracking marker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingEvent {
    /// MediaTailor `eventId`: a sequence number (HLS) or start time (DASH),
    /// so it repeats across ads and breaks
    pub id: String,
    pub schedule_time: f64,
    pub duration: f64,
    /// e.g. `start`, `firstQuartile`, `mute`
    pub event_type: String,
    /// URLs to GET when the event fires
    pub beacon_urls: Vec<String>,
}
