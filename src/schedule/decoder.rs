use crate::error::Result;
use crate::schedule::model::{Ad, AdBreak, TrackingEvent};
use serde::Deserialize;
use tracing::debug;

/// MediaTailor client-side tracking response
///
/// Reference:
/// https://docs.aws.amazon.com/mediatailor/latest/ug/ad-reporting-client-side-ad-tracking-schema.html
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingResponse {
    #[serde(default)]
    pub avails: Vec<Avail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Avail {
    pub avail_id: String,
    #[serde(default)]
    pub ads: Vec<AvailAd>,
    #[serde(default)]
    pub duration: String,
    pub duration_in_seconds: f64,
    pub start_time_in_seconds: f64,
    pub ad_marker_duration: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailAd {
    pub ad_id: String,
    #[serde(default)]
    pub duration: String,
    pub duration_in_seconds: f64,
    pub start_time_in_seconds: f64,
    #[serde(default)]
    pub tracking_events: Vec<AvailTrackingEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailTrackingEvent {
    pub event_id: String,
    pub event_type: String,
    #[serde(default)]
    pub beacon_urls: Vec<String>,
    #[serde(default)]
    pub duration_in_seconds: f64,
    pub start_time_in_seconds: f64,
}

/// Session initialization response: both URLs may be relative to the init URL
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInitResponse {
    pub manifest_url: String,
    pub tracking_url: String,
}

/// Decode a tracking response body into the ad break schedule
///
/// Times, durations and beacon URLs are carried over verbatim. Unknown keys
/// are ignored.
pub fn decode_schedule(body: &str) -> Result<Vec<AdBreak>> {
    let response: TrackingResponse = serde_json::from_str(body)?;
    let ad_breaks = map_ad_breaks(response.avails);
    debug!("Decoded {} ad break(s) from tracking response", ad_breaks.len());
    Ok(ad_breaks)
}

pub fn decode_session_init(body: &str) -> Result<SessionInitResponse> {
    Ok(serde_json::from_str(body)?)
}

fn map_ad_breaks(avails: Vec<Avail>) -> Vec<AdBreak> {
    avails
        .into_iter()
        .map(|avail| AdBreak {
            id: avail.avail_id,
            schedule_time: avail.start_time_in_seconds,
            duration: avail.duration_in_seconds,
            formatted_duration: avail.duration,
            ad_marker_duration: avail.ad_marker_duration,
            ads: avail
                .ads
                .into_iter()
                .map(|ad| Ad {
                    id: ad.ad_id,
                    schedule_time: ad.start_time_in_seconds,
                    duration: ad.duration_in_seconds,
                    formatted_duration: ad.duration,
                    tracking_events: ad
                        .tracking_events
                        .into_iter()
                        .map(|event| TrackingEvent {
                            id: event.event_id,
                            schedule_time: event.start_time_in_seconds,
                            duration: event.duration_in_seconds,
                            event_type: event.event_type,
                            beacon_urls: event.beacon_urls,
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect()
}
