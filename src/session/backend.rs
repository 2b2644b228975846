use crate::config::{AssetType, SessionConfig};
use crate::error::{Result, TrackerError};
use crate::http::HttpClient;
use crate::metrics;
use crate::player::Player;
use crate::schedule::decoder;
use crate::schedule::{AdBreak, ScheduleStore};
use crate::tracking::EventEmitter;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

/// An initialized session with the ad stitcher backend
///
/// Created by [`TrackingSession::initialize`]; owns the schedule store and is
/// the only writer to it.
pub struct TrackingSession {
    http_client: Arc<dyn HttpClient>,
    session_id: String,
    tracking_url: String,
    store: ScheduleStore,
}

impl TrackingSession {
    /// Run the explicit session initialization handshake
    ///
    /// Returns the session together with the manifest URL to load into the
    /// player. Both URLs in the backend response may be relative and are
    /// resolved against the initialization URL.
    pub async fn initialize(
        http_client: Arc<dyn HttpClient>,
        config: &SessionConfig,
    ) -> Result<(Self, String)> {
        let init_url = &config.session_init_url;
        let base = Url::parse(init_url)?;
        let params = if config.session_init_params.is_empty() {
            None
        } else {
            Some(&config.session_init_params)
        };

        info!("Initializing session at {}", init_url);
        let response = http_client.post(init_url, params).await;
        if !response.success {
            return Err(TrackerError::RequestFailed(init_url.clone()));
        }
        let body = response
            .body
            .ok_or_else(|| TrackerError::EmptyResponse(init_url.clone()))?;
        let init = decoder::decode_session_init(&body)?;

        let manifest_url = base.join(&init.manifest_url)?;
        let tracking_url = base.join(&init.tracking_url)?;
        let session_id = tracking_url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string();

        info!(
            session_id = %session_id,
            "Session initialized (manifest: {}, tracking: {})",
            manifest_url,
            tracking_url
        );

        Ok((
            Self {
                http_client,
                session_id,
                tracking_url: tracking_url.to_string(),
                store: ScheduleStore::new(),
            },
            manifest_url.to_string(),
        ))
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn tracking_url(&self) -> &str {
        &self.tracking_url
    }

    pub fn store(&self) -> &ScheduleStore {
        &self.store
    }

    /// Fetch and decode the current ad schedule from the tracking URL
    pub async fn fetch_schedule(&self) -> Result<Vec<AdBreak>> {
        let response = self.http_client.get(&self.tracking_url).await;
        if !response.success {
            return Err(TrackerError::RequestFailed(self.tracking_url.clone()));
        }
        let body = response
            .body
            .ok_or_else(|| TrackerError::EmptyResponse(self.tracking_url.clone()))?;
        decoder::decode_schedule(&body)
    }

    /// Fetch the schedule once and publish it, unless the session was disposed
    /// while the request was in flight
    ///
    /// Failures keep the previous schedule and are reported as info events.
    pub async fn refresh(&self, events: &EventEmitter, disposed: &AtomicBool) {
        let result = self.fetch_schedule().await;
        if disposed.load(Ordering::SeqCst) {
            debug!(session_id = %self.session_id, "Session disposed, discarding schedule refresh");
            return;
        }

        match result {
            Ok(ad_breaks) => {
                metrics::record_schedule_refresh("success");
                if self.store.replace(ad_breaks) {
                    info!(
                        session_id = %self.session_id,
                        "Ad break schedule updated ({} ad breaks)",
                        self.store.current().len()
                    );
                }
            }
            Err(e) => {
                metrics::record_schedule_refresh("error");
                warn!(session_id = %self.session_id, "Failed to refresh ad schedule: {}", e);
                events.info(format!("Failed to refresh ad schedule: {}", e));
            }
        }
    }

    /// Start refreshing the schedule according to the asset type
    ///
    /// VOD fetches once. Linear fetches immediately, then every poll interval
    /// while the player is playing. Aborting the returned handle stops polling.
    pub fn spawn_refresh(
        self: &Arc<Self>,
        player: Arc<dyn Player>,
        asset_type: AssetType,
        events: EventEmitter,
        disposed: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            session.refresh(&events, &disposed).await;

            let AssetType::Linear { poll_interval } = asset_type else {
                return;
            };
            loop {
                tokio::time::sleep(poll_interval).await;
                if disposed.load(Ordering::SeqCst) {
                    break;
                }
                if player.is_playing() {
                    session.refresh(&events, &disposed).await;
                } else {
                    debug!(session_id = %session.session_id, "Player not playing, skipping schedule poll");
                }
            }
        })
    }
}

impl std::fmt::Debug for TrackingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingSession")
            .field("session_id", &self.session_id)
            .field("tracking_url", &self.tracking_url)
            .field("scheduled_ad_breaks", &self.store.current().len())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use crate::http::testing::RecordingHttpClient;
    use crate::player::SimulatedPlayer;
    use crate::tracking::events::{AdEventKind, drain};
    use std::time::Duration;

    pub const INIT_URL: &str = "https://mt.example.com/v1/session/abc/channel/index.m3u8";
    pub const TRACKING_URL: &str = "https://mt.example.com/v1/tracking/abc/channel/sess-123";
    pub const INIT_RESPONSE: &str = r#"{
        "manifestUrl": "/v1/master/abc/channel/index.m3u8?aws.sessionId=sess-123",
        "trackingUrl": "/v1/tracking/abc/channel/sess-123"
    }"#;
    pub const TRACKING_RESPONSE: &str = r#"{
        "avails": [{
            "availId": "avail-1",
            "duration": "PT5S",
            "durationInSeconds": 5.0,
            "startTimeInSeconds": 4.0,
            "ads": [{
                "adId": "ad-1",
                "duration": "PT5S",
                "durationInSeconds": 5.0,
                "startTimeInSeconds": 4.0,
                "trackingEvents": [{
                    "eventId": "1",
                    "eventType": "start",
                    "beaconUrls": ["https://beacon.example.com/start"],
                    "durationInSeconds": 0.0,
                    "startTimeInSeconds": 4.0
                }]
            }]
        }]
    }"#;

    pub fn backend() -> Arc<RecordingHttpClient> {
        let http = Arc::new(RecordingHttpClient::default());
        http.respond(INIT_URL, HttpResponse::ok(INIT_RESPONSE));
        http.respond(TRACKING_URL, HttpResponse::ok(TRACKING_RESPONSE));
        http
    }

    async fn initialized(http: Arc<RecordingHttpClient>) -> Arc<TrackingSession> {
        let config = SessionConfig::new(INIT_URL, AssetType::Vod);
        let (session, _) = TrackingSession::initialize(http, &config).await.unwrap();
        Arc::new(session)
    }

    #[tokio::test]
    async fn test_initialize_resolves_relative_urls() {
        let config = SessionConfig::new(INIT_URL, AssetType::Vod);
        let (session, manifest_url) = TrackingSession::initialize(backend(), &config)
            .await
            .unwrap();

        assert_eq!(
            manifest_url,
            "https://mt.example.com/v1/master/abc/channel/index.m3u8?aws.sessionId=sess-123"
        );
        assert_eq!(session.tracking_url(), TRACKING_URL);
        assert_eq!(session.session_id(), "sess-123");
        assert!(session.store().current().is_empty());
    }

    #[tokio::test]
    async fn test_initialize_posts_params_as_json() {
        let http = backend();
        let mut params = serde_json::Map::new();
        params.insert("adsParams".into(), serde_json::json!({"deviceType": "tv"}));
        let config = SessionConfig::new(INIT_URL, AssetType::Vod).with_params(params.clone());

        TrackingSession::initialize(http.clone(), &config).await.unwrap();

        let posts = http.posts.lock().unwrap().clone();
        assert_eq!(posts, vec![(INIT_URL.to_string(), Some(params))]);
    }

    #[tokio::test]
    async fn test_initialize_failure() {
        let http = backend();
        http.respond(INIT_URL, HttpResponse::failed());
        let config = SessionConfig::new(INIT_URL, AssetType::Vod);

        let result = TrackingSession::initialize(http, &config).await;
        assert!(matches!(result, Err(TrackerError::RequestFailed(_))));
    }

    #[tokio::test]
    async fn test_initialize_malformed_response() {
        let http = backend();
        http.respond(INIT_URL, HttpResponse::ok("<html>"));
        let config = SessionConfig::new(INIT_URL, AssetType::Vod);

        let result = TrackingSession::initialize(http, &config).await;
        assert!(matches!(result, Err(TrackerError::DecodeError(_))));
    }

    #[tokio::test]
    async fn test_refresh_publishes_schedule() {
        let session = initialized(backend()).await;
        session
            .refresh(&EventEmitter::new(), &AtomicBool::new(false))
            .await;

        let schedule = session.store().current();
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].id, "avail-1");
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_previous_schedule() {
        let http = backend();
        let session = initialized(http.clone()).await;
        let events = EventEmitter::new();
        let mut rx = events.subscribe();
        session.refresh(&events, &AtomicBool::new(false)).await;

        http.respond(TRACKING_URL, HttpResponse::failed());
        session.refresh(&events, &AtomicBool::new(false)).await;

        assert_eq!(session.store().current().len(), 1);
        let kinds = drain(&mut rx);
        assert!(matches!(
            kinds.as_slice(),
            [AdEventKind::Info { message }] if message.starts_with("Failed to refresh ad schedule")
        ));
    }

    #[tokio::test]
    async fn test_refresh_after_dispose_is_discarded() {
        let session = initialized(backend()).await;
        session
            .refresh(&EventEmitter::new(), &AtomicBool::new(true))
            .await;
        assert!(session.store().current().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_vod_fetches_once() {
        let http = backend();
        let session = initialized(http.clone()).await;
        let player = Arc::new(SimulatedPlayer::new(false));
        player.play();

        let handle = session.spawn_refresh(
            player,
            AssetType::Vod,
            EventEmitter::new(),
            Arc::new(AtomicBool::new(false)),
        );
        handle.await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(http.gets(), vec![TRACKING_URL]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_linear_polls_while_playing() {
        let http = backend();
        let session = initialized(http.clone()).await;
        let player = Arc::new(SimulatedPlayer::new(true));

        let handle = session.spawn_refresh(
            player.clone(),
            AssetType::Linear {
                poll_interval: Duration::from_secs(2),
            },
            EventEmitter::new(),
            Arc::new(AtomicBool::new(false)),
        );

        // First fetch happens even though the player is paused
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(http.gets().len(), 1);

        // Paused: polls are skipped
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(http.gets().len(), 1);

        player.play();
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(http.gets().len(), 3);

        handle.abort();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(http.gets().len(), 3);
    }
}
