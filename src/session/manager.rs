use crate::config::{AssetType, SessionConfig};
use crate::error::{Result, TrackerError};
use crate::http::HttpClient;
use crate::metrics;
use crate::player::{Player, PlayerEvent};
use crate::schedule::{AdBreak, Schedule};
use crate::session::backend::TrackingSession;
use crate::tracking::{
    AdBeaconing, AdEvent, AdEventKind, EventEmitter, LifecycleEmitter, PlayingPosition,
    TimelineTracker, TrackingEventType,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};

/// Handle of the running schedule refresh task, shared with the event loop
type RefreshHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

fn lock(refresh: &RefreshHandle) -> MutexGuard<'_, Option<JoinHandle<()>>> {
    refresh.lock().unwrap_or_else(|e| e.into_inner())
}

/// Requests from the manager to the event loop
#[derive(Debug)]
enum Command {
    Track(TrackingEventType),
}

/// State of the currently initialized session
struct ActiveSession {
    session: Arc<TrackingSession>,
    commands: mpsc::UnboundedSender<Command>,
    next_ad_break: watch::Receiver<Option<AdBreak>>,
    playing_ad_break: watch::Receiver<Option<PlayingPosition>>,
    disposed: Arc<AtomicBool>,
    refresh: RefreshHandle,
    event_loop: JoinHandle<()>,
}

impl ActiveSession {
    fn is_running(&self) -> bool {
        !self.event_loop.is_finished()
    }
}

/// Public entry point for client-side ad tracking
///
/// Owns at most one session at a time. All tracking state lives in a spawned
/// event loop; the manager only talks to it through channels, so every method
/// here is cheap and never blocks on the network except
/// [`SessionManager::initialize_session`].
pub struct SessionManager {
    player: Arc<dyn Player>,
    http_client: Arc<dyn HttpClient>,
    events: EventEmitter,
    active: Option<ActiveSession>,
}

impl SessionManager {
    pub fn new(player: Arc<dyn Player>, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            player,
            http_client,
            events: EventEmitter::new(),
            active: None,
        }
    }

    /// Subscribe to the outward event stream
    pub fn events(&self) -> broadcast::Receiver<AdEvent> {
        self.events.subscribe()
    }

    /// Initialize a tracking session and start following the player
    ///
    /// Returns the manifest URL the player should load. The schedule is
    /// fetched once the player reports the source as loaded.
    pub async fn initialize_session(&mut self, config: SessionConfig) -> Result<String> {
        if self.is_session_initialized() {
            let err = TrackerError::SessionAlreadyInitialized;
            err.log();
            self.events.error(err.to_string());
            return Err(err);
        }
        // Loop may have ended on its own (player destroyed)
        self.stop_session();

        let (session, manifest_url) =
            match TrackingSession::initialize(Arc::clone(&self.http_client), &config).await {
                Ok(initialized) => initialized,
                Err(e) => {
                    e.log();
                    return Err(e);
                }
            };
        let session = Arc::new(session);

        let disposed = Arc::new(AtomicBool::new(false));
        let refresh = RefreshHandle::default();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        let schedule = session.store().subscribe();
        let tracker = TimelineTracker::new(schedule.borrow().clone());
        let emitter = LifecycleEmitter::new(&tracker, self.events.clone());
        let beaconing = AdBeaconing::new(
            &tracker,
            Arc::clone(&self.http_client),
            self.events.clone(),
            config.automatic_tracking_enabled,
            Arc::clone(&disposed),
        );
        let next_ad_break = tracker.subscribe_next_ad_break();
        let playing_ad_break = tracker.subscribe_playing_ad_break();

        let session_loop = SessionLoop {
            session: Arc::clone(&session),
            player: Arc::clone(&self.player),
            asset_type: config.asset_type,
            events: self.events.clone(),
            tracker,
            emitter,
            beaconing,
            player_events: self.player.subscribe(),
            schedule,
            commands: commands_rx,
            refresh: Arc::clone(&refresh),
            disposed: Arc::clone(&disposed),
        };
        let span = info_span!("session", session_id = %session.session_id());
        let event_loop = tokio::spawn(session_loop.run().instrument(span));

        metrics::session_started();
        self.active = Some(ActiveSession {
            session,
            commands: commands_tx,
            next_ad_break,
            playing_ad_break,
            disposed,
            refresh,
            event_loop,
        });

        Ok(manifest_url)
    }

    pub fn is_session_initialized(&self) -> bool {
        self.active.as_ref().is_some_and(ActiveSession::is_running)
    }

    /// Manually fire the playing ad's beacons for `event_type`
    ///
    /// Works regardless of automatic tracking. Does nothing when no ad is
    /// playing.
    pub fn send_tracking_event(&self, event_type: TrackingEventType) {
        let sent = self
            .active
            .as_ref()
            .filter(|active| active.is_running())
            .is_some_and(|active| active.commands.send(Command::Track(event_type)).is_ok());

        if !sent {
            let err = TrackerError::SessionNotInitialized;
            err.log();
            self.events.error(err.to_string());
        }
    }

    /// Tear down the current session
    ///
    /// Polling stops and no beacon request is started after this returns.
    /// In-flight requests are left to finish but their results are discarded.
    /// Aborting does not wait for the event loop: on a multi-threaded runtime
    /// a message it is handling at that moment may still emit its lifecycle
    /// events, but no further message is processed.
    pub fn stop_session(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        active.disposed.store(true, Ordering::SeqCst);
        if let Some(refresh) = lock(&active.refresh).take() {
            refresh.abort();
        }
        active.event_loop.abort();
        metrics::session_stopped();
        info!(session_id = %active.session.session_id(), "Session stopped");
    }

    /// Stop the session and release the manager
    pub fn destroy(mut self) {
        self.stop_session();
    }

    /// Current ad break schedule, empty without a session
    pub fn ad_breaks(&self) -> Schedule {
        match &self.active {
            Some(active) => active.session.store().current(),
            None => Schedule::from(Vec::new()),
        }
    }

    pub fn next_ad_break(&self) -> Option<AdBreak> {
        self.active
            .as_ref()
            .and_then(|active| active.next_ad_break.borrow().clone())
    }

    pub fn playing_ad_break(&self) -> Option<PlayingPosition> {
        self.active
            .as_ref()
            .and_then(|active| active.playing_ad_break.borrow().clone())
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.stop_session();
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field(
                "session",
                &self.active.as_ref().map(|active| active.session.session_id()),
            )
            .field("running", &self.is_session_initialized())
            .finish()
    }
}

/// Single mutator of all tracking state for one session
///
/// Player notifications, schedule changes and commands are handled strictly
/// in arrival order. Within a time tick the tracker settles first, then the
/// lifecycle emitter and beaconing observe the same position.
struct SessionLoop {
    session: Arc<TrackingSession>,
    player: Arc<dyn Player>,
    asset_type: AssetType,
    events: EventEmitter,
    tracker: TimelineTracker,
    emitter: LifecycleEmitter,
    beaconing: AdBeaconing,
    player_events: broadcast::Receiver<PlayerEvent>,
    schedule: watch::Receiver<Schedule>,
    commands: mpsc::UnboundedReceiver<Command>,
    refresh: RefreshHandle,
    disposed: Arc<AtomicBool>,
}

impl SessionLoop {
    async fn run(mut self) {
        debug!("Session event loop started");
        while !self.disposed.load(Ordering::SeqCst) {
            tokio::select! {
                Some(command) = self.commands.recv() => self.on_command(command),
                changed = self.schedule.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.on_schedule_changed();
                }
                event = self.player_events.recv() => match event {
                    Ok(PlayerEvent::Destroyed) => {
                        info!("Player destroyed, ending session");
                        break;
                    }
                    Ok(event) => self.on_player_event(event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Session lagging behind player, {} events skipped", skipped);
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        debug!("Session event loop finished");
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Track(event_type) => self.beaconing.track(event_type.as_str()),
        }
    }

    fn on_schedule_changed(&mut self) {
        let schedule = self.schedule.borrow_and_update().clone();
        self.events.emit(AdEventKind::AdBreakScheduleUpdated {
            ad_breaks: schedule.clone(),
        });

        self.tracker.set_schedule(schedule);
        self.tracker.update(self.player.current_time());
        self.emitter.process();
    }

    fn on_player_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::TimeChanged { time } => {
                self.tracker.update(time);
                self.emitter.process();
                self.beaconing.on_time_changed(time);
            }
            PlayerEvent::Seeked | PlayerEvent::TimeShifted => self.tracker.reset(),
            PlayerEvent::SourceLoaded => self.start_refresh(),
            PlayerEvent::SourceUnloaded => self.stop_refresh(),
            other => {
                if let Some(interaction) = other.interaction() {
                    self.beaconing.on_interaction(interaction);
                }
            }
        }
    }

    fn start_refresh(&mut self) {
        let live_asset = matches!(self.asset_type, AssetType::Linear { .. });
        if self.player.is_live() != live_asset {
            warn!(
                "Asset type {:?} does not match the loaded source (live: {})",
                self.asset_type,
                self.player.is_live()
            );
        }

        let handle = self.session.spawn_refresh(
            Arc::clone(&self.player),
            self.asset_type.clone(),
            self.events.clone(),
            Arc::clone(&self.disposed),
        );
        if let Some(previous) = lock(&self.refresh).replace(handle) {
            previous.abort();
        }
    }

    fn stop_refresh(&mut self) {
        if let Some(refresh) = lock(&self.refresh).take() {
            debug!("Source unloaded, stopping schedule refresh");
            refresh.abort();
        }
    }
}

impl Drop for SessionLoop {
    fn drop(&mut self) {
        self.beaconing.dispose();
        if let Some(refresh) = lock(&self.refresh).take() {
            refresh.abort();
        }
    }
}
