use metrics::{counter, gauge};

// ── Metric names ────────────────────────────────────────────────────────

/// Tracking beacons dispatched by event type and result
pub const BEACONS_TOTAL: &str = "tailtrack_beacons_total";
/// Schedule refreshes by result (success, error)
pub const SCHEDULE_REFRESHES: &str = "tailtrack_schedule_refreshes_total";
/// Ad breaks in the most recently published schedule
pub const SCHEDULED_AD_BREAKS: &str = "tailtrack_scheduled_ad_breaks";
/// Lifecycle events emitted by kind
pub const LIFECYCLE_EVENTS: &str = "tailtrack_lifecycle_events_total";
/// Currently active tracking sessions
pub const ACTIVE_SESSIONS: &str = "tailtrack_active_sessions";

// ── Recording helpers ───────────────────────────────────────────────────

/// Record a beacon dispatch result
pub fn record_beacon(event_type: &str, result: &str) {
    counter!(BEACONS_TOTAL, "event_type" => event_type.to_string(), "result" => result.to_string())
        .increment(1);
}

/// Record a schedule refresh result
pub fn record_schedule_refresh(result: &str) {
    counter!(SCHEDULE_REFRESHES, "result" => result.to_string()).increment(1);
}

/// Update the number of scheduled ad breaks
pub fn set_scheduled_ad_breaks(count: usize) {
    gauge!(SCHEDULED_AD_BREAKS).set(count as f64);
}

/// Record an emitted lifecycle event
pub fn record_lifecycle_event(kind: &'static str) {
    counter!(LIFECYCLE_EVENTS, "kind" => kind).increment(1);
}

/// Track session start/stop
pub fn session_started() {
    gauge!(ACTIVE_SESSIONS).increment(1.0);
}

pub fn session_stopped() {
    gauge!(ACTIVE_SESSIONS).decrement(1.0);
}
