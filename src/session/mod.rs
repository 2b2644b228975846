pub mod backend;
pub mod manager;

pub use backend::TrackingSession;
pub use manager::SessionManager;
