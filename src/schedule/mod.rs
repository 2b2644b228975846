pub mod decoder;
pub mod model;
pub mod store;

pub use model::{Ad, AdBreak, TrackingEvent};
pub use store::{Schedule, ScheduleStore};
