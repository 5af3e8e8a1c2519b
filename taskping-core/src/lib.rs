//! taskping-core: Core types and alert scheduling for the taskping daemon

pub mod alert;
pub mod scheduler;
pub mod task;
pub mod time;

pub use alert::{AlertKind, Notification, due_time};
pub use scheduler::AlertScheduler;
pub use task::Task;
pub use time::{local_day_bounds, parse_source_datetime};
