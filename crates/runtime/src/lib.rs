pub mod event_bus;
pub mod mailbox;
pub mod metrics;

pub use event_bus::*;
pub use mailbox::*;
pub use metrics::*;
