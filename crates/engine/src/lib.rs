//! Port between the map controller and a stateful map-rendering engine.
//!
//! The controller only ever talks to an engine through [`MapEngine`]. Engine
//! originated signals come back through an [`EngineListener`] and through the
//! one-shot completion callbacks handed to asynchronous operations; both may
//! be invoked from engine-internal threads.

pub mod camera;
pub mod error;
pub mod event;
pub mod feature;
pub mod filter;
pub mod port;
pub mod settings;
pub mod sim;
pub mod style;

pub use camera::*;
pub use error::*;
pub use event::*;
pub use feature::*;
pub use port::*;
pub use settings::*;
pub use style::*;
