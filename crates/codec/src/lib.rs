//! Conversions between host wire values (`serde_json::Value`) and the domain
//! types understood by the controller and the engine port.
//!
//! Everything here is pure. Required geometry is never defaulted; a missing
//! or mistyped field yields a [`CodecError`] naming that field.

pub mod camera;
pub mod error;
pub mod geo;
pub mod options;
pub mod style;
pub mod value;

pub use camera::{CameraCommand, camera_command};
pub use error::CodecError;
pub use options::MapOptions;
