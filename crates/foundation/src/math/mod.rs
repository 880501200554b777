pub mod mercator;

pub use mercator::*;
