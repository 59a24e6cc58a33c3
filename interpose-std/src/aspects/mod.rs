//! Standard aspects.

pub mod logging;
pub mod timing;

pub use logging::LoggingAspect;
pub use timing::{Measurement, TimingAspect, TimingSink};
