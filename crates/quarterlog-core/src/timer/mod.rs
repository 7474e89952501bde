mod clock;
mod engine;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{
    IntervalTimer, TimerConfig, TimerPhase, DEFAULT_CAPTURE_SECS, DEFAULT_INTERVAL_SECS,
};
