//! Host-side reactivity consumed by the chart lifecycle.
//!
//! A [`Runtime`] models one UI event loop: reactive writes queue watcher
//! effects, attach notifications queue post-settle jobs, and `flush` runs a
//! settling cycle.

mod reactive;
mod scheduler;

pub use reactive::{Reactive, Source};
pub use scheduler::{PostJob, Runtime, RuntimeStats, WatcherId};
