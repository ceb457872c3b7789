//! Engine implementations shipped with the crate.

mod headless;

pub use headless::{EngineCall, HeadlessEngine, HeadlessError, HeadlessInstance, HeadlessTarget};
