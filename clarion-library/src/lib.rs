//! Stimulus library for Clarion - loading, configuration, sessions

mod config;
mod loader;
mod session;

pub use config::Config;
pub use loader::{resample_planar, LoadError, StimulusLoader};
pub use session::{Session, SessionError};
