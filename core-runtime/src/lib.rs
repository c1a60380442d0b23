//! Runtime plumbing for the reading shelf core.
//!
//! The other core crates take their tracing setup from [`logging`], their
//! validated [`config::CoreConfig`] from [`config`] and report catalog
//! refresh progress to the host through the [`events::EventBus`].

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
