//! Async runtime facade for the reading shelf core.
//!
//! Every `core-*` and `provider-*` crate depends on this crate instead of
//! depending on Tokio directly. The executor can then be configured in one
//! place, and test and entry-point macros stay uniform across the workspace.
//!
//! # Modules
//!
//! - `task`: Task spawning and join handles
//! - `time`: Sleep, timeouts and duration types
//! - `sync`: Async-aware locks, semaphores and the broadcast channel
//! - `io`: Async I/O traits
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let handle = task::spawn(async {
//!         sleep(Duration::from_millis(10)).await;
//!         42
//!     });
//!     assert_eq!(handle.await.unwrap(), 42);
//! }
//! ```

// Re-export the async entry-point/test macros so downstream crates never need
// direct Tokio dependencies.
pub use core_async_macros::{main, test};

pub mod io;
pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;
pub use time::{sleep, Duration, Instant};
