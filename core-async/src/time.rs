//! Time-related abstractions.
//!
//! ```rust
//! use core_async::time::{timeout, Duration};
//!
//! async fn example() {
//!     let result = timeout(Duration::from_millis(50), async { 42 }).await;
//!     assert_eq!(result.unwrap(), 42);
//! }
//! ```

pub use tokio::time::{error::Elapsed, sleep, timeout};

pub use std::time::{Duration, Instant};
