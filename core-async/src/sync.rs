//! Synchronization primitives.
//!
//! All primitives are async-aware: waiting on a [`Mutex`] or a [`Semaphore`]
//! suspends the task instead of blocking the executor thread.
//!
//! ```rust
//! use core_async::sync::{Mutex, Semaphore};
//!
//! async fn example() {
//!     let refresh_lock = Mutex::new(());
//!     let _guard = refresh_lock.lock().await;
//!
//!     let downloads = Semaphore::new(4);
//!     let _permit = downloads.acquire().await.unwrap();
//! }
//! ```

pub use tokio::sync::{
    broadcast, AcquireError, Mutex, MutexGuard, RwLock, Semaphore, SemaphorePermit, TryLockError,
};
