//! Boxed stream aliases shared by the storage and HTTP bridges.

/// Dynamic async reader handed out by bridge implementations.
pub type DynAsyncRead = dyn core_async::io::AsyncRead + Send + Unpin;

/// Dynamic async writer handed out by bridge implementations.
pub type DynAsyncWrite = dyn core_async::io::AsyncWrite + Send + Unpin;
