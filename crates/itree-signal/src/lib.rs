//! itree Signal
//!
//! Ordered, synchronous, multi-subscriber notification channels.
//!
//! # Core Concepts
//!
//! - [`Signal`]: subscriber list fired with a payload reference
//! - [`Connection`]: disposable subscription handle
//! - [`ConnectionGuard`]: disconnects on drop
//! - [`DispatchError`]: handler failures surfaced after a full dispatch
//!
//! # Example
//!
//! ```rust
//! use itree_signal::Signal;
//!
//! let changed = Signal::<String>::new("Changed");
//! let connection = changed.connect(|property| {
//!     println!("{property} changed");
//!     Ok(())
//! });
//!
//! changed.fire(&"Name".to_string()).unwrap();
//! connection.disconnect();
//! assert!(changed.is_empty());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod connection;
mod error;
mod signal;

// Re-exports
pub use connection::{Connection, ConnectionGuard, ConnectionId};
pub use error::{DispatchError, DispatchReport, HandlerFailure};
pub use signal::Signal;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
