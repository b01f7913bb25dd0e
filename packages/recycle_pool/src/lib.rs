#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! This package provides [`RecyclePool`], a thread-safe pool that recycles expensive objects
//! instead of constructing new ones every time one is needed.
//!
//! Objects are handed out as [`Recycled<T>`] handles that own the object exclusively. Dropping
//! a handle returns its object to the pool, ready to be handed out again. The pool constructs a
//! new object through a caller-supplied factory only when no returned object is waiting.
//!
//! # Features
//!
//! - **Exclusive ownership**: Every object is owned by exactly one handle at a time.
//! - **Automatic return**: Dropping a handle returns its object to the pool.
//! - **LIFO reuse**: The most recently returned object is reused first, while it is still warm
//!   in the processor caches.
//! - **Optional limit**: The pool can cap how many objects it will ever construct. An exhausted
//!   pool reports that immediately instead of blocking.
//! - **Safe teardown**: Handles only weakly reference their pool. Dropping the pool while objects
//!   are checked out is allowed: those objects are dropped when their handles are.
//! - **Fallible factories**: Factory errors are returned to the caller of `acquire()`.
//!
//! # Example
//!
//! ```rust
//! use new_zealand::nz;
//! use recycle_pool::RecyclePool;
//!
//! // A pool of large buffers, at most 4 of which will ever be allocated.
//! let pool = RecyclePool::builder(|| vec![0_u8; 64 * 1024])
//!     .limit(nz!(4))
//!     .build();
//!
//! let mut buffer = pool.acquire()?.expect("pool is not exhausted");
//! buffer[0] = 42;
//!
//! // The buffer goes back to the pool when the handle is dropped.
//! drop(buffer);
//! assert_eq!(pool.pooled(), 1);
//!
//! // The next acquisition reuses it instead of allocating a new one.
//! let buffer = pool.acquire()?.expect("pool is not exhausted");
//! assert_eq!(buffer[0], 42);
//! assert_eq!(pool.allocated(), 1);
//! # Ok::<(), recycle_pool::Error>(())
//! ```
//!
//! # Logging
//!
//! The pool emits `tracing` events: `trace` level for every reuse, construction and return,
//! `debug` level for exhaustion, factory failures, objects dropped instead of returned and pool
//! teardown. No subscriber is installed by this package.

mod builder;
mod construction_policy;
mod error;
mod pool;
mod recycled;

pub use builder::*;
pub use construction_policy::*;
pub use error::{Error, FactoryError};
pub(crate) use error::Result;
pub(crate) use pool::{Factory, PoolCore};
pub use pool::RecyclePool;
pub use recycled::Recycled;
pub(crate) use recycled::ReturnToPool;
