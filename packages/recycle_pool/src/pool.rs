use std::any::type_name;
use std::fmt;
use std::mem;
use std::num::NonZero;
use std::result::Result as StdResult;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{
    ConstructionPolicy, Error, FactoryError, RecyclePoolBuilder, Recycled, Result, ReturnToPool,
};

pub(crate) type Factory<T> = Box<dyn Fn() -> StdResult<T, FactoryError> + Send + Sync>;

/// A thread-safe pool that hands out exclusively owned objects and takes them back for reuse.
///
/// New objects are created on demand by the factory the pool was built with. When a
/// [`Recycled<T>`] handle is dropped, its object returns to the pool and the next `acquire()`
/// hands it out again instead of invoking the factory. The most recently returned object is
/// reused first.
///
/// # Lifetime management
///
/// The pool type itself acts as a handle - any clones of it are functionally equivalent,
/// similar to `Arc`. The pool is torn down when the last clone is dropped, even if objects
/// are still checked out: handles only keep a weak reference to the pool. Recycled objects
/// waiting in the pool are dropped at teardown and objects checked out at that time are
/// dropped when their handles are.
///
/// # Limits
///
/// A pool may be limited to a maximum number of allocated objects. An allocated object is one
/// the factory has constructed, whether it is currently checked out or waiting in the pool.
/// Once the limit is reached and no recycled object is available, `acquire()` returns
/// `Ok(None)` immediately. The pool never blocks waiting for an object to be returned.
///
/// # Thread safety
///
/// The pool is thread-safe (`Send` and `Sync`) and requires `T: Send`. All operations are short
/// critical sections guarded by a single lock. By default the factory also runs under that
/// lock; see [`ConstructionPolicy`] for the alternative.
///
/// # Example
///
/// ```rust
/// use new_zealand::nz;
/// use recycle_pool::RecyclePool;
///
/// let pool = RecyclePool::builder(|| Vec::<u8>::with_capacity(4096))
///     .limit(nz!(2))
///     .build();
///
/// let first = pool.acquire().unwrap().expect("pool has room for two objects");
/// let second = pool.acquire().unwrap().expect("pool has room for two objects");
///
/// // Both objects are checked out, so the pool is exhausted.
/// assert!(pool.acquire().unwrap().is_none());
///
/// drop(first);
/// let third = pool.acquire().unwrap().expect("a recycled object is available");
///
/// assert_eq!(pool.allocated(), 2);
/// # drop((second, third));
/// ```
pub struct RecyclePool<T> {
    core: Arc<PoolCore<T>>,
}

impl<T> RecyclePool<T>
where
    T: Send + 'static,
{
    /// Creates an unlimited pool that constructs new objects with `factory`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use recycle_pool::RecyclePool;
    ///
    /// let pool = RecyclePool::new(|| String::with_capacity(64));
    ///
    /// assert_eq!(pool.limit(), None);
    /// assert_eq!(pool.allocated(), 0);
    /// assert_eq!(pool.pooled(), 0);
    /// ```
    #[must_use]
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::builder(factory).build()
    }

    /// Returns a builder for a pool that constructs new objects with `factory`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use new_zealand::nz;
    /// use recycle_pool::{ConstructionPolicy, RecyclePool};
    ///
    /// let pool = RecyclePool::builder(|| [0_u8; 256])
    ///     .limit(nz!(8))
    ///     .construction(ConstructionPolicy::Reserved)
    ///     .build();
    ///
    /// assert_eq!(pool.limit().map(|limit| limit.get()), Some(8));
    /// ```
    pub fn builder<F>(factory: F) -> RecyclePoolBuilder<T>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        RecyclePoolBuilder::new(Box::new(move || Ok::<T, FactoryError>(factory())))
    }

    /// Returns a builder for a pool whose factory may fail to construct an object.
    ///
    /// A factory error is returned from `acquire()` as [`Error::Factory`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::net::TcpListener;
    ///
    /// use recycle_pool::RecyclePool;
    ///
    /// let pool = RecyclePool::try_builder(|| TcpListener::bind("127.0.0.1:0")).build();
    ///
    /// match pool.acquire() {
    ///     Ok(Some(listener)) => println!("listening on {:?}", listener.local_addr()),
    ///     Ok(None) => unreachable!("an unlimited pool is never exhausted"),
    ///     Err(error) => println!("could not create listener: {error}"),
    /// }
    /// ```
    pub fn try_builder<F, E>(factory: F) -> RecyclePoolBuilder<T>
    where
        F: Fn() -> StdResult<T, E> + Send + Sync + 'static,
        E: Into<FactoryError>,
    {
        RecyclePoolBuilder::new(Box::new(move || {
            factory().map_err(Into::<FactoryError>::into)
        }))
    }

    pub(crate) fn from_parts(
        factory: Factory<T>,
        limit: Option<NonZero<usize>>,
        construction: ConstructionPolicy,
    ) -> Self {
        Self {
            core: Arc::new(PoolCore {
                factory,
                limit,
                construction,
                state: Mutex::new(PoolState {
                    allocated: 0,
                    recycled: Vec::new(),
                }),
            }),
        }
    }

    /// Acquires an object from the pool.
    ///
    /// The most recently returned object is handed out if one is waiting in the pool.
    /// Otherwise the factory constructs a new object, as long as the limit permits.
    ///
    /// Returns `Ok(None)` if the pool is exhausted: the limit has been reached and every
    /// allocated object is checked out.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Factory`] if a new object was needed and the factory failed to
    /// construct it. The failed construction does not count toward the limit.
    ///
    /// # Example
    ///
    /// ```rust
    /// use new_zealand::nz;
    /// use recycle_pool::RecyclePool;
    ///
    /// let pool = RecyclePool::builder(|| 0_u64).limit(nz!(1)).build();
    ///
    /// let counter = pool.acquire()?.expect("limit not yet reached");
    /// assert!(pool.acquire()?.is_none());
    ///
    /// drop(counter);
    /// assert!(pool.acquire()?.is_some());
    /// # Ok::<(), recycle_pool::Error>(())
    /// ```
    pub fn acquire(&self) -> Result<Option<Recycled<T>>> {
        PoolCore::acquire(&self.core)
    }
}

impl<T> RecyclePool<T> {
    /// The maximum number of objects the pool will allocate, or `None` if unlimited.
    #[must_use]
    pub fn limit(&self) -> Option<NonZero<usize>> {
        self.core.limit
    }

    /// The number of objects the factory has constructed for this pool.
    ///
    /// This includes objects that are checked out and objects waiting in the pool. The count
    /// never decreases, even when an object is dropped instead of being returned.
    ///
    /// This is a snapshot that may be stale by the time it is observed if other threads are
    /// using the pool.
    #[must_use]
    pub fn allocated(&self) -> usize {
        self.core.state.lock().allocated
    }

    /// The number of returned objects waiting in the pool to be reused.
    ///
    /// This is a snapshot that may be stale by the time it is observed if other threads are
    /// using the pool.
    #[must_use]
    pub fn pooled(&self) -> usize {
        self.core.state.lock().recycled.len()
    }

    /// The number of allocated objects not waiting in the pool.
    ///
    /// These are objects currently held by callers, plus any that were taken out of pool
    /// management or dropped instead of being returned.
    #[must_use]
    pub fn checked_out(&self) -> usize {
        let state = self.core.state.lock();

        state
            .allocated
            .checked_sub(state.recycled.len())
            .expect("the pool never holds more recycled objects than it has allocated")
    }
}

impl<T> Clone for RecyclePool<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T> fmt::Debug for RecyclePool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("core", &self.core)
            .finish()
    }
}

pub(crate) struct PoolCore<T> {
    factory: Factory<T>,
    limit: Option<NonZero<usize>>,
    construction: ConstructionPolicy,
    state: Mutex<PoolState<T>>,
}

// `allocated` and `recycled` are only ever read or written together under one lock.
struct PoolState<T> {
    allocated: usize,

    // Used as a stack: the last object returned is the first one reused.
    recycled: Vec<Recycled<T>>,
}

impl<T> PoolState<T> {
    fn has_room(&self, limit: Option<NonZero<usize>>) -> bool {
        limit.is_none_or(|limit| self.allocated < limit.get())
    }

    fn count_allocation(&mut self) {
        self.allocated = self
            .allocated
            .checked_add(1)
            .expect("allocation count cannot exceed usize::MAX");
    }
}

impl<T> PoolCore<T> {
    fn acquire(this: &Arc<Self>) -> Result<Option<Recycled<T>>> {
        let mut state = this.state.lock();

        if let Some(recycled) = state.recycled.pop() {
            trace!(
                type_name = type_name::<T>(),
                pooled = state.recycled.len(),
                "reusing recycled object"
            );
            return Ok(Some(recycled));
        }

        if !state.has_room(this.limit) {
            debug!(
                type_name = type_name::<T>(),
                allocated = state.allocated,
                "pool exhausted"
            );
            return Ok(None);
        }

        let object = match this.construction {
            ConstructionPolicy::UnderLock => {
                let object = this.construct()?;
                state.count_allocation();
                object
            }
            ConstructionPolicy::Reserved => {
                state.count_allocation();
                drop(state);

                // Covers both a factory error and a factory panic.
                let reservation = scopeguard::guard((), |()| this.release_reservation());
                let object = this.construct()?;
                scopeguard::ScopeGuard::into_inner(reservation);

                object
            }
        };

        trace!(type_name = type_name::<T>(), "constructed new object");

        Ok(Some(Recycled::new(object, ReturnToPool::new(this))))
    }

    fn construct(&self) -> Result<Box<T>> {
        match (self.factory)() {
            Ok(object) => Ok(Box::new(object)),
            Err(source) => {
                debug!(
                    type_name = type_name::<T>(),
                    error = %source,
                    "factory failed to construct object"
                );
                Err(Error::Factory { source })
            }
        }
    }

    fn release_reservation(&self) {
        let mut state = self.state.lock();

        state.allocated = state
            .allocated
            .checked_sub(1)
            .expect("a reservation is always counted before it is released");
    }

    /// Pushes a returned object onto the recycle stack.
    ///
    /// Hands the entry back if the stack cannot grow to hold it.
    pub(crate) fn add(&self, entry: Recycled<T>) -> StdResult<(), Recycled<T>> {
        let mut state = self.state.lock();

        if !make_room(&mut state.recycled) {
            return Err(entry);
        }

        state.recycled.push(entry);
        Ok(())
    }
}

#[cfg_attr(test, mutants::skip)] // Allocation failure cannot be provoked in tests.
fn make_room<T>(recycled: &mut Vec<Recycled<T>>) -> bool {
    recycled.try_reserve(1).is_ok()
}

impl<T> Drop for PoolCore<T> {
    fn drop(&mut self) {
        let state = self.state.get_mut();

        // Every entry is detached before any is dropped, so no object tries to come back
        // into a pool that is being torn down.
        for entry in &mut state.recycled {
            entry.detach();
        }

        let recycled = mem::take(&mut state.recycled);

        debug!(
            type_name = type_name::<T>(),
            allocated = state.allocated,
            dropping = recycled.len(),
            "pool torn down"
        );

        drop(recycled);
    }
}

impl<T> fmt::Debug for PoolCore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (allocated, pooled) = {
            let state = self.state.lock();
            (state.allocated, state.recycled.len())
        };

        f.debug_struct(type_name::<Self>())
            .field("limit", &self.limit)
            .field("construction", &self.construction)
            .field("allocated", &allocated)
            .field("pooled", &pooled)
            .finish_non_exhaustive()
    }
}
