use std::any::type_name;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Weak};

use tracing::{debug, trace};

use crate::PoolCore;

/// An exclusively owned object acquired from a [`RecyclePool`][crate::RecyclePool].
///
/// The object is accessed through [`Deref`] and [`DerefMut`]. When the handle is dropped, the
/// object goes back to the pool it came from so a later `acquire()` can reuse it. If that pool
/// no longer exists, the object is dropped instead.
///
/// The handle can be moved between threads (if `T: Send`) but never cloned. At any moment,
/// every pooled object is owned by exactly one handle.
///
/// # Example
///
/// ```rust
/// use recycle_pool::RecyclePool;
///
/// let pool = RecyclePool::new(|| String::with_capacity(1024));
///
/// let mut buffer = pool.acquire().unwrap().unwrap();
/// buffer.push_str("hello");
/// assert_eq!(buffer.as_str(), "hello");
///
/// // Dropping the handle returns the buffer to the pool, contents and all.
/// drop(buffer);
/// assert_eq!(pool.pooled(), 1);
///
/// let buffer = pool.acquire().unwrap().unwrap();
/// assert_eq!(buffer.as_str(), "hello");
/// ```
pub struct Recycled<T> {
    // Only `None` after the object has been moved out, either by `into_inner()` or while
    // `Drop` is running the return protocol.
    object: Option<Box<T>>,

    return_to: ReturnToPool<T>,
}

impl<T> Recycled<T> {
    pub(crate) fn new(object: Box<T>, return_to: ReturnToPool<T>) -> Self {
        Self {
            object: Some(object),
            return_to,
        }
    }

    /// Takes the object out of pool management for good.
    ///
    /// The object will never be returned to the pool. The pool still counts it as allocated,
    /// so a limited pool permanently gives up one slot for every object taken this way.
    ///
    /// # Example
    ///
    /// ```rust
    /// use recycle_pool::RecyclePool;
    ///
    /// let pool = RecyclePool::new(|| vec![0_u8; 16]);
    ///
    /// let buffer = pool.acquire().unwrap().unwrap();
    /// let owned: Box<Vec<u8>> = buffer.into_inner();
    ///
    /// assert_eq!(owned.len(), 16);
    /// assert_eq!(pool.allocated(), 1);
    /// assert_eq!(pool.pooled(), 0);
    /// ```
    #[must_use]
    pub fn into_inner(mut self) -> Box<T> {
        self.return_to.detach();

        self.object
            .take()
            .expect("object is only taken by into_inner() or drop(), both of which consume self")
    }

    /// Severs the link to the originating pool, so dropping this handle drops the object.
    pub(crate) fn detach(&mut self) {
        self.return_to.detach();
    }

    fn object(&self) -> &T {
        self.object
            .as_deref()
            .expect("object is only taken by into_inner() or drop(), both of which consume self")
    }

    fn object_mut(&mut self) -> &mut T {
        self.object
            .as_deref_mut()
            .expect("object is only taken by into_inner() or drop(), both of which consume self")
    }
}

impl<T> Deref for Recycled<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.object()
    }
}

impl<T> DerefMut for Recycled<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.object_mut()
    }
}

impl<T> AsRef<T> for Recycled<T> {
    fn as_ref(&self) -> &T {
        self.object()
    }
}

impl<T> AsMut<T> for Recycled<T> {
    fn as_mut(&mut self) -> &mut T {
        self.object_mut()
    }
}

impl<T> Drop for Recycled<T> {
    fn drop(&mut self) {
        if let Some(object) = self.object.take() {
            self.return_to.dispose(object);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Recycled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("object", &self.object)
            .field("return_to", &self.return_to)
            .finish()
    }
}

/// Decides the fate of an object whose handle is being dropped.
///
/// Holds a weak reference to the pool that created the object, so neither checked out nor
/// recycled objects keep the pool alive.
pub(crate) struct ReturnToPool<T> {
    pool: Weak<PoolCore<T>>,
}

impl<T> ReturnToPool<T> {
    pub(crate) fn new(pool: &Arc<PoolCore<T>>) -> Self {
        Self {
            pool: Arc::downgrade(pool),
        }
    }

    pub(crate) fn detach(&mut self) {
        self.pool = Weak::new();
    }

    fn dispose(&self, object: Box<T>) {
        let Some(pool) = self.pool.upgrade() else {
            debug!(
                type_name = type_name::<T>(),
                "originating pool is gone; dropping returned object"
            );
            drop(object);
            return;
        };

        let entry = Recycled::new(object, Self::new(&pool));

        match pool.add(entry) {
            Ok(()) => trace!(type_name = type_name::<T>(), "object returned to pool"),
            Err(mut rejected) => {
                debug!(
                    type_name = type_name::<T>(),
                    "pool could not take back returned object; dropping it"
                );

                // Detached, the rejected entry drops its object instead of coming back here.
                rejected.detach();
                drop(rejected);
            }
        }

        // If every `RecyclePool` was dropped while we held `pool`, the pool is torn down here.
        drop(pool);
    }
}

impl<T> fmt::Debug for ReturnToPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("attached", &(self.pool.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::RecyclePool;

    assert_impl_all!(Recycled<u32>: Send, Sync);
    assert_impl_all!(Recycled<Cell<u32>>: Send);
    assert_not_impl_any!(Recycled<u32>: Clone);
    assert_not_impl_any!(Recycled<Rc<u32>>: Send);

    #[test]
    fn deref_reaches_object() {
        let pool = RecyclePool::new(|| vec![1, 2, 3]);
        let mut handle = pool.acquire().unwrap().unwrap();

        assert_eq!(handle.len(), 3);

        handle.push(4);
        assert_eq!(handle.as_ref(), &[1, 2, 3, 4]);

        handle.as_mut().clear();
        assert!(handle.is_empty());
    }

    #[test]
    fn dropping_handle_returns_object_to_pool() {
        let pool = RecyclePool::new(|| 7_u32);
        let handle = pool.acquire().unwrap().unwrap();

        assert_eq!(pool.pooled(), 0);
        drop(handle);
        assert_eq!(pool.pooled(), 1);
    }

    #[test]
    fn into_inner_never_returns_object() {
        let pool = RecyclePool::new(|| 7_u32);
        let handle = pool.acquire().unwrap().unwrap();

        let object = handle.into_inner();
        assert_eq!(*object, 7);

        assert_eq!(pool.pooled(), 0);
        assert_eq!(pool.allocated(), 1);
    }

    #[test]
    fn detached_handle_drops_object() {
        static DROPS: AtomicUsize = AtomicUsize::new(0);

        struct CountsDrops;

        impl Drop for CountsDrops {
            fn drop(&mut self) {
                DROPS.fetch_add(1, Ordering::Relaxed);
            }
        }

        let pool = RecyclePool::new(|| CountsDrops);
        let mut handle = pool.acquire().unwrap().unwrap();

        handle.detach();
        drop(handle);

        assert_eq!(DROPS.load(Ordering::Relaxed), 1);
        assert_eq!(pool.pooled(), 0);
    }

    #[test]
    fn handle_outliving_pool_drops_object() {
        let pool = RecyclePool::new(String::new);
        let handle = pool.acquire().unwrap().unwrap();

        drop(pool);

        assert!(handle.return_to.pool.upgrade().is_none());
        drop(handle);
    }

    #[test]
    fn debug_output_names_type() {
        let pool = RecyclePool::new(|| 5_u8);
        let handle = pool.acquire().unwrap().unwrap();

        let output = format!("{handle:?}");
        assert!(output.contains("Recycled"));
        assert!(output.contains("attached: true"));
    }
}
