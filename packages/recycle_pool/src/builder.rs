use std::any::type_name;
use std::fmt;
use std::num::NonZero;

use crate::{ConstructionPolicy, Factory, RecyclePool};

/// Builder for creating an instance of [`RecyclePool`].
///
/// Obtained from [`RecyclePool::builder()`] or [`RecyclePool::try_builder()`], which take the
/// factory the pool uses to construct new objects.
///
/// # Examples
///
/// ```
/// use new_zealand::nz;
/// use recycle_pool::{ConstructionPolicy, RecyclePool};
///
/// // Unlimited pool, factory runs under the pool lock.
/// let pool = RecyclePool::builder(String::new).build();
///
/// // At most 16 objects, factory runs outside the pool lock.
/// let pool = RecyclePool::builder(String::new)
///     .limit(nz!(16))
///     .construction(ConstructionPolicy::Reserved)
///     .build();
/// ```
#[must_use]
pub struct RecyclePoolBuilder<T> {
    factory: Factory<T>,
    limit: Option<NonZero<usize>>,
    construction: ConstructionPolicy,
}

impl<T> RecyclePoolBuilder<T>
where
    T: Send + 'static,
{
    pub(crate) fn new(factory: Factory<T>) -> Self {
        Self {
            factory,
            limit: None,
            construction: ConstructionPolicy::default(),
        }
    }

    /// Sets the maximum number of objects the pool will construct.
    ///
    /// Objects count toward the limit for as long as the pool counts them as allocated, which
    /// is forever: the allocation count never decreases. By default, the pool is unlimited.
    ///
    /// # Examples
    ///
    /// ```
    /// use new_zealand::nz;
    /// use recycle_pool::RecyclePool;
    ///
    /// let pool = RecyclePool::builder(|| 0_u32).limit(nz!(1)).build();
    ///
    /// let _only = pool.acquire().unwrap().unwrap();
    /// assert!(pool.acquire().unwrap().is_none());
    /// ```
    pub fn limit(mut self, limit: NonZero<usize>) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the [construction policy][ConstructionPolicy] for the pool. This governs whether
    /// the pool lock is held while the factory constructs a new object.
    pub fn construction(mut self, policy: ConstructionPolicy) -> Self {
        self.construction = policy;
        self
    }

    /// Builds the pool with the specified configuration.
    #[must_use]
    pub fn build(self) -> RecyclePool<T> {
        RecyclePool::from_parts(self.factory, self.limit, self.construction)
    }
}

impl<T> fmt::Debug for RecyclePoolBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("limit", &self.limit)
            .field("construction", &self.construction)
            .finish_non_exhaustive()
    }
}
