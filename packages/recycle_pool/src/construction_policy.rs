/// Determines whether the pool lock is held while the factory constructs a new object.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum ConstructionPolicy {
    /// The factory runs while the pool lock is held. This is the default.
    ///
    /// Concurrent constructions are serialized, so an expensive factory becomes a point of
    /// contention under heavy concurrent `acquire()` traffic. Recycled objects also cannot be
    /// handed out while a construction is in progress.
    ///
    /// The factory must not call into the same pool, as that would deadlock.
    #[default]
    UnderLock,

    /// An allocation slot is reserved under the lock, then the lock is released while the
    /// factory runs.
    ///
    /// The reservation counts toward the limit, so the pool never holds more allocations than
    /// its limit permits. If the factory fails or panics, the reservation is released again.
    Reserved,
}
