use std::error::Error as StdError;

use thiserror::Error;

/// The error type a fallible factory may return, boxed so the pool can carry any source.
pub type FactoryError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors that can occur when acquiring an object from a [`RecyclePool`][crate::RecyclePool].
///
/// Running out of objects is not an error. An exhausted pool returns `Ok(None)`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The factory supplied to the pool failed to construct a new object.
    ///
    /// The pool's allocation count is unchanged by a failed construction.
    #[error("factory failed to construct a new pooled object")]
    Factory {
        /// The error returned by the factory.
        source: FactoryError,
    },
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;
    use std::io;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn factory_error_exposes_source() {
        let error = Error::Factory {
            source: Box::new(io::Error::other("out of sockets")),
        };

        let source = error.source().expect("factory error must have a source");
        assert_eq!(source.to_string(), "out of sockets");
    }

    #[test]
    fn factory_error_message_leaves_source_to_chain() {
        let error = Error::Factory {
            source: Box::new(io::Error::other("out of sockets")),
        };

        // Reporters that walk the source chain would otherwise print the cause twice.
        assert_eq!(
            error.to_string(),
            "factory failed to construct a new pooled object"
        );
    }
}
