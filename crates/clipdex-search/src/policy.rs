//! Read-path failure policy.
//!
//! Search, listing and facet reads degrade to an empty result when the
//! engine fails, so an outage shows up as "no results" instead of an error
//! in the serving layer. The strict `try_*` operations return the error; the
//! degrading ones apply [`OrEmpty`] to it.

use clipdex_core::Result;

/// Replace a failed read with its empty value.
pub trait OrEmpty<T> {
    /// The success value, or `T::default()` after logging the error.
    fn or_empty(self, operation: &str) -> T;
}

impl<T: Default> OrEmpty<T> for Result<T> {
    fn or_empty(self, operation: &str) -> T {
        self.unwrap_or_else(|e| {
            log::warn!("{operation} failed, returning empty result: {e}");
            T::default()
        })
    }
}
