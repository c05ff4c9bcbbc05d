//! Time source seam.

use super::value_object::Timestamp;

/// Wall clock used for answer timing and idle accounting.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}
