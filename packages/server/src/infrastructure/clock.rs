//! System clock.

use quiz_lobby_shared::time::get_jst_timestamp;

use crate::domain::{Clock, Timestamp};

/// Clock backed by the system time (JST milliseconds)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(get_jst_timestamp())
    }
}
