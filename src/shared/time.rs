//! Usage: Wall-clock helpers.

use chrono::{DateTime, SubsecRound, Utc};

/// Current time at warehouse TIMESTAMP precision (microseconds).
pub(crate) fn now_utc() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub(crate) fn now_unix_seconds() -> i64 {
    Utc::now().timestamp()
}

pub(crate) fn now_unix_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_utc_has_no_sub_microsecond_component() {
        let now = now_utc();
        assert_eq!(now.timestamp_subsec_nanos() % 1_000, 0);
    }
}
