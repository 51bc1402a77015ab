use crate::record::{HistoryLog, Telemetry};
use bytemuck::{Pod, Zeroable};

/// Anything that pairs a record with the nanosecond timestamp it was taken at.
pub trait Timestamped {
    type Record: Telemetry;

    fn timestamp_nanos(&self) -> i64;
    fn record(&self) -> &Self::Record;
}

/// A history log stamped with its capture time.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct TimedLog {
    pub timestamp_nanos: i64,
    pub log: HistoryLog,
}

impl TimedLog {
    pub fn new(timestamp_nanos: i64, log: HistoryLog) -> Self {
        Self {
            timestamp_nanos,
            log,
        }
    }
}

impl Timestamped for TimedLog {
    type Record = HistoryLog;

    #[inline(always)]
    fn timestamp_nanos(&self) -> i64 {
        self.timestamp_nanos
    }

    #[inline(always)]
    fn record(&self) -> &HistoryLog {
        &self.log
    }
}

impl<R: Telemetry> Timestamped for (i64, R) {
    type Record = R;

    #[inline(always)]
    fn timestamp_nanos(&self) -> i64 {
        self.0
    }

    #[inline(always)]
    fn record(&self) -> &R {
        &self.1
    }
}
