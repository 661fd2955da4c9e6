//! Frame admission control.
//!
//! A frame is admitted when at least `interval` has passed since the last
//! admitted frame **and** the lane has no unit of work in flight.  Rejected
//! frames are simply dropped: they are not queued, and they do not move the
//! reference timestamp.
//!
//! For any run of timestamps spanning `[0, T]` this admits at most
//! `floor(T / interval) + 1` frames, whatever the producer's frame rate.

use std::time::Duration;

use crate::recognize::Frame;

/// Throttle for one lane.  Pure bookkeeping; never blocks, never fails.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    interval: Duration,
    last_admitted: Option<Duration>,
}

impl FrameSampler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_admitted: None,
        }
    }

    /// Decide whether `frame` enters the lane.
    ///
    /// `in_flight` is the lane's busy flag as seen by the caller.
    pub fn admit(&mut self, frame: &Frame, in_flight: bool) -> bool {
        self.admit_at(frame.timestamp, in_flight)
    }

    /// [`admit`](Self::admit) on a bare timestamp.
    pub fn admit_at(&mut self, timestamp: Duration, in_flight: bool) -> bool {
        if in_flight {
            return false;
        }

        let due = match self.last_admitted {
            None => true,
            // A timestamp earlier than the last admission is never due.
            Some(last) => timestamp
                .checked_sub(last)
                .is_some_and(|elapsed| elapsed >= self.interval),
        };

        if due {
            self.last_admitted = Some(timestamp);
        }
        due
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_admitted(&self) -> Option<Duration> {
        self.last_admitted
    }

    /// Forget the last admission so the next idle frame is admitted.
    pub fn reset(&mut self) {
        self.last_admitted = None;
    }
}
