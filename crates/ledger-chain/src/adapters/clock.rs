use crate::ports::BlockClock;
use shared_types::TimePointSec;

/// Schedules each block exactly one interval after the head.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedIntervalClock;

impl BlockClock for FixedIntervalClock {
    fn next_block_time(&self, head_time: TimePointSec, block_interval: u8) -> TimePointSec {
        head_time.saturating_add(u32::from(block_interval.max(1)))
    }
}
