//! Total order of delivered events.

use crate::domain::LendingEvent;
use serde::{Deserialize, Serialize};

/// Ordering key for events: block height, then log index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventOrderingKey {
    /// Block height (primary sort).
    pub block_height: u64,
    /// Log index within the block (secondary sort).
    pub log_index: u32,
}

impl EventOrderingKey {
    pub fn new(block_height: u64, log_index: u32) -> Self {
        EventOrderingKey {
            block_height,
            log_index,
        }
    }

    pub fn from_event(event: &LendingEvent) -> Self {
        EventOrderingKey {
            block_height: event.block_height,
            log_index: event.log_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Address, EventKind, Timestamp};

    fn make_event(block_height: u64, log_index: u32) -> LendingEvent {
        LendingEvent {
            block_height,
            block_timestamp: Timestamp::new(1_600_000_000),
            tx_hash: format!("0x{:x}", block_height),
            log_index,
            address: Address::zero(),
            kind: EventKind::AccrueInterest {
                cash_prior: Default::default(),
                interest_accumulated: Default::default(),
                borrow_index: Default::default(),
                total_borrows: Default::default(),
            },
        }
    }

    #[test]
    fn test_key_orders_by_height_then_log_index() {
        let a = EventOrderingKey::from_event(&make_event(100, 5));
        let b = EventOrderingKey::from_event(&make_event(101, 0));
        let c = EventOrderingKey::from_event(&make_event(101, 2));
        assert!(a < b);
        assert!(b < c);
        assert_eq!(b, EventOrderingKey::new(101, 0));
    }
}
