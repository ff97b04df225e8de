//! Visual lane allocation

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of drawable lanes
pub const LANE_COUNT: u8 = 8;

/// A visualization slot owned by a live voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lane(pub u8);

/// Hands out the lowest free lane, recycling released ones
pub struct LaneAllocator {
    free: Vec<Lane>,
}

impl LaneAllocator {
    pub fn new() -> Self {
        Self {
            free: (0..LANE_COUNT).map(Lane).collect(),
        }
    }

    /// Take the lowest free lane.
    ///
    /// When every lane is taken a random one is returned instead; two voices
    /// then share a lane on screen.
    pub fn acquire(&mut self) -> Lane {
        if self.free.is_empty() {
            let lane = Lane(rand::rng().random_range(0..LANE_COUNT));
            tracing::warn!(lane = lane.0, "all lanes busy, sharing a lane");
            return lane;
        }
        self.free.remove(0)
    }

    /// Return a lane to the pool. Releasing a free lane is a no-op.
    pub fn release(&mut self, lane: Lane) {
        if lane.0 >= LANE_COUNT {
            return;
        }
        if let Err(pos) = self.free.binary_search(&lane) {
            self.free.insert(pos, lane);
        }
    }

    /// Number of lanes currently free
    pub fn available(&self) -> usize {
        self.free.len()
    }
}

impl Default for LaneAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_lowest_first() {
        let mut lanes = LaneAllocator::new();
        assert_eq!(lanes.acquire(), Lane(0));
        assert_eq!(lanes.acquire(), Lane(1));
        assert_eq!(lanes.acquire(), Lane(2));
        assert_eq!(lanes.available(), 5);
    }

    #[test]
    fn test_released_lane_is_reused() {
        let mut lanes = LaneAllocator::new();
        let _first = lanes.acquire();
        let second = lanes.acquire();
        let _third = lanes.acquire();

        lanes.release(second);
        assert_eq!(lanes.acquire(), second);
        assert_eq!(lanes.acquire(), Lane(3));
    }

    #[test]
    fn test_double_release_is_ignored() {
        let mut lanes = LaneAllocator::new();
        let lane = lanes.acquire();
        lanes.release(lane);
        lanes.release(lane);
        assert_eq!(lanes.available(), LANE_COUNT as usize);

        lanes.release(Lane(42));
        assert_eq!(lanes.available(), LANE_COUNT as usize);
    }

    #[test]
    fn test_exhausted_pool_stays_in_range() {
        let mut lanes = LaneAllocator::new();
        for expected in 0..LANE_COUNT {
            assert_eq!(lanes.acquire(), Lane(expected));
        }
        for _ in 0..32 {
            assert!(lanes.acquire().0 < LANE_COUNT);
        }
        assert_eq!(lanes.available(), 0);
    }
}
