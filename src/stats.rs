use std::fmt;

/// Point-in-time view of a ring's occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RingStats {
    pub capacity: u32,
    pub available_data: u32,
    pub available_space: u32,
    pub write_count: u32,
    pub read_count: u32,
}

impl RingStats {
    /// Fraction of capacity holding unread data. Only a `Default` snapshot
    /// has zero capacity, and it reports 0.0.
    #[inline]
    pub fn fill_ratio(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.available_data as f64 / self.capacity as f64
    }
}

impl fmt::Display for RingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "capacity={} used={} free={} writes={} reads={} fill={:.1}%",
            self.capacity,
            self.available_data,
            self.available_space,
            self.write_count,
            self.read_count,
            self.fill_ratio() * 100.0
        )
    }
}
