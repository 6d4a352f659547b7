pub mod ring;
pub mod stats;

pub use ring::{ByteRing, Consumer, Producer, RingError, SpscByteRing};
pub use stats::RingStats;
