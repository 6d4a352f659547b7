pub mod buffer;
pub mod ops;
pub mod ring_error;
pub mod spsc;

pub use buffer::ByteRing;
pub use ring_error::*;
pub use spsc::*;
