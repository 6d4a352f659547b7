use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RingError {
    #[error("Ring buffer full: all {capacity} bytes are unread")]
    Full { capacity: u32 },

    #[error("Ring buffer empty")]
    Empty,

    #[error("Invalid capacity {capacity}: {reason}")]
    InvalidCapacity {
        capacity: usize,
        reason: &'static str,
    },

    #[error("Storage too small: required {required} bytes, available {available} bytes")]
    StorageTooSmall { required: usize, available: usize },
}

pub type Result<T> = std::result::Result<T, RingError>;

/// Validates a caller-supplied storage region against the requested capacity.
pub(crate) fn check_layout(storage_len: usize, capacity: usize) -> Result<u32> {
    if capacity == 0 {
        return Err(RingError::InvalidCapacity {
            capacity,
            reason: "must be greater than zero",
        });
    }
    let Ok(cap) = u32::try_from(capacity) else {
        return Err(RingError::InvalidCapacity {
            capacity,
            reason: "must fit in the 32-bit counter width",
        });
    };
    if storage_len < capacity {
        return Err(RingError::StorageTooSmall {
            required: capacity,
            available: storage_len,
        });
    }
    Ok(cap)
}
