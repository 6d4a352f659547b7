use super::ring_error::{Result, RingError, check_layout};
use crate::ring::ByteRing;
use crate::stats::RingStats;
use std::{fmt, io};
use tracing::{debug, trace};

impl<'a> ByteRing<'a> {
    /// Binds a ring to the first `capacity` bytes of `storage`.
    ///
    /// All indices and counters start at zero. Fails only when `capacity` is
    /// zero, does not fit the 32-bit counters, or exceeds `storage.len()`.
    pub fn new(storage: &'a mut [u8], capacity: usize) -> Result<Self> {
        let capacity = check_layout(storage.len(), capacity)?;
        debug!(capacity, storage_len = storage.len(), "byte ring initialised");
        Ok(Self {
            storage,
            capacity,
            head: 0,
            tail: 0,
            write_count: 0,
            read_count: 0,
        })
    }

    /// Uses the whole of `storage` as ring capacity.
    pub fn from_slice(storage: &'a mut [u8]) -> Result<Self> {
        let capacity = storage.len();
        Self::new(storage, capacity)
    }

    /// Rebinds this ring to a new storage region and resets all state.
    ///
    /// On error the ring is left bound to its previous storage, untouched.
    pub fn reinit(&mut self, storage: &'a mut [u8], capacity: usize) -> Result<()> {
        let capacity = check_layout(storage.len(), capacity)?;
        debug!(capacity, storage_len = storage.len(), "byte ring rebound");
        self.storage = storage;
        self.capacity = capacity;
        self.reset_positions();
        Ok(())
    }

    #[inline(always)]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    #[inline(always)]
    pub fn head(&self) -> u32 {
        self.head
    }

    #[inline(always)]
    pub fn tail(&self) -> u32 {
        self.tail
    }

    #[inline(always)]
    pub fn write_count(&self) -> u32 {
        self.write_count
    }

    #[inline(always)]
    pub fn read_count(&self) -> u32 {
        self.read_count
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.write_count == self.read_count
    }

    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.available_data() >= self.capacity
    }

    /// Unread bytes. Exceeds `capacity` only after unguarded overwrites.
    #[inline(always)]
    pub fn available_data(&self) -> u32 {
        self.write_count.wrapping_sub(self.read_count)
    }

    /// Free slots; reports zero once the ring has been overrun.
    #[inline(always)]
    pub fn available_space(&self) -> u32 {
        self.capacity.saturating_sub(self.available_data())
    }

    /// Stores `byte` at `head` without checking for space.
    ///
    /// Callers must check [`is_full`](Self::is_full) first. Writing into a
    /// full ring overwrites the oldest unread byte and leaves the counters
    /// reporting more data than the ring can hold.
    #[inline]
    pub fn write(&mut self, byte: u8) {
        self.storage[self.head as usize] = byte;
        self.write_count = self.write_count.wrapping_add(1);
        self.head += 1;
        if self.head == self.capacity {
            self.head = 0;
        }
    }

    /// Takes the byte at `tail` without checking for data.
    ///
    /// Callers must check [`is_empty`](Self::is_empty) first. Reading an
    /// empty ring returns whatever byte is stale in the slot.
    #[inline]
    pub fn read(&mut self) -> u8 {
        let byte = self.storage[self.tail as usize];
        self.read_count = self.read_count.wrapping_add(1);
        self.tail += 1;
        if self.tail == self.capacity {
            self.tail = 0;
        }
        byte
    }

    #[inline]
    pub fn try_write(&mut self, byte: u8) -> Result<()> {
        if self.is_full() {
            trace!(capacity = self.capacity, "write refused, ring full");
            return Err(RingError::Full {
                capacity: self.capacity,
            });
        }
        self.write(byte);
        Ok(())
    }

    #[inline]
    pub fn try_read(&mut self) -> Result<u8> {
        if self.is_empty() {
            trace!("read refused, ring empty");
            return Err(RingError::Empty);
        }
        Ok(self.read())
    }

    /// Next byte `read` would return, if any.
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        Some(self.storage[self.tail as usize])
    }

    /// Most recently written byte, if any is still unread.
    #[inline]
    pub fn sniff(&self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let last = if self.head == 0 {
            self.capacity - 1
        } else {
            self.head - 1
        };
        Some(self.storage[last as usize])
    }

    /// Writes as much of `data` as fits and returns the number of bytes taken.
    pub fn write_slice(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(self.available_space() as usize);
        for &byte in &data[..n] {
            self.write(byte);
        }
        n
    }

    /// Fills `out` with as many unread bytes as are available, at most one
    /// lap of the ring even after an overrun.
    pub fn read_slice(&mut self, out: &mut [u8]) -> usize {
        let n = out
            .len()
            .min(self.available_data().min(self.capacity) as usize);
        for slot in &mut out[..n] {
            *slot = self.read();
        }
        n
    }

    /// Drops all unread data. Storage bytes are left as they are.
    pub fn flush(&mut self) {
        debug!(discarded = self.available_data(), "byte ring flushed");
        self.reset_positions();
    }

    pub fn stats(&self) -> RingStats {
        RingStats {
            capacity: self.capacity,
            available_data: self.available_data(),
            available_space: self.available_space(),
            write_count: self.write_count,
            read_count: self.read_count,
        }
    }

    /// Raw view of the backing storage, ignoring occupancy.
    pub fn storage(&self) -> &[u8] {
        &self.storage[..self.capacity as usize]
    }

    /// Raw mutable view of the backing storage. Writes here bypass the counters.
    pub fn storage_mut(&mut self) -> &mut [u8] {
        &mut self.storage[..self.capacity as usize]
    }

    #[inline]
    fn reset_positions(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.read_count = 0;
        self.write_count = 0;
    }

    #[cfg(test)]
    pub(crate) fn with_counters(storage: &'a mut [u8], capacity: usize, start: u32) -> Result<Self> {
        let mut ring = Self::new(storage, capacity)?;
        ring.write_count = start;
        ring.read_count = start;
        Ok(ring)
    }
}

impl fmt::Debug for ByteRing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteRing")
            .field("capacity", &self.capacity)
            .field("head", &self.head)
            .field("tail", &self.tail)
            .field("write_count", &self.write_count)
            .field("read_count", &self.read_count)
            .finish()
    }
}

impl io::Write for ByteRing<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_slice(buf))
    }

    /// No-op. Use the inherent [`ByteRing::flush`] to discard unread data.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Read for ByteRing<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_slice(buf))
    }
}
