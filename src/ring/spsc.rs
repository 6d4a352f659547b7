use super::ring_error::{Result, RingError, check_layout};
use crate::stats::RingStats;
use std::fmt;
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, trace};

/// Byte ring shared by exactly one producer and one consumer without a lock.
///
/// The producer only stores `head` and `write_count`; the consumer only stores
/// `tail` and `read_count`. Slot bytes are published with a Release store of
/// the owning side's counter and observed through an Acquire load of it.
pub struct SpscByteRing<'a> {
    buf: *mut u8,
    capacity: u32,
    head: AtomicU32,
    write_count: AtomicU32,
    tail: AtomicU32,
    read_count: AtomicU32,
    _storage: PhantomData<&'a mut [u8]>,
}

unsafe impl Send for SpscByteRing<'_> {}
unsafe impl Sync for SpscByteRing<'_> {}

impl<'a> SpscByteRing<'a> {
    pub fn new(storage: &'a mut [u8], capacity: usize) -> Result<Self> {
        let capacity = check_layout(storage.len(), capacity)?;
        debug!(capacity, storage_len = storage.len(), "spsc byte ring initialised");
        Ok(Self {
            buf: storage.as_mut_ptr(),
            capacity,
            head: AtomicU32::new(0),
            write_count: AtomicU32::new(0),
            tail: AtomicU32::new(0),
            read_count: AtomicU32::new(0),
            _storage: PhantomData,
        })
    }

    pub fn from_slice(storage: &'a mut [u8]) -> Result<Self> {
        let capacity = storage.len();
        Self::new(storage, capacity)
    }

    /// Hands out the single producer and single consumer.
    ///
    /// Both borrow the ring, so [`flush`](Self::flush) cannot run until both
    /// handles are gone.
    pub fn split(&mut self) -> (Producer<'_, 'a>, Consumer<'_, 'a>) {
        debug!(capacity = self.capacity, "spsc byte ring split");
        let ring = &*self;
        (Producer { ring }, Consumer { ring })
    }

    #[inline(always)]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.available_data() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.available_data() >= self.capacity
    }

    #[inline]
    pub fn available_data(&self) -> u32 {
        let written = self.write_count.load(Ordering::Acquire);
        let read = self.read_count.load(Ordering::Acquire);
        written.wrapping_sub(read)
    }

    #[inline]
    pub fn available_space(&self) -> u32 {
        self.capacity.saturating_sub(self.available_data())
    }

    /// Drops all unread data. Exclusive access means neither side is active.
    pub fn flush(&mut self) {
        debug!(discarded = self.available_data(), "spsc byte ring flushed");
        *self.head.get_mut() = 0;
        *self.tail.get_mut() = 0;
        *self.read_count.get_mut() = 0;
        *self.write_count.get_mut() = 0;
    }

    pub fn stats(&self) -> RingStats {
        let write_count = self.write_count.load(Ordering::Acquire);
        let read_count = self.read_count.load(Ordering::Acquire);
        let available_data = write_count.wrapping_sub(read_count);
        RingStats {
            capacity: self.capacity,
            available_data,
            available_space: self.capacity.saturating_sub(available_data),
            write_count,
            read_count,
        }
    }

    #[inline(always)]
    fn advance(&self, pos: u32, n: u32) -> u32 {
        advance_index(pos, n, self.capacity)
    }

    #[cfg(test)]
    pub(crate) fn with_counters(storage: &'a mut [u8], capacity: usize, start: u32) -> Result<Self> {
        let ring = Self::new(storage, capacity)?;
        ring.write_count.store(start, Ordering::Relaxed);
        ring.read_count.store(start, Ordering::Relaxed);
        Ok(ring)
    }

    #[cfg(test)]
    pub(crate) fn with_positions(storage: &'a mut [u8], capacity: usize, pos: u32) -> Result<Self> {
        let ring = Self::new(storage, capacity)?;
        ring.head.store(pos, Ordering::Relaxed);
        ring.tail.store(pos, Ordering::Relaxed);
        Ok(ring)
    }
}

/// Moves `pos` forward by `n` slots in a ring of `capacity`.
///
/// Requires `pos < capacity` and `n <= capacity`. Never computes `pos + n`
/// directly, so capacities near `u32::MAX` cannot overflow.
#[inline(always)]
pub(crate) fn advance_index(pos: u32, n: u32, capacity: u32) -> u32 {
    let remaining = capacity - pos;
    if n >= remaining {
        n - remaining
    } else {
        pos + n
    }
}

impl fmt::Debug for SpscByteRing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpscByteRing")
            .field("capacity", &self.capacity)
            .field("head", &self.head.load(Ordering::Relaxed))
            .field("tail", &self.tail.load(Ordering::Relaxed))
            .field("write_count", &self.write_count.load(Ordering::Relaxed))
            .field("read_count", &self.read_count.load(Ordering::Relaxed))
            .finish()
    }
}

pub struct Producer<'r, 'a> {
    ring: &'r SpscByteRing<'a>,
}

pub struct Consumer<'r, 'a> {
    ring: &'r SpscByteRing<'a>,
}

impl Producer<'_, '_> {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    #[inline]
    pub fn available_data(&self) -> u32 {
        self.ring.available_data()
    }

    #[inline]
    pub fn available_space(&self) -> u32 {
        self.ring.available_space()
    }

    /// Stores `byte` at `head` without checking for space.
    ///
    /// # Safety
    /// The caller must have seen `!is_full()` since its last write. Writing
    /// into a full ring races with the consumer reading the same slot.
    #[inline]
    pub unsafe fn write_unchecked(&mut self, byte: u8) {
        let head = self.ring.head.load(Ordering::Relaxed);
        unsafe {
            self.ring.buf.add(head as usize).write(byte);
        }
        self.publish(head, 1);
    }

    #[inline]
    pub fn try_write(&mut self, byte: u8) -> Result<()> {
        if self.is_full() {
            trace!(capacity = self.ring.capacity, "write refused, ring full");
            return Err(RingError::Full {
                capacity: self.ring.capacity,
            });
        }
        unsafe { self.write_unchecked(byte) };
        Ok(())
    }

    /// Copies as much of `data` as fits, publishing it with a single counter update.
    pub fn write_slice(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(self.available_space() as usize);
        if n == 0 {
            return 0;
        }
        let head = self.ring.head.load(Ordering::Relaxed);
        let start = head as usize;
        let contiguous = self.ring.capacity as usize - start;
        unsafe {
            let buf = self.ring.buf;
            if n <= contiguous {
                ptr::copy_nonoverlapping(data.as_ptr(), buf.add(start), n);
            } else {
                ptr::copy_nonoverlapping(data.as_ptr(), buf.add(start), contiguous);
                ptr::copy_nonoverlapping(data.as_ptr().add(contiguous), buf, n - contiguous);
            }
        }
        self.publish(head, n as u32);
        n
    }

    #[inline(always)]
    fn publish(&mut self, head: u32, n: u32) {
        let ring = self.ring;
        ring.head.store(ring.advance(head, n), Ordering::Release);
        let written = ring.write_count.load(Ordering::Relaxed);
        ring.write_count.store(written.wrapping_add(n), Ordering::Release);
    }
}

impl Consumer<'_, '_> {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    #[inline]
    pub fn available_data(&self) -> u32 {
        self.ring.available_data()
    }

    #[inline]
    pub fn available_space(&self) -> u32 {
        self.ring.available_space()
    }

    /// Takes the byte at `tail` without checking for data.
    ///
    /// # Safety
    /// The caller must have seen `!is_empty()` since its last read. Reading an
    /// empty ring races with the producer filling the same slot.
    #[inline]
    pub unsafe fn read_unchecked(&mut self) -> u8 {
        let tail = self.ring.tail.load(Ordering::Relaxed);
        let byte = unsafe { self.ring.buf.add(tail as usize).read() };
        self.release(tail, 1);
        byte
    }

    #[inline]
    pub fn try_read(&mut self) -> Result<u8> {
        if self.is_empty() {
            trace!("read refused, ring empty");
            return Err(RingError::Empty);
        }
        Ok(unsafe { self.read_unchecked() })
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let tail = self.ring.tail.load(Ordering::Relaxed);
        Some(unsafe { self.ring.buf.add(tail as usize).read() })
    }

    /// Most recently published byte, if any is still unread.
    #[inline]
    pub fn sniff(&self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        // Slot head - 1 is inside the unread range, so the producer cannot touch it.
        let head = self.ring.head.load(Ordering::Acquire);
        let last = if head == 0 {
            self.ring.capacity - 1
        } else {
            head - 1
        };
        Some(unsafe { self.ring.buf.add(last as usize).read() })
    }

    pub fn read_slice(&mut self, out: &mut [u8]) -> usize {
        let n = out
            .len()
            .min(self.available_data().min(self.ring.capacity) as usize);
        if n == 0 {
            return 0;
        }
        let tail = self.ring.tail.load(Ordering::Relaxed);
        let start = tail as usize;
        let contiguous = self.ring.capacity as usize - start;
        unsafe {
            let buf = self.ring.buf;
            if n <= contiguous {
                ptr::copy_nonoverlapping(buf.add(start), out.as_mut_ptr(), n);
            } else {
                ptr::copy_nonoverlapping(buf.add(start), out.as_mut_ptr(), contiguous);
                ptr::copy_nonoverlapping(buf, out.as_mut_ptr().add(contiguous), n - contiguous);
            }
        }
        self.release(tail, n as u32);
        n
    }

    #[inline(always)]
    fn release(&mut self, tail: u32, n: u32) {
        let ring = self.ring;
        ring.tail.store(ring.advance(tail, n), Ordering::Release);
        let read = ring.read_count.load(Ordering::Relaxed);
        ring.read_count.store(read.wrapping_add(n), Ordering::Release);
    }
}
