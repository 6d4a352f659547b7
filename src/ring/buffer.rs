/// Fixed-capacity circular byte buffer over caller-owned storage.
///
/// Occupancy is derived from the two free-running counters, never from
/// `head == tail`, so a full ring and an empty ring are always distinguishable.
/// `head`/`write_count` belong to the writer, `tail`/`read_count` to the reader.
pub struct ByteRing<'a> {
    pub(crate) storage: &'a mut [u8],
    pub(crate) capacity: u32,
    pub(crate) head: u32,
    pub(crate) tail: u32,
    pub(crate) write_count: u32,
    pub(crate) read_count: u32,
}
