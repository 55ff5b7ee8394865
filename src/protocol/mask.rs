//! Payload masking.
//!
//! Client-to-server payloads are XOR-ed against a rolling 4-byte key.
//! Masking is its own inverse, so the same functions mask and unmask.

/// Byte-by-byte XOR masking.
#[inline]
pub fn apply_mask(data: &mut [u8], mask: [u8; 4]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= mask[i % 4];
    }
}

/// Word-at-a-time XOR masking.
///
/// Processes four bytes per step with a `u32` XOR, then finishes the tail
/// byte by byte. Produces the same output as [`apply_mask`].
#[inline]
pub fn apply_mask_fast(data: &mut [u8], mask: [u8; 4]) {
    let mask_u32 = u32::from_ne_bytes(mask);
    let mut chunks = data.chunks_exact_mut(4);

    for chunk in &mut chunks {
        let word = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) ^ mask_u32;
        chunk.copy_from_slice(&word.to_ne_bytes());
    }

    // chunks_exact leaves at most three bytes, which start at a key boundary
    for (byte, key) in chunks.into_remainder().iter_mut().zip(mask) {
        *byte ^= key;
    }
}
