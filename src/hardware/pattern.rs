//! Deterministic frame payloads for the mock camera.
//!
//! Layout: an 8-byte little-endian frame number followed by a byte sequence
//! seeded by that number. Any retrieved buffer can therefore be checked to be
//! exactly one whole frame, with no bytes from a neighbouring frame mixed in.

const HEADER_LEN: usize = 8;

/// Same LCG constants as glibc, for reproducible bytes across platforms.
#[inline]
fn prng(seed: u64) -> u64 {
    seed.wrapping_mul(1_103_515_245).wrapping_add(12_345) & 0x7fff_ffff
}

fn body_byte(state: &mut u64) -> u8 {
    *state = prng(*state);
    (*state >> 16) as u8
}

/// Fill `dst` with the pattern for `frame_number`.
///
/// Buffers shorter than the header receive a truncated header.
pub fn fill_frame(dst: &mut [u8], frame_number: u64) {
    let header = frame_number.to_le_bytes();
    let split = dst.len().min(HEADER_LEN);
    dst[..split].copy_from_slice(&header[..split]);

    let mut state = frame_number ^ 0x5eed;
    for b in &mut dst[split..] {
        *b = body_byte(&mut state);
    }
}

/// Allocate and fill a frame of `len` bytes.
#[must_use]
pub fn generate_frame(len: usize, frame_number: u64) -> Vec<u8> {
    let mut frame = vec![0u8; len];
    fill_frame(&mut frame, frame_number);
    frame
}

/// Frame number encoded in the header, if the buffer is long enough.
#[must_use]
pub fn frame_number_of(frame: &[u8]) -> Option<u64> {
    let header: [u8; HEADER_LEN] = frame.get(..HEADER_LEN)?.try_into().ok()?;
    Some(u64::from_le_bytes(header))
}

/// True if `frame` is byte-for-byte the pattern for its own header.
#[must_use]
pub fn is_intact_frame(frame: &[u8]) -> bool {
    let Some(number) = frame_number_of(frame) else {
        return false;
    };
    let mut state = number ^ 0x5eed;
    frame[HEADER_LEN..]
        .iter()
        .all(|&b| b == body_byte(&mut state))
}
