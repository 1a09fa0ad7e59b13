//! Little-endian reads from byte slices, as used by the legacy binary formats.
//!
//! Every function reads at `offset` and returns `None` when the slice is too short.

#[inline]
pub(crate) fn le_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    Some(u16::from_le_bytes(bytes.get(offset..offset + 2)?.try_into().ok()?))
}

#[inline]
pub(crate) fn le_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    Some(u32::from_le_bytes(bytes.get(offset..offset + 4)?.try_into().ok()?))
}

#[inline]
pub(crate) fn le_u64(bytes: &[u8], offset: usize) -> Option<u64> {
    Some(u64::from_le_bytes(bytes.get(offset..offset + 8)?.try_into().ok()?))
}

#[inline]
pub(crate) fn le_usize(bytes: &[u8], offset: usize) -> Option<usize> {
    le_u32(bytes, offset).map(|value| value as usize)
}

/// Splits a slice into consecutive 32-bit values; a trailing partial chunk is ignored.
pub(crate) fn le_usize_iter(bytes: &[u8]) -> impl Iterator<Item = usize> + '_ {
    bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as usize)
}
