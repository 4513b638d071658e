//! Fundamental types for BOLT message encoding.

use super::BoltError;

/// Maximum Lightning message size (2-byte length prefix limit).
pub const MAX_MESSAGE_SIZE: usize = 65535;

/// Size of a channel ID in bytes.
pub const CHANNEL_ID_SIZE: usize = 32;

/// A 32-byte channel identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelId(pub [u8; CHANNEL_ID_SIZE]);

impl ChannelId {
    /// Special all-zero channel ID: "all channels" for errors,
    /// "not channel-specific" for warnings.
    pub const ALL: Self = Self([0u8; CHANNEL_ID_SIZE]);

    /// Creates a channel ID from a byte array.
    #[must_use]
    pub const fn new(bytes: [u8; CHANNEL_ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the channel ID as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; CHANNEL_ID_SIZE] {
        &self.0
    }

    /// Decodes a channel ID from bytes, advancing the slice.
    ///
    /// # Errors
    ///
    /// Returns `Truncated` if there are fewer than 32 bytes.
    pub fn decode(data: &mut &[u8]) -> Result<Self, BoltError> {
        if data.len() < CHANNEL_ID_SIZE {
            return Err(BoltError::Truncated {
                expected: CHANNEL_ID_SIZE,
                actual: data.len(),
            });
        }
        #[allow(clippy::missing_panics_doc)] // Size check above
        let bytes: [u8; CHANNEL_ID_SIZE] = data[..CHANNEL_ID_SIZE].try_into().unwrap();
        *data = &data[CHANNEL_ID_SIZE..];
        Ok(Self(bytes))
    }

    /// Encodes the channel ID to a vector.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0);
    }
}

/// Decodes a `BigSize` value, returning it and the bytes consumed.
///
/// `BigSize` is Bitcoin's `CompactSize` in big-endian: values up to 0xfc
/// inline in one byte, then 0xfd/0xfe/0xff prefixes for 2/4/8-byte
/// big-endian payloads. Non-minimal encodings are rejected.
///
/// # Errors
///
/// Returns `BigSizeTruncated` on a short read, `BigSizeNotMinimal` when a
/// wider encoding carries a value a narrower one could.
pub fn decode_bigsize(data: &[u8]) -> Result<(u64, usize), BoltError> {
    let Some((&prefix, rest)) = data.split_first() else {
        return Err(BoltError::BigSizeTruncated);
    };
    let (width, floor) = match prefix {
        0xfd => (2, 0xfd),
        0xfe => (4, 0x1_0000),
        0xff => (8, 0x1_0000_0000),
        byte => return Ok((u64::from(byte), 1)),
    };

    if rest.len() < width {
        return Err(BoltError::BigSizeTruncated);
    }
    let value = rest[..width]
        .iter()
        .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte));
    if value < floor {
        return Err(BoltError::BigSizeNotMinimal);
    }
    Ok((value, width + 1))
}

/// Encodes a value as `BigSize`.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Each arm checks the range first
pub fn encode_bigsize(value: u64) -> Vec<u8> {
    match value {
        0..=0xfc => vec![value as u8],
        0xfd..=0xffff => {
            let mut out = vec![0xfd];
            out.extend_from_slice(&(value as u16).to_be_bytes());
            out
        }
        0x1_0000..=0xffff_ffff => {
            let mut out = vec![0xfe];
            out.extend_from_slice(&(value as u32).to_be_bytes());
            out
        }
        _ => {
            let mut out = vec![0xff];
            out.extend_from_slice(&value.to_be_bytes());
            out
        }
    }
}

/// Returns the encoded length of a `BigSize` value.
#[must_use]
pub const fn bigsize_len(value: u64) -> usize {
    match value {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

/// Reads a u16 big-endian, advancing the slice past the read bytes.
///
/// # Errors
///
/// Returns `Truncated` if there are fewer than 2 bytes.
pub fn read_u16_be(data: &mut &[u8]) -> Result<u16, BoltError> {
    if data.len() < 2 {
        return Err(BoltError::Truncated {
            expected: 2,
            actual: data.len(),
        });
    }
    let value = u16::from_be_bytes([data[0], data[1]]);
    *data = &data[2..];
    Ok(value)
}

/// Writes a u16 big-endian to a vector.
pub fn write_u16_be(value: u16, out: &mut Vec<u8>) {
    out.extend_from_slice(&value.to_be_bytes());
}
