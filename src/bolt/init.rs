//! BOLT 1 init message.

use super::types::{read_u16_be, write_u16_be};
use super::BoltError;

/// BOLT 1 init message (type 16).
///
/// The first message each side sends after the Noise handshake,
/// advertising its feature bits. Anything after the two feature fields is
/// a TLV extension stream; it is carried opaquely and round-trips
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Init {
    /// Legacy global features (deprecated, should be empty).
    pub globalfeatures: Vec<u8>,
    /// Feature bits supported by this node.
    pub features: Vec<u8>,
    /// Raw extension bytes after the feature fields.
    pub extension: Vec<u8>,
}

impl Init {
    /// Creates an init advertising no features.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates an init with the given feature bits.
    #[must_use]
    pub fn with_features(features: Vec<u8>) -> Self {
        Self {
            features,
            ..Self::default()
        }
    }

    /// Encodes to wire format (without message type prefix).
    ///
    /// # Panics
    ///
    /// Panics if either feature field exceeds the u16 length prefix.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let gflen = u16::try_from(self.globalfeatures.len()).expect("globalfeatures fit u16");
        let flen = u16::try_from(self.features.len()).expect("features fit u16");

        let mut out = Vec::with_capacity(4 + self.globalfeatures.len() + self.features.len());
        write_u16_be(gflen, &mut out);
        out.extend_from_slice(&self.globalfeatures);
        write_u16_be(flen, &mut out);
        out.extend_from_slice(&self.features);
        out.extend_from_slice(&self.extension);
        out
    }

    /// Decodes from wire format (without message type prefix).
    ///
    /// # Errors
    ///
    /// Returns `Truncated` if either feature field runs past the payload.
    pub fn decode(payload: &[u8]) -> Result<Self, BoltError> {
        let mut cursor = payload;

        let gflen = usize::from(read_u16_be(&mut cursor)?);
        if cursor.len() < gflen {
            return Err(BoltError::Truncated {
                expected: gflen,
                actual: cursor.len(),
            });
        }
        let globalfeatures = cursor[..gflen].to_vec();
        cursor = &cursor[gflen..];

        let flen = usize::from(read_u16_be(&mut cursor)?);
        if cursor.len() < flen {
            return Err(BoltError::Truncated {
                expected: flen,
                actual: cursor.len(),
            });
        }
        let features = cursor[..flen].to_vec();
        cursor = &cursor[flen..];

        Ok(Self {
            globalfeatures,
            features,
            extension: cursor.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_init_is_four_zero_bytes() {
        assert_eq!(Init::empty().encode(), [0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn features_roundtrip() {
        let original = Init::with_features(vec![0x08, 0xa0, 0x00]);
        let decoded = Init::decode(&original.encode()).unwrap();
        assert_eq!(decoded, original);
        assert!(decoded.globalfeatures.is_empty());
    }

    #[test]
    fn extension_bytes_are_preserved() {
        // Feature fields followed by an opaque TLV extension stream.
        let original = Init {
            globalfeatures: Vec::new(),
            features: vec![0x20, 0x00],
            extension: vec![0x01, 0x02, 0xaa, 0xbb],
        };
        let encoded = original.encode();
        let decoded = Init::decode(&encoded).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.encode(), encoded);
    }

    #[test]
    fn decode_truncated_features() {
        // flen says 4 bytes but only 2 follow.
        let payload = [0x00, 0x00, 0x00, 0x04, 0xaa, 0xbb];
        assert_eq!(
            Init::decode(&payload),
            Err(BoltError::Truncated {
                expected: 4,
                actual: 2
            })
        );
    }

    #[test]
    fn decode_truncated_header() {
        assert_eq!(
            Init::decode(&[0x00]),
            Err(BoltError::Truncated {
                expected: 2,
                actual: 1
            })
        );
    }
}
