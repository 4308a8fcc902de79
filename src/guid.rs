#[cfg(not(feature = "std"))]
use core as std;

use std::{fmt, ops};

/// Represents a 128-bit Globally Unique IDentifier.
///
/// A value is immutable once constructed. The three marker invariants hold for
/// every instance created through [`Guid::from_parts`]: the version nibble of
/// `time_high_and_version` is `0xA`, the two reserved bits of
/// `clock_seq_high_and_reserved` are `11`, and the high bit of `node[0]` is set
/// (a locally administered address, never a registered hardware one).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Guid {
    time_low: u32,
    time_mid: u16,
    time_high_and_version: u16,
    clock_seq_high_and_reserved: u8,
    clock_seq_low: u8,
    node: [u8; 6],
}

/// Version marker occupying the high nibble of `time_high_and_version`.
const VERSION_BITS: u16 = 0xA000;

/// Reserved marker occupying the two high bits of `clock_seq_high_and_reserved`.
const RESERVED_BITS: u8 = 0xC0;

impl Guid {
    /// Creates a GUID from a 100-nanosecond-tick timestamp, a clock sequence,
    /// and a 6-byte node identifier.
    ///
    /// Only the low 60 bits of `timestamp` and the low 14 bits of
    /// `clock_sequence` are representable; excess bits are discarded. The
    /// version, reserved, and locally-administered markers are applied
    /// unconditionally.
    pub const fn from_parts(timestamp: u64, clock_sequence: u64, node: [u8; 6]) -> Self {
        Self {
            time_low: timestamp as u32,
            time_mid: (timestamp >> 32) as u16,
            time_high_and_version: ((timestamp >> 48) as u16 & 0x0FFF) | VERSION_BITS,
            clock_seq_high_and_reserved: ((clock_sequence >> 8) as u8 & 0x3F) | RESERVED_BITS,
            clock_seq_low: clock_sequence as u8,
            node: [
                node[0] | 0x80,
                node[1],
                node[2],
                node[3],
                node[4],
                node[5],
            ],
        }
    }

    /// Returns the 60-bit adjusted timestamp carried by this GUID.
    pub const fn timestamp(&self) -> u64 {
        ((self.time_high_and_version & 0x0FFF) as u64) << 48
            | (self.time_mid as u64) << 32
            | self.time_low as u64
    }

    /// Returns the 6-byte node identifier.
    pub const fn node(&self) -> &[u8; 6] {
        &self.node
    }

    /// Returns the 16-byte structural representation: `time_low` (big-endian),
    /// `time_mid`, `time_high_and_version`, the two clock-sequence bytes, and
    /// the node identifier.
    ///
    /// Note that the octet order differs from the text representation, which
    /// emits the timestamp fields high-to-low (see [`Guid::encode`]).
    pub const fn to_bytes(&self) -> [u8; 16] {
        [
            (self.time_low >> 24) as u8,
            (self.time_low >> 16) as u8,
            (self.time_low >> 8) as u8,
            self.time_low as u8,
            (self.time_mid >> 8) as u8,
            self.time_mid as u8,
            (self.time_high_and_version >> 8) as u8,
            self.time_high_and_version as u8,
            self.clock_seq_high_and_reserved,
            self.clock_seq_low,
            self.node[0],
            self.node[1],
            self.node[2],
            self.node[3],
            self.node[4],
            self.node[5],
        ]
    }

    /// Creates a GUID from its 16-byte structural representation.
    ///
    /// The bytes are taken verbatim; no marker bits are rewritten.
    pub const fn from_bytes(src: [u8; 16]) -> Self {
        Self {
            time_low: (src[0] as u32) << 24
                | (src[1] as u32) << 16
                | (src[2] as u32) << 8
                | src[3] as u32,
            time_mid: (src[4] as u16) << 8 | src[5] as u16,
            time_high_and_version: (src[6] as u16) << 8 | src[7] as u16,
            clock_seq_high_and_reserved: src[8],
            clock_seq_low: src[9],
            node: [src[10], src[11], src[12], src[13], src[14], src[15]],
        }
    }

    /// Returns the 32-character uppercase hexadecimal representation stored in
    /// a stack-allocated structure that can be dereferenced as `str` and
    /// [`Display`](fmt::Display)ed.
    ///
    /// The fields are emitted as `time_high_and_version` (4 nibbles, most
    /// significant first), `time_mid` (4), `time_low` (8), the two
    /// clock-sequence bytes (4), and the node identifier (12). This order is
    /// part of the emitted format and is kept even though it does not match
    /// the 8-4-4-4-12 grouping of common UUID text representations.
    pub fn encode(&self) -> impl ops::Deref<Target = str> + fmt::Display {
        const DIGITS: &[u8; 16] = b"0123456789ABCDEF";

        let text_order = [
            (self.time_high_and_version >> 8) as u8,
            self.time_high_and_version as u8,
            (self.time_mid >> 8) as u8,
            self.time_mid as u8,
            (self.time_low >> 24) as u8,
            (self.time_low >> 16) as u8,
            (self.time_low >> 8) as u8,
            self.time_low as u8,
            self.clock_seq_high_and_reserved,
            self.clock_seq_low,
            self.node[0],
            self.node[1],
            self.node[2],
            self.node[3],
            self.node[4],
            self.node[5],
        ];

        let mut buffer = [0u8; 32];
        let mut buf_iter = buffer.iter_mut();
        for e in text_order {
            *buf_iter.next().unwrap() = DIGITS[(e >> 4) as usize];
            *buf_iter.next().unwrap() = DIGITS[(e & 15) as usize];
        }
        debug_assert!(buffer.is_ascii());
        GuidStr(buffer)
    }
}

impl fmt::Display for Guid {
    /// Returns the 32-character uppercase hexadecimal representation.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl From<Guid> for [u8; 16] {
    fn from(src: Guid) -> Self {
        src.to_bytes()
    }
}

impl From<[u8; 16]> for Guid {
    fn from(src: [u8; 16]) -> Self {
        Self::from_bytes(src)
    }
}

impl From<Guid> for u128 {
    fn from(src: Guid) -> Self {
        Self::from_be_bytes(src.to_bytes())
    }
}

impl From<u128> for Guid {
    fn from(src: u128) -> Self {
        Self::from_bytes(src.to_be_bytes())
    }
}

/// Concrete return type of [`Guid::encode()`] containing the stack-allocated
/// 32-character representation.
struct GuidStr([u8; 32]);

impl ops::Deref for GuidStr {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        debug_assert!(self.0.is_ascii());
        unsafe { std::str::from_utf8_unchecked(&self.0) }
    }
}

impl fmt::Display for GuidStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self)
    }
}

#[cfg(feature = "std")]
#[cfg_attr(docsrs, doc(cfg(feature = "std")))]
mod std_ext {
    use super::Guid;

    impl From<Guid> for String {
        fn from(src: Guid) -> Self {
            src.to_string()
        }
    }
}

#[cfg(feature = "serde")]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
mod serde_support {
    use super::{fmt, Guid};
    use serde::{de, Deserializer, Serializer};

    impl serde::Serialize for Guid {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            if serializer.is_human_readable() {
                serializer.serialize_str(&self.encode())
            } else {
                serializer.serialize_bytes(&self.to_bytes())
            }
        }
    }

    /// Deserializes from the 16-byte structural representation only. The text
    /// form is generation output, not an input format, so no string
    /// deserialization is offered.
    impl<'de> serde::Deserialize<'de> for Guid {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_bytes(VisitorImpl)
        }
    }

    struct VisitorImpl;

    impl<'de> de::Visitor<'de> for VisitorImpl {
        type Value = Guid;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(formatter, "a 16-byte GUID representation")
        }

        fn visit_bytes<E: de::Error>(self, value: &[u8]) -> Result<Self::Value, E> {
            <[u8; 16]>::try_from(value)
                .map(Self::Value::from)
                .map_err(de::Error::custom)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::Guid;
        use serde_test::{assert_ser_tokens, assert_tokens, Configure, Token};

        /// Serializes the human-readable form as the 32-character string
        #[test]
        fn serializes_human_readable_form_as_32_character_string() {
            let e = Guid::from_parts(0x1234_5678_9ABC_DEF0, 0x2A5A, [0x01, 0x23, 0x45, 0x67, 0x89, 0xAB]);
            assert_ser_tokens(
                &e.readable(),
                &[Token::Str("A23456789ABCDEF0EA5A8123456789AB")],
            );
        }

        /// Round-trips the compact form through 16 bytes
        #[test]
        fn round_trips_compact_form_through_16_bytes() {
            let e = Guid::from_parts(0x1234_5678_9ABC_DEF0, 0x2A5A, [0x01, 0x23, 0x45, 0x67, 0x89, 0xAB]);
            assert_tokens(
                &e.compact(),
                &[Token::Bytes(&[
                    0x9A, 0xBC, 0xDE, 0xF0, 0x56, 0x78, 0xA2, 0x34, 0xEA, 0x5A, 0x81, 0x23, 0x45,
                    0x67, 0x89, 0xAB,
                ])],
            );
        }
    }
}
