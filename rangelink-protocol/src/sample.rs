//! Telemetry Sample Structure and Serialization
//!
//! One sample travels per datagram. The layout is fixed-size with no
//! variable-length fields, so a datagram of any other length is rejected
//! outright:
//!
//! ```text
//!  0       1       2               6              10                      18              22              26
//!  +-------+-------+---------------+---------------+-----------------------+---------------+---------------+
//!  |version| kind  |   sequence    |   distance    |    send_time.secs     | send_time.us  |   integrity   |
//!  +-------+-------+---------------+---------------+-----------------------+---------------+---------------+
//! ```
//!
//! All multi-byte fields are network byte order. The version byte selects the
//! integrity scheme, so a stronger checksum never changes what a v1 datagram
//! means on the wire.

use crate::time::WallTime;
use bytes::{Buf, BufMut, BytesMut};
use ring::digest;
use std::fmt;
use thiserror::Error;

/// Size of an encoded sample in bytes
pub const SAMPLE_SIZE: usize = 26;

/// Sample kind discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SampleKind {
    /// Placeholder used only to measure transit delay during calibration
    Sync = 0,
    /// Sequenced distance reading
    Data = 1,
}

impl SampleKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(SampleKind::Sync),
            1 => Some(SampleKind::Data),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleKind::Sync => write!(f, "Sync"),
            SampleKind::Data => write!(f, "Data"),
        }
    }
}

/// Integrity check applied to `sequence` and `distance`
///
/// The scheme doubles as the wire version: v1 is XOR, v2 is digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum IntegrityScheme {
    /// `sequence ^ distance`
    ///
    /// Cheap and order-insensitive. Flipping the same bits in both fields
    /// leaves the checksum unchanged, so that corruption goes undetected.
    #[default]
    Xor = 1,
    /// First four bytes of SHA-256 over `sequence ‖ distance` (big-endian)
    Digest = 2,
}

impl IntegrityScheme {
    /// Map a wire version byte to its scheme
    pub fn from_version(version: u8) -> Option<Self> {
        match version {
            1 => Some(IntegrityScheme::Xor),
            2 => Some(IntegrityScheme::Digest),
            _ => None,
        }
    }

    /// Wire version byte for this scheme
    pub fn version(self) -> u8 {
        self as u8
    }
}

/// Compute the integrity value of `sequence` and `distance` under `scheme`
pub fn checksum(scheme: IntegrityScheme, sequence: u32, distance: u32) -> u32 {
    match scheme {
        IntegrityScheme::Xor => sequence ^ distance,
        IntegrityScheme::Digest => {
            let mut input = [0u8; 8];
            input[..4].copy_from_slice(&sequence.to_be_bytes());
            input[4..].copy_from_slice(&distance.to_be_bytes());
            let hash = digest::digest(&digest::SHA256, &input);
            let mut prefix = &hash.as_ref()[..4];
            prefix.get_u32()
        }
    }
}

/// One telemetry sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Sync or Data
    pub kind: SampleKind,
    /// Data sequence number (0 for Sync)
    pub sequence: u32,
    /// Distance reading (0 for Sync)
    pub distance: u32,
    /// Sender wall clock at emission
    pub send_time: WallTime,
    /// Checksum over `sequence` and `distance`
    pub integrity: u32,
    /// Integrity scheme, carried as the wire version
    pub scheme: IntegrityScheme,
}

impl Sample {
    /// Create a calibration placeholder
    pub fn sync(send_time: WallTime, scheme: IntegrityScheme) -> Self {
        Sample {
            kind: SampleKind::Sync,
            sequence: 0,
            distance: 0,
            send_time,
            integrity: checksum(scheme, 0, 0),
            scheme,
        }
    }

    /// Create a data sample
    pub fn data(sequence: u32, distance: u32, send_time: WallTime, scheme: IntegrityScheme) -> Self {
        Sample {
            kind: SampleKind::Data,
            sequence,
            distance,
            send_time,
            integrity: checksum(scheme, sequence, distance),
            scheme,
        }
    }

    /// Check if this is a calibration placeholder
    #[inline]
    pub fn is_sync(&self) -> bool {
        self.kind == SampleKind::Sync
    }

    /// Check if this is a data sample
    #[inline]
    pub fn is_data(&self) -> bool {
        self.kind == SampleKind::Data
    }

    /// Checksum the sample should carry given its current fields
    #[inline]
    pub fn expected_integrity(&self) -> u32 {
        checksum(self.scheme, self.sequence, self.distance)
    }

    /// Recompute the checksum and compare it to `integrity`
    pub fn is_valid(&self) -> bool {
        self.integrity == self.expected_integrity()
    }

    /// Serialize the sample to bytes (network byte order)
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(SAMPLE_SIZE);
        buf.put_u8(self.scheme.version());
        buf.put_u8(self.kind.as_u8());
        buf.put_u32(self.sequence);
        buf.put_u32(self.distance);
        buf.put_i64(self.send_time.secs());
        buf.put_u32(self.send_time.subsec_micros());
        buf.put_u32(self.integrity);
        buf
    }

    /// Parse a sample from bytes
    ///
    /// Integrity is not checked here; a corrupted sample still decodes so the
    /// caller can report what it carried.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() != SAMPLE_SIZE {
            return Err(DecodeError::Length {
                expected: SAMPLE_SIZE,
                actual: bytes.len(),
            });
        }

        let mut buf = bytes;
        let version = buf.get_u8();
        let scheme =
            IntegrityScheme::from_version(version).ok_or(DecodeError::UnsupportedVersion(version))?;
        let kind_raw = buf.get_u8();
        let kind = SampleKind::from_u8(kind_raw).ok_or(DecodeError::UnknownKind(kind_raw))?;
        let sequence = buf.get_u32();
        let distance = buf.get_u32();
        let secs = buf.get_i64();
        let micros = buf.get_u32();
        if micros >= 1_000_000 {
            return Err(DecodeError::InvalidTimestamp(micros));
        }
        let integrity = buf.get_u32();

        Ok(Sample {
            kind,
            sequence,
            distance,
            send_time: WallTime::new(secs, micros),
            integrity,
            scheme,
        })
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} seq={} distance={} sent={} integrity={:#010x}",
            self.kind, self.sequence, self.distance, self.send_time, self.integrity
        )
    }
}

/// Sample parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Wrong datagram length: expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("Unsupported wire version: {0}")]
    UnsupportedVersion(u8),

    #[error("Unknown sample kind: {0}")]
    UnknownKind(u8),

    #[error("Sub-second timestamp out of range: {0}us")]
    InvalidTimestamp(u32),
}
