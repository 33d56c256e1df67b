//! ObjectId: the 12-byte BSON identifier.
//!
//! Layout: 4-byte big-endian Unix timestamp (seconds), 5-byte random value
//! fixed at first use for the lifetime of the process, 3-byte big-endian
//! counter that wraps at 0xFFFFFF.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use thiserror::Error;

const COUNTER_MASK: u32 = 0xFF_FFFF;

/// Error type for ObjectId hex parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObjectIdError {
    #[error("ObjectId hex string must be 24 characters, got {0}")]
    InvalidLength(usize),
    #[error("invalid character {0:?} in ObjectId hex string")]
    InvalidCharacter(char),
}

/// A 12-byte globally-distinguishable identifier.
///
/// The derived ordering is bytewise, which sorts identifiers generated in
/// the same process chronologically.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId {
    bytes: [u8; 12],
}

impl ObjectId {
    /// Generates a fresh identifier from the process-wide generator.
    pub fn new() -> Self {
        generator().generate()
    }

    /// Constructs an identifier from its raw 12 bytes.
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self { bytes }
    }

    /// The raw 12 bytes.
    pub fn bytes(&self) -> [u8; 12] {
        self.bytes
    }

    /// The embedded creation time as Unix seconds.
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3]])
    }

    /// The 3-byte counter component.
    pub fn counter(&self) -> u32 {
        ((self.bytes[9] as u32) << 16) | ((self.bytes[10] as u32) << 8) | (self.bytes[11] as u32)
    }

    /// Parses a 24-character hexadecimal string, case-insensitively.
    pub fn parse_str(hex: &str) -> Result<Self, ObjectIdError> {
        if hex.chars().count() != 24 {
            return Err(ObjectIdError::InvalidLength(hex.chars().count()));
        }
        let mut bytes = [0u8; 12];
        let mut chars = hex.chars();
        for byte in bytes.iter_mut() {
            let hi = hex_digit(chars.next().unwrap_or('\0'))?;
            let lo = hex_digit(chars.next().unwrap_or('\0'))?;
            *byte = (hi << 4) | lo;
        }
        Ok(Self { bytes })
    }

    /// Renders the identifier as 24 lowercase hexadecimal characters.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(24);
        for byte in &self.bytes {
            out.push(char::from_digit((byte >> 4) as u32, 16).unwrap_or('0'));
            out.push(char::from_digit((byte & 0x0f) as u32, 16).unwrap_or('0'));
        }
        out
    }
}

fn hex_digit(c: char) -> Result<u8, ObjectIdError> {
    c.to_digit(16)
        .map(|d| d as u8)
        .ok_or(ObjectIdError::InvalidCharacter(c))
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

/// The process-wide identifier generator.
///
/// Holds the 5-byte random value chosen once at first use and the shared
/// 24-bit counter. The counter is advanced with an atomic fetch-and-add so
/// concurrent callers never observe duplicate values.
pub struct ObjectIdGenerator {
    random: [u8; 5],
    counter: AtomicU32,
}

impl ObjectIdGenerator {
    fn seeded() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            random: rng.gen(),
            counter: AtomicU32::new(rng.gen::<u32>() & COUNTER_MASK),
        }
    }

    #[cfg(test)]
    fn with_counter(random: [u8; 5], counter: u32) -> Self {
        Self {
            random,
            counter: AtomicU32::new(counter),
        }
    }

    /// Generates an identifier stamped with the current wall-clock time.
    pub fn generate(&self) -> ObjectId {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.generate_at(u32::try_from(secs).unwrap_or(u32::MAX))
    }

    fn generate_at(&self, secs: u32) -> ObjectId {
        // The u32 wraps at a multiple of 2^24, so masking the fetch_add
        // result yields a strictly increasing counter modulo 2^24.
        let count = self.counter.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK;
        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&self.random);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        ObjectId { bytes }
    }
}

fn generator() -> &'static ObjectIdGenerator {
    static GENERATOR: OnceLock<ObjectIdGenerator> = OnceLock::new();
    GENERATOR.get_or_init(ObjectIdGenerator::seeded)
}
