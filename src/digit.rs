//! Decimal digit codec.
//!
//! Keys are non-negative integers rendered as fixed-width, zero-padded decimal strings.
//! Digit position `0` is the most significant (leftmost) digit, position `W - 1` the least significant one.

use std::error::Error;
use std::fmt;
use std::fmt::Display;

/// Widest key that always fits into `u64`.
const MAX_WIDTH: usize = 19;

/// Codec error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Key width is zero or too wide to be represented by `u64`.
    InvalidWidth(usize),
    /// Text is not a plain ASCII decimal number.
    Malformed(String),
    /// Key needs more digits than the configured width.
    KeyTooWide { key: String, width: usize },
    /// Digit position is outside of the key width.
    PositionOutOfRange { position: usize, width: usize },
}

impl Error for CodecError {}

impl Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            CodecError::InvalidWidth(width) => write!(f, "key width must be in 1..={}, got {}", MAX_WIDTH, width),
            CodecError::Malformed(text) => write!(f, "invalid number {:?}", text),
            CodecError::KeyTooWide { key, width } => write!(f, "key {} does not fit into {} digits", key, width),
            CodecError::PositionOutOfRange { position, width } => {
                write!(f, "digit position {} is out of range for {}-digit keys", position, width)
            }
        }
    }
}

/// Validated key width (number of decimal digits per key).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyWidth(usize);

impl KeyWidth {
    /// Six digit keys.
    pub const DEFAULT: KeyWidth = KeyWidth(6);

    pub fn new(width: usize) -> Result<Self, CodecError> {
        if width == 0 || width > MAX_WIDTH {
            return Err(CodecError::InvalidWidth(width));
        }

        return Ok(KeyWidth(width));
    }

    pub fn get(&self) -> usize {
        self.0
    }
}

impl Default for KeyWidth {
    fn default() -> Self {
        KeyWidth::DEFAULT
    }
}

/// Fixed-width decimal key codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DigitCodec {
    width: KeyWidth,
}

impl DigitCodec {
    pub fn new(width: KeyWidth) -> Self {
        DigitCodec { width }
    }

    pub fn width(&self) -> usize {
        self.width.get()
    }

    /// Smallest key that no longer fits into the width.
    fn limit(&self) -> u64 {
        10u64.pow(self.width() as u32)
    }

    fn check_fits(&self, key: u64) -> Result<(), CodecError> {
        if key >= self.limit() {
            return Err(CodecError::KeyTooWide {
                key: key.to_string(),
                width: self.width(),
            });
        }

        return Ok(());
    }

    /// Renders the key as a zero-padded decimal string of exactly `width` digits.
    pub fn encode(&self, key: u64) -> Result<String, CodecError> {
        let mut encoded = String::with_capacity(self.width());
        self.encode_into(key, &mut encoded)?;

        return Ok(encoded);
    }

    /// Same as [`DigitCodec::encode`] but reuses the provided buffer. The buffer is cleared first.
    pub fn encode_into(&self, key: u64, buf: &mut String) -> Result<(), CodecError> {
        self.check_fits(key)?;
        buf.clear();
        buf.push_str(&format!("{:0width$}", key, width = self.width()));

        return Ok(());
    }

    /// Parses a decimal key. Leading zeros are allowed, signs and whitespace are not.
    pub fn decode(&self, text: &str) -> Result<u64, CodecError> {
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CodecError::Malformed(text.to_owned()));
        }

        let significant = text.trim_start_matches('0');
        if significant.len() > self.width() {
            return Err(CodecError::KeyTooWide {
                key: text.to_owned(),
                width: self.width(),
            });
        }
        if significant.is_empty() {
            return Ok(0);
        }

        significant
            .parse::<u64>()
            .map_err(|_| CodecError::Malformed(text.to_owned()))
    }

    /// Returns the digit at `position` of the key's encoded form.
    pub fn digit_at(&self, key: u64, position: usize) -> Result<u8, CodecError> {
        self.check_position(position)?;
        self.check_fits(key)?;

        let divisor = 10u64.pow((self.width() - 1 - position) as u32);

        return Ok(((key / divisor) % 10) as u8);
    }

    /// Returns the digit at `position` of an already encoded key.
    pub fn digit_of(&self, encoded: &str, position: usize) -> Result<u8, CodecError> {
        self.check_position(position)?;

        match encoded.as_bytes().get(position) {
            Some(byte) if byte.is_ascii_digit() && encoded.len() == self.width() => Ok(byte - b'0'),
            _ => Err(CodecError::Malformed(encoded.to_owned())),
        }
    }

    fn check_position(&self, position: usize) -> Result<(), CodecError> {
        if position >= self.width() {
            return Err(CodecError::PositionOutOfRange {
                position,
                width: self.width(),
            });
        }

        return Ok(());
    }
}
