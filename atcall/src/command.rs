use core::{fmt, str::FromStr};

use crate::Error;

/// Longest number accepted by [`PhoneNumber`]. 3GPP TS 24.008 caps the BCD
/// called party number at 40 digits.
pub const MAX_PHONE_NUMBER_LEN: usize = 40;

/// A single outbound AT command, without its line terminator.
///
/// The text is validated on construction: it must be non-empty printable
/// ASCII, so that it can never be split into two lines on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandLine(String);

impl CommandLine {
    pub fn new(text: impl Into<String>) -> Result<Self, Error> {
        let text = text.into();
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_graphic() || b == b' ') {
            return Err(Error::InvalidCommand);
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CommandLine {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// A dialable phone number.
///
/// Accepts digits, `*`, `#`, the DTMF letters `A`-`D`, the pause and wait
/// modifiers `,`, `p` and `w`, and one leading `+`. Visual separators
/// (spaces, `-`, `.`, parentheses) are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhoneNumber(heapless::String<MAX_PHONE_NUMBER_LEN>);

impl PhoneNumber {
    pub fn new(number: &str) -> Result<Self, Error> {
        let mut digits = heapless::String::new();

        for c in number.trim().chars() {
            match c {
                ' ' | '-' | '.' | '(' | ')' => continue,
                '+' if digits.is_empty() => {}
                '0'..='9' | '*' | '#' | 'A'..='D' | ',' | 'p' | 'P' | 'w' | 'W' => {}
                _ => return Err(Error::InvalidNumber),
            }
            digits.push(c).map_err(|_| Error::InvalidNumber)?;
        }

        if !digits.chars().any(|c| c.is_ascii_digit()) {
            return Err(Error::InvalidNumber);
        }

        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PhoneNumber {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for PhoneNumber {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}
