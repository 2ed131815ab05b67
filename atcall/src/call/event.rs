//! Typed call lifecycle events.
//!
//! Each event is built from the text of the notification that triggered it.
//! Payloads that cannot be parsed never drop the event: it is raised with the
//! affected fields left as `None`.

use core::{fmt, time::Duration};
use log::warn;
use nom::{
    branch::alt,
    character::complete::{char, digit1},
    combinator::{all_consuming, map, map_res, opt, recognize, verify},
    sequence::{pair, tuple},
    IResult,
};

/// A notification payload that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadError {
    payload: String,
}

impl PayloadError {
    fn new(payload: &str) -> Self {
        Self {
            payload: payload.to_string(),
        }
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed notification payload {:?}", self.payload)
    }
}

impl std::error::Error for PayloadError {}

/// The modem started ringing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IncomingCall {
    /// Call type reported by the extended ring indicator (`+CRING: VOICE`),
    /// `None` for a plain `RING`.
    pub call_type: Option<String>,
}

/// A call rang without being answered.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MissedCall {
    /// Originating number, if the modem reported one.
    pub number: Option<String>,
}

impl MissedCall {
    /// Parse the text after `MISSED_CALL:`.
    ///
    /// The payload is usually just the number, but some firmware puts the
    /// time of the call in front of it (`10:31AM 5551234`), so the last token
    /// that looks like a phone number is taken.
    pub fn parse(payload: &str) -> Result<Self, PayloadError> {
        payload
            .split_whitespace()
            .rev()
            .map(|token| token.trim_matches('"'))
            .find(|token| phone_number(token).is_ok())
            .map(|number| Self {
                number: Some(number.to_string()),
            })
            .ok_or_else(|| PayloadError::new(payload))
    }

    /// Like [`parse`](Self::parse), but never fails: an unparsable payload
    /// yields a missed call with no number.
    pub fn from_payload(payload: &str) -> Self {
        Self::parse(payload).unwrap_or_else(|e| {
            warn!("{}, raising missed call without number", e);
            Self::default()
        })
    }
}

/// A call was connected, answered locally or remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallStarted;

/// A call was terminated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallEnded {
    /// How long the call lasted, if reported.
    pub duration: Option<Duration>,
    /// Any non-duration text following the end indicator.
    pub reason: Option<String>,
}

impl CallEnded {
    /// Parse the text after `VOICE CALL: END`.
    ///
    /// Durations are accepted as `hh:mm:ss`, `mm:ss`, `hhmmss` or plain
    /// seconds. Text that does not start with a digit is kept as the reason;
    /// a payload that starts with a digit but is no valid duration is an
    /// error.
    pub fn parse(payload: &str) -> Result<Self, PayloadError> {
        let payload = payload.trim_start_matches(':').trim();

        if payload.is_empty() {
            return Ok(Self::default());
        }

        if !payload.starts_with(|c: char| c.is_ascii_digit()) {
            return Ok(Self {
                duration: None,
                reason: Some(payload.to_string()),
            });
        }

        all_consuming(call_duration)(payload)
            .map(|(_, duration)| Self {
                duration: Some(duration),
                reason: None,
            })
            .map_err(|_| PayloadError::new(payload))
    }

    /// Like [`parse`](Self::parse), but never fails: an unparsable duration
    /// is kept as the reason.
    pub fn from_payload(payload: &str) -> Self {
        Self::parse(payload).unwrap_or_else(|e| {
            warn!("{}, raising call end without duration", e);
            Self {
                duration: None,
                reason: Some(e.payload),
            }
        })
    }
}

/// Every event raised by the call state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    Incoming(IncomingCall),
    Missed(MissedCall),
    Started(CallStarted),
    Ended(CallEnded),
}

fn phone_number(input: &str) -> IResult<&str, &str> {
    all_consuming(recognize(pair(opt(char('+')), digit1)))(input)
}

fn number(input: &str) -> IResult<&str, u64> {
    map_res(digit1, str::parse)(input)
}

fn sexagesimal(input: &str) -> IResult<&str, u64> {
    verify(number, |n| *n < 60)(input)
}

fn seconds(h: u64, m: u64, s: u64) -> Option<u64> {
    h.checked_mul(3600)?.checked_add(m * 60 + s)
}

fn call_duration(input: &str) -> IResult<&str, Duration> {
    let hms = map_res(
        tuple((number, char(':'), sexagesimal, char(':'), sexagesimal)),
        |(h, _, m, _, s)| seconds(h, m, s).ok_or(()),
    );
    let ms = map_res(tuple((number, char(':'), sexagesimal)), |(m, _, s)| {
        m.checked_mul(60).and_then(|m| m.checked_add(s)).ok_or(())
    });
    let compact = map_res(digit1, |digits: &str| {
        if digits.len() == 6 {
            let (h, m, s) = (&digits[..2], &digits[2..4], &digits[4..]);
            match (h.parse::<u64>(), m.parse::<u64>(), s.parse::<u64>()) {
                (Ok(h), Ok(m), Ok(s)) if m < 60 && s < 60 => seconds(h, m, s).ok_or(()),
                _ => Err(()),
            }
        } else {
            digits.parse::<u64>().map_err(|_| ())
        }
    });

    map(alt((hms, ms, compact)), Duration::from_secs)(input)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn missed_call_number() {
        assert_eq!(
            MissedCall::parse("5551234"),
            Ok(MissedCall {
                number: Some("5551234".into())
            })
        );
        assert_eq!(
            MissedCall::parse(" 10:31AM +15551234"),
            Ok(MissedCall {
                number: Some("+15551234".into())
            })
        );
        assert_eq!(
            MissedCall::parse("\"5551234\""),
            Ok(MissedCall {
                number: Some("5551234".into())
            })
        );
    }

    #[test]
    fn missed_call_without_number() {
        assert!(MissedCall::parse("").is_err());
        assert!(MissedCall::parse("unknown").is_err());
        assert_eq!(MissedCall::from_payload("withheld"), MissedCall::default());
    }

    #[test]
    fn call_ended_durations() {
        let secs = |s| Some(Duration::from_secs(s));

        assert_eq!(CallEnded::parse("00:01:23").unwrap().duration, secs(83));
        assert_eq!(CallEnded::parse(": 00:01:23").unwrap().duration, secs(83));
        assert_eq!(CallEnded::parse("02:05").unwrap().duration, secs(125));
        assert_eq!(CallEnded::parse("000041").unwrap().duration, secs(41));
        assert_eq!(CallEnded::parse("010203").unwrap().duration, secs(3723));
        assert_eq!(CallEnded::parse("95").unwrap().duration, secs(95));
    }

    #[test]
    fn call_ended_reason() {
        assert_eq!(CallEnded::parse(""), Ok(CallEnded::default()));
        assert_eq!(
            CallEnded::parse(": NORMAL CLEARING"),
            Ok(CallEnded {
                duration: None,
                reason: Some("NORMAL CLEARING".into())
            })
        );
    }

    #[test]
    fn call_ended_overflow() {
        assert!(CallEnded::parse("99999999999999999:00:00").is_err());
        assert!(CallEnded::parse("999999999999999999:00").is_err());
        assert_eq!(
            CallEnded::from_payload(": 99999999999999999:00:00"),
            CallEnded {
                duration: None,
                reason: Some("99999999999999999:00:00".into())
            }
        );
    }

    #[test]
    fn call_ended_malformed() {
        assert!(CallEnded::parse("00:61:00").is_err());
        assert!(CallEnded::parse("12 seconds").is_err());
        assert_eq!(
            CallEnded::from_payload("1:2:3:4"),
            CallEnded {
                duration: None,
                reason: Some("1:2:3:4".into())
            }
        );
    }
}
