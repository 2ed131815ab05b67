/// Decides which lines are unsolicited no matter what else is going on.
///
/// Lines accepted by the matcher are published to the URC subscribers even
/// while a command is waiting for its response, so a `RING` that some
/// firmware slips in between a command and its `OK` is not swallowed as
/// part of the response. Every other line belongs to the command in flight,
/// if there is one.
///
/// A matcher that also picks up the network registration URC (`+CREG: <stat>`),
/// leaving the two-field `AT+CREG?` response (`+CREG: <n>,<stat>`) alone:
///
/// ```
/// use atcall::{DefaultUrcMatcher, UrcMatcher};
///
/// struct RegistrationUrcMatcher(DefaultUrcMatcher);
///
/// impl UrcMatcher for RegistrationUrcMatcher {
///     fn is_urc(&mut self, line: &str) -> bool {
///         (line.starts_with("+CREG: ") && !line.contains(',')) || self.0.is_urc(line)
///     }
/// }
///
/// let mut matcher = RegistrationUrcMatcher(DefaultUrcMatcher);
/// assert!(matcher.is_urc("RING"));
/// assert!(matcher.is_urc("+CREG: 1"));
/// assert!(!matcher.is_urc("+CREG: 0,1"));
/// ```
pub trait UrcMatcher {
    fn is_urc(&mut self, line: &str) -> bool;
}

/// Matches the voice call notifications handled by the call state machine:
/// `RING`, `+CRING: <type>`, `VOICE CALL: ...`, `MISSED_CALL: ...` and the
/// caller id URC `+CLIP: "<number>",...`.
///
/// The response to `AT+CLIP?` (`+CLIP: <n>,<m>`, no quotes) is not matched.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultUrcMatcher;

impl UrcMatcher for DefaultUrcMatcher {
    fn is_urc(&mut self, line: &str) -> bool {
        line == "RING"
            || line.starts_with("+CRING:")
            || line.starts_with("VOICE CALL:")
            || line.starts_with("MISSED_CALL:")
            || line.starts_with("+CLIP: \"")
    }
}

/// Treats no line as unsolicited on its own; only lines arriving while no
/// command is in flight reach the URC subscribers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopUrcMatcher;

impl UrcMatcher for NoopUrcMatcher {
    fn is_urc(&mut self, _line: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_matcher() {
        let mut matcher = DefaultUrcMatcher;

        assert!(matcher.is_urc("RING"));
        assert!(matcher.is_urc("+CRING: VOICE"));
        assert!(matcher.is_urc("VOICE CALL: BEGIN"));
        assert!(matcher.is_urc("VOICE CALL: END: 000041"));
        assert!(matcher.is_urc("MISSED_CALL: 5551234"));
        assert!(matcher.is_urc("+CLIP: \"5551234\",129,\"\",,\"\",0"));

        assert!(!matcher.is_urc("+CLIP: 1,1"));
        assert!(!matcher.is_urc("OK"));
        assert!(!matcher.is_urc("RINGING"));
        assert!(!matcher.is_urc("+CSQ: 21,99"));
    }

    #[test]
    fn noop_matcher() {
        assert!(!NoopUrcMatcher.is_urc("RING"));
    }
}
