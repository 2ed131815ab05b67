use crate::Error;

/// The complete result of one command exchange.
///
/// Only ever built once the exchange is over: a final result code was
/// received, the timeout elapsed or the transport failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtResponse {
    lines: Vec<String>,
    terminal: Option<String>,
    result: Result<(), Error>,
}

impl AtResponse {
    pub(crate) fn ok(lines: Vec<String>, terminal: String) -> Self {
        Self {
            lines,
            terminal: Some(terminal),
            result: Ok(()),
        }
    }

    pub(crate) fn failed(lines: Vec<String>, terminal: String, error: Error) -> Self {
        Self {
            lines,
            terminal: Some(terminal),
            result: Err(error),
        }
    }

    /// No terminal line was seen; `lines` are whatever arrived before.
    pub(crate) fn incomplete(lines: Vec<String>, error: Error) -> Self {
        Self {
            lines,
            terminal: None,
            result: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn is_timeout(&self) -> bool {
        self.result == Err(Error::Timeout)
    }

    /// Intermediate lines, in the order they were received.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The raw final result code line, e.g. `+CME ERROR: 10`.
    pub fn terminal(&self) -> Option<&str> {
        self.terminal.as_deref()
    }

    pub fn error(&self) -> Option<&Error> {
        self.result.as_ref().err()
    }

    pub fn into_result(self) -> Result<Vec<String>, Error> {
        self.result.map(|()| self.lines)
    }
}

/// Outcome of a call control operation: the modem accepted it or it did not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModemResponse {
    success: bool,
}

impl ModemResponse {
    pub const fn new(success: bool) -> Self {
        Self { success }
    }

    pub const fn is_success(&self) -> bool {
        self.success
    }
}

impl From<&AtResponse> for ModemResponse {
    fn from(response: &AtResponse) -> Self {
        Self::new(response.is_success())
    }
}

impl From<AtResponse> for ModemResponse {
    fn from(response: AtResponse) -> Self {
        Self::from(&response)
    }
}
