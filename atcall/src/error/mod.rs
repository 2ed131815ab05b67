use core::fmt;

/// Error code carried by `+CME ERROR:` / `+CMS ERROR:`, either numeric
/// (`AT+CMEE=1`) or verbose (`AT+CMEE=2`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    Numeric(u16),
    Verbose(String),
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(code) => write!(f, "{}", code),
            Self::Verbose(text) => f.write_str(text),
        }
    }
}

/// Final result codes that end a command with a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultError {
    /// Generic `ERROR`
    Error,
    /// GSM equipment related error
    Cme(ErrorCode),
    /// GSM network related error
    Cms(ErrorCode),
    NoCarrier,
    Busy,
    NoAnswer,
    NoDialtone,
}

impl fmt::Display for ResultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("ERROR"),
            Self::Cme(code) => write!(f, "+CME ERROR: {}", code),
            Self::Cms(code) => write!(f, "+CMS ERROR: {}", code),
            Self::NoCarrier => f.write_str("NO CARRIER"),
            Self::Busy => f.write_str("BUSY"),
            Self::NoAnswer => f.write_str("NO ANSWER"),
            Self::NoDialtone => f.write_str("NO DIALTONE"),
        }
    }
}

/// Errors returned by the crate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Serial read error, or the transport was closed
    Read,
    /// Serial write error
    Write,
    /// Timed out while waiting for a response
    Timeout,
    /// The read loop has stopped, nothing more can be sent or received
    SessionLost,
    /// The modem answered with an error result code
    Response(ResultError),
    /// Command text that cannot be sent as a single AT command line
    InvalidCommand,
    /// Not a dialable phone number
    InvalidNumber,
}

impl Error {
    /// Whether the error was raised by the transport rather than the modem.
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Read | Self::Write | Self::SessionLost)
    }
}

impl From<ResultError> for Error {
    fn from(e: ResultError) -> Self {
        Self::Response(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("serial read error"),
            Self::Write => f.write_str("serial write error"),
            Self::Timeout => f.write_str("timed out waiting for a response"),
            Self::SessionLost => f.write_str("modem session lost"),
            Self::Response(e) => write!(f, "modem returned {}", e),
            Self::InvalidCommand => f.write_str("invalid AT command line"),
            Self::InvalidNumber => f.write_str("invalid phone number"),
        }
    }
}

impl std::error::Error for Error {}
