use embassy_time::Duration;

/// Terminator appended to every outbound command line (S3/S4 on the modem).
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Default)]
pub enum LineTerminator {
    /// `\r`, the V.250 default for S3
    Cr,
    /// `\n`
    Lf,
    /// `\r\n`
    #[default]
    CrLf,
}

impl LineTerminator {
    pub const fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::Cr => b"\r",
            Self::Lf => b"\n",
            Self::CrLf => b"\r\n",
        }
    }
}

/// Configuration of both the ingress (read loop) and the command client.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Config {
    pub(crate) cmd_cooldown: Duration,
    pub(crate) default_timeout: Duration,
    pub(crate) line_terminator: LineTerminator,
    pub(crate) echo: bool,
    pub(crate) ring_timeout: Option<Duration>,
    pub(crate) poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cmd_cooldown: Duration::from_millis(20),
            default_timeout: Duration::from_millis(1000),
            line_terminator: LineTerminator::CrLf,
            echo: false,
            ring_timeout: None,
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimum quiet time between the end of one command exchange and the
    /// write of the next command.
    #[must_use]
    pub const fn cmd_cooldown(mut self, cooldown: Duration) -> Self {
        self.cmd_cooldown = cooldown;
        self
    }

    /// Timeout used by [`Client::send`](crate::Client::send).
    #[must_use]
    pub const fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn line_terminator(mut self, terminator: LineTerminator) -> Self {
        self.line_terminator = terminator;
        self
    }

    /// Set when the modem echoes commands (`ATE1`).
    ///
    /// In echo mode no line is attributed to a command before its echo has
    /// been received, so a late response to a timed-out command can never
    /// complete the next one.
    #[must_use]
    pub const fn echo(mut self, enabled: bool) -> Self {
        self.echo = enabled;
        self
    }

    /// Return from `Ringing` to `Idle` with a missed call when no ring
    /// indicator has been seen for `timeout`. Disabled by default.
    #[must_use]
    pub const fn ring_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.ring_timeout = timeout;
        self
    }

    /// How often an idle read loop wakes up to expire ring timeouts.
    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}
