use std::sync::Arc;
use embassy_time::Instant;
use embedded_io_async::Read;
use log::trace;

use crate::{
    call::CallTracker,
    client::Shared,
    line::LineReader,
    response_slot::Offer,
    Config, Error, Notification, UrcMatcher,
};

/// The read loop of a modem session.
///
/// Owns the read half of the transport. Every received line is either
/// handed to the command in flight or published as a [`Notification`],
/// which in turn drives the call state machine. Must be run for as long as
/// the [`Modem`](crate::Modem) is used, typically in its own task:
///
/// ```ignore
/// let (modem, ingress) = ModemBuilder::new(rx, tx, Config::new()).build::<256>();
/// spawner.spawn(async move { ingress.run().await });
/// ```
pub struct Ingress<R: Read, U: UrcMatcher, const INGRESS_BUF_SIZE: usize> {
    reader: LineReader<R, INGRESS_BUF_SIZE>,
    urc_matcher: U,
    shared: Arc<Shared>,
    calls: Arc<CallTracker>,
    config: Config,
}

impl<R: Read, U: UrcMatcher, const INGRESS_BUF_SIZE: usize> Ingress<R, U, INGRESS_BUF_SIZE> {
    pub(crate) fn new(
        reader: R,
        urc_matcher: U,
        shared: Arc<Shared>,
        calls: Arc<CallTracker>,
        config: Config,
    ) -> Self {
        Self {
            reader: LineReader::new(reader),
            urc_matcher,
            shared,
            calls,
            config,
        }
    }

    /// Number of bytes buffered for the line currently being received.
    ///
    /// This can be useful for custom flowcontrol implementations
    pub fn len(&self) -> usize {
        self.reader.buffer().partial_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.reader.buffer().capacity()
    }

    /// Ingest bytes received outside of [`run`](Self::run), e.g. from a
    /// UART interrupt, and process every line they complete.
    pub fn write(&mut self, buf: &[u8]) {
        self.reader.push(buf);
        while let Some(line) = self.reader.try_next_line() {
            self.handle_line(line);
        }
    }

    /// Read and process lines until the transport fails.
    ///
    /// The failure ends the session: the command in flight and every later
    /// command fail with [`Error::SessionLost`], and the session lost
    /// subscribers are notified. The error is returned.
    pub async fn run(mut self) -> Error {
        loop {
            match self.reader.next_line(self.config.poll_interval).await {
                Ok(Some(line)) => self.handle_line(line),
                Ok(None) => self.calls.tick(Instant::now()),
                Err(e) => {
                    self.shared.lose_session(e.clone());
                    return e;
                }
            }
        }
    }

    fn handle_line(&mut self, line: String) {
        let now = Instant::now();
        self.calls.tick(now);

        if self.urc_matcher.is_urc(&line) || self.shared.slot.offer(&line) == Offer::Unclaimed {
            self.shared
                .urc_channel
                .publish(&Notification::new(line, now));
        } else {
            trace!("Line belongs to the command in flight: {:?}", line);
        }
    }
}
