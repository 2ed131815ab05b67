use std::sync::Arc;
use embedded_io_async::{Read, Write};

use crate::{
    call::{CallDialect, CallTracker},
    client::Shared,
    Client, Config, DefaultUrcMatcher, Ingress, Modem, StandardDialect, UrcMatcher,
};

/// Builder to set up a [`Modem`] and [`Ingress`] pair over the two halves of
/// a serial transport.
///
/// Create a new builder through the [`new`](Self::new) method.
pub struct ModemBuilder<R: Read, W: Write, U: UrcMatcher, D: CallDialect> {
    reader: R,
    writer: W,
    config: Config,
    urc_matcher: U,
    dialect: D,
}

impl<R: Read, W: Write> ModemBuilder<R, W, DefaultUrcMatcher, StandardDialect> {
    pub fn new(reader: R, writer: W, config: Config) -> Self {
        Self {
            reader,
            writer,
            config,
            urc_matcher: DefaultUrcMatcher,
            dialect: StandardDialect,
        }
    }
}

impl<R: Read, W: Write, U: UrcMatcher, D: CallDialect> ModemBuilder<R, W, U, D> {
    /// Use a custom [`UrcMatcher`] implementation.
    pub fn with_urc_matcher<U2: UrcMatcher>(self, urc_matcher: U2) -> ModemBuilder<R, W, U2, D> {
        ModemBuilder {
            reader: self.reader,
            writer: self.writer,
            config: self.config,
            urc_matcher,
            dialect: self.dialect,
        }
    }

    /// Use the call control commands of another modem family.
    pub fn with_dialect<D2: CallDialect>(self, dialect: D2) -> ModemBuilder<R, W, U, D2> {
        ModemBuilder {
            reader: self.reader,
            writer: self.writer,
            config: self.config,
            urc_matcher: self.urc_matcher,
            dialect,
        }
    }

    /// Set up and return a [`Modem`] and [`Ingress`] pair.
    ///
    /// `INGRESS_BUF_SIZE` is the longest line the ingress can receive.
    pub fn build<const INGRESS_BUF_SIZE: usize>(
        self,
    ) -> (Modem<W, D>, Ingress<R, U, INGRESS_BUF_SIZE>) {
        let shared = Arc::new(Shared::new());
        let calls = Arc::new(CallTracker::new(self.config.ring_timeout));

        // The call state machine is the first subscriber, so application
        // URC handlers already see the updated call state.
        let tracker = calls.clone();
        shared.urc_channel.subscribe(move |n| tracker.handle(n));

        let client = Client::new(self.writer, shared.clone(), self.config);
        let ingress = Ingress::new(
            self.reader,
            self.urc_matcher,
            shared.clone(),
            calls.clone(),
            self.config,
        );

        (Modem::new(client, self.dialect, shared, calls), ingress)
    }
}
