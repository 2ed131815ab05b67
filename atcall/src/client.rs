use std::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, mutex::Mutex};
use embassy_time::{with_timeout, Duration, Timer};
use embedded_io_async::Write;
use log::{debug, error, warn};

use crate::{
    line::LineWriter, response_slot::ResponseSlot, AtResponse, CommandLine, Config, Error,
    Observers, SubscriptionId, UrcChannel,
};

/// Raised once when the read loop ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLost {
    /// What ended the read loop.
    pub error: Error,
}

/// State shared between the read loop and the command channel.
pub(crate) struct Shared {
    pub(crate) slot: ResponseSlot,
    pub(crate) urc_channel: UrcChannel,
    session_lost: AtomicBool,
    lost: Observers<SessionLost>,
}

impl Shared {
    pub fn new() -> Self {
        Self {
            slot: ResponseSlot::new(),
            urc_channel: UrcChannel::new(),
            session_lost: AtomicBool::new(false),
            lost: Observers::new(),
        }
    }

    pub fn is_session_lost(&self) -> bool {
        self.session_lost.load(Ordering::SeqCst)
    }

    /// Mark the session as lost: the command in flight fails with
    /// [`Error::SessionLost`], as does every command sent afterwards.
    pub fn lose_session(&self, error: Error) {
        if self.session_lost.swap(true, Ordering::SeqCst) {
            return;
        }
        error!("Session lost: {}", error);
        self.slot.fail(Error::SessionLost);
        self.lost.publish(&SessionLost { error });
    }

    pub fn on_session_lost(
        &self,
        handler: impl Fn(&SessionLost) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.lost.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.lost.unsubscribe(id)
    }
}

struct Inner<W: Write> {
    writer: LineWriter<W>,
    cooldown_timer: Option<Timer>,
    next_id: u64,
}

impl<W: Write> Inner<W> {
    fn start_cooldown_timer(&mut self, cooldown: Duration) {
        self.cooldown_timer = Some(Timer::after(cooldown));
    }

    async fn wait_cooldown_timer(&mut self) {
        if let Some(cooldown) = self.cooldown_timer.take() {
            cooldown.await
        }
    }
}

/// The command channel: sends one command at a time and collects its
/// response from the read loop.
///
/// Any number of tasks may share a client. Each exchange holds the channel
/// from the write of the command until its final result code or timeout, so
/// a command is never written while another one is still waiting.
pub struct Client<W: Write> {
    inner: Mutex<CriticalSectionRawMutex, Inner<W>>,
    shared: Arc<Shared>,
    config: Config,
}

impl<W: Write> Client<W> {
    pub(crate) fn new(writer: W, shared: Arc<Shared>, config: Config) -> Self {
        Self {
            inner: Mutex::new(Inner {
                writer: LineWriter::new(writer, config.line_terminator),
                cooldown_timer: None,
                next_id: 0,
            }),
            shared,
            config,
        }
    }

    /// Send `command` and wait up to `timeout` for its final result code.
    ///
    /// Never fails outright: write errors, modem errors and timeouts are
    /// reported through [`AtResponse::error`].
    pub async fn send_command(&self, command: &CommandLine, timeout: Duration) -> AtResponse {
        let mut inner = self.inner.lock().await;

        if self.shared.is_session_lost() {
            return AtResponse::incomplete(Vec::new(), Error::SessionLost);
        }

        inner.wait_cooldown_timer().await;

        inner.next_id = inner.next_id.wrapping_add(1);
        let claim = self.shared.slot.claim(inner.next_id, command, self.config.echo);

        // The read loop may have ended before the claim was registered
        if self.shared.is_session_lost() {
            return AtResponse::incomplete(Vec::new(), Error::SessionLost);
        }

        if let Err(e) = inner.writer.write_line(command).await {
            error!("Failed to write {:?}: {}", command.as_str(), e);
            inner.start_cooldown_timer(self.config.cmd_cooldown);
            return AtResponse::incomplete(Vec::new(), e);
        }

        let response = match with_timeout(timeout, claim.wait()).await {
            Ok(response) => response,
            Err(_) => {
                warn!("Received timeout after {}ms", timeout.as_millis());
                claim.abandon()
            }
        };

        inner.start_cooldown_timer(self.config.cmd_cooldown);
        response
    }

    /// [`send_command`](Self::send_command) with the configured default
    /// timeout.
    pub async fn send(&self, command: &CommandLine) -> AtResponse {
        self.send_command(command, self.config.default_timeout).await
    }

    /// Send `command` up to `attempts` times, resending only when the modem
    /// did not answer in time.
    pub async fn send_retry(
        &self,
        command: &CommandLine,
        timeout: Duration,
        attempts: u8,
    ) -> AtResponse {
        let mut response = self.send_command(command, timeout).await;
        for attempt in 2..=attempts {
            if !response.is_timeout() {
                break;
            }
            debug!("Attempt {}:", attempt);
            response = self.send_command(command, timeout).await;
        }
        response
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
