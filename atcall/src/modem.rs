use std::sync::Arc;
use embedded_io_async::Write;
use log::{debug, warn};

use crate::{
    call::{
        CallAction, CallControl, CallDialect, CallEnded, CallStarted, CallState, CallTracker,
        IncomingCall, MissedCall,
    },
    client::{SessionLost, Shared},
    AtResponse, Client, CommandLine, Error, ModemResponse, PhoneNumber, StandardDialect,
    SubscriptionId, UrcChannel,
};

/// Handle to a voice call modem session, built by
/// [`ModemBuilder`](crate::ModemBuilder).
///
/// All methods take `&self`; the handle may be shared between tasks.
pub struct Modem<W: Write, D: CallDialect = StandardDialect> {
    client: Client<W>,
    dialect: D,
    shared: Arc<Shared>,
    calls: Arc<CallTracker>,
}

impl<W: Write, D: CallDialect> Modem<W, D> {
    pub(crate) fn new(
        client: Client<W>,
        dialect: D,
        shared: Arc<Shared>,
        calls: Arc<CallTracker>,
    ) -> Self {
        Self {
            client,
            dialect,
            shared,
            calls,
        }
    }

    /// Send any command with the configured default timeout, for command
    /// sets built on top of the call control.
    pub async fn send(&self, command: &CommandLine) -> AtResponse {
        self.client.send(command).await
    }

    /// The command channel, for timeouts and retries beyond [`send`](Self::send).
    pub fn client(&self) -> &Client<W> {
        &self.client
    }

    /// All lines not consumed by a command.
    pub fn urc_channel(&self) -> &UrcChannel {
        &self.shared.urc_channel
    }

    pub fn dialect(&self) -> &D {
        &self.dialect
    }

    pub fn is_session_lost(&self) -> bool {
        self.shared.is_session_lost()
    }

    /// Get notified once when the read loop ends.
    pub fn on_session_lost(
        &self,
        handler: impl Fn(&SessionLost) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.shared.on_session_lost(handler)
    }

    async fn execute(
        &self,
        action: CallAction,
        command: Result<CommandLine, Error>,
    ) -> ModemResponse {
        let command = match command {
            Ok(command) => command,
            Err(e) => {
                warn!("Cannot build {:?} command: {}", action, e);
                return ModemResponse::new(false);
            }
        };

        let response = self
            .client
            .send_command(&command, self.dialect.timeout(action))
            .await;

        match response.error() {
            None => debug!("{:?} accepted", action),
            Some(e) => warn!(
                "{:?} failed: {} ({})",
                action,
                e,
                response.terminal().unwrap_or("no result code")
            ),
        }
        ModemResponse::from(&response)
    }
}

impl<W: Write, D: CallDialect> CallControl for Modem<W, D> {
    async fn answer_incoming_call(&self) -> ModemResponse {
        self.execute(CallAction::Answer, self.dialect.answer()).await
    }

    async fn dial(
        &self,
        number: &PhoneNumber,
        hide_caller_number: bool,
        closed_user_group: bool,
    ) -> ModemResponse {
        let command = self
            .dialect
            .dial(number, hide_caller_number, closed_user_group);
        self.execute(CallAction::Dial, command).await
    }

    async fn hangup(&self) -> ModemResponse {
        self.execute(CallAction::Hangup, self.dialect.hangup()).await
    }

    fn call_state(&self) -> CallState {
        self.calls.state()
    }

    fn on_incoming_call(
        &self,
        handler: impl Fn(&IncomingCall) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.calls.on_incoming_call(handler)
    }

    fn on_missed_call(
        &self,
        handler: impl Fn(&MissedCall) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.calls.on_missed_call(handler)
    }

    fn on_call_started(
        &self,
        handler: impl Fn(&CallStarted) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.calls.on_call_started(handler)
    }

    fn on_call_ended(
        &self,
        handler: impl Fn(&CallEnded) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.calls.on_call_ended(handler)
    }

    /// Also removes [`on_session_lost`](Modem::on_session_lost)
    /// subscriptions.
    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.calls.unsubscribe(id) || self.shared.unsubscribe(id)
    }
}
