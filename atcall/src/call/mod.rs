//! Voice call control: the call state machine, its events and the commands
//! used to answer, dial and hang up.

mod event;
mod state;

pub use event::{CallEnded, CallEvent, CallStarted, IncomingCall, MissedCall, PayloadError};
pub(crate) use state::CallTracker;
pub use state::CallState;

use embassy_time::Duration;

use crate::{CommandLine, Error, ModemResponse, PhoneNumber, SubscriptionId};

/// Everything an application can do with a voice call modem.
#[allow(async_fn_in_trait)]
pub trait CallControl {
    /// Pick up the call that is currently ringing.
    async fn answer_incoming_call(&self) -> ModemResponse;

    /// Start an outgoing voice call.
    ///
    /// Success only means the modem accepted the dial command; the call is
    /// connected once [`CallStarted`] is raised.
    async fn dial(
        &self,
        number: &PhoneNumber,
        hide_caller_number: bool,
        closed_user_group: bool,
    ) -> ModemResponse;

    /// Hang up the current call. The call state changes once the modem
    /// reports the end of the call.
    async fn hangup(&self) -> ModemResponse;

    fn call_state(&self) -> CallState;

    fn on_incoming_call(
        &self,
        handler: impl Fn(&IncomingCall) + Send + Sync + 'static,
    ) -> SubscriptionId;

    fn on_missed_call(&self, handler: impl Fn(&MissedCall) + Send + Sync + 'static)
        -> SubscriptionId;

    fn on_call_started(
        &self,
        handler: impl Fn(&CallStarted) + Send + Sync + 'static,
    ) -> SubscriptionId;

    fn on_call_ended(&self, handler: impl Fn(&CallEnded) + Send + Sync + 'static)
        -> SubscriptionId;

    /// Remove a subscription made with any of the `on_*` methods. Returns
    /// `false` if it was not subscribed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallAction {
    Answer,
    Dial,
    Hangup,
}

/// The commands a modem family uses for call control.
pub trait CallDialect {
    fn answer(&self) -> Result<CommandLine, Error> {
        CommandLine::new("ATA")
    }

    /// `ATD<number><I|i><G|g>;`, where `I` suppresses and `i` presents the
    /// caller id, and `G`/`g` enable/disable the closed user group.
    fn dial(
        &self,
        number: &PhoneNumber,
        hide_caller_number: bool,
        closed_user_group: bool,
    ) -> Result<CommandLine, Error> {
        CommandLine::new(format!(
            "ATD{}{}{};",
            number,
            if hide_caller_number { 'I' } else { 'i' },
            if closed_user_group { 'G' } else { 'g' },
        ))
    }

    fn hangup(&self) -> Result<CommandLine, Error>;

    /// How long to wait for the final result code of `action`.
    fn timeout(&self, action: CallAction) -> Duration {
        match action {
            CallAction::Answer | CallAction::Dial => Duration::from_secs(20),
            CallAction::Hangup => Duration::from_secs(5),
        }
    }
}

/// 3GPP TS 27.007 modems, hanging up with `AT+CHUP`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardDialect;

impl CallDialect for StandardDialect {
    fn hangup(&self) -> Result<CommandLine, Error> {
        CommandLine::new("AT+CHUP")
    }
}

/// Plain V.250 modems without `+CHUP`, hanging up with `ATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HayesDialect;

impl CallDialect for HayesDialect {
    fn hangup(&self) -> Result<CommandLine, Error> {
        CommandLine::new("ATH")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn number(n: &str) -> PhoneNumber {
        PhoneNumber::new(n).unwrap()
    }

    #[test]
    fn dial_modifiers() {
        let dialect = StandardDialect;
        let n = number("5551234");

        assert_eq!(dialect.dial(&n, true, false).unwrap().as_str(), "ATD5551234Ig;");
        assert_eq!(dialect.dial(&n, false, false).unwrap().as_str(), "ATD5551234ig;");
        assert_eq!(dialect.dial(&n, false, true).unwrap().as_str(), "ATD5551234iG;");
        assert_eq!(
            dialect.dial(&number("+45 2030-4050"), true, true).unwrap().as_str(),
            "ATD+4520304050IG;"
        );
    }

    #[test]
    fn dialects() {
        assert_eq!(StandardDialect.answer().unwrap().as_str(), "ATA");
        assert_eq!(StandardDialect.hangup().unwrap().as_str(), "AT+CHUP");
        assert_eq!(HayesDialect.answer().unwrap().as_str(), "ATA");
        assert_eq!(HayesDialect.hangup().unwrap().as_str(), "ATH");
        assert_eq!(
            HayesDialect.timeout(CallAction::Hangup),
            Duration::from_secs(5)
        );
    }
}
