//! An AT command engine for voice call modems.
//!
//! The crate takes care of the two halves of talking to a modem over a
//! serial line:
//!
//! - a command channel, sending one command at a time and collecting the
//!   intermediate lines up to the final result code (`OK`, `ERROR`,
//!   `+CME ERROR: <code>`, ...), with a timeout on every exchange;
//! - a read loop, handing each received line either to the command in flight
//!   or, as an unsolicited result code (URC), to any number of subscribers.
//!
//! On top of that sits a call state machine fed by the call related URCs
//! (`RING`, `VOICE CALL: BEGIN`, `VOICE CALL: END`, `MISSED_CALL`) and the
//! [`CallControl`] trait to answer, dial and hang up.
//!
//! The transport is any pair of [`embedded_io_async::Read`] and
//! [`embedded_io_async::Write`] halves, and all waiting is done with
//! `embassy-time`, so the crate runs on any executor.
//!
//! # Examples
//!
//! ```ignore
//! use atcall::{CallControl, Config, ModemBuilder, PhoneNumber};
//!
//! let (modem, ingress) = ModemBuilder::new(rx, tx, Config::new()).build::<256>();
//! spawner.spawn(async move { ingress.run().await });
//!
//! modem.on_incoming_call(|call| log::info!("Ringing: {:?}", call));
//! modem.on_call_ended(|end| log::info!("Call lasted {:?}", end.duration));
//!
//! let number = PhoneNumber::new("+45 2030 4050")?;
//! if !modem.dial(&number, false, false).await.is_success() {
//!     log::warn!("Modem refused to dial");
//! }
//! ```
//!
//! # Logging
//!
//! Everything is logged through the [`log`] facade; pick a logger in the
//! application. Incoming bytes are logged on the `TRACE` level and sent
//! commands on `DEBUG`.

mod builder;
pub mod call;
mod client;
mod command;
mod config;
mod digest;
mod error;
mod helpers;
mod ingress;
mod line;
mod modem;
mod response;
mod response_slot;
mod urc_channel;
mod urc_matcher;

pub use self::builder::ModemBuilder;
pub use self::call::{
    CallControl, CallDialect, CallEnded, CallStarted, CallState, HayesDialect, IncomingCall,
    MissedCall, StandardDialect,
};
pub use self::client::{Client, SessionLost};
pub use self::command::{CommandLine, PhoneNumber, MAX_PHONE_NUMBER_LEN};
pub use self::config::{Config, LineTerminator};
pub use self::error::{Error, ErrorCode, ResultError};
pub use self::helpers::LossyStr;
pub use self::ingress::Ingress;
pub use self::line::{LineBuffer, LineReader, LineWriter};
pub use self::modem::Modem;
pub use self::response::{AtResponse, ModemResponse};
pub use self::urc_channel::{Notification, Observers, SubscriptionId, UrcChannel};
pub use self::urc_matcher::{DefaultUrcMatcher, NoopUrcMatcher, UrcMatcher};

pub use embassy_time::Duration;

pub mod prelude {
    //! The prelude is a collection of all the traits in this crate
    //!
    //! The traits have been renamed to avoid collisions with other items when
    //! performing a glob import.
    pub use crate::CallControl as _atcall_CallControl;
    pub use crate::CallDialect as _atcall_CallDialect;
    pub use crate::UrcMatcher as _atcall_UrcMatcher;
}
