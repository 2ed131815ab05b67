use core::cell::RefCell;
use embassy_sync::{
    blocking_mutex::{raw::CriticalSectionRawMutex, Mutex},
    signal::Signal,
};
use log::{debug, warn};

use crate::{digest, AtResponse, CommandLine, Error};

/// What the slot did with a line offered by the ingress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Offer {
    /// The line belongs to the command in flight.
    Consumed,
    /// No command claims the line; it is unsolicited.
    Unclaimed,
}

struct Pending {
    id: u64,
    echo: String,
    echo_seen: bool,
    require_echo: bool,
    lines: Vec<String>,
}

/// Hand-off point between the read loop and the one command in flight.
///
/// A client claims the slot before writing its command. From then on the
/// ingress offers it every line that is not a URC, until a final result code
/// completes the response and signals the waiting client.
///
/// Completed responses are signalled together with the id of the claim they
/// belong to, and a claim only accepts its own.
pub(crate) struct ResponseSlot {
    pending: Mutex<CriticalSectionRawMutex, RefCell<Option<Pending>>>,
    signal: Signal<CriticalSectionRawMutex, (u64, AtResponse)>,
}

impl ResponseSlot {
    pub const fn new() -> Self {
        Self {
            pending: Mutex::new(RefCell::new(None)),
            signal: Signal::new(),
        }
    }

    /// Register command `id` as the owner of upcoming response lines.
    pub fn claim(&self, id: u64, command: &CommandLine, require_echo: bool) -> Claim<'_> {
        self.signal.reset();
        self.pending.lock(|p| {
            *p.borrow_mut() = Some(Pending {
                id,
                echo: command.as_str().to_string(),
                echo_seen: false,
                require_echo,
                lines: Vec::new(),
            })
        });
        Claim {
            slot: self,
            id,
            released: false,
        }
    }

    /// Offer a received line to the command in flight.
    pub fn offer(&self, line: &str) -> Offer {
        let completed = self.pending.lock(|p| {
            let mut p = p.borrow_mut();
            let Some(pending) = p.as_mut() else {
                return Err(Offer::Unclaimed);
            };

            if line == pending.echo {
                pending.echo_seen = true;
                return Err(Offer::Consumed);
            }

            if pending.require_echo && !pending.echo_seen {
                return Err(Offer::Unclaimed);
            }

            let Some(code) = digest::result_code(line) else {
                pending.lines.push(line.to_string());
                return Err(Offer::Consumed);
            };

            let id = pending.id;
            let lines = p.take().map(|pending| pending.lines).unwrap_or_default();
            Ok(match code {
                Ok(()) => (id, AtResponse::ok(lines, line.to_string())),
                Err(e) => (
                    id,
                    AtResponse::failed(lines, line.to_string(), Error::Response(e)),
                ),
            })
        });

        match completed {
            Ok((id, response)) => {
                match response.error() {
                    None => debug!("Received OK"),
                    Some(e) => debug!("Received error response {:?}", e),
                }
                self.signal.signal((id, response));
                Offer::Consumed
            }
            Err(offer) => offer,
        }
    }

    /// End the command in flight with `error`, e.g. because the transport
    /// went away.
    pub fn fail(&self, error: Error) {
        let taken = self
            .pending
            .lock(|p| p.borrow_mut().take().map(|pending| (pending.id, pending.lines)));

        if let Some((id, lines)) = taken {
            self.signal.signal((id, AtResponse::incomplete(lines, error)));
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.lock(|p| p.borrow().is_some())
    }

    fn release(&self, id: u64) -> Option<Vec<String>> {
        self.pending.lock(|p| {
            let mut p = p.borrow_mut();
            match p.as_ref() {
                Some(pending) if pending.id == id => p.take().map(|pending| pending.lines),
                _ => None,
            }
        })
    }
}

/// A claim on the response slot, released when dropped so that an abandoned
/// command never owns lines meant for somebody else.
pub(crate) struct Claim<'a> {
    slot: &'a ResponseSlot,
    id: u64,
    released: bool,
}

impl Claim<'_> {
    pub async fn wait(&self) -> AtResponse {
        loop {
            let (id, response) = self.slot.signal.wait().await;
            if id == self.id {
                return response;
            }
            warn!("Dropping late response of command #{}", id);
        }
    }

    /// Give up waiting after a timeout.
    ///
    /// A response that completed while the timeout fired still wins;
    /// otherwise the lines received so far are returned with
    /// [`Error::Timeout`], and anything arriving later is unsolicited.
    pub fn abandon(mut self) -> AtResponse {
        self.released = true;
        match self.slot.release(self.id) {
            Some(lines) => {
                warn!("Response timed out after {} line(s)", lines.len());
                AtResponse::incomplete(lines, Error::Timeout)
            }
            None => match self.slot.signal.try_take() {
                Some((id, response)) if id == self.id => response,
                _ => AtResponse::incomplete(Vec::new(), Error::Timeout),
            },
        }
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.slot.release(self.id);
        }
    }
}
