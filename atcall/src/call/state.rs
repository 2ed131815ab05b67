use core::{cell::RefCell, fmt};
use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use embassy_time::{Duration, Instant};
use log::{debug, trace};

use super::event::{CallEnded, CallEvent, CallStarted, IncomingCall, MissedCall};
use crate::{Notification, Observers, SubscriptionId};

/// Where the modem is in the lifecycle of a voice call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallState {
    #[default]
    Idle,
    Ringing,
    Active,
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Ringing => "ringing",
            Self::Active => "active",
        })
    }
}

/// The call related notifications, classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Indication<'a> {
    Ring { call_type: Option<&'a str> },
    Begin,
    End { payload: &'a str },
    Missed { payload: &'a str },
    CallerId { number: &'a str },
}

impl<'a> Indication<'a> {
    fn classify(line: &'a str) -> Option<Self> {
        if line == "RING" {
            return Some(Self::Ring { call_type: None });
        }
        if let Some(call_type) = line.strip_prefix("+CRING:") {
            let call_type = call_type.trim();
            return Some(Self::Ring {
                call_type: (!call_type.is_empty()).then_some(call_type),
            });
        }
        if let Some(payload) = line.strip_prefix("MISSED_CALL:") {
            return Some(Self::Missed { payload });
        }
        if let Some(number) = line.strip_prefix("+CLIP:") {
            let mut quoted = number.split('"');
            return match (quoted.next(), quoted.next()) {
                (Some(_), Some(number)) if !number.is_empty() => Some(Self::CallerId { number }),
                _ => None,
            };
        }

        let voice = line.strip_prefix("VOICE CALL:")?.trim_start();
        if voice.starts_with("BEGIN") {
            return Some(Self::Begin);
        }
        // `END`, `ENDED` and the like, followed by the optional duration
        let payload = voice
            .strip_prefix("END")?
            .trim_start_matches(|c: char| c.is_ascii_alphabetic());
        Some(Self::End { payload })
    }
}

/// Pure transition logic of the call state machine.
#[derive(Debug, Default)]
pub(crate) struct CallStateMachine {
    state: CallState,
    caller: Option<String>,
    last_ring: Option<Instant>,
}

impl CallStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    /// Apply one notification, returning the event it raises, if any.
    pub fn handle(&mut self, notification: &Notification) -> Option<CallEvent> {
        let Some(indication) = Indication::classify(notification.line()) else {
            trace!("Not a call notification: {:?}", notification.line());
            return None;
        };

        match (self.state, indication) {
            (CallState::Idle, Indication::Ring { call_type }) => {
                self.enter(CallState::Ringing);
                self.caller = None;
                self.last_ring = Some(notification.received_at());
                Some(CallEvent::Incoming(IncomingCall {
                    call_type: call_type.map(ToString::to_string),
                }))
            }
            (CallState::Ringing, Indication::Ring { .. }) => {
                self.last_ring = Some(notification.received_at());
                None
            }
            (CallState::Active, Indication::Ring { .. }) => None,

            (state, Indication::Missed { payload }) => {
                let mut missed = MissedCall::from_payload(payload);
                if state == CallState::Ringing {
                    if missed.number.is_none() {
                        missed.number = self.caller.take();
                    }
                    self.to_idle();
                }
                Some(CallEvent::Missed(missed))
            }

            (_, Indication::Begin) => {
                self.enter(CallState::Active);
                self.last_ring = None;
                Some(CallEvent::Started(CallStarted))
            }

            (state, Indication::End { payload }) => {
                if state == CallState::Idle {
                    debug!("Call ended while idle");
                }
                self.to_idle();
                Some(CallEvent::Ended(CallEnded::from_payload(payload)))
            }

            (CallState::Ringing, Indication::CallerId { number }) => {
                self.caller = Some(number.to_string());
                None
            }
            (_, Indication::CallerId { .. }) => None,
        }
    }

    /// Return to idle if the modem stopped ringing more than `ring_timeout`
    /// ago without any other indication.
    pub fn expire(&mut self, now: Instant, ring_timeout: Duration) -> Option<CallEvent> {
        match (self.state, self.last_ring) {
            (CallState::Ringing, Some(last)) if now.saturating_duration_since(last) >= ring_timeout => {
                debug!("No ring for {} ms, call missed", ring_timeout.as_millis());
                let number = self.caller.take();
                self.to_idle();
                Some(CallEvent::Missed(MissedCall { number }))
            }
            _ => None,
        }
    }

    fn enter(&mut self, state: CallState) {
        if self.state != state {
            debug!("Call state {} -> {}", self.state, state);
            self.state = state;
        }
    }

    fn to_idle(&mut self) {
        self.enter(CallState::Idle);
        self.caller = None;
        self.last_ring = None;
    }
}

/// The call state machine shared between the read loop, which drives it,
/// and the modem handle, which reads its state and manages subscriptions.
///
/// Events are published after the state is updated and the lock released,
/// so a handler observes the new state and may call back into the modem.
pub struct CallTracker {
    machine: Mutex<CriticalSectionRawMutex, RefCell<CallStateMachine>>,
    ring_timeout: Option<Duration>,
    incoming: Observers<IncomingCall>,
    missed: Observers<MissedCall>,
    started: Observers<CallStarted>,
    ended: Observers<CallEnded>,
}

impl CallTracker {
    pub(crate) fn new(ring_timeout: Option<Duration>) -> Self {
        Self {
            machine: Mutex::new(RefCell::new(CallStateMachine::new())),
            ring_timeout,
            incoming: Observers::new(),
            missed: Observers::new(),
            started: Observers::new(),
            ended: Observers::new(),
        }
    }

    pub fn state(&self) -> CallState {
        self.machine.lock(|m| m.borrow().state())
    }

    pub(crate) fn handle(&self, notification: &Notification) {
        if let Some(event) = self.machine.lock(|m| m.borrow_mut().handle(notification)) {
            self.raise(event);
        }
    }

    /// Check the ring timeout, if one is configured.
    pub(crate) fn tick(&self, now: Instant) {
        let Some(ring_timeout) = self.ring_timeout else {
            return;
        };
        if let Some(event) = self
            .machine
            .lock(|m| m.borrow_mut().expire(now, ring_timeout))
        {
            self.raise(event);
        }
    }

    pub fn on_incoming_call(
        &self,
        handler: impl Fn(&IncomingCall) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.incoming.subscribe(handler)
    }

    pub fn on_missed_call(
        &self,
        handler: impl Fn(&MissedCall) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.missed.subscribe(handler)
    }

    pub fn on_call_started(
        &self,
        handler: impl Fn(&CallStarted) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.started.subscribe(handler)
    }

    pub fn on_call_ended(
        &self,
        handler: impl Fn(&CallEnded) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.ended.subscribe(handler)
    }

    /// Remove a subscription made with any of the `on_*` methods.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.incoming.unsubscribe(id)
            || self.missed.unsubscribe(id)
            || self.started.unsubscribe(id)
            || self.ended.unsubscribe(id)
    }

    fn raise(&self, event: CallEvent) {
        debug!("Call event {:?}", event);
        match event {
            CallEvent::Incoming(e) => self.incoming.publish(&e),
            CallEvent::Missed(e) => self.missed.publish(&e),
            CallEvent::Started(e) => self.started.publish(&e),
            CallEvent::Ended(e) => self.ended.publish(&e),
        };
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};

    fn at(line: &str) -> Notification {
        Notification::new(line, Instant::now())
    }

    fn in_state(state: CallState) -> CallStateMachine {
        let mut machine = CallStateMachine::new();
        match state {
            CallState::Idle => {}
            CallState::Ringing => {
                machine.handle(&at("RING"));
            }
            CallState::Active => {
                machine.handle(&at("VOICE CALL: BEGIN"));
            }
        }
        assert_eq!(machine.state(), state);
        machine
    }

    fn ended(secs: Option<u64>) -> Option<CallEvent> {
        Some(CallEvent::Ended(CallEnded {
            duration: secs.map(core::time::Duration::from_secs),
            reason: None,
        }))
    }

    fn missed(number: Option<&str>) -> Option<CallEvent> {
        Some(CallEvent::Missed(MissedCall {
            number: number.map(ToString::to_string),
        }))
    }

    #[test]
    fn ring() {
        let incoming = Some(CallEvent::Incoming(IncomingCall::default()));

        let mut m = in_state(CallState::Idle);
        assert_eq!(m.handle(&at("RING")), incoming);
        assert_eq!(m.state(), CallState::Ringing);

        let mut m = in_state(CallState::Ringing);
        assert_eq!(m.handle(&at("RING")), None);
        assert_eq!(m.state(), CallState::Ringing);

        let mut m = in_state(CallState::Active);
        assert_eq!(m.handle(&at("RING")), None);
        assert_eq!(m.state(), CallState::Active);
    }

    #[test]
    fn extended_ring() {
        let mut m = in_state(CallState::Idle);
        assert_eq!(
            m.handle(&at("+CRING: VOICE")),
            Some(CallEvent::Incoming(IncomingCall {
                call_type: Some("VOICE".into())
            }))
        );
        assert_eq!(m.state(), CallState::Ringing);
    }

    #[test]
    fn begin() {
        for state in [CallState::Idle, CallState::Ringing, CallState::Active] {
            let mut m = in_state(state);
            assert_eq!(
                m.handle(&at("VOICE CALL: BEGIN")),
                Some(CallEvent::Started(CallStarted)),
                "from {}",
                state
            );
            assert_eq!(m.state(), CallState::Active);
        }
    }

    #[test]
    fn end() {
        for state in [CallState::Idle, CallState::Ringing, CallState::Active] {
            let mut m = in_state(state);
            assert_eq!(m.handle(&at("VOICE CALL: END: 000041")), ended(Some(41)));
            assert_eq!(m.state(), CallState::Idle);
        }

        let mut m = in_state(CallState::Active);
        assert_eq!(m.handle(&at("VOICE CALL: END")), ended(None));
    }

    #[test]
    fn indicators_match_by_prefix() {
        let mut m = in_state(CallState::Ringing);
        assert_eq!(
            m.handle(&at("VOICE CALL: BEGIN,1")),
            Some(CallEvent::Started(CallStarted))
        );
        assert_eq!(m.state(), CallState::Active);

        assert_eq!(m.handle(&at("VOICE CALL: ENDED")), ended(None));
        assert_eq!(m.state(), CallState::Idle);

        let mut m = in_state(CallState::Active);
        assert_eq!(m.handle(&at("VOICE CALL: ENDED: 00:00:12")), ended(Some(12)));
    }

    #[test]
    fn end_with_huge_duration_still_ends() {
        let mut m = in_state(CallState::Active);
        assert_eq!(
            m.handle(&at("VOICE CALL: END: 99999999999999999:00:00")),
            Some(CallEvent::Ended(CallEnded {
                duration: None,
                reason: Some("99999999999999999:00:00".into()),
            }))
        );
        assert_eq!(m.state(), CallState::Idle);
    }

    #[test]
    fn missed_call() {
        let mut m = in_state(CallState::Idle);
        assert_eq!(m.handle(&at("MISSED_CALL: 5551234")), missed(Some("5551234")));
        assert_eq!(m.state(), CallState::Idle);

        let mut m = in_state(CallState::Ringing);
        assert_eq!(m.handle(&at("MISSED_CALL: 5551234")), missed(Some("5551234")));
        assert_eq!(m.state(), CallState::Idle);

        let mut m = in_state(CallState::Active);
        assert_eq!(m.handle(&at("MISSED_CALL: 5551234")), missed(Some("5551234")));
        assert_eq!(m.state(), CallState::Active);
    }

    #[test]
    fn missed_call_falls_back_to_caller_id() {
        let mut m = in_state(CallState::Ringing);
        assert_eq!(m.handle(&at("+CLIP: \"+4520304050\",145,\"\",,\"\",0")), None);
        assert_eq!(m.handle(&at("MISSED_CALL: ")), missed(Some("+4520304050")));
    }

    #[test]
    fn scenario() {
        let mut m = CallStateMachine::new();
        assert!(matches!(m.handle(&at("RING")), Some(CallEvent::Incoming(_))));
        assert_eq!(m.state(), CallState::Ringing);
        assert_eq!(
            m.handle(&at("VOICE CALL: BEGIN")),
            Some(CallEvent::Started(CallStarted))
        );
        assert_eq!(m.state(), CallState::Active);
        assert_eq!(m.handle(&at("VOICE CALL: END: 00:01:23")), ended(Some(83)));
        assert_eq!(m.state(), CallState::Idle);
    }

    #[test]
    fn irrelevant_lines() {
        for state in [CallState::Idle, CallState::Ringing, CallState::Active] {
            for line in [
                "OK",
                "RINGING",
                "+CSQ: 21,99",
                "+CLIP: 1,1",
                "VOICE CALL:",
                "VOICE CALL: HOLD",
                "NO CARRIER",
            ] {
                let mut m = in_state(state);
                assert_eq!(m.handle(&at(line)), None, "{:?} in {}", line, state);
                assert_eq!(m.state(), state);
            }
        }
    }

    #[test]
    fn ring_timeout() {
        let timeout = Duration::from_secs(6);
        let start = Instant::now();

        let mut m = CallStateMachine::new();
        m.handle(&Notification::new("RING", start));
        m.handle(&Notification::new("+CLIP: \"5551234\",129", start));

        assert_eq!(m.expire(start + Duration::from_secs(5), timeout), None);
        m.handle(&Notification::new("RING", start + Duration::from_secs(5)));
        assert_eq!(m.expire(start + Duration::from_secs(10), timeout), None);
        assert_eq!(
            m.expire(start + Duration::from_secs(11), timeout),
            missed(Some("5551234"))
        );
        assert_eq!(m.state(), CallState::Idle);
        assert_eq!(m.expire(start + Duration::from_secs(30), timeout), None);
    }

    #[test]
    fn tracker_publishes_after_transition() {
        let tracker = Arc::new(CallTracker::new(None));
        let seen: Arc<StdMutex<Vec<CallState>>> = Arc::new(StdMutex::new(Vec::new()));

        let (t, s) = (tracker.clone(), seen.clone());
        tracker.on_incoming_call(move |_| s.lock().unwrap().push(t.state()));
        let (t, s) = (tracker.clone(), seen.clone());
        let started = tracker.on_call_started(move |_| s.lock().unwrap().push(t.state()));
        let s = seen.clone();
        tracker.on_call_ended(move |e| {
            assert_eq!(e.duration, Some(core::time::Duration::from_secs(83)));
            s.lock().unwrap().push(CallState::Idle);
        });

        tracker.handle(&at("RING"));
        tracker.handle(&at("VOICE CALL: BEGIN"));
        assert!(tracker.unsubscribe(started));
        assert!(!tracker.unsubscribe(started));
        tracker.handle(&at("VOICE CALL: BEGIN"));
        tracker.handle(&at("VOICE CALL: END: 00:01:23"));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![CallState::Ringing, CallState::Active, CallState::Idle]
        );
    }

    #[test]
    fn tracker_raises_end_with_overflowing_duration() {
        let tracker = CallTracker::new(None);
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let s = seen.clone();
        tracker.on_call_ended(move |e| s.lock().unwrap().push(e.clone()));

        tracker.handle(&at("VOICE CALL: BEGIN"));
        tracker.handle(&at("VOICE CALL: END: 99999999999999999:00:00"));

        assert_eq!(tracker.state(), CallState::Idle);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].duration, None);
    }

    #[test]
    fn tracker_tick_without_timeout() {
        let tracker = CallTracker::new(None);
        tracker.handle(&at("RING"));
        tracker.tick(Instant::now() + Duration::from_secs(3600));
        assert_eq!(tracker.state(), CallState::Ringing);
    }
}
