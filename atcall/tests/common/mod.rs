#![allow(dead_code)]

use std::time::Duration;

use atcall::{
    call::CallEvent, CallControl, Config, DefaultUrcMatcher, Ingress, Modem, ModemBuilder,
};
use embedded_io_adapters::tokio_1::FromTokio;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf},
    sync::mpsc::{unbounded_channel, UnboundedReceiver},
};

pub const INGRESS_BUF_SIZE: usize = 256;

pub type HostRx = FromTokio<ReadHalf<DuplexStream>>;
pub type HostTx = FromTokio<WriteHalf<DuplexStream>>;
pub type TestIngress = Ingress<HostRx, DefaultUrcMatcher, INGRESS_BUF_SIZE>;

const DEVICE_TIMEOUT: Duration = Duration::from_secs(5);

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// The modem end of the mock serial line.
pub struct Device {
    rx: ReadHalf<DuplexStream>,
    tx: WriteHalf<DuplexStream>,
    pending: Vec<u8>,
}

impl Device {
    /// Wait for the next command line written by the host.
    pub async fn expect_line(&mut self) -> String {
        loop {
            if let Some(pos) = self.pending.windows(2).position(|w| w == b"\r\n") {
                let line = String::from_utf8(self.pending[..pos].to_vec()).unwrap();
                self.pending.drain(..pos + 2);
                log::debug!("Device received {:?}", line);
                return line;
            }

            let mut buf = [0; 256];
            let n = tokio::time::timeout(DEVICE_TIMEOUT, self.rx.read(&mut buf))
                .await
                .expect("host sent no command")
                .unwrap();
            assert!(n > 0, "host closed the serial line");
            self.pending.extend_from_slice(&buf[..n]);
        }
    }

    /// Whether the host stays silent for `duration`.
    pub async fn is_silent_for(&mut self, duration: Duration) -> bool {
        if !self.pending.is_empty() {
            return false;
        }
        let mut buf = [0; 256];
        match tokio::time::timeout(duration, self.rx.read(&mut buf)).await {
            Err(_) => true,
            Ok(n) => {
                let n = n.unwrap();
                self.pending.extend_from_slice(&buf[..n]);
                n == 0
            }
        }
    }

    /// Send raw bytes to the host.
    pub async fn send(&mut self, data: &str) {
        self.tx.write_all(data.as_bytes()).await.unwrap();
        self.tx.flush().await.unwrap();
    }

    /// Send each line framed the way a modem in verbose mode does.
    pub async fn reply(&mut self, lines: &[&str]) {
        for line in lines {
            self.send(&format!("\r\n{}\r\n", line)).await;
        }
    }

    /// Expect `command`, then answer with `lines`.
    pub async fn respond(&mut self, command: &str, lines: &[&str]) {
        assert_eq!(self.expect_line().await, command);
        self.reply(lines).await;
    }
}

pub fn setup(config: Config) -> (Modem<HostTx>, TestIngress, Device) {
    init_logger();

    let (host, device) = tokio::io::duplex(1024);
    let (host_rx, host_tx) = tokio::io::split(host);
    let (device_rx, device_tx) = tokio::io::split(device);

    let (modem, ingress) =
        ModemBuilder::new(FromTokio::new(host_rx), FromTokio::new(host_tx), config)
            .build::<INGRESS_BUF_SIZE>();

    (
        modem,
        ingress,
        Device {
            rx: device_rx,
            tx: device_tx,
            pending: Vec::new(),
        },
    )
}

/// Set up a modem whose read loop already runs in the background.
pub fn start(config: Config) -> (Modem<HostTx>, Device) {
    let (modem, ingress, device) = setup(config);
    tokio::spawn(ingress.run());
    (modem, device)
}

/// Record every call event raised by `modem`.
pub fn record_calls(modem: &impl CallControl) -> UnboundedReceiver<CallEvent> {
    let (tx, rx) = unbounded_channel();

    let t = tx.clone();
    modem.on_incoming_call(move |e| {
        let _ = t.send(CallEvent::Incoming(e.clone()));
    });
    let t = tx.clone();
    modem.on_missed_call(move |e| {
        let _ = t.send(CallEvent::Missed(e.clone()));
    });
    let t = tx.clone();
    modem.on_call_started(move |e| {
        let _ = t.send(CallEvent::Started(*e));
    });
    modem.on_call_ended(move |e| {
        let _ = tx.send(CallEvent::Ended(e.clone()));
    });

    rx
}

pub async fn next_event(events: &mut UnboundedReceiver<CallEvent>) -> CallEvent {
    tokio::time::timeout(DEVICE_TIMEOUT, events.recv())
        .await
        .expect("no call event")
        .expect("event channel closed")
}
