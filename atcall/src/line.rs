//! The line source: turns the serial byte stream into text lines and writes
//! command lines back out.

use std::collections::VecDeque;
use embassy_time::{with_timeout, Duration, Instant};
use embedded_io::Error as _;
use embedded_io_async::{Read, Write};
use log::{debug, error, trace};

use crate::{
    config::LineTerminator,
    helpers::{LossyStr, SliceExt, LINE_WHITESPACE},
    CommandLine, Error,
};

/// Assembles received bytes into complete lines.
///
/// Lines end at either `\r` or `\n`, which covers modems configured for CR,
/// LF or CRLF. Empty lines are skipped and whitespace around each line is
/// trimmed. At most `INGRESS_BUF_SIZE` bytes of a single line are kept; a
/// longer line is dropped up to its terminator.
pub struct LineBuffer<const INGRESS_BUF_SIZE: usize> {
    partial: heapless::Vec<u8, INGRESS_BUF_SIZE>,
    lines: VecDeque<String>,
    discarding: bool,
}

impl<const INGRESS_BUF_SIZE: usize> LineBuffer<INGRESS_BUF_SIZE> {
    pub fn new() -> Self {
        Self {
            partial: heapless::Vec::new(),
            lines: VecDeque::new(),
            discarding: false,
        }
    }

    /// Ingest bytes read from the serial port.
    pub fn push(&mut self, data: &[u8]) {
        trace!("Digesting: {:?}", LossyStr(data));

        for &byte in data {
            if byte == b'\r' || byte == b'\n' {
                self.finish_line();
            } else if !self.discarding && self.partial.push(byte).is_err() {
                error!("DATA OVERFLOW! Buffer: {:?}", LossyStr(&self.partial));
                self.partial.clear();
                self.discarding = true;
            }
        }
    }

    /// Take the oldest complete line, if any.
    pub fn next_line(&mut self) -> Option<String> {
        self.lines.pop_front()
    }

    /// Number of bytes held for the line currently being received.
    pub fn partial_len(&self) -> usize {
        self.partial.len()
    }

    pub fn capacity(&self) -> usize {
        self.partial.capacity()
    }

    /// Drop everything received so far.
    pub fn clear(&mut self) {
        self.partial.clear();
        self.lines.clear();
        self.discarding = false;
    }

    fn finish_line(&mut self) {
        if self.discarding {
            self.discarding = false;
        } else {
            let line = self.partial.trim(LINE_WHITESPACE);
            if !line.is_empty() {
                self.lines
                    .push_back(String::from_utf8_lossy(line).into_owned());
            }
        }
        self.partial.clear();
    }
}

impl<const INGRESS_BUF_SIZE: usize> Default for LineBuffer<INGRESS_BUF_SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

/// Read half of the line source.
pub struct LineReader<R: Read, const INGRESS_BUF_SIZE: usize> {
    reader: R,
    buf: LineBuffer<INGRESS_BUF_SIZE>,
}

impl<R: Read, const INGRESS_BUF_SIZE: usize> LineReader<R, INGRESS_BUF_SIZE> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: LineBuffer::new(),
        }
    }

    /// Wait up to `timeout` for the next complete line.
    ///
    /// Returns `Ok(None)` when the timeout elapses first; bytes of a line
    /// that is still incomplete are kept for the next call. A read error or
    /// the end of the stream is reported as [`Error::Read`].
    pub async fn next_line(&mut self, timeout: Duration) -> Result<Option<String>, Error> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(line) = self.buf.next_line() {
                return Ok(Some(line));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }

            let mut chunk = [0; 64];
            match with_timeout(deadline - now, self.reader.read(&mut chunk)).await {
                Err(_) => return Ok(None),
                Ok(Ok(0)) => {
                    error!("Serial port closed");
                    return Err(Error::Read);
                }
                Ok(Ok(received)) => self.buf.push(&chunk[..received]),
                Ok(Err(e)) => {
                    error!("Got serial read error {:?}", e.kind());
                    return Err(Error::Read);
                }
            }
        }
    }

    /// Feed bytes received outside of [`next_line`](Self::next_line).
    pub fn push(&mut self, data: &[u8]) {
        self.buf.push(data)
    }

    /// Take a line that is already complete, without reading.
    pub fn try_next_line(&mut self) -> Option<String> {
        self.buf.next_line()
    }

    pub fn buffer(&self) -> &LineBuffer<INGRESS_BUF_SIZE> {
        &self.buf
    }
}

/// Write half of the line source.
pub struct LineWriter<W: Write> {
    writer: W,
    terminator: LineTerminator,
}

impl<W: Write> LineWriter<W> {
    pub fn new(writer: W, terminator: LineTerminator) -> Self {
        Self { writer, terminator }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Send one command line and flush it, without waiting for a reply.
    pub async fn write_line(&mut self, command: &CommandLine) -> Result<(), Error> {
        let bytes = command.as_bytes();
        if bytes.len() < 50 {
            debug!("Sending command: {:?}", LossyStr(bytes));
        } else {
            debug!("Sending command with long payload ({} bytes)", bytes.len());
        }

        self.writer
            .write_all(bytes)
            .await
            .map_err(|_| Error::Write)?;
        self.writer
            .write_all(self.terminator.as_bytes())
            .await
            .map_err(|_| Error::Write)?;
        self.writer.flush().await.map_err(|_| Error::Write)
    }
}
