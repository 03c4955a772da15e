//! Newline framing over a non-blocking byte stream.
//!
//! Wire format: UTF-8 text, one message per line, terminated by `\n`. A
//! trailing `\r` is tolerated on receive. The framer knows nothing about
//! commands; it only turns bytes into lines and lines into bytes.
//!
//! The wrapped stream must be in non-blocking mode. `WouldBlock` is read as
//! "nothing more right now", so neither `drain` nor `write` ever stalls the
//! caller's frame.

use log::{debug, warn};
use std::io::{ErrorKind, Read, Write};

const READ_CHUNK: usize = 4096;

/// Longest partial line kept while waiting for its terminator.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Outgoing bytes kept for a peer that is not reading before it is dropped.
pub const MAX_PENDING_OUTPUT: usize = 1024 * 1024;

pub struct LineFramer<S> {
    stream: S,
    read_buffer: [u8; READ_CHUNK],
    /// Received bytes not yet terminated by `\n`.
    incoming: Vec<u8>,
    /// Bytes accepted by `write` that the stream has not taken yet.
    outgoing: Vec<u8>,
    closed: bool,
}

impl<S: Read + Write> LineFramer<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            read_buffer: [0u8; READ_CHUNK],
            incoming: Vec::new(),
            outgoing: Vec::new(),
            closed: false,
        }
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// True once EOF, a hard I/O error, or an overflow has been observed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of bytes written but not yet handed to the stream.
    pub fn pending_output(&self) -> usize {
        self.outgoing.len()
    }

    /// Number of bytes of an unterminated line currently buffered.
    pub fn pending_input(&self) -> usize {
        self.incoming.len()
    }

    /// Queues `line` plus a terminator and pushes as much as the stream takes.
    ///
    /// Empty lines are not sent. Errors are swallowed here; they only flip
    /// `is_closed`.
    pub fn write(&mut self, line: &str) {
        if line.is_empty() || self.closed {
            return;
        }

        self.outgoing.extend_from_slice(line.as_bytes());
        self.outgoing.push(b'\n');
        self.flush();
    }

    /// Retries any output left over from earlier writes.
    pub fn flush(&mut self) {
        while !self.outgoing.is_empty() && !self.closed {
            match self.stream.write(&self.outgoing) {
                Ok(0) => self.mark_closed("stream accepted no bytes"),
                Ok(written) => {
                    self.outgoing.drain(..written);
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => self.mark_closed(&format!("write failed: {}", e)),
            }
        }

        if self.outgoing.len() > MAX_PENDING_OUTPUT {
            self.mark_closed("peer is not reading");
        }
    }

    /// Reads everything available and returns every complete line.
    ///
    /// Partial trailing data stays buffered for the next call.
    pub fn drain(&mut self) -> Vec<String> {
        let mut lines = Vec::new();

        self.flush();
        if self.closed {
            return lines;
        }

        loop {
            match self.stream.read(&mut self.read_buffer) {
                Ok(0) => {
                    self.mark_closed("peer closed the stream");
                    break;
                }
                Ok(read) => {
                    self.incoming.extend_from_slice(&self.read_buffer[..read]);
                    self.extract_lines(&mut lines);

                    if self.incoming.len() > MAX_LINE_BYTES {
                        self.mark_closed("line exceeds maximum length");
                        break;
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.mark_closed(&format!("read failed: {}", e));
                    break;
                }
            }
        }

        lines
    }

    fn extract_lines(&mut self, lines: &mut Vec<String>) {
        let mut start = 0;
        while let Some(offset) = self.incoming[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            let mut raw = &self.incoming[start..end];
            if raw.last() == Some(&b'\r') {
                raw = &raw[..raw.len() - 1];
            }
            lines.push(String::from_utf8_lossy(raw).into_owned());
            start = end + 1;
        }

        if start > 0 {
            self.incoming.drain(..start);
        }
    }

    fn mark_closed(&mut self, reason: &str) {
        if !self.closed {
            debug!("Stream closed: {}", reason);
            if !self.outgoing.is_empty() {
                warn!("Dropping {} unsent bytes", self.outgoing.len());
            }
        }
        self.closed = true;
        self.outgoing.clear();
    }
}
