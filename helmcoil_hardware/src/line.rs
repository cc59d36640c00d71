//! Line-oriented ASCII transport.
//!
//! Each command is written followed by the terminator; a query then reads
//! exactly one line back. The reply is handed to the caller unmodified.

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use helmcoil_traits::Instrument;

use crate::error::{HwError, Result};

pub struct LineInstrument<R, W> {
    reader: R,
    writer: W,
    terminator: &'static str,
    name: String,
}

impl<R, W> core::fmt::Debug for LineInstrument<R, W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LineInstrument")
            .field("name", &self.name)
            .field("terminator", &self.terminator)
            .finish()
    }
}

impl LineInstrument<BufReader<TcpStream>, TcpStream> {
    /// Connect to a LAN bridge (GPIB/serial-to-TCP) that speaks the ASCII protocol.
    pub fn connect_tcp(addr: &str, timeout: Duration) -> Result<Self> {
        let sock = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| HwError::Protocol(format!("cannot resolve {addr}")))?;
        let stream = TcpStream::connect_timeout(&sock, timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        let reader = BufReader::new(stream.try_clone()?);
        tracing::info!(addr, timeout_ms = timeout.as_millis() as u64, "instrument connected");
        Ok(Self::new(reader, stream).named(addr))
    }
}

impl<R: BufRead, W: Write> LineInstrument<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            terminator: "\n",
            name: String::from("instrument"),
        }
    }

    /// Override the command terminator (default `\n`; some devices want `\r\n`).
    pub fn with_terminator(mut self, terminator: &'static str) -> Self {
        self.terminator = terminator;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn send(&mut self, command: &str) -> Result<()> {
        self.writer.write_all(command.as_bytes())?;
        self.writer.write_all(self.terminator.as_bytes())?;
        self.writer.flush()?;
        tracing::debug!(device = %self.name, command, "sent");
        Ok(())
    }

    fn read_reply(&mut self) -> Result<String> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => Err(HwError::Disconnected),
            Ok(_) => {
                tracing::debug!(device = %self.name, reply = line.trim_end(), "received");
                Ok(line)
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                Err(HwError::Timeout)
            }
            Err(e) => Err(HwError::Io(e)),
        }
    }
}

impl<R: BufRead, W: Write> Instrument for LineInstrument<R, W> {
    fn query(&mut self, command: &str) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>> {
        self.send(command)?;
        Ok(self.read_reply()?)
    }

    fn write(&mut self, command: &str) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.send(command)?)
    }
}
