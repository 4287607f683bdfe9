//! Response channel for storage commands.

use std::io::{self, Write};

/// Where a command streams its response.
///
/// `data` carries protocol bytes back-to-back; `error` carries one
/// human-readable message per failure.
pub trait Reply {
    fn data(&mut self, bytes: &[u8]) -> io::Result<()>;
    fn error(&mut self, message: &str) -> io::Result<()>;
}

/// Reply writing data and errors to two byte streams (e.g. stdout / stderr).
pub struct StreamReply<O, E> {
    out: O,
    err: E,
}

impl<O: Write, E: Write> StreamReply<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self { out, err }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()?;
        self.err.flush()
    }
}

impl<O: Write, E: Write> Reply for StreamReply<O, E> {
    fn data(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.out.write_all(bytes)
    }

    fn error(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.err, "{}", message)
    }
}

/// In-memory reply, for embedding and tests.
#[derive(Debug, Default)]
pub struct BufferReply {
    pub body: Vec<u8>,
    pub errors: Vec<String>,
}

impl BufferReply {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap_or("<binary>")
    }
}

impl Reply for BufferReply {
    fn data(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.body.extend_from_slice(bytes);
        Ok(())
    }

    fn error(&mut self, message: &str) -> io::Result<()> {
        self.errors.push(message.to_string());
        Ok(())
    }
}
