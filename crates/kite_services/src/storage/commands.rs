//! File transfer command processor.
//!
//! Push sessions follow `Idle -> Writing (start) -> Idle (commit)`. Only one
//! session can be open at a time; starting another is an error rather than a
//! silent discard of the staged data. A failed chunk write poisons the
//! session: the staged data is discarded and the commit is refused, so a
//! partial upload never reaches its destination.

use crate::storage::{walk, Reply, StorageError, StorageRoot};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use kite_env::disk::DiskSpace;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{debug, info, trace, warn};

/// Raw bytes per pulled chunk. A multiple of 3, so every chunk encodes to
/// base64 without padding and chunks can be concatenated on the wire.
pub const CHUNK_SIZE: usize = 1023;
const _: () = assert!(CHUNK_SIZE % 3 == 0);

const ENCODED_CHUNK_SIZE: usize = CHUNK_SIZE / 3 * 4;

/// One request against the storage service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List { prefix: String },
    Pull { filename: String },
    Remove { filename: String },
    PushStart,
    PushChunk(Vec<u8>),
    PushCommit { filename: String },
    Stats,
    Exit,
}

enum Session {
    Idle,
    Writing { file: File, written: u64 },
    /// A chunk write failed; only a commit (which is refused) or a new start
    /// leaves this state.
    Failed,
}

pub struct CommandProcessor {
    root: StorageRoot,
    session: Session,
    finished: bool,
}

impl CommandProcessor {
    pub fn new(root: StorageRoot) -> Self {
        Self {
            root,
            session: Session::Idle,
            finished: false,
        }
    }

    pub fn root(&self) -> &StorageRoot {
        &self.root
    }

    pub fn is_pushing(&self) -> bool {
        matches!(self.session, Session::Writing { .. })
    }

    /// Set once an `Exit` command was processed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Run one command, writing its response to `reply`.
    ///
    /// A failing command writes its error message to `reply` and also returns
    /// it, so callers must not report it a second time.
    pub fn execute(&mut self, command: Command, reply: &mut dyn Reply) -> Result<(), StorageError> {
        let result = match command {
            Command::List { prefix } => self.list(&prefix, reply),
            Command::Pull { filename } => self.pull(&filename, reply),
            Command::Remove { filename } => self.remove(&filename, reply),
            Command::PushStart => self.start_push(),
            Command::PushChunk(bytes) => self.add_chunk(&bytes),
            Command::PushCommit { filename } => self.commit_push(&filename, reply),
            Command::Stats => self.stats(reply),
            Command::Exit => self.exit(reply),
        };

        match result {
            Err(StorageError::Channel(err)) => Err(StorageError::Channel(err)),
            Err(err) => {
                debug!(error = %err, "storage command failed");
                reply
                    .error(&err.to_string())
                    .map_err(StorageError::Channel)?;
                Err(err)
            }
            Ok(()) => Ok(()),
        }
    }

    /// Emit `"<T> <path>\n"` per visible entry under `prefix`, then a blank
    /// line. Per-entry errors go to the error channel and the walk continues.
    pub fn list(&mut self, prefix: &str, reply: &mut dyn Reply) -> Result<(), StorageError> {
        for entry in walk(&self.root, prefix)? {
            match entry {
                Ok(entry) => {
                    let line = format!("{} {}\n", entry.kind.tag(), entry.path);
                    send(reply, line.as_bytes())?;
                }
                Err(err) => {
                    warn!(error = %err, "list: skipping entry");
                    reply.error(&err.to_string()).map_err(StorageError::Channel)?;
                }
            }
        }
        send(reply, b"\n")
    }

    /// Stream `filename` as base64, chunk by chunk, terminated by `"\n"`.
    pub fn pull(&mut self, filename: &str, reply: &mut dyn Reply) -> Result<(), StorageError> {
        let path = self.root.resolve_file(filename)?;
        let mut file = File::open(&path).map_err(|e| StorageError::io(filename, e))?;

        let mut chunk = [0u8; CHUNK_SIZE];
        let mut encoded = String::with_capacity(ENCODED_CHUNK_SIZE);
        let mut total = 0usize;
        loop {
            let n = fill_chunk(&mut file, &mut chunk).map_err(|e| StorageError::io(filename, e))?;
            if n == 0 {
                break;
            }
            encoded.clear();
            STANDARD.encode_string(&chunk[..n], &mut encoded);
            send(reply, encoded.as_bytes())?;
            total += n;
            trace!(bytes = n, "pull: chunk sent");
            if n < CHUNK_SIZE {
                break;
            }
        }
        debug!(file = filename, bytes = total, "pull complete");
        send(reply, b"\n")
    }

    /// Delete a file (or an empty directory). Reports the real OS error.
    pub fn remove(&mut self, filename: &str, reply: &mut dyn Reply) -> Result<(), StorageError> {
        let path = self.root.resolve_file(filename)?;
        let meta = fs::symlink_metadata(&path).map_err(|e| StorageError::io(filename, e))?;
        let removed = if meta.is_dir() {
            fs::remove_dir(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(|e| StorageError::io(filename, e))?;

        debug!(file = filename, "removed");
        send(reply, b"OK\n")
    }

    /// Open (truncating) the staging file and enter the writing state.
    pub fn start_push(&mut self) -> Result<(), StorageError> {
        if self.is_pushing() {
            return Err(StorageError::SessionAlreadyOpen);
        }

        let staging = self.root.staging_path();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&staging)
            .map_err(|e| StorageError::io("Cannot open staging file", e))?;

        self.session = Session::Writing { file, written: 0 };
        debug!("push session started");
        Ok(())
    }

    /// Append raw bytes to the staging file. A write error aborts the session.
    pub fn add_chunk(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        let (file, written) = match &mut self.session {
            Session::Writing { file, written } => (file, written),
            Session::Failed => return Err(StorageError::PushAborted),
            Session::Idle => return Err(StorageError::NoSession),
        };
        if let Err(err) = file.write_all(bytes) {
            self.abort_push();
            return Err(StorageError::io("Cannot write chunk", err));
        }
        *written += bytes.len() as u64;
        trace!(bytes = bytes.len(), total = *written, "push: chunk staged");
        Ok(())
    }

    /// Close the staging file and move it to `filename`.
    ///
    /// The session ends whether or not the commit succeeds. On failure the
    /// destination keeps its previous content.
    pub fn commit_push(&mut self, filename: &str, reply: &mut dyn Reply) -> Result<(), StorageError> {
        let (file, written) = match std::mem::replace(&mut self.session, Session::Idle) {
            Session::Writing { file, written } => (file, written),
            Session::Failed => return Err(StorageError::PushAborted),
            Session::Idle => return Err(StorageError::NoSession),
        };
        file.sync_all()
            .map_err(|e| StorageError::io("Cannot flush staging file", e))?;
        drop(file);

        let staging = self.root.staging_path();
        let dest = self.root.resolve_file(filename)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                StorageError::io(format!("Cannot create path {}", self.root.relative(parent)), e)
            })?;
        }

        // Check the staged data is still there before touching the destination.
        File::open(&staging).map_err(|e| StorageError::io("Staging file unreadable", e))?;
        replace_file(&staging, &dest)
            .map_err(|e| StorageError::io("Cannot finalize push", e))?;

        info!(file = filename, bytes = written, "push committed");
        send(reply, b"OK\n")
    }

    /// Emit `"<freeBytes> <totalBytes>\n"` for the storage filesystem.
    pub fn stats(&mut self, reply: &mut dyn Reply) -> Result<(), StorageError> {
        let space = DiskSpace::query(self.root.path()).map_err(StorageError::SpaceQueryFailed)?;
        let line = format!("{} {}\n", space.free_bytes(), space.total_bytes());
        send(reply, line.as_bytes())
    }

    /// Drop the staging handle and its partial content.
    fn abort_push(&mut self) {
        self.session = Session::Failed;
        if let Err(err) = fs::remove_file(self.root.staging_path()) {
            debug!(error = %err, "could not discard staging file");
        }
        warn!("push session aborted after a failed write");
    }

    pub fn exit(&mut self, reply: &mut dyn Reply) -> Result<(), StorageError> {
        self.finished = true;
        send(reply, b"OK\n")
    }
}

fn send(reply: &mut dyn Reply, bytes: &[u8]) -> Result<(), StorageError> {
    reply.data(bytes).map_err(StorageError::Channel)
}

/// Read until `buf` is full or EOF. Short reads mid-file would otherwise
/// produce padded base64 in the middle of the stream.
fn fill_chunk(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Move `from` over `to`. `rename` replaces atomically where the platform
/// allows it; otherwise the old file is removed first and the rename retried.
fn replace_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(err) if to.is_file() => {
            debug!(error = %err, "rename over existing file failed; removing it first");
            fs::remove_file(to)?;
            fs::rename(from, to)
        }
        Err(err) => Err(err),
    }
}
