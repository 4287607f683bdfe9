//! File transfer over a local storage root.
//!
//! Commands are synchronous: each one runs to completion (or error) before
//! returning, streaming its response into a [`Reply`]. Uploads are staged in
//! a reserved working file and moved into place only on commit, so a
//! destination is never observed half-written.

mod commands;
mod error;
mod reply;
mod root;
mod walk;

pub use commands::{Command, CommandProcessor, CHUNK_SIZE};
pub use error::StorageError;
pub use reply::{BufferReply, Reply, StreamReply};
pub use root::{StorageRoot, RESERVED_PREFIX, STAGING_FILE};
pub use walk::{walk, EntryKind, WalkEntry};
