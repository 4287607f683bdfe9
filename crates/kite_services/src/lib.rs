//! Kite Services Layer
//!
//! Settings and the storage service: a file transfer command processor
//! (list / pull / push / remove / stats) over a local storage root.

pub mod settings;
pub mod storage;

use settings::Settings;
use storage::{CommandProcessor, StorageError, StorageRoot};

/// Open the storage root named by `settings` and build a command processor
/// for it. The root directory is created if it does not exist yet.
pub fn init_services(settings: &Settings) -> Result<CommandProcessor, StorageError> {
    let root = StorageRoot::open(&settings.storage.root)?;
    tracing::info!(root = %root.path().display(), "storage service ready");
    Ok(CommandProcessor::new(root))
}
