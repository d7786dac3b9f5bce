//! Shared types used across pipeline stages.
//!
//! Stages report progress as [`BuildEvent`]s on an `mpsc` channel. The
//! library never prints; `main` owns the receiving end and hands each event
//! to [`output`](crate::output) for formatting.

use crate::assets::AssetAction;

/// Progress reported while a build runs.
///
/// Paths are `/`-separated and relative: sources to the source root (or to
/// the vendor directory for vendor files), destinations to the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    /// Global data finished loading.
    DataLoaded { keys: Vec<String> },
    /// The template registry finished compiling.
    TemplatesLoaded { names: Vec<String> },
    /// A vendor file was mirrored or found already up to date.
    VendorFile {
        source: String,
        dest: String,
        status: VendorStatus,
    },
    /// A page was rendered and written.
    PageRendered { source: String, dest: String },
    /// A non-page file was transformed or copied.
    AssetWritten {
        source: String,
        dest: String,
        action: AssetAction,
    },
}

/// Outcome for one vendor file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorStatus {
    /// Destination was missing or different and has been written.
    Copied,
    /// Destination already had identical content.
    Unchanged,
}

/// Send an event if a channel is attached. A closed receiver is ignored:
/// losing progress output never fails a build.
pub(crate) fn emit(events: Option<&std::sync::mpsc::Sender<BuildEvent>>, event: BuildEvent) {
    if let Some(tx) = events {
        tx.send(event).ok();
    }
}
