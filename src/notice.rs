//! User-facing failure reporting
//!
//! Failures that surface where no caller can receive a `Result` (a handle
//! dropped with unsaved changes that cannot be written) are handed to a
//! [`NoticeSink`]. The default sink logs them; a GUI installs one that shows a
//! message to the user.

use crate::error::Error;
use log::error;

/// Receiver for failures that have no caller to return to
pub trait NoticeSink: Send + Sync {
    /// Saving `file` failed while its last handle was being released
    fn save_failed(&self, file: &str, error: &Error);
}

/// Sink that logs failures at error level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotice;

impl NoticeSink for LogNotice {
    fn save_failed(&self, file: &str, error: &Error) {
        error!("Unable to save {file}, recent changes are lost: {error}");
    }
}

impl<F> NoticeSink for F
where
    F: Fn(&str, &Error) + Send + Sync,
{
    fn save_failed(&self, file: &str, error: &Error) {
        self(file, error);
    }
}
