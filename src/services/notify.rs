//! Fire-and-forget owner notifications.
//!
//! Ingestion emits a [`FileUploaded`] event after the record is persisted;
//! an independent consumer task handles delivery. A full mailbox, a closed
//! channel, or a consumer failure never affects the upload result.

use tokio::sync::mpsc;
use tracing::{info, warn};

/// Event emitted after a file record has been persisted.
#[derive(Clone, Debug)]
pub struct FileUploaded {
    pub email: String,
    pub name: String,
    pub url: String,
}

/// Handle for emitting upload notifications.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<FileUploaded>,
}

impl Notifier {
    /// Spawn the consumer task and return the emitting handle.
    ///
    /// The consumer currently records delivery in the log; a mail transport
    /// slots in here without touching the ingestion path.
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<FileUploaded>();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                info!(
                    email = %event.email,
                    file = %event.name,
                    url = %event.url,
                    "notifying owner of new upload"
                );
            }
        });
        Self { tx }
    }

    /// Emit an upload event. Never fails the caller.
    pub fn file_uploaded(&self, event: FileUploaded) {
        if self.tx.send(event).is_err() {
            warn!("notification consumer gone; dropping upload event");
        }
    }
}
