//! `MessageStore`: the append-until-discard log of per-chunk diagnostics a
//! query accumulates as jobs run (§3, §7). Grounded on `qdisp/MessageStore.h`
//! - one store per query, written by the `ChunkMsgReceiver`/`ResultHandler`
//! path as jobs finish, read by the façade to answer `getMessageCount`/
//! `getMessage` (§6).

use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use crate::job_description::Severity;

/// One diagnostic entry: `{code, severity, description, timestamp}` per §3's
/// `MessageStore` row shape. `chunk_id` uses a negative sentinel for
/// system-level messages not tied to a particular chunk (§6, "system-level
/// errors use negative chunkIds").
#[derive(Clone, Debug)]
pub struct Message {
    pub chunk_id: i32,
    pub code: i32,
    pub severity: Severity,
    pub description: String,
    pub timestamp_secs: u64,
}

#[derive(Default)]
struct Inner {
    messages: Vec<Message>,
    finished: bool,
}

/// Thread-safe, append-only (until [`MessageStore::finish`]) log of
/// diagnostics for one query. Message-store writes are serialized per chunk
/// (§5).
#[derive(Default)]
pub struct MessageStore {
    inner: Mutex<Inner>,
}

impl MessageStore {
    pub fn new() -> MessageStore {
        MessageStore::default()
    }

    pub fn add_message(&self, chunk_id: i32, code: i32, severity: Severity, description: impl Into<String>) {
        let timestamp_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.inner.lock().messages.push(Message {
            chunk_id,
            code,
            severity,
            description: description.into(),
            timestamp_secs,
        });
    }

    /// Convenience for system-level (not per-chunk) diagnostics, e.g.
    /// analysis failures: recorded with the `chunkId == -1` sentinel.
    pub fn add_error_message(&self, code: i32, description: impl Into<String>) {
        self.add_message(-1, code, Severity::Error, description);
    }

    pub fn message_count(&self) -> usize {
        self.inner.lock().messages.len()
    }

    pub fn message(&self, idx: usize) -> Option<Message> {
        self.inner.lock().messages.get(idx).cloned()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.lock().messages.clone()
    }

    /// True if any recorded message has non-zero (i.e. non-`Info`)
    /// severity - §7: "non-zero severity implies failure."
    pub fn has_failure(&self) -> bool {
        self.inner
            .lock()
            .messages
            .iter()
            .any(|m| !matches!(m.severity, Severity::Info))
    }

    pub fn finish(&self) {
        self.inner.lock().finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.inner.lock().finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_accumulate_in_order() {
        let store = MessageStore::new();
        store.add_message(100, 0, Severity::Info, "started");
        store.add_message(100, 1146, Severity::Error, "table does not exist");
        assert_eq!(store.message_count(), 2);
        assert_eq!(store.message(1).unwrap().code, 1146);
    }

    #[test]
    fn has_failure_reflects_non_info_severity() {
        let store = MessageStore::new();
        assert!(!store.has_failure());
        store.add_message(100, 0, Severity::Info, "ok");
        assert!(!store.has_failure());
        store.add_error_message(1105, "merge failure");
        assert!(store.has_failure());
        assert_eq!(store.message(1).unwrap().chunk_id, -1);
    }
}
