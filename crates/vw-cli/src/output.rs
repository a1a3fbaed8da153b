//! JSON lines output for delivered updates.

use std::io::{self, Write};

use serde::Serialize;
use vw_core::{ObjectReference, ObjectUpdate, ObjectUpdateKind, PropertyChange};
use vw_watcher::UpdateSink;

/// One output line.
#[derive(Debug, Serialize)]
struct UpdateLine<'a> {
    kind: ObjectUpdateKind,
    obj: &'a ObjectReference,
    #[serde(skip_serializing_if = "no_changes")]
    changes: &'a [PropertyChange],
}

#[allow(clippy::trivially_copy_pass_by_ref)] // Signature required by serde
fn no_changes(changes: &&[PropertyChange]) -> bool {
    changes.is_empty()
}

/// Writes every object update as one JSON document per line.
///
/// Write failures are remembered, not raised: the first one is returned by
/// [`finish`](Self::finish) and later updates are dropped.
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    out: W,
    written: u64,
    error: Option<io::Error>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub const fn new(out: W) -> Self {
        Self {
            out,
            written: 0,
            error: None,
        }
    }

    /// Number of lines written.
    pub const fn written(&self) -> u64 {
        self.written
    }

    /// Flushes the writer and reports the first write failure, if any.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        self.out.flush()?;
        Ok(self.out)
    }

    fn write_batch(&mut self, updates: &[ObjectUpdate]) -> io::Result<()> {
        for update in updates {
            let line = UpdateLine {
                kind: update.kind,
                obj: &update.obj,
                changes: &update.change_set,
            };
            serde_json::to_writer(&mut self.out, &line)?;
            self.out.write_all(b"\n")?;
            self.written += 1;
        }
        self.out.flush()
    }
}

impl<W: Write + Send> UpdateSink for JsonLinesSink<W> {
    fn updated(&mut self, updates: &[ObjectUpdate]) {
        if self.error.is_some() {
            return;
        }
        if let Err(error) = self.write_batch(updates) {
            tracing::warn!(%error, "Failed to write updates, dropping further output");
            self.error = Some(error);
        }
    }
}
