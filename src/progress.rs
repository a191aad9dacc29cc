/*!
 * Event vocabulary for the subtitle processing stream.
 *
 * Every payload sent over the `/process-subtitles` SSE connection is one of
 * the [`StreamEvent`] variants, serialized with a lowercase `type` tag. The
 * [`ProgressSink`] half hands events to the HTTP layer and doubles as the
 * disconnect signal: once the client goes away, sends start failing and the
 * pipeline stops scheduling work.
 */

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::errors::PipelineError;

/// A single server-sent event in the processing stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Batch progress update, emitted before each translation call
    Progress {
        /// Human readable description of the batch being worked on
        message: String,
        /// Number of lines scheduled so far
        progress: usize,
        /// Total number of translatable lines
        total: usize,
    },
    /// Terminal failure event
    Error {
        /// User facing description of what went wrong
        error: String,
    },
    /// Terminal success event carrying the finished document
    Complete {
        /// Full SRT output
        srt: String,
    },
}

/// Sending half of a processing stream
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: mpsc::UnboundedSender<StreamEvent>,
}

impl ProgressSink {
    /// Wrap an existing channel sender
    pub fn new(tx: mpsc::UnboundedSender<StreamEvent>) -> Self {
        ProgressSink { tx }
    }

    /// Create a sink together with the receiver the HTTP layer drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StreamEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Send one event. Fails with [`PipelineError::Disconnected`] once the
    /// receiving side has been dropped.
    pub fn send(&self, event: StreamEvent) -> Result<(), PipelineError> {
        self.tx.send(event).map_err(|_| PipelineError::Disconnected)
    }

    /// Emit a progress update
    pub fn progress(
        &self,
        message: impl Into<String>,
        progress: usize,
        total: usize,
    ) -> Result<(), PipelineError> {
        self.send(StreamEvent::Progress {
            message: message.into(),
            progress,
            total,
        })
    }

    /// Emit the terminal error event
    pub fn error(&self, error: impl Into<String>) -> Result<(), PipelineError> {
        self.send(StreamEvent::Error {
            error: error.into(),
        })
    }

    /// Emit the terminal completion event
    pub fn complete(&self, srt: impl Into<String>) -> Result<(), PipelineError> {
        self.send(StreamEvent::Complete { srt: srt.into() })
    }
}
