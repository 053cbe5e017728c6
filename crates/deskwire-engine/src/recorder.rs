// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-progress audio recording draft.
//!
//! The only user-cancellable asynchronous flow: audio accumulates locally
//! and nothing touches the store or the network until `finish` hands the
//! captured bytes to a media enqueue. `discard` drops the draft without a
//! trace.

use chrono::{DateTime, Utc};

/// Accumulates audio chunks until the operator sends or discards.
#[derive(Debug, Default)]
pub struct AudioRecording {
    chunks: Vec<u8>,
    started_at: Option<DateTime<Utc>>,
}

impl AudioRecording {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends captured audio. The first chunk stamps the start time used in
    /// the generated filename.
    pub fn push_chunk(&mut self, chunk: &[u8]) {
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        self.chunks.extend_from_slice(chunk);
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Discards the draft before sending. Nothing was enqueued, so there is
    /// nothing to clean up.
    pub fn discard(self) {}

    /// Finishes the recording, yielding the bytes and a generated filename
    /// for `enqueue_media`.
    pub fn finish(self) -> (Vec<u8>, String) {
        let stamp = self
            .started_at
            .unwrap_or_else(Utc::now)
            .format("%Y%m%d-%H%M%S");
        (self.chunks, format!("recording-{stamp}.ogg"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_chunks_in_order() {
        let mut recording = AudioRecording::new();
        recording.push_chunk(&[1, 2]);
        recording.push_chunk(&[3]);
        assert_eq!(recording.len(), 3);
        let (data, filename) = recording.finish();
        assert_eq!(data, vec![1, 2, 3]);
        assert!(filename.starts_with("recording-"));
        assert!(filename.ends_with(".ogg"));
    }

    #[test]
    fn discard_consumes_the_draft() {
        let mut recording = AudioRecording::new();
        recording.push_chunk(&[1]);
        recording.discard();
    }

    #[test]
    fn empty_recording_still_gets_a_filename() {
        let recording = AudioRecording::new();
        assert!(recording.is_empty());
        let (data, filename) = recording.finish();
        assert!(data.is_empty());
        assert!(filename.ends_with(".ogg"));
    }
}
