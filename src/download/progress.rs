// Copyright 2025 dentsusoken
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::ProgressReporter;
use crate::indicator::{ProgressConfig, ProgressIndicator, ProgressStyle};
use std::fmt;

/// Lifecycle of one attempt to obtain an artifact from a single source.
///
/// Each source of a distribution item owns one tracker, so failure reasons
/// stay inspectable per source after the item has finished.
#[derive(Default)]
pub struct TransferProgress {
    started: bool,
    transfer_started: bool,
    transfer_finished: bool,
    hash_check_started: bool,
    hash_check_finished: bool,
    unzip_started: bool,
    unzip_finished: bool,
    failed: bool,
    fail_reason: Option<String>,
    content_size: Option<u64>,
    transferred: u64,
    indicator: Option<Box<dyn ProgressIndicator>>,
    label: String,
}

impl TransferProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror byte counts to a terminal indicator.
    pub fn attach_indicator(&mut self, label: &str, indicator: Box<dyn ProgressIndicator>) {
        self.label = label.to_string();
        self.indicator = Some(indicator);
    }

    pub fn set_started(&mut self) {
        self.started = true;
    }

    pub fn set_transfer_started(&mut self) {
        self.transfer_started = true;
    }

    pub fn set_transfer_finished(&mut self) {
        self.transfer_finished = true;
    }

    pub fn set_hash_check_started(&mut self) {
        self.hash_check_started = true;
        self.set_indicator_message("Verifying");
    }

    pub fn set_hash_check_finished(&mut self) {
        self.hash_check_finished = true;
    }

    pub fn set_unzip_started(&mut self) {
        self.unzip_started = true;
        self.set_indicator_message("Unpacking");
    }

    pub fn set_unzip_finished(&mut self) {
        self.unzip_finished = true;
    }

    pub fn set_content_size(&mut self, size: u64) {
        self.content_size = Some(size);
    }

    pub fn set_transferred(&mut self, transferred: u64) {
        self.transferred = transferred;
        if let Some(indicator) = self.indicator.as_mut() {
            indicator.update(transferred, self.content_size);
        }
    }

    pub fn set_failed(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        self.failed = true;
        if let Some(indicator) = self.indicator.as_mut() {
            indicator.error(reason.clone());
        }
        self.fail_reason = Some(reason);
    }

    /// Close the attached indicator after a successful attempt.
    pub fn finish(&mut self, message: &str) {
        if let Some(indicator) = self.indicator.as_mut() {
            indicator.complete(Some(message.to_string()));
        }
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn transfer_started(&self) -> bool {
        self.transfer_started
    }

    pub fn transfer_finished(&self) -> bool {
        self.transfer_finished
    }

    pub fn hash_check_started(&self) -> bool {
        self.hash_check_started
    }

    pub fn hash_check_finished(&self) -> bool {
        self.hash_check_finished
    }

    pub fn unzip_started(&self) -> bool {
        self.unzip_started
    }

    pub fn unzip_finished(&self) -> bool {
        self.unzip_finished
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn fail_reason(&self) -> Option<&str> {
        self.fail_reason.as_deref()
    }

    pub fn content_size(&self) -> Option<u64> {
        self.content_size
    }

    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    /// Transferred percentage, when the size is known.
    pub fn transfer_progress(&self) -> Option<f64> {
        match self.content_size {
            Some(size) if size > 0 => Some(self.transferred as f64 / size as f64 * 100.0),
            _ => None,
        }
    }

    fn set_indicator_message(&mut self, message: &str) {
        if let Some(indicator) = self.indicator.as_mut() {
            indicator.set_message(message.to_string());
        }
    }
}

impl ProgressReporter for TransferProgress {
    fn on_start(&mut self, total_bytes: u64) {
        self.set_transfer_started();
        if total_bytes > 0 {
            self.set_content_size(total_bytes);
        }

        let label = self.label.clone();
        let content_size = self.content_size;
        if let Some(indicator) = self.indicator.as_mut() {
            let config = ProgressConfig::new("Downloading", label, ProgressStyle::Bytes);
            let config = match content_size {
                Some(total) => config.with_total(total),
                None => config,
            };
            indicator.start(config);
        }
    }

    fn on_progress(&mut self, bytes_downloaded: u64) {
        self.set_transferred(bytes_downloaded);
    }

    fn on_complete(&mut self) {
        self.set_transfer_finished();
    }
}

impl fmt::Debug for TransferProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferProgress")
            .field("started", &self.started)
            .field("transfer_finished", &self.transfer_finished)
            .field("hash_check_finished", &self.hash_check_finished)
            .field("unzip_finished", &self.unzip_finished)
            .field("failed", &self.failed)
            .field("fail_reason", &self.fail_reason)
            .field("content_size", &self.content_size)
            .field("transferred", &self.transferred)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::SilentProgress;

    #[test]
    fn test_lifecycle_flags() {
        let mut progress = TransferProgress::new();
        assert!(!progress.started());

        progress.set_started();
        progress.on_start(200);
        progress.on_progress(50);
        assert_eq!(progress.transfer_progress(), Some(25.0));
        progress.on_progress(200);
        progress.on_complete();
        progress.set_hash_check_started();
        progress.set_hash_check_finished();

        assert!(progress.started());
        assert!(progress.transfer_started());
        assert!(progress.transfer_finished());
        assert!(progress.hash_check_finished());
        assert!(!progress.failed());
        assert_eq!(progress.transferred(), 200);
    }

    #[test]
    fn test_unknown_size_has_no_percentage() {
        let mut progress = TransferProgress::new();
        progress.on_start(0);
        progress.on_progress(10);
        assert_eq!(progress.content_size(), None);
        assert_eq!(progress.transfer_progress(), None);
    }

    #[test]
    fn test_failure_keeps_reason() {
        let mut progress = TransferProgress::new();
        progress.attach_indicator("core 1.0.0", Box::new(SilentProgress::new()));
        progress.set_started();
        progress.set_failed("File hash does not match");
        assert!(progress.failed());
        assert_eq!(progress.fail_reason(), Some("File hash does not match"));
        assert!(format!("{progress:?}").contains("File hash does not match"));
    }
}
