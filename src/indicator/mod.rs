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

//! Progress reporting for distribution runs.
//!
//! Implementations:
//! - `IndicatifProgress` - animated bars for interactive terminals
//! - `SimpleProgress` - one line per finished operation for CI logs and pipes
//! - `SilentProgress` - no output, used with `--no-progress`

mod factory;
mod indicatif;
mod silent;
mod simple;
mod types;

pub use factory::ProgressFactory;
pub use indicatif::IndicatifProgress;
pub use silent::SilentProgress;
pub use simple::SimpleProgress;
pub use types::{ProgressConfig, ProgressStyle};

/// Common interface for progress renderers.
pub trait ProgressIndicator: Send + Sync {
    /// Start a new operation. A bar is shown when `config.total` is set,
    /// a spinner otherwise.
    fn start(&mut self, config: ProgressConfig);

    /// Move to `current`, optionally replacing the total.
    fn update(&mut self, current: u64, total: Option<u64>);

    /// Replace the status message shown next to the indicator.
    fn set_message(&mut self, message: String);

    /// Finish successfully. `None` renders as "Complete".
    fn complete(&mut self, message: Option<String>);

    /// Finish with a failure message.
    fn error(&mut self, message: String);

    /// Create an indicator that renders alongside this one.
    fn create_child(&mut self) -> Box<dyn ProgressIndicator>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingProgress {
        started: bool,
        current: u64,
        total: Option<u64>,
        message: String,
        completed: bool,
        errored: bool,
    }

    impl RecordingProgress {
        fn new() -> Self {
            Self {
                started: false,
                current: 0,
                total: None,
                message: String::new(),
                completed: false,
                errored: false,
            }
        }
    }

    impl ProgressIndicator for RecordingProgress {
        fn start(&mut self, config: ProgressConfig) {
            self.started = true;
            self.total = config.total;
            self.message = format!("{} {}", config.operation, config.context);
        }

        fn update(&mut self, current: u64, total: Option<u64>) {
            self.current = current;
            if total.is_some() {
                self.total = total;
            }
        }

        fn set_message(&mut self, message: String) {
            self.message = message;
        }

        fn complete(&mut self, message: Option<String>) {
            self.completed = true;
            if let Some(msg) = message {
                self.message = msg;
            }
        }

        fn error(&mut self, message: String) {
            self.errored = true;
            self.message = message;
        }

        fn create_child(&mut self) -> Box<dyn ProgressIndicator> {
            Box::new(RecordingProgress::new())
        }
    }

    #[test]
    fn test_trait_implementation() {
        let mut progress = RecordingProgress::new();

        let config =
            ProgressConfig::new("Downloading", "core 1.0.0", ProgressStyle::Bytes).with_total(100);
        progress.start(config);
        assert!(progress.started);
        assert_eq!(progress.total, Some(100));
        assert_eq!(progress.message, "Downloading core 1.0.0");

        progress.update(50, None);
        assert_eq!(progress.current, 50);
        assert_eq!(progress.total, Some(100));

        progress.update(60, Some(200));
        assert_eq!(progress.total, Some(200));

        progress.set_message("Verifying".to_string());
        assert_eq!(progress.message, "Verifying");

        progress.complete(Some("Done".to_string()));
        assert!(progress.completed);
        assert_eq!(progress.message, "Done");
    }

    #[test]
    fn test_error_handling() {
        let mut progress = RecordingProgress::new();
        progress.start(ProgressConfig::new("Unzipping", "core", ProgressStyle::Count));
        progress.error("Couldn't unzip source file".to_string());
        assert!(progress.errored);
        assert_eq!(progress.message, "Couldn't unzip source file");
    }

    #[test]
    fn test_trait_object() {
        let progress: Box<dyn ProgressIndicator> = Box::new(RecordingProgress::new());
        fn accept_progress(_p: Box<dyn ProgressIndicator>) {}
        accept_progress(progress);
    }
}
