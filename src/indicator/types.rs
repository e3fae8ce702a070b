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

/// Configuration for a single progress operation.
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Verb shown in front of the context, e.g. "Downloading"
    pub operation: String,
    /// What is being worked on, e.g. "core 1.0.0"
    pub context: String,
    /// Total units; `None` renders a spinner
    pub total: Option<u64>,
    pub style: ProgressStyle,
}

impl ProgressConfig {
    pub fn new(
        operation: impl Into<String>,
        context: impl Into<String>,
        style: ProgressStyle,
    ) -> Self {
        Self {
            operation: operation.into(),
            context: context.into(),
            total: None,
            style,
        }
    }

    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }
}

/// Progress display style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressStyle {
    /// Byte counts, used for transfers
    Bytes,
    /// Plain counts, used for batches of items
    #[default]
    Count,
}

impl std::fmt::Display for ProgressStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes => write!(f, "bytes"),
            Self::Count => write!(f, "count"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_config_construction() {
        let config = ProgressConfig::new("Downloading", "core 1.0.0", ProgressStyle::Bytes);
        assert_eq!(config.operation, "Downloading");
        assert_eq!(config.context, "core 1.0.0");
        assert_eq!(config.style, ProgressStyle::Bytes);
        assert_eq!(config.total, None);
    }

    #[test]
    fn test_progress_config_with_total() {
        let config = ProgressConfig::new("Distributing", "bundle", ProgressStyle::Count)
            .with_total(3);
        assert_eq!(config.total, Some(3));
    }

    #[test]
    fn test_progress_style_default_and_display() {
        assert_eq!(ProgressStyle::default(), ProgressStyle::Count);
        assert_eq!(ProgressStyle::Bytes.to_string(), "bytes");
        assert_eq!(ProgressStyle::Count.to_string(), "count");
    }
}
