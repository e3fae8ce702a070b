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

use crate::error::DistError;
use std::fmt;

pub struct ErrorContext<'a> {
    pub error: &'a DistError,
    pub suggestion: Option<String>,
    pub details: Option<String>,
}

impl<'a> ErrorContext<'a> {
    pub fn new(error: &'a DistError) -> Self {
        let (suggestion, details) = match error {
            DistError::BundleNotFound(name) => {
                let suggestion = Some(
                    "Check the bundle name with your administrator or run 'distkit sync' without \
                     --bundle to use the production bundle."
                        .to_string(),
                );
                let details = Some(format!("Requested bundle: {name}"));
                (suggestion, details)
            }
            DistError::NoBundle(kind) => {
                let suggestion = Some(format!(
                    "Ask your administrator to mark a bundle as {kind} on the server."
                ));
                (suggestion, None)
            }
            DistError::UnknownSourceType(kind) | DistError::UnknownDownloader(kind) => {
                let suggestion = Some(
                    "Supported source types are: filesystem, http, server. Update the addon or \
                     package sources on the server."
                        .to_string(),
                );
                let details = Some(format!("Source type: {kind}"));
                (suggestion, details)
            }
            DistError::ChecksumMismatch { expected, actual } => {
                let suggestion = Some(
                    "The file may be corrupted or tampered with. Try again, or report the \
                     checksum to your administrator."
                        .to_string(),
                );
                let details = Some(format!("Expected {expected}, calculated {actual}"));
                (suggestion, details)
            }
            DistError::TooManyRedirects { url } => {
                let suggestion =
                    Some("The download URL has too many redirects. Try again later.".to_string());
                let details = Some(format!("URL: {url}"));
                (suggestion, details)
            }
            DistError::SourceNotAccessible(path) => {
                let suggestion = Some(format!(
                    "Ensure '{path}' exists and is reachable from this machine (mounted share, \
                     VPN)."
                ));
                (suggestion, None)
            }
            DistError::DistributionFailed { items } => {
                let suggestion = Some(
                    "Run again with -vv to see per-source failures. Items that failed are \
                     retried on the next run."
                        .to_string(),
                );
                let details = Some(format!("{} item(s) failed", items.len()));
                (suggestion, details)
            }
            DistError::DistributionAlreadyStarted => {
                let details =
                    Some("A controller distributes exactly once per run.".to_string());
                (None, details)
            }
            DistError::ConfigError(_) | DistError::Config(_) => {
                let suggestion = Some(
                    "Check config.toml in the distkit home directory and the DISTKIT_* \
                     environment variables."
                        .to_string(),
                );
                (suggestion, None)
            }
            DistError::PermissionDenied(path) => {
                let suggestion = if cfg!(unix) {
                    Some(format!(
                        "Check write permissions of '{path}' or point DISTKIT_HOME elsewhere."
                    ))
                } else {
                    Some("Run as Administrator or check file permissions.".to_string())
                };
                (suggestion, None)
            }
            DistError::NetworkError(msg) | DistError::CatalogFetch(msg) => {
                let suggestion = Some(
                    "Check your internet connection, the server URL and proxy settings."
                        .to_string(),
                );
                let details = Some(format!("Network issue: {msg}"));
                (suggestion, details)
            }
            DistError::Http(http_err) => {
                let error_string = http_err.to_string();
                let suggestion = if error_string.contains("timeout")
                    || error_string.contains("Timeout")
                {
                    Some(
                        "Try increasing the timeout with --timeout option (e.g., --timeout 600)."
                            .to_string(),
                    )
                } else if error_string.contains("401") || error_string.contains("403") {
                    Some("Check the API key configured in server.api_key.".to_string())
                } else {
                    Some("Check your internet connection and try again.".to_string())
                };
                let details = Some(format!("HTTP error: {http_err}"));
                (suggestion, details)
            }
            DistError::Io(io_err) => {
                let suggestion = match io_err.kind() {
                    std::io::ErrorKind::PermissionDenied => {
                        if cfg!(unix) {
                            Some("Check file permissions of the distkit directories.".to_string())
                        } else {
                            Some("Run as Administrator or check file permissions.".to_string())
                        }
                    }
                    std::io::ErrorKind::NotFound => Some(
                        "Ensure the file or directory exists and the path is correct.".to_string(),
                    ),
                    _ => None,
                };
                let details = Some(format!("I/O error: {io_err}"));
                (suggestion, details)
            }
            _ => (None, None),
        };

        ErrorContext {
            error,
            suggestion,
            details,
        }
    }

    pub fn with_suggestion(mut self, suggestion: String) -> Self {
        self.suggestion = Some(suggestion);
        self
    }
}

impl<'a> fmt::Display for ErrorContext<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error: {}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\n\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}
