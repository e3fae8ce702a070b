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

mod context;
mod exit_codes;
mod format;

pub use context::ErrorContext;
pub use exit_codes::get_exit_code;
pub use format::{format_error_chain, format_error_with_color};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DistError {
    #[error("Bundle \"{0}\" was not found on the server")]
    BundleNotFound(String),

    #[error("No bundle is set as {0}")]
    NoBundle(String),

    #[error("Unknown source type \"{0}\"")]
    UnknownSourceType(String),

    #[error("Unknown downloader {0}")]
    UnknownDownloader(String),

    #[error("File hash does not match: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Too many redirects while resolving {url}")]
    TooManyRedirects { url: String },

    #[error("Source path is not accessible: {0}")]
    SourceNotAccessible(String),

    #[error("Failed to download source: {0}")]
    Download(String),

    #[error("Failed to extract archive: {0}")]
    Extract(String),

    #[error("{0}")]
    InstallerDistribution(String),

    #[error("Distribution already started")]
    DistributionAlreadyStarted,

    #[error("Failed to distribute {}", quoted_list(.items))]
    DistributionFailed { items: Vec<String> },

    #[error("Failed to fetch catalog data: {0}")]
    CatalogFetch(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Security error: {0}")]
    SecurityError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] attohttpc::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Directory walk error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

fn quoted_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("\"{item}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, DistError>;
