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

use crate::error::{DistError, Result};
use crate::platform::Platform;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Per-platform filesystem locations of a source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiPlatformPath {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windows: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linux: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub darwin: Option<String>,
}

impl MultiPlatformPath {
    pub fn for_platform(&self, platform: Platform) -> Option<&str> {
        let value = match platform {
            Platform::Windows => self.windows.as_deref(),
            Platform::Linux => self.linux.as_deref(),
            Platform::Darwin => self.darwin.as_deref(),
        };
        value.filter(|path| !path.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Filesystem,
    Http,
    Server,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Filesystem => "filesystem",
            SourceType::Http => "http",
            SourceType::Server => "server",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = DistError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "filesystem" => Ok(SourceType::Filesystem),
            "http" => Ok(SourceType::Http),
            "server" => Ok(SourceType::Server),
            other => Err(DistError::UnknownSourceType(other.to_string())),
        }
    }
}

/// One concrete way to obtain the bytes of an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceInfo {
    Filesystem {
        #[serde(default)]
        path: MultiPlatformPath,
    },
    Http {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        headers: Option<BTreeMap<String, String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
    },
    Server {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },
}

impl SourceInfo {
    pub fn source_type(&self) -> SourceType {
        match self {
            SourceInfo::Filesystem { .. } => SourceType::Filesystem,
            SourceInfo::Http { .. } => SourceType::Http,
            SourceInfo::Server { .. } => SourceType::Server,
        }
    }

    /// JSON form stored in the distribution metadata files.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Short human description used in logs and the status table.
    pub fn describe(&self) -> String {
        match self {
            SourceInfo::Filesystem { path } => match path.for_platform(Platform::current()) {
                Some(path) => format!("filesystem:{path}"),
                None => "filesystem:<no path for this platform>".to_string(),
            },
            SourceInfo::Http { url, .. } => url.clone(),
            SourceInfo::Server { filename, path } => format!(
                "server:{}",
                path.as_deref().or(filename.as_deref()).unwrap_or("<unnamed>")
            ),
        }
    }
}

/// Split raw catalog sources into the ones a downloader understands and the
/// rest.
///
/// Unknown or malformed entries are logged and returned untouched so callers
/// can report them.
pub fn parse_sources(raw_sources: &[Value], title: &str) -> (Vec<SourceInfo>, Vec<Value>) {
    let mut sources = Vec::new();
    let mut unknown_sources = Vec::new();

    for raw in raw_sources {
        let source_type = raw.get("type").and_then(Value::as_str);
        match source_type.map(SourceType::from_str) {
            Some(Ok(_)) => match serde_json::from_value::<SourceInfo>(raw.clone()) {
                Ok(source) => sources.push(source),
                Err(e) => {
                    warn!("Failed to convert source {raw} in {title}: {e}");
                    unknown_sources.push(raw.clone());
                }
            },
            _ => {
                warn!(
                    "Unknown source '{}' in {title}",
                    source_type.unwrap_or("<missing type>")
                );
                unknown_sources.push(raw.clone());
            }
        }
    }

    (sources, unknown_sources)
}

/// Server sources without a filename download the artifact's own file.
pub(crate) fn fill_server_filenames(raw_sources: &mut [Value], filename: &str) {
    for raw in raw_sources.iter_mut() {
        let is_server = raw.get("type").and_then(Value::as_str) == Some("server");
        let has_filename = raw
            .get("filename")
            .and_then(Value::as_str)
            .is_some_and(|name| !name.is_empty());
        if is_server && !has_filename {
            if let Some(object) = raw.as_object_mut() {
                object.insert("filename".to_string(), Value::String(filename.to_string()));
            }
        }
    }
}
