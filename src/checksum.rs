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

//! Streaming file digests used to gate installation of downloaded sources.

use crate::error::{DistError, Result};
use digest::{Digest, DynDigest};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

pub const CHECKSUM_CHUNK_SIZE: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl ChecksumAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Md5 => "md5",
            ChecksumAlgorithm::Sha1 => "sha1",
            ChecksumAlgorithm::Sha256 => "sha256",
            ChecksumAlgorithm::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = DistError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "").as_str() {
            "md5" => Ok(ChecksumAlgorithm::Md5),
            "sha1" => Ok(ChecksumAlgorithm::Sha1),
            "sha256" => Ok(ChecksumAlgorithm::Sha256),
            "sha512" => Ok(ChecksumAlgorithm::Sha512),
            other => Err(DistError::ValidationError(format!(
                "Unsupported checksum algorithm: {other}"
            ))),
        }
    }
}

enum Hasher {
    Md5(md5::Context),
    Digest(Box<dyn DynDigest>),
}

impl Hasher {
    fn new(algorithm: ChecksumAlgorithm) -> Self {
        match algorithm {
            // md5 crate doesn't implement DynDigest
            ChecksumAlgorithm::Md5 => Hasher::Md5(md5::Context::new()),
            ChecksumAlgorithm::Sha1 => Hasher::Digest(Box::new(Sha1::new())),
            ChecksumAlgorithm::Sha256 => Hasher::Digest(Box::new(Sha256::new())),
            ChecksumAlgorithm::Sha512 => Hasher::Digest(Box::new(Sha512::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Md5(context) => context.consume(data),
            Hasher::Digest(hasher) => DynDigest::update(&mut **hasher, data),
        }
    }

    fn finalize(self) -> String {
        match self {
            Hasher::Md5(context) => hex::encode(context.compute().0),
            Hasher::Digest(hasher) => hex::encode(hasher.finalize()),
        }
    }
}

/// Calculate the hex digest of a file, reading it in fixed-size chunks.
pub fn calculate_checksum(file_path: &Path, algorithm: ChecksumAlgorithm) -> Result<String> {
    let mut file = File::open(file_path)?;
    let mut buffer = vec![0u8; CHECKSUM_CHUNK_SIZE];
    let mut hasher = Hasher::new(algorithm);

    loop {
        match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buffer[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(hasher.finalize())
}

/// Verify a file against an expected hex digest.
///
/// Comparison ignores case. An empty expected value never matches.
pub fn verify_checksum(
    file_path: &Path,
    expected_checksum: &str,
    algorithm: ChecksumAlgorithm,
) -> Result<()> {
    let actual = calculate_checksum(file_path, algorithm)?;

    if expected_checksum.trim().is_empty() || !actual.eq_ignore_ascii_case(expected_checksum.trim())
    {
        return Err(DistError::ChecksumMismatch {
            expected: expected_checksum.to_string(),
            actual,
        });
    }

    log::debug!("Checksum verified successfully for {file_path:?} using {algorithm}");
    Ok(())
}
