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

use crate::download::client::{AttohttpcClient, HttpClient, HttpResponse};
use crate::error::{DistError, Result};
use log::debug;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;

const DOWNLOAD_CHUNK_SIZE: usize = 8192;

pub trait ProgressReporter: Send {
    fn on_start(&mut self, total_bytes: u64);

    fn on_progress(&mut self, bytes_downloaded: u64);

    fn on_complete(&mut self);
}

/// Streams HTTP response bodies into files.
pub struct HttpFileDownloader {
    pub(crate) http_client: Box<dyn HttpClient>,
}

impl Default for HttpFileDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFileDownloader {
    pub fn new() -> Self {
        Self::with_client(Box::new(AttohttpcClient::new()))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_client(Box::new(AttohttpcClient::with_timeout(timeout)))
    }

    pub fn with_client(http_client: Box<dyn HttpClient>) -> Self {
        Self { http_client }
    }

    pub fn client(&self) -> &dyn HttpClient {
        self.http_client.as_ref()
    }

    /// Download `url` into `destination`, following redirects.
    pub fn download(
        &self,
        url: &str,
        headers: &[(String, String)],
        destination: &Path,
        reporter: Option<&mut dyn ProgressReporter>,
    ) -> Result<PathBuf> {
        let response = self.http_client.get(url, headers, true)?;
        self.write_response(response, destination, reporter)
    }

    /// Write an already received response into `destination`.
    ///
    /// The body is streamed into a temporary file next to the destination
    /// and renamed into place once complete.
    pub fn write_response(
        &self,
        response: Box<dyn HttpResponse>,
        destination: &Path,
        mut reporter: Option<&mut dyn ProgressReporter>,
    ) -> Result<PathBuf> {
        validate_response(response.as_ref())?;

        let parent = destination.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;

        let total_size = response
            .header("Content-Length")
            .and_then(|length| length.parse::<u64>().ok())
            .unwrap_or(0);

        if let Some(reporter) = reporter.as_mut() {
            reporter.on_start(total_size);
        }

        let temp_file = NamedTempFile::new_in(parent)?;
        let downloaded = copy_body(response, temp_file.as_file(), &mut reporter)?;

        if destination.exists() {
            fs::remove_file(destination)?;
        }
        temp_file
            .persist(destination)
            .map_err(|e| DistError::Io(e.error))?;

        if let Some(reporter) = reporter {
            reporter.on_complete();
        }

        debug!("Downloaded {downloaded} bytes to {}", destination.display());
        Ok(destination.to_path_buf())
    }
}

fn validate_response(response: &dyn HttpResponse) -> Result<()> {
    let status = response.status();

    if !(200..300).contains(&status) {
        return Err(DistError::NetworkError(format!(
            "Download failed with status: {status}"
        )));
    }

    Ok(())
}

fn copy_body(
    mut response: Box<dyn HttpResponse>,
    file: &File,
    reporter: &mut Option<&mut dyn ProgressReporter>,
) -> Result<u64> {
    let mut writer = BufWriter::new(file);
    let mut downloaded = 0u64;
    let mut buffer = vec![0; DOWNLOAD_CHUNK_SIZE];

    loop {
        match response.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                writer.write_all(&buffer[..n])?;
                downloaded += n as u64;

                if let Some(reporter) = reporter.as_mut() {
                    reporter.on_progress(downloaded);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    writer.flush()?;
    Ok(downloaded)
}

#[cfg(test)]
#[path = "http_file_downloader_tests.rs"]
mod http_file_downloader_tests;
