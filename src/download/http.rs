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

use super::{
    DownloadContext, HttpFileDownloader, HttpResponse, ProgressReporter, SourceDownloader,
    TransferProgress, remove_downloaded_file,
};
use crate::error::{DistError, Result};
use crate::models::SourceInfo;
use log::{debug, warn};
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Redirect responses followed before a download is refused.
pub const MAX_REDIRECTS: usize = 3;

/// Direct download endpoint for Google Drive shared files.
pub const GOOGLE_DRIVE_ENDPOINT: &str = "https://docs.google.com/uc?export=download";

const GOOGLE_DRIVE_QUOTA_MARKER: &str = "Google Drive - Quota exceeded";

/// Downloads sources declared by URL.
pub struct HttpDownloader {
    files: HttpFileDownloader,
    google_drive_endpoint: String,
    max_redirects: usize,
}

impl HttpDownloader {
    pub fn new(timeout: Duration) -> Self {
        Self::with_file_downloader(HttpFileDownloader::with_timeout(timeout))
    }

    pub fn with_file_downloader(files: HttpFileDownloader) -> Self {
        Self {
            files,
            google_drive_endpoint: GOOGLE_DRIVE_ENDPOINT.to_string(),
            max_redirects: MAX_REDIRECTS,
        }
    }

    pub fn with_google_drive_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.google_drive_endpoint = endpoint.into();
        self
    }

    /// Follow redirects by hand so the hop count stays bounded.
    ///
    /// Returns the final URL together with its response.
    fn resolve_redirects(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<(String, Box<dyn HttpResponse>)> {
        let mut current = url.to_string();
        let mut hops = 0;

        loop {
            let response = self.files.client().get(&current, headers, false)?;
            let status = response.status();

            if (300..400).contains(&status)
                && let Some(location) = response.header("Location")
            {
                if hops == self.max_redirects {
                    return Err(DistError::TooManyRedirects {
                        url: url.to_string(),
                    });
                }
                let next = join_location(&current, location)?;
                debug!("Redirect {status}: {current} -> {next}");
                current = next;
                hops += 1;
                continue;
            }

            return Ok((current, response));
        }
    }

    pub(crate) fn download_from_google_drive(
        &self,
        file_id: &str,
        destination: &Path,
        progress: &mut dyn ProgressReporter,
    ) -> Result<PathBuf> {
        let url = format!("{}&id={file_id}", self.google_drive_endpoint);
        let mut response = self.files.client().get(&url, &[], true)?;

        let mut body = None;
        let cookies = response.header_values("set-cookie");
        let mut token = confirm_token_from_cookies(&cookies);
        if token.is_none() && is_html(response.as_ref()) {
            let mut text = String::new();
            response.read_to_string(&mut text)?;
            token = confirm_token_from_body(&text);
            body = Some(text);
        }

        if let Some(token) = token {
            debug!("Google Drive asked for confirmation of {file_id}");
            let confirmed_url = format!("{url}&confirm={token}");
            let headers: Vec<(String, String)> = cookie_header(&cookies)
                .map(|cookie| ("Cookie".to_string(), cookie))
                .into_iter()
                .collect();
            response = self.files.client().get(&confirmed_url, &headers, true)?;
            if is_html(response.as_ref()) {
                let mut text = String::new();
                response.read_to_string(&mut text)?;
                body = Some(text);
            } else {
                body = None;
            }
        }

        match body {
            Some(text) => {
                if text.contains(GOOGLE_DRIVE_QUOTA_MARKER) {
                    let filename = destination
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| file_id.to_string());
                    return Err(DistError::Download(format!(
                        "The daily quota of the file {filename} is exceeded and it can't be \
                         downloaded. This is a limitation of Google Drive and can only be \
                         overcome by trying again later."
                    )));
                }
                warn!("Google Drive returned a page instead of file {file_id}");
                let buffered = BufferedResponse::new(response.status(), text.into_bytes());
                self.files
                    .write_response(Box::new(buffered), destination, Some(progress))
            }
            None => self
                .files
                .write_response(response, destination, Some(progress)),
        }
    }
}

impl SourceDownloader for HttpDownloader {
    fn download(
        &self,
        source: &SourceInfo,
        dest_dir: &Path,
        _context: &DownloadContext,
        progress: &mut TransferProgress,
    ) -> Result<PathBuf> {
        let SourceInfo::Http {
            url,
            headers,
            filename,
        } = source
        else {
            return Err(DistError::UnknownDownloader(format!(
                "http downloader cannot handle {} sources",
                source.source_type()
            )));
        };

        let filename = http_filename(url, filename.as_deref());
        let headers: Vec<(String, String)> = headers
            .iter()
            .flatten()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        fs::create_dir_all(dest_dir)?;
        let destination = dest_dir.join(&filename);
        debug!("Downloading {url} to {}", dest_dir.display());

        let (final_url, response) = self.resolve_redirects(url, &headers)?;
        if let Some(file_id) = google_drive_file_id(&final_url) {
            drop(response);
            return self.download_from_google_drive(&file_id, &destination, progress);
        }

        self.files
            .write_response(response, &destination, Some(progress))
    }

    fn cleanup(
        &self,
        source: &SourceInfo,
        dest_dir: &Path,
        _context: &DownloadContext,
    ) -> Result<()> {
        if let SourceInfo::Http { url, filename, .. } = source {
            remove_downloaded_file(dest_dir, &http_filename(url, filename.as_deref()))?;
        }
        Ok(())
    }
}

/// File name of an HTTP source: the declared one, else the last URL segment.
pub fn http_filename(url: &str, filename: Option<&str>) -> String {
    if let Some(filename) = filename.filter(|name| !name.is_empty()) {
        return filename.to_string();
    }

    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|segment| !segment.is_empty())
        .unwrap_or_else(|| {
            url.trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or(url)
                .to_string()
        })
}

fn join_location(current: &str, location: &str) -> Result<String> {
    let base = Url::parse(current)
        .map_err(|e| DistError::Download(format!("Invalid URL {current}: {e}")))?;
    let next = base
        .join(location)
        .map_err(|e| DistError::Download(format!("Invalid redirect location {location}: {e}")))?;
    Ok(next.to_string())
}

/// File id of a Google Drive share link such as
/// `https://drive.google.com/file/d/<id>/view`.
pub fn google_drive_file_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    if !(host.starts_with("drive.google.com") || host.starts_with("docs.google.com")) {
        return None;
    }

    let id = parsed.path().strip_prefix("/file/d/")?.split('/').next()?;
    Some(id.to_string())
}

fn confirm_token_from_cookies(cookies: &[String]) -> Option<String> {
    cookies.iter().find_map(|cookie| {
        let pair = cookie.split(';').next()?;
        let (name, value) = pair.split_once('=')?;
        name.trim()
            .starts_with("download_warning")
            .then(|| value.trim().to_string())
    })
}

/// `Cookie` request header echoing the `name=value` pairs of `Set-Cookie`
/// response headers.
fn cookie_header(set_cookies: &[String]) -> Option<String> {
    let pairs: Vec<&str> = set_cookies
        .iter()
        .filter_map(|cookie| cookie.split(';').next())
        .map(str::trim)
        .filter(|pair| pair.contains('='))
        .collect();
    (!pairs.is_empty()).then(|| pairs.join("; "))
}

fn confirm_token_from_body(body: &str) -> Option<String> {
    let start = body.find("confirm=")? + "confirm=".len();
    let token: String = body[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    (!token.is_empty()).then_some(token)
}

fn is_html(response: &dyn HttpResponse) -> bool {
    response
        .header("Content-Type")
        .is_some_and(|content_type| content_type.contains("text/html"))
}

/// Response whose body was already read.
struct BufferedResponse {
    status: u16,
    length: String,
    body: Cursor<Vec<u8>>,
}

impl BufferedResponse {
    fn new(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            length: body.len().to_string(),
            body: Cursor::new(body),
        }
    }
}

impl Read for BufferedResponse {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.body.read(buf)
    }
}

impl HttpResponse for BufferedResponse {
    fn status(&self) -> u16 {
        self.status
    }

    fn header(&self, name: &str) -> Option<&str> {
        name.eq_ignore_ascii_case("Content-Length")
            .then_some(self.length.as_str())
    }

    fn header_values(&self, name: &str) -> Vec<String> {
        self.header(name).map(str::to_string).into_iter().collect()
    }

    fn final_url(&self) -> Option<&str> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::DEFAULT_TIMEOUT;
    use mockito::{Matcher, Server};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn context() -> DownloadContext {
        DownloadContext::Addon {
            name: "core".to_string(),
            version: "1.0.0".to_string(),
        }
    }

    fn http_source(url: String, filename: Option<&str>) -> SourceInfo {
        SourceInfo::Http {
            url,
            headers: None,
            filename: filename.map(str::to_string),
        }
    }

    #[test]
    fn test_http_filename() {
        assert_eq!(http_filename("https://example.com/a/core.zip", None), "core.zip");
        assert_eq!(
            http_filename("https://example.com/a/core.zip?token=1", None),
            "core.zip"
        );
        assert_eq!(
            http_filename("https://example.com/a/core.zip", Some("other.zip")),
            "other.zip"
        );
        assert_eq!(http_filename("https://example.com/a/core.zip", Some("")), "core.zip");
    }

    #[test]
    fn test_google_drive_file_id() {
        assert_eq!(
            google_drive_file_id("https://drive.google.com/file/d/1AbC_d-9/view?usp=sharing"),
            Some("1AbC_d-9".to_string())
        );
        assert_eq!(
            google_drive_file_id("https://docs.google.com/file/d/XYZ"),
            Some("XYZ".to_string())
        );
        assert_eq!(google_drive_file_id("https://drive.google.com/drive/folders/1"), None);
        assert_eq!(google_drive_file_id("https://example.com/file/d/1"), None);
    }

    #[test]
    fn test_confirm_tokens() {
        let cookies = vec![
            "NID=abc; Path=/".to_string(),
            "download_warning_12345=T0k3n; Path=/; Secure".to_string(),
        ];
        assert_eq!(confirm_token_from_cookies(&cookies), Some("T0k3n".to_string()));
        assert_eq!(confirm_token_from_cookies(&cookies[..1]), None);

        let body = r#"<a href="/uc?export=download&amp;confirm=t9_X-&amp;id=1">Download</a>"#;
        assert_eq!(confirm_token_from_body(body), Some("t9_X-".to_string()));
        assert_eq!(confirm_token_from_body("<html>nothing</html>"), None);
    }

    #[test]
    fn test_cookie_header() {
        let cookies = vec![
            "download_warning_1=TOKEN; Path=/".to_string(),
            "NID=abc; HttpOnly".to_string(),
            "broken".to_string(),
        ];
        assert_eq!(
            cookie_header(&cookies),
            Some("download_warning_1=TOKEN; NID=abc".to_string())
        );
        assert_eq!(cookie_header(&[]), None);
    }

    #[test]
    fn test_download_with_headers() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/addons/core.zip")
            .match_header("authorization", "Token abc")
            .with_status(200)
            .with_body("zip bytes")
            .create();

        let temp = TempDir::new().unwrap();
        let source = SourceInfo::Http {
            url: format!("{}/addons/core.zip", server.url()),
            headers: Some(BTreeMap::from([(
                "Authorization".to_string(),
                "Token abc".to_string(),
            )])),
            filename: None,
        };

        let mut progress = TransferProgress::new();
        let downloader = HttpDownloader::new(DEFAULT_TIMEOUT);
        let path = downloader
            .download(&source, temp.path(), &context(), &mut progress)
            .unwrap();

        assert_eq!(path, temp.path().join("core.zip"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "zip bytes");
        assert!(progress.transfer_finished());
        mock.assert();

        downloader.cleanup(&source, temp.path(), &context()).unwrap();
        assert!(!path.exists());
        downloader.cleanup(&source, temp.path(), &context()).unwrap();
    }

    #[test]
    fn test_download_follows_redirects() {
        let mut server = Server::new();
        let first = server
            .mock("GET", "/start")
            .with_status(302)
            .with_header("location", "/middle")
            .create();
        let second = server
            .mock("GET", "/middle")
            .with_status(301)
            .with_header("location", &format!("{}/final.zip", server.url()))
            .create();
        let last = server
            .mock("GET", "/final.zip")
            .with_status(200)
            .with_body("content")
            .create();

        let temp = TempDir::new().unwrap();
        let source = http_source(format!("{}/start", server.url()), Some("core.zip"));
        let mut progress = TransferProgress::new();
        let path = HttpDownloader::new(DEFAULT_TIMEOUT)
            .download(&source, temp.path(), &context(), &mut progress)
            .unwrap();

        assert_eq!(fs::read_to_string(path).unwrap(), "content");
        first.assert();
        second.assert();
        last.assert();
    }

    #[test]
    fn test_download_too_many_redirects() {
        let mut server = Server::new();
        let mut mocks = Vec::new();
        for hop in 0..=MAX_REDIRECTS {
            mocks.push(
                server
                    .mock("GET", format!("/hop{hop}").as_str())
                    .with_status(302)
                    .with_header("location", &format!("/hop{}", hop + 1))
                    .create(),
            );
        }

        let temp = TempDir::new().unwrap();
        let source = http_source(format!("{}/hop0", server.url()), None);
        let mut progress = TransferProgress::new();
        let err = HttpDownloader::new(DEFAULT_TIMEOUT)
            .download(&source, temp.path(), &context(), &mut progress)
            .unwrap_err();

        assert!(matches!(err, DistError::TooManyRedirects { .. }));
        assert!(!temp.path().join("hop0").exists());
    }

    #[test]
    fn test_google_drive_confirm_cookie() {
        let mut server = Server::new();
        let first = server
            .mock("GET", Matcher::Regex("^/uc".to_string()))
            .match_query(Matcher::Regex("^export=download&id=FILE1$".to_string()))
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_header("set-cookie", "download_warning_1=TOKEN; Path=/")
            .with_header("set-cookie", "NID=abc; Path=/; HttpOnly")
            .with_body("<html>virus scan warning</html>")
            .create();
        let confirmed = server
            .mock("GET", Matcher::Regex("^/uc".to_string()))
            .match_query(Matcher::UrlEncoded("confirm".into(), "TOKEN".into()))
            .match_header("cookie", "download_warning_1=TOKEN; NID=abc")
            .with_status(200)
            .with_header("content-type", "application/zip")
            .with_body("drive file")
            .create();

        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("core.zip");
        let downloader = HttpDownloader::new(DEFAULT_TIMEOUT)
            .with_google_drive_endpoint(format!("{}/uc?export=download", server.url()));
        let mut progress = TransferProgress::new();
        downloader
            .download_from_google_drive("FILE1", &destination, &mut progress)
            .unwrap();

        assert_eq!(fs::read_to_string(&destination).unwrap(), "drive file");
        first.assert();
        confirmed.assert();
    }

    #[test]
    fn test_google_drive_quota_exceeded() {
        let mut server = Server::new();
        let _page = server
            .mock("GET", Matcher::Regex("^/uc".to_string()))
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<title>Google Drive - Quota exceeded</title>")
            .create();

        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("core.zip");
        let downloader = HttpDownloader::new(DEFAULT_TIMEOUT)
            .with_google_drive_endpoint(format!("{}/uc?export=download", server.url()));
        let mut progress = TransferProgress::new();
        let err = downloader
            .download_from_google_drive("FILE2", &destination, &mut progress)
            .unwrap_err();

        assert!(err.to_string().contains("daily quota of the file core.zip"));
        assert!(!destination.exists());
    }
}
