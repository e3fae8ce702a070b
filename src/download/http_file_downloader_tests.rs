#[cfg(test)]
mod tests {
    use crate::download::{HttpClient, HttpFileDownloader, HttpResponse, ProgressReporter};
    use crate::error::{DistError, Result};
    use std::io::{Cursor, Read};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::tempdir;

    struct MockHttpClient {
        responses: Vec<MockResponse>,
        request_count: Arc<Mutex<usize>>,
    }

    struct MockResponse {
        status: u16,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    }

    impl MockHttpClient {
        fn new(responses: Vec<MockResponse>) -> Self {
            Self {
                responses,
                request_count: Arc::new(Mutex::new(0)),
            }
        }
    }

    impl HttpClient for MockHttpClient {
        fn get(
            &self,
            _url: &str,
            _headers: &[(String, String)],
            _follow_redirects: bool,
        ) -> Result<Box<dyn HttpResponse>> {
            let mut count = self.request_count.lock().unwrap();
            if *count >= self.responses.len() {
                return Err(DistError::NetworkError(
                    "No more mock responses".to_string(),
                ));
            }

            let response = &self.responses[*count];
            *count += 1;

            Ok(Box::new(MockHttpResponse {
                status: response.status,
                headers: response.headers.clone(),
                body: Cursor::new(response.body.clone()),
            }))
        }

        fn set_timeout(&mut self, _timeout: Duration) {}
    }

    struct MockHttpResponse {
        status: u16,
        headers: Vec<(String, String)>,
        body: Cursor<Vec<u8>>,
    }

    impl Read for MockHttpResponse {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.body.read(buf)
        }
    }

    impl HttpResponse for MockHttpResponse {
        fn status(&self) -> u16 {
            self.status
        }

        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }

        fn header_values(&self, name: &str) -> Vec<String> {
            self.headers
                .iter()
                .filter(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.clone())
                .collect()
        }

        fn final_url(&self) -> Option<&str> {
            None
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        total: u64,
        last: u64,
        completed: bool,
    }

    impl ProgressReporter for RecordingReporter {
        fn on_start(&mut self, total_bytes: u64) {
            self.total = total_bytes;
        }

        fn on_progress(&mut self, bytes_downloaded: u64) {
            self.last = bytes_downloaded;
        }

        fn on_complete(&mut self) {
            self.completed = true;
        }
    }

    #[test]
    fn test_download_with_mock_client() {
        let content = b"addon archive bytes";
        let client = MockHttpClient::new(vec![MockResponse {
            status: 200,
            headers: vec![("Content-Length".to_string(), content.len().to_string())],
            body: content.to_vec(),
        }]);

        let downloader = HttpFileDownloader::with_client(Box::new(client));
        let temp_dir = tempdir().unwrap();
        let dest_path = temp_dir.path().join("core.zip");
        let mut reporter = RecordingReporter::default();

        let result = downloader
            .download("http://example.com/core.zip", &[], &dest_path, Some(&mut reporter))
            .unwrap();

        assert_eq!(result, dest_path);
        assert_eq!(std::fs::read(&dest_path).unwrap(), content);
        assert_eq!(reporter.total, content.len() as u64);
        assert_eq!(reporter.last, content.len() as u64);
        assert!(reporter.completed);
    }

    #[test]
    fn test_download_overwrites_existing_file() {
        let client = MockHttpClient::new(vec![MockResponse {
            status: 200,
            headers: vec![],
            body: b"new".to_vec(),
        }]);
        let downloader = HttpFileDownloader::with_client(Box::new(client));
        let temp_dir = tempdir().unwrap();
        let dest_path = temp_dir.path().join("core.zip");
        std::fs::write(&dest_path, b"old content").unwrap();

        downloader
            .download("http://example.com/core.zip", &[], &dest_path, None)
            .unwrap();

        assert_eq!(std::fs::read(&dest_path).unwrap(), b"new");
    }

    #[test]
    fn test_download_error_status() {
        let client = MockHttpClient::new(vec![MockResponse {
            status: 404,
            headers: vec![],
            body: b"Not Found".to_vec(),
        }]);
        let downloader = HttpFileDownloader::with_client(Box::new(client));
        let temp_dir = tempdir().unwrap();
        let dest_path = temp_dir.path().join("missing.zip");

        let result = downloader.download("http://example.com/missing.zip", &[], &dest_path, None);

        match result {
            Err(DistError::NetworkError(msg)) => assert!(msg.contains("404")),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!dest_path.exists());
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }
}
