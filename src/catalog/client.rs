use crate::catalog::Catalog;
use crate::catalog::models::*;
use crate::download::{DEFAULT_TIMEOUT as DOWNLOAD_TIMEOUT, HttpFileDownloader, ProgressReporter};
use crate::error::{DistError, Result};
use crate::models::{AddonInfo, Bundle, DependencyItem, Installer};
use crate::user_agent;
use attohttpc::{RequestBuilder, Session};
use log::{debug, trace, warn};
use retry::{OperationResult, delay::Exponential, retry_with_index};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

const DEFAULT_TIMEOUT: u64 = 30;
const MAX_RETRIES: usize = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Catalog served by the launcher's backend over its REST API.
#[derive(Debug, Clone)]
pub struct ServerCatalog {
    pub(crate) session: Session,
    pub(crate) base_url: String,
    auth_header: Option<String>,
    download_timeout: Duration,
}

impl ServerCatalog {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut session = Session::new();
        session.header("User-Agent", user_agent::catalog_client());
        session.timeout(Duration::from_secs(DEFAULT_TIMEOUT));
        session.proxy_settings(attohttpc::ProxySettings::from_env());

        Self {
            session,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_header: None,
            download_timeout: DOWNLOAD_TIMEOUT,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<&str>) -> Self {
        if let Some(key) = api_key.filter(|key| !key.is_empty()) {
            let value = format!("Bearer {key}");
            self.session.header("Authorization", value.as_str());
            self.auth_header = Some(value);
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.session.timeout(timeout);
        self
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let url = self.url(endpoint);
        debug!("Fetching {url}");
        self.execute_with_retry_raw(
            move || self.session.get(&url),
            |body| {
                serde_json::from_str::<T>(&body).map_err(|e| {
                    debug!("Failed to parse catalog response: {e}");
                    trace!("Response body: {body}");
                    DistError::CatalogFetch(format!("Invalid response from {endpoint}: {e}"))
                })
            },
        )
    }

    fn download_endpoint(
        &self,
        endpoint: &str,
        destination: &Path,
        reporter: Option<&mut dyn ProgressReporter>,
    ) -> Result<PathBuf> {
        let headers: Vec<(String, String)> = self
            .auth_header
            .iter()
            .map(|value| ("Authorization".to_string(), value.clone()))
            .collect();
        HttpFileDownloader::with_timeout(self.download_timeout).download(
            &self.url(endpoint),
            &headers,
            destination,
            reporter,
        )
    }

    fn execute_with_retry_raw<T, F, P>(&self, request_builder: F, parser: P) -> Result<T>
    where
        F: Fn() -> RequestBuilder,
        P: Fn(String) -> Result<T>,
    {
        let result = retry_with_index(
            Exponential::from_millis(INITIAL_BACKOFF_MS).take(MAX_RETRIES),
            |current_try| {
                let response = match request_builder().send() {
                    Ok(resp) => resp,
                    Err(e) => {
                        let user_error = DistError::CatalogFetch(format!(
                            "Network error connecting to {}: {e}. Please check your internet connection and try again.",
                            self.base_url
                        ));

                        if current_try < (MAX_RETRIES - 1) as u64 {
                            return OperationResult::Retry(user_error);
                        }
                        return OperationResult::Err(user_error);
                    }
                };

                if response.status() == attohttpc::StatusCode::TOO_MANY_REQUESTS
                    && current_try < (MAX_RETRIES - 1) as u64
                {
                    if let Some(seconds) = response
                        .headers()
                        .get("Retry-After")
                        .and_then(|value| value.to_str().ok())
                        .and_then(|value| value.parse::<u64>().ok())
                    {
                        thread::sleep(Duration::from_secs(seconds));
                    }
                    return OperationResult::Retry(DistError::CatalogFetch(
                        "Too many requests. Waiting before retrying...".to_string(),
                    ));
                }

                if !response.is_success() {
                    let status = response.status();
                    let detail = response
                        .text()
                        .ok()
                        .and_then(|body| serde_json::from_str::<ApiErrorResponse>(&body).ok())
                        .map(|error| error.detail);

                    let error_msg = match (status.as_u16(), detail) {
                        (401 | 403, _) => format!(
                            "Authentication failed for {}. Please check your API key.",
                            self.base_url
                        ),
                        (404, _) => format!(
                            "The requested resource was not found on {}.",
                            self.base_url
                        ),
                        (_, Some(detail)) => format!("HTTP error ({}): {detail}", status.as_u16()),
                        (500..=599, None) => format!(
                            "Server error occurred on {}. Please try again later.",
                            self.base_url
                        ),
                        (_, None) => format!(
                            "HTTP error ({}): {}",
                            status.as_u16(),
                            status.canonical_reason().unwrap_or("Unknown error")
                        ),
                    };
                    return OperationResult::Err(DistError::CatalogFetch(error_msg));
                }

                match response.text() {
                    Ok(body) => match parser(body) {
                        Ok(data) => OperationResult::Ok(data),
                        Err(e) => OperationResult::Err(e),
                    },
                    Err(e) => OperationResult::Err(DistError::CatalogFetch(format!(
                        "Failed to read response body: {e}"
                    ))),
                }
            },
        );

        result.map_err(|e| e.error)
    }
}

/// Parse every raw item, skipping the ones that don't fit the model.
fn parse_items<T>(kind: &str, raw: Vec<Value>, parse: impl Fn(Value) -> Result<T>) -> Vec<T> {
    raw.into_iter()
        .filter_map(|value| match parse(value) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Skipping invalid {kind} in catalog: {e}");
                None
            }
        })
        .collect()
}

impl Catalog for ServerCatalog {
    fn get_bundles(&self) -> Result<Vec<Bundle>> {
        let response: BundlesResponse = self.get_json("api/bundles")?;
        let mut bundles = parse_items("bundle", response.bundles, Bundle::from_value);

        for bundle in &mut bundles {
            if response.production_bundle.as_deref() == Some(bundle.name.as_str()) {
                bundle.is_production = true;
            }
            if response.staging_bundle.as_deref() == Some(bundle.name.as_str()) {
                bundle.is_staging = true;
            }
        }
        Ok(bundles)
    }

    fn get_addons_info(&self, details: bool) -> Result<Vec<AddonInfo>> {
        let endpoint = if details {
            "api/addons?details=1"
        } else {
            "api/addons"
        };
        let response: AddonsResponse = self.get_json(endpoint)?;
        Ok(parse_items("addon", response.addons, AddonInfo::from_value))
    }

    fn get_dependency_packages(&self) -> Result<Vec<DependencyItem>> {
        let response: DependencyPackagesResponse =
            self.get_json("api/desktop/dependencyPackages")?;
        Ok(parse_items(
            "dependency package",
            response.packages,
            DependencyItem::from_value,
        ))
    }

    fn get_installers(&self) -> Result<Vec<Installer>> {
        let response: InstallersResponse = self.get_json("api/desktop/installers")?;
        Ok(parse_items("installer", response.installers, Installer::from_value))
    }

    fn current_user(&self) -> Result<String> {
        let response: UserResponse = self.get_json("api/users/me")?;
        Ok(response.name)
    }

    fn download_installer(
        &self,
        filename: &str,
        destination: &Path,
        reporter: Option<&mut dyn ProgressReporter>,
    ) -> Result<PathBuf> {
        self.download_endpoint(
            &format!("api/desktop/installers/{filename}"),
            destination,
            reporter,
        )
    }

    fn download_dependency_package(
        &self,
        package_name: &str,
        dest_dir: &Path,
        filename: &str,
        reporter: Option<&mut dyn ProgressReporter>,
    ) -> Result<PathBuf> {
        self.download_endpoint(
            &format!("api/desktop/dependencyPackages/{package_name}"),
            &dest_dir.join(filename),
            reporter,
        )
    }

    fn download_addon_private_file(
        &self,
        addon_name: &str,
        addon_version: &str,
        filename: &str,
        dest_dir: &Path,
        reporter: Option<&mut dyn ProgressReporter>,
    ) -> Result<PathBuf> {
        self.download_endpoint(
            &format!("api/addons/{addon_name}/{addon_version}/private/{filename}"),
            &dest_dir.join(filename),
            reporter,
        )
    }

    fn download_file(
        &self,
        endpoint: &str,
        destination: &Path,
        reporter: Option<&mut dyn ProgressReporter>,
    ) -> Result<PathBuf> {
        self.download_endpoint(endpoint, destination, reporter)
    }
}
