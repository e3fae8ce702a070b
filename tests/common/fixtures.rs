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

//! Catalog server, archives and sources shared by the integration tests.

use distkit::catalog::{Catalog, ServerCatalog};
use distkit::distribution::{BundleSelection, ControllerOptions, DistributionController};
use distkit::download::DownloaderRegistry;
use distkit::platform::Platform;
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::TestHomeGuard;

/// Zip archive with the given `(name, content)` entries.
#[allow(dead_code)]
pub fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut cursor);
        let options: zip::write::FileOptions<'_, ()> = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (name, content) in files {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    cursor.into_inner()
}

#[allow(dead_code)]
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[allow(dead_code)]
pub fn filesystem_source(path: &Path) -> Value {
    let path = path.to_string_lossy().to_string();
    json!({
        "type": "filesystem",
        "path": {"windows": path, "linux": path, "darwin": path}
    })
}

#[allow(dead_code)]
pub fn http_source(url: &str) -> Value {
    json!({"type": "http", "url": url})
}

/// Bundle JSON pinning `addons` and, for every platform, `dependency`.
#[allow(dead_code)]
pub fn bundle_json(name: &str, addons: Value, dependency: Option<&str>) -> Value {
    let mut bundle = json!({"name": name, "addons": addons});
    if let Some(filename) = dependency {
        bundle["dependencyPackages"] =
            json!({"windows": filename, "linux": filename, "darwin": filename});
    }
    bundle
}

/// mockito server answering the catalog API.
#[allow(dead_code)]
pub struct CatalogServer {
    pub server: ServerGuard,
    mocks: Vec<Mock>,
}

#[allow(dead_code)]
impl CatalogServer {
    pub fn new() -> Self {
        Self {
            server: Server::new(),
            mocks: Vec::new(),
        }
    }

    pub fn url(&self) -> String {
        self.server.url()
    }

    fn serve_json(&mut self, path: &str, body: Value) {
        let mock = self
            .server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create();
        self.mocks.push(mock);
    }

    pub fn serve_bundles(
        &mut self,
        bundles: Value,
        production: Option<&str>,
        staging: Option<&str>,
    ) {
        self.serve_json(
            "/api/bundles",
            json!({
                "bundles": bundles,
                "productionBundle": production,
                "stagingBundle": staging
            }),
        );
    }

    pub fn serve_addons(&mut self, addons: Value) {
        let mock = self
            .server
            .mock("GET", "/api/addons")
            .match_query(Matcher::UrlEncoded("details".into(), "1".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "addons": addons }).to_string())
            .create();
        self.mocks.push(mock);
    }

    pub fn serve_dependency_packages(&mut self, packages: Value) {
        self.serve_json(
            "/api/desktop/dependencyPackages",
            json!({ "packages": packages }),
        );
    }

    pub fn serve_installers(&mut self, installers: Value) {
        self.serve_json("/api/desktop/installers", json!({ "installers": installers }));
    }

    pub fn serve_user(&mut self, name: &str) {
        self.serve_json("/api/users/me", json!({ "name": name }));
    }

    /// Binary file at `path`; the returned mock can assert the hit count.
    pub fn serve_file(&mut self, path: &str, bytes: &[u8]) -> Mock {
        self.server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "application/octet-stream")
            .with_header("content-length", &bytes.len().to_string())
            .with_body(bytes)
            .create()
    }

    pub fn catalog(&self) -> Arc<dyn Catalog> {
        Arc::new(
            ServerCatalog::new(self.url())
                .with_api_key(Some("test-key"))
                .with_timeout(Duration::from_secs(10)),
        )
    }

    pub fn controller(&self, options: ControllerOptions) -> DistributionController {
        let catalog = self.catalog();
        let registry =
            DownloaderRegistry::with_defaults(Some(catalog.clone()), Duration::from_secs(10));
        DistributionController::new(catalog, registry, options)
    }
}

/// Controller options rooted in the test home.
#[allow(dead_code)]
pub fn controller_options(home: &TestHomeGuard, selection: BundleSelection) -> ControllerOptions {
    ControllerOptions {
        addons_root: home.addons_dir(),
        dependencies_root: home.dependencies_dir(),
        downloads_dir: Some(home.downloads_dir()),
        executables_file: home.distkit_home().join("executables.json"),
        selection,
        active_user: None,
        current_version: None,
        current_executable: None,
        executable_name: "distkit".to_string(),
        app_name: "Distkit".to_string(),
        skip_installer_dist: false,
        require_checksum: false,
        max_workers: 4,
        platform: Platform::current(),
    }
}
