use super::*;
use crate::download::FilesystemDownloader;
use crate::models::{MultiPlatformPath, SourceType};
use sha2::{Digest, Sha256};
use std::io::{Cursor, Write};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

const PAYLOAD_NAME: &str = "payload.zip";

enum Behavior {
    Serve(Vec<u8>),
    Fail,
    Panic,
}

/// Writes a fixed payload into the download directory.
struct StubDownloader {
    behavior: Behavior,
    downloads: Arc<AtomicUsize>,
    cleanups: Arc<AtomicUsize>,
}

impl StubDownloader {
    fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            downloads: Arc::new(AtomicUsize::new(0)),
            cleanups: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl SourceDownloader for StubDownloader {
    fn download(
        &self,
        _source: &SourceInfo,
        dest_dir: &Path,
        _context: &DownloadContext,
        progress: &mut TransferProgress,
    ) -> Result<PathBuf> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Serve(bytes) => {
                let path = dest_dir.join(PAYLOAD_NAME);
                fs::write(&path, bytes)?;
                progress.set_content_size(bytes.len() as u64);
                progress.set_transferred(bytes.len() as u64);
                Ok(path)
            }
            Behavior::Fail => Err(DistError::Download("connection refused".to_string())),
            Behavior::Panic => panic!("downloader exploded"),
        }
    }

    fn cleanup(
        &self,
        _source: &SourceInfo,
        dest_dir: &Path,
        _context: &DownloadContext,
    ) -> Result<()> {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        crate::download::remove_downloaded_file(dest_dir, PAYLOAD_NAME)
    }
}

struct FakeRoutine {
    root: PathBuf,
    result: Mutex<Option<Result<Option<PathBuf>>>>,
}

impl InstallRoutine for FakeRoutine {
    fn install_root(&self) -> PathBuf {
        self.root.clone()
    }

    fn install(&self, _installer: &Path) -> Result<Option<PathBuf>> {
        self.result.lock().unwrap().take().unwrap_or(Ok(None))
    }
}

fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
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

fn sha256(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn http_source() -> SourceInfo {
    SourceInfo::Http {
        url: "https://example.com/core.zip".to_string(),
        headers: None,
        filename: None,
    }
}

fn missing_filesystem_source() -> SourceInfo {
    SourceInfo::Filesystem {
        path: MultiPlatformPath {
            windows: Some("C:\\missing\\core.zip".to_string()),
            linux: Some("/missing/path/core.zip".to_string()),
            darwin: Some("/missing/path/core.zip".to_string()),
        },
    }
}

struct Fixture {
    temp: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    fn addons_root(&self) -> PathBuf {
        self.temp.path().join("addons")
    }

    fn target_dir(&self) -> PathBuf {
        self.addons_root().join("core_1.0.0")
    }

    fn config(&self, sources: Vec<SourceInfo>, checksum: Option<String>) -> ItemConfig {
        ItemConfig {
            label: "core 1.0.0".to_string(),
            state: UpdateState::Outdated,
            download_dir: self.temp.path().join("downloads").join("item"),
            checksum,
            checksum_algorithm: "sha256".to_string(),
            require_checksum: false,
            sources,
            context: DownloadContext::Addon {
                name: "core".to_string(),
                version: "1.0.0".to_string(),
            },
        }
    }

    fn unpack_item(&self, config: ItemConfig, registry: DownloaderRegistry) -> DistributionItem {
        DistributionItem::unpack(
            config,
            registry,
            self.target_dir(),
            self.addons_root().join(".unzip_temp").join("item"),
        )
    }
}

fn registry_with(stub: StubDownloader) -> DownloaderRegistry {
    let mut registry = DownloaderRegistry::new();
    registry.register(SourceType::Filesystem, Arc::new(FilesystemDownloader));
    registry.register(SourceType::Http, Arc::new(stub));
    registry
}

#[test]
fn test_no_sources_means_missing_source_files() {
    let fixture = Fixture::new();
    let mut item = fixture.unpack_item(fixture.config(vec![], None), DownloaderRegistry::new());

    item.distribute();

    assert_eq!(item.state(), UpdateState::MissSourceFiles);
    assert_eq!(
        item.error_message(),
        Some("core 1.0.0: Don't have any sources to download from.")
    );
    assert!(!item.is_distributed());
}

#[test]
fn test_falls_back_to_next_source() {
    let fixture = Fixture::new();
    let payload = zip_bytes(&[("__init__.py", "VERSION = '1.0.0'"), ("lib/util.py", "")]);
    let stub = StubDownloader::new(Behavior::Serve(payload.clone()));
    let cleanups = stub.cleanups.clone();
    let config = fixture.config(
        vec![missing_filesystem_source(), http_source()],
        Some(sha256(&payload)),
    );
    let mut item = fixture.unpack_item(config, registry_with(stub));

    item.distribute();

    assert_eq!(item.state(), UpdateState::Updated);
    assert_eq!(item.used_source(), Some(&http_source()));
    assert!(item.error_message().is_none());

    let first = &item.sources()[0].progress;
    assert!(first.failed());
    assert_eq!(first.fail_reason(), Some("Failed to download source"));
    let second = item.used_source_progress().unwrap();
    assert!(!second.failed());
    assert!(second.hash_check_finished());
    assert!(second.unzip_finished());

    assert!(fixture.target_dir().join("__init__.py").exists());
    assert!(fixture.target_dir().join("lib/util.py").exists());
    assert_eq!(cleanups.load(Ordering::SeqCst), 1);
}

#[test]
fn test_checksum_mismatch_is_never_installed() {
    let fixture = Fixture::new();
    let payload = zip_bytes(&[("__init__.py", "")]);
    let config = fixture.config(vec![http_source()], Some("abc123".to_string()));
    let mut item = fixture.unpack_item(
        config,
        registry_with(StubDownloader::new(Behavior::Serve(payload))),
    );

    item.distribute();

    assert_eq!(item.state(), UpdateState::UpdateFailed);
    assert_eq!(
        item.error_message(),
        Some("Failed to receive or install source files")
    );
    assert_eq!(
        item.sources()[0].progress.fail_reason(),
        Some("File hash does not match")
    );
    assert!(item.used_source().is_none());
    assert!(!fixture.target_dir().exists());
}

#[test]
fn test_exhausted_sources_keep_failure_message() {
    let fixture = Fixture::new();
    let config = fixture.config(vec![missing_filesystem_source(), http_source()], None);
    let mut item = fixture.unpack_item(config, registry_with(StubDownloader::new(Behavior::Fail)));

    item.distribute();

    assert_eq!(item.state(), UpdateState::UpdateFailed);
    assert_eq!(
        item.error_message(),
        Some("Failed to receive or install source files")
    );
    assert!(item.sources().iter().all(|attempt| attempt.progress.failed()));
    assert!(item.used_source().is_none());
}

#[test]
fn test_empty_checksum_fails_verification() {
    let fixture = Fixture::new();
    let payload = zip_bytes(&[("__init__.py", "")]);
    let config = fixture.config(vec![http_source()], Some(String::new()));
    let mut item = fixture.unpack_item(
        config,
        registry_with(StubDownloader::new(Behavior::Serve(payload))),
    );

    item.distribute();

    assert_eq!(item.state(), UpdateState::UpdateFailed);
}

#[test]
fn test_absent_checksum_is_computed() {
    let fixture = Fixture::new();
    let payload = zip_bytes(&[("__init__.py", "")]);
    let config = fixture.config(vec![http_source()], None);
    let mut item = fixture.unpack_item(
        config,
        registry_with(StubDownloader::new(Behavior::Serve(payload.clone()))),
    );

    item.distribute();

    assert_eq!(item.state(), UpdateState::Updated);
    assert_eq!(item.checksum(), Some(sha256(&payload).as_str()));
}

#[test]
fn test_absent_checksum_rejected_when_required() {
    let fixture = Fixture::new();
    let payload = zip_bytes(&[("__init__.py", "")]);
    let mut config = fixture.config(vec![http_source()], None);
    config.require_checksum = true;
    let mut item = fixture.unpack_item(
        config,
        registry_with(StubDownloader::new(Behavior::Serve(payload))),
    );

    item.distribute();

    assert_eq!(item.state(), UpdateState::UpdateFailed);
    assert!(item.checksum().is_none());
}

#[test]
fn test_updated_item_does_not_download() {
    let fixture = Fixture::new();
    let stub = StubDownloader::new(Behavior::Fail);
    let downloads = stub.downloads.clone();
    let mut config = fixture.config(vec![http_source()], None);
    config.state = UpdateState::Updated;
    let mut item = fixture.unpack_item(config, registry_with(stub));

    assert!(!item.need_distribution());
    item.distribute();

    assert_eq!(item.state(), UpdateState::Updated);
    assert!(item.is_distributed());
    assert_eq!(downloads.load(Ordering::SeqCst), 0);
}

#[test]
fn test_distribute_runs_once() {
    let fixture = Fixture::new();
    let stub = StubDownloader::new(Behavior::Fail);
    let downloads = stub.downloads.clone();
    let mut item = fixture.unpack_item(
        fixture.config(vec![http_source()], None),
        registry_with(stub),
    );

    item.distribute();
    item.distribute();

    assert_eq!(downloads.load(Ordering::SeqCst), 1);
    assert_eq!(item.state(), UpdateState::UpdateFailed);
}

#[test]
fn test_existing_target_content_is_replaced() {
    let fixture = Fixture::new();
    fs::create_dir_all(fixture.target_dir()).unwrap();
    fs::write(fixture.target_dir().join("stale.py"), "old").unwrap();

    let payload = zip_bytes(&[("fresh.py", "new")]);
    let mut item = fixture.unpack_item(
        fixture.config(vec![http_source()], Some(sha256(&payload))),
        registry_with(StubDownloader::new(Behavior::Serve(payload))),
    );

    item.distribute();

    assert_eq!(item.state(), UpdateState::Updated);
    assert!(fixture.target_dir().join("fresh.py").exists());
    assert!(!fixture.target_dir().join("stale.py").exists());

    let mut siblings: Vec<String> = fs::read_dir(fixture.addons_root())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    siblings.sort();
    assert_eq!(siblings, vec![".unzip_temp".to_string(), "core_1.0.0".to_string()]);
}

#[test]
fn test_unzip_failure_tries_next_source() {
    let fixture = Fixture::new();
    let payload = b"definitely not an archive".to_vec();
    let mut item = fixture.unpack_item(
        fixture.config(vec![http_source()], Some(sha256(&payload))),
        registry_with(StubDownloader::new(Behavior::Serve(payload))),
    );

    item.distribute();

    assert_eq!(item.state(), UpdateState::UpdateFailed);
    assert_eq!(
        item.sources()[0].progress.fail_reason(),
        Some("Couldn't unzip source file")
    );
}

#[test]
fn test_unknown_downloader_is_recorded_per_source() {
    let fixture = Fixture::new();
    let payload = zip_bytes(&[("__init__.py", "")]);
    let server = SourceInfo::Server {
        filename: Some("core.zip".to_string()),
        path: None,
    };
    let mut item = fixture.unpack_item(
        fixture.config(vec![server, http_source()], Some(sha256(&payload))),
        registry_with(StubDownloader::new(Behavior::Serve(payload))),
    );

    item.distribute();

    assert_eq!(item.state(), UpdateState::Updated);
    assert_eq!(
        item.sources()[0].progress.fail_reason(),
        Some("Unknown downloader server")
    );
}

#[test]
fn test_panicking_downloader_fails_item() {
    let fixture = Fixture::new();
    let mut item = fixture.unpack_item(
        fixture.config(vec![http_source()], None),
        registry_with(StubDownloader::new(Behavior::Panic)),
    );

    item.distribute();

    assert_eq!(item.state(), UpdateState::UpdateFailed);
    assert_eq!(item.error_detail(), Some("downloader exploded"));
}

fn installer_item(
    fixture: &Fixture,
    result: Result<Option<PathBuf>>,
    stub: StubDownloader,
    cleanup_on_fail: bool,
) -> DistributionItem {
    let routine = Arc::new(FakeRoutine {
        root: fixture.temp.path().to_path_buf(),
        result: Mutex::new(Some(result)),
    });
    let mut config = fixture.config(vec![http_source()], None);
    config.label = "Installer 1.2.0".to_string();
    config.checksum_algorithm = "md5".to_string();
    config.context = DownloadContext::Installer {
        version: "1.2.0".to_string(),
        filename: "launcher-1.2.0.tar.gz".to_string(),
    };
    DistributionItem::installer(config, registry_with(stub), routine, cleanup_on_fail)
}

#[test]
fn test_installer_success_reports_executable() {
    let fixture = Fixture::new();
    let exe = fixture.temp.path().join("launcher-1.2.0").join("distkit");
    let stub = StubDownloader::new(Behavior::Serve(b"installer".to_vec()));
    let cleanups = stub.cleanups.clone();
    let mut item = installer_item(&fixture, Ok(Some(exe.clone())), stub, false);

    item.distribute();

    assert_eq!(item.state(), UpdateState::Updated);
    assert_eq!(item.executable(), Some(exe.as_path()));
    assert!(item.installer_path().unwrap().ends_with(PAYLOAD_NAME));
    assert!(item.installer_error().is_none());
    assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    assert!(!item.is_missing_permissions());
}

#[test]
fn test_installer_known_error_is_kept_verbatim() {
    let fixture = Fixture::new();
    let stub = StubDownloader::new(Behavior::Serve(b"installer".to_vec()));
    let cleanups = stub.cleanups.clone();
    let mut item = installer_item(
        &fixture,
        Err(DistError::InstallerDistribution("Setup exited with 5".to_string())),
        stub,
        false,
    );

    item.distribute();

    assert_eq!(item.state(), UpdateState::UpdateFailed);
    assert_eq!(item.installer_error(), Some("Setup exited with 5"));
    assert_eq!(
        item.sources()[0].progress.fail_reason(),
        Some("Installation failed")
    );
    assert_eq!(cleanups.load(Ordering::SeqCst), 0);
    assert!(item.installer_path().unwrap().exists());
}

#[test]
fn test_installer_unexpected_error_is_generic() {
    let fixture = Fixture::new();
    let stub = StubDownloader::new(Behavior::Serve(b"installer".to_vec()));
    let cleanups = stub.cleanups.clone();
    let mut item = installer_item(
        &fixture,
        Err(DistError::Io(std::io::Error::other("disk on fire"))),
        stub,
        true,
    );

    item.distribute();

    assert_eq!(item.state(), UpdateState::UpdateFailed);
    assert_eq!(item.installer_error(), Some(UNEXPECTED_INSTALLER_ERROR));
    assert_eq!(cleanups.load(Ordering::SeqCst), 1);
}
