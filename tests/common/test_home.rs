use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};

/// Creates a test home directory under target/home with a random 8-character name
/// The directory will be automatically cleaned up when the returned guard is dropped
pub struct TestHomeGuard {
    path: PathBuf,
}

#[allow(dead_code)]
impl TestHomeGuard {
    pub fn new() -> Self {
        let random_name: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();

        let path = std::env::current_dir()
            .expect("Failed to read current directory")
            .join("target/home")
            .join(random_name);
        fs::create_dir_all(&path).expect("Failed to create test home directory");

        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn distkit_home(&self) -> PathBuf {
        self.path.join(".distkit")
    }

    pub fn addons_dir(&self) -> PathBuf {
        self.distkit_home().join("addons")
    }

    pub fn dependencies_dir(&self) -> PathBuf {
        self.distkit_home().join("dependency_packages")
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.distkit_home().join("downloads")
    }

    pub fn setup_distkit_structure(&self) -> &Self {
        fs::create_dir_all(self.addons_dir()).expect("Failed to create addons directory");
        fs::create_dir_all(self.dependencies_dir())
            .expect("Failed to create dependencies directory");
        fs::create_dir_all(self.downloads_dir()).expect("Failed to create downloads directory");
        self
    }

    /// Write `config.toml` into the distkit home.
    pub fn write_config(&self, content: &str) -> &Self {
        fs::create_dir_all(self.distkit_home()).expect("Failed to create .distkit directory");
        fs::write(self.distkit_home().join("config.toml"), content)
            .expect("Failed to write config.toml");
        self
    }
}

impl Drop for TestHomeGuard {
    fn drop(&mut self) {
        if self.path.exists() {
            fs::remove_dir_all(&self.path).unwrap_or_else(|e| {
                eprintln!(
                    "Failed to cleanup test directory {}: {e}",
                    self.path.display()
                );
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_and_cleans_up_directory() {
        let test_path = {
            let guard = TestHomeGuard::new();
            let path = guard.path().to_path_buf();
            assert!(path.exists());
            assert!(path.ends_with(path.file_name().unwrap()));
            path
        };
        assert!(!test_path.exists());
    }

    #[test]
    fn test_setup_distkit_structure() {
        let guard = TestHomeGuard::new();
        let guard = guard.setup_distkit_structure();

        assert!(guard.addons_dir().exists());
        assert!(guard.dependencies_dir().exists());
        assert!(guard.downloads_dir().exists());
    }
}
