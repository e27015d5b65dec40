use std::path::{Path, PathBuf};

use tempfile::TempDir;

use fs_warden::cancel::CancelToken;
use fs_warden::config::ServerConfig;
use fs_warden::engine::Engine;

pub struct Fixture {
    pub tempdir: TempDir,
    pub _storedir: TempDir,
    pub engine: Engine,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config_tweak(|_| {})
    }

    pub fn with_config_tweak(tweak: impl FnOnce(&mut ServerConfig)) -> Self {
        let tempdir = TempDir::new().expect("create temp dir");
        let storedir = TempDir::new().expect("create store dir");
        let mut config = ServerConfig::default();
        config.allowed_paths = vec![tempdir.path().to_path_buf()];
        config.backup.root = Some(storedir.path().join("backups"));
        tweak(&mut config);
        let engine = Engine::new(config);
        Self { tempdir, _storedir: storedir, engine }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.tempdir.path().join(name)
    }

    pub fn raw(&self, name: &str) -> String {
        self.path(name).to_string_lossy().into_owned()
    }

    pub fn write_file(&self, name: &str, data: &str) -> PathBuf {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture dirs");
        }
        std::fs::write(&path, data).expect("write fixture file");
        path
    }

    pub fn read(&self, path: &Path) -> String {
        std::fs::read_to_string(path).expect("read fixture file")
    }
}

pub fn cancel() -> CancelToken {
    CancelToken::new()
}
