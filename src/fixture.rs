//! Per-test fixtures: a fresh web root and a server scoped to the test body.

use std::path::{ Path, PathBuf };

use log::debug;

use crate::cofg::Cofg;
use crate::error::HarnessResult;
use crate::server::{ self, ServerHandle, ServerOptions };

/// A uniquely-scoped temporary directory with a `web_root` path inside it.
///
/// `path()` is not created here; the converter under test creates it. Everything is removed
/// when the `WebRoot` is dropped.
pub struct WebRoot {
    tmp: tempfile::TempDir,
    path: PathBuf,
}

impl WebRoot {
    pub fn new() -> HarnessResult<Self> {
        let tmp = tempfile::Builder::new().prefix("webtree-").tempdir()?;
        let path = tmp.path().join("web_root");
        Ok(Self { tmp, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The enclosing temp directory, for scratch files next to the web root.
    pub fn tmp_path(&self) -> &Path {
        self.tmp.path()
    }

    /// Write `contents` to `rel` under the web root, creating parent directories.
    pub fn write(&self, rel: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> HarnessResult<PathBuf> {
        let target = self.path.join(rel);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, contents)?;
        Ok(target)
    }
}

/// A server started on the configured address and confirmed ready. Stopped on drop, whether
/// the test body returned or panicked.
pub struct Webserver {
    handle: ServerHandle,
}

impl Webserver {
    pub fn start(web_root: &WebRoot, c: &Cofg) -> HarnessResult<Self> {
        Self::serve(web_root.path(), c)
    }

    pub fn serve(root: impl Into<PathBuf>, c: &Cofg) -> HarnessResult<Self> {
        Self::serve_with(root, c, ServerOptions::from(c))
    }

    pub fn serve_with(root: impl Into<PathBuf>, c: &Cofg, options: ServerOptions) -> HarnessResult<Self> {
        let root = root.into();
        debug!("webserver for {} on {}", root.display(), c.addrs);
        let handle = server::start_with(root, &c.addrs.ip, c.addrs.port, options)?;
        // on failure the handle drops here and is shut down
        handle.await_ready(c.ready_timeout())?;
        Ok(Self { handle })
    }

    pub fn handle(&self) -> &ServerHandle {
        &self.handle
    }

    pub fn base_url(&self) -> String {
        self.handle.base_url()
    }

    pub fn url(&self, path: &str) -> String {
        self.handle.url(path)
    }

    pub fn stop(self) -> HarnessResult<()> {
        self.handle.stop()
    }
}
