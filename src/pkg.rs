//! Opaque wrappers around the external repository tools.
//!
//! Nothing here knows what `pkg` does; each call is a checked subprocess. The guards undo their
//! setup step when dropped (`unset-publisher`, `uninstall`) so a failing test body still leaves
//! the system as it found it.

use std::path::{ Path, PathBuf };
use std::time::Duration;

use log::warn;

use crate::cofg::Cofg;
use crate::command::{ self, CommandOutput };
use crate::error::{ HarnessError, HarnessResult };

/// Find `name` on `PATH`.
pub fn locate(name: &str) -> HarnessResult<PathBuf> {
    Ok(which::which(name)?)
}

/// A configured tool: a value with a path separator must exist as given, a bare name is looked
/// up on `PATH`.
fn resolve(configured: &str) -> Option<PathBuf> {
    let path = Path::new(configured);
    if path.components().count() > 1 || path.is_absolute() {
        path.is_file().then(|| path.to_path_buf())
    } else {
        locate(configured).ok()
    }
}

#[derive(Debug, Clone)]
pub struct Tools {
    pub repo2webtree: Option<PathBuf>,
    pub pkg: Option<PathBuf>,
    pub pkgrepo: Option<PathBuf>,
    timeout: Duration,
}

impl Tools {
    pub fn from_cofg(c: &Cofg) -> Self {
        Self {
            repo2webtree: resolve(&c.tools.repo2webtree),
            pkg: resolve(&c.tools.pkg),
            pkgrepo: resolve(&c.tools.pkgrepo),
            timeout: c.command_timeout(),
        }
    }

    /// Names of the tools that did not resolve.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("repo2webtree", &self.repo2webtree),
            ("pkg", &self.pkg),
            ("pkgrepo", &self.pkgrepo),
        ]
            .into_iter()
            .filter(|(_, path)| path.is_none())
            .map(|(name, _)| name)
            .collect()
    }

    fn require<'a>(tool: &'a Option<PathBuf>, name: &str) -> HarnessResult<&'a Path> {
        tool.as_deref().ok_or_else(|| {
            HarnessError::Io(
                std::io::Error::new(std::io::ErrorKind::NotFound, format!("tool not found: {name}"))
            )
        })
    }

    fn run(&self, program: &Path, args: &[&str]) -> HarnessResult<CommandOutput> {
        let argv = std::iter
            ::once(program.as_os_str())
            .chain(args.iter().map(|a| std::ffi::OsStr::new(*a)));
        command::run_with_timeout(argv, true, self.timeout)
    }

    /// `repo2webtree REPO WEBTREE`
    pub fn repo2webtree(&self, repo: &Path, webtree: &Path) -> HarnessResult<CommandOutput> {
        let program = Self::require(&self.repo2webtree, "repo2webtree")?;
        let argv = [program.as_os_str(), repo.as_os_str(), webtree.as_os_str()];
        command::run_with_timeout(argv, true, self.timeout)
    }

    /// `pkgrepo info -s URL`
    pub fn pkgrepo_info(&self, url: &str) -> HarnessResult<CommandOutput> {
        self.run(Self::require(&self.pkgrepo, "pkgrepo")?, &["info", "-s", url])
    }

    /// `pkg ARGS...`
    pub fn pkg(&self, args: &[&str]) -> HarnessResult<CommandOutput> {
        self.run(Self::require(&self.pkg, "pkg")?, args)
    }
}

/// `pkg set-publisher -g URL NAME`, undone with `pkg unset-publisher NAME` on drop.
pub struct Publisher<'a> {
    tools: &'a Tools,
    name: String,
}

impl<'a> Publisher<'a> {
    pub fn set(tools: &'a Tools, url: &str, name: &str) -> HarnessResult<Self> {
        tools.pkg(&["set-publisher", "-g", url, name])?;
        Ok(Self { tools, name: name.to_string() })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for Publisher<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.tools.pkg(&["unset-publisher", &self.name]) {
            warn!("failed to unset publisher {}: {e}", self.name);
        }
    }
}

/// `pkg install PKG`, undone with `pkg uninstall PKG` on drop.
pub struct Installed<'a> {
    tools: &'a Tools,
    package: String,
}

impl<'a> Installed<'a> {
    pub fn install(tools: &'a Tools, package: &str) -> HarnessResult<Self> {
        tools.pkg(&["install", package])?;
        Ok(Self { tools, package: package.to_string() })
    }

    pub fn package(&self) -> &str {
        &self.package
    }
}

impl Drop for Installed<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.tools.pkg(&["uninstall", &self.package]) {
            warn!("failed to uninstall {}: {e}", self.package);
        }
    }
}
