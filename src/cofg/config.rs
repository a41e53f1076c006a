//! Configuration (Cofg)
//!
//! Layering, lowest precedence first:
//! 1. built-in `cofg.yaml` (embedded at compile time)
//! 2. optional `./webtree.yaml` next to the test binary's working directory
//! 3. `WEBTREE__<SECTION>__<KEY>` environment variables (e.g. `WEBTREE__ADDRS__PORT=0`)
//!
//! The layered result is cached process-wide; tests that need a variant build their own `Cofg`
//! with `new_from_str` or struct update syntax instead of touching the cache.
//!
//! 中文：內建設定 → 本地檔案 → 環境變數，逐層覆寫後快取於全域。

use std::path::Path;
use std::time::Duration;

use nest_struct::nest_struct;
use once_cell::sync::OnceCell;

use crate::error::HarnessResult;

pub(crate) const BUILD_COFG: &str = include_str!("cofg.yaml");
pub(crate) const LOCAL_COFG: &str = "./webtree.yaml";
pub(crate) const ENV_PREFIX: &str = "WEBTREE";

#[nest_struct]
#[derive(PartialEq, Clone, Debug, serde::Deserialize)]
pub struct Cofg {
  pub addrs: nest! {
    /// Host to bind, e.g. localhost, 127.0.0.1
    pub ip: String,
    /// Port to bind; 0 = ephemeral
    pub port: u16,
  },
  pub server: nest! {
    /// actix worker count for the serve thread
    pub workers: usize,
    /// keep idle client connections open between requests
    pub keep_alive: bool,
    /// graceful shutdown window handed to actix
    pub shutdown_timeout_secs: u64,
    /// render an HTML listing for directories without an index file
    pub show_files_listing: bool,
  },
  pub timeouts: nest! {
    /// readiness wait used by fixtures
    pub ready_ms: u64,
    /// extra time allowed for the serve thread to exit after shutdown_timeout_secs
    pub join_grace_ms: u64,
    /// limit for each external command
    pub command_secs: u64,
  },
  pub middleware: nest! {
    pub logger: nest! {
      /// Enable request logging
      pub enabling: bool,
      /// actix Logger format; `%{url}xi` is the percent-decoded URL
      pub format: String,
    },
  },
  pub tools: nest! {
    pub repo2webtree: String,
    pub pkg: String,
    pub pkgrepo: String,
  },
  /// run tests that change persistent system state
  pub destructive: bool,
}

static GLOBAL_COFG: OnceCell<Cofg> = OnceCell::new();

impl Default for Cofg {
  fn default() -> Self {
    Cofg::new_from_str(BUILD_COFG).expect("built-in cofg.yaml must deserialize")
  }
}

impl Cofg {
  /// Build from any owned `config::Source`.
  pub fn new_from_source<T>(source: T) -> HarnessResult<Self>
    where T: config::Source + Send + Sync + 'static
  {
    Ok(config::Config::builder().add_source(source).build()?.try_deserialize::<Self>()?)
  }

  pub fn new_from_str(data: &str) -> HarnessResult<Self> {
    Self::new_from_source(config::File::from_str(data, config::FileFormat::Yaml))
  }

  /// Built-in defaults, then `local` (if it exists), then the environment.
  pub fn load_layered(local: &Path) -> HarnessResult<Self> {
    let cofg = config::Config
      ::builder()
      .add_source(config::File::from_str(BUILD_COFG, config::FileFormat::Yaml))
      .add_source(config::File::from(local).format(config::FileFormat::Yaml).required(false))
      .add_source(
        config::Environment
          ::with_prefix(ENV_PREFIX)
          .prefix_separator("__")
          .separator("__")
          .try_parsing(true)
      )
      .build()?
      .try_deserialize::<Self>()?;
    log::debug!("cofg: {cofg:#?}");
    Ok(cofg)
  }

  /// Cached layered configuration, loaded on first use.
  pub fn get() -> HarnessResult<&'static Self> {
    GLOBAL_COFG.get_or_try_init(|| Self::load_layered(Path::new(LOCAL_COFG)))
  }

  pub fn ready_timeout(&self) -> Duration {
    Duration::from_millis(self.timeouts.ready_ms)
  }

  pub fn shutdown_timeout(&self) -> Duration {
    Duration::from_secs(self.server.shutdown_timeout_secs)
  }

  pub fn join_grace(&self) -> Duration {
    Duration::from_millis(self.timeouts.join_grace_ms)
  }

  pub fn command_timeout(&self) -> Duration {
    Duration::from_secs(self.timeouts.command_secs)
  }
}

impl std::fmt::Display for CofgAddrs {
  /// Format the address as `host:port`.
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}:{}", self.ip, self.port)
  }
}
