//! CLI argument parsing for `webtree-serve`
//!
//! WHY: Serving a tree by hand should behave like the test fixtures, so only the address and the
//! root directory are flags; everything else comes from the layered config.
//!
//! 中文：僅提供位址與根目錄參數，其餘沿用分層設定，讓手動啟動與測試行為一致。

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version = env!("VERSION"), about, long_about)]
pub struct Args {
  /// Directory to serve
  #[arg(default_value = ".")]
  pub root: PathBuf,
  #[arg(long)]
  pub ip: Option<String>,
  #[arg(long)]
  pub port: Option<u16>,
}

impl From<&Args> for super::config::CofgAddrs {
  fn from(val: &Args) -> Self {
    // callers only convert when both fields are present
    debug_assert!(val.ip.is_some() && val.port.is_some());
    super::config::CofgAddrs {
      ip: val.ip.clone().unwrap_or_default(),
      port: val.port.unwrap_or_default(),
    }
  }
}
