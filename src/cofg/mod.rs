pub mod cli;
pub mod config;

pub use config::{ Cofg, CofgAddrs };

/// Merge CLI overrides into loaded config.
///
/// WHY: File and env layers stay the baseline; explicit flags on `webtree-serve` take precedence.
/// 中文：以設定檔與環境變數為基礎，命令列參數覆寫對應欄位。
pub fn build_config_from_cli(mut s: config::Cofg, cli: &cli::Args) -> config::Cofg {
  match (&cli.ip, cli.port) {
    (None, None) => (),
    (None, Some(port)) => {
      s.addrs.port = port;
    }
    (Some(ip), None) => {
      s.addrs.ip = ip.to_string();
    }
    (Some(_), Some(_)) => {
      s.addrs = cli.into();
    }
  }
  s
}
