use clap::Parser;
use log::{ debug, info };

use webtree_harness::cofg::{ Cofg, build_config_from_cli, cli::Args };
use webtree_harness::server::{ self, ServerOptions };

fn init() {
  env_logger
    ::builder()
    .default_format()
    .format_module_path(true)
    .format_line_number(true)
    .format_timestamp(None)
    .filter_level(log::LevelFilter::Info)
    .parse_default_env()
    .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
  init();
  let args = Args::parse();
  let s = build_config_from_cli(Cofg::get()?.clone(), &args);
  debug!("cofg: {s:#?}");
  info!("binding {} for {}", s.addrs, args.root.display());

  let handle = server::start_with(&args.root, &s.addrs.ip, s.addrs.port, ServerOptions::from(&s))?;
  handle.await_ready(s.ready_timeout())?;
  info!("run in {}/ (version {})", handle.base_url(), webtree_harness::VERSION);

  // serve until the process is killed
  handle.wait()?;
  Ok(())
}
