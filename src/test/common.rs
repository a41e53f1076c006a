use std::path::Path;
use std::sync::{ Mutex, MutexGuard, OnceLock, PoisonError };
use std::time::Duration;

use crate::cofg::Cofg;

// Serializes tests that bind the fixed default port.
pub(crate) fn port_mutex() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

pub(crate) fn lock_fixed_port() -> MutexGuard<'static, ()> {
    port_mutex().lock().unwrap_or_else(PoisonError::into_inner)
}

/// Serializes tests that read or change `WEBTREE__*` variables.
///
/// WHY: the process environment is global; `load_layered` in a parallel test would otherwise see
/// another test's overrides.
pub(crate) fn lock_env() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sets environment variables for the life of the guard. Hold [`lock_env`] while it exists.
pub(crate) struct EnvVars(Vec<&'static str>);

impl EnvVars {
    pub(crate) fn set(vars: &[(&'static str, &str)]) -> Self {
        for (key, value) in vars {
            // SAFETY: callers hold `lock_env`, and no test thread reads these keys without it
            unsafe { std::env::set_var(key, value) };
        }
        Self(vars.iter().map(|(key, _)| *key).collect())
    }
}

impl Drop for EnvVars {
    fn drop(&mut self) {
        for key in &self.0 {
            // SAFETY: see `EnvVars::set`
            unsafe { std::env::remove_var(key) };
        }
    }
}

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Built-in config moved to an ephemeral loopback port so tests can run in parallel.
pub(crate) fn test_cofg() -> Cofg {
    let mut c = Cofg::default();
    c.addrs.ip = "127.0.0.1".to_string();
    c.addrs.port = 0;
    c
}

pub(crate) fn client() -> reqwest::blocking::Client {
    reqwest::blocking::Client
        ::builder()
        .no_proxy()
        .pool_max_idle_per_host(0)
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

pub(crate) fn write_tree(root: &Path, files: &[(&str, &[u8])]) {
    for (rel, contents) in files {
        let target = root.join(rel);
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(target, contents).unwrap();
    }
}
