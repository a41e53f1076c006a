//! Opt-in gate for tests that change persistent system state (install software, register
//! publishers). Off unless `destructive: true` is configured, e.g. `WEBTREE__DESTRUCTIVE=true`.

use crate::cofg::Cofg;

pub fn enabled(c: &Cofg) -> bool {
    c.destructive
}

/// Whether `test_name` should run; logs the skip otherwise.
///
/// ```
/// use webtree_harness::{ cofg::Cofg, destructive };
///
/// if !destructive::should_run(&Cofg::default(), "pkg_install") {
///     return;
/// }
/// ```
pub fn should_run(c: &Cofg, test_name: &str) -> bool {
    if enabled(c) {
        return true;
    }
    log::warn!("skipping {test_name}: destructive tests not enabled (set WEBTREE__DESTRUCTIVE=true)");
    false
}
