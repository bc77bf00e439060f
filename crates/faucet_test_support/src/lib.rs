#![allow(clippy::result_large_err)]

pub mod containers;

/// Routes `log` output to the test harness so `-- --nocapture` shows
/// `connector.connect`/`ping` activity. Safe to call from every test; only
/// the first call in a process takes effect.
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
