//! Process-global session configuration. A trap handler cannot receive
//! parameters, so the port the transport should bind and whether the
//! session has been armed at all live here instead of being threaded
//! through call sites.

use lazy_static::lazy_static;
use spin::Mutex;

#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// I/O port base for the bare-metal serial backend. Unused by the
    /// loopback/test transport.
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self { port: 0x3f8 } // COM1
    }
}

lazy_static! {
    static ref CONFIG: Mutex<Option<Config>> = Mutex::new(None);
}

/// Records `config` as the active session configuration. Called once from
/// the host API's install path.
pub fn set(config: Config) {
    *CONFIG.lock() = Some(config);
}

/// Returns the active configuration, or the default if [`set`] was never
/// called.
pub fn get() -> Config {
    CONFIG.lock().unwrap_or_default()
}

/// True once [`set`] has run.
pub fn is_initialized() -> bool {
    CONFIG.lock().is_some()
}

pub fn clear() {
    *CONFIG.lock() = None;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Both cases share one global, so they run as a single test rather
    // than risk two tests racing on CONFIG under the default parallel
    // test runner.
    #[test]
    fn unset_defaults_then_set_round_trips() {
        clear();
        assert!(!is_initialized());
        assert_eq!(get().port, 0x3f8);

        set(Config { port: 0x2f8 });
        assert!(is_initialized());
        assert_eq!(get().port, 0x2f8);
        clear();
    }
}
