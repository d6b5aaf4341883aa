use std::{
    path::PathBuf,
    sync::{Mutex, OnceLock},
};

use dsforge::app_dirs::HOME_OVERRIDE_ENV;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Points `DSFORGE_HOME` at a test directory until dropped.
pub struct DsforgeEnvGuard {
    previous: Option<String>,
    _lock: std::sync::MutexGuard<'static, ()>,
}

impl DsforgeEnvGuard {
    pub fn set_home(path: PathBuf) -> Self {
        let lock = ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|err| err.into_inner());
        let previous = std::env::var(HOME_OVERRIDE_ENV).ok();
        // SAFETY: tests run under a global lock to prevent concurrent env mutations.
        unsafe {
            std::env::set_var(HOME_OVERRIDE_ENV, path);
        }
        Self {
            previous,
            _lock: lock,
        }
    }
}

impl Drop for DsforgeEnvGuard {
    fn drop(&mut self) {
        if let Some(value) = self.previous.take() {
            // SAFETY: tests run under a global lock to prevent concurrent env mutations.
            unsafe {
                std::env::set_var(HOME_OVERRIDE_ENV, value);
            }
        } else {
            // SAFETY: tests run under a global lock to prevent concurrent env mutations.
            unsafe {
                std::env::remove_var(HOME_OVERRIDE_ENV);
            }
        }
    }
}
