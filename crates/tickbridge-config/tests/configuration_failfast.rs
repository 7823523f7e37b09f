//! Malformed configuration layers must fail loudly rather than fall back.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;
use tempfile::TempDir;
use tickbridge_config::{Config, OrthoConfig};

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

struct EnvOverride {
    key: &'static str,
    previous: Option<OsString>,
    guard: Option<MutexGuard<'static, ()>>,
}

impl EnvOverride {
    fn set_var(key: &'static str, value: &OsStr) -> Self {
        let guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        let previous = std::env::var_os(key);
        unsafe { std::env::set_var(key, value) };
        Self {
            key,
            previous,
            guard: Some(guard),
        }
    }
}

impl Drop for EnvOverride {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(value) => unsafe { std::env::set_var(self.key, value) },
            None => unsafe { std::env::remove_var(self.key) },
        }
        drop(self.guard.take());
    }
}

#[test]
fn non_numeric_port_in_file_is_rejected() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let path = temp_dir.path().join("tickbridge.toml");
    fs::write(&path, "port = \"not_a_number\"\n").expect("write malformed config");

    let args = vec![
        OsString::from("tickbridged"),
        OsString::from("--config-path"),
        path.into_os_string(),
    ];

    let error = Config::load_from_iter(args).expect_err("loading must fail");
    assert!(
        !error.to_string().is_empty(),
        "error should describe the failing layer"
    );
}

#[test]
fn non_numeric_port_in_environment_is_rejected() {
    let _env = EnvOverride::set_var("TICKBRIDGE_PORT", OsStr::new("ninety"));

    let result = Config::load_from_iter(vec![OsString::from("tickbridged")]);
    assert!(result.is_err(), "environment override must be validated");
}
