// Common test utilities for script-driven integration tests
//
// Builds a console on in-memory surfaces and runs Lua against it.

#![allow(dead_code)]

use std::path::PathBuf;
use thundervm::console::{Console, ConsoleConfig};
use thundervm::device::Device;
use thundervm::display::presenter::HeadlessBackend;
use thundervm::error::ConsoleError;
use thundervm::script::{console_error, ScriptHost};

/// Script host on a default configuration (128×128, two devices)
pub fn host() -> ScriptHost {
    host_with(ConsoleConfig::default())
}

pub fn host_with(config: ConsoleConfig) -> ScriptHost {
    let console = Console::new(config, Box::new(HeadlessBackend)).expect("headless console");
    ScriptHost::new(console.into_shared()).expect("script host")
}

/// Run `code` and return the console error a binding raised
pub fn binding_error(host: &ScriptHost, code: &str) -> String {
    let err = host
        .lua()
        .load(code)
        .exec()
        .expect_err("script should fail");
    let console_err: &ConsoleError = console_error(&err)
        .unwrap_or_else(|| panic!("not raised by a binding: {}", err));
    console_err.to_string()
}

/// Inspect the default device
pub fn with_default<R>(host: &ScriptHost, f: impl FnOnce(&Device) -> R) -> R {
    let console = host.console().borrow();
    let device = console
        .device(console.default_device())
        .expect("default device");
    f(device)
}

/// Unique scratch path under the system temp directory
pub fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("thundervm_{}_{}", std::process::id(), name))
}
