// Script module - Embedded Lua host
//
// Runs the user script once at startup, then calls its global draw hook
// once per frame with the milliseconds elapsed since the previous present.

pub mod bindings;

pub use bindings::{console_error, register, SCREEN_TABLE};

use crate::console::SharedConsole;
use crate::error::ConsoleError;
use mlua::{Lua, LuaOptions, StdLib, Value};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error};

/// Global function called once per frame
pub const DRAW_HOOK: &str = "_screen_draw";

/// Lua state bound to a console
pub struct ScriptHost {
    lua: Lua,
    console: SharedConsole,
}

impl ScriptHost {
    /// Create a Lua state with the `Screen` bindings installed
    ///
    /// Only the base, table, string, math, utf8 and coroutine libraries are
    /// loaded; scripts get no file, process or module access.
    pub fn new(console: SharedConsole) -> Result<Self, ConsoleError> {
        let libs = StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::UTF8 | StdLib::COROUTINE;
        let lua = Lua::new_with(libs, LuaOptions::default())?;
        register(&lua, &console)?;

        Ok(Self { lua, console })
    }

    pub fn console(&self) -> &SharedConsole {
        &self.console
    }

    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    /// Run a chunk of Lua source; `name` appears in error messages
    pub fn exec(&self, source: &str, name: &str) -> Result<(), ConsoleError> {
        self.lua.load(source).set_name(name).exec()?;
        Ok(())
    }

    /// Read and run a script file
    pub fn load_file(&self, path: &Path) -> Result<(), ConsoleError> {
        let source = fs::read_to_string(path)?;
        self.exec(&source, &format!("@{}", path.display()))
    }

    /// Whether the script defined a draw hook
    pub fn has_draw_hook(&self) -> bool {
        matches!(
            self.lua.globals().get::<Value>(DRAW_HOOK),
            Ok(Value::Function(_))
        )
    }

    /// Call the draw hook with `delta` in milliseconds
    ///
    /// Returns `false` when the global is unset or holds anything other
    /// than a function; the frame is then presented without a hook call.
    pub fn call_draw_hook(&self, delta: Duration) -> Result<bool, ConsoleError> {
        let hook: Value = self.lua.globals().get(DRAW_HOOK)?;
        match hook {
            Value::Function(f) => {
                f.call::<()>(delta.as_millis() as i64)?;
                Ok(true)
            }
            Value::Nil => Ok(false),
            other => {
                debug!(kind = other.type_name(), "draw hook is not a function, skipping");
                Ok(false)
            }
        }
    }

    /// Run the script side of one frame
    pub fn update(&self) -> Result<(), ConsoleError> {
        let delta = self.console.borrow().frame_delta();
        if self.call_draw_hook(delta)? {
            debug!(delta_ms = delta.as_millis() as u64, "draw hook called");
        }
        Ok(())
    }

    /// Present every live device
    pub fn present(&self) -> Result<(), ConsoleError> {
        self.console.borrow_mut().present_all()
    }

    /// One full frame: draw hook, then present
    pub fn run_frame(&self) -> Result<(), ConsoleError> {
        self.update()?;
        self.present()
    }
}

/// Report a script error on stdout and in the log
pub fn report_script_error(err: &ConsoleError) {
    let stdout = io::stdout();
    let _ = write_script_error(&mut stdout.lock(), err);
    error!(error = %err, "script error");
}

/// Write the user-facing `! <error>` line
pub fn write_script_error(out: &mut impl Write, err: &ConsoleError) -> io::Result<()> {
    writeln!(out, "! {}", err)?;
    out.flush()
}
