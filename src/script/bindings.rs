// Script bindings - The `Screen` table exposed to Lua
//
// Every entry point runs the same three steps: check the argument count and
// each argument's kind, check every numeric argument against its range,
// and only then mutate the device. A rejected call never touches the
// buffer or the palette.
//
// Drawing functions address the default device, or the device whose handle
// is passed as an extra first argument:
//
//   Screen.pset(x, y, c)          Screen.pset(dev, x, y, c)
//   Screen.rectfill(x1, y1, x2, y2, c)
//   Screen.line(x1, y1, x2, y2, c)
//   Screen.cset(c, r, g, b)       Screen.cget(c) -> r, g, b
//   Screen.pget(x, y) -> c        Screen.cls([c])
//   Screen.width()                Screen.height()
//   Screen.new(kind, w, h) -> dev Screen.free(dev)
//   Screen.default() -> dev

use crate::console::{Console, SharedConsole};
use crate::device::{DeviceHandle, DeviceKind};
use crate::display::palette::{Rgb, PALETTE_SIZE};
use crate::display::pixel_buffer::{COLOR_COUNT, MAX_DIMENSION};
use crate::error::ConsoleError;
use mlua::{IntoLuaMulti, Lua, MultiValue, Table, Value};
use std::rc::Rc;

/// Name of the global table holding the bindings
pub const SCREEN_TABLE: &str = "Screen";

/// Install the `Screen` table into the globals of `lua`
pub fn register(lua: &Lua, console: &SharedConsole) -> mlua::Result<()> {
    let screen = lua.create_table()?;

    bind(lua, &screen, console, "pset", pset)?;
    bind(lua, &screen, console, "pget", pget)?;
    bind(lua, &screen, console, "rectfill", rectfill)?;
    bind(lua, &screen, console, "line", line)?;
    bind(lua, &screen, console, "cls", cls)?;
    bind(lua, &screen, console, "cset", cset)?;
    bind(lua, &screen, console, "cget", cget)?;
    bind(lua, &screen, console, "width", width)?;
    bind(lua, &screen, console, "height", height)?;
    bind(lua, &screen, console, "new", new_device)?;
    bind(lua, &screen, console, "free", free_device)?;
    bind(lua, &screen, console, "default", default_device)?;

    lua.globals().set(SCREEN_TABLE, screen)
}

fn bind<R, F>(
    lua: &Lua,
    table: &Table,
    console: &SharedConsole,
    name: &'static str,
    op: F,
) -> mlua::Result<()>
where
    F: Fn(&mut Console, &[Value]) -> Result<R, ConsoleError> + 'static,
    R: IntoLuaMulti,
{
    let console = Rc::clone(console);
    let function = lua.create_function(move |_, args: MultiValue| {
        let args: Vec<Value> = args.into_iter().collect();
        let mut console = console
            .try_borrow_mut()
            .map_err(|_| mlua::Error::RuntimeError(format!("{} called re-entrantly", name)))?;
        op(&mut console, &args).map_err(mlua::Error::external)
    })?;
    table.set(name, function)
}

/// Find the [`ConsoleError`] carried by a Lua error, if any
pub fn console_error(err: &mlua::Error) -> Option<&ConsoleError> {
    match err {
        mlua::Error::ExternalError(inner) => inner.downcast_ref::<ConsoleError>(),
        mlua::Error::CallbackError { cause, .. } => console_error(cause),
        mlua::Error::WithContext { cause, .. } => console_error(cause),
        _ => None,
    }
}

pub fn pset(console: &mut Console, args: &[Value]) -> Result<(), ConsoleError> {
    const OP: &str = "pset";
    let (handle, args) = split_device(console, OP, args)?;
    let [x, y, c] = integers(OP, ["x", "y", "c"], args)?;

    let (w, h) = dimensions(console, handle)?;
    let x = in_range(OP, "x", x, 0, w)?;
    let y = in_range(OP, "y", y, 0, h)?;
    let c = color_index(OP, "c", c)?;

    console.device_mut(handle)?.buffer_mut().set(x, y, c)
}

pub fn pget(console: &mut Console, args: &[Value]) -> Result<u8, ConsoleError> {
    const OP: &str = "pget";
    let (handle, args) = split_device(console, OP, args)?;
    let [x, y] = integers(OP, ["x", "y"], args)?;

    let (w, h) = dimensions(console, handle)?;
    let x = in_range(OP, "x", x, 0, w)?;
    let y = in_range(OP, "y", y, 0, h)?;

    console.device(handle)?.buffer().get(x, y)
}

pub fn rectfill(console: &mut Console, args: &[Value]) -> Result<(), ConsoleError> {
    const OP: &str = "rectfill";
    let (handle, args) = split_device(console, OP, args)?;
    let [x1, y1, x2, y2, c] = integers(OP, ["x1", "y1", "x2", "y2", "c"], args)?;

    let (w, h) = dimensions(console, handle)?;
    let x1 = in_range(OP, "x1", x1, 0, w)?;
    let y1 = in_range(OP, "y1", y1, 0, h)?;
    let x2 = in_range(OP, "x2", x2, 0, w)?;
    let y2 = in_range(OP, "y2", y2, 0, h)?;
    let c = color_index(OP, "c", c)?;

    console
        .device_mut(handle)?
        .buffer_mut()
        .fill_rect(x1, y1, x2, y2, c)
}

pub fn line(console: &mut Console, args: &[Value]) -> Result<(), ConsoleError> {
    const OP: &str = "line";
    let (handle, args) = split_device(console, OP, args)?;
    let [x1, y1, x2, y2, c] = integers(OP, ["x1", "y1", "x2", "y2", "c"], args)?;

    let (w, h) = dimensions(console, handle)?;
    let x1 = in_range(OP, "x1", x1, 0, w)?;
    let y1 = in_range(OP, "y1", y1, 0, h)?;
    let x2 = in_range(OP, "x2", x2, 0, w)?;
    let y2 = in_range(OP, "y2", y2, 0, h)?;
    let c = color_index(OP, "c", c)?;

    console.device_mut(handle)?.buffer_mut().line(x1, y1, x2, y2, c)
}

/// `cls([dev], [c])`: fill the whole buffer, color 0 by default
pub fn cls(console: &mut Console, args: &[Value]) -> Result<(), ConsoleError> {
    const OP: &str = "cls";
    let (handle, args) = split_device(console, OP, args)?;
    let c = match args {
        [] => 0,
        [c] => color_index(OP, "c", integer(OP, "c", c)?)?,
        _ => return Err(count_error(OP, "0 or 1", args.len())),
    };

    console.device_mut(handle)?.buffer_mut().clear(c)
}

pub fn cset(console: &mut Console, args: &[Value]) -> Result<(), ConsoleError> {
    const OP: &str = "cset";
    let (handle, args) = split_device(console, OP, args)?;
    let [c, r, g, b] = integers(OP, ["c", "r", "g", "b"], args)?;

    console.device(handle)?;
    let c = in_range(OP, "c", c, 0, PALETTE_SIZE)? as usize;
    let r = channel(OP, "r", r)?;
    let g = channel(OP, "g", g)?;
    let b = channel(OP, "b", b)?;

    console
        .device_mut(handle)?
        .palette_mut()
        .set_color(c, Rgb::new(r, g, b))
}

pub fn cget(console: &mut Console, args: &[Value]) -> Result<(u8, u8, u8), ConsoleError> {
    const OP: &str = "cget";
    let (handle, args) = split_device(console, OP, args)?;
    let [c] = integers(OP, ["c"], args)?;

    console.device(handle)?;
    let c = in_range(OP, "c", c, 0, PALETTE_SIZE)? as usize;

    let rgb = console.device(handle)?.palette().get_color(c)?;
    Ok((rgb.r, rgb.g, rgb.b))
}

pub fn width(console: &mut Console, args: &[Value]) -> Result<usize, ConsoleError> {
    let (handle, args) = split_device(console, "width", args)?;
    integers("width", [], args)?;
    Ok(console.device(handle)?.buffer().width())
}

pub fn height(console: &mut Console, args: &[Value]) -> Result<usize, ConsoleError> {
    let (handle, args) = split_device(console, "height", args)?;
    integers("height", [], args)?;
    Ok(console.device(handle)?.buffer().height())
}

/// `new(kind, w, h)`: create a device and return its handle
pub fn new_device(console: &mut Console, args: &[Value]) -> Result<DeviceHandle, ConsoleError> {
    const OP: &str = "new";
    let [kind, w, h] = match args {
        [kind, w, h] => [kind, w, h],
        _ => return Err(count_error(OP, "3", args.len())),
    };
    let tag = match kind {
        Value::String(s) => s.to_string_lossy().to_string(),
        other => return Err(type_error(OP, "kind", "string", other)),
    };
    let w = integer(OP, "w", w)?;
    let h = integer(OP, "h", h)?;

    let kind = DeviceKind::from_tag(&tag).ok_or(ConsoleError::UnknownDeviceKind(tag))?;
    let w = in_range(OP, "w", w, 1, MAX_DIMENSION + 1)? as usize;
    let h = in_range(OP, "h", h, 1, MAX_DIMENSION + 1)? as usize;

    let config = console.script_device(kind, w, h);
    console.create_device(&config)
}

/// `free(dev)`: release a device; its handle is dead afterwards
pub fn free_device(console: &mut Console, args: &[Value]) -> Result<(), ConsoleError> {
    const OP: &str = "free";
    match args {
        [dev] => {
            let handle = device_handle(OP, dev)?;
            console.destroy_device(handle)
        }
        _ => Err(count_error(OP, "1", args.len())),
    }
}

pub fn default_device(console: &mut Console, args: &[Value]) -> Result<DeviceHandle, ConsoleError> {
    if !args.is_empty() {
        return Err(count_error("default", "0", args.len()));
    }
    Ok(console.default_device())
}

/// Split an optional leading device handle off the arguments
///
/// Without a handle the call addresses the default device.
fn split_device<'a>(
    console: &Console,
    op: &'static str,
    args: &'a [Value],
) -> Result<(DeviceHandle, &'a [Value]), ConsoleError> {
    match args.first() {
        Some(Value::UserData(_)) => Ok((device_handle(op, &args[0])?, &args[1..])),
        _ => Ok((console.default_device(), args)),
    }
}

fn device_handle(op: &'static str, value: &Value) -> Result<DeviceHandle, ConsoleError> {
    match value {
        Value::UserData(ud) => ud
            .borrow::<DeviceHandle>()
            .map(|handle| *handle)
            .map_err(|_| type_error(op, "device", "device handle", value)),
        other => Err(type_error(op, "device", "device handle", other)),
    }
}

/// Check the count and kind of every argument, in order
fn integers<const N: usize>(
    op: &'static str,
    names: [&'static str; N],
    args: &[Value],
) -> Result<[i64; N], ConsoleError> {
    if args.len() != N {
        return Err(count_error(op, &N.to_string(), args.len()));
    }
    let mut values = [0; N];
    for ((slot, name), value) in values.iter_mut().zip(names).zip(args) {
        *slot = integer(op, name, value)?;
    }
    Ok(values)
}

/// Accepts Lua integers and floats with an exact integer value
fn integer(op: &'static str, arg: &'static str, value: &Value) -> Result<i64, ConsoleError> {
    match *value {
        Value::Integer(n) => Ok(n),
        Value::Number(n) if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 => {
            Ok(n as i64)
        }
        _ => Err(type_error(op, arg, "integer", value)),
    }
}

fn in_range(
    op: &'static str,
    arg: &'static str,
    value: i64,
    min: usize,
    max: usize,
) -> Result<i32, ConsoleError> {
    if value < min as i64 || value >= max as i64 {
        return Err(ConsoleError::out_of_range(
            op,
            arg,
            value,
            min as i64,
            max as i64,
        ));
    }
    Ok(value as i32)
}

fn color_index(op: &'static str, arg: &'static str, value: i64) -> Result<u8, ConsoleError> {
    Ok(in_range(op, arg, value, 0, COLOR_COUNT as usize)? as u8)
}

fn channel(op: &'static str, arg: &'static str, value: i64) -> Result<u8, ConsoleError> {
    Ok(in_range(op, arg, value, 0, 256)? as u8)
}

fn dimensions(console: &Console, handle: DeviceHandle) -> Result<(usize, usize), ConsoleError> {
    let buffer = console.device(handle)?.buffer();
    Ok((buffer.width(), buffer.height()))
}

fn type_error(
    op: &'static str,
    arg: &'static str,
    expected: &'static str,
    found: &Value,
) -> ConsoleError {
    ConsoleError::ArgumentTypeError {
        op,
        arg,
        expected,
        found: found.type_name(),
    }
}

fn count_error(op: &'static str, expected: &str, found: usize) -> ConsoleError {
    ConsoleError::ArgumentCount {
        op,
        expected: expected.to_string(),
        found,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::ConsoleConfig;
    use crate::display::presenter::HeadlessBackend;
    use crate::error::ErrorKind;

    fn setup() -> (Lua, SharedConsole) {
        let console = Console::new(ConsoleConfig::default(), Box::new(HeadlessBackend))
            .unwrap()
            .into_shared();
        let lua = Lua::new();
        register(&lua, &console).unwrap();
        (lua, console)
    }

    fn run(lua: &Lua, code: &str) -> mlua::Result<()> {
        lua.load(code).exec()
    }

    fn error_kind(lua: &Lua, code: &str) -> ErrorKind {
        let err = run(lua, code).unwrap_err();
        console_error(&err)
            .unwrap_or_else(|| panic!("not a console error: {}", err))
            .kind()
    }

    fn default_bytes(console: &SharedConsole) -> Vec<u8> {
        let console = console.borrow();
        let handle = console.default_device();
        console.device(handle).unwrap().buffer().as_bytes().to_vec()
    }

    #[test]
    fn test_pset_draws_on_default_device() {
        let (lua, console) = setup();
        run(&lua, "Screen.pset(3, 4, 7)").unwrap();

        let console = console.borrow();
        let device = console.device(console.default_device()).unwrap();
        assert_eq!(device.buffer().get(3, 4).unwrap(), 7);
    }

    #[test]
    fn test_pset_rejects_out_of_range() {
        let (lua, console) = setup();
        run(&lua, "Screen.pset(1, 1, 5)").unwrap();
        let before = default_bytes(&console);

        for code in [
            "Screen.pset(-1, 0, 1)",
            "Screen.pset(128, 0, 1)",
            "Screen.pset(0, 128, 1)",
            "Screen.pset(0, 0, 16)",
            "Screen.pset(0, 0, -1)",
        ] {
            assert_eq!(error_kind(&lua, code), ErrorKind::ArgumentOutOfRange, "{}", code);
        }
        assert_eq!(default_bytes(&console), before);
    }

    #[test]
    fn test_type_and_count_errors() {
        let (lua, console) = setup();
        let before = default_bytes(&console);

        assert_eq!(error_kind(&lua, "Screen.pset('a', 0, 1)"), ErrorKind::ArgumentTypeError);
        assert_eq!(error_kind(&lua, "Screen.pset(0.5, 0, 1)"), ErrorKind::ArgumentTypeError);
        assert_eq!(error_kind(&lua, "Screen.pset(0, 0)"), ErrorKind::ArgumentTypeError);
        assert_eq!(
            error_kind(&lua, "Screen.rectfill(0, 0, 1, 1, 2, 3)"),
            ErrorKind::ArgumentTypeError
        );
        assert_eq!(default_bytes(&console), before);
    }

    #[test]
    fn test_type_checked_before_range() {
        let (lua, _console) = setup();
        // x is out of range but c has the wrong kind: kind errors win
        assert_eq!(
            error_kind(&lua, "Screen.pset(500, 0, {})"),
            ErrorKind::ArgumentTypeError
        );
    }

    #[test]
    fn test_integral_floats_accepted() {
        let (lua, console) = setup();
        run(&lua, "Screen.pset(2.0, 3.0, 4.0)").unwrap();
        let console = console.borrow();
        let device = console.device(console.default_device()).unwrap();
        assert_eq!(device.buffer().get(2, 3).unwrap(), 4);
    }

    #[test]
    fn test_rectfill_second_corner_rejected_without_writes() {
        let (lua, console) = setup();
        let err = run(&lua, "Screen.rectfill(0, 0, 128, 10, 3)").unwrap_err();
        let console_err = console_error(&err).unwrap();
        assert_eq!(console_err.kind(), ErrorKind::ArgumentOutOfRange);
        assert!(console_err.to_string().contains("rectfill"));
        assert!(console_err.to_string().contains("x2"));
        assert!(default_bytes(&console).iter().all(|&b| b == 0));
    }

    #[test]
    fn test_line_and_pget() {
        let (lua, _console) = setup();
        run(
            &lua,
            r#"
            Screen.line(0, 0, 4, 4, 9)
            for i = 0, 4 do
                assert(Screen.pget(i, i) == 9)
            end
            assert(Screen.pget(1, 0) == 0)
            "#,
        )
        .unwrap();
    }

    #[test]
    fn test_cset_and_cget() {
        let (lua, console) = setup();
        run(
            &lua,
            r#"
            Screen.cset(0, 255, 0, 0)
            local r, g, b = Screen.cget(0)
            assert(r == 255 and g == 0 and b == 0)
            "#,
        )
        .unwrap();

        let palette_before = {
            let console = console.borrow();
            console.device(console.default_device()).unwrap().palette().clone()
        };
        assert_eq!(error_kind(&lua, "Screen.cset(0, 256, 0, 0)"), ErrorKind::ArgumentOutOfRange);
        assert_eq!(error_kind(&lua, "Screen.cset(16, 0, 0, 0)"), ErrorKind::ArgumentOutOfRange);
        assert_eq!(error_kind(&lua, "Screen.cset(0, 0, -1, 0)"), ErrorKind::ArgumentOutOfRange);

        let console = console.borrow();
        let palette = console.device(console.default_device()).unwrap().palette();
        assert_eq!(palette, &palette_before);
    }

    #[test]
    fn test_cls_fills_buffer() {
        let (lua, console) = setup();
        run(&lua, "Screen.cls(5)").unwrap();
        assert!(default_bytes(&console).iter().all(|&b| b == 0x55));
        run(&lua, "Screen.cls()").unwrap();
        assert!(default_bytes(&console).iter().all(|&b| b == 0));
        assert_eq!(error_kind(&lua, "Screen.cls(1, 2)"), ErrorKind::ArgumentTypeError);
    }

    #[test]
    fn test_device_scoped_calls() {
        let (lua, console) = setup();
        run(
            &lua,
            r#"
            dev = Screen.new("screen", 32, 16)
            assert(Screen.width(dev) == 32 and Screen.height(dev) == 16)
            assert(Screen.width() == 128)
            Screen.pset(dev, 31, 15, 2)
            Screen.cset(dev, 2, 1, 2, 3)
            "#,
        )
        .unwrap();

        // bounds follow the addressed device
        assert_eq!(error_kind(&lua, "Screen.pset(dev, 32, 0, 1)"), ErrorKind::ArgumentOutOfRange);
        run(&lua, "Screen.pset(100, 100, 1)").unwrap();

        let console = console.borrow();
        let handles = console.registry().handles();
        let second = handles[1];
        let device = console.device(second).unwrap();
        assert_eq!(device.buffer().get(31, 15).unwrap(), 2);
        assert_eq!(device.palette().get_color(2).unwrap(), Rgb::new(1, 2, 3));

        let default = console.device(console.default_device()).unwrap();
        assert_ne!(default.palette().get_color(2).unwrap(), Rgb::new(1, 2, 3));
    }

    #[test]
    fn test_new_validation() {
        let (lua, _console) = setup();
        assert_eq!(error_kind(&lua, "Screen.new('speaker', 8, 8)"), ErrorKind::ArgumentOutOfRange);
        assert_eq!(error_kind(&lua, "Screen.new('screen', 0, 8)"), ErrorKind::ArgumentOutOfRange);
        assert_eq!(error_kind(&lua, "Screen.new(1, 8, 8)"), ErrorKind::ArgumentTypeError);
        assert_eq!(error_kind(&lua, "Screen.new('screen', 8)"), ErrorKind::ArgumentTypeError);
    }

    #[test]
    fn test_capacity_exceeded() {
        let (lua, _console) = setup();
        run(&lua, "a = Screen.new('screen', 8, 8)").unwrap();
        assert_eq!(
            error_kind(&lua, "b = Screen.new('screen', 8, 8)"),
            ErrorKind::CapacityExceeded
        );
    }

    #[test]
    fn test_free_invalidates_handle() {
        let (lua, console) = setup();
        run(&lua, "dev = Screen.new('screen', 8, 8); Screen.free(dev)").unwrap();
        assert_eq!(console.borrow().registry().len(), 1);

        assert_eq!(error_kind(&lua, "Screen.pset(dev, 0, 0, 1)"), ErrorKind::InvalidHandle);
        assert_eq!(error_kind(&lua, "Screen.free(dev)"), ErrorKind::InvalidHandle);

        // the slot is free again
        run(&lua, "dev2 = Screen.new('screen', 8, 8)").unwrap();
    }

    #[test]
    fn test_free_requires_handle() {
        let (lua, _console) = setup();
        assert_eq!(error_kind(&lua, "Screen.free(1)"), ErrorKind::ArgumentTypeError);
        assert_eq!(error_kind(&lua, "Screen.free()"), ErrorKind::ArgumentTypeError);
    }

    #[test]
    fn test_default_handle() {
        let (lua, console) = setup();
        run(&lua, "Screen.pset(Screen.default(), 0, 0, 3)").unwrap();
        assert_eq!(default_bytes(&console)[0], 0x03);
    }

    #[test]
    fn test_handles_compare_by_device() {
        let (lua, _console) = setup();
        run(
            &lua,
            r#"
            assert(Screen.default() == Screen.default())
            local dev = Screen.new("screen", 8, 8)
            assert(dev ~= Screen.default())
            assert(tostring(Screen.default()) == "device #0:0")
            assert(tostring(dev) == "device #1:0")
            Screen.free(dev)
            local again = Screen.new("screen", 8, 8)
            assert(again ~= dev)
            assert(tostring(again) == "device #1:1")
            "#,
        )
        .unwrap();
    }

    #[test]
    fn test_error_visible_to_pcall() {
        let (lua, _console) = setup();
        run(
            &lua,
            r#"
            local ok, err = pcall(Screen.pset, 0, 0, 16)
            assert(not ok)
            assert(string.find(tostring(err), "pset argument c = 16", 1, true))
            "#,
        )
        .unwrap();
    }
}
