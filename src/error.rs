// Console errors
//
// A single error type shared by the framebuffer, the device registry and the
// Lua bindings. Binding failures travel into Lua as external errors, so the
// `Display` output is what scripts see.

use crate::device::DeviceHandle;
use std::fmt;
use std::io;

/// Broad error categories surfaced to scripts and to the process entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Coordinate, color index or channel outside its declared bounds
    ArgumentOutOfRange,
    /// Wrong value kind (or wrong number of values) at the script boundary
    ArgumentTypeError,
    /// Unknown or already-released device handle
    InvalidHandle,
    /// Device registry is full
    CapacityExceeded,
    /// Native graphics backend or surface failure (fatal)
    SubsystemInitFailure,
    /// Error raised from the top-level script or the per-frame hook
    ScriptRuntimeError,
    /// Unreadable script or configuration file
    Io,
}

/// Errors produced by the console core
#[derive(Debug)]
pub enum ConsoleError {
    /// Numeric argument outside `[min, max)`
    ArgumentOutOfRange {
        op: &'static str,
        arg: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// Argument of the wrong kind
    ArgumentTypeError {
        op: &'static str,
        arg: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// Wrong number of arguments
    ArgumentCount {
        op: &'static str,
        expected: String,
        found: usize,
    },

    /// Device kind tag not recognized
    UnknownDeviceKind(String),

    /// Handle does not denote a live device
    InvalidHandle(DeviceHandle),

    /// Registry already holds its maximum number of devices
    CapacityExceeded { max: usize },

    /// Native backend could not be initialized or a surface could not be created
    SubsystemInitFailure(String),

    /// Presenting a frame to a native surface failed
    Present(String),

    /// Lua error from the script or its draw hook
    ScriptRuntimeError(String),

    /// Configuration file could not be parsed or written
    Config(String),

    /// I/O error
    Io(io::Error),
}

impl ConsoleError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConsoleError::ArgumentOutOfRange { .. } | ConsoleError::UnknownDeviceKind(_) => {
                ErrorKind::ArgumentOutOfRange
            }
            ConsoleError::ArgumentTypeError { .. } | ConsoleError::ArgumentCount { .. } => {
                ErrorKind::ArgumentTypeError
            }
            ConsoleError::InvalidHandle(_) => ErrorKind::InvalidHandle,
            ConsoleError::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            ConsoleError::SubsystemInitFailure(_) | ConsoleError::Present(_) => {
                ErrorKind::SubsystemInitFailure
            }
            ConsoleError::ScriptRuntimeError(_) => ErrorKind::ScriptRuntimeError,
            ConsoleError::Config(_) | ConsoleError::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether the session can continue after this error
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::SubsystemInitFailure
    }

    /// Process exit code used when this error ends the program
    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::SubsystemInitFailure => 3,
            _ => 1,
        }
    }

    pub(crate) fn out_of_range(
        op: &'static str,
        arg: &'static str,
        value: i64,
        min: i64,
        max: i64,
    ) -> Self {
        ConsoleError::ArgumentOutOfRange {
            op,
            arg,
            value,
            min,
            max,
        }
    }
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleError::ArgumentOutOfRange {
                op,
                arg,
                value,
                min,
                max,
            } => write!(
                f,
                "Screen error: {} argument {} = {} out of bound [{}, {})",
                op, arg, value, min, max
            ),
            ConsoleError::ArgumentTypeError {
                op,
                arg,
                expected,
                found,
            } => write!(
                f,
                "Screen error: {} argument {} expected {}, got {}",
                op, arg, expected, found
            ),
            ConsoleError::ArgumentCount { op, expected, found } => write!(
                f,
                "Screen error: {} expects {} arguments, got {}",
                op, expected, found
            ),
            ConsoleError::UnknownDeviceKind(tag) => {
                write!(f, "Screen error: new argument kind: unknown device kind {:?}", tag)
            }
            ConsoleError::InvalidHandle(handle) => {
                write!(f, "Screen error: invalid device handle {}", handle)
            }
            ConsoleError::CapacityExceeded { max } => {
                write!(f, "Screen error: device limit of {} reached", max)
            }
            ConsoleError::SubsystemInitFailure(msg) => {
                write!(f, "Graphics initialization failed: {}", msg)
            }
            ConsoleError::Present(msg) => write!(f, "Present failed: {}", msg),
            ConsoleError::ScriptRuntimeError(msg) => write!(f, "Lua error: {}", msg),
            ConsoleError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ConsoleError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ConsoleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConsoleError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ConsoleError {
    fn from(e: io::Error) -> Self {
        ConsoleError::Io(e)
    }
}

impl From<mlua::Error> for ConsoleError {
    fn from(e: mlua::Error) -> Self {
        ConsoleError::ScriptRuntimeError(e.to_string())
    }
}
