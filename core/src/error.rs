//! Error taxonomy for the bridge.
//!
//! Every failure the engine can report, plus the few the bridge detects on
//! its own, is classified into an [`ErrorKind`]. The engine reports errors by
//! convention (a status code and a message left on its stack); both reach the
//! host as one [`Error`] value carrying the classification and the text.

use std::fmt;

/// Status codes used by the engine's load and call primitives.
pub mod status {
    pub const OK: i32 = 0;
    pub const YIELD: i32 = 1;
    pub const ERRRUN: i32 = 2;
    pub const ERRSYNTAX: i32 = 3;
    pub const ERRMEM: i32 = 4;
    pub const ERRGCMM: i32 = 5;
    pub const ERRERR: i32 = 6;
    pub const ERRFILE: i32 = 7;
}

/// Message the engine produces when its message handler itself fails.
const MESSAGE_HANDLER_FAILURE: &str = "error in error handling";

/// Classification of an operation's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorKind {
    /// No error. Only ever observed on a fresh error record.
    #[default]
    None,
    /// The script raised or triggered a runtime fault.
    Runtime,
    /// The script failed to parse or compile.
    Syntax,
    /// Execution was suspended rather than completed.
    Yield,
    /// Bridge-local stack precondition violation.
    Stack,
    /// Allocation failure inside the engine.
    Memory,
    /// Failure while the engine's own message handler was running.
    MessageHandler,
    /// Failure inside a collection finalizer.
    GarbageCollector,
    /// The bridge has no interpreter handle (released or never attached).
    NoInterpreter,
    /// A script file could not be opened or read.
    File,
    /// A status code the bridge does not recognize.
    Unknown(i32),
}

impl ErrorKind {
    /// Classify an engine status code.
    ///
    /// Total over `i32`: `OK` is [`ErrorKind::None`], every other code maps to
    /// exactly one failure kind, and codes outside the engine's table become
    /// [`ErrorKind::Unknown`] instead of passing for success.
    ///
    /// mlua does not expose raw status codes, so engine errors are first
    /// mapped back to the code that produced them and then classified here.
    pub fn from_status(code: i32) -> Self {
        match code {
            status::OK => ErrorKind::None,
            status::YIELD => ErrorKind::Yield,
            status::ERRRUN => ErrorKind::Runtime,
            status::ERRSYNTAX => ErrorKind::Syntax,
            status::ERRMEM => ErrorKind::Memory,
            status::ERRGCMM => ErrorKind::GarbageCollector,
            status::ERRERR => ErrorKind::MessageHandler,
            status::ERRFILE => ErrorKind::File,
            other => ErrorKind::Unknown(other),
        }
    }

    /// Whether this kind denotes success.
    pub fn is_none(self) -> bool {
        self == ErrorKind::None
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::None => write!(f, "no error"),
            ErrorKind::Runtime => write!(f, "runtime error"),
            ErrorKind::Syntax => write!(f, "syntax error"),
            ErrorKind::Yield => write!(f, "execution yielded"),
            ErrorKind::Stack => write!(f, "stack error"),
            ErrorKind::Memory => write!(f, "memory error"),
            ErrorKind::MessageHandler => write!(f, "error in message handler"),
            ErrorKind::GarbageCollector => write!(f, "garbage collector error"),
            ErrorKind::NoInterpreter => write!(f, "no interpreter"),
            ErrorKind::File => write!(f, "file error"),
            ErrorKind::Unknown(code) => write!(f, "unknown status {}", code),
        }
    }
}

/// A classified failure together with its human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime, message)
    }

    pub fn stack(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Stack, message)
    }

    pub fn no_interpreter() -> Self {
        Self::new(ErrorKind::NoInterpreter, "interpreter handle is not available")
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<mlua::Error> for Error {
    fn from(err: mlua::Error) -> Self {
        let kind = classify(&err);
        tracing::debug!(%kind, "engine reported an error");
        Error::new(kind, err.to_string())
    }
}

/// Map an engine error onto the taxonomy, looking through callback and
/// context wrappers to the underlying cause.
fn classify(err: &mlua::Error) -> ErrorKind {
    match err {
        mlua::Error::CallbackError { cause, .. } => classify(cause),
        mlua::Error::WithContext { cause, .. } => classify(cause),
        mlua::Error::ExternalError(inner) => match inner.downcast_ref::<Error>() {
            Some(own) if !own.kind.is_none() => own.kind,
            _ => ErrorKind::from_status(status::ERRRUN),
        },
        other => ErrorKind::from_status(status_of(other)),
    }
}

/// Recovers the status code mlua consumed while converting the failure.
fn status_of(err: &mlua::Error) -> i32 {
    match err {
        mlua::Error::SyntaxError { .. } => status::ERRSYNTAX,
        mlua::Error::MemoryError(_) => status::ERRMEM,
        // A script may raise this text itself; only the bare engine message counts.
        mlua::Error::RuntimeError(message) if message.trim() == MESSAGE_HANDLER_FAILURE => {
            status::ERRERR
        }
        _ => status::ERRRUN,
    }
}

/// The sticky error record kept by a [`crate::Script`].
///
/// Overwritten by every failing operation and left alone by successful ones,
/// so a read after a later success still returns the older failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorRecord {
    kind: ErrorKind,
    message: String,
}

impl ErrorRecord {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn record(&mut self, error: &Error) {
        self.kind = error.kind;
        self.message.clear();
        self.message.push_str(&error.message);
    }
}
