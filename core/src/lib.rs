//! Host bridge to an embedded Lua interpreter.
//!
//! The [`Script`] type owns (or borrows) one interpreter and exposes it the
//! way the engine's own foreign interface does: values cross the boundary by
//! being pushed to and popped from a shared, position-addressed stack; globals
//! are read and written by name; host functions are registered under global
//! names and receive their arguments on a fresh stack frame.
//!
//! Every failure is classified into an [`ErrorKind`].

pub mod error;
pub mod function;
pub mod handle;
pub mod namespace;
pub mod options;
pub mod script;
pub mod stack;
pub mod value;

pub use error::{Error, ErrorKind, ErrorRecord, Result};
pub use function::BoxedHostFunction;
pub use handle::Handle;
pub use namespace::Namespace;
pub use options::{Libraries, ScriptOptions};
pub use script::Script;
pub use value::{FromSlot, IntoSlot, Nil, TypeTag};

/// Re-exported engine crate, for direct manipulation of a [`Handle`].
pub use mlua;

/// Test utilities for enabling logging in tests
#[cfg(test)]
pub mod test_utils {
    /// Initialize tracing subscriber for tests with DEBUG level
    /// Call this at the start of tests where you want to see logging output
    pub fn init_test_logging() {
        use tracing_subscriber::{EnvFilter, fmt};

        // Try to initialize, ignore error if already initialized
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }
}
