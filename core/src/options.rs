//! Configuration options for owned interpreters.

/// Which engine standard libraries an owned interpreter opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Libraries {
    /// Every library the engine considers safe (string, table, math, io,
    /// os, coroutine, utf8, package).
    #[default]
    Safe,
    /// Only the base library.
    Base,
}

impl Libraries {
    pub(crate) fn std_lib(self) -> mlua::StdLib {
        match self {
            Libraries::Safe => mlua::StdLib::ALL_SAFE,
            Libraries::Base => mlua::StdLib::NONE,
        }
    }
}

/// Configuration for creating an owned [`crate::Script`].
///
/// # Example
///
/// ```
/// use luaw_core::{Libraries, ScriptOptions};
///
/// let options = ScriptOptions {
///     libraries: Libraries::Base,
///     max_stack_depth: 64,
/// };
/// ```
#[derive(Debug, Clone)]
pub struct ScriptOptions {
    /// Standard libraries opened at creation.
    ///
    /// Default: [`Libraries::Safe`]
    pub libraries: Libraries,

    /// Maximum number of values a single stack frame may hold.
    ///
    /// Default: 1000
    pub max_stack_depth: usize,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            libraries: Libraries::default(),
            max_stack_depth: 1000,
        }
    }
}
