//! The `Script` bridge.

use crate::error::{Error, ErrorKind, ErrorRecord, Result};
use crate::function;
use crate::handle::Handle;
use crate::namespace::{self, Namespace};
use crate::options::ScriptOptions;
use crate::stack::invalid_index;
use crate::value::{self, FromSlot, IntoSlot, TypeTag};
use mlua::{Lua, MultiValue, ObjectLike, Value};
use std::fmt::Write as _;
use std::path::Path;

enum Slot<'h> {
    Owned(Handle),
    Borrowed(&'h Handle),
    Released,
}

/// Bridge to one interpreter.
///
/// A `Script` either owns its interpreter ([`Script::new`]) and tears it down
/// when released or dropped, or is a non-owning view over a handle lent to it
/// ([`Script::attach`]), typically inside a host function. The lifetime `'h`
/// ties a view to the handle it borrows.
///
/// Every fallible operation returns a [`Result`]. Failures are also written
/// to a sticky error record ([`Script::last_error`]) that later successes do
/// not clear.
///
/// # Example
///
/// ```
/// use luaw_core::Script;
///
/// let mut script = Script::new();
/// script.run_string("function Double(x) return 2 * x end").unwrap();
///
/// script.push_global("Double").unwrap();
/// script.push(15).unwrap();
/// script.call(1, 1).unwrap();
/// assert_eq!(script.pop::<i64>().unwrap(), 30);
/// ```
pub struct Script<'h> {
    slot: Slot<'h>,
    last_error: ErrorRecord,
}

impl Script<'static> {
    /// Creates an interpreter with the safe standard libraries opened.
    pub fn new() -> Self {
        let handle = Handle::owned(Lua::new(), ScriptOptions::default().max_stack_depth);
        tracing::debug!("created interpreter");
        Self::from_slot(Slot::Owned(handle))
    }

    pub fn with_options(options: ScriptOptions) -> Result<Self> {
        let handle = Handle::open(&options)?;
        tracing::debug!(?options, "created interpreter");
        Ok(Self::from_slot(Slot::Owned(handle)))
    }
}

impl Default for Script<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'h> Script<'h> {
    fn from_slot(slot: Slot<'h>) -> Self {
        Self {
            slot,
            last_error: ErrorRecord::default(),
        }
    }

    /// Creates a non-owning view over `handle`. No libraries are opened and
    /// releasing the view never tears the interpreter down.
    pub fn attach(handle: &'h Handle) -> Self {
        Self::from_slot(Slot::Borrowed(handle))
    }

    /// Like [`Script::attach`], but a missing handle leaves the view without
    /// an interpreter: every operation then fails with
    /// [`ErrorKind::NoInterpreter`].
    pub fn attach_opt(handle: Option<&'h Handle>) -> Self {
        match handle {
            Some(handle) => Self::attach(handle),
            None => Self::from_slot(Slot::Released),
        }
    }

    /// Whether this bridge owns its interpreter.
    pub fn is_owner(&self) -> bool {
        matches!(self.slot, Slot::Owned(_))
    }

    pub fn handle(&self) -> Option<&Handle> {
        match &self.slot {
            Slot::Owned(handle) => Some(handle),
            Slot::Borrowed(handle) => Some(handle),
            Slot::Released => None,
        }
    }

    /// Tears down an owned interpreter, or detaches a view from a borrowed
    /// one. Releasing twice is a no-op.
    ///
    /// Clones of the engine taken through [`Handle::lua`] keep it alive
    /// until they are dropped too.
    pub fn release(&mut self) {
        match std::mem::replace(&mut self.slot, Slot::Released) {
            Slot::Owned(handle) => {
                drop(handle);
                tracing::debug!("released interpreter");
            }
            Slot::Borrowed(_) => tracing::trace!("detached from borrowed interpreter"),
            Slot::Released => {}
        }
    }

    /// The most recent failure. Not cleared by later successful operations.
    pub fn last_error(&self) -> &ErrorRecord {
        &self.last_error
    }

    fn with_handle<T>(&mut self, op: impl FnOnce(&Handle) -> Result<T>) -> Result<T> {
        let result = match &self.slot {
            Slot::Owned(handle) => op(handle),
            Slot::Borrowed(handle) => op(handle),
            Slot::Released => Err(Error::no_interpreter()),
        };
        if let Err(err) = &result {
            self.last_error.record(err);
        }
        result
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Compiles and runs a chunk of source text.
    ///
    /// The text doubles as the chunk name, so messages locate errors as
    /// `[string "first line..."]:line:`.
    ///
    /// Values returned by the chunk are discarded, so a successful run leaves
    /// the stack as it found it.
    pub fn run_string(&mut self, source: &str) -> Result<()> {
        self.with_handle(|handle| {
            tracing::debug!(bytes = source.len(), "running chunk");
            handle.lua().load(source).set_name(source).exec()?;
            Ok(())
        })
    }

    /// Reads, compiles and runs a script file.
    ///
    /// A leading UTF-8 byte order mark is skipped, and so is a first line
    /// starting with `#` (such as `#!/usr/bin/env lua`). The line break is
    /// kept so reported line numbers match the file.
    pub fn run_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.with_handle(|handle| {
            let source = std::fs::read(path).map_err(|err| {
                Error::new(
                    ErrorKind::File,
                    format!("cannot open {}: {}", path.display(), err),
                )
            })?;
            let source = strip_file_prelude(source);
            tracing::debug!(path = %path.display(), "running file");
            handle
                .lua()
                .load(source)
                .set_name(format!("@{}", path.display()))
                .exec()?;
            Ok(())
        })
    }

    // ========================================================================
    // Invocation
    // ========================================================================

    /// Calls the value sitting below the top `args` values, passing those
    /// values as arguments.
    ///
    /// The callee and its arguments are consumed whether or not the call
    /// succeeds. On success every value the callee returned is pushed, first
    /// result deepest, and their count is returned; `expected` is advisory
    /// only, so read results from the top rather than assuming how many came
    /// back.
    ///
    /// Fails with [`ErrorKind::Stack`], without calling anything, when the
    /// stack holds fewer than `args + 1` values.
    pub fn call(&mut self, args: usize, expected: usize) -> Result<usize> {
        self.with_handle(|handle| {
            let mut values = {
                let mut stack = handle.stack_mut();
                let depth = stack.len();
                let taken = args.checked_add(1).and_then(|count| stack.split_top(count));
                taken.ok_or_else(|| {
                    Error::stack(format!(
                        "call needs a function and {} arguments but the stack has {} values",
                        args, depth
                    ))
                })?
            };
            let callee = values.remove(0);

            tracing::trace!(callee = %TypeTag::of(&callee), args, "calling");
            let results = invoke(callee, values)?;

            let count = results.len();
            if count != expected {
                tracing::trace!(expected, count, "call returned a different number of results");
            }

            let mut stack = handle.stack_mut();
            if stack.len() + count > stack.capacity() {
                return Err(Error::stack(format!(
                    "stack overflow: {} results do not fit",
                    count
                )));
            }
            for result in results {
                stack.push(result)?;
            }
            Ok(count)
        })
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Installs a host function as the global `name`, replacing any previous
    /// binding.
    pub fn register<F>(&mut self, name: &str, func: F) -> Result<()>
    where
        F: Fn(&Handle) -> Result<usize> + 'static,
    {
        self.with_handle(|handle| {
            let lua = handle.lua();
            let function = function::create(lua, name, func)?;
            lua.globals().set(name, function)?;
            tracing::debug!(name, "registered host function");
            Ok(())
        })
    }

    /// Installs every binding of `namespace` on one global table.
    pub fn register_namespace(&mut self, namespace: Namespace) -> Result<()> {
        self.with_handle(|handle| {
            tracing::debug!(name = namespace.name(), "registering namespace");
            namespace.install(handle.lua())
        })
    }

    // ========================================================================
    // Globals
    // ========================================================================

    /// Reads a global coerced to `T`.
    ///
    /// An unset global reads as `T`'s zero-equivalent; use `Option<T>` to
    /// tell the two apart.
    pub fn get_global<T: FromSlot>(&mut self, name: &str) -> Result<T> {
        self.with_handle(|handle| {
            let value = global(handle, name)?;
            T::from_slot(handle.lua(), value)
        })
    }

    pub fn set_global(&mut self, name: &str, value: impl IntoSlot) -> Result<()> {
        self.with_handle(|handle| {
            let lua = handle.lua();
            let value = value.into_slot(lua)?;
            lua.globals().set(name, value)?;
            Ok(())
        })
    }

    // ========================================================================
    // Stack
    // ========================================================================

    pub fn stack_size(&mut self) -> Result<usize> {
        self.with_handle(|handle| Ok(handle.stack().len()))
    }

    pub fn clear_stack(&mut self) -> Result<()> {
        self.with_handle(|handle| {
            handle.stack_mut().clear();
            Ok(())
        })
    }

    /// Lists every slot from bottom to top with its type tag.
    pub fn dump_stack(&mut self) -> Result<String> {
        self.with_handle(|handle| {
            let stack = handle.stack();
            let mut out = format!("stack dump ({}):\n", stack.len());
            for (i, value) in stack.iter().enumerate() {
                let _ = writeln!(out, "{}: {}", i + 1, value::describe(value));
            }
            tracing::debug!("{}", out);
            Ok(out)
        })
    }

    pub fn type_of(&mut self, index: i32) -> Result<TypeTag> {
        self.with_handle(|handle| {
            let stack = handle.stack();
            let tag = stack.get(index).map(TypeTag::of);
            tag.ok_or_else(|| invalid_index(index, stack.len()))
        })
    }

    pub fn push(&mut self, value: impl IntoSlot) -> Result<()> {
        self.with_handle(|handle| {
            let value = value.into_slot(handle.lua())?;
            handle.stack_mut().push(value)
        })
    }

    pub fn push_nil(&mut self) -> Result<()> {
        self.push(value::Nil)
    }

    /// Pushes the current value of a global (`nil` if unset).
    pub fn push_global(&mut self, name: &str) -> Result<()> {
        self.with_handle(|handle| {
            let value = global(handle, name)?;
            handle.stack_mut().push(value)
        })
    }

    /// Pushes a copy of the value at `index`.
    pub fn push_value(&mut self, index: i32) -> Result<()> {
        self.with_handle(|handle| handle.stack_mut().push_copy(index))
    }

    /// Creates an object of a registered namespace carrying `data` and pushes it.
    pub fn push_instance<T: 'static>(&mut self, namespace: &str, data: T) -> Result<()> {
        self.with_handle(|handle| {
            let object = namespace::instance(handle.lua(), namespace, data)?;
            handle.stack_mut().push(object)
        })
    }

    /// Removes the top value and returns it coerced to `T`.
    ///
    /// Popping an empty stack returns the zero-equivalent and changes nothing.
    pub fn pop<T: FromSlot>(&mut self) -> Result<T> {
        self.with_handle(|handle| {
            let popped = handle.stack_mut().pop();
            match popped {
                Some(value) => T::from_slot(handle.lua(), value),
                None => Ok(T::zero()),
            }
        })
    }

    /// Removes up to `count` values from the top.
    pub fn pop_n(&mut self, count: usize) -> Result<()> {
        self.with_handle(|handle| {
            handle.stack_mut().pop_n(count);
            Ok(())
        })
    }

    /// Reads the top value without removing it; zero-equivalent when empty.
    pub fn peek<T: FromSlot>(&mut self) -> Result<T> {
        self.with_handle(|handle| {
            let top = handle.stack().peek().cloned();
            match top {
                Some(value) => T::from_slot(handle.lua(), value),
                None => Ok(T::zero()),
            }
        })
    }

    /// Reads the value at `index` without removing it.
    ///
    /// Fails with [`ErrorKind::Stack`] if `index` addresses no slot.
    pub fn get<T: FromSlot>(&mut self, index: i32) -> Result<T> {
        self.with_handle(|handle| {
            let value = slot(handle, index)?;
            T::from_slot(handle.lua(), value)
        })
    }

    /// Reads back the host data of the object at `index`.
    pub fn instance<T: Clone + 'static>(&mut self, index: i32) -> Result<T> {
        self.with_handle(|handle| namespace::instance_data(&slot(handle, index)?))
    }
}

impl Drop for Script<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Script<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Script")
            .field("owner", &self.is_owner())
            .field("handle", &self.handle())
            .field("last_error", &self.last_error)
            .finish()
    }
}

fn global(handle: &Handle, name: &str) -> Result<Value> {
    Ok(handle.lua().globals().get::<Value>(name)?)
}

fn slot(handle: &Handle, index: i32) -> Result<Value> {
    let stack = handle.stack();
    let value = stack.get(index).cloned();
    value.ok_or_else(|| invalid_index(index, stack.len()))
}

fn invoke(callee: Value, args: Vec<Value>) -> Result<Vec<Value>> {
    let args = MultiValue::from_vec(args);
    let results: MultiValue = match callee {
        Value::Function(function) => function.call(args)?,
        Value::Table(table) => table.call(args)?,
        Value::UserData(data) => data.call(args)?,
        other => {
            return Err(Error::runtime(format!(
                "attempt to call a {} value",
                TypeTag::of(&other)
            )));
        }
    };
    Ok(results.into_iter().collect())
}

/// Drops what the engine's file loader skips before compiling: a byte order
/// mark and a `#` first line, keeping that line's newline.
fn strip_file_prelude(mut source: Vec<u8>) -> Vec<u8> {
    const BOM: &[u8] = b"\xEF\xBB\xBF";
    if source.starts_with(BOM) {
        source.drain(..BOM.len());
    }
    if source.first() == Some(&b'#') {
        let end = source
            .iter()
            .position(|&byte| byte == b'\n')
            .unwrap_or(source.len());
        source.drain(..end);
    }
    source
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_logging;

    #[test]
    fn test_release_is_idempotent() {
        init_test_logging();
        let mut script = Script::new();
        assert!(script.is_owner());

        script.release();
        assert!(script.handle().is_none());
        script.release();

        let err = script.stack_size().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoInterpreter);
        assert_eq!(script.last_error().kind(), ErrorKind::NoInterpreter);
    }

    #[test]
    fn test_releasing_a_view_keeps_the_interpreter() {
        let mut owner = Script::new();
        owner.set_global("answer", 42).unwrap();

        let handle = owner.handle().unwrap();
        let mut view = Script::attach(handle);
        assert!(!view.is_owner());
        assert_eq!(view.get_global::<i64>("answer").unwrap(), 42);
        view.release();
        assert_eq!(view.get_global::<i64>("answer").unwrap_err().kind(), ErrorKind::NoInterpreter);
        drop(view);

        assert_eq!(owner.get_global::<i64>("answer").unwrap(), 42);
    }

    #[test]
    fn test_missing_handle() {
        let mut script = Script::attach_opt(None);
        assert!(script.handle().is_none());
        assert_eq!(script.push(1).unwrap_err().kind(), ErrorKind::NoInterpreter);
        assert_eq!(script.run_string("x = 1").unwrap_err().kind(), ErrorKind::NoInterpreter);
    }

    #[test]
    fn test_view_shares_the_stack() {
        let mut owner = Script::new();
        owner.push(1).unwrap();

        let handle = owner.handle().unwrap();
        let mut view = Script::attach(handle);
        view.push(2).unwrap();
        assert_eq!(view.stack_size().unwrap(), 2);
        drop(view);

        assert_eq!(owner.pop::<i64>().unwrap(), 2);
        assert_eq!(owner.pop::<i64>().unwrap(), 1);
    }

    #[test]
    fn test_base_libraries_only() {
        let options = ScriptOptions {
            libraries: crate::Libraries::Base,
            ..ScriptOptions::default()
        };
        let mut script = Script::with_options(options).unwrap();
        script.run_string("has_math = math ~= nil; has_print = print ~= nil").unwrap();
        assert!(!script.get_global::<bool>("has_math").unwrap());
        assert!(script.get_global::<bool>("has_print").unwrap());
    }

    #[test]
    fn test_stack_depth_limit() {
        let options = ScriptOptions {
            max_stack_depth: 2,
            ..ScriptOptions::default()
        };
        let mut script = Script::with_options(options).unwrap();
        script.push(1).unwrap();
        script.push(2).unwrap();
        assert_eq!(script.push(3).unwrap_err().kind(), ErrorKind::Stack);
        assert_eq!(script.stack_size().unwrap(), 2);
    }

    #[test]
    fn test_strip_file_prelude() {
        fn strip(text: &[u8]) -> Vec<u8> {
            strip_file_prelude(text.to_vec())
        }
        assert_eq!(strip(b"#!/usr/bin/env lua\nx = 1\n"), b"\nx = 1\n");
        assert_eq!(strip(b"\xEF\xBB\xBFx = 1"), b"x = 1");
        assert_eq!(strip(b"\xEF\xBB\xBF# comment"), b"");
        assert_eq!(strip(b"x = 1 # not a comment"), b"x = 1 # not a comment");
        assert_eq!(strip(b""), b"");
    }
}
