//! Host functions callable from scripts.
//!
//! A host function receives the shared interpreter [`Handle`] with a frame
//! holding exactly its arguments (first argument at index `1`), pushes its
//! results onto that frame, and returns how many of the top values are
//! results. The engine reads that count, not the bridge.
//!
//! # Example
//!
//! ```
//! use luaw_core::{Handle, Result, Script};
//!
//! fn sum(handle: &Handle) -> Result<usize> {
//!     let mut lua = Script::attach(handle);
//!     let mut total = 0i64;
//!     for _ in 0..lua.stack_size()? {
//!         total += lua.pop::<i64>()?;
//!     }
//!     lua.push(total)?;
//!     Ok(1)
//! }
//!
//! let mut script = Script::new();
//! script.register("Sum", sum).unwrap();
//! script.run_string("total = Sum(1, 2, 3)").unwrap();
//! assert_eq!(script.get_global::<i64>("total").unwrap(), 6);
//! ```

use crate::error::{Error, Result};
use crate::handle::Handle;
use mlua::{Lua, MultiValue};

/// Boxed host function, as stored in a [`crate::Namespace`].
pub type BoxedHostFunction = Box<dyn Fn(&Handle) -> Result<usize>>;

/// Wraps a host function into an engine function value.
///
/// Every invocation gets a fresh, non-owning frame over the same engine, so
/// nested calls back into scripts see the identical global namespace.
pub(crate) fn create<F>(lua: &Lua, name: &str, func: F) -> Result<mlua::Function>
where
    F: Fn(&Handle) -> Result<usize> + 'static,
{
    let name = name.to_string();
    let function = lua.create_function(move |lua, args: MultiValue| {
        let frame = Handle::frame(lua, args.into_iter().collect());
        tracing::trace!(function = %name, arguments = frame.stack().len(), "host function invoked");

        let count = func(&frame).map_err(mlua::Error::external)?;

        let depth = frame.stack().len();
        let results = frame.stack_mut().split_top(count).ok_or_else(|| {
            mlua::Error::external(Error::stack(format!(
                "host function '{}' returned {} results but left {} values on the stack",
                name, count, depth
            )))
        })?;
        Ok(MultiValue::from_vec(results))
    })?;
    Ok(function)
}
