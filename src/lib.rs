//! luaw - host bridge to an embedded Lua interpreter
//!
//! # Overview
//!
//! A [`Script`] owns one interpreter (or borrows one inside a host function)
//! and speaks the engine's stack protocol: push values, call, pop results,
//! read and write globals, register host functions. Every failure comes back
//! as an [`Error`] classified by [`ErrorKind`].
//!
//! # Quick Start
//!
//! ```
//! use luaw::{Handle, Result, Script};
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
//! script.run_string("function Foo(x) return Sum(x, x) end").unwrap();
//!
//! script.push_global("Foo").unwrap();
//! script.push(15).unwrap();
//! script.call(1, 1).unwrap();
//! assert_eq!(script.pop::<i64>().unwrap(), 30);
//! ```

mod error_renderer;

pub use error_renderer::{render_error, render_error_to, render_error_to_string_no_color};

// Re-export public API from luaw_core
pub use luaw_core::{
    BoxedHostFunction, Error, ErrorKind, ErrorRecord, FromSlot, Handle, IntoSlot, Libraries,
    Namespace, Nil, Result, Script, ScriptOptions, TypeTag, mlua,
};
