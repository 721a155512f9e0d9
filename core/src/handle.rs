//! The interpreter handle shared between the host and host functions.

use crate::options::ScriptOptions;
use crate::stack::Stack;
use mlua::{Lua, Value};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;

/// Frame depth limit, stored in the engine so callback frames inherit it.
#[derive(Debug, Clone, Copy)]
struct FrameLimit(usize);

/// One running engine instance together with the stack frame host code
/// operates on.
///
/// A handle is created by an owning [`crate::Script`], or by the engine's
/// dispatch each time a registered host function is invoked. In the second
/// case the frame holds exactly the arguments of that invocation and the
/// handle is only lent to the host function for the duration of the call.
pub struct Handle {
    lua: Lua,
    stack: RefCell<Stack<Value>>,
}

impl Handle {
    pub(crate) fn open(options: &ScriptOptions) -> crate::Result<Self> {
        let lua = Lua::new_with(options.libraries.std_lib(), mlua::LuaOptions::default())?;
        Ok(Self::owned(lua, options.max_stack_depth))
    }

    /// Wraps a freshly created engine as the bottom frame of its owner.
    pub(crate) fn owned(lua: Lua, max_stack_depth: usize) -> Self {
        lua.set_app_data(FrameLimit(max_stack_depth));
        Self {
            lua,
            stack: RefCell::new(Stack::new(max_stack_depth)),
        }
    }

    /// Builds the frame for one host-function invocation.
    pub(crate) fn frame(lua: &Lua, args: Vec<Value>) -> Self {
        let limit = lua
            .app_data_ref::<FrameLimit>()
            .map(|limit| limit.0)
            .unwrap_or(ScriptOptions::default().max_stack_depth);
        Self {
            lua: lua.clone(),
            stack: RefCell::new(Stack::with_items(args, limit)),
        }
    }

    /// The underlying engine, for operations the bridge does not wrap.
    ///
    /// `Lua` is reference counted: a clone kept by the caller outlives
    /// [`crate::Script::release`] and keeps the interpreter running.
    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    pub(crate) fn stack(&self) -> Ref<'_, Stack<Value>> {
        self.stack.borrow()
    }

    pub(crate) fn stack_mut(&self) -> RefMut<'_, Stack<Value>> {
        self.stack.borrow_mut()
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("depth", &self.stack.borrow().len())
            .finish_non_exhaustive()
    }
}
