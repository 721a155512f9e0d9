//! Conversions between host-native kinds and tagged stack values.
//!
//! Values on the stack are the engine's own tagged values ([`mlua::Value`]).
//! The bridge converts only booleans, integers, floats, text and functions;
//! anything else can be read back unconverted as a [`Value`] and inspected
//! through its [`TypeTag`].
//!
//! Reading follows the engine's permissive coercion rules: numeric-looking
//! text converts to a number, numbers convert to text, and every value has a
//! truthiness where only `nil` and `false` are false. A value that cannot be
//! coerced reads as the kind's zero-equivalent (`false`, `0`, `0.0`, `""`).

use crate::error::Result;
use mlua::{Lua, Value};
use std::fmt;

/// The engine's type tag for a stack slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Nil,
    Boolean,
    Number,
    String,
    Function,
    Table,
    UserData,
    Thread,
    LightUserData,
}

impl TypeTag {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Nil => TypeTag::Nil,
            Value::Boolean(_) => TypeTag::Boolean,
            Value::Integer(_) | Value::Number(_) => TypeTag::Number,
            Value::String(_) => TypeTag::String,
            Value::Function(_) => TypeTag::Function,
            Value::Table(_) => TypeTag::Table,
            Value::Thread(_) => TypeTag::Thread,
            Value::LightUserData(_) => TypeTag::LightUserData,
            _ => TypeTag::UserData,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Nil => "nil",
            TypeTag::Boolean => "boolean",
            TypeTag::Number => "number",
            TypeTag::String => "string",
            TypeTag::Function => "function",
            TypeTag::Table => "table",
            TypeTag::UserData => "user data",
            TypeTag::Thread => "thread",
            TypeTag::LightUserData => "light user data",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Marker for pushing `nil`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Nil;

/// A host value that can be placed on the stack.
pub trait IntoSlot {
    fn into_slot(self, lua: &Lua) -> Result<Value>;
}

/// A host kind that can be read from a stack slot.
pub trait FromSlot: Sized {
    /// The value read from an empty stack or an uncoercible slot.
    fn zero() -> Self;

    fn from_slot(lua: &Lua, value: Value) -> Result<Self>;
}

impl IntoSlot for Nil {
    fn into_slot(self, _lua: &Lua) -> Result<Value> {
        Ok(Value::Nil)
    }
}

impl IntoSlot for bool {
    fn into_slot(self, _lua: &Lua) -> Result<Value> {
        Ok(Value::Boolean(self))
    }
}

impl IntoSlot for i64 {
    fn into_slot(self, _lua: &Lua) -> Result<Value> {
        Ok(Value::Integer(self))
    }
}

impl IntoSlot for i32 {
    fn into_slot(self, _lua: &Lua) -> Result<Value> {
        Ok(Value::Integer(i64::from(self)))
    }
}

impl IntoSlot for f64 {
    fn into_slot(self, _lua: &Lua) -> Result<Value> {
        Ok(Value::Number(self))
    }
}

impl IntoSlot for &str {
    fn into_slot(self, lua: &Lua) -> Result<Value> {
        Ok(Value::String(lua.create_string(self)?))
    }
}

impl IntoSlot for String {
    fn into_slot(self, lua: &Lua) -> Result<Value> {
        self.as_str().into_slot(lua)
    }
}

impl IntoSlot for &String {
    fn into_slot(self, lua: &Lua) -> Result<Value> {
        self.as_str().into_slot(lua)
    }
}

impl IntoSlot for mlua::Function {
    fn into_slot(self, _lua: &Lua) -> Result<Value> {
        Ok(Value::Function(self))
    }
}

impl IntoSlot for Value {
    fn into_slot(self, _lua: &Lua) -> Result<Value> {
        Ok(self)
    }
}

impl<T: IntoSlot> IntoSlot for Option<T> {
    fn into_slot(self, lua: &Lua) -> Result<Value> {
        match self {
            Some(value) => value.into_slot(lua),
            None => Ok(Value::Nil),
        }
    }
}

impl FromSlot for bool {
    fn zero() -> Self {
        false
    }

    fn from_slot(_lua: &Lua, value: Value) -> Result<Self> {
        Ok(!matches!(value, Value::Nil | Value::Boolean(false)))
    }
}

impl FromSlot for i64 {
    fn zero() -> Self {
        0
    }

    fn from_slot(lua: &Lua, value: Value) -> Result<Self> {
        Ok(lua.coerce_integer(value)?.unwrap_or_else(Self::zero))
    }
}

impl FromSlot for f64 {
    fn zero() -> Self {
        0.0
    }

    fn from_slot(lua: &Lua, value: Value) -> Result<Self> {
        Ok(lua.coerce_number(value)?.unwrap_or_else(Self::zero))
    }
}

impl FromSlot for String {
    fn zero() -> Self {
        String::new()
    }

    fn from_slot(lua: &Lua, value: Value) -> Result<Self> {
        Ok(match lua.coerce_string(value)? {
            Some(text) => String::from(text.to_string_lossy()),
            None => Self::zero(),
        })
    }
}

impl FromSlot for Value {
    fn zero() -> Self {
        Value::Nil
    }

    fn from_slot(_lua: &Lua, value: Value) -> Result<Self> {
        Ok(value)
    }
}

/// Distinguishes an absent (`nil`) slot from a zero-equivalent one.
impl<T: FromSlot> FromSlot for Option<T> {
    fn zero() -> Self {
        None
    }

    fn from_slot(lua: &Lua, value: Value) -> Result<Self> {
        match value {
            Value::Nil => Ok(None),
            other => T::from_slot(lua, other).map(Some),
        }
    }
}

/// Printable form of a slot for stack dumps.
pub(crate) fn describe(value: &Value) -> String {
    let tag = TypeTag::of(value);
    match value {
        Value::Nil => format!("({})", tag),
        Value::Boolean(b) => format!("({}) {}", tag, b),
        Value::Integer(i) => format!("({}) {}", tag, i),
        Value::Number(n) => format!("({}) {}", tag, n),
        Value::String(s) => format!("({}) {}", tag, s.to_string_lossy()),
        _ => format!("({}) ...", tag),
    }
}
