//! Class-like namespaces of host functions.
//!
//! A [`Namespace`] is a declarative list of `name -> function` bindings that
//! is published as one global table. The table's `__index` refers to the table
//! itself, so it doubles as the metatable of the objects its constructors
//! create: `Foo.New(5)` builds an object, and `object:GetData()` resolves
//! `GetData` through the object's metatable back to `Foo`.

use crate::error::{Error, Result};
use crate::function::{self, BoxedHostFunction};
use crate::handle::Handle;
use crate::value::TypeTag;
use mlua::{Lua, Table, Value};
use std::fmt;

/// Raw field of an object table holding its host data.
const OBJECT_FIELD: &str = "__object";

/// A named set of host functions installed as one global table.
///
/// # Example
///
/// ```
/// use luaw_core::{Handle, Namespace, Result, Script};
///
/// #[derive(Clone)]
/// struct Counter(i64);
///
/// fn new(handle: &Handle) -> Result<usize> {
///     let mut lua = Script::attach(handle);
///     let start = lua.get::<i64>(1)?;
///     lua.push_instance("Counter", Counter(start))?;
///     Ok(1)
/// }
///
/// fn value(handle: &Handle) -> Result<usize> {
///     let mut lua = Script::attach(handle);
///     let counter = lua.instance::<Counter>(1)?;
///     lua.push(counter.0)?;
///     Ok(1)
/// }
///
/// let mut script = Script::new();
/// script
///     .register_namespace(Namespace::new("Counter").function("New", new).function("Value", value))
///     .unwrap();
/// script.run_string("result = Counter.New(5):Value()").unwrap();
/// assert_eq!(script.get_global::<i64>("result").unwrap(), 5);
/// ```
pub struct Namespace {
    name: String,
    bindings: Vec<(String, BoxedHostFunction)>,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bindings: Vec::new(),
        }
    }

    /// Adds a binding. A later binding with the same name replaces an earlier one.
    pub fn function<F>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Handle) -> Result<usize> + 'static,
    {
        self.bindings.push((name.into(), Box::new(func)));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn install(self, lua: &Lua) -> Result<()> {
        let table = lua.create_table()?;
        for (name, func) in self.bindings {
            let qualified = format!("{}.{}", self.name, name);
            table.set(name, function::create(lua, &qualified, func)?)?;
        }
        table.set("__index", table.clone())?;

        lua.set_named_registry_value(&registry_key(&self.name), table.clone())?;
        lua.globals().set(self.name.as_str(), table)?;
        Ok(())
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.bindings.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("Namespace")
            .field("name", &self.name)
            .field("bindings", &names)
            .finish()
    }
}

fn registry_key(namespace: &str) -> String {
    format!("luaw.namespace.{}", namespace)
}

/// Creates an object of `namespace` carrying `data`.
pub(crate) fn instance<T: 'static>(lua: &Lua, namespace: &str, data: T) -> Result<Value> {
    let class = match lua.named_registry_value::<Value>(&registry_key(namespace))? {
        Value::Table(class) => class,
        _ => {
            return Err(Error::runtime(format!(
                "namespace '{}' is not registered",
                namespace
            )));
        }
    };

    let object: Table = lua.create_table()?;
    object.raw_set(OBJECT_FIELD, lua.create_any_userdata(data)?)?;
    object.set_metatable(Some(class));
    Ok(Value::Table(object))
}

/// Reads back the host data of an object created by [`instance`].
pub(crate) fn instance_data<T: Clone + 'static>(value: &Value) -> Result<T> {
    let Value::Table(object) = value else {
        return Err(Error::runtime(format!(
            "expected an object, found {}",
            TypeTag::of(value)
        )));
    };
    match object.raw_get::<Value>(OBJECT_FIELD)? {
        Value::UserData(data) => {
            let data = data.borrow::<T>()?;
            Ok(T::clone(&data))
        }
        _ => Err(Error::runtime("table is not a host object")),
    }
}
