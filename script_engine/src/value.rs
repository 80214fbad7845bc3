//! Runtime values
//!
//! Lists and objects are shared by reference (`Rc`), so binding a list to
//! two names and appending through one is visible through the other.
//! Values are deliberately not `Send`.

use crate::builtins::{self, Builtin, BuiltinKind};
use crate::error::Exception;
use crate::host::StreamName;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// What an [`Object`] represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Module,
    Namespace,
}

/// A bag of named attributes with a mutable docstring
#[derive(Debug)]
pub struct Object {
    kind: ObjectKind,
    name: String,
    doc: RefCell<String>,
    attrs: RefCell<BTreeMap<String, Value>>,
}

impl Object {
    pub fn module(name: impl Into<String>, doc: impl Into<String>) -> Self {
        Self {
            kind: ObjectKind::Module,
            name: name.into(),
            doc: RefCell::new(doc.into()),
            attrs: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn namespace() -> Self {
        Self {
            kind: ObjectKind::Namespace,
            name: String::new(),
            doc: RefCell::new(String::new()),
            attrs: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.attrs.borrow().get(name).cloned()
    }

    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.attrs.borrow_mut().insert(name.into(), value);
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        self.attrs.borrow_mut().remove(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.attrs.borrow().keys().cloned().collect()
    }

    pub fn doc(&self) -> String {
        self.doc.borrow().clone()
    }

    pub fn set_doc(&self, doc: impl Into<String>) {
        *self.doc.borrow_mut() = doc.into();
    }
}

/// A built-in method bound to its receiver
#[derive(Debug, Clone)]
pub struct BoundMethod {
    pub receiver: Value,
    pub method: &'static Builtin,
}

/// A runtime value
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<RefCell<Vec<Value>>>),
    Object(Rc<Object>),
    Builtin(&'static Builtin),
    Method(Rc<BoundMethod>),
    Stream(StreamName),
    Exception(Rc<Exception>),
}

impl Value {
    pub fn str(text: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(text.as_ref()))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn object(object: Object) -> Self {
        Value::Object(Rc::new(object))
    }

    pub fn exception(exception: Exception) -> Self {
        Value::Exception(Rc::new(exception))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Name of the value's type, as shown in error messages
    pub fn type_name(&self) -> &str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Object(object) => match object.kind {
                ObjectKind::Module => "module",
                ObjectKind::Namespace => "namespace",
            },
            Value::Builtin(builtin) => match builtin.kind {
                BuiltinKind::Function(_) => "builtin_function_or_method",
                _ => "type",
            },
            Value::Method(_) => "builtin_function_or_method",
            Value::Stream(_) => "TextIOWrapper",
            Value::Exception(exception) => &exception.ename,
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            _ => true,
        }
    }

    /// Integer view of ints and bools
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Float view of any number
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            other => other.as_int().map(|i| i as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Equality with numeric coercion
    pub fn py_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.py_eq(y))
            }
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => std::ptr::eq(*a, *b),
            (Value::Method(a), Value::Method(b)) => {
                std::ptr::eq(a.method, b.method) && a.receiver.py_eq(&b.receiver)
            }
            (Value::Stream(a), Value::Stream(b)) => a == b,
            (Value::Exception(a), Value::Exception(b)) => Rc::ptr_eq(a, b),
            (a, b) => match (a.as_int(), b.as_int()) {
                (Some(x), Some(y)) => x == y,
                _ => match (a.as_float(), b.as_float()) {
                    (Some(x), Some(y)) => x == y,
                    _ => false,
                },
            },
        }
    }

    /// Text produced by `str()` and `print`
    pub fn to_str(&self) -> String {
        match self {
            Value::Str(s) => s.to_string(),
            Value::Exception(exception) => exception.message.clone(),
            other => other.repr(),
        }
    }

    /// Text produced by `repr()` and the display hook
    pub fn repr(&self) -> String {
        match self {
            Value::None => "None".to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Str(s) => quote_str(s),
            Value::List(items) => {
                let items: Vec<String> = items.borrow().iter().map(Value::repr).collect();
                format!("[{}]", items.join(", "))
            }
            Value::Object(object) => match object.kind {
                ObjectKind::Module => format!("<module '{}'>", object.name),
                ObjectKind::Namespace => {
                    let fields: Vec<String> = object
                        .attrs
                        .borrow()
                        .iter()
                        .map(|(name, value)| format!("{}={}", name, value.repr()))
                        .collect();
                    format!("namespace({})", fields.join(", "))
                }
            },
            Value::Builtin(builtin) => match builtin.kind {
                BuiltinKind::Function(_) => format!("<built-in function {}>", builtin.name),
                _ => format!("<class '{}'>", builtin.name),
            },
            Value::Method(method) => format!(
                "<built-in method {} of {} object>",
                method.method.name,
                method.receiver.type_name()
            ),
            Value::Stream(stream) => format!("<TextIOWrapper name='<{}>'>", stream.as_str()),
            Value::Exception(exception) => {
                if exception.message.is_empty() {
                    format!("{}()", exception.ename)
                } else {
                    format!("{}({})", exception.ename, quote_str(&exception.message))
                }
            }
        }
    }

    /// Docstring reachable through `__doc__`
    pub fn doc(&self) -> String {
        match self {
            Value::Builtin(builtin) => builtin.doc.to_string(),
            Value::Method(method) => method.method.doc.to_string(),
            Value::Object(object) => object.doc(),
            other => builtins::type_object(other.type_name())
                .map(|class| class.doc.to_string())
                .unwrap_or_default(),
        }
    }

    /// Looks up an attribute
    pub fn get_attr(&self, name: &str) -> Result<Value, Exception> {
        if name == "__doc__" {
            return Ok(match self {
                Value::Object(object) if object.doc.borrow().is_empty() => Value::None,
                other => Value::str(other.doc()),
            });
        }

        let found = match self {
            Value::Object(object) => object.get(name),
            other => builtins::method_for(other, name).map(|method| {
                Value::Method(Rc::new(BoundMethod {
                    receiver: other.clone(),
                    method,
                }))
            }),
        };

        found.ok_or_else(|| self.missing_attr(name))
    }

    /// Binds an attribute; only objects accept new attributes
    pub fn set_attr(&self, name: &str, value: Value) -> Result<(), Exception> {
        match self {
            Value::Object(object) if name == "__doc__" => {
                object.set_doc(if value.is_none() { String::new() } else { value.to_str() });
                Ok(())
            }
            Value::Object(object) => {
                object.set(name, value);
                Ok(())
            }
            other => Err(other.missing_attr(name)),
        }
    }

    pub fn del_attr(&self, name: &str) -> Result<(), Exception> {
        match self {
            Value::Object(object) => object
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| self.missing_attr(name)),
            other => Err(other.missing_attr(name)),
        }
    }

    /// Attribute names listed by `dir()` and completion
    pub fn attr_names(&self) -> Vec<String> {
        let mut names = match self {
            Value::Object(object) => object.names(),
            other => builtins::method_names(other)
                .iter()
                .map(|name| name.to_string())
                .collect(),
        };
        names.push("__doc__".to_string());
        names.sort();
        names.dedup();
        names
    }

    fn missing_attr(&self, name: &str) -> Exception {
        match self {
            Value::Object(object) if object.kind == ObjectKind::Module => Exception::attribute_error(
                format!("module '{}' has no attribute '{}'", object.name, name),
            ),
            other => Exception::attribute_error(format!(
                "'{}' object has no attribute '{}'",
                other.type_name(),
                name
            )),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.py_eq(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_str())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::str(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Rc::from(value))
    }
}

/// Formats a float the way the interactive shell prints it
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let text = format!("{:e}", value);
        return match text.split_once('e') {
            Some((mantissa, exponent)) => {
                let (sign, digits) = match exponent.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exponent),
                };
                format!("{}e{}{:0>2}", mantissa, sign, digits)
            }
            None => text,
        };
    }

    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// Quotes a string with single quotes unless it only contains those
pub fn quote_str(text: &str) -> String {
    let quote = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(text.len() + 2);
    out.push(quote);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_formatting() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(0.1), "0.1");
        assert_eq!(format_float(2.5), "2.5");
        assert_eq!(format_float(-3.0), "-3.0");
        assert_eq!(format_float(1e16), "1e+16");
        assert_eq!(format_float(1.5e-5), "1.5e-05");
        assert_eq!(format_float(f64::INFINITY), "inf");
    }

    #[test]
    fn test_string_repr_quoting() {
        assert_eq!(quote_str("abc"), "'abc'");
        assert_eq!(quote_str("it's"), "\"it's\"");
        assert_eq!(quote_str("a\nb"), "'a\\nb'");
    }

    #[test]
    fn test_numeric_equality_crosses_types() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert_eq!(Value::Bool(true), Value::Int(1));
        assert_ne!(Value::Int(1), Value::str("1"));
    }

    #[test]
    fn test_lists_share_storage() {
        let list = Value::list(vec![Value::Int(1)]);
        let alias = list.clone();
        if let Value::List(items) = &alias {
            items.borrow_mut().push(Value::Int(2));
        }
        assert_eq!(list.repr(), "[1, 2]");
    }

    #[test]
    fn test_namespace_repr_and_doc() {
        let object = Object::namespace();
        object.set("b", Value::Int(2));
        object.set("a", Value::str("x"));
        let value = Value::object(object);
        assert_eq!(value.repr(), "namespace(a='x', b=2)");

        assert_eq!(value.get_attr("__doc__").unwrap(), Value::None);
        value.set_attr("__doc__", Value::str("Docs.")).unwrap();
        assert_eq!(value.get_attr("__doc__").unwrap(), Value::str("Docs."));
    }

    #[test]
    fn test_missing_attribute_message() {
        let err = Value::Int(1).get_attr("foo").unwrap_err();
        assert_eq!(err.ename, "AttributeError");
        assert_eq!(err.message, "'int' object has no attribute 'foo'");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::None.truthy());
        assert!(!Value::str("").truthy());
        assert!(Value::list(vec![Value::None]).truthy());
        assert!(!Value::Float(0.0).truthy());
    }
}
