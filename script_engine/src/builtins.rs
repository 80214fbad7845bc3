//! Built-in functions, classes, methods and modules
//!
//! Every built-in carries a docstring; `object_info` and `__doc__` read
//! them. Methods of `str`, `list` and the output streams are built-ins
//! bound to their receiver, which arrives as the first positional argument.

use crate::error::Exception;
use crate::host::{Host, HostError, StreamName};
use crate::namespace::Namespace;
use crate::ops::{self, MAX_SEQUENCE_LEN};
use crate::value::{Object, ObjectKind, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Everything a built-in can reach while it runs
pub struct CallContext<'a> {
    pub host: &'a mut dyn Host,
    pub ns: &'a Namespace,
}

/// Call arguments
#[derive(Debug, Default)]
pub struct Args {
    pub positional: Vec<Value>,
    pub keywords: Vec<(String, Value)>,
}

impl Args {
    pub fn new(positional: Vec<Value>) -> Self {
        Self {
            positional,
            keywords: Vec::new(),
        }
    }

    /// Removes a keyword argument
    pub fn take_keyword(&mut self, name: &str) -> Option<Value> {
        let index = self.keywords.iter().position(|(key, _)| key == name)?;
        Some(self.keywords.remove(index).1)
    }

    fn no_keywords(&self, function: &str) -> Result<(), Exception> {
        if self.keywords.is_empty() {
            Ok(())
        } else {
            Err(Exception::type_error(format!(
                "{}() takes no keyword arguments",
                function
            )))
        }
    }

    fn reject_unknown_keywords(&self, function: &str) -> Result<(), Exception> {
        match self.keywords.first() {
            None => Ok(()),
            Some((name, _)) => Err(Exception::type_error(format!(
                "'{}' is an invalid keyword argument for {}()",
                name, function
            ))),
        }
    }

    fn arity(&self, function: &str, min: usize, max: usize) -> Result<(), Exception> {
        let given = self.positional.len();
        if (min..=max).contains(&given) {
            return Ok(());
        }
        let message = if min == max {
            let plural = if min == 1 { "" } else { "s" };
            match min {
                0 => format!("{}() takes no arguments ({} given)", function, given),
                1 => format!("{}() takes exactly one argument ({} given)", function, given),
                n => format!("{}() takes exactly {} argument{} ({} given)", function, n, plural, given),
            }
        } else if given < min {
            format!("{}() takes at least {} arguments ({} given)", function, min, given)
        } else {
            format!("{}() takes at most {} arguments ({} given)", function, max, given)
        };
        Err(Exception::type_error(message))
    }
}

pub type BuiltinFn = fn(&mut CallContext<'_>, Args) -> Result<Value, Exception>;

/// How a built-in behaves when called
#[derive(Clone, Copy)]
pub enum BuiltinKind {
    Function(BuiltinFn),
    /// A type whose call converts or constructs
    Class(BuiltinFn),
    /// An exception type; calling it builds an exception value
    ExceptionClass,
    /// A type that cannot be instantiated
    Type,
}

/// A built-in function, method or type
pub struct Builtin {
    pub name: &'static str,
    pub doc: &'static str,
    pub kind: BuiltinKind,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin").field("name", &self.name).finish()
    }
}

impl Builtin {
    pub fn is_exception_class(&self) -> bool {
        matches!(self.kind, BuiltinKind::ExceptionClass)
    }
}

/// Calls any callable value
pub fn call_value(ctx: &mut CallContext<'_>, callee: &Value, mut args: Args) -> Result<Value, Exception> {
    match callee {
        Value::Builtin(builtin) => match builtin.kind {
            BuiltinKind::Function(func) | BuiltinKind::Class(func) => func(ctx, args),
            BuiltinKind::ExceptionClass => {
                args.no_keywords(builtin.name)?;
                let message = match args.positional.as_slice() {
                    [] => String::new(),
                    [single] => single.to_str(),
                    many => {
                        let parts: Vec<String> = many.iter().map(Value::repr).collect();
                        format!("({})", parts.join(", "))
                    }
                };
                Ok(Value::exception(Exception::new(builtin.name, message)))
            }
            BuiltinKind::Type => Err(Exception::type_error(format!(
                "cannot create '{}' instances",
                builtin.name
            ))),
        },
        Value::Method(method) => match method.method.kind {
            BuiltinKind::Function(func) => {
                args.positional.insert(0, method.receiver.clone());
                func(ctx, args)
            }
            _ => Err(Exception::type_error("method is not callable")),
        },
        other => Err(Exception::type_error(format!(
            "'{}' object is not callable",
            other.type_name()
        ))),
    }
}

/// Converts a host failure into the exception running code sees
pub fn host_exception(err: HostError) -> Exception {
    match err {
        HostError::Closed => Exception::value_error("I/O operation on closed file"),
        HostError::Eof => Exception::eof("EOF when reading a line"),
        HostError::Other(message) => Exception::runtime(message),
    }
}

/// Built-in scope consulted after the user namespace
#[derive(Debug)]
pub struct Builtins {
    scope: BTreeMap<String, Value>,
}

impl Builtins {
    pub fn new() -> Self {
        let mut scope = BTreeMap::new();
        for builtin in GLOBALS {
            scope.insert(builtin.name.to_string(), Value::Builtin(builtin));
        }
        for builtin in EXCEPTIONS {
            scope.insert(builtin.name.to_string(), Value::Builtin(builtin));
        }
        scope.insert("math".to_string(), math_module());
        scope.insert("sys".to_string(), sys_module());
        Self { scope }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.scope.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scope.keys().map(String::as_str)
    }
}

impl Default for Builtins {
    fn default() -> Self {
        Self::new()
    }
}

fn math_module() -> Value {
    let module = Object::module(
        "math",
        "This module provides access to the mathematical functions\ndefined by the C standard.",
    );
    module.set("pi", Value::Float(std::f64::consts::PI));
    module.set("e", Value::Float(std::f64::consts::E));
    module.set("inf", Value::Float(f64::INFINITY));
    for builtin in [&MATH_SQRT, &MATH_FLOOR, &MATH_CEIL] {
        module.set(builtin.name, Value::Builtin(builtin));
    }
    Value::object(module)
}

fn sys_module() -> Value {
    let module = Object::module(
        "sys",
        "This module provides access to some objects used or maintained by the\ninterpreter.",
    );
    module.set("stdout", Value::Stream(StreamName::Stdout));
    module.set("stderr", Value::Stream(StreamName::Stderr));
    Value::object(module)
}

/// Returns the class object for a type name
pub fn type_object(name: &str) -> Option<&'static Builtin> {
    let class = match name {
        "int" => &INT,
        "float" => &FLOAT,
        "str" => &STR,
        "bool" => &BOOL,
        "list" => &LIST,
        "type" => &TYPE,
        "namespace" => &NAMESPACE,
        "NoneType" => &NONE_TYPE,
        "module" => &MODULE_TYPE,
        "builtin_function_or_method" => &FUNCTION_TYPE,
        "TextIOWrapper" => &STREAM_TYPE,
        other => return EXCEPTIONS.iter().copied().find(|class| class.name == other),
    };
    Some(class)
}

/// Returns the built-in method `name` of a value, if it has one
pub fn method_for(value: &Value, name: &str) -> Option<&'static Builtin> {
    let method = match (value, name) {
        (Value::Str(_), "upper") => &STR_UPPER,
        (Value::Str(_), "lower") => &STR_LOWER,
        (Value::Str(_), "strip") => &STR_STRIP,
        (Value::Str(_), "split") => &STR_SPLIT,
        (Value::Str(_), "join") => &STR_JOIN,
        (Value::Str(_), "startswith") => &STR_STARTSWITH,
        (Value::Str(_), "endswith") => &STR_ENDSWITH,
        (Value::Str(_), "replace") => &STR_REPLACE,
        (Value::List(_), "append") => &LIST_APPEND,
        (Value::List(_), "extend") => &LIST_EXTEND,
        (Value::List(_), "pop") => &LIST_POP,
        (Value::Stream(_), "write") => &STREAM_WRITE,
        (Value::Stream(_), "flush") => &STREAM_FLUSH,
        _ => return None,
    };
    Some(method)
}

/// Names of the built-in methods of a value
pub fn method_names(value: &Value) -> &'static [&'static str] {
    match value {
        Value::Str(_) => &[
            "endswith",
            "join",
            "lower",
            "replace",
            "split",
            "startswith",
            "strip",
            "upper",
        ],
        Value::List(_) => &["append", "extend", "pop"],
        Value::Stream(_) => &["flush", "write"],
        _ => &[],
    }
}

fn items_of(value: &Value) -> Result<Vec<Value>, Exception> {
    match value {
        Value::List(items) => Ok(items.borrow().clone()),
        Value::Str(text) => Ok(text.chars().map(|c| Value::str(c.to_string())).collect()),
        other => Err(Exception::type_error(format!(
            "'{}' object is not iterable",
            other.type_name()
        ))),
    }
}

fn expect_str<'v>(value: &'v Value, what: &str) -> Result<&'v str, Exception> {
    value.as_str().ok_or_else(|| {
        Exception::type_error(format!("{} must be str, not {}", what, value.type_name()))
    })
}

fn expect_int(value: &Value) -> Result<i64, Exception> {
    value.as_int().ok_or_else(|| {
        Exception::type_error(format!(
            "'{}' object cannot be interpreted as an integer",
            value.type_name()
        ))
    })
}

/// Reads a `sep=`/`end=` style option: `None` or a string
fn str_option(value: Option<Value>, name: &str, default: &str) -> Result<String, Exception> {
    match value {
        None | Some(Value::None) => Ok(default.to_string()),
        Some(Value::Str(s)) => Ok(s.to_string()),
        Some(other) => Err(Exception::type_error(format!(
            "{} must be None or a string, not {}",
            name,
            other.type_name()
        ))),
    }
}

// Global functions

static PRINT: Builtin = Builtin {
    name: "print",
    doc: "print(value, ..., sep=' ', end='\\n', file=sys.stdout, flush=False)\n\nPrints the values to a stream, or to sys.stdout by default.",
    kind: BuiltinKind::Function(builtin_print),
};

fn builtin_print(ctx: &mut CallContext<'_>, mut args: Args) -> Result<Value, Exception> {
    let sep = str_option(args.take_keyword("sep"), "sep", " ")?;
    let end = str_option(args.take_keyword("end"), "end", "\n")?;
    let stream = match args.take_keyword("file") {
        None | Some(Value::None) => StreamName::Stdout,
        Some(Value::Stream(stream)) => stream,
        Some(other) => {
            return Err(Exception::attribute_error(format!(
                "'{}' object has no attribute 'write'",
                other.type_name()
            )))
        }
    };
    let flush = args.take_keyword("flush").is_some_and(|v| v.truthy());
    args.reject_unknown_keywords("print")?;

    let parts: Vec<String> = args.positional.iter().map(Value::to_str).collect();
    let text = parts.join(&sep) + &end;
    ctx.host.write(stream, &text).map_err(host_exception)?;
    if flush {
        ctx.host.flush(stream).map_err(host_exception)?;
    }
    Ok(Value::None)
}

static INPUT: Builtin = Builtin {
    name: "input",
    doc: "input(prompt='') -> str\n\nRead a string from standard input. The trailing newline is stripped.",
    kind: BuiltinKind::Function(builtin_input),
};

static RAW_INPUT: Builtin = Builtin {
    name: "raw_input",
    doc: "raw_input([prompt]) -> string\n\nRead a string from standard input. The trailing newline is stripped.",
    kind: BuiltinKind::Function(builtin_input),
};

fn builtin_input(ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    args.no_keywords("input")?;
    args.arity("input", 0, 1)?;
    let prompt = args.positional.first().map(Value::to_str).unwrap_or_default();
    let line = ctx.host.read_line(&prompt).map_err(host_exception)?;
    Ok(Value::from(line))
}

static LEN: Builtin = Builtin {
    name: "len",
    doc: "len(obj) -> int\n\nReturn the number of items in a container.",
    kind: BuiltinKind::Function(builtin_len),
};

fn builtin_len(_ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    args.no_keywords("len")?;
    args.arity("len", 1, 1)?;
    let len = match &args.positional[0] {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.borrow().len(),
        Value::Object(object) if object.kind() == ObjectKind::Namespace => object.names().len(),
        other => {
            return Err(Exception::type_error(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )))
        }
    };
    Ok(Value::Int(i64::try_from(len).unwrap_or(i64::MAX)))
}

static REPR: Builtin = Builtin {
    name: "repr",
    doc: "repr(obj) -> str\n\nReturn the canonical string representation of the object.",
    kind: BuiltinKind::Function(builtin_repr),
};

fn builtin_repr(_ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    args.no_keywords("repr")?;
    args.arity("repr", 1, 1)?;
    Ok(Value::from(args.positional[0].repr()))
}

static ABS: Builtin = Builtin {
    name: "abs",
    doc: "abs(x)\n\nReturn the absolute value of the argument.",
    kind: BuiltinKind::Function(builtin_abs),
};

fn builtin_abs(_ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    args.no_keywords("abs")?;
    args.arity("abs", 1, 1)?;
    match &args.positional[0] {
        Value::Float(f) => Ok(Value::Float(f.abs())),
        value => match value.as_int() {
            Some(i) => i
                .checked_abs()
                .map(Value::Int)
                .ok_or_else(|| Exception::overflow("int too large")),
            None => Err(Exception::type_error(format!(
                "bad operand type for abs(): '{}'",
                value.type_name()
            ))),
        },
    }
}

static MIN: Builtin = Builtin {
    name: "min",
    doc: "min(iterable) -> value\nmin(a, b, c, ...) -> value\n\nWith a single iterable argument, return its smallest item.\nWith two or more arguments, return the smallest argument.",
    kind: BuiltinKind::Function(builtin_min),
};

static MAX: Builtin = Builtin {
    name: "max",
    doc: "max(iterable) -> value\nmax(a, b, c, ...) -> value\n\nWith a single iterable argument, return its biggest item.\nWith two or more arguments, return the largest argument.",
    kind: BuiltinKind::Function(builtin_max),
};

fn extreme(args: Args, name: &str, keep: std::cmp::Ordering) -> Result<Value, Exception> {
    args.no_keywords(name)?;
    let items = match args.positional.len() {
        0 => {
            return Err(Exception::type_error(format!(
                "{} expected at least 1 argument, got 0",
                name
            )))
        }
        1 => items_of(&args.positional[0])?,
        _ => args.positional,
    };

    let mut items = items.into_iter();
    let Some(mut best) = items.next() else {
        return Err(Exception::value_error(format!("{}() arg is an empty sequence", name)));
    };
    let symbol = if keep == std::cmp::Ordering::Less { "<" } else { ">" };
    for item in items {
        if ops::ordering(symbol, &item, &best)? == Some(keep) {
            best = item;
        }
    }
    Ok(best)
}

fn builtin_min(_ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    extreme(args, "min", std::cmp::Ordering::Less)
}

fn builtin_max(_ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    extreme(args, "max", std::cmp::Ordering::Greater)
}

static SUM: Builtin = Builtin {
    name: "sum",
    doc: "sum(iterable, start=0)\n\nReturn the sum of a 'start' value (default: 0) plus an iterable of numbers.",
    kind: BuiltinKind::Function(builtin_sum),
};

fn builtin_sum(_ctx: &mut CallContext<'_>, mut args: Args) -> Result<Value, Exception> {
    let start = args.take_keyword("start");
    args.reject_unknown_keywords("sum")?;
    args.arity("sum", 1, 2)?;

    let mut total = match (args.positional.get(1).cloned(), start) {
        (Some(value), _) | (None, Some(value)) => value,
        (None, None) => Value::Int(0),
    };
    if matches!(total, Value::Str(_)) {
        return Err(Exception::type_error(
            "sum() can't sum strings [use ''.join(seq) instead]",
        ));
    }
    for item in items_of(&args.positional[0])? {
        total = ops::binary(crate::ast::BinOp::Add, &total, &item)?;
    }
    Ok(total)
}

static RANGE: Builtin = Builtin {
    name: "range",
    doc: "range(stop) -> list of integers\nrange(start, stop[, step]) -> list of integers\n\nReturn a list containing an arithmetic progression of integers.",
    kind: BuiltinKind::Function(builtin_range),
};

fn builtin_range(_ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    args.no_keywords("range")?;
    args.arity("range", 1, 3)?;
    let numbers = args
        .positional
        .iter()
        .map(expect_int)
        .collect::<Result<Vec<i64>, Exception>>()?;

    let (start, stop, step) = match numbers.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => return Err(Exception::type_error("range expected at most 3 arguments")),
    };
    if step == 0 {
        return Err(Exception::value_error("range() arg 3 must not be zero"));
    }

    let (start, stop, step) = (i128::from(start), i128::from(stop), i128::from(step));
    let len = if step > 0 && start < stop {
        (stop - start + step - 1) / step
    } else if step < 0 && start > stop {
        (start - stop - step - 1) / -step
    } else {
        0
    };
    if len > MAX_SEQUENCE_LEN as i128 {
        return Err(Exception::memory_error("range too large"));
    }

    let items = (0..len)
        .map(|i| Value::Int((start + i * step) as i64))
        .collect();
    Ok(Value::list(items))
}

static DIR: Builtin = Builtin {
    name: "dir",
    doc: "dir([object]) -> list of strings\n\nWithout arguments, return the names bound in the current scope.\nWith an argument, return the attribute names of that object.",
    kind: BuiltinKind::Function(builtin_dir),
};

fn builtin_dir(ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    args.no_keywords("dir")?;
    args.arity("dir", 0, 1)?;
    let names: Vec<Value> = match args.positional.first() {
        None => ctx.ns.names().map(Value::from).collect(),
        Some(value) => value.attr_names().into_iter().map(Value::from).collect(),
    };
    Ok(Value::list(names))
}

static GETATTR: Builtin = Builtin {
    name: "getattr",
    doc: "getattr(object, name[, default]) -> value\n\nGet a named attribute from an object; getattr(x, 'y') is equivalent to x.y.\nWhen a default argument is given, it is returned when the attribute doesn't exist.",
    kind: BuiltinKind::Function(builtin_getattr),
};

fn builtin_getattr(_ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    args.no_keywords("getattr")?;
    args.arity("getattr", 2, 3)?;
    let name = expect_str(&args.positional[1], "attribute name")?;
    match (args.positional[0].get_attr(name), args.positional.get(2)) {
        (Ok(value), _) => Ok(value),
        (Err(err), Some(default)) if err.ename == "AttributeError" => Ok(default.clone()),
        (Err(err), _) => Err(err),
    }
}

static HASATTR: Builtin = Builtin {
    name: "hasattr",
    doc: "hasattr(object, name) -> bool\n\nReturn whether the object has an attribute with the given name.",
    kind: BuiltinKind::Function(builtin_hasattr),
};

fn builtin_hasattr(_ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    args.no_keywords("hasattr")?;
    args.arity("hasattr", 2, 2)?;
    let name = expect_str(&args.positional[1], "attribute name")?;
    Ok(Value::Bool(args.positional[0].get_attr(name).is_ok()))
}

// Classes

static INT: Builtin = Builtin {
    name: "int",
    doc: "int(x=0) -> integer\n\nConvert a number or string to an integer, or return 0 if no arguments\nare given. Floats are truncated towards zero.",
    kind: BuiltinKind::Class(builtin_int),
};

fn builtin_int(_ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    args.no_keywords("int")?;
    args.arity("int", 0, 1)?;
    let Some(value) = args.positional.first() else {
        return Ok(Value::Int(0));
    };
    match value {
        Value::Float(f) if f.is_nan() => Err(Exception::value_error("cannot convert float NaN to integer")),
        Value::Float(f) if f.is_infinite() => Err(Exception::overflow("cannot convert float infinity to integer")),
        Value::Float(f) => {
            let truncated = f.trunc();
            if truncated.abs() >= 9.223_372_036_854_775_807e18 {
                return Err(Exception::overflow("int too large"));
            }
            Ok(Value::Int(truncated as i64))
        }
        Value::Str(text) => {
            let trimmed = text.trim().replace('_', "");
            trimmed.parse::<i64>().map(Value::Int).map_err(|err| {
                use std::num::IntErrorKind;
                match err.kind() {
                    IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                        Exception::overflow("int too large")
                    }
                    _ => Exception::value_error(format!(
                        "invalid literal for int() with base 10: {}",
                        value.repr()
                    )),
                }
            })
        }
        other => other.as_int().map(Value::Int).ok_or_else(|| {
            Exception::type_error(format!(
                "int() argument must be a string or a number, not '{}'",
                other.type_name()
            ))
        }),
    }
}

static FLOAT: Builtin = Builtin {
    name: "float",
    doc: "float(x=0.0) -> floating point number\n\nConvert a string or number to a floating point number, if possible.",
    kind: BuiltinKind::Class(builtin_float),
};

fn builtin_float(_ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    args.no_keywords("float")?;
    args.arity("float", 0, 1)?;
    let Some(value) = args.positional.first() else {
        return Ok(Value::Float(0.0));
    };
    match value {
        Value::Str(text) => text.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            Exception::value_error(format!(
                "could not convert string to float: {}",
                value.repr()
            ))
        }),
        other => other.as_float().map(Value::Float).ok_or_else(|| {
            Exception::type_error(format!(
                "float() argument must be a string or a number, not '{}'",
                other.type_name()
            ))
        }),
    }
}

static STR: Builtin = Builtin {
    name: "str",
    doc: "str(object='') -> str\n\nReturn a nice string representation of the object.",
    kind: BuiltinKind::Class(builtin_str),
};

fn builtin_str(_ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    args.no_keywords("str")?;
    args.arity("str", 0, 1)?;
    Ok(Value::from(
        args.positional.first().map(Value::to_str).unwrap_or_default(),
    ))
}

static BOOL: Builtin = Builtin {
    name: "bool",
    doc: "bool(x) -> bool\n\nReturns True when the argument x is true, False otherwise.",
    kind: BuiltinKind::Class(builtin_bool),
};

fn builtin_bool(_ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    args.no_keywords("bool")?;
    args.arity("bool", 0, 1)?;
    Ok(Value::Bool(args.positional.first().is_some_and(Value::truthy)))
}

static LIST: Builtin = Builtin {
    name: "list",
    doc: "list() -> new empty list\nlist(iterable) -> new list initialized from iterable's items",
    kind: BuiltinKind::Class(builtin_list),
};

fn builtin_list(_ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    args.no_keywords("list")?;
    args.arity("list", 0, 1)?;
    match args.positional.first() {
        None => Ok(Value::list(Vec::new())),
        Some(value) => Ok(Value::list(items_of(value)?)),
    }
}

static TYPE: Builtin = Builtin {
    name: "type",
    doc: "type(object) -> the object's type",
    kind: BuiltinKind::Class(builtin_type),
};

fn builtin_type(_ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    args.no_keywords("type")?;
    args.arity("type", 1, 1)?;
    let value = &args.positional[0];
    let class = type_object(value.type_name()).unwrap_or(&OBJECT_TYPE);
    Ok(Value::Builtin(class))
}

static NAMESPACE: Builtin = Builtin {
    name: "namespace",
    doc: "namespace(**kwargs)\n\nA simple attribute-based namespace. Attributes and __doc__ can be\nassigned freely.",
    kind: BuiltinKind::Class(builtin_namespace),
};

fn builtin_namespace(_ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    if !args.positional.is_empty() {
        return Err(Exception::type_error("no positional arguments expected"));
    }
    let object = Object::namespace();
    for (name, value) in args.keywords {
        object.set(name, value);
    }
    Ok(Value::object(object))
}

static NONE_TYPE: Builtin = Builtin {
    name: "NoneType",
    doc: "",
    kind: BuiltinKind::Type,
};

static MODULE_TYPE: Builtin = Builtin {
    name: "module",
    doc: "Create a module object.",
    kind: BuiltinKind::Type,
};

static FUNCTION_TYPE: Builtin = Builtin {
    name: "builtin_function_or_method",
    doc: "",
    kind: BuiltinKind::Type,
};

static STREAM_TYPE: Builtin = Builtin {
    name: "TextIOWrapper",
    doc: "Character and line based layer over a kernel output stream.",
    kind: BuiltinKind::Type,
};

static OBJECT_TYPE: Builtin = Builtin {
    name: "object",
    doc: "The base class of the class hierarchy.",
    kind: BuiltinKind::Type,
};

static GLOBALS: [&Builtin; 20] = [
    &PRINT, &INPUT, &RAW_INPUT, &LEN, &REPR, &ABS, &MIN, &MAX, &SUM, &RANGE, &DIR, &GETATTR,
    &HASATTR, &INT, &FLOAT, &STR, &BOOL, &LIST, &TYPE, &NAMESPACE,
];

// Exceptions

static EXCEPTION: Builtin = Builtin {
    name: "Exception",
    doc: "Common base class for all non-exit exceptions.",
    kind: BuiltinKind::ExceptionClass,
};

static ZERO_DIVISION_ERROR: Builtin = Builtin {
    name: "ZeroDivisionError",
    doc: "Second argument to a division or modulo operation was zero.",
    kind: BuiltinKind::ExceptionClass,
};

static NAME_ERROR: Builtin = Builtin {
    name: "NameError",
    doc: "Name not found globally.",
    kind: BuiltinKind::ExceptionClass,
};

static TYPE_ERROR: Builtin = Builtin {
    name: "TypeError",
    doc: "Inappropriate argument type.",
    kind: BuiltinKind::ExceptionClass,
};

static VALUE_ERROR: Builtin = Builtin {
    name: "ValueError",
    doc: "Inappropriate argument value (of correct type).",
    kind: BuiltinKind::ExceptionClass,
};

static ATTRIBUTE_ERROR: Builtin = Builtin {
    name: "AttributeError",
    doc: "Attribute not found.",
    kind: BuiltinKind::ExceptionClass,
};

static INDEX_ERROR: Builtin = Builtin {
    name: "IndexError",
    doc: "Sequence index out of range.",
    kind: BuiltinKind::ExceptionClass,
};

static OVERFLOW_ERROR: Builtin = Builtin {
    name: "OverflowError",
    doc: "Result too large to be represented.",
    kind: BuiltinKind::ExceptionClass,
};

static MEMORY_ERROR: Builtin = Builtin {
    name: "MemoryError",
    doc: "Out of memory.",
    kind: BuiltinKind::ExceptionClass,
};

static EOF_ERROR: Builtin = Builtin {
    name: "EOFError",
    doc: "Read beyond end of file.",
    kind: BuiltinKind::ExceptionClass,
};

static RUNTIME_ERROR: Builtin = Builtin {
    name: "RuntimeError",
    doc: "Unspecified run-time error.",
    kind: BuiltinKind::ExceptionClass,
};

static SYNTAX_ERROR: Builtin = Builtin {
    name: "SyntaxError",
    doc: "Invalid syntax.",
    kind: BuiltinKind::ExceptionClass,
};

static EXCEPTIONS: [&Builtin; 12] = [
    &EXCEPTION,
    &ZERO_DIVISION_ERROR,
    &NAME_ERROR,
    &TYPE_ERROR,
    &VALUE_ERROR,
    &ATTRIBUTE_ERROR,
    &INDEX_ERROR,
    &OVERFLOW_ERROR,
    &MEMORY_ERROR,
    &EOF_ERROR,
    &RUNTIME_ERROR,
    &SYNTAX_ERROR,
];

// math

static MATH_SQRT: Builtin = Builtin {
    name: "sqrt",
    doc: "sqrt(x)\n\nReturn the square root of x.",
    kind: BuiltinKind::Function(math_sqrt),
};

fn number_arg(args: &Args, name: &str) -> Result<f64, Exception> {
    args.no_keywords(name)?;
    args.arity(name, 1, 1)?;
    let value = &args.positional[0];
    value.as_float().ok_or_else(|| {
        Exception::type_error(format!(
            "must be real number, not {}",
            value.type_name()
        ))
    })
}

fn math_sqrt(_ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    let x = number_arg(&args, "sqrt")?;
    if x < 0.0 {
        return Err(Exception::value_error("math domain error"));
    }
    Ok(Value::Float(x.sqrt()))
}

static MATH_FLOOR: Builtin = Builtin {
    name: "floor",
    doc: "floor(x)\n\nReturn the floor of x as an Integral.\nThis is the largest integer <= x.",
    kind: BuiltinKind::Function(math_floor),
};

static MATH_CEIL: Builtin = Builtin {
    name: "ceil",
    doc: "ceil(x)\n\nReturn the ceiling of x as an Integral.\nThis is the smallest integer >= x.",
    kind: BuiltinKind::Function(math_ceil),
};

fn float_to_int(value: f64) -> Result<Value, Exception> {
    if !value.is_finite() || value.abs() >= 9.223_372_036_854_775_807e18 {
        return Err(Exception::overflow("cannot convert float to integer"));
    }
    Ok(Value::Int(value as i64))
}

fn math_floor(_ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    float_to_int(number_arg(&args, "floor")?.floor())
}

fn math_ceil(_ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    float_to_int(number_arg(&args, "ceil")?.ceil())
}

// str methods

fn receiver_str(args: &Args) -> &str {
    args.positional.first().and_then(Value::as_str).unwrap_or("")
}

static STR_UPPER: Builtin = Builtin {
    name: "upper",
    doc: "Return a copy of the string converted to uppercase.",
    kind: BuiltinKind::Function(str_upper),
};

fn str_upper(_ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    Ok(Value::from(receiver_str(&args).to_uppercase()))
}

static STR_LOWER: Builtin = Builtin {
    name: "lower",
    doc: "Return a copy of the string converted to lowercase.",
    kind: BuiltinKind::Function(str_lower),
};

fn str_lower(_ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    Ok(Value::from(receiver_str(&args).to_lowercase()))
}

static STR_STRIP: Builtin = Builtin {
    name: "strip",
    doc: "Return a copy of the string with leading and trailing whitespace removed.",
    kind: BuiltinKind::Function(str_strip),
};

fn str_strip(_ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    Ok(Value::from(receiver_str(&args).trim()))
}

static STR_SPLIT: Builtin = Builtin {
    name: "split",
    doc: "split(sep=None)\n\nReturn a list of the words in the string, using sep as the delimiter.\nWith no sep, runs of whitespace are the separator.",
    kind: BuiltinKind::Function(str_split),
};

fn str_split(_ctx: &mut CallContext<'_>, mut args: Args) -> Result<Value, Exception> {
    let sep_keyword = args.take_keyword("sep");
    args.reject_unknown_keywords("split")?;
    let text = receiver_str(&args);
    let sep = sep_keyword.or_else(|| args.positional.get(1).cloned());

    let parts: Vec<Value> = match sep {
        None | Some(Value::None) => text.split_whitespace().map(Value::from).collect(),
        Some(Value::Str(sep)) if sep.is_empty() => {
            return Err(Exception::value_error("empty separator"))
        }
        Some(Value::Str(sep)) => text.split(&*sep).map(Value::from).collect(),
        Some(other) => {
            return Err(Exception::type_error(format!(
                "must be str or None, not {}",
                other.type_name()
            )))
        }
    };
    Ok(Value::list(parts))
}

static STR_JOIN: Builtin = Builtin {
    name: "join",
    doc: "join(iterable)\n\nConcatenate any number of strings, inserting the string between each.",
    kind: BuiltinKind::Function(str_join),
};

fn str_join(_ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    args.no_keywords("join")?;
    args.arity("join", 2, 2)?;
    let sep = receiver_str(&args);
    let mut parts = Vec::new();
    for (i, item) in items_of(&args.positional[1])?.iter().enumerate() {
        match item {
            Value::Str(s) => parts.push(s.to_string()),
            other => {
                return Err(Exception::type_error(format!(
                    "sequence item {}: expected str instance, {} found",
                    i,
                    other.type_name()
                )))
            }
        }
    }
    Ok(Value::from(parts.join(sep)))
}

static STR_STARTSWITH: Builtin = Builtin {
    name: "startswith",
    doc: "startswith(prefix) -> bool\n\nReturn True if the string starts with the specified prefix.",
    kind: BuiltinKind::Function(str_startswith),
};

fn str_startswith(_ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    args.arity("startswith", 2, 2)?;
    let prefix = expect_str(&args.positional[1], "prefix")?;
    Ok(Value::Bool(receiver_str(&args).starts_with(prefix)))
}

static STR_ENDSWITH: Builtin = Builtin {
    name: "endswith",
    doc: "endswith(suffix) -> bool\n\nReturn True if the string ends with the specified suffix.",
    kind: BuiltinKind::Function(str_endswith),
};

fn str_endswith(_ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    args.arity("endswith", 2, 2)?;
    let suffix = expect_str(&args.positional[1], "suffix")?;
    Ok(Value::Bool(receiver_str(&args).ends_with(suffix)))
}

static STR_REPLACE: Builtin = Builtin {
    name: "replace",
    doc: "replace(old, new)\n\nReturn a copy with all occurrences of substring old replaced by new.",
    kind: BuiltinKind::Function(str_replace),
};

fn str_replace(_ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    args.arity("replace", 3, 3)?;
    let old = expect_str(&args.positional[1], "old")?;
    let new = expect_str(&args.positional[2], "new")?;
    Ok(Value::from(receiver_str(&args).replace(old, new)))
}

// list methods

fn receiver_list(args: &Args) -> Result<&std::rc::Rc<std::cell::RefCell<Vec<Value>>>, Exception> {
    match args.positional.first() {
        Some(Value::List(items)) => Ok(items),
        _ => Err(Exception::type_error("descriptor requires a 'list' object")),
    }
}

static LIST_APPEND: Builtin = Builtin {
    name: "append",
    doc: "Append object to the end of the list.",
    kind: BuiltinKind::Function(list_append),
};

fn list_append(_ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    args.no_keywords("append")?;
    args.arity("append", 2, 2)?;
    let items = receiver_list(&args)?;
    if items.borrow().len() >= MAX_SEQUENCE_LEN {
        return Err(Exception::memory_error("list too large"));
    }
    items.borrow_mut().push(args.positional[1].clone());
    Ok(Value::None)
}

static LIST_EXTEND: Builtin = Builtin {
    name: "extend",
    doc: "Extend list by appending elements from the iterable.",
    kind: BuiltinKind::Function(list_extend),
};

fn list_extend(_ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    args.no_keywords("extend")?;
    args.arity("extend", 2, 2)?;
    let extra = items_of(&args.positional[1])?;
    let items = receiver_list(&args)?;
    if items.borrow().len().saturating_add(extra.len()) > MAX_SEQUENCE_LEN {
        return Err(Exception::memory_error("list too large"));
    }
    items.borrow_mut().extend(extra);
    Ok(Value::None)
}

static LIST_POP: Builtin = Builtin {
    name: "pop",
    doc: "pop(index=-1)\n\nRemove and return item at index (default last).\nRaises IndexError if list is empty or index is out of range.",
    kind: BuiltinKind::Function(list_pop),
};

fn list_pop(_ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    args.no_keywords("pop")?;
    args.arity("pop", 1, 2)?;
    let index = match args.positional.get(1) {
        Some(value) => expect_int(value)?,
        None => -1,
    };
    let items = receiver_list(&args)?;
    if items.borrow().is_empty() {
        return Err(Exception::index_error("pop from empty list"));
    }
    let value = ops::get_index(&args.positional[0], &Value::Int(index))
        .map_err(|_| Exception::index_error("pop index out of range"))?;
    ops::del_index(&args.positional[0], &Value::Int(index))?;
    Ok(value)
}

// stream methods

fn receiver_stream(args: &Args) -> StreamName {
    match args.positional.first() {
        Some(Value::Stream(stream)) => *stream,
        _ => StreamName::Stdout,
    }
}

static STREAM_WRITE: Builtin = Builtin {
    name: "write",
    doc: "write(s) -> int\n\nWrite string to stream. Returns the number of characters written.",
    kind: BuiltinKind::Function(stream_write),
};

fn stream_write(ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    args.no_keywords("write")?;
    args.arity("write", 2, 2)?;
    let text = match &args.positional[1] {
        Value::Str(s) => s.clone(),
        other => {
            return Err(Exception::type_error(format!(
                "write() argument must be str, not {}",
                other.type_name()
            )))
        }
    };
    ctx.host
        .write(receiver_stream(&args), &text)
        .map_err(host_exception)?;
    Ok(Value::Int(i64::try_from(text.chars().count()).unwrap_or(i64::MAX)))
}

static STREAM_FLUSH: Builtin = Builtin {
    name: "flush",
    doc: "Flush the write buffers of the stream.",
    kind: BuiltinKind::Function(stream_flush),
};

fn stream_flush(ctx: &mut CallContext<'_>, args: Args) -> Result<Value, Exception> {
    args.no_keywords("flush")?;
    args.arity("flush", 1, 1)?;
    ctx.host
        .flush(receiver_stream(&args))
        .map_err(host_exception)?;
    Ok(Value::None)
}
