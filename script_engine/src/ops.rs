//! Operators
//!
//! Integers are 64-bit and checked: results that do not fit raise
//! `OverflowError`. `/` always produces a float; `//` and `%` round toward
//! negative infinity.

use crate::ast::{BinOp, CmpOp, UnaryOp};
use crate::error::Exception;
use crate::value::Value;
use std::cmp::Ordering;

/// Longest list or string a single operation may build.
pub const MAX_SEQUENCE_LEN: usize = 1 << 24;

pub fn unary(op: UnaryOp, operand: &Value) -> Result<Value, Exception> {
    match (op, operand) {
        (UnaryOp::Not, value) => Ok(Value::Bool(!value.truthy())),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Pos, Value::Float(f)) => Ok(Value::Float(*f)),
        (op, value) => {
            let symbol = if op == UnaryOp::Neg { "-" } else { "+" };
            let Some(i) = value.as_int() else {
                return Err(Exception::type_error(format!(
                    "bad operand type for unary {}: '{}'",
                    symbol,
                    value.type_name()
                )));
            };
            if op == UnaryOp::Pos {
                return Ok(Value::Int(i));
            }
            i.checked_neg().map(Value::Int).ok_or_else(int_overflow)
        }
    }
}

pub fn binary(op: BinOp, left: &Value, right: &Value) -> Result<Value, Exception> {
    match (op, left, right) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => {
            check_len(a.len().saturating_add(b.len()))?;
            Ok(Value::str(format!("{}{}", a, b)))
        }
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            check_len(items.len())?;
            Ok(Value::list(items))
        }
        (BinOp::Mul, Value::Str(_) | Value::List(_), count) if count.as_int().is_some() => {
            repeat(left, count.as_int().unwrap_or(0))
        }
        (BinOp::Mul, count, Value::Str(_) | Value::List(_)) if count.as_int().is_some() => {
            repeat(right, count.as_int().unwrap_or(0))
        }
        _ => {
            if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
                return int_op(op, a, b);
            }
            if let (Some(a), Some(b)) = (left.as_float(), right.as_float()) {
                return float_op(op, a, b);
            }
            Err(Exception::type_error(format!(
                "unsupported operand type(s) for {}: '{}' and '{}'",
                op.symbol(),
                left.type_name(),
                right.type_name()
            )))
        }
    }
}

fn int_overflow() -> Exception {
    Exception::overflow("int too large")
}

fn int_op(op: BinOp, a: i64, b: i64) -> Result<Value, Exception> {
    let result = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Sub => a.checked_sub(b),
        BinOp::Mul => a.checked_mul(b),
        BinOp::Div => {
            if b == 0 {
                return Err(Exception::zero_division("division by zero"));
            }
            return Ok(Value::Float(a as f64 / b as f64));
        }
        BinOp::FloorDiv => {
            if b == 0 {
                return Err(Exception::zero_division("integer division or modulo by zero"));
            }
            a.checked_div(b).map(|q| {
                if a % b != 0 && ((a < 0) != (b < 0)) {
                    q - 1
                } else {
                    q
                }
            })
        }
        BinOp::Mod => {
            if b == 0 {
                return Err(Exception::zero_division("integer modulo by zero"));
            }
            a.checked_rem(b).map(|r| if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r })
        }
        BinOp::Pow => return int_pow(a, b),
    };
    result.map(Value::Int).ok_or_else(int_overflow)
}

fn int_pow(base: i64, exponent: i64) -> Result<Value, Exception> {
    if exponent < 0 {
        if base == 0 {
            return Err(Exception::zero_division(
                "0.0 cannot be raised to a negative power",
            ));
        }
        return Ok(Value::Float((base as f64).powf(exponent as f64)));
    }
    match base {
        0 | 1 => return Ok(Value::Int(if exponent == 0 { 1 } else { base })),
        -1 => return Ok(Value::Int(if exponent % 2 == 0 { 1 } else { -1 })),
        _ => {}
    }
    u32::try_from(exponent)
        .ok()
        .and_then(|exponent| base.checked_pow(exponent))
        .map(Value::Int)
        .ok_or_else(int_overflow)
}

fn float_op(op: BinOp, a: f64, b: f64) -> Result<Value, Exception> {
    let result = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b == 0.0 {
                return Err(Exception::zero_division("float division by zero"));
            }
            a / b
        }
        BinOp::FloorDiv => {
            if b == 0.0 {
                return Err(Exception::zero_division("float floor division by zero"));
            }
            (a / b).floor()
        }
        BinOp::Mod => {
            if b == 0.0 {
                return Err(Exception::zero_division("float modulo"));
            }
            let r = a % b;
            if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                r + b
            } else {
                r
            }
        }
        BinOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(Exception::zero_division(
                    "0.0 cannot be raised to a negative power",
                ));
            }
            if a < 0.0 && b.fract() != 0.0 {
                return Err(Exception::value_error(
                    "negative number cannot be raised to a fractional power",
                ));
            }
            let result = a.powf(b);
            if result.is_infinite() && a.is_finite() && b.is_finite() {
                return Err(Exception::overflow("(34, 'Numerical result out of range')"));
            }
            result
        }
    };
    Ok(Value::Float(result))
}

fn check_len(len: usize) -> Result<(), Exception> {
    if len > MAX_SEQUENCE_LEN {
        return Err(Exception::memory_error("sequence too large"));
    }
    Ok(())
}

fn repeat(sequence: &Value, count: i64) -> Result<Value, Exception> {
    let count = usize::try_from(count).unwrap_or(0);
    match sequence {
        Value::Str(s) => {
            check_len(s.len().saturating_mul(count))?;
            Ok(Value::str(s.repeat(count)))
        }
        Value::List(items) => {
            let items = items.borrow();
            check_len(items.len().saturating_mul(count))?;
            let mut out = Vec::with_capacity(items.len() * count);
            for _ in 0..count {
                out.extend(items.iter().cloned());
            }
            Ok(Value::list(out))
        }
        other => Err(Exception::type_error(format!(
            "can't multiply sequence of type '{}'",
            other.type_name()
        ))),
    }
}

pub fn compare(op: CmpOp, left: &Value, right: &Value) -> Result<bool, Exception> {
    let ordering = match op {
        CmpOp::Eq => return Ok(left.py_eq(right)),
        CmpOp::NotEq => return Ok(!left.py_eq(right)),
        CmpOp::In => return contains(right, left),
        CmpOp::NotIn => return contains(right, left).map(|found| !found),
        _ => ordering(op.symbol(), left, right)?,
    };

    let Some(ordering) = ordering else {
        return Ok(false);
    };
    Ok(match op {
        CmpOp::Lt => ordering == Ordering::Less,
        CmpOp::Le => ordering != Ordering::Greater,
        CmpOp::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    })
}

/// Orders two values, `None` when incomparable floats are involved
pub fn ordering(symbol: &str, left: &Value, right: &Value) -> Result<Option<Ordering>, Exception> {
    if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
        return Ok(Some(a.cmp(&b)));
    }
    if let (Some(a), Some(b)) = (left.as_float(), right.as_float()) {
        return Ok(a.partial_cmp(&b));
    }
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
        (Value::List(a), Value::List(b)) => {
            let (a, b) = (a.borrow(), b.borrow());
            for (x, y) in a.iter().zip(b.iter()) {
                if !x.py_eq(y) {
                    return ordering(symbol, x, y);
                }
            }
            Ok(Some(a.len().cmp(&b.len())))
        }
        _ => Err(Exception::type_error(format!(
            "'{}' not supported between instances of '{}' and '{}'",
            symbol,
            left.type_name(),
            right.type_name()
        ))),
    }
}

pub fn contains(container: &Value, item: &Value) -> Result<bool, Exception> {
    match (container, item) {
        (Value::Str(haystack), Value::Str(needle)) => Ok(haystack.contains(&**needle)),
        (Value::Str(_), other) => Err(Exception::type_error(format!(
            "'in <string>' requires string as left operand, not {}",
            other.type_name()
        ))),
        (Value::List(items), item) => Ok(items.borrow().iter().any(|x| x.py_eq(item))),
        (other, _) => Err(Exception::type_error(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

fn normalize(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { index + len } else { index };
    if (0..len).contains(&index) {
        usize::try_from(index).ok()
    } else {
        None
    }
}

fn index_int(container: &Value, index: &Value) -> Result<i64, Exception> {
    index.as_int().ok_or_else(|| {
        let what = if matches!(container, Value::Str(_)) { "string" } else { "list" };
        Exception::type_error(format!(
            "{} indices must be integers, not {}",
            what,
            index.type_name()
        ))
    })
}

pub fn get_index(container: &Value, index: &Value) -> Result<Value, Exception> {
    match container {
        Value::List(items) => {
            let i = index_int(container, index)?;
            let items = items.borrow();
            normalize(i, items.len())
                .and_then(|i| items.get(i).cloned())
                .ok_or_else(|| Exception::index_error("list index out of range"))
        }
        Value::Str(text) => {
            let i = index_int(container, index)?;
            normalize(i, text.chars().count())
                .and_then(|i| text.chars().nth(i))
                .map(|c| Value::str(c.to_string()))
                .ok_or_else(|| Exception::index_error("string index out of range"))
        }
        other => Err(Exception::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

pub fn set_index(container: &Value, index: &Value, value: Value) -> Result<(), Exception> {
    match container {
        Value::List(items) => {
            let i = index_int(container, index)?;
            let mut items = items.borrow_mut();
            let slot = normalize(i, items.len())
                .ok_or_else(|| Exception::index_error("list assignment index out of range"))?;
            items[slot] = value;
            Ok(())
        }
        other => Err(Exception::type_error(format!(
            "'{}' object does not support item assignment",
            other.type_name()
        ))),
    }
}

pub fn del_index(container: &Value, index: &Value) -> Result<(), Exception> {
    match container {
        Value::List(items) => {
            let i = index_int(container, index)?;
            let mut items = items.borrow_mut();
            let slot = normalize(i, items.len())
                .ok_or_else(|| Exception::index_error("list assignment index out of range"))?;
            items.remove(slot);
            Ok(())
        }
        other => Err(Exception::type_error(format!(
            "'{}' object doesn't support item deletion",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i64) -> Value {
        Value::Int(v)
    }

    #[test]
    fn test_floor_division_rounds_down() {
        assert_eq!(binary(BinOp::FloorDiv, &int(7), &int(2)).unwrap(), int(3));
        assert_eq!(binary(BinOp::FloorDiv, &int(-7), &int(2)).unwrap(), int(-4));
        assert_eq!(binary(BinOp::Mod, &int(-7), &int(2)).unwrap(), int(1));
        assert_eq!(binary(BinOp::Mod, &int(7), &int(-2)).unwrap(), int(-1));
    }

    #[test]
    fn test_true_division_is_float() {
        assert_eq!(binary(BinOp::Div, &int(1), &int(2)).unwrap(), Value::Float(0.5));
    }

    #[test]
    fn test_division_by_zero_messages() {
        let err = binary(BinOp::Div, &int(1), &int(0)).unwrap_err();
        assert_eq!(err.ename, "ZeroDivisionError");
        assert_eq!(err.message, "division by zero");

        let err = binary(BinOp::Div, &Value::Float(1.0), &int(0)).unwrap_err();
        assert_eq!(err.message, "float division by zero");
    }

    #[test]
    fn test_integer_overflow() {
        let err = binary(BinOp::Mul, &int(i64::MAX), &int(2)).unwrap_err();
        assert_eq!(err.ename, "OverflowError");
        assert!(binary(BinOp::Pow, &int(2), &int(80)).is_err());
        assert_eq!(binary(BinOp::Pow, &int(2), &int(10)).unwrap(), int(1024));
        assert_eq!(binary(BinOp::Pow, &int(2), &int(-1)).unwrap(), Value::Float(0.5));
    }

    #[test]
    fn test_sequence_operators() {
        let s = binary(BinOp::Add, &Value::str("ab"), &Value::str("cd")).unwrap();
        assert_eq!(s, Value::str("abcd"));
        let s = binary(BinOp::Mul, &Value::str("ab"), &int(3)).unwrap();
        assert_eq!(s, Value::str("ababab"));
        let l = binary(BinOp::Mul, &int(2), &Value::list(vec![int(1)])).unwrap();
        assert_eq!(l.repr(), "[1, 1]");
    }

    #[test]
    fn test_huge_repeat_is_memory_error() {
        let err = binary(BinOp::Mul, &Value::str("x"), &int(1 << 40)).unwrap_err();
        assert_eq!(err.ename, "MemoryError");
    }

    #[test]
    fn test_mixed_type_addition_fails() {
        let err = binary(BinOp::Add, &int(1), &Value::str("a")).unwrap_err();
        assert_eq!(err.message, "unsupported operand type(s) for +: 'int' and 'str'");
    }

    #[test]
    fn test_comparisons() {
        assert!(compare(CmpOp::Lt, &int(1), &Value::Float(1.5)).unwrap());
        assert!(compare(CmpOp::In, &Value::str("b"), &Value::str("abc")).unwrap());
        assert!(compare(CmpOp::NotIn, &int(4), &Value::list(vec![int(1)])).unwrap());
        assert!(compare(CmpOp::Lt, &int(1), &Value::str("a")).is_err());
        assert!(!compare(CmpOp::Lt, &Value::Float(f64::NAN), &int(1)).unwrap());
    }

    #[test]
    fn test_indexing() {
        let list = Value::list(vec![int(1), int(2), int(3)]);
        assert_eq!(get_index(&list, &int(-1)).unwrap(), int(3));
        assert_eq!(get_index(&list, &int(3)).unwrap_err().ename, "IndexError");
        set_index(&list, &int(0), int(9)).unwrap();
        del_index(&list, &int(1)).unwrap();
        assert_eq!(list.repr(), "[9, 3]");
        assert_eq!(get_index(&Value::str("héllo"), &int(1)).unwrap(), Value::str("é"));
    }

    #[test]
    fn test_unary() {
        assert_eq!(unary(UnaryOp::Neg, &int(3)).unwrap(), int(-3));
        assert_eq!(unary(UnaryOp::Not, &int(0)).unwrap(), Value::Bool(true));
        assert!(unary(UnaryOp::Neg, &int(i64::MIN)).is_err());
        assert!(unary(UnaryOp::Neg, &Value::str("a")).is_err());
    }
}
