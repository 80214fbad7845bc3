//! Tree-walking evaluator

use crate::ast::{BinOp, BoolOp, Expr, Program, Stmt, StmtKind, Target};
use crate::builtins::{call_value, Args, Builtins, CallContext};
use crate::error::{CompileError, Exception, RuntimeError};
use crate::host::Host;
use crate::namespace::Namespace;
use crate::value::Value;
use crate::{completer, inspect, ops, parser};

/// Compiles and runs programs against a caller-owned namespace
///
/// The interpreter itself only holds the built-in scope. All user state
/// lives in the [`Namespace`] passed to [`Interpreter::execute`], so the
/// same namespace keeps its bindings across executions.
#[derive(Debug, Default)]
pub struct Interpreter {
    builtins: Builtins,
}

impl Interpreter {
    /// Creates an interpreter with a fresh built-in scope
    pub fn new() -> Self {
        Self {
            builtins: Builtins::new(),
        }
    }

    pub fn builtins(&self) -> &Builtins {
        &self.builtins
    }

    /// Compiles source text
    pub fn compile(&self, source: &str) -> Result<Program, CompileError> {
        parser::parse(source)
    }

    /// Runs a program with module-scope semantics
    ///
    /// Returns the value of the final statement when it is an expression
    /// whose value is not `None`.
    pub fn execute(
        &self,
        program: &Program,
        ns: &mut Namespace,
        host: &mut dyn Host,
    ) -> Result<Option<Value>, RuntimeError> {
        let mut evaluator = Evaluator {
            builtins: &self.builtins,
            ns,
            host,
        };

        let mut last = None;
        for stmt in &program.stmts {
            last = evaluator.exec(stmt).map_err(|exception| {
                tracing::debug!(ename = %exception.ename, line = stmt.line, "execution raised");
                RuntimeError {
                    exception,
                    line: stmt.line,
                    source_line: program.source_line(stmt.line).to_string(),
                }
            })?;
        }

        Ok(last.filter(|value| !value.is_none()))
    }

    /// Completion candidates for the token at the cursor
    pub fn complete(&self, ns: &Namespace, line: &str, text: &str) -> Vec<String> {
        completer::complete(ns, &self.builtins, line, text)
    }

    /// Docstring of the deepest resolvable object in a dotted name
    pub fn object_doc(&self, ns: &Namespace, oname: &str) -> String {
        inspect::object_doc(ns, &self.builtins, oname)
    }
}

struct Evaluator<'a> {
    builtins: &'a Builtins,
    ns: &'a mut Namespace,
    host: &'a mut dyn Host,
}

impl<'a> Evaluator<'a> {
    /// Runs one statement; expression statements yield their value
    fn exec(&mut self, stmt: &Stmt) -> Result<Option<Value>, Exception> {
        match &stmt.kind {
            StmtKind::Expr(expr) => return self.eval(expr).map(Some),
            StmtKind::Assign { targets, value } => {
                let value = self.eval(value)?;
                for target in targets {
                    self.assign(target, value.clone())?;
                }
            }
            StmtKind::AugAssign { target, op, value } => self.aug_assign(target, *op, value)?,
            StmtKind::Del(targets) => {
                for target in targets {
                    self.delete(target)?;
                }
            }
            StmtKind::Raise(expr) => return Err(self.raise(expr.as_ref())?),
            StmtKind::Pass => {}
        }
        Ok(None)
    }

    fn raise(&mut self, expr: Option<&Expr>) -> Result<Exception, Exception> {
        let Some(expr) = expr else {
            return Ok(Exception::runtime("No active exception to reraise"));
        };
        match self.eval(expr)? {
            Value::Exception(exception) => Ok((*exception).clone()),
            Value::Builtin(class) if class.is_exception_class() => {
                Ok(Exception::new(class.name, ""))
            }
            _ => Ok(Exception::type_error(
                "exceptions must derive from BaseException",
            )),
        }
    }

    fn lookup(&self, name: &str) -> Result<Value, Exception> {
        self.ns
            .get(name)
            .or_else(|| self.builtins.get(name))
            .cloned()
            .ok_or_else(|| Exception::name_error(name))
    }

    fn assign(&mut self, target: &Target, value: Value) -> Result<(), Exception> {
        match target {
            Target::Name(name) => {
                self.ns.set(name.clone(), value);
                Ok(())
            }
            Target::Attribute { value: object, attr } => {
                let object = self.eval(object)?;
                object.set_attr(attr, value)
            }
            Target::Index { value: container, index } => {
                let container = self.eval(container)?;
                let index = self.eval(index)?;
                ops::set_index(&container, &index, value)
            }
        }
    }

    fn aug_assign(&mut self, target: &Target, op: BinOp, value: &Expr) -> Result<(), Exception> {
        match target {
            Target::Name(name) => {
                let current = self.lookup(name)?;
                let rhs = self.eval(value)?;
                let result = self.combine(op, current, &rhs)?;
                self.ns.set(name.clone(), result);
                Ok(())
            }
            Target::Attribute { value: object, attr } => {
                let object = self.eval(object)?;
                let current = object.get_attr(attr)?;
                let rhs = self.eval(value)?;
                let result = self.combine(op, current, &rhs)?;
                object.set_attr(attr, result)
            }
            Target::Index { value: container, index } => {
                let container = self.eval(container)?;
                let index = self.eval(index)?;
                let current = ops::get_index(&container, &index)?;
                let rhs = self.eval(value)?;
                let result = self.combine(op, current, &rhs)?;
                ops::set_index(&container, &index, result)
            }
        }
    }

    /// `list += x` extends in place; everything else rebinds
    fn combine(&mut self, op: BinOp, current: Value, rhs: &Value) -> Result<Value, Exception> {
        if let (BinOp::Add, Value::List(items)) = (op, &current) {
            let extra = match rhs {
                Value::List(other) => other.borrow().clone(),
                other => {
                    return Err(Exception::type_error(format!(
                        "'{}' object is not iterable",
                        other.type_name()
                    )))
                }
            };
            if items.borrow().len().saturating_add(extra.len()) > ops::MAX_SEQUENCE_LEN {
                return Err(Exception::memory_error("sequence too large"));
            }
            items.borrow_mut().extend(extra);
            return Ok(current);
        }
        ops::binary(op, &current, rhs)
    }

    fn delete(&mut self, target: &Target) -> Result<(), Exception> {
        match target {
            Target::Name(name) => self
                .ns
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| Exception::name_error(name)),
            Target::Attribute { value: object, attr } => self.eval(object)?.del_attr(attr),
            Target::Index { value: container, index } => {
                let container = self.eval(container)?;
                let index = self.eval(index)?;
                ops::del_index(&container, &index)
            }
        }
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, Exception> {
        match expr {
            Expr::None => Ok(Value::None),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Int(i) => Ok(Value::Int(*i)),
            Expr::Float(f) => Ok(Value::Float(*f)),
            Expr::Str(s) => Ok(Value::str(s)),
            Expr::List(items) => {
                let items = items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::list(items))
            }
            Expr::Name(name) => self.lookup(name),
            Expr::Attribute { value, attr } => self.eval(value)?.get_attr(attr),
            Expr::Index { value, index } => {
                let container = self.eval(value)?;
                let index = self.eval(index)?;
                ops::get_index(&container, &index)
            }
            Expr::Call { func, args, kwargs } => {
                let callee = self.eval(func)?;
                let positional = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                let mut keywords = Vec::with_capacity(kwargs.len());
                for (name, arg) in kwargs {
                    keywords.push((name.clone(), self.eval(arg)?));
                }
                let mut ctx = CallContext {
                    host: &mut *self.host,
                    ns: &*self.ns,
                };
                call_value(&mut ctx, &callee, Args { positional, keywords })
            }
            Expr::Unary { op, operand } => {
                let operand = self.eval(operand)?;
                ops::unary(*op, &operand)
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                ops::binary(*op, &left, &right)
            }
            Expr::Compare { left, links } => {
                let mut left = self.eval(left)?;
                for (op, right) in links {
                    let right = self.eval(right)?;
                    if !ops::compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left)?;
                match (op, left.truthy()) {
                    (BoolOp::And, false) | (BoolOp::Or, true) => Ok(left),
                    _ => self.eval(right),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::CaptureHost;

    fn run(ns: &mut Namespace, source: &str) -> Result<Option<Value>, RuntimeError> {
        let interpreter = Interpreter::new();
        let program = interpreter.compile(source).unwrap();
        interpreter.execute(&program, ns, &mut CaptureHost::new())
    }

    #[test]
    fn test_trailing_expression_value() {
        let mut ns = Namespace::new();
        assert_eq!(run(&mut ns, "1 + 1").unwrap(), Some(Value::Int(2)));
        assert_eq!(run(&mut ns, "x = 3").unwrap(), None);
        assert_eq!(run(&mut ns, "None").unwrap(), None);
    }

    #[test]
    fn test_bindings_persist() {
        let mut ns = Namespace::new();
        run(&mut ns, "x = 1").unwrap();
        assert_eq!(run(&mut ns, "x").unwrap(), Some(Value::Int(1)));
    }

    #[test]
    fn test_name_error_location() {
        let mut ns = Namespace::new();
        let err = run(&mut ns, "a = 1\nb = missing + 1").unwrap_err();
        assert_eq!(err.ename(), "NameError");
        assert_eq!(err.evalue(), "name 'missing' is not defined");
        assert_eq!(err.line, 2);
        assert_eq!(err.source_line, "b = missing + 1");
    }

    #[test]
    fn test_side_effects_before_error_are_kept() {
        let mut ns = Namespace::new();
        assert!(run(&mut ns, "y = 5\n1/0").is_err());
        assert_eq!(ns.get("y"), Some(&Value::Int(5)));
    }

    #[test]
    fn test_augmented_assignment() {
        let mut ns = Namespace::new();
        run(&mut ns, "n = 1\nn += 2\nn *= 4\nl = [1]\nm = l\nl += [2]").unwrap();
        assert_eq!(ns.get("n"), Some(&Value::Int(12)));
        assert_eq!(ns.get("m").unwrap().repr(), "[1, 2]");
    }

    #[test]
    fn test_raise_forms() {
        let mut ns = Namespace::new();
        let err = run(&mut ns, "raise ValueError('bad')").unwrap_err();
        assert_eq!((err.ename(), err.evalue()), ("ValueError", "bad"));

        let err = run(&mut ns, "raise KeyError").unwrap_err();
        assert_eq!(err.ename(), "NameError");

        let err = run(&mut ns, "raise RuntimeError").unwrap_err();
        assert_eq!((err.ename(), err.evalue()), ("RuntimeError", ""));

        let err = run(&mut ns, "raise 1").unwrap_err();
        assert_eq!(err.ename(), "TypeError");
    }

    #[test]
    fn test_del_and_short_circuit() {
        let mut ns = Namespace::new();
        run(&mut ns, "x = 1\ndel x").unwrap();
        assert!(!ns.contains("x"));
        assert_eq!(run(&mut ns, "0 or 'fallback'").unwrap(), Some(Value::str("fallback")));
        assert_eq!(run(&mut ns, "0 and undefined_name").unwrap(), Some(Value::Int(0)));
    }

    #[test]
    fn test_chained_comparison() {
        let mut ns = Namespace::new();
        assert_eq!(run(&mut ns, "1 < 2 < 3").unwrap(), Some(Value::Bool(true)));
        assert_eq!(run(&mut ns, "1 < 3 < 2").unwrap(), Some(Value::Bool(false)));
    }
}
