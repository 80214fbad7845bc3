//! # Script Engine
//!
//! A small, embeddable, Python-flavoured language for the interactive
//! kernel.
//!
//! ## Philosophy
//!
//! The kernel only needs four things from a language:
//! - **Compile** source into a program, reporting syntax problems
//! - **Execute** a program against a persistent namespace
//! - **Complete** a partially typed name
//! - **Inspect** a dotted name for its docstring
//!
//! Everything else (output, input) goes through an explicit [`Host`].
//!
//! ## Example
//!
//! ```
//! use script_engine::{CaptureHost, Interpreter, Namespace};
//!
//! let interpreter = Interpreter::new();
//! let mut ns = Namespace::new();
//! let mut host = CaptureHost::new();
//!
//! let program = interpreter.compile("x = 6 * 7\nprint(x)").unwrap();
//! interpreter.execute(&program, &mut ns, &mut host).unwrap();
//! assert_eq!(host.stdout, "42\n");
//! ```

pub mod ast;
pub mod builtins;
pub mod completer;
pub mod error;
pub mod eval;
pub mod host;
pub mod inspect;
pub mod lexer;
pub mod namespace;
pub mod ops;
pub mod parser;
pub mod value;

pub use ast::Program;
pub use builtins::Builtins;
pub use error::{CompileError, CompileErrorKind, Exception, RuntimeError};
pub use eval::Interpreter;
pub use host::{CaptureHost, Host, HostError, StreamName};
pub use namespace::Namespace;
pub use value::{Object, Value};
