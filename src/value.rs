//! Runtime values.
//!
//! The value model is closed: nil, booleans, numbers, strings, callables and
//! instances. Truthiness and display follow the host-scripting conventions
//! this dialect was designed around (`0`, `""` and `nil` are falsy; nil prints
//! as `None`, booleans as `True`/`False`).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::class::{Class, Instance};
use crate::error::RuntimeError;
use crate::function::Function;
use crate::interpreter::Interpreter;
use crate::token::Token;

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Callable(Callable),
    Instance(Rc<RefCell<Instance>>),
}

/// Anything that can be invoked with `(...)`.
#[derive(Debug, Clone)]
pub enum Callable {
    Function(Rc<Function>),
    Class(Rc<Class>),
}

impl Callable {
    /// Number of arguments a call must supply.
    pub fn arity(&self) -> usize {
        match self {
            Callable::Function(function) => function.arity(),
            Callable::Class(class) => class.arity(),
        }
    }

    /// Invoke with already-evaluated, arity-checked arguments.
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        match self {
            Callable::Function(function) => function.call(interpreter, arguments),
            Callable::Class(class) => Class::instantiate(class, interpreter, arguments),
        }
    }

    /// Name used in call-stack logging.
    pub fn name(&self) -> &str {
        match self {
            Callable::Function(function) => function.name(),
            Callable::Class(class) => class.name(),
        }
    }
}

impl Value {
    pub fn string<S: AsRef<str>>(s: S) -> Self {
        Value::String(Rc::from(s.as_ref()))
    }

    /// nil, `false`, `0` and `""` are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Callable(_) | Value::Instance(_) => true,
        }
    }

    pub fn as_class(&self) -> Option<&Rc<Class>> {
        match self {
            Value::Callable(Callable::Class(class)) => Some(class),
            _ => None,
        }
    }

    pub fn as_number(&self, operator: &Token) -> Result<f64, RuntimeError> {
        match self {
            Value::Number(n) => Ok(*n),
            _ => Err(RuntimeError::new(operator, "Operand must be a number.")),
        }
    }
}

/// Value equality without coercion. Callables and instances compare by
/// identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Callable(Callable::Function(a)), Value::Callable(Callable::Function(b))) => {
                Rc::ptr_eq(a, b)
            }
            (Value::Callable(Callable::Class(a)), Value::Callable(Callable::Class(b))) => {
                Rc::ptr_eq(a, b)
            }
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "None"),

            Value::Bool(true) => write!(f, "True"),

            Value::Bool(false) => write!(f, "False"),

            Value::Number(n) => write!(f, "{}", format_number(*n)),

            Value::String(s) => write!(f, "{}", s),

            Value::Callable(Callable::Function(function)) => write!(f, "{}", function),

            Value::Callable(Callable::Class(class)) => write!(f, "{}", class.name()),

            Value::Instance(instance) => write!(f, "{}", instance.borrow()),
        }
    }
}

/// Shortest round-trip rendering with a mandatory fraction for integral
/// values (`3.0`), switching to exponent form outside `[1e-4, 1e16)`.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude: f64 = n.abs();

    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        // Rust renders `1e16` / `1.5e-5`; the exponent gets a sign and two digits.
        let rendered: String = format!("{:e}", n);

        return match rendered.split_once('e') {
            Some((mantissa, exponent)) => {
                let exponent: i32 = exponent.parse().unwrap_or(0);
                let sign: char = if exponent < 0 { '-' } else { '+' };
                format!("{}e{}{:02}", mantissa, sign, exponent.abs())
            }
            None => rendered,
        };
    }

    if n.fract() == 0.0 {
        if n == 0.0 && n.is_sign_negative() {
            return "-0.0".to_string();
        }

        let mut buf: itoa::Buffer = itoa::Buffer::new();
        return format!("{}.0", buf.format(n as i64));
    }

    n.to_string()
}
