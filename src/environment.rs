//! Scope frames.
//!
//! Frames form a singly linked chain through `enclosing`. They are shared
//! (`Rc<RefCell<_>>`): a block frame dies with the block unless a closure
//! captured it, in which case it lives as long as that closure. Closures that
//! end up stored in the frame they captured form reference cycles; those are
//! expected and simply never freed.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::trace;

use crate::error::RuntimeError;
use crate::token::Token;
use crate::value::Value;

pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    /// The global frame.
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    /// Bind `name` in this frame, replacing any previous binding.
    pub fn define(&mut self, name: &str, value: Value) {
        trace!("define {} = {}", name, value);
        self.values.insert(name.to_string(), value);
    }

    /// Look `name` up along the whole chain.
    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined(name))
        }
    }

    /// Assign to an existing binding somewhere along the chain.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined(name))
        }
    }

    /// Read `name` from the frame exactly `distance` hops up from `env`.
    pub fn get_at(env: &EnvRef, distance: usize, name: &Token) -> Result<Value, RuntimeError> {
        let frame: EnvRef = Self::ancestor(env, distance).ok_or_else(|| undefined(name))?;
        let value = frame.borrow().values.get(&name.lexeme).cloned();

        value.ok_or_else(|| undefined(name))
    }

    /// Write `name` into the frame exactly `distance` hops up from `env`.
    pub fn assign_at(
        env: &EnvRef,
        distance: usize,
        name: &Token,
        value: Value,
    ) -> Result<(), RuntimeError> {
        let frame: EnvRef = Self::ancestor(env, distance).ok_or_else(|| undefined(name))?;
        frame.borrow_mut().values.insert(name.lexeme.clone(), value);

        Ok(())
    }

    /// Walk `distance` enclosing links. `None` if the chain is shorter.
    pub fn ancestor(env: &EnvRef, distance: usize) -> Option<EnvRef> {
        let mut frame: EnvRef = Rc::clone(env);

        for _ in 0..distance {
            let next = frame.borrow().enclosing.clone()?;
            frame = next;
        }

        Some(frame)
    }
}

fn undefined(name: &Token) -> RuntimeError {
    RuntimeError::new(name, format!("Undefined variable '{}'.", name.lexeme))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    fn ident(name: &str) -> Token {
        Token::new(TokenType::IDENTIFIER, name, None, 1)
    }

    #[test]
    fn get_walks_the_chain() {
        let globals = Environment::new().into_ref();
        globals.borrow_mut().define("a", Value::Number(1.0));

        let inner = Environment::with_enclosing(Rc::clone(&globals)).into_ref();

        assert_eq!(inner.borrow().get(&ident("a")).ok(), Some(Value::Number(1.0)));
        assert!(inner.borrow().get(&ident("b")).is_err());
    }

    #[test]
    fn distance_lookup_skips_shadowing_frames() {
        let outer = Environment::new().into_ref();
        outer.borrow_mut().define("x", Value::Number(1.0));

        let inner = Environment::with_enclosing(Rc::clone(&outer)).into_ref();
        inner.borrow_mut().define("x", Value::Number(2.0));

        assert_eq!(
            Environment::get_at(&inner, 1, &ident("x")).ok(),
            Some(Value::Number(1.0))
        );

        Environment::assign_at(&inner, 1, &ident("x"), Value::Number(3.0)).ok();
        assert_eq!(outer.borrow().get(&ident("x")).ok(), Some(Value::Number(3.0)));
        assert_eq!(inner.borrow().get(&ident("x")).ok(), Some(Value::Number(2.0)));
    }

    #[test]
    fn ancestor_past_the_root_is_none() {
        let root = Environment::new().into_ref();
        assert!(Environment::ancestor(&root, 1).is_none());
    }

    #[test]
    fn assign_to_undefined_name_fails() {
        let mut env = Environment::new();
        let err = env.assign(&ident("nope"), Value::Nil).unwrap_err();
        assert_eq!(err.message(), "Undefined variable 'nope'.");
    }
}
