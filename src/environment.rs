use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{LoxError, Result};
use crate::value::Value;

/// A lexical scope at runtime: a name to value map plus a link to the
/// enclosing scope.  Environments are shared through `Rc<RefCell<_>>` so a
/// closure keeps its whole parent chain alive for as long as the function
/// value is reachable; chains only ever point upward, so no cycles.
#[derive(Debug)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str, line: usize) -> Result<Value> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(LoxError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(LoxError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }
}

/// Reads `name` from the environment exactly `distance` parent links above
/// `env`.  The resolver guarantees the binding is there; a miss still reports
/// cleanly rather than panicking.
pub fn get_at(
    env: &Rc<RefCell<Environment>>,
    distance: usize,
    name: &str,
    line: usize,
) -> Result<Value> {
    let target = ancestor(env, distance)
        .ok_or_else(|| LoxError::runtime(line, format!("Undefined variable '{}'.", name)))?;

    let value = target.borrow().values.get(name).cloned();

    value.ok_or_else(|| LoxError::runtime(line, format!("Undefined variable '{}'.", name)))
}

/// Assigns `name` in the environment exactly `distance` parent links above
/// `env`.
pub fn assign_at(
    env: &Rc<RefCell<Environment>>,
    distance: usize,
    name: &str,
    value: Value,
    line: usize,
) -> Result<()> {
    let target = ancestor(env, distance)
        .ok_or_else(|| LoxError::runtime(line, format!("Undefined variable '{}'.", name)))?;

    let mut target = target.borrow_mut();

    if target.values.contains_key(name) {
        target.values.insert(name.to_string(), value);
        Ok(())
    } else {
        Err(LoxError::runtime(
            line,
            format!("Undefined variable '{}'.", name),
        ))
    }
}

fn ancestor(env: &Rc<RefCell<Environment>>, distance: usize) -> Option<Rc<RefCell<Environment>>> {
    let mut current = Rc::clone(env);

    for _ in 0..distance {
        let parent = current.borrow().enclosing.as_ref().map(Rc::clone);
        current = parent?;
    }

    Some(current)
}
