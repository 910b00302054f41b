use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::class::LoxClass;
use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;

/// An object: a class reference plus its own mutable field map.
#[derive(Debug)]
pub struct LoxInstance {
    class: Rc<LoxClass>,
    fields: HashMap<String, Value>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Rc<RefCell<LoxInstance>> {
        Rc::new(RefCell::new(LoxInstance {
            class,
            fields: HashMap::new(),
        }))
    }

    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    /// Property access: fields shadow methods, and a method found on the
    /// class comes back bound to this instance.
    pub fn get(instance: &Rc<RefCell<LoxInstance>>, name: &Token) -> Result<Value> {
        if let Some(value) = instance.borrow().fields.get(&name.lexeme) {
            return Ok(value.clone());
        }

        let method = instance.borrow().class.find_method(&name.lexeme);

        match method {
            Some(method) => Ok(Value::Function(Rc::new(method.bind(Rc::clone(instance))))),

            None => Err(LoxError::runtime(
                name.line,
                format!("Undefined property '{}'.", name.lexeme),
            )),
        }
    }

    pub fn set(&mut self, name: &Token, value: Value) {
        self.fields.insert(name.lexeme.clone(), value);
    }
}
