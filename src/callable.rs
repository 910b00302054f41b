use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use log::debug;

use crate::environment::{self, Environment};
use crate::error::LoxError;
use crate::instance::LoxInstance;
use crate::interpreter::{Interpreter, Unwind};
use crate::stmt::Stmt;
use crate::token::Token;
use crate::value::Value;

/// The name, parameters and body of a `fun` declaration, snapshotted when
/// the declaration executes and shared between every binding of the function.
#[derive(Debug)]
pub struct FunctionData {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

/// A user-defined function value: a declaration snapshot plus the environment
/// captured where the declaration executed.
#[derive(Debug, Clone)]
pub struct LoxFunction {
    declaration: Rc<FunctionData>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(
        declaration: Rc<FunctionData>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        LoxFunction {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Produce a bound method: same declaration, but the closure is extended
    /// with a fresh scope holding `this`.
    pub fn bind(&self, instance: Rc<RefCell<LoxInstance>>) -> LoxFunction {
        let mut bound_env = Environment::with_enclosing(Rc::clone(&self.closure));
        bound_env.define("this", Value::Instance(instance));

        LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: Rc::new(RefCell::new(bound_env)),
            is_initializer: self.is_initializer,
        }
    }

    /// Call convention: parameters are defined in a fresh child of the
    /// closure, the body runs as a block in it, and a `return` unwind is
    /// caught here.  Initializers always yield the `this` their closure
    /// captured, whatever the body did.
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        output: &mut dyn Write,
    ) -> Result<Value, Unwind> {
        debug!("Calling <fn {}>", self.name());

        let mut call_env = Environment::with_enclosing(Rc::clone(&self.closure));

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            call_env.define(&param.lexeme, argument);
        }

        let result = interpreter.execute_block(
            &self.declaration.body,
            Rc::new(RefCell::new(call_env)),
            output,
        );

        match result {
            Ok(()) => {
                if self.is_initializer {
                    self.captured_this()
                } else {
                    Ok(Value::Nil)
                }
            }

            Err(Unwind::Return(value)) => {
                if self.is_initializer {
                    self.captured_this()
                } else {
                    Ok(value)
                }
            }

            Err(other) => Err(other),
        }
    }

    fn captured_this(&self) -> Result<Value, Unwind> {
        environment::get_at(&self.closure, 0, "this", self.declaration.name.line)
            .map_err(Unwind::from)
    }
}

/// A builtin implemented in Rust.
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value]) -> Result<Value, LoxError>,
}

impl std::fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}
