use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};

use crate::callable::{FunctionData, LoxFunction, NativeFunction};
use crate::class::LoxClass;
use crate::environment::{self, Environment};
use crate::error::LoxError;
use crate::expr::Expr;
use crate::instance::LoxInstance;
use crate::stmt::Stmt;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Control flow leaving a statement early.  A `return` unwind is not an
/// error, it just rides the same channel so `?` propagates both; the call
/// boundary in [`LoxFunction::call`](crate::callable::LoxFunction::call)
/// catches `Return` and the public API only ever reports `Failure`.
#[derive(Debug)]
pub enum Unwind {
    Return(Value),
    Failure(LoxError),
}

impl From<LoxError> for Unwind {
    fn from(err: LoxError) -> Self {
        Unwind::Failure(err)
    }
}

/// Tree-walking evaluator over the resolved AST.
///
/// `globals` is the fixed outermost environment; `environment` is the
/// innermost one at the current point of execution.  `print` output goes
/// through the caller-supplied writer so the driver passes stdout and tests
/// capture a buffer.
pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        let globals = Rc::new(RefCell::new(Environment::new()));

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction(Rc::new(NativeFunction {
                name: "clock",
                arity: 0,
                func: clock_native,
            })),
        );

        Interpreter {
            environment: Rc::clone(&globals),
            globals,
        }
    }

    pub fn interpret(&mut self, statements: &[Stmt], output: &mut dyn Write) -> Result<(), LoxError> {
        info!("Interpreting {} statement(s)", statements.len());

        for stmt in statements {
            match self.execute(stmt, output) {
                Ok(()) => {}

                Err(Unwind::Failure(err)) => return Err(err),

                // The resolver rejects top-level returns before we get here.
                Err(Unwind::Return(_)) => return Ok(()),
            }
        }

        Ok(())
    }

    fn execute(&mut self, stmt: &Stmt, output: &mut dyn Write) -> Result<(), Unwind> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr, output)?;

                Ok(())
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr, output)?;

                writeln!(output, "{}", value).map_err(|e| Unwind::Failure(e.into()))?;

                Ok(())
            }

            Stmt::Var { name, initializer } => {
                let value: Value = if let Some(expr) = initializer {
                    self.evaluate(expr, output)?
                } else {
                    Value::Nil
                };

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(())
            }

            Stmt::Block(statements) => {
                let child = Environment::with_enclosing(Rc::clone(&self.environment));

                self.execute_block(statements, Rc::new(RefCell::new(child)), output)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition, output)?) {
                    self.execute(then_branch, output)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch, output)?;
                }

                Ok(())
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition, output)?) {
                    self.execute(body, output)?;
                }

                Ok(())
            }

            Stmt::Function { name, params, body } => {
                let declaration = Rc::new(FunctionData {
                    name: name.clone(),
                    params: params.clone(),
                    body: body.clone(),
                });

                let function =
                    LoxFunction::new(declaration, Rc::clone(&self.environment), false);

                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, Value::Function(Rc::new(function)));

                Ok(())
            }

            Stmt::Return { keyword: _, value } => {
                let value: Value = if let Some(expr) = value {
                    self.evaluate(expr, output)?
                } else {
                    Value::Nil
                };

                Err(Unwind::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let superclass_value: Option<Rc<LoxClass>> = match superclass {
                    Some(expr) => {
                        let value = self.evaluate(expr, output)?;

                        match value {
                            Value::Class(class) => Some(class),

                            _ => {
                                let line = match expr {
                                    Expr::Variable { name, .. } => name.line,
                                    _ => name.line,
                                };

                                return Err(LoxError::runtime(
                                    line,
                                    "Can only inherit from classes.",
                                )
                                .into());
                            }
                        }
                    }

                    None => None,
                };

                // Methods close over an environment where `super` is bound,
                // so every method of this class sees the same superclass.
                let defining_env: Rc<RefCell<Environment>> = match &superclass_value {
                    Some(superclass) => {
                        let mut env = Environment::with_enclosing(Rc::clone(&self.environment));
                        env.define("super", Value::Class(Rc::clone(superclass)));
                        Rc::new(RefCell::new(env))
                    }

                    None => Rc::clone(&self.environment),
                };

                let mut method_table: HashMap<String, LoxFunction> = HashMap::new();

                for method in methods {
                    if let Stmt::Function {
                        name: method_name,
                        params,
                        body,
                    } = method
                    {
                        let declaration = Rc::new(FunctionData {
                            name: method_name.clone(),
                            params: params.clone(),
                            body: body.clone(),
                        });

                        let function = LoxFunction::new(
                            declaration,
                            Rc::clone(&defining_env),
                            method_name.lexeme == "init",
                        );

                        method_table.insert(method_name.lexeme.clone(), function);
                    }
                }

                let class = LoxClass::new(name.lexeme.clone(), superclass_value, method_table);

                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, Value::Class(Rc::new(class)));

                Ok(())
            }
        }
    }

    /// Runs `statements` with `env` as the current environment, restoring the
    /// previous one on every exit path.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        env: Rc<RefCell<Environment>>,
        output: &mut dyn Write,
    ) -> Result<(), Unwind> {
        let previous: Rc<RefCell<Environment>> = Rc::clone(&self.environment);

        self.environment = env;

        let mut result: Result<(), Unwind> = Ok(());

        for stmt in statements {
            result = self.execute(stmt, output);

            if result.is_err() {
                break;
            }
        }

        self.environment = previous;

        result
    }

    fn evaluate(&mut self, expr: &Expr, output: &mut dyn Write) -> Result<Value, Unwind> {
        match expr {
            Expr::Literal(token) => self.evaluate_literal(token).map_err(Unwind::from),

            Expr::Grouping(inner) => self.evaluate(inner, output),

            Expr::Unary { operator, right } => {
                let value = self.evaluate(right, output)?;

                self.evaluate_unary(operator, value).map_err(Unwind::from)
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left_val = self.evaluate(left, output)?;
                let right_val = self.evaluate(right, output)?;

                self.evaluate_binary(left_val, operator, right_val)
                    .map_err(Unwind::from)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_val = self.evaluate(left, output)?;

                // Short-circuit: yield the operand value itself, never a
                // coerced boolean.
                match operator.token_type {
                    TokenType::OR if is_truthy(&left_val) => Ok(left_val),

                    TokenType::AND if !is_truthy(&left_val) => Ok(left_val),

                    _ => self.evaluate(right, output),
                }
            }

            Expr::Variable { name, depth } => self.look_up(name, *depth).map_err(Unwind::from),

            Expr::Assign { name, value, depth } => {
                let value = self.evaluate(value, output)?;

                match depth {
                    None => self
                        .globals
                        .borrow_mut()
                        .assign(&name.lexeme, value.clone(), name.line)?,

                    Some(distance) => environment::assign_at(
                        &self.environment,
                        *distance,
                        &name.lexeme,
                        value.clone(),
                        name.line,
                    )?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_val = self.evaluate(callee, output)?;

                let mut args: Vec<Value> = Vec::new();

                for arg in arguments {
                    args.push(self.evaluate(arg, output)?);
                }

                self.call_value(callee_val, args, paren, output)
            }

            Expr::Get { object, name } => {
                let object = self.evaluate(object, output)?;

                match object {
                    Value::Instance(instance) => {
                        LoxInstance::get(&instance, name).map_err(Unwind::from)
                    }

                    _ => Err(LoxError::runtime(
                        name.line,
                        "Only instances have properties.",
                    )
                    .into()),
                }
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object = self.evaluate(object, output)?;

                match object {
                    Value::Instance(instance) => {
                        let value = self.evaluate(value, output)?;

                        instance.borrow_mut().set(name, value.clone());

                        Ok(value)
                    }

                    _ => Err(LoxError::runtime(name.line, "Only instances have fields.").into()),
                }
            }

            Expr::This { keyword, depth } => self.look_up(keyword, *depth).map_err(Unwind::from),

            Expr::Super {
                keyword,
                method,
                depth,
            } => self.evaluate_super(keyword, method, *depth),
        }
    }

    fn call_value(
        &mut self,
        callee: Value,
        args: Vec<Value>,
        paren: &Token,
        output: &mut dyn Write,
    ) -> Result<Value, Unwind> {
        match callee {
            Value::Function(function) => {
                debug!("Calling function {}", function.name());

                if args.len() != function.arity() {
                    return Err(arity_error(function.arity(), args.len(), paren).into());
                }

                function.call(self, args, output)
            }

            Value::NativeFunction(native) => {
                debug!("Calling native function {}", native.name);

                if args.len() != native.arity {
                    return Err(arity_error(native.arity, args.len(), paren).into());
                }

                (native.func)(&args).map_err(Unwind::from)
            }

            Value::Class(class) => {
                debug!("Instantiating class {}", class.name());

                if args.len() != class.arity() {
                    return Err(arity_error(class.arity(), args.len(), paren).into());
                }

                let instance = LoxInstance::new(Rc::clone(&class));

                if let Some(init) = class.find_method("init") {
                    init.bind(Rc::clone(&instance)).call(self, args, output)?;
                }

                Ok(Value::Instance(instance))
            }

            _ => Err(LoxError::runtime(
                paren.line,
                "Can only call functions and classes.",
            )
            .into()),
        }
    }

    fn evaluate_super(
        &mut self,
        keyword: &Token,
        method: &Token,
        depth: Option<usize>,
    ) -> Result<Value, Unwind> {
        // The resolver placed `super` one scope outside `this`, so both are
        // reachable from the resolved distance.
        let distance = match depth {
            Some(distance) => distance,
            None => {
                return Err(
                    LoxError::runtime(keyword.line, "Undefined variable 'super'.").into(),
                )
            }
        };

        let superclass = environment::get_at(&self.environment, distance, "super", keyword.line)?;
        let this = environment::get_at(&self.environment, distance - 1, "this", keyword.line)?;

        match (superclass, this) {
            (Value::Class(superclass), Value::Instance(instance)) => {
                match superclass.find_method(&method.lexeme) {
                    Some(found) => Ok(Value::Function(Rc::new(found.bind(instance)))),

                    None => Err(LoxError::runtime(
                        method.line,
                        format!("Undefined property '{}'.", method.lexeme),
                    )
                    .into()),
                }
            }

            _ => Err(LoxError::runtime(keyword.line, "Undefined variable 'super'.").into()),
        }
    }

    fn look_up(&self, name: &Token, depth: Option<usize>) -> Result<Value, LoxError> {
        match depth {
            None => self.globals.borrow().get(&name.lexeme, name.line),

            Some(distance) => {
                environment::get_at(&self.environment, distance, &name.lexeme, name.line)
            }
        }
    }

    fn evaluate_literal(&self, token: &Token) -> Result<Value, LoxError> {
        match &token.token_type {
            TokenType::NUMBER(n) => Ok(Value::Number(*n)),

            TokenType::STRING(s) => Ok(Value::String(s.clone())),

            TokenType::TRUE => Ok(Value::Bool(true)),

            TokenType::FALSE => Ok(Value::Bool(false)),

            TokenType::NIL => Ok(Value::Nil),

            _ => Err(LoxError::runtime(token.line, "Invalid literal.")),
        }
    }

    fn evaluate_unary(&self, operator: &Token, value: Value) -> Result<Value, LoxError> {
        match operator.token_type {
            TokenType::MINUS => match value {
                Value::Number(n) => Ok(Value::Number(-n)),

                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operand must be a number.",
                )),
            },

            TokenType::BANG => Ok(Value::Bool(!is_truthy(&value))),

            // The parser never produces unary '+'; treat one as a no-op.
            TokenType::PLUS => Ok(value),

            _ => Err(LoxError::runtime(operator.line, "Invalid unary operator.")),
        }
    }

    fn evaluate_binary(
        &self,
        left: Value,
        operator: &Token,
        right: Value,
    ) -> Result<Value, LoxError> {
        match operator.token_type {
            TokenType::PLUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),

                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operands must be two numbers or two strings.",
                )),
            },

            TokenType::MINUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),

                _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            TokenType::STAR => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),

                _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            TokenType::SLASH => match (left, right) {
                // IEEE-754 semantics throughout, so dividing by zero yields
                // an infinity rather than an error.
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),

                _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(is_equal(&left, &right))),

            TokenType::BANG_EQUAL => Ok(Value::Bool(!is_equal(&left, &right))),

            TokenType::LESS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),

                _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            TokenType::LESS_EQUAL => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),

                _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            TokenType::GREATER => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),

                _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            TokenType::GREATER_EQUAL => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),

                _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            _ => Err(LoxError::runtime(operator.line, "Invalid binary operator.")),
        }
    }
}

fn arity_error(expected: usize, got: usize, paren: &Token) -> LoxError {
    LoxError::runtime(
        paren.line,
        format!("Expected {} arguments but got {}.", expected, got),
    )
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,

        Value::Bool(b) => *b,

        _ => true,
    }
}

fn is_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Nil, Value::Nil) => true,

        (Value::Bool(a), Value::Bool(b)) => a == b,

        (Value::Number(a), Value::Number(b)) => a == b,

        (Value::String(a), Value::String(b)) => a == b,

        // Handles compare by identity.
        (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),

        (Value::NativeFunction(a), Value::NativeFunction(b)) => Rc::ptr_eq(a, b),

        (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),

        (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),

        _ => false,
    }
}

fn clock_native(_args: &[Value]) -> Result<Value, LoxError> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| LoxError::runtime(0, format!("Clock error: {}", e)))?
        .as_secs_f64();

    Ok(Value::Number(timestamp))
}
