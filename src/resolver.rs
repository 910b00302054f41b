//! Static resolution pass.
//!
//! A single AST walk that:
//! 1. **Builds lexical scopes**: maintains a stack of `HashMap<String, bool>`
//!    tracking declared (false) and fully defined (true) names in each nested
//!    block or function.  The stack is empty at global level; globals are
//!    handled dynamically by the interpreter.
//! 2. **Enforces static rules**: redeclaration in the same scope, reading a
//!    variable in its own initializer, `return` outside a function or with a
//!    value inside an initializer, `this` outside a class, `super` outside a
//!    subclass, and self-inheritance.
//! 3. **Records binding distances**: every `Variable`, `Assign`, `This` and
//!    `Super` occurrence gets its `depth` field set to the number of scopes
//!    between the use and the definition, enabling O(1) environment lookups
//!    at runtime.  A name found in no scope stays `None` and is looked up in
//!    the globals.
//!
//! Resolution halts on the first static error.

use std::collections::HashMap;

use log::{debug, info};

use crate::error::{LoxError, Result};
use crate::expr::Expr;
use crate::stmt::Stmt;
use crate::token::Token;

/// Are we inside a user function?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ClassType {
    /// Not inside any class
    None,

    /// Inside a class declaration _without_ a superclass
    Class,

    /// Inside a class declaration _with_ a superclass
    Subclass,
}

/// Resolver: tracks scopes, enforces static rules, and writes binding
/// distances back onto the AST.
pub struct Resolver {
    scopes: Vec<HashMap<String, bool>>, // false=declared, true=defined
    current_function: FunctionType,
    current_class: ClassType,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        Resolver {
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    /// Walk all top-level statements.
    pub fn resolve(&mut self, statements: &mut [Stmt]) -> Result<()> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );
        for stmt in statements {
            self.resolve_stmt(stmt)?;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &mut Stmt) -> Result<()> {
        match stmt {
            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                self.declare(name)?;
                self.define(name);

                let enclosing_class: ClassType = self.current_class;

                self.current_class = if superclass.is_some() {
                    ClassType::Subclass
                } else {
                    ClassType::Class
                };

                if let Some(superclass_expr) = superclass {
                    if let Expr::Variable {
                        name: superclass_name,
                        ..
                    } = &*superclass_expr
                    {
                        if superclass_name.lexeme == name.lexeme {
                            return Err(LoxError::resolve(
                                superclass_name,
                                "A class can't inherit from itself.",
                            ));
                        }
                    }

                    // The superclass name is an ordinary variable read.
                    self.resolve_expr(superclass_expr)?;

                    // Open a scope for `super`.
                    self.begin_scope();
                    if let Some(scope) = self.scopes.last_mut() {
                        scope.insert("super".to_string(), true);
                    }
                }

                // The implicit `this` scope shared by all methods.
                self.begin_scope();
                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert("this".to_string(), true);
                }

                for method in methods.iter_mut() {
                    if let Stmt::Function {
                        name: method_name,
                        params,
                        body,
                    } = method
                    {
                        let kind = if method_name.lexeme == "init" {
                            FunctionType::Initializer
                        } else {
                            FunctionType::Method
                        };

                        self.resolve_function(kind, params, body)?;
                    }
                }

                self.end_scope();

                if superclass.is_some() {
                    self.end_scope();
                }

                self.current_class = enclosing_class;
            }

            Stmt::Block(statements) => {
                self.begin_scope();

                for s in statements {
                    self.resolve_stmt(s)?;
                }

                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // Declared but not yet defined while the initializer runs,
                // which is what makes `var x = x;` detectable.
                self.declare(name)?;

                if let Some(expr) = initializer {
                    self.resolve_expr(expr)?;
                }

                self.define(name);
            }

            Stmt::Function { name, params, body } => {
                // Declare and define eagerly so the function can recurse.
                self.declare(name)?;
                self.define(name);

                self.resolve_function(FunctionType::Function, params, body)?;
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr)?;
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(then_branch)?;

                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch)?;
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(body)?;
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    return Err(LoxError::resolve(
                        keyword,
                        "'return' used outside of function",
                    ));
                }

                if let Some(expr) = value {
                    // In an initializer only a bare `return;` is allowed.
                    if self.current_function == FunctionType::Initializer {
                        return Err(LoxError::resolve(
                            keyword,
                            "Can't return a value from an initializer.",
                        ));
                    }

                    self.resolve_expr(expr)?;
                }
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &mut Expr) -> Result<()> {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner)?;
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right)?;
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)?;
            }

            Expr::Variable { name, depth } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(name.lexeme.as_str()) == Some(&false) {
                        return Err(LoxError::resolve(
                            name,
                            "Cannot read local variable in its own initializer",
                        ));
                    }
                }

                Self::resolve_local(&self.scopes, depth, name);
            }

            Expr::Assign { name, value, depth } => {
                self.resolve_expr(value)?;
                Self::resolve_local(&self.scopes, depth, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee)?;

                for arg in arguments {
                    self.resolve_expr(arg)?;
                }
            }

            Expr::This { keyword, depth } => {
                if self.current_class == ClassType::None {
                    return Err(LoxError::resolve(
                        keyword,
                        "Cannot use 'this' outside of a class",
                    ));
                }

                Self::resolve_local(&self.scopes, depth, keyword);
            }

            Expr::Get { object, .. } => {
                // Property names are looked up dynamically, only the object
                // expression resolves.
                self.resolve_expr(object)?;
            }

            Expr::Set { object, value, .. } => {
                self.resolve_expr(object)?;
                self.resolve_expr(value)?;
            }

            Expr::Super { keyword, depth, .. } => {
                if self.current_class == ClassType::None {
                    return Err(LoxError::resolve(
                        keyword,
                        "Cannot use 'super' outside of a class.",
                    ));
                }

                if self.current_class != ClassType::Subclass {
                    return Err(LoxError::resolve(
                        keyword,
                        "Cannot use 'super' in a class with no superclass.",
                    ));
                }

                Self::resolve_local(&self.scopes, depth, keyword);
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters and body.
    ///
    /// `kind` distinguishes plain functions, methods and initializers, which
    /// changes what `return` may do inside.
    fn resolve_function(
        &mut self,
        kind: FunctionType,
        params: &[Token],
        body: &mut [Stmt],
    ) -> Result<()> {
        let enclosing = self.current_function;
        self.current_function = kind;

        self.begin_scope();

        for param in params {
            self.declare(param)?;
            self.define(param);
        }

        for stmt in body {
            self.resolve_stmt(stmt)?;
        }

        self.end_scope();

        self.current_function = enclosing;

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) -> Result<()> {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name.lexeme) {
                return Err(LoxError::resolve(
                    name,
                    "Variable already declared in this scope",
                ));
            }

            scope.insert(name.lexeme.clone(), false);
        }
        Ok(())
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Binding-distance helper
    // ─────────────────────────────────────────────────────────────────────

    /// Record this occurrence as a local at the depth of the innermost scope
    /// containing the name, or leave it `None` for a global.
    fn resolve_local(scopes: &[HashMap<String, bool>], slot: &mut Option<usize>, name: &Token) {
        for (depth, scope) in scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                *slot = Some(depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
        *slot = None;
    }
}
