use crate::expr::Expr;
use crate::token::Token;

#[derive(Debug, Clone)]
pub enum Stmt {
    Expression(Expr),

    Print(Expr),

    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    Function {
        name: Token,
        params: Vec<Token>,
        body: Vec<Stmt>,
    },

    Return {
        keyword: Token,
        value: Option<Expr>,
    },

    Class {
        name: Token,
        /// Always an `Expr::Variable` when present, so the resolver can
        /// annotate its depth like any other variable read.
        superclass: Option<Expr>,
        /// Each method is a `Stmt::Function`.
        methods: Vec<Stmt>,
    },
}
