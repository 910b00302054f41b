#[cfg(test)]
mod resolver_tests {
    use treelox as lox;

    use lox::error::LoxError;
    use lox::expr::Expr;
    use lox::parser::Parser;
    use lox::resolver::Resolver;
    use lox::scanner::Scanner;
    use lox::stmt::Stmt;

    fn resolve(source: &str) -> Result<Vec<Stmt>, LoxError> {
        let (tokens, errors) = Scanner::scan(source.as_bytes());
        assert!(errors.is_empty(), "scan errors in {:?}: {:?}", source, errors);

        let mut statements = Parser::new(tokens).parse()?;
        Resolver::new().resolve(&mut statements)?;

        Ok(statements)
    }

    fn expect_resolve_error(source: &str, fragment: &str) {
        match resolve(source) {
            Err(LoxError::Resolve { message, .. }) => {
                assert!(
                    message.contains(fragment),
                    "expected {:?} in message, got: {}",
                    fragment,
                    message
                );
            }
            Err(other) => panic!("Expected resolve error, got {:?}", other),
            Ok(_) => panic!("Expected resolve error for {:?}", source),
        }
    }

    #[test]
    fn test_global_reads_stay_unannotated() {
        let statements = resolve("var a = 1; print a;").unwrap();

        match &statements[1] {
            Stmt::Print(Expr::Variable { depth, .. }) => assert_eq!(*depth, None),
            other => panic!("Unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn test_block_local_resolves_at_depth_zero() {
        let statements = resolve("{ var a = 1; print a; }").unwrap();

        let block = match &statements[0] {
            Stmt::Block(stmts) => stmts,
            other => panic!("Unexpected statement: {:?}", other),
        };

        match &block[1] {
            Stmt::Print(Expr::Variable { depth, .. }) => assert_eq!(*depth, Some(0)),
            other => panic!("Unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn test_closure_capture_resolves_one_level_up() {
        let statements =
            resolve("fun outer() { var i = 0; fun inner() { return i; } }").unwrap();

        let outer_body = match &statements[0] {
            Stmt::Function { body, .. } => body,
            other => panic!("Unexpected statement: {:?}", other),
        };

        let inner_body = match &outer_body[1] {
            Stmt::Function { body, .. } => body,
            other => panic!("Unexpected statement: {:?}", other),
        };

        match &inner_body[0] {
            Stmt::Return {
                value: Some(Expr::Variable { depth, .. }),
                ..
            } => assert_eq!(*depth, Some(1)),
            other => panic!("Unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn test_assignment_depth_is_annotated() {
        let statements = resolve("{ var a = 1; a = 2; }").unwrap();

        let block = match &statements[0] {
            Stmt::Block(stmts) => stmts,
            other => panic!("Unexpected statement: {:?}", other),
        };

        match &block[1] {
            Stmt::Expression(Expr::Assign { depth, .. }) => assert_eq!(*depth, Some(0)),
            other => panic!("Unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn test_reading_a_variable_in_its_own_initializer() {
        expect_resolve_error("var a = 1; { var a = a; }", "own initializer");
    }

    #[test]
    fn test_redeclaration_in_same_scope() {
        expect_resolve_error("{ var a = 1; var a = 2; }", "already declared");
    }

    #[test]
    fn test_duplicate_parameter_names() {
        expect_resolve_error("fun f(a, a) { return a; }", "already declared");
    }

    #[test]
    fn test_global_redeclaration_is_allowed() {
        // Only block scopes are tracked; globals may be redefined freely.
        assert!(resolve("var a = 1; var a = 2;").is_ok());
    }

    #[test]
    fn test_return_outside_function() {
        expect_resolve_error("return 1;", "outside of function");
    }

    #[test]
    fn test_return_with_value_in_initializer() {
        expect_resolve_error(
            "class A { init() { return 1; } }",
            "return a value from an initializer",
        );
    }

    #[test]
    fn test_bare_return_in_initializer_is_allowed() {
        assert!(resolve("class A { init() { return; } }").is_ok());
    }

    #[test]
    fn test_this_outside_class() {
        expect_resolve_error("print this;", "outside of a class");
    }

    #[test]
    fn test_this_in_plain_function() {
        expect_resolve_error("fun f() { return this; }", "outside of a class");
    }

    #[test]
    fn test_super_outside_class() {
        expect_resolve_error("print super.f;", "outside of a class");
    }

    #[test]
    fn test_super_without_superclass() {
        expect_resolve_error(
            "class A { f() { super.f(); } }",
            "class with no superclass",
        );
    }

    #[test]
    fn test_class_cannot_inherit_from_itself() {
        expect_resolve_error("class A < A {}", "inherit from itself");
    }

    #[test]
    fn test_method_this_and_super_resolve() {
        let source = r#"
class A { f() { print "A"; } }
class B < A { f() { super.f(); print this; } }
"#;
        assert!(resolve(source).is_ok());
    }

    #[test]
    fn test_methods_are_not_lexical_names() {
        // Methods are only reachable through an instance, not by bare name.
        let statements = resolve("class A { f() {} g() { f; } }").unwrap();

        // `f` inside `g` resolves as a global read, to fail at runtime.
        let methods = match &statements[0] {
            Stmt::Class { methods, .. } => methods,
            other => panic!("Unexpected statement: {:?}", other),
        };

        let g_body = match &methods[1] {
            Stmt::Function { body, .. } => body,
            other => panic!("Unexpected statement: {:?}", other),
        };

        match &g_body[0] {
            Stmt::Expression(Expr::Variable { depth, .. }) => assert_eq!(*depth, None),
            other => panic!("Unexpected statement: {:?}", other),
        }
    }
}
