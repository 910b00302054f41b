#[cfg(test)]
mod interpreter_tests {
    use treelox as lox;

    use lox::error::LoxError;
    use lox::interpreter::Interpreter;
    use lox::parser::Parser;
    use lox::resolver::Resolver;
    use lox::scanner::Scanner;

    /// Runs the whole pipeline over `source` and captures `print` output.
    fn run(source: &str) -> Result<String, LoxError> {
        let (tokens, scan_errors) = Scanner::scan(source.as_bytes());
        assert!(
            scan_errors.is_empty(),
            "scan errors in {:?}: {:?}",
            source,
            scan_errors
        );

        let mut statements = Parser::new(tokens).parse()?;
        Resolver::new().resolve(&mut statements)?;

        let mut interpreter = Interpreter::new();
        let mut output: Vec<u8> = Vec::new();
        interpreter.interpret(&statements, &mut output)?;

        Ok(String::from_utf8(output)?)
    }

    fn expect_output(source: &str, expected: &str) {
        let output = run(source).expect("run failure");
        assert_eq!(output, expected);
    }

    fn expect_runtime_error(source: &str, fragment: &str) {
        match run(source) {
            Err(LoxError::Runtime { message, .. }) => {
                assert!(
                    message.contains(fragment),
                    "expected {:?} in message, got: {}",
                    fragment,
                    message
                );
            }
            Err(other) => panic!("Expected runtime error, got {:?}", other),
            Ok(output) => panic!("Expected runtime error, got output {:?}", output),
        }
    }

    #[test]
    fn test_arithmetic_precedence() {
        expect_output("print 1 + 2 * 3;", "7.0\n");
    }

    #[test]
    fn test_string_concatenation() {
        expect_output("var a = \"hi\"; print a + \" world\";", "hi world\n");
    }

    #[test]
    fn test_block_scoping_shadows_and_restores() {
        expect_output(
            "var a = 1; { var a = 2; print a; } print a;",
            "2.0\n1.0\n",
        );
    }

    #[test]
    fn test_closure_counter_keeps_state() {
        expect_output(
            r#"
fun make() {
  var i = 0;
  fun inc() {
    i = i + 1;
    return i;
  }
  return inc;
}
var c = make();
print c();
print c();
print c();
"#,
            "1.0\n2.0\n3.0\n",
        );
    }

    #[test]
    fn test_sibling_closures_share_an_environment() {
        expect_output(
            r#"
fun pair() {
  var n = 0;
  fun bump() { n = n + 1; }
  fun read() { return n; }
  bump();
  bump();
  return read;
}
print pair()();
"#,
            "2.0\n",
        );
    }

    #[test]
    fn test_method_sees_fields_through_this() {
        expect_output(
            r#"
class A {
  greet() {
    print "hi " + this.name;
  }
}
var a = A();
a.name = "lox";
a.greet();
"#,
            "hi lox\n",
        );
    }

    #[test]
    fn test_super_calls_the_parent_method() {
        expect_output(
            r#"
class A {
  f() {
    print "A";
  }
}
class B < A {
  f() {
    super.f();
    print "B";
  }
}
B().f();
"#,
            "A\nB\n",
        );
    }

    #[test]
    fn test_inherited_method_without_override() {
        expect_output(
            "class A { f() { return 1; } } class B < A {} print B().f();",
            "1.0\n",
        );
    }

    #[test]
    fn test_initializer_runs_and_returns_this() {
        expect_output(
            r#"
class C {
  init() {
    this.v = 1;
  }
}
var c = C();
print c.v;
print c.init() == c;
"#,
            "1.0\ntrue\n",
        );
    }

    #[test]
    fn test_initializer_arity_is_class_arity() {
        expect_output(
            "class P { init(x, y) { this.x = x; this.y = y; } } print P(3, 4).y;",
            "4.0\n",
        );
    }

    #[test]
    fn test_logical_operators_return_operand_values() {
        expect_output(
            "print \"a\" or \"b\"; print nil or \"b\"; print false and \"x\"; print 1 and 2;",
            "a\nb\nfalse\n2.0\n",
        );
    }

    #[test]
    fn test_and_short_circuits_without_side_effects() {
        expect_output(
            r#"
var called = false;
fun mark() {
  called = true;
  return true;
}
var r = false and mark();
print called;
print r;
"#,
            "false\nfalse\n",
        );
    }

    #[test]
    fn test_for_loop_accumulates() {
        expect_output(
            "var total = 0; for (var i = 1; i <= 4; i = i + 1) { total = total + i; } print total;",
            "10.0\n",
        );
    }

    #[test]
    fn test_if_else_dispatches_on_truthiness() {
        expect_output("if (1 > 2) print \"a\"; else print \"b\";", "b\n");
        expect_output("if (nil) print \"a\"; else print \"b\";", "b\n");
        expect_output("if (0) print \"a\"; else print \"b\";", "a\n");
    }

    #[test]
    fn test_return_stops_the_function_body() {
        expect_output(
            "fun f() { return 5; print \"unreachable\"; } print f();",
            "5.0\n",
        );
    }

    #[test]
    fn test_recursive_function() {
        expect_output(
            "fun fib(n) { if (n <= 1) return n; return fib(n - 2) + fib(n - 1); } print fib(10);",
            "55.0\n",
        );
    }

    #[test]
    fn test_closures_capture_their_declaration_scope() {
        // The function sees the `a` that existed where it was declared, not
        // the shadowing one declared afterwards.
        expect_output(
            "var a = 1; { fun get() { return a; } var a = 2; print get(); }",
            "1.0\n",
        );
    }

    #[test]
    fn test_bound_method_carries_its_instance() {
        expect_output(
            "class C { m() { return this; } } var x = C(); var m = x.m; print m() == x;",
            "true\n",
        );
    }

    #[test]
    fn test_equality_on_instances_is_identity() {
        expect_output(
            "class C {} var a = C(); var b = C(); print a == a; print a == b;",
            "true\nfalse\n",
        );
    }

    #[test]
    fn test_value_equality() {
        expect_output(
            "print 1 == 1; print \"a\" == \"a\"; print nil == nil; print 1 == \"1\";",
            "true\ntrue\ntrue\nfalse\n",
        );
    }

    #[test]
    fn test_field_assignment_overwrites() {
        expect_output(
            "class C {} var c = C(); c.x = 1; c.x = 2; print c.x;",
            "2.0\n",
        );
    }

    #[test]
    fn test_display_formats() {
        expect_output(
            "print nil; print true; print 2.5; print clock;",
            "nil\ntrue\n2.5\n<native fn clock>\n",
        );
        expect_output("fun f() {} print f;", "<fn f>\n");
        expect_output("class C {} print C; print C();", "<class C>\n<instance of C>\n");
    }

    #[test]
    fn test_division_follows_ieee() {
        expect_output("print 1 / 0;", "inf\n");
        expect_output("print 10 / 4;", "2.5\n");
    }

    #[test]
    fn test_clock_returns_a_number() {
        expect_output("print clock() >= 0;", "true\n");
    }

    #[test]
    fn test_adding_number_and_string_fails() {
        expect_runtime_error("1 + \"x\";", "two numbers or two strings");
    }

    #[test]
    fn test_unary_minus_requires_a_number() {
        expect_runtime_error("-\"x\";", "must be a number");
    }

    #[test]
    fn test_comparison_requires_numbers() {
        expect_runtime_error("\"a\" < \"b\";", "must be numbers");
    }

    #[test]
    fn test_undefined_variable() {
        expect_runtime_error("print missing;", "Undefined variable 'missing'");
    }

    #[test]
    fn test_assigning_to_undefined_global() {
        expect_runtime_error("missing = 1;", "Undefined variable 'missing'");
    }

    #[test]
    fn test_calling_a_non_callable() {
        expect_runtime_error("var x = 1; x();", "functions and classes");
    }

    #[test]
    fn test_arity_mismatch() {
        expect_runtime_error("fun f(a) {} f(1, 2);", "Expected 1 arguments but got 2");
    }

    #[test]
    fn test_undefined_property() {
        expect_runtime_error("class C {} print C().missing;", "Undefined property 'missing'");
    }

    #[test]
    fn test_properties_need_an_instance() {
        expect_runtime_error("var x = 1; print x.y;", "Only instances have properties");
    }

    #[test]
    fn test_fields_need_an_instance() {
        expect_runtime_error("var x = 1; x.y = 2;", "Only instances have fields");
    }

    #[test]
    fn test_superclass_must_be_a_class() {
        expect_runtime_error(
            "var NotAClass = 1; class B < NotAClass {}",
            "inherit from classes",
        );
    }

    #[test]
    fn test_undefined_super_method() {
        expect_runtime_error(
            "class A {} class B < A { f() { super.g(); } } B().f();",
            "Undefined property 'g'",
        );
    }

    #[test]
    fn test_runtime_error_carries_the_line() {
        match run("var a = 1;\nprint a + \"x\";") {
            Err(LoxError::Runtime { line, .. }) => assert_eq!(line, 2),
            other => panic!("Expected runtime error, got {:?}", other),
        }
    }

    #[test]
    fn test_var_in_own_global_initializer_fails_at_runtime() {
        // At global scope the resolver stays out of it; the read simply
        // finds no binding yet.
        expect_runtime_error("var x = x;", "Undefined variable 'x'");
    }
}
