#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use quill::error::QuillError;
    use quill::interpreter::Interpreter;
    use quill::parser::Parser;
    use quill::resolver::resolve;
    use quill::scanner::scan;

    /// Run a program front to back, capturing `print` output.  Returns the
    /// captured output and the runtime error, if any.
    fn run(source: &str) -> (String, Option<QuillError>) {
        let (tokens, lex_errors) = scan(source.as_bytes());
        assert!(lex_errors.is_empty(), "lex errors: {:?}", lex_errors);

        let mut parser = Parser::new(&tokens);
        let (statements, parse_errors) = parser.parse();
        assert!(parse_errors.is_empty(), "parse errors: {:?}", parse_errors);

        let (locals, resolve_errors) = resolve(&statements);
        assert!(resolve_errors.is_empty(), "resolve errors: {:?}", resolve_errors);

        let out: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let mut interpreter = Interpreter::with_output(out.clone());

        let result = interpreter.interpret(&statements, locals);

        let output = String::from_utf8(out.borrow().clone()).expect("output is UTF-8");
        (output, result.err())
    }

    fn run_ok(source: &str) -> String {
        let (output, error) = run(source);
        assert!(error.is_none(), "unexpected runtime error: {:?}", error);
        output
    }

    fn run_err(source: &str) -> (String, String) {
        let (output, error) = run(source);
        let error = error.expect("expected a runtime error");
        (output, format!("{}", error))
    }

    // ───────────────────────── expressions ─────────────────────────

    #[test]
    fn test_arithmetic_and_grouping() {
        assert_eq!(run_ok("print 1 + 2 * 3;"), "7\n");
        assert_eq!(run_ok("print (1 + 2) * 3;"), "9\n");
        assert_eq!(run_ok("print 7 / 2;"), "3.5\n");
        assert_eq!(run_ok("print -3 + 1;"), "-2\n");
    }

    #[test]
    fn test_division_by_zero_follows_ieee() {
        assert_eq!(run_ok("print 1 / 0;"), "inf\n");
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(run_ok("print \"foo\" + \"bar\";"), "foobar\n");
    }

    #[test]
    fn test_plus_type_error_prints_nothing() {
        let (output, message) = run_err("print 1 + \"x\";");

        assert_eq!(output, "");
        assert!(message.contains("Operands must be either numbers or strings"));
        assert!(message.ends_with("[line 1]"));
    }

    #[test]
    fn test_comparison_requires_numbers() {
        let (_, message) = run_err("print \"a\" < \"b\";");

        assert!(message.contains("Operand must be a number"));
    }

    #[test]
    fn test_equality_has_no_coercion() {
        assert_eq!(run_ok("print 1 == \"1\";"), "false\n");
        assert_eq!(run_ok("print nil == nil;"), "true\n");
        assert_eq!(run_ok("print nil == false;"), "false\n");
        assert_eq!(run_ok("print \"a\" == \"a\";"), "true\n");
        assert_eq!(run_ok("print 1 != 2;"), "true\n");
    }

    #[test]
    fn test_truthiness_of_zero_and_empty_string() {
        assert_eq!(run_ok("if (0) print \"yes\"; else print \"no\";"), "yes\n");
        assert_eq!(run_ok("if (\"\") print \"yes\"; else print \"no\";"), "yes\n");
        assert_eq!(run_ok("if (nil) print \"yes\"; else print \"no\";"), "no\n");
        assert_eq!(run_ok("print !nil;"), "true\n");
    }

    #[test]
    fn test_logical_operators_return_operands() {
        assert_eq!(run_ok("print nil or \"fallback\";"), "fallback\n");
        assert_eq!(run_ok("print 1 and 2;"), "2\n");
        assert_eq!(run_ok("print false and 2;"), "false\n");
        assert_eq!(run_ok("print \"first\" or 2;"), "first\n");
    }

    #[test]
    fn test_logical_operators_short_circuit() {
        // The right operand would raise: it must never be evaluated.
        assert_eq!(run_ok("print false and missing;"), "false\n");
        assert_eq!(run_ok("print true or missing;"), "true\n");
    }

    // ───────────────────────── variables & scope ─────────────────────────

    #[test]
    fn test_undefined_variable_is_a_runtime_error() {
        let (_, message) = run_err("print missing;");

        assert_eq!(message, "Undefined variable 'missing'.\n[line 1]");
    }

    #[test]
    fn test_uninitialized_var_defaults_to_nil() {
        assert_eq!(run_ok("var a; print a;"), "nil\n");
    }

    #[test]
    fn test_block_shadowing_leaves_outer_binding_intact() {
        assert_eq!(
            run_ok("var a = \"outer\"; { var a = \"inner\"; print a; } print a;"),
            "inner\nouter\n"
        );
    }

    #[test]
    fn test_assignment_in_block_mutates_outer_binding() {
        assert_eq!(run_ok("var a = 1; { a = 2; } print a;"), "2\n");
    }

    #[test]
    fn test_closures_capture_environments_not_snapshots() {
        assert_eq!(
            run_ok("var a = 1; { fn f() { return a; } a = 2; print f(); }"),
            "2\n"
        );
    }

    #[test]
    fn test_counter_closure_shares_state_across_calls() {
        let source = "
            fn make() {
                var n = 0;
                fn inc() {
                    n = n + 1;
                    return n;
                }
                return inc;
            }
            var counter = make();
            print counter();
            print counter();
        ";

        assert_eq!(run_ok(source), "1\n2\n");
    }

    // ───────────────────────── control flow ─────────────────────────

    #[test]
    fn test_while_loop() {
        assert_eq!(
            run_ok("var i = 0; while (i < 3) { print i; i = i + 1; }"),
            "0\n1\n2\n"
        );
    }

    #[test]
    fn test_for_loop_desugaring_executes() {
        assert_eq!(
            run_ok("for (var i = 0; i < 3; i = i + 1) print i;"),
            "0\n1\n2\n"
        );
    }

    #[test]
    fn test_return_unwinds_through_nested_blocks() {
        assert_eq!(
            run_ok("fn f() { { { return 7; } } return 0; } print f();"),
            "7\n"
        );
    }

    #[test]
    fn test_return_unwinds_out_of_loops() {
        let source = "
            fn first_over(limit) {
                for (var i = 0; ; i = i + 1) {
                    if (i > limit) return i;
                }
            }
            print first_over(4);
        ";

        assert_eq!(run_ok(source), "5\n");
    }

    #[test]
    fn test_function_without_return_yields_nil() {
        assert_eq!(run_ok("fn f() { } print f();"), "nil\n");
    }

    #[test]
    fn test_recursion() {
        assert_eq!(
            run_ok("fn fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(10);"),
            "55\n"
        );
    }

    // ───────────────────────── calls & arity ─────────────────────────

    #[test]
    fn test_arity_mismatch_reports_counts_and_skips_body() {
        let (output, message) = run_err("fn f(a, b) { print \"ran\"; } f(1);");

        assert_eq!(output, "");
        assert!(message.contains("Expected 2 arguments but got 1."));
    }

    #[test]
    fn test_calling_a_non_callable_value() {
        let (_, message) = run_err("var a = 1; a();");

        assert!(message.contains("Can only call functions and classes."));
    }

    #[test]
    fn test_function_values_print_their_name() {
        assert_eq!(run_ok("fn f() { } print f;"), "<fn f>\n");
    }

    #[test]
    fn test_native_clock_is_callable() {
        assert_eq!(run_ok("print clock() > 0;"), "true\n");
    }

    #[test]
    fn test_native_chr_converts_codes() {
        assert_eq!(run_ok("print chr(65);"), "A\n");
        assert_eq!(run_ok("print chr(97) + chr(98);"), "ab\n");
    }

    // ───────────────────────── classes & instances ─────────────────────────

    #[test]
    fn test_fields_are_per_instance() {
        let source = "
            class Box { }
            var b = Box();
            b.answer = 42;
            print b.answer;
        ";

        assert_eq!(run_ok(source), "42\n");
    }

    #[test]
    fn test_class_and_instance_display() {
        assert_eq!(run_ok("class Box { } print Box; print Box();"), "Box\nBox instance\n");
    }

    #[test]
    fn test_instances_are_shared_by_reference() {
        let source = "
            class P { }
            var a = P();
            var b = a;
            b.x = 9;
            print a.x;
        ";

        assert_eq!(run_ok(source), "9\n");
    }

    #[test]
    fn test_methods_bind_this() {
        let source = "
            class Counter {
                init() { this.n = 0; }
                bump() {
                    this.n = this.n + 1;
                    return this.n;
                }
            }
            var c = Counter();
            c.bump();
            print c.bump();
        ";

        assert_eq!(run_ok(source), "2\n");
    }

    #[test]
    fn test_bound_method_value_retains_its_receiver() {
        let source = "
            class A {
                init(name) { this.name = name; }
                speak() { return this.name; }
            }
            var m = A(\"fido\").speak;
            print m();
        ";

        assert_eq!(run_ok(source), "fido\n");
    }

    #[test]
    fn test_fields_shadow_methods_on_read() {
        let source = "
            class A { f() { return \"method\"; } }
            var a = A();
            a.f = \"field\";
            print a.f;
        ";

        assert_eq!(run_ok(source), "field\n");
    }

    #[test]
    fn test_undefined_property_is_a_runtime_error() {
        let (_, message) = run_err("class A { } print A().missing;");

        assert!(message.contains("Undefined property 'missing'."));
    }

    #[test]
    fn test_property_access_requires_an_instance() {
        let (_, message) = run_err("var a = 1; print a.x;");
        assert!(message.contains("Only instances have properties."));

        let (_, message) = run_err("var a = 1; a.x = 2;");
        assert!(message.contains("Only instances have fields."));
    }

    #[test]
    fn test_constructor_always_yields_the_instance() {
        // An early bare `return` in init still yields the instance.
        assert_eq!(run_ok("class E { init() { return; } } print E();"), "E instance\n");
    }

    #[test]
    fn test_calling_init_directly_returns_the_instance() {
        let source = "
            class Thing {
                init() { this.v = 1; }
            }
            var t = Thing();
            print t.init().v;
        ";

        assert_eq!(run_ok(source), "1\n");
    }

    // ───────────────────────── inheritance ─────────────────────────

    #[test]
    fn test_inherited_methods_and_initializer() {
        let source = "
            class A {
                init(x) { this.x = x; }
                getX() { return this.x; }
            }
            class B : A { }
            print B(5).getX();
        ";

        assert_eq!(run_ok(source), "5\n");
    }

    #[test]
    fn test_subclass_overrides_win() {
        let source = "
            class A { f() { return \"A\"; } }
            class B : A { f() { return \"B\"; } }
            print B().f();
        ";

        assert_eq!(run_ok(source), "B\n");
    }

    #[test]
    fn test_super_dispatches_to_the_superclass_method() {
        let source = "
            class A { f() { return \"A\"; } }
            class B : A { f() { return super.f() + \"B\"; } }
            print B().f();
        ";

        assert_eq!(run_ok(source), "AB\n");
    }

    #[test]
    fn test_super_is_lexical_not_dynamic() {
        // g is declared in B, so its `super` is A, even when the receiver
        // is a C whose immediate superclass overrides f.
        let source = "
            class A { f() { return \"A\"; } }
            class B : A {
                f() { return \"B\"; }
                g() { return super.f(); }
            }
            class C : B { }
            print C().g();
        ";

        assert_eq!(run_ok(source), "A\n");
    }

    #[test]
    fn test_superclass_must_be_a_class() {
        let (_, message) = run_err("var NotClass = 1; class B : NotClass { }");

        assert!(message.contains("Superclass must be a class."));
    }

    #[test]
    fn test_runtime_error_aborts_remaining_statements() {
        let (output, _) = run_err("print 1; print missing; print 2;");

        assert_eq!(output, "1\n");
    }
}
