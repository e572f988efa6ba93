#[cfg(test)]
mod resolver_tests {
    use quill::parser::Parser;
    use quill::resolver::resolve;
    use quill::scanner::scan;

    macro_rules! resolve_source {
        ($source:expr) => {{
            let (tokens, lex_errors) = scan($source.as_bytes());
            assert!(lex_errors.is_empty(), "lex errors: {:?}", lex_errors);

            let mut parser = Parser::new(&tokens);
            let (statements, parse_errors) = parser.parse();
            assert!(parse_errors.is_empty(), "parse errors: {:?}", parse_errors);

            resolve(&statements)
        }};
    }

    #[test]
    fn test_globals_get_no_table_entry() {
        let (locals, errors) = resolve_source!("var a = 1; print a; a = 2;");

        assert!(errors.is_empty());
        assert!(locals.is_empty());
    }

    #[test]
    fn test_local_read_resolves_at_depth_zero() {
        let (locals, errors) = resolve_source!("{ var a = 1; print a; }");

        assert!(errors.is_empty());
        assert_eq!(locals.len(), 1);
        assert_eq!(locals.values().copied().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_closure_read_crosses_function_scope() {
        // Inside g, `a` lives one scope out (past g's body scope into f's).
        let (locals, errors) =
            resolve_source!("fn f() { var a = 1; fn g() { print a; } }");

        assert!(errors.is_empty());
        assert!(locals.values().any(|&distance| distance == 1));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let source = "{ var a = 1; { var b = a; fn f(x) { return x + b; } } }";

        let (first, errors_first) = resolve_source!(source);
        let (second, errors_second) = resolve_source!(source);

        assert!(errors_first.is_empty());
        assert!(errors_second.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_top_level_return_is_rejected() {
        let (_, errors) = resolve_source!("return 1;");

        assert_eq!(errors.len(), 1);
        assert!(format!("{}", errors[0]).contains("Cannot return from top-level code"));
    }

    #[test]
    fn test_return_inside_function_is_allowed() {
        let (_, errors) = resolve_source!("fn f() { return 1; }");

        assert!(errors.is_empty());
    }

    #[test]
    fn test_initializer_cannot_return_a_value() {
        let (_, errors) = resolve_source!("class A { init() { return 1; } }");

        assert_eq!(errors.len(), 1);
        assert!(format!("{}", errors[0]).contains("Cannot return a value from an initializer"));
    }

    #[test]
    fn test_initializer_bare_return_is_allowed() {
        let (_, errors) = resolve_source!("class A { init() { return; } }");

        assert!(errors.is_empty());
    }

    #[test]
    fn test_this_outside_class_is_rejected() {
        let (_, errors) = resolve_source!("print this;");

        assert_eq!(errors.len(), 1);
        assert!(format!("{}", errors[0]).contains("Cannot use 'this' outside of a class"));
    }

    #[test]
    fn test_this_outside_method_in_plain_function() {
        let (_, errors) = resolve_source!("fn f() { return this; }");

        assert_eq!(errors.len(), 1);
        assert!(format!("{}", errors[0]).contains("Cannot use 'this' outside of a class"));
    }

    #[test]
    fn test_super_outside_class_is_rejected() {
        let (_, errors) = resolve_source!("print super.f;");

        assert_eq!(errors.len(), 1);
        assert!(format!("{}", errors[0]).contains("Cannot use 'super' outside of a class"));
    }

    #[test]
    fn test_super_without_superclass_is_rejected() {
        let (_, errors) = resolve_source!("class A { f() { return super.f(); } }");

        assert_eq!(errors.len(), 1);
        assert!(
            format!("{}", errors[0]).contains("Cannot use 'super' in a class with no superclass")
        );
    }

    #[test]
    fn test_super_in_subclass_is_allowed_and_resolved() {
        let (locals, errors) = resolve_source!(
            "class A { f() { return 1; } } class B : A { f() { return super.f(); } }"
        );

        assert!(errors.is_empty());
        // `super` in a method body resolves past the body scope and the
        // `this` scope into the `super` scope.
        assert!(locals.values().any(|&distance| distance == 2));
    }

    #[test]
    fn test_class_cannot_inherit_from_itself() {
        let (_, errors) = resolve_source!("class A : A { }");

        assert_eq!(errors.len(), 1);
        assert!(format!("{}", errors[0]).contains("A class cannot inherit from itself"));
    }

    #[test]
    fn test_duplicate_declaration_in_local_scope() {
        let (_, errors) = resolve_source!("{ var a = 1; var a = 2; }");

        assert_eq!(errors.len(), 1);
        assert!(format!("{}", errors[0]).contains("Variable already declared in this scope"));
    }

    #[test]
    fn test_duplicate_declaration_at_top_level_is_allowed() {
        let (_, errors) = resolve_source!("var a = 1; var a = 2;");

        assert!(errors.is_empty());
    }

    #[test]
    fn test_read_in_own_initializer_is_rejected() {
        let (_, errors) = resolve_source!("{ var a = a; }");

        assert_eq!(errors.len(), 1);
        assert!(
            format!("{}", errors[0]).contains("Cannot read local variable in its own initializer")
        );
    }

    #[test]
    fn test_shadowing_initializer_cannot_read_its_own_name() {
        // The declared-but-undefined check fires even when an enclosing
        // binding with the same name exists.
        let (_, errors) = resolve_source!("var a = 1; { var a = a + 1; }");

        assert_eq!(errors.len(), 1);
        assert!(
            format!("{}", errors[0]).contains("Cannot read local variable in its own initializer")
        );
    }

    #[test]
    fn test_top_level_self_reference_is_not_checked() {
        // At the top level there is no local scope, so the forward-read
        // rule does not apply; the name resolves globally at runtime.
        let (_, errors) = resolve_source!("var a = a;");

        assert!(errors.is_empty());
    }

    #[test]
    fn test_multiple_static_errors_are_collected() {
        let (_, errors) = resolve_source!("return 1; print this; print super.f;");

        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_error_rendering_has_location() {
        let (_, errors) = resolve_source!("return 1;");

        assert_eq!(
            format!("{}", errors[0]),
            "[line 1] Error at 'return': Cannot return from top-level code"
        );
    }
}
