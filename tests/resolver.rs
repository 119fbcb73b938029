mod common;

#[cfg(test)]
mod resolver_tests {
    use pretty_assertions::assert_eq;
    use rlox::expr::Expr;
    use rlox::interpreter::Interpreter;
    use rlox::parser::Parser;
    use rlox::resolver::Resolver;
    use rlox::scanner::Scanner;
    use rlox::stmt::Stmt;

    use crate::common::{interpreter, resolve_errors, run_err, warning_messages};

    fn parse(source: &str) -> Vec<Stmt> {
        let tokens = Scanner::new(source).scan_all().unwrap();
        Parser::new(tokens).parse().unwrap()
    }

    fn print_target(stmt: &Stmt) -> &Expr {
        match stmt {
            Stmt::Print(expr) => expr,
            other => panic!("expected a print statement, got {other:?}"),
        }
    }

    fn variable_id(expr: &Expr) -> rlox::expr::ExprId {
        match expr {
            Expr::Variable { id, .. } => *id,
            other => panic!("expected a variable, got {other:?}"),
        }
    }

    #[test]
    fn locals_get_distance_and_declaration_index() {
        let stmts = parse("{ var a = 1; var b = 2; { var c = 3; print b; print c; print a; } }");
        let (mut interp, _, _) = interpreter();

        Resolver::new(&mut interp).resolve(&stmts).unwrap();

        let Stmt::Block(outer) = &stmts[0] else { unreachable!() };
        let Stmt::Block(inner) = &outer[2] else { unreachable!() };

        let addresses: Vec<Option<(usize, usize)>> = inner[1..]
            .iter()
            .map(|s| interp.resolved(variable_id(print_target(s))))
            .collect();

        assert_eq!(addresses, vec![Some((1, 1)), Some((0, 0)), Some((1, 0))]);
    }

    #[test]
    fn top_level_names_stay_global() {
        let stmts = parse("var g = 1; print g;");
        let mut interp = Interpreter::new();

        Resolver::new(&mut interp).resolve(&stmts).unwrap();

        assert_eq!(interp.resolved(variable_id(print_target(&stmts[1]))), None);
    }

    #[test]
    fn parameters_and_body_share_one_scope() {
        let stmts = parse("fun f(a, b) { var c = a; print c; print b; }");
        let (mut interp, _, _) = interpreter();

        Resolver::new(&mut interp).resolve(&stmts).unwrap();

        let Stmt::Function(decl) = &stmts[0] else { unreachable!() };
        let c = interp.resolved(variable_id(print_target(&decl.body[1])));
        let b = interp.resolved(variable_id(print_target(&decl.body[2])));

        assert_eq!(c, Some((0, 2)));
        assert_eq!(b, Some((0, 1)));
    }

    #[test]
    fn reading_a_local_in_its_own_initializer_is_an_error() {
        let (err, _) = run_err("{ var a = 1; { var a = a; print a; } }");

        assert_eq!(
            resolve_errors(&err),
            vec!["Can't read local variable in its own initializer."]
        );
        assert!(err.to_string().contains("[line 1] Error at 'a'"), "{err}");
    }

    #[test]
    fn redeclaring_in_the_same_scope_is_an_error_but_shadowing_is_not() {
        let (err, _) = run_err("{ var a = 1; var a = 2; print a; }");
        assert_eq!(
            resolve_errors(&err),
            vec!["Already a variable with this name in this scope."]
        );

        let (mut interp, out, _) = interpreter();
        interp
            .run("{ var a = 1; { var a = 2; print a; } print a; }")
            .unwrap();
        assert_eq!(out.contents(), "2\n1\n");
    }

    #[test]
    fn top_level_redeclaration_is_allowed() {
        let (mut interp, out, _) = interpreter();

        interp.run("var a = 1; var a = 2; print a;").unwrap();

        assert_eq!(out.contents(), "2\n");
    }

    #[test]
    fn errors_accumulate_across_the_whole_pass() {
        let (err, out) = run_err(
            "print \"before\";
             return 1;
             print this;
             print super.x;",
        );

        assert_eq!(out, "", "nothing runs when resolution fails");
        assert_eq!(
            resolve_errors(&err),
            vec![
                "Can't return from top-level code.",
                "Can't use 'this' outside of a class.",
                "Can't use 'super' outside of a class.",
            ]
        );
    }

    #[test]
    fn super_needs_a_superclass_and_this_is_banned_in_statics() {
        let (err, _) = run_err(
            "class A {
                 m() { return super.m(); }
                 class s() { return this; }
             }",
        );

        assert_eq!(
            resolve_errors(&err),
            vec![
                "Can't use 'super' in a class with no superclass.",
                "Can't use 'this' within a static method.",
            ]
        );
    }

    #[test]
    fn class_cannot_inherit_from_itself() {
        let (err, _) = run_err("class A < A {}");

        assert_eq!(resolve_errors(&err), vec!["A class can't inherit from itself."]);
    }

    #[test]
    fn initializer_cannot_return_a_value_but_may_return_early() {
        let (err, _) = run_err("class A { init() { return 1; } }");
        assert_eq!(
            resolve_errors(&err),
            vec!["Can't return a value from an initializer."]
        );

        let (mut interp, _, _) = interpreter();
        interp.run("class B { init() { return; } }").unwrap();
    }

    #[test]
    fn return_inside_a_lambda_is_allowed() {
        let (mut interp, out, _) = interpreter();

        interp
            .run("var twice = fun (x) { return x * 2; }; print twice(4);")
            .unwrap();

        assert_eq!(out.contents(), "8\n");
    }

    #[test]
    fn unused_locals_warn_in_declaration_order_without_blocking() {
        let (mut interp, out, err) = interpreter();

        let warnings = interp
            .run("var unused_global = 0; { var b = 1; var a = 2; var used = 3; print used; }")
            .unwrap();

        assert_eq!(
            warning_messages(&warnings),
            vec!["Unused variable 'b'.", "Unused variable 'a'."]
        );
        assert_eq!(out.contents(), "3\n");
        assert_eq!(
            err.contents(),
            "[line 1] Warning: Unused variable 'b'.\n[line 1] Warning: Unused variable 'a'.\n"
        );
    }

    #[test]
    fn unused_parameters_warn_with_their_line() {
        let (mut interp, _, _) = interpreter();

        let warnings = interp.run("fun f(a,\n b) { return a; }\nf(1, 2);").unwrap();

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].to_string(), "[line 2] Warning: Unused variable 'b'.");
    }

    #[test]
    fn trait_arity_mismatch_is_an_error_and_matching_arity_is_clean() {
        let (err, _) = run_err(
            "trait Pair { combine(a, b); }
             class Base { combine(a, b) { return a; } }
             class Broken < Base with Pair { combine(a) { return a; } }",
        );
        let errors = resolve_errors(&err);
        assert_eq!(errors.len(), 1);
        assert!(
            errors[0].starts_with("Trait method 'combine' isn't implemented with correct arity."),
            "{}",
            errors[0]
        );

        let (mut interp, out, _) = interpreter();
        interp
            .run(
                "trait Pair { combine(a, b); }
                 class Fine with Pair { combine(a, b) { return a + b; } }
                 print Fine().combine(1, 2);",
            )
            .unwrap();
        assert_eq!(out.contents(), "3\n");
    }

    #[test]
    fn missing_trait_methods_are_reported_together() {
        let (err, _) = run_err(
            "trait Shape { area(); perimeter(); name(); }
             class Square with Shape { name() { return \"square\"; } }",
        );

        assert_eq!(
            resolve_errors(&err),
            vec!["Trait methods 'area', 'perimeter' not all properly implemented."]
        );
    }

    #[test]
    fn unknown_trait_is_a_static_error() {
        let (err, _) = run_err("class A with Missing {}");

        assert_eq!(resolve_errors(&err), vec!["Undefined trait 'Missing'."]);
    }

    #[test]
    fn trait_signatures_persist_across_runs() {
        let (mut interp, _, _) = interpreter();

        interp.run("trait Greets { greet(); }").unwrap();
        let err = interp.run("class Mute with Greets {}").unwrap_err();

        assert_eq!(
            resolve_errors(&err),
            vec!["Trait methods 'greet' not all properly implemented."]
        );
    }
}
