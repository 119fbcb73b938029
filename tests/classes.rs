mod common;

#[cfg(test)]
mod class_tests {
    use pretty_assertions::assert_eq;
    use rlox::callable::Callable;
    use rlox::token::{Token, TokenType};
    use rlox::value::Value;

    use crate::common::{interpreter, run_err, run_ok, runtime_message};

    #[test]
    fn instances_fields_and_methods() {
        let source = "
            class Point {
                init(x, y) { this.x = x; this.y = y; }
                sum() { return this.x + this.y; }
            }
            var p = Point(2, 3);
            print p.sum();
            p.x = 10;
            print p.sum();
            print p;
            print Point;";

        assert_eq!(run_ok(source), "5\n13\nPoint instance\nPoint\n");
    }

    #[test]
    fn class_arity_follows_init() {
        let (err, _) = run_err("class P { init(a) {} } P();");
        assert_eq!(runtime_message(&err), "Expected 1 arguments but got 0.");

        assert_eq!(run_ok("class Empty {} print Empty();"), "Empty instance\n");
    }

    #[test]
    fn calling_init_directly_returns_the_instance() {
        let source = "
            class Box { init(v) { this.v = v; } }
            var b = Box(1);
            var again = b.init(2);
            print again == b;
            print b.v;";

        assert_eq!(run_ok(source), "true\n2\n");
    }

    #[test]
    fn fields_shadow_methods() {
        let source = "
            class A { m() { return \"method\"; } }
            var a = A();
            print a.m();
            a.m = fun () { return \"field\"; };
            print a.m();";

        assert_eq!(run_ok(source), "method\nfield\n");
    }

    #[test]
    fn property_errors() {
        let (err, _) = run_err("class A {} print A().missing;");
        assert_eq!(runtime_message(&err), "Undefined property 'missing'.");

        let (err, _) = run_err("var n = 1; print n.x;");
        assert_eq!(runtime_message(&err), "Only instances have properties.");

        let (err, _) = run_err("var n = 1; n.x = 2;");
        assert_eq!(runtime_message(&err), "Only instances have fields.");
    }

    #[test]
    fn bound_methods_keep_their_own_receiver() {
        let source = "
            class Named {
                init(name) { this.name = name; }
                say() { return this.name; }
            }
            var a = Named(\"a\").say;
            var b = Named(\"b\").say;
            print a();
            print b();
            print a();";

        assert_eq!(run_ok(source), "a\nb\na\n");
    }

    #[test]
    fn getters_run_on_access() {
        let source = "
            class Circle {
                init(r) { this.r = r; }
                area { return 3 * this.r * this.r; }
            }
            var c = Circle(2);
            print c.area;
            c.r = 3;
            print c.area;";

        assert_eq!(run_ok(source), "12\n27\n");
    }

    #[test]
    fn static_methods_live_on_the_class() {
        let source = "
            class Math {
                class square(n) { return n * n; }
            }
            print Math.square(4);
            Math.pi = 3;
            print Math.pi;";

        assert_eq!(run_ok(source), "16\n3\n");

        let (err, _) = run_err("class Math { class square(n) { return n * n; } } Math().square(2);");
        assert_eq!(runtime_message(&err), "Undefined property 'square'.");
    }

    #[test]
    fn static_init_returns_the_class() {
        let source = "
            class Config {
                class init() { Config.ready = true; return 1; }
            }
            print Config.init() == Config;
            print Config.ready;";

        assert_eq!(run_ok(source), "true\ntrue\n");
    }

    #[test]
    fn calling_a_metaclass_makes_an_instance_of_it() {
        let (mut interp, _, _) = interpreter();
        interp
            .run("class Counter { class zero() { return 0; } }")
            .unwrap();

        let Some(Value::Class(class)) = interp.global("Counter") else {
            panic!("Counter is not a class");
        };
        let metaclass = class.metaclass();
        assert_eq!(metaclass.arity(), 0);

        let paren = Token::new(TokenType::RIGHT_PAREN, ")", 1);
        let made = metaclass.call(&mut interp, &paren, Vec::new()).unwrap();

        let Value::Instance(instance) = made else {
            panic!("calling a metaclass must produce an instance");
        };
        assert_eq!(instance.class_name(), "Counter class");
        assert!(instance.find_method("zero").is_some());
        assert_eq!(instance.to_string(), "Counter class instance");
    }

    #[test]
    fn static_methods_see_enclosing_locals() {
        let source = "
            {
                var factor = 3;
                class Scale { class by(n) { return n * factor; } }
                print Scale.by(5);
            }";

        assert_eq!(run_ok(source), "15\n");
    }

    #[test]
    fn inheritance_and_overrides() {
        let source = "
            class Animal {
                init(name) { this.name = name; }
                speak() { return this.name + \" makes a sound\"; }
                kind() { return \"animal\"; }
            }
            class Dog < Animal {
                speak() { return this.name + \" barks\"; }
            }
            var d = Dog(\"rex\");
            print d.speak();
            print d.kind();";

        assert_eq!(run_ok(source), "rex barks\nanimal\n");
    }

    #[test]
    fn super_dispatch_starts_at_the_declaring_superclass() {
        let source = "
            class A { method() { return \"A\"; } }
            class B < A {
                method() { return \"B\"; }
                test() { return super.method(); }
            }
            class C < B {}
            print C().test();";

        assert_eq!(run_ok(source), "A\n");
    }

    #[test]
    fn super_getter_is_invoked() {
        let source = "
            class Base { label { return \"base\"; } }
            class Derived < Base {
                label { return \"derived of \" + super.label; }
            }
            print Derived().label;";

        assert_eq!(run_ok(source), "derived of base\n");
    }

    #[test]
    fn superclass_must_be_a_class() {
        let (err, _) = run_err("var NotAClass = 1; class Sub < NotAClass {}");

        assert_eq!(runtime_message(&err), "Superclass must be a class.");
    }

    #[test]
    fn classes_declared_in_blocks_can_refer_to_themselves() {
        let source = "
            {
                class Node {
                    init(next) { this.next = next; }
                    wrap() { return Node(this); }
                }
                var n = Node(nil).wrap();
                print n.next.next;
            }";

        assert_eq!(run_ok(source), "nil\n");
    }

    #[test]
    fn local_class_may_share_its_name_with_the_trait_it_mixes_in() {
        let source = "
            trait Greets { hello() { return \"hi\"; } }
            {
                class Greets with Greets {}
                print Greets().hello();
            }";

        assert_eq!(run_ok(source), "hi\n");
    }

    #[test]
    fn local_subclass_may_shadow_its_superclass_name_through_the_outer_scope() {
        let source = "
            class Base { name() { return \"base\"; } }
            {
                class Child < Base {}
                class Base < Child { name() { return \"local \" + super.name(); } }
                print Base().name();
            }";

        assert_eq!(run_ok(source), "local base\n");
    }

    #[test]
    fn trait_defaults_are_mixed_in_and_bound() {
        let source = "
            trait Greets {
                name();
                greet() { return \"hello \" + this.name(); }
            }
            class Person with Greets {
                init(n) { this.n = n; }
                name() { return this.n; }
            }
            print Person(\"ada\").greet();
            print Greets;";

        assert_eq!(run_ok(source), "hello ada\n<trait Greets>\n");
    }

    #[test]
    fn own_methods_win_over_traits_and_traits_over_superclass() {
        let source = "
            trait T { who() { return \"trait\"; } }
            class Base { who() { return \"base\"; } }
            class Mixed < Base with T {}
            class Own < Base with T { who() { return \"own\"; } }
            print Mixed().who();
            print Own().who();";

        assert_eq!(run_ok(source), "trait\nown\n");
    }

    #[test]
    fn earlier_traits_take_precedence() {
        let source = "
            trait First { tag() { return 1; } }
            trait Second { tag() { return 2; } }
            class Both with First, Second {}
            print Both().tag();";

        assert_eq!(run_ok(source), "1\n");
    }

    #[test]
    fn mixing_in_a_non_trait_fails_at_runtime() {
        let (err, _) = run_err(
            "trait Real {}
             var Real = 1;
             class Fake with Real {}",
        );

        assert_eq!(runtime_message(&err), "Can only mix in traits.");
    }

    #[test]
    fn class_values_compare_by_identity() {
        let source = "
            class A {}
            var a = A();
            var b = A();
            print a == a;
            print a == b;
            print A == A;";

        assert_eq!(run_ok(source), "true\nfalse\ntrue\n");
    }
}
