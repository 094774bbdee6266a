#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    use rox::error::{LoxError, RuntimeError};
    use rox::Lox;

    /// `print` sink the test can read back after the run.
    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.borrow()).into_owned()
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn session() -> (Lox, SharedBuf) {
        let out = SharedBuf::default();
        (Lox::with_output(Box::new(out.clone())), out)
    }

    fn run(source: &str) -> (String, Result<(), LoxError>) {
        let (mut lox, out) = session();
        let result = lox.run(source);
        (out.contents(), result)
    }

    fn run_ok(source: &str) -> String {
        let (output, result) = run(source);
        if let Err(e) = result {
            panic!("run failed: {}\noutput so far: {:?}", e, output);
        }
        output
    }

    /// Runs `source`, expecting a failure; returns (output, message, exit code).
    fn run_err(source: &str) -> (String, String, i32) {
        let (output, result) = run(source);
        match result {
            Ok(()) => panic!("expected failure, got output {:?}", output),
            Err(e) => (output, e.to_string(), e.exit_code()),
        }
    }

    // ───────────────────────────── basics ─────────────────────────────

    #[test]
    fn test_interpreter_01_addition() {
        assert_eq!(run_ok("var a=1; var b=2; print a+b;"), "3.0\n");
    }

    #[test]
    fn test_interpreter_02_newline_terminated_program() {
        let source = "var greeting = \"hello\"\nvar name = \"world\"\nprint greeting + \" \" + name\n";
        assert_eq!(run_ok(source), "hello world\n");
    }

    #[test]
    fn test_interpreter_03_display_forms() {
        let source = "print nil\nprint true\nprint false\nprint 10 / 4\nprint 1.5 * 2\nprint -0\n\
                      print 10000000000000000\nprint 0.00001\n\
                      fun f() {}\nclass A {}\nprint f\nprint A\nprint A()";

        assert_eq!(
            run_ok(source),
            "None\nTrue\nFalse\n2.5\n3.0\n-0.0\n1e+16\n1e-05\n<fn f>\nA\nA instance\n"
        );
    }

    #[test]
    fn test_interpreter_04_truthiness_follows_host_rules() {
        let source = "if (0) print \"yes\"; else print \"no\"\n\
                      if (\"\") print \"yes\"; else print \"no\"\n\
                      if (nil) print \"yes\"; else print \"no\"\n\
                      if (\"0\") print \"yes\"; else print \"no\"\n\
                      print !0\n\
                      print nil or \"fallback\"\n\
                      print 0 and \"unreached\"\n\
                      print 1 and 2";

        assert_eq!(run_ok(source), "no\nno\nno\nyes\nTrue\nfallback\n0.0\n2.0\n");
    }

    #[test]
    fn test_interpreter_05_equality_without_coercion() {
        let source = "print nil == nil\nprint 1 == \"1\"\nprint \"a\" == \"a\"\nprint 0 == false\n\
                      fun f() {}\nvar g = f\nprint f == g\nclass A {}\nprint A() == A()";

        assert_eq!(run_ok(source), "True\nFalse\nTrue\nFalse\nTrue\nFalse\n");
    }

    #[test]
    fn test_interpreter_06_loops() {
        assert_eq!(
            run_ok("for (var i = 0; i < 3; i = i + 1) print i"),
            "0.0\n1.0\n2.0\n"
        );
        assert_eq!(
            run_ok("var n = 3\nwhile (n > 0) {\n  print n\n  n = n - 1\n}\n"),
            "3.0\n2.0\n1.0\n"
        );
    }

    #[test]
    fn test_interpreter_07_block_scoping_restores_environment() {
        let source = "var a = \"outer\"\n{\n  var a = \"inner\"\n  print a\n}\nprint a";
        assert_eq!(run_ok(source), "inner\nouter\n");
    }

    // ───────────────────────────── functions ─────────────────────────────

    #[test]
    fn test_interpreter_08_closure_counter() {
        let source = "fun counter(){ var i=0; fun inc(){ i=i+1; print i; } return inc; } \
                      var c=counter(); c(); c();";
        assert_eq!(run_ok(source), "1.0\n2.0\n");
    }

    #[test]
    fn test_interpreter_09_closures_share_frames() {
        let source = "var a = 1\nfun show() { print a; }\na = 2\nshow()\n\
                      fun pair() {\n  var n = 0\n  fun inc() { n = n + 1; }\n  fun get() { return n; }\n  inc()\n  inc()\n  return get\n}\nprint pair()()";

        assert_eq!(run_ok(source), "2.0\n2.0\n");
    }

    #[test]
    fn test_interpreter_10_static_scope_beats_later_shadowing() {
        let source = "var a = \"global\"\n{\n  fun show() { print a; }\n  show()\n  var a = \"block\"\n  show()\n}";
        assert_eq!(run_ok(source), "global\nglobal\n");
    }

    #[test]
    fn test_interpreter_11_recursion_and_return() {
        let source = "fun fib(n) {\n  if (n < 2) return n\n  return fib(n - 1) + fib(n - 2)\n}\nprint fib(15)\n\
                      fun count(n) {\n  if (n == 0) return 0\n  return 1 + count(n - 1)\n}\nprint count(900)";

        assert_eq!(run_ok(source), "610.0\n900.0\n");
    }

    #[test]
    fn test_interpreter_12_function_without_return_yields_nil() {
        assert_eq!(run_ok("fun f() {}\nprint f()"), "None\n");
    }

    // ───────────────────────────── classes ─────────────────────────────

    #[test]
    fn test_interpreter_13_inheritance_and_super() {
        let source = "class A{ speak(){ print \"A\"; } } class B<A{ speak(){ super.speak(); print \"B\"; } } B().speak();";
        assert_eq!(run_ok(source), "A\nB\n");
    }

    #[test]
    fn test_interpreter_14_super_binds_current_this() {
        let source = "class A {\n  name() { return \"A\"; }\n  greet() { print \"hi \" + this.name(); }\n}\n\
                      class B < A {\n  name() { return \"B\"; }\n  greet() { super.greet(); }\n}\n\
                      class C < B {}\nC().greet()";

        assert_eq!(run_ok(source), "hi B\n");
    }

    #[test]
    fn test_interpreter_15_initializer_returns_instance() {
        assert_eq!(
            run_ok("class C{ init(){ return; } } print C();"),
            "C instance\n"
        );

        let source = "class C {\n  init() { this.x = 1; }\n}\nvar c = C()\nprint c.init()\nprint c.x";
        assert_eq!(run_ok(source), "C instance\n1.0\n");
    }

    #[test]
    fn test_interpreter_16_fields_and_bound_methods() {
        let source = "class P {\n  init(n) { this.n = n; }\n  get() { return this.n; }\n}\n\
                      var p = P(3)\nvar g = p.get\np.n = 4\nprint g()\n\
                      p.get = \"shadowed\"\nprint p.get";

        assert_eq!(run_ok(source), "4.0\nshadowed\n");
    }

    #[test]
    fn test_interpreter_17_inherited_initializer_arity() {
        let source = "class A { init(a, b) { this.sum = a + b; } }\nclass B < A {}\nprint B(1, 2).sum";
        assert_eq!(run_ok(source), "3.0\n");

        let (_, message, code) = run_err("class A { init(a) {} }\nA()");
        assert_eq!(message, "[line 2] Error at ): Expected 1 arguments but got 0.");
        assert_eq!(code, 70);
    }

    #[test]
    fn test_interpreter_32_class_declared_in_a_block() {
        let source = "{\n  class Node {\n    init(v) { this.v = v; }\n    copy() { return Node(this.v + 1); }\n  }\n  print Node(1).copy().v\n  print Node\n}";
        assert_eq!(run_ok(source), "2.0\nNode\n");

        let source = "fun make() {\n  class Local { hi() { return \"hi\"; } }\n  return Local\n}\nprint make()().hi()";
        assert_eq!(run_ok(source), "hi\n");
    }

    // ───────────────────────────── runtime errors ─────────────────────────────

    #[test]
    fn test_interpreter_18_division_by_zero() {
        let (output, message, code) = run_err("print 1/0;");

        assert_eq!(output, "");
        assert!(message.contains("Can't divide by zero."));
        assert_eq!(message, "[line 1] Error at /: Can't divide by zero.");
        assert_eq!(code, 70);
    }

    #[test]
    fn test_interpreter_19_undefined_variable() {
        let (_, message, code) = run_err("print x;");
        assert_eq!(message, "[line 1] Error at x: Undefined variable 'x'.");
        assert_eq!(code, 70);

        let (_, message, _) = run_err("y = 1");
        assert_eq!(message, "[line 1] Error at y: Undefined variable 'y'.");
    }

    #[test]
    fn test_interpreter_20_first_runtime_error_aborts_the_run() {
        let (output, message, code) = run_err("print 1\nprint x\nprint 2");

        assert_eq!(output, "1.0\n");
        assert_eq!(message, "[line 2] Error at x: Undefined variable 'x'.");
        assert_eq!(code, 70);
    }

    #[test]
    fn test_interpreter_21_operand_type_errors() {
        let cases = [
            ("print \"a\" + 1", "[line 1] Error at +: Operands must be two numbers or two strings."),
            ("print 1 < \"a\"", "[line 1] Error at <: Operands must be numbers."),
            ("print 2 * nil", "[line 1] Error at *: Operands must be numbers."),
            ("print -\"a\"", "[line 1] Error at -: Operand must be a number."),
        ];

        for (source, expected) in cases {
            let (_, message, code) = run_err(source);
            assert_eq!(message, expected, "source: {}", source);
            assert_eq!(code, 70);
        }
    }

    #[test]
    fn test_interpreter_22_call_and_property_errors() {
        let cases = [
            ("\"x\"()", "[line 1] Error at ): Can only call functions and classes."),
            ("fun f(a) {}\nf()", "[line 2] Error at ): Expected 1 arguments but got 0."),
            ("var a = 1\nprint a.b", "[line 2] Error at b: Only instances have properties."),
            ("var a = 1\na.b = 2", "[line 2] Error at b: Only instances have fields."),
            ("class A {}\nprint A().x", "[line 2] Error at x: Undefined property 'x'."),
            ("var X = 1\nclass A < X {}", "[line 2] Error at X: Superclass must be a class."),
            (
                "class A {}\nclass B < A { m() { return super.missing; } }\nB().m()",
                "[line 2] Error at missing: Undefined property 'missing'.",
            ),
        ];

        for (source, expected) in cases {
            let (_, message, code) = run_err(source);
            assert_eq!(message, expected, "source: {}", source);
            assert_eq!(code, 70);
        }
    }

    #[test]
    fn test_interpreter_23_unbounded_recursion_is_a_runtime_error() {
        let (_, message, code) = run_err("fun f() { f(); }\nf()");

        assert_eq!(message, "[line 1] Error at ): Stack overflow.");
        assert_eq!(code, 70);
    }

    #[test]
    fn test_interpreter_24_call_depth_is_configurable() {
        let out = SharedBuf::default();
        let mut lox = Lox::with_output(Box::new(out.clone())).with_max_call_depth(10);

        let source = "fun down(n) {\n  if (n == 0) return 0\n  return down(n - 1)\n}\nprint down(9)\nprint down(10)";
        let result = lox.run(source);

        assert_eq!(out.contents(), "0.0\n");
        match result {
            Err(LoxError::Runtime(e)) => assert_eq!(e.message(), "Stack overflow."),
            other => panic!("expected stack overflow, got {:?}", other),
        }
    }

    #[test]
    fn test_interpreter_25_output_failure_is_reported() {
        let mut lox = Lox::with_output(Box::new(BrokenPipe));

        match lox.run("print 1") {
            Err(e @ LoxError::Runtime(RuntimeError::Output(_))) => assert_eq!(e.exit_code(), 70),
            other => panic!("expected output error, got {:?}", other),
        }
    }

    // ───────────────────────────── static errors ─────────────────────────────

    #[test]
    fn test_interpreter_26_syntax_error_prevents_all_output() {
        let (output, message, code) = run_err("print 1\nprint (");

        assert_eq!(output, "");
        assert_eq!(message, "[line 2] Error at end: Expect expression.");
        assert_eq!(code, 65);
    }

    #[test]
    fn test_interpreter_27_lexical_error_prevents_all_output() {
        let (output, message, code) = run_err("print 1\n@\nprint 2");

        assert_eq!(output, "");
        assert_eq!(message, "[line 2] Error: Unexpected character.");
        assert_eq!(code, 65);
    }

    #[test]
    fn test_interpreter_28_resolution_error_prevents_all_output() {
        let (output, message, code) = run_err("print 1\nreturn 2");

        assert_eq!(output, "");
        assert_eq!(message, "[line 2] Error at return: Can't return from top-level code.");
        assert_eq!(code, 65);
    }

    #[test]
    fn test_interpreter_29_all_static_diagnostics_are_reported() {
        let (_, message, code) = run_err("var = 1\n\"open");

        assert_eq!(
            message,
            "[line 2] Error: Unterminated string.\n[line 1] Error at =: Expect variable name."
        );
        assert_eq!(code, 65);
    }

    #[test]
    fn test_interpreter_33_deeply_nested_blocks_run() {
        let output = std::thread::Builder::new()
            .stack_size(8 * 1024 * 1024)
            .spawn(|| {
                let depth = 10_000;
                let source = format!("{}print 1\n{}", "{".repeat(depth), "}".repeat(depth));
                run_ok(&source)
            })
            .expect("spawn interpreter thread")
            .join()
            .expect("interpreter thread panicked");

        assert_eq!(output, "1.0\n");
    }

    // ───────────────────────────── sessions ─────────────────────────────

    #[test]
    fn test_interpreter_30_session_state_survives_runs() {
        let (mut lox, out) = session();

        lox.run("var a = 1\n").expect("define a");
        lox.run("fun add(n) {\n  var local = n\n  return a + local\n}\n")
            .expect("define add");

        assert!(lox.run("print undefined\n").is_err());
        assert!(lox.run("print (\n").is_err());

        lox.run("print add(2)\n").expect("call add");
        lox.run("{ var b = 5; print a + b; }\n").expect("block");

        assert_eq!(out.contents(), "3.0\n6.0\n");
    }

    #[test]
    fn test_interpreter_31_session_recovers_after_runtime_error_in_call() {
        let (mut lox, out) = session();

        lox.run("fun boom() { var x = 1; return x / 0; }\n").expect("define");
        assert!(lox.run("boom()\n").is_err());

        // Environment and call depth were reset.
        lox.run("var y = 2\nprint y\n").expect("still usable");
        assert_eq!(out.contents(), "2.0\n");
    }
}
