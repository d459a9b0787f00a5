#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    use scicalc::environment::Environment;
    use scicalc::error::{RuntimeErrorKind, SciError};
    use scicalc::interpreter::Interpreter;
    use scicalc::value::Value;

    /// Collects everything `print` writes during a test.
    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.borrow()).into_owned()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn interpreter() -> Interpreter {
        Interpreter::with_output(io::sink())
    }

    fn eval(source: &str) -> Value {
        interpreter()
            .evaluate(source)
            .unwrap_or_else(|e| panic!("Evaluating {:?} failed: {}", source, e))
    }

    fn eval_error(source: &str) -> SciError {
        match interpreter().evaluate(source) {
            Ok(value) => panic!("Expected {:?} to fail, got {}", source, value),
            Err(e) => e,
        }
    }

    fn error_kind(source: &str) -> RuntimeErrorKind {
        let err = eval_error(source);

        err.runtime_kind()
            .unwrap_or_else(|| panic!("Expected runtime error for {:?}, got {}", source, err))
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1+2*3"), Value::Number(7.0));
        assert_eq!(eval("10 / 4"), Value::Number(2.5));
        assert_eq!(eval("7 div 2"), Value::Number(3.0));
        assert_eq!(eval("-7 div 2"), Value::Number(-3.0));
        assert_eq!(eval("7.9 div 2.9"), Value::Number(3.0));
        assert_eq!(eval("7 % 3"), Value::Number(1.0));
        assert_eq!(eval("\"3\" + 4"), Value::Number(7.0));
        assert_eq!(eval("true + true"), Value::Number(2.0));
    }

    #[test]
    fn test_power_is_right_associative() {
        let value = eval("2^3^4");

        assert_eq!(value.to_string(), "2417851639229258349412352");
    }

    #[test]
    fn test_unary_minus_binds_looser_than_power() {
        assert_eq!(eval("-1^2"), Value::Number(-1.0));
        assert_eq!(eval("(-1)^2"), Value::Number(1.0));
    }

    #[test]
    fn test_number_rendering() {
        assert_eq!(eval("3").to_string(), "3");
        assert_eq!(eval("0.1 + 0.2").to_string(), "0.30000000000000004");
        assert_eq!(eval("-0").to_string(), "0");
        assert_eq!(eval("1 / 3 * 3").to_string(), "1");
        assert_eq!(eval("10^400").to_string(), "Infinity");
        assert_eq!(eval("-(10^400)").to_string(), "-Infinity");
        assert_eq!(eval("10^400 - 10^400").to_string(), "NaN");
        assert_eq!(eval("\"Infinity\" + 0").to_string(), "Infinity");
    }

    #[test]
    fn test_numeric_literal_round_trip() {
        for literal in ["0", "3", "2.5", "0.1", "1e21", "6.02e23", "1e-7", "123456789.125"] {
            let value = eval(literal);
            let rendered = value.to_string();

            assert_eq!(eval(&rendered), value, "{} rendered as {}", literal, rendered);
        }
    }

    #[test]
    fn test_recursive_fibonacci() {
        let value = eval(
            "fib := fun(n) if n<=1 do n else fib(n-1)+fib(n-2) end end; fib(10)",
        );

        assert_eq!(value, Value::Number(55.0));
    }

    #[test]
    fn test_arrays_are_shared_by_reference() {
        assert_eq!(
            eval("a := make_array(3,0); a[1] <- 9; a").to_string(),
            "[0, 9, 0]"
        );

        assert_eq!(
            eval("b := [1, 2]; f := fun(x) x[0] <- 5 end; f(b); b").to_string(),
            "[5, 2]"
        );

        assert_eq!(eval("c := [1]; d := c; push(d, 2); len(c)"), Value::Number(2.0));
    }

    #[test]
    fn test_short_circuit_skips_right_operand() {
        assert_eq!(eval("false && (1/0)"), Value::Bool(false));
        assert_eq!(eval("true || (1/0)"), Value::Bool(true));
        assert_eq!(error_kind("true && (1/0)"), RuntimeErrorKind::DivisionByZero);
    }

    #[test]
    fn test_logic_returns_booleans() {
        assert_eq!(eval("1 && 2"), Value::Bool(true));
        assert_eq!(eval("0 || \"\""), Value::Bool(false));
        assert_eq!(eval("![]"), Value::Bool(true));
        assert_eq!(eval("!print"), Value::Bool(false));
    }

    #[test]
    fn test_conditionals_and_loops() {
        assert_eq!(eval("if 0 do 1 elif \"x\" do 2 else 3 end"), Value::Number(2.0));
        assert_eq!(eval("if false do 1 end"), Value::Null);

        let mut session = interpreter();
        assert_eq!(
            session
                .evaluate("i := 0; s := 0; while i < 5 do s <- s + i; i <- i + 1 end")
                .ok(),
            Some(Value::Null)
        );
        assert_eq!(session.evaluate("s").ok(), Some(Value::Number(10.0)));
    }

    #[test]
    fn test_store_defines_locally_and_update_walks_outwards() {
        assert_eq!(
            eval("x := 1; f := fun() x := 2; x end; f() + x"),
            Value::Number(3.0)
        );
        assert_eq!(eval("y := 1; g := fun() y <- 5 end; g(); y"), Value::Number(5.0));
        assert_eq!(error_kind("zz <- 1"), RuntimeErrorKind::UndefinedVariable);
    }

    #[test]
    fn test_closures_capture_by_reference() {
        assert_eq!(eval("n := 1; g := fun() n end; n <- 2; g()"), Value::Number(2.0));

        assert_eq!(
            eval("make := fun() c := 0; fun() c <- c + 1; c end end; inc := make(); inc(); inc()"),
            Value::Number(2.0)
        );
    }

    #[test]
    fn test_scoping_is_lexical() {
        let value = eval(
            "x := \"global\"; show := fun() x end; \
             call := fun() x := \"local\"; show() end; call()",
        );

        assert_eq!(value, Value::string("global"));
    }

    #[test]
    fn test_block_exit_short_circuits_the_sequence() {
        assert_eq!(eval("block b do b(5); 99 end"), Value::Number(5.0));
        assert_eq!(eval("block b do b(); 99 end"), Value::Null);
        assert_eq!(eval("block do 1; 2 end"), Value::Number(2.0));
    }

    #[test]
    fn test_block_exit_from_loop_and_closure() {
        assert_eq!(
            eval("i := 0; block done do while true do i <- i + 1; if i == 3 do done(i) end end end"),
            Value::Number(3.0)
        );

        assert_eq!(
            eval("block b do f := fun() b(7) end; f(); 0 end"),
            Value::Number(7.0)
        );
    }

    #[test]
    fn test_exit_unwinds_past_intermediate_blocks() {
        assert_eq!(
            eval("block outer do block inner do outer(1); 2 end; 3 end"),
            Value::Number(1.0)
        );
    }

    #[test]
    fn test_exit_targets_its_own_activation() {
        // Every recursive call opens a block named `b`; the exit must land on the
        // activation whose label was passed down, not the innermost `b`.
        let value = eval(
            "f := fun(n, outer) \
               block b do \
                 if n == 0 do outer(10) else f(n - 1, b) + 100 end \
               end \
             end; \
             f(2, null)",
        );

        assert_eq!(value, Value::Number(110.0));
    }

    #[test]
    fn test_label_is_invalid_after_its_block() {
        let err = eval_error("k := null; block b do k <- b end; k(1)");

        assert_eq!(err.runtime_kind(), Some(RuntimeErrorKind::InvalidNonLocalExit));
        assert!(err.to_string().contains("Label invalid outside defining block"));
    }

    #[test]
    fn test_label_arity() {
        assert_eq!(error_kind("block b do b(1, 2) end"), RuntimeErrorKind::Arity);
    }

    #[test]
    fn test_label_rendering() {
        assert_eq!(eval("block b do b(b) end").to_string(), "<label b>");
        assert_eq!(eval("fun(a, b) a end").to_string(), "<fun(a, b)>");
        assert_eq!(eval("len").to_string(), "<primitive len>");
    }

    #[test]
    fn test_runtime_error_kinds() {
        assert_eq!(error_kind("nope"), RuntimeErrorKind::UndefinedVariable);
        assert_eq!(error_kind("f := fun(a) a end; f(1, 2)"), RuntimeErrorKind::Arity);
        assert_eq!(error_kind("1(2)"), RuntimeErrorKind::Type);
        assert_eq!(error_kind("5[0]"), RuntimeErrorKind::Type);
        assert_eq!(error_kind("\"s\"[0] <- 1"), RuntimeErrorKind::Type);
        assert_eq!(error_kind("[1, 2][0.5]"), RuntimeErrorKind::Index);
        assert_eq!(error_kind("[1][3]"), RuntimeErrorKind::Index);
        assert_eq!(error_kind("[1] + 1"), RuntimeErrorKind::Type);
        assert_eq!(error_kind("\"abc\" * 2"), RuntimeErrorKind::Type);
        assert_eq!(error_kind("1 % 0"), RuntimeErrorKind::DivisionByZero);
    }

    #[test]
    fn test_runtime_errors_carry_positions() {
        let err = eval_error("x := 1;\n  y + x");

        assert_eq!(err.to_string(), "2:2: undefined variable: No such variable y");

        let err = eval_error("f := fun(a) a end;\nf()");

        assert_eq!(
            err.to_string(),
            "2:1: arity error: Expecting 1 arguments. Given 0"
        );
    }

    #[test]
    fn test_scan_and_parse_errors_are_not_runtime_errors() {
        assert!(matches!(eval_error("1 + #"), SciError::Scan { .. }));
        assert!(matches!(eval_error("1 +"), SciError::Parse { .. }));
        assert_eq!(eval_error("1 +").runtime_kind(), None);
    }

    #[test]
    fn test_session_persists_across_evaluations() {
        let mut session = interpreter();

        assert!(session.evaluate("fun sq(x) x * x end; total := 0").is_ok());
        assert!(session.evaluate("total <- sq(4)").is_ok());
        assert_eq!(session.evaluate("total").ok(), Some(Value::Number(16.0)));
    }

    #[test]
    fn test_failed_evaluation_keeps_prior_bindings() {
        let mut session = interpreter();

        assert!(session.evaluate("f := fun(a) a end; x := 1").is_ok());

        let err = session.evaluate("x <- 2; f(1, 2)").err();
        assert_eq!(
            err.and_then(|e| e.runtime_kind()),
            Some(RuntimeErrorKind::Arity)
        );

        assert!(session.evaluate("undefined_name").is_err());
        assert!(session.evaluate("1 +").is_err());

        assert_eq!(session.evaluate("f(3)").ok(), Some(Value::Number(3.0)));
        assert_eq!(session.evaluate("x").ok(), Some(Value::Number(2.0)));
    }

    #[test]
    fn test_globals_are_seeded() {
        let session = interpreter();
        let globals = session.globals().borrow();

        assert!(globals.contains_local("PI"));
        assert!(globals.contains_local("print_line"));
        assert!(globals.enclosing().is_none());
        assert_eq!(globals.get("E").ok(), Some(Value::Number(std::f64::consts::E)));
        assert_eq!(eval("PI"), Value::Number(std::f64::consts::PI));
    }

    #[test]
    fn test_host_define_and_call() {
        let mut session = interpreter();

        session.define("limit", Value::from(3.0));
        session.define("verbose", true.into());
        session.define("unit", "cm".into());
        assert_eq!(session.evaluate("limit * 2").ok(), Some(Value::Number(6.0)));
        assert_eq!(session.evaluate("verbose && unit").ok(), Some(Value::Bool(true)));
        assert_eq!(session.evaluate("unit").ok(), Some(Value::string("cm")));

        assert!(session.evaluate("sq := fun(x) x * x end").is_ok());

        let sq = session
            .globals()
            .borrow()
            .get("sq")
            .expect("sq is defined");

        assert_eq!(
            session.call(&sq, vec![Value::Number(4.0)]).ok(),
            Some(Value::Number(16.0))
        );

        let err = session.call(&Value::Null, vec![]).err();
        assert_eq!(err.and_then(|e| e.runtime_kind()), Some(RuntimeErrorKind::Type));
    }

    #[test]
    fn test_print_output_is_captured() {
        let buffer = SharedBuffer::default();
        let mut session = Interpreter::with_output(buffer.clone());

        let value = session
            .evaluate("print_line(1, \"a\", [1, 2.5]); print(true, null); print_line()")
            .expect("evaluates");

        assert_eq!(value, Value::Null);
        assert_eq!(buffer.contents(), "1 a [1, 2.5]\ntrue null\n");
    }

    #[test]
    fn test_output_before_an_error_is_kept() {
        let buffer = SharedBuffer::default();
        let mut session = Interpreter::with_output(buffer.clone());

        assert!(session.evaluate("print_line(\"before\"); nope").is_err());
        assert_eq!(buffer.contents(), "before\n");
    }

    #[test]
    fn test_environment_chain() {
        let outer = Rc::new(RefCell::new(Environment::new()));
        outer.borrow_mut().define("a", Value::Number(1.0));

        let mut inner = Environment::with_enclosing(Rc::clone(&outer));
        inner.define("b", Value::Number(2.0));

        assert_eq!(inner.get("a").ok(), Some(Value::Number(1.0)));
        assert!(!inner.contains_local("a"));

        assert!(inner.assign("a", Value::Number(5.0)).is_ok());
        assert_eq!(outer.borrow().get("a").ok(), Some(Value::Number(5.0)));

        let err = inner.assign("missing", Value::Null).err();
        assert_eq!(err.map(|e| e.kind), Some(RuntimeErrorKind::UndefinedVariable));
    }
}
