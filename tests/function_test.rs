mod common;
use common::*;
use retrobasic::lang::ErrorCode;

#[test]
fn test_numeric_functions() {
    assert_eq!(run(&["10 PRINT ABS(-3.5)"]), "3.5\n");
    assert_eq!(run(&["10 PRINT INT(2.7); INT(-2.7)"]), "2-3\n");
    assert_eq!(run(&["10 PRINT SGN(-9); SGN(0); SGN(4)"]), "-101\n");
    assert_eq!(run(&["10 PRINT SQR(16)"]), "4\n");
    assert_eq!(run(&["10 PRINT MIN(2, 5); MAX(2, 5)"]), "25\n");
    assert_eq!(run(&["10 PRINT CLAMP(7, 0, 5); CLAMP(-2, 0, 5)"]), "50\n");
    assert_eq!(run(&["10 PRINT MOD(10, 4)"]), "2\n");
}

#[test]
fn test_trig_and_rounding() {
    assert_eq!(run(&["10 PRINT SIN(0); COS(0); TAN(0); ATN(0)"]), "0100\n");
    assert_eq!(run(&["10 PRINT EXP(0); LOG(1)"]), "10\n");
    assert_eq!(
        run(&["10 PRINT ABS(DEG(PI) - 180) < 0.0001; ABS(RAD(180) - PI) < 0.0001"]),
        "-1-1\n"
    );
}

#[test]
fn test_bare_zero_argument_functions() {
    assert_eq!(run(&["10 PRINT PI > 3.14 AND PI < 3.15"]), "-1\n");
    assert_eq!(run(&["10 PRINT RND >= 0 AND RND < 1"]), "-1\n");
    assert_eq!(run(&["10 PRINT TIMER >= 0"]), "-1\n");
}

#[test]
fn test_log_domain_error() {
    let error = run_error(&["10 PRINT LOG(0)"]);
    assert_eq!(error.code(), ErrorCode::DomainError);
    let error = run_error(&["10 PRINT LOG(-1)"]);
    assert_eq!(error.code(), ErrorCode::DomainError);
}

#[test]
fn test_sqr_of_negative_is_a_domain_error() {
    let error = run_error(&["10 PRINT SQR(-1)"]);
    assert_eq!(error.code(), ErrorCode::DomainError);
}

#[test]
fn test_string_functions() {
    assert_eq!(run(&[r#"10 PRINT LEN("HELLO")"#]), "5\n");
    assert_eq!(run(&[r#"10 PRINT LEFT$("HELLO", 2)"#]), "HE\n");
    assert_eq!(run(&[r#"10 PRINT RIGHT$("HELLO", 2)"#]), "LO\n");
    assert_eq!(run(&[r#"10 PRINT MID$("HELLO", 2)"#]), "ELLO\n");
    assert_eq!(run(&[r#"10 PRINT MID$("HELLO", 2, 2)"#]), "EL\n");
    assert_eq!(run(&[r#"10 PRINT LEFT$("AB", 5)"#]), "AB\n");
    assert_eq!(run(&[r#"10 PRINT CHR$(65); ASC("A")"#]), "A65\n");
    assert_eq!(run(&[r#"10 PRINT STRING$(3, 65)"#]), "AAA\n");
    assert_eq!(run(&[r#"10 PRINT STRING$(2, "xy")"#]), "xx\n");
}

#[test]
fn test_instr_is_one_based() {
    assert_eq!(run(&[r#"10 PRINT INSTR("HELLO", "LL")"#]), "3\n");
    assert_eq!(run(&[r#"10 PRINT INSTR("HELLO", "Z")"#]), "0\n");
    assert_eq!(run(&[r#"10 PRINT INSTR(4, "HELLOLL", "LL")"#]), "6\n");
}

#[test]
fn test_val_and_str_round_trip() {
    assert_eq!(run(&[r#"10 PRINT VAL(STR$(3.25))"#]), "3.25\n");
    assert_eq!(run(&[r#"10 PRINT VAL("  42  ")"#]), "42\n");
    assert_eq!(run(&[r#"10 PRINT VAL("BOGUS")"#]), "0\n");
    assert_eq!(run(&[r#"10 PRINT STR$(-7) + "!""#]), "-7!\n");
}

#[test]
fn test_left_right_partition_round_trip() {
    assert_eq!(
        run(&[
            r#"10 S$ = "PARTITION""#,
            "20 K = 4",
            r#"30 PRINT LEFT$(S$, K) + RIGHT$(S$, LEN(S$) - K)"#,
        ]),
        "PARTITION\n"
    );
}

#[test]
fn test_randomize_seed_reproduces() {
    assert_eq!(
        run(&[
            "10 RANDOMIZE 42",
            "20 A = RND",
            "30 RANDOMIZE 42",
            "40 B = RND",
            r#"50 IF A = B THEN PRINT "SAME" ELSE PRINT "DIFF""#,
        ]),
        "SAME\n"
    );
}

#[test]
fn test_rndi_stays_in_range() {
    assert_eq!(
        run(&[
            "10 RANDOMIZE 7",
            "20 FOR I = 1 TO 50",
            r#"30 X = RNDI(3) : IF X < 0 OR X > 3 THEN PRINT "BAD""#,
            "40 IF X <> INT(X) THEN PRINT \"FRACTIONAL\"",
            "50 NEXT",
            r#"60 PRINT "OK""#,
        ]),
        "OK\n"
    );
}

#[test]
fn test_wrong_arity_is_rejected_at_compile_time() {
    let error = run_error(&["10 PRINT ABS(1, 2)"]);
    assert_eq!(error.code(), ErrorCode::IllegalFunctionCall);
    let error = run_error(&["10 PRINT LEFT$(\"A\")"]);
    assert_eq!(error.code(), ErrorCode::IllegalFunctionCall);
}

#[test]
fn test_def_fn_single_parameter() {
    assert_eq!(
        run(&["10 DEF FN SQR2(X) = X * X", "20 PRINT FN SQR2(6)"]),
        "36\n"
    );
    // The FN prefix is optional at the call site.
    assert_eq!(
        run(&["10 DEF FN SQR2(X) = X * X", "20 PRINT SQR2(1 + 2)"]),
        "9\n"
    );
}

#[test]
fn test_def_fn_multiple_parameters() {
    assert_eq!(
        run(&[
            "10 DEF FN HYPOT(A, B) = SQR(A * A + B * B)",
            "20 PRINT FN HYPOT(3, 4)",
        ]),
        "5\n"
    );
}

#[test]
fn test_def_fn_string_parameter() {
    assert_eq!(
        run(&[
            r#"10 DEF FN TWICE$(S$) = S$ + S$"#,
            r#"20 PRINT FN TWICE$("AB")"#,
        ]),
        "ABAB\n"
    );
}

#[test]
fn test_def_fn_sees_globals() {
    assert_eq!(
        run(&["10 K = 10", "20 DEF FN SCALE(X) = X * K", "30 PRINT FN SCALE(3)"]),
        "30\n"
    );
}

#[test]
fn test_def_fn_parameters_shadow_globals() {
    assert_eq!(
        run(&[
            "10 X = 99",
            "20 DEF FN INC(X) = X + 1",
            "30 PRINT FN INC(5); X",
        ]),
        "699\n"
    );
}

#[test]
fn test_def_fn_argument_count_mismatch() {
    let error = run_error(&["10 DEF FN F(A, B) = A + B", "20 PRINT FN F(1)"]);
    assert_eq!(error.code(), ErrorCode::ArgumentCountMismatch);
}

#[test]
fn test_def_fn_recursion_rejected() {
    let error = run_error(&["10 DEF FN F(X) = FN F(X - 1)", "20 PRINT FN F(3)"]);
    assert_eq!(error.code(), ErrorCode::SyntaxError);
}

#[test]
fn test_def_fn_calling_another_fn() {
    assert_eq!(
        run(&[
            "10 DEF FN DOUBLE(X) = X * 2",
            "20 DEF FN QUAD(X) = FN DOUBLE(FN DOUBLE(X))",
            "30 PRINT FN QUAD(3)",
        ]),
        "12\n"
    );
}
