mod common;
use common::*;
use retrobasic::lang::ErrorCode;

#[test]
fn test_while_wend() {
    assert_eq!(
        run(&["10 I = 0", "20 WHILE I < 3", "30 I = I + 1", "40 WEND", "50 PRINT I"]),
        "3\n"
    );
}

#[test]
fn test_while_false_skips_body() {
    assert_eq!(
        run(&["10 WHILE 0", r#"20 PRINT "body""#, "30 WEND", r#"40 PRINT "out""#]),
        "out\n"
    );
}

#[test]
fn test_nested_while() {
    assert_eq!(
        run(&[
            "10 I = 0",
            "20 WHILE I < 2",
            "30 J = 0",
            "40 WHILE J < 2",
            "50 PRINT I; J : J = J + 1",
            "60 WEND",
            "70 I = I + 1",
            "80 WEND",
        ]),
        "00\n01\n10\n11\n"
    );
}

#[test]
fn test_wend_without_while() {
    let error = run_error(&["10 WEND"]);
    assert_eq!(error.code(), ErrorCode::SyntaxError);
}

#[test]
fn test_while_without_wend() {
    let error = run_error(&["10 WHILE 1"]);
    assert_eq!(error.code(), ErrorCode::SyntaxError);
}

#[test]
fn test_do_loop_with_exit_via_goto() {
    assert_eq!(
        run(&[
            "10 I = 0",
            "20 DO",
            "30 I = I + 1 : IF I = 3 THEN 60",
            "40 LOOP",
            "50 END",
            "60 PRINT I",
        ]),
        "3\n"
    );
}

#[test]
fn test_do_loop_until_repeats_while_nonzero() {
    // LOOP UNTIL keeps looping while the condition holds and exits the
    // first time it reads zero.
    assert_eq!(
        run(&["10 I = 0", "20 DO", "30 I = I + 1", "40 LOOP UNTIL I < 3", "50 PRINT I"]),
        "3\n"
    );
}

#[test]
fn test_loop_without_do() {
    let error = run_error(&["10 LOOP"]);
    assert_eq!(error.code(), ErrorCode::SyntaxError);
}
