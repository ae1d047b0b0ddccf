mod common;
use common::*;
use retrobasic::lang::ErrorCode;

#[test]
fn test_simple_sum() {
    assert_eq!(
        run(&["10 S = 0", "20 FOR I = 1 TO 5 : S = S + I : NEXT", "30 PRINT S"]),
        "15\n"
    );
}

#[test]
fn test_loop_spanning_lines() {
    assert_eq!(
        run(&["10 FOR I = 1 TO 3", "20 PRINT I", "30 NEXT I"]),
        "1\n2\n3\n"
    );
}

#[test]
fn test_zero_iterations() {
    assert_eq!(
        run(&[
            "10 FOR I = 1 TO 0",
            r#"20 PRINT "body""#,
            "30 NEXT",
            r#"40 PRINT "done""#,
        ]),
        "done\n"
    );
}

#[test]
fn test_negative_step() {
    assert_eq!(
        run(&["10 FOR I = 5 TO 1 STEP -1 : PRINT I; : NEXT", "20 PRINT"]),
        "54321\n"
    );
}

#[test]
fn test_fractional_step() {
    assert_eq!(
        run(&["10 S = 0", "20 FOR I = 0 TO 1 STEP 0.25 : S = S + 1 : NEXT", "30 PRINT S"]),
        "5\n"
    );
}

#[test]
fn test_loop_variable_after_exit() {
    // The variable holds the first value past the limit.
    assert_eq!(
        run(&["10 FOR I = 1 TO 3 : NEXT", "20 PRINT I"]),
        "4\n"
    );
}

#[test]
fn test_nested_loops() {
    assert_eq!(
        run(&[
            "100 FOR Y = 1 TO 2",
            "110 FOR X = 7 TO 8",
            "120 PRINT Y; X : NEXT X",
            "130 NEXT Y",
        ]),
        "17\n18\n27\n28\n"
    );
}

#[test]
fn test_named_next_unwinds_inner_frames() {
    assert_eq!(
        run(&[
            "10 FOR Y = 1 TO 2",
            "20 FOR X = 8 TO 9",
            "30 PRINT Y; X",
            "40 GOTO 60",
            "50 NEXT",
            "60 NEXT Y",
        ]),
        "18\n28\n"
    );
}

#[test]
fn test_step_expressions_evaluate_once() {
    assert_eq!(
        run(&[
            "10 N = 2",
            "20 FOR I = 1 TO N * 2 : N = 0 : C = C + 1 : NEXT",
            "30 PRINT C",
        ]),
        "4\n"
    );
}

#[test]
fn test_next_without_for() {
    let error = run_error(&["10 NEXT"]);
    assert_eq!(error.code(), ErrorCode::NextWithoutFor);
    assert_eq!(error.line_number(), Some(10));
}

#[test]
fn test_string_loop_variable_rejected() {
    let error = run_error(&["10 FOR A$ = 1 TO 2 : NEXT"]);
    assert_eq!(error.code(), ErrorCode::TypeMismatch);
}
