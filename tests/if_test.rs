mod common;
use common::*;
use retrobasic::lang::ErrorCode;

#[test]
fn test_then_statements() {
    assert_eq!(run(&[r#"10 IF 1 THEN PRINT "one""#]), "one\n");
    assert_eq!(run(&[r#"10 IF 0 THEN PRINT "one""#]), "");
    assert_eq!(run(&[r#"10 IF -1 THEN PRINT "true""#]), "true\n");
}

#[test]
fn test_then_statement_list() {
    assert_eq!(
        run(&[r#"10 IF 1 THEN A = 2 : PRINT A"#, r#"20 PRINT "after""#]),
        "2\nafter\n"
    );
    // The whole list belongs to the branch.
    assert_eq!(run(&[r#"10 IF 0 THEN A = 2 : PRINT A"#]), "");
}

#[test]
fn test_then_else_statements() {
    assert_eq!(
        run(&[r#"10 IF 0 THEN PRINT "one" ELSE PRINT "two""#]),
        "two\n"
    );
    assert_eq!(
        run(&[r#"10 IF 1 THEN PRINT "one" ELSE PRINT "two""#]),
        "one\n"
    );
}

#[test]
fn test_then_line_else_line() {
    let lines = [
        "10 S = 59",
        "20 IF S >= 60 THEN 100 ELSE 200",
        r#"100 PRINT "PASS" : END"#,
        r#"200 PRINT "FAIL" : END"#,
    ];
    assert_eq!(run(&lines), "FAIL\n");
}

#[test]
fn test_then_line_else_statements() {
    assert_eq!(
        run(&[
            "10 IF 1 THEN 100 ELSE PRINT \"no\"",
            "20 END",
            r#"100 PRINT "yes""#,
        ]),
        "yes\n"
    );
}

#[test]
fn test_then_statements_else_line() {
    assert_eq!(
        run(&[
            r#"10 IF 0 THEN PRINT "no" ELSE 100"#,
            "20 END",
            r#"100 PRINT "yes""#,
        ]),
        "yes\n"
    );
}

#[test]
fn test_condition_comparisons() {
    assert_eq!(
        run(&[r#"10 IF 2 + 2 = 4 THEN PRINT "math works""#]),
        "math works\n"
    );
    assert_eq!(
        run(&[r#"10 A$ = "HI" : IF A$ = "HI" THEN PRINT "eq""#]),
        "eq\n"
    );
}

#[test]
fn test_string_condition_is_a_type_error() {
    let error = run_error(&[r#"10 IF "X" THEN PRINT 1"#]);
    assert_eq!(error.code(), ErrorCode::TypeMismatch);
}

#[test]
fn test_nested_if_binds_else_to_nearest() {
    assert_eq!(
        run(&[r#"10 IF 1 THEN IF 0 THEN PRINT "a" ELSE PRINT "b""#]),
        "b\n"
    );
}
