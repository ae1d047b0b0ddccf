use retrobasic::lang::{lex, ErrorCode, Operator, Token, Word};

fn tokens(line: &str) -> Vec<Token> {
    lex(line).unwrap().into_iter().map(|t| t.token).collect()
}

#[test]
fn test_statement_tokens() {
    assert_eq!(
        tokens("for i = 1 to 30"),
        vec![
            Token::Word(Word::For),
            Token::Ident("I".into()),
            Token::Operator(Operator::Equal),
            Token::Number(1.0),
            Token::Word(Word::To),
            Token::Number(30.0),
            Token::Eol,
            Token::Eof,
        ]
    );
}

#[test]
fn test_case_folding() {
    assert_eq!(tokens("pRiNt")[0], Token::Word(Word::Print));
    assert_eq!(tokens("aBc$")[0], Token::Ident("ABC$".into()));
}

#[test]
fn test_string_literal_keeps_case() {
    assert_eq!(tokens(r#""Mixed Case""#)[0], Token::Str("Mixed Case".into()));
}

#[test]
fn test_fractional_numbers() {
    assert_eq!(tokens("3.25")[0], Token::Number(3.25));
    assert_eq!(tokens(".5")[0], Token::Number(0.5));
}

#[test]
fn test_operators_and_punctuation() {
    assert_eq!(
        tokens("a <= b : c(1, 2);")[..12],
        [
            Token::Ident("A".into()),
            Token::Operator(Operator::LessEqual),
            Token::Ident("B".into()),
            Token::Colon,
            Token::Ident("C".into()),
            Token::LParen,
            Token::Number(1.0),
            Token::Comma,
            Token::Number(2.0),
            Token::RParen,
            Token::Semicolon,
            Token::Eol,
        ]
    );
}

#[test]
fn test_word_operators() {
    assert_eq!(tokens("mod")[0], Token::Operator(Operator::Modulo));
    assert_eq!(tokens("not")[0], Token::Operator(Operator::Not));
    assert_eq!(tokens("and")[0], Token::Operator(Operator::And));
    assert_eq!(tokens("or")[0], Token::Operator(Operator::Or));
}

#[test]
fn test_comments_consume_the_rest() {
    assert_eq!(tokens("rem print 1"), vec![Token::Eol, Token::Eof]);
    assert_eq!(
        tokens("print 1 ' say one"),
        vec![
            Token::Word(Word::Print),
            Token::Number(1.0),
            Token::Eol,
            Token::Eof,
        ]
    );
}

#[test]
fn test_unterminated_string_errors_with_column() {
    let error = lex(r#"print "oops"#).unwrap_err();
    assert_eq!(error.code(), ErrorCode::UnterminatedString);
    assert_eq!(error.column(), Some(6..11));
}

#[test]
fn test_every_token_carries_its_column() {
    let lexed = lex("a = 10 + b").unwrap();
    let columns: Vec<_> = lexed.iter().map(|t| t.column.clone()).collect();
    assert_eq!(columns[0], 0..1);
    assert_eq!(columns[1], 2..3);
    assert_eq!(columns[2], 4..6);
    assert_eq!(columns[3], 7..8);
    assert_eq!(columns[4], 9..10);
}
