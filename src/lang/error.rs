use super::{Column, LineNumber};

/// A compile-time or run-time failure.
///
/// Every error carries a code from the fixed catalogue below and may be
/// decorated with the line number and source column where it arose.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    code: ErrorCode,
    line: Option<LineNumber>,
    column: Option<Column>,
    message: Option<String>,
}

/// Builds an `Error` from an `ErrorCode`, with optional column and message.
/// `error!(SyntaxError)`, `error!(SyntaxError, ..&col)`,
/// `error!(SyntaxError, ..&col; "UNEXPECTED COMMA")`.
#[macro_export]
macro_rules! error {
    ($code:ident) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$code)
    };
    ($code:ident, ..$col:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$code).in_column($col)
    };
    ($code:ident; $msg:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$code).message($msg)
    };
    ($code:ident, ..$col:expr; $msg:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$code)
            .in_column($col)
            .message($msg)
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    SyntaxError,
    UndefdStatement,
    TypeMismatch,
    SubscriptOutOfRange,
    UndefdArray,
    DivisionByZero,
    DomainError,
    ReturnWithoutGosub,
    NextWithoutFor,
    ArgumentCountMismatch,
    UndefdFunction,
    BadJumpTarget,
    BadDim,
    BadSubscript,
    UnterminatedString,
    IllegalFunctionCall,
    OutOfMemory,
    InternalError,
}

impl ErrorCode {
    fn as_str(&self) -> &'static str {
        use ErrorCode::*;
        match self {
            SyntaxError => "SYNTAX ERROR",
            UndefdStatement => "UNDEF'D STATEMENT",
            TypeMismatch => "TYPE MISMATCH",
            SubscriptOutOfRange => "SUBSCRIPT OUT OF RANGE",
            UndefdArray => "UNDEF'D ARRAY",
            DivisionByZero => "DIVISION BY ZERO",
            DomainError => "DOMAIN ERROR",
            ReturnWithoutGosub => "RETURN WITHOUT GOSUB",
            NextWithoutFor => "NEXT WITHOUT FOR",
            ArgumentCountMismatch => "ARGUMENT COUNT MISMATCH",
            UndefdFunction => "UNDEF'D FUNCTION",
            BadJumpTarget => "BAD JUMP TARGET",
            BadDim => "BAD DIM",
            BadSubscript => "BAD SUBSCRIPT",
            UnterminatedString => "UNTERMINATED STRING",
            IllegalFunctionCall => "ILLEGAL FUNCTION CALL",
            OutOfMemory => "OUT OF MEMORY",
            InternalError => "INTERNAL ERROR",
        }
    }
}

impl Error {
    pub fn new(code: ErrorCode) -> Error {
        Error {
            code,
            line: None,
            column: None,
            message: None,
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn line_number(&self) -> Option<LineNumber> {
        self.line
    }

    pub fn column(&self) -> Option<Column> {
        self.column.clone()
    }

    /// Attach a source column. The first attachment wins so that errors
    /// bubbling out of sub-expressions keep their original location.
    pub fn in_column(mut self, column: &Column) -> Error {
        if self.column.is_none() {
            self.column = Some(column.clone());
        }
        self
    }

    /// Attach a line number. The first attachment wins.
    pub fn in_line_number(mut self, line: Option<LineNumber>) -> Error {
        if self.line.is_none() {
            self.line = line;
        }
        self
    }

    pub fn message(mut self, message: &str) -> Error {
        if self.message.is_none() {
            self.message = Some(message.into());
        }
        self
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.code.as_str())?;
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        match (self.line, &self.column) {
            (Some(line), Some(column)) => {
                write!(f, " (line {}, col {})", line, column.start + 1)
            }
            (Some(line), None) => write!(f, " (program, line {})", line),
            (None, Some(column)) => write!(f, " (col {})", column.start + 1),
            (None, None) => Ok(()),
        }
    }
}
