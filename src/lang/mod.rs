/*!
## Language module

Lexical analysis of one BASIC source line and the stored-program listing.

*/

/// Source column range of a token, for diagnostics.
pub type Column = std::ops::Range<usize>;

/// Stored-program line number.
pub type LineNumber = u16;

pub const MAX_LINE_NUMBER: LineNumber = 65529;

#[macro_use]
mod error;
mod lex;
mod source;
mod token;

pub use error::{Error, ErrorCode};
pub use lex::lex;
pub use source::Source;
pub use token::{Operator, SourceToken, Token, Word};
