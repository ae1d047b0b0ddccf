use std::ops::RangeInclusive;

/// Flag bit set in a `CALLFN` count when a `LINE` statement used the
/// `-(x2,y2)` shorthand continuing from the current pen position.
pub const LINE_RELATIVE_FLAG: usize = 1 << 30;

/// ## Built-in function registry
///
/// The compiler resolves names against this table; the VM dispatches on the
/// id. Ids are fixed at compile time so the dispatch is a plain match.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    // Numeric
    Abs,
    Int,
    Sgn,
    Sqr,
    Sin,
    Cos,
    Tan,
    Atn,
    Log,
    Exp,
    Pi,
    Rad,
    Deg,
    Min,
    Max,
    Clamp,
    Mod,
    // RNG and time
    Rnd,
    Rndi,
    Randomize,
    Timer,
    // String
    Str,
    Val,
    Len,
    Chr,
    Asc,
    Left,
    Right,
    Mid,
    Spc,
    Tab,
    Instr,
    StringOf,
    // Console
    Input,
    Locate,
    // Graphics host
    Screen,
    Cls,
    Color,
    Pset,
    Line,
    Circle,
    Box,
    Paint,
    Flush,
    ColorHsv,
    SaveImage,
    Sleep,
    Point,
    GLocate,
    GPrint,
}

impl Function {
    /// Look up a name from the lexer; returns the id and the accepted
    /// argument count range.
    pub fn lookup(name: &str) -> Option<(Function, RangeInclusive<usize>)> {
        use Function::*;
        match name {
            "ABS" => Some((Abs, 1..=1)),
            "INT" => Some((Int, 1..=1)),
            "SGN" => Some((Sgn, 1..=1)),
            "SQR" => Some((Sqr, 1..=1)),
            "SIN" => Some((Sin, 1..=1)),
            "COS" => Some((Cos, 1..=1)),
            "TAN" => Some((Tan, 1..=1)),
            "ATN" => Some((Atn, 1..=1)),
            "LOG" => Some((Log, 1..=1)),
            "EXP" => Some((Exp, 1..=1)),
            "PI" => Some((Pi, 0..=0)),
            "RAD" => Some((Rad, 1..=1)),
            "DEG" => Some((Deg, 1..=1)),
            "MIN" => Some((Min, 2..=2)),
            "MAX" => Some((Max, 2..=2)),
            "CLAMP" => Some((Clamp, 3..=3)),
            "MOD" => Some((Mod, 2..=2)),
            "RND" => Some((Rnd, 0..=0)),
            "RNDI" => Some((Rndi, 1..=1)),
            "RANDOMIZE" => Some((Randomize, 0..=1)),
            "TIMER" => Some((Timer, 0..=0)),
            "STR$" => Some((Str, 1..=1)),
            "VAL" => Some((Val, 1..=1)),
            "LEN" => Some((Len, 1..=1)),
            "CHR$" => Some((Chr, 1..=1)),
            "ASC" => Some((Asc, 1..=1)),
            "LEFT$" => Some((Left, 2..=2)),
            "RIGHT$" => Some((Right, 2..=2)),
            "MID$" => Some((Mid, 2..=3)),
            "SPC" => Some((Spc, 1..=1)),
            "TAB" => Some((Tab, 1..=1)),
            "INSTR" => Some((Instr, 2..=3)),
            "STRING$" => Some((StringOf, 2..=2)),
            "INPUT" => Some((Input, 1..=1)),
            "LOCATE" => Some((Locate, 2..=2)),
            "SCREEN" => Some((Screen, 2..=2)),
            "CLS" => Some((Cls, 0..=0)),
            "COLOR" => Some((Color, 1..=3)),
            "PSET" => Some((Pset, 2..=3)),
            "LINE" => Some((Line, 2..=5)),
            "CIRCLE" => Some((Circle, 3..=4)),
            "BOX" => Some((Box, 4..=6)),
            "PAINT" => Some((Paint, 2..=3)),
            "FLUSH" => Some((Flush, 0..=0)),
            "COLORHSV" => Some((ColorHsv, 3..=3)),
            "SAVEIMAGE" => Some((SaveImage, 1..=1)),
            "SLEEP" => Some((Sleep, 1..=1)),
            "POINT" => Some((Point, 2..=2)),
            "GLOCATE" => Some((GLocate, 2..=2)),
            "GPRINT" => Some((GPrint, 1..=1)),
            _ => None,
        }
    }

    /// May be written without parentheses in an expression.
    pub fn is_bare(&self) -> bool {
        matches!(self, Function::Rnd | Function::Pi | Function::Timer)
    }

    /// May lead a statement, taking a comma-separated argument list.
    pub fn is_statement(&self) -> bool {
        use Function::*;
        matches!(
            self,
            Randomize
                | Locate
                | Screen
                | Cls
                | Color
                | Pset
                | Line
                | Circle
                | Box
                | Paint
                | Flush
                | ColorHsv
                | SaveImage
                | Sleep
                | GLocate
                | GPrint
        )
    }

    /// Leaves a result on the stack. Void built-ins push nothing.
    pub fn returns_value(&self) -> bool {
        use Function::*;
        !matches!(
            self,
            Randomize
                | Input
                | Locate
                | Screen
                | Cls
                | Color
                | Pset
                | Line
                | Circle
                | Box
                | Paint
                | Flush
                | ColorHsv
                | SaveImage
                | Sleep
                | GLocate
                | GPrint
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(Function::lookup("MID$"), Some((Function::Mid, 2..=3)));
        assert_eq!(Function::lookup("PICKLES"), None);
    }

    #[test]
    fn test_classification() {
        assert!(Function::Pi.is_bare());
        assert!(!Function::Abs.is_bare());
        assert!(Function::Pset.is_statement());
        assert!(!Function::Pset.returns_value());
        assert!(Function::Point.returns_value());
        assert!(!Function::Point.is_statement());
    }
}
