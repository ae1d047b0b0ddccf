use crate::lang::Error;
use std::rc::Rc;

type Result<T> = std::result::Result<T, Error>;

/// ## Runtime stack values
///
/// A value is either a finite 64-bit float or an immutable string.
/// Comparison opcodes produce `-1.0` for true and `0.0` for false; any
/// non-zero number is truthy.

#[derive(Debug, Clone, PartialEq)]
pub enum Val {
    Number(f64),
    Str(Rc<str>),
}

impl Val {
    /// The canonical string form: shortest round-trip decimal for numbers,
    /// no locale dependence. Used for printing, string coercion on store,
    /// and mixed comparisons.
    pub fn canonical(&self) -> Rc<str> {
        match self {
            Val::Number(n) => format!("{}", n).into(),
            Val::Str(s) => s.clone(),
        }
    }

    pub fn as_number(&self) -> Result<f64> {
        match self {
            Val::Number(n) => Ok(*n),
            Val::Str(_) => Err(error!(TypeMismatch)),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        Ok(self.as_number()? != 0.0)
    }

    pub fn as_str(&self) -> Result<Rc<str>> {
        match self {
            Val::Str(s) => Ok(s.clone()),
            Val::Number(_) => Err(error!(TypeMismatch)),
        }
    }

    /// Index or count argument: a non-negative integral number.
    pub fn as_index(&self) -> Result<usize> {
        let n = self.as_number()?;
        if n < 0.0 {
            return Err(error!(IllegalFunctionCall));
        }
        Ok(n as usize)
    }

    pub fn truth(b: bool) -> Val {
        Val::Number(if b { -1.0 } else { 0.0 })
    }
}

impl std::fmt::Display for Val {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Val::Number(n) => write!(f, "{}", n),
            Val::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for Val {
    fn from(n: f64) -> Val {
        Val::Number(n)
    }
}

impl From<&str> for Val {
    fn from(s: &str) -> Val {
        Val::Str(s.into())
    }
}
