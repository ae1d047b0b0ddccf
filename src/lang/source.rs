use super::lex::split_line_number;
use super::{Error, LineNumber};
use std::collections::btree_map::Iter;
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader, Write};

type Result<T> = std::result::Result<T, Error>;

/// The stored program: source text keyed by line number, ascending.
#[derive(Debug, Clone, Default)]
pub struct Source {
    lines: BTreeMap<LineNumber, String>,
}

impl Source {
    pub fn new() -> Source {
        Source::default()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear()
    }

    pub fn insert(&mut self, number: LineNumber, text: &str) {
        if text.trim().is_empty() {
            self.lines.remove(&number);
        } else {
            self.lines.insert(number, text.to_string());
        }
    }

    pub fn get(&self, number: LineNumber) -> Option<&str> {
        self.lines.get(&number).map(|s| s.as_str())
    }

    pub fn iter(&self) -> Iter<'_, LineNumber, String> {
        self.lines.iter()
    }

    /// Accept one entered line. Returns true when it carried a line number
    /// and was stored (or deleted); false means the line is immediate.
    pub fn enter(&mut self, entered: &str) -> bool {
        match split_line_number(entered) {
            (Some(number), rest) => {
                self.insert(number, rest);
                true
            }
            (None, _) => false,
        }
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let mut file = fs::File::create(path)
            .map_err(|e| error!(InternalError; e.to_string().as_str()))?;
        for (number, text) in &self.lines {
            writeln!(file, "{} {}", number, text)
                .map_err(|e| error!(InternalError; e.to_string().as_str()))?;
        }
        Ok(())
    }

    pub fn load(path: &str) -> Result<Source> {
        let file = fs::File::open(path)
            .map_err(|e| error!(InternalError; e.to_string().as_str()))?;
        let mut source = Source::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| error!(InternalError; e.to_string().as_str()))?;
            if line.trim().is_empty() {
                continue;
            }
            match split_line_number(&line) {
                (Some(number), rest) => source.insert(number, rest),
                (None, _) => {
                    return Err(error!(SyntaxError; "MISSING LINE NUMBER"));
                }
            }
        }
        Ok(source)
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (number, text) in &self.lines {
            writeln!(f, "{} {}", number, text)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_stores_and_deletes() {
        let mut source = Source::new();
        assert!(source.enter("10 PRINT 1"));
        assert!(source.enter("20 PRINT 2"));
        assert_eq!(source.get(10), Some("PRINT 1"));
        assert!(source.enter("10"));
        assert_eq!(source.get(10), None);
        assert!(!source.enter("PRINT 3"));
    }

    #[test]
    fn test_lines_sorted() {
        let mut source = Source::new();
        source.enter("30 C");
        source.enter("10 A");
        source.enter("20 B");
        let numbers: Vec<u16> = source.iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, vec![10, 20, 30]);
    }
}
