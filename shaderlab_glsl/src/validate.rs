//! Check that rebuilding GLSL text preserves every line.
use thiserror::Error;

use crate::{ast::Program, parse::ParseError, render::BuildOptions};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoundTripError {
    #[error("expected {original} lines but found {rebuilt} lines")]
    LineCount { original: usize, rebuilt: usize },

    #[error("line {index} differs: expected {original:?} but found {rebuilt:?}")]
    LineMismatch {
        /// The 0-based line index.
        index: usize,
        original: String,
        rebuilt: String,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckError {
    #[error("error parsing GLSL: {0}")]
    Parse(#[from] ParseError),

    #[error("error rebuilding GLSL: {0}")]
    RoundTrip(#[from] RoundTripError),
}

/// Compare `original` and `rebuilt` line by line ignoring trailing blank lines.
pub fn validate_round_trip(original: &str, rebuilt: &str) -> Result<(), RoundTripError> {
    let original = trimmed_lines(original);
    let rebuilt = trimmed_lines(rebuilt);

    if let Some((index, (o, r))) = original
        .iter()
        .zip(&rebuilt)
        .enumerate()
        .find(|(_, (o, r))| o != r)
    {
        return Err(RoundTripError::LineMismatch {
            index,
            original: o.to_string(),
            rebuilt: r.to_string(),
        });
    }

    if original.len() != rebuilt.len() {
        return Err(RoundTripError::LineCount {
            original: original.len(),
            rebuilt: rebuilt.len(),
        });
    }

    Ok(())
}

/// Parse and rebuild `text` and check that the result matches `text`.
pub fn check_round_trip(text: &str) -> Result<(), CheckError> {
    let program = Program::parse(text)?;
    let rebuilt = program.to_glsl(&BuildOptions::default());
    validate_round_trip(text, &rebuilt)?;
    Ok(())
}

fn trimmed_lines(text: &str) -> Vec<&str> {
    let mut lines: Vec<_> = text.lines().collect();
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    lines
}
