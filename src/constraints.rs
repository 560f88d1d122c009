// SPDX-License-Identifier: Apache-2.0

//! Constraint-file loading and the feasibility predicate.
//!
//! A problem file declares the dimensionality, a seed point and one
//! constraint expression per line:
//!
//! ```text
//! # Feasible region: the lower-left triangle, minus one corner box.
//! dims 2
//! seed 0.1 0.1
//! x0 + x1 <= 1.0
//! not (x0 > 0.8 and x1 > 0.8)
//! ```
//!
//! `dims` must appear before `seed` and before any constraint; `#` starts a
//! comment; blank lines are ignored. `dims` and `seed` are reserved as
//! line-leading keywords. Whether the seed actually satisfies the
//! constraints is checked by the sampler, not here.

use std::path::Path;

use crate::expr_parser;
use crate::predicate::{self, LowerError, Predicate};

/// One declared constraint: the typed predicate plus its source text for
/// diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub source: String,
    pub predicate: Predicate,
}

/// The conjunction of all declared constraints over vectors of a fixed
/// dimensionality. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSet {
    dims: usize,
    constraints: Vec<Constraint>,
}

impl ConstraintSet {
    pub fn new(dims: usize, constraints: Vec<Constraint>) -> Self {
        Self { dims, constraints }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// True iff every declared constraint holds for `x`. Pure and
    /// deterministic; never panics. A vector of the wrong arity is simply
    /// not feasible.
    pub fn apply(&self, x: &[f64]) -> bool {
        if x.len() != self.dims {
            return false;
        }
        self.constraints.iter().all(|c| c.predicate.eval(x))
    }
}

/// A fully-loaded problem: dimensionality, the declared seed point and the
/// constraint set.
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    pub dims: usize,
    pub seed: Vec<f64>,
    pub constraints: ConstraintSet,
}

/// Errors that can arise while loading a problem file.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintError {
    /// The file could not be read.
    Io { path: String, message: String },
    /// No `dims` line in the file.
    MissingDims,
    /// No `seed` line in the file.
    MissingSeed,
    /// `dims` declared more than once.
    DuplicateDims { line: usize },
    /// `seed` declared more than once.
    DuplicateSeed { line: usize },
    /// `dims` line is not `dims <positive integer>`.
    BadDims { line: usize, text: String },
    /// A seed coordinate failed to parse as a number.
    BadSeedValue { line: usize, token: String },
    /// The seed has the wrong number of coordinates.
    SeedArity {
        line: usize,
        expected: usize,
        actual: usize,
    },
    /// A `seed` or constraint line appeared before `dims` was declared.
    DimsNotDeclared { line: usize },
    /// A constraint failed to parse.
    Parse {
        line: usize,
        text: String,
        message: String,
    },
    /// A constraint parsed but is not a valid boolean expression over
    /// `x0..x{dims-1}`.
    Lower {
        line: usize,
        text: String,
        error: LowerError,
    },
}

impl std::fmt::Display for ConstraintError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstraintError::Io { path, message } => {
                write!(f, "failed to read '{}': {}", path, message)
            }
            ConstraintError::MissingDims => write!(f, "no 'dims' declaration in file"),
            ConstraintError::MissingSeed => write!(f, "no 'seed' declaration in file"),
            ConstraintError::DuplicateDims { line } => {
                write!(f, "line {}: 'dims' declared more than once", line)
            }
            ConstraintError::DuplicateSeed { line } => {
                write!(f, "line {}: 'seed' declared more than once", line)
            }
            ConstraintError::BadDims { line, text } => {
                write!(
                    f,
                    "line {}: expected 'dims <positive integer>', got: {}",
                    line, text
                )
            }
            ConstraintError::BadSeedValue { line, token } => {
                write!(f, "line {}: bad seed coordinate {:?}", line, token)
            }
            ConstraintError::SeedArity {
                line,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "line {}: seed has {} coordinate(s), expected {}",
                    line, actual, expected
                )
            }
            ConstraintError::DimsNotDeclared { line } => {
                write!(f, "line {}: 'dims' must be declared first", line)
            }
            ConstraintError::Parse {
                line,
                text,
                message,
            } => {
                write!(f, "line {}: cannot parse constraint '{}': {}", line, text, message)
            }
            ConstraintError::Lower { line, text, error } => {
                write!(f, "line {}: invalid constraint '{}': {}", line, text, error)
            }
        }
    }
}

impl std::error::Error for ConstraintError {}

/// Reads a problem file from disk and parses it.
pub fn load_problem(path: &Path) -> Result<Problem, ConstraintError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConstraintError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    parse_problem(&text)
}

/// Parses a problem description from text; see the module docs for the
/// grammar.
pub fn parse_problem(text: &str) -> Result<Problem, ConstraintError> {
    let mut dims: Option<usize> = None;
    let mut seed: Option<Vec<f64>> = None;
    let mut constraints: Vec<Constraint> = Vec::new();

    for (index, raw_line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = match raw_line.find('#') {
            Some(comment_start) => &raw_line[..comment_start],
            None => raw_line,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let keyword = line.split_whitespace().next().unwrap_or("");
        match keyword {
            "dims" => {
                if dims.is_some() {
                    return Err(ConstraintError::DuplicateDims { line: line_no });
                }
                dims = Some(parse_dims_line(line, line_no)?);
            }
            "seed" => {
                let expected = dims.ok_or(ConstraintError::DimsNotDeclared { line: line_no })?;
                if seed.is_some() {
                    return Err(ConstraintError::DuplicateSeed { line: line_no });
                }
                seed = Some(parse_seed_line(line, line_no, expected)?);
            }
            _ => {
                let declared_dims =
                    dims.ok_or(ConstraintError::DimsNotDeclared { line: line_no })?;
                let expr =
                    expr_parser::parse_expression(line).map_err(|e| ConstraintError::Parse {
                        line: line_no,
                        text: line.to_string(),
                        message: e.to_string(),
                    })?;
                let predicate =
                    predicate::lower(&expr, declared_dims).map_err(|e| ConstraintError::Lower {
                        line: line_no,
                        text: line.to_string(),
                        error: e,
                    })?;
                constraints.push(Constraint {
                    source: line.to_string(),
                    predicate,
                });
            }
        }
    }

    let dims = dims.ok_or(ConstraintError::MissingDims)?;
    let seed = seed.ok_or(ConstraintError::MissingSeed)?;
    Ok(Problem {
        dims,
        seed,
        constraints: ConstraintSet::new(dims, constraints),
    })
}

fn parse_dims_line(line: &str, line_no: usize) -> Result<usize, ConstraintError> {
    let bad = || ConstraintError::BadDims {
        line: line_no,
        text: line.to_string(),
    };
    let mut tokens = line.split_whitespace().skip(1);
    let value: usize = tokens
        .next()
        .ok_or_else(bad)?
        .parse()
        .map_err(|_| bad())?;
    if value == 0 || tokens.next().is_some() {
        return Err(bad());
    }
    Ok(value)
}

fn parse_seed_line(line: &str, line_no: usize, expected: usize) -> Result<Vec<f64>, ConstraintError> {
    let mut seed = Vec::with_capacity(expected);
    for token in line.split_whitespace().skip(1) {
        let value: f64 = token.parse().map_err(|_| ConstraintError::BadSeedValue {
            line: line_no,
            token: token.to_string(),
        })?;
        seed.push(value);
    }
    if seed.len() != expected {
        return Err(ConstraintError::SeedArity {
            line: line_no,
            expected,
            actual: seed.len(),
        });
    }
    Ok(seed)
}
