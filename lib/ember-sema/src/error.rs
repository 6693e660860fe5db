//! Error types and reporting
//!
//! Every failure of the resolution engine is a [`SemaError`]. Errors carry
//! names already rendered to text, so they outlive the tree they came from,
//! and one or more locations used to build `ariadne` reports.

use ariadne::{Color, Label, Report, ReportKind};
use thiserror::Error;

use crate::context::Loc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Structural,
    UnresolvedReference,
    AmbiguousReference,
    DuplicateSymbol,
    Recursion,
    InheritedShape,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SemaError {
    /// The tree does not have the shape a node kind requires.
    #[error("malformed tree: {message}")]
    Structural { message: String, loc: Loc },

    #[error("unresolved reference `{name}`")]
    UnresolvedReference { name: String, loc: Loc },

    #[error("ambiguous reference `{name}`: {} candidates match equally well", .candidates.len())]
    AmbiguousReference {
        name: String,
        loc: Loc,
        candidates: Vec<Loc>,
    },

    #[error("`{name}` is already declared in this scope")]
    DuplicateSymbol { name: String, loc: Loc, previous: Loc },

    #[error("circular definition: {}", .path.join(" -> "))]
    Recursion { path: Vec<String>, loc: Loc },

    #[error("`{name}` cannot inherit its shape: {reason}")]
    InheritedShape { name: String, reason: String, loc: Loc },
}

impl SemaError {
    pub fn structural(message: impl Into<String>, loc: Loc) -> Self {
        SemaError::Structural {
            message: message.into(),
            loc,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SemaError::Structural { .. } => ErrorKind::Structural,
            SemaError::UnresolvedReference { .. } => ErrorKind::UnresolvedReference,
            SemaError::AmbiguousReference { .. } => ErrorKind::AmbiguousReference,
            SemaError::DuplicateSymbol { .. } => ErrorKind::DuplicateSymbol,
            SemaError::Recursion { .. } => ErrorKind::Recursion,
            SemaError::InheritedShape { .. } => ErrorKind::InheritedShape,
        }
    }

    /// Primary location of the error.
    pub fn loc(&self) -> &Loc {
        match self {
            SemaError::Structural { loc, .. }
            | SemaError::UnresolvedReference { loc, .. }
            | SemaError::AmbiguousReference { loc, .. }
            | SemaError::DuplicateSymbol { loc, .. }
            | SemaError::Recursion { loc, .. }
            | SemaError::InheritedShape { loc, .. } => loc,
        }
    }

    pub fn report(&self) -> Report<'_, Loc> {
        let mut report = Report::build(ReportKind::Error, self.loc().clone())
            .with_message(self.to_string())
            .with_label(Label::new(self.loc().clone()).with_color(Color::Red));

        match self {
            SemaError::UnresolvedReference { .. } => {
                report = report.with_help("Check spelling, visibility and declaration order.");
            }
            SemaError::AmbiguousReference { candidates, .. } => {
                for candidate in candidates {
                    report = report.with_label(
                        Label::new(candidate.clone())
                            .with_message("candidate")
                            .with_color(Color::Yellow),
                    );
                }
                report = report.with_help("Add an explicit cast or import the package under an alias.");
            }
            SemaError::DuplicateSymbol { previous, .. } => {
                report = report.with_label(
                    Label::new(previous.clone())
                        .with_message("previously declared here")
                        .with_color(Color::Yellow),
                );
            }
            SemaError::Recursion { .. } => {
                report = report.with_note("A type cannot contain itself by value; use a pointer.");
            }
            SemaError::Structural { .. } => {
                report = report.with_help("This is a bug in the tree builder. Please file a bug report.");
            }
            SemaError::InheritedShape { .. } => {}
        }

        report.finish()
    }
}

/// Collection of independent errors reported together.
#[derive(Debug, Clone, Default, Error, PartialEq, Eq)]
#[error("{} error(s); first: {}", .0.len(), .0.first().map(ToString::to_string).unwrap_or_default())]
pub struct Diagnostics(pub Vec<SemaError>);

impl Diagnostics {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, error: SemaError) {
        self.0.push(error);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SemaError> {
        self.0.iter()
    }

    pub fn kinds(&self) -> Vec<ErrorKind> {
        self.0.iter().map(SemaError::kind).collect()
    }

    pub fn into_result<T>(self, ok: T) -> Result<T, Self> {
        if self.is_empty() { Ok(ok) } else { Err(self) }
    }

    pub fn reports(&self) -> Vec<Report<'_, Loc>> {
        self.0.iter().map(SemaError::report).collect()
    }
}

impl From<SemaError> for Diagnostics {
    fn from(err: SemaError) -> Self {
        Self(vec![err])
    }
}

impl IntoIterator for Diagnostics {
    type Item = SemaError;
    type IntoIter = std::vec::IntoIter<SemaError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
