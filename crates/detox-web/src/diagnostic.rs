//! Diagnostic channel for degraded operations.
//!
//! Gestures with no web analogue and conflicting matcher combinations are not
//! errors. They complete (as a no-op or a best-effort substitute) and report
//! what happened here, so suites shared between native and web targets keep
//! running while still being able to assert on what was degraded.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Category of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// Capability the web platform cannot emulate; the call was a no-op
    Unsupported,
    /// A matcher combinator was applied to an incompatible locator
    MatcherConflict,
    /// A substitute behavior ran in place of the native one
    Degraded,
}

impl DiagnosticKind {
    /// Short label used in log output
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unsupported => "unsupported",
            Self::MatcherConflict => "matcher-conflict",
            Self::Degraded => "degraded",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single non-fatal report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// What went wrong
    pub kind: DiagnosticKind,
    /// Operation name with its arguments, e.g. `pinch(0.5, fast, 0)`
    pub operation: String,
    /// Optional extra context
    pub detail: Option<String>,
}

impl Diagnostic {
    /// Operation has no web equivalent
    #[must_use]
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Unsupported,
            operation: operation.into(),
            detail: None,
        }
    }

    /// Matcher combination that cannot be expressed
    #[must_use]
    pub fn matcher_conflict(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::MatcherConflict,
            operation: operation.into(),
            detail: Some(detail.into()),
        }
    }

    /// Operation ran as an approximation
    #[must_use]
    pub fn degraded(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Degraded,
            operation: operation.into(),
            detail: Some(detail.into()),
        }
    }

    /// Whether this diagnostic concerns the named operation (ignoring arguments)
    #[must_use]
    pub fn is_for(&self, name: &str) -> bool {
        self.operation == name
            || self
                .operation
                .strip_prefix(name)
                .is_some_and(|rest| rest.starts_with('('))
    }

    pub(crate) fn emit(&self) {
        tracing::warn!(kind = %self.kind, operation = %self.operation, "{self}");
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DiagnosticKind::Unsupported => write!(
                f,
                "{} not supported on the web platform only on native devices",
                self.operation
            )?,
            DiagnosticKind::MatcherConflict => {
                write!(f, "{} is not supported with by.text() on web", self.operation)?;
            }
            DiagnosticKind::Degraded => write!(f, "{} approximated on web", self.operation)?,
        }
        if let Some(detail) = &self.detail {
            write!(f, " ({detail})")?;
        }
        Ok(())
    }
}

/// Two-channel result: the primary value plus everything that was degraded
/// while producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    /// Primary value
    pub value: T,
    /// Diagnostics raised while producing the value
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Outcome<T> {
    /// Value with no diagnostics
    #[must_use]
    pub const fn ok(value: T) -> Self {
        Self {
            value,
            diagnostics: Vec::new(),
        }
    }

    /// Value with one diagnostic
    #[must_use]
    pub fn with_diagnostic(value: T, diagnostic: Diagnostic) -> Self {
        Self {
            value,
            diagnostics: vec![diagnostic],
        }
    }

    /// True when nothing was degraded
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Whether any diagnostic concerns the named operation
    #[must_use]
    pub fn reported(&self, name: &str) -> bool {
        self.diagnostics.iter().any(|d| d.is_for(name))
    }

    /// Add a diagnostic
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Transform the value, keeping diagnostics
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            diagnostics: self.diagnostics,
        }
    }

    /// Absorb another outcome's diagnostics, returning its value
    pub fn absorb<U>(&mut self, other: Outcome<U>) -> U {
        self.diagnostics.extend(other.diagnostics);
        other.value
    }

    /// Drop the diagnostics
    pub fn into_value(self) -> T {
        self.value
    }
}

impl Default for Outcome<()> {
    fn default() -> Self {
        Self::ok(())
    }
}

/// Shared sink of every diagnostic raised during a session
#[derive(Debug, Clone, Default)]
pub struct DiagnosticLog {
    entries: Arc<Mutex<Vec<Diagnostic>>>,
}

impl DiagnosticLog {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Diagnostic>> {
        // A panic while holding the lock leaves a plain Vec, still usable.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Log and store a diagnostic
    pub fn record(&self, diagnostic: Diagnostic) {
        diagnostic.emit();
        self.lock().push(diagnostic);
    }

    /// Log and store every diagnostic of an outcome, passing it through
    pub fn record_outcome<T>(&self, outcome: Outcome<T>) -> Outcome<T> {
        for diagnostic in &outcome.diagnostics {
            self.record(diagnostic.clone());
        }
        outcome
    }

    /// Copy of the current entries
    #[must_use]
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }

    /// Remove and return all entries
    pub fn drain(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.lock())
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Whether any entry concerns the named operation
    #[must_use]
    pub fn contains_operation(&self, name: &str) -> bool {
        self.lock().iter().any(|d| d.is_for(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod diagnostic_tests {
        use super::*;

        #[test]
        fn test_unsupported_message() {
            let d = Diagnostic::unsupported("shake()");
            assert_eq!(
                d.to_string(),
                "shake() not supported on the web platform only on native devices"
            );
        }

        #[test]
        fn test_conflict_message_has_detail() {
            let d = Diagnostic::matcher_conflict("and", "right-hand side ignored");
            assert_eq!(
                d.to_string(),
                "and is not supported with by.text() on web (right-hand side ignored)"
            );
        }

        #[test]
        fn test_is_for_matches_name_with_arguments() {
            let d = Diagnostic::unsupported("pinch(0.5, fast, 0)");
            assert!(d.is_for("pinch"));
            assert!(!d.is_for("pinchWithAngle"));
            assert!(Diagnostic::unsupported("shake").is_for("shake"));
        }
    }

    mod outcome_tests {
        use super::*;

        #[test]
        fn test_ok_is_clean() {
            let o = Outcome::ok(5);
            assert!(o.is_clean());
            assert_eq!(o.into_value(), 5);
        }

        #[test]
        fn test_absorb_merges_diagnostics() {
            let mut outer = Outcome::ok(());
            let inner = Outcome::with_diagnostic(7, Diagnostic::unsupported("swipe(up)"));
            let value = outer.absorb(inner);
            assert_eq!(value, 7);
            assert!(outer.reported("swipe"));
        }

        #[test]
        fn test_map_keeps_diagnostics() {
            let o = Outcome::with_diagnostic(2, Diagnostic::unsupported("x")).map(|v| v * 2);
            assert_eq!(o.value, 4);
            assert_eq!(o.diagnostics.len(), 1);
        }
    }

    mod log_tests {
        use super::*;

        #[test]
        fn test_clones_share_entries() {
            let log = DiagnosticLog::new();
            let other = log.clone();
            other.record(Diagnostic::unsupported("matchFace()"));
            assert_eq!(log.len(), 1);
            assert!(log.contains_operation("matchFace"));
        }

        #[test]
        fn test_drain_empties() {
            let log = DiagnosticLog::new();
            log.record(Diagnostic::unsupported("a"));
            log.record(Diagnostic::unsupported("b"));
            assert_eq!(log.drain().len(), 2);
            assert!(log.is_empty());
        }

        #[test]
        fn test_record_outcome_passes_through() {
            let log = DiagnosticLog::new();
            let out = log.record_outcome(Outcome::with_diagnostic(1, Diagnostic::unsupported("z")));
            assert_eq!(out.value, 1);
            assert_eq!(log.snapshot(), out.diagnostics);
        }
    }
}
