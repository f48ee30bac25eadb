//! Matcher builder: Detox-style element matchers expressed as CSS selectors
//! and XPath.
//!
//! # Design
//!
//! - **Selector composition**: `id`, `label` and `traits` produce attribute
//!   selectors that combinators splice together as plain strings.
//! - **Path queries are exclusive**: `text` produces an XPath expression. CSS
//!   and XPath cannot be mixed, so a combinator touching a text matcher is
//!   reported as a [`DiagnosticKind::MatcherConflict`] and the incompatible
//!   side is ignored.
//! - **Deterministic**: the same sequence of calls always yields the same
//!   [`LocatorDescriptor`].
//!
//! ```
//! use detox_web::by;
//!
//! let row = by::id("row").with_descendant(by::label("Delete"));
//! assert_eq!(row.get().selector, r#"[data-testid='row'] [aria-label="Delete"]"#);
//! ```
//!
//! [`DiagnosticKind::MatcherConflict`]: crate::DiagnosticKind::MatcherConflict

use crate::diagnostic::Diagnostic;
use crate::facade::{ByFacade, MatcherFacade};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribute carrying test ids
pub const TEST_ID_ATTRIBUTE: &str = "data-testid";

/// Attribute carrying accessible labels
pub const LABEL_ATTRIBUTE: &str = "aria-label";

/// Attribute the first accessibility trait is mapped onto
pub const ROLE_ATTRIBUTE: &str = "aria-role";

/// Serializable result of a matcher: what resolution evaluates against the page
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocatorDescriptor {
    /// CSS selector (empty for text matchers and inert matchers)
    pub selector: String,
    /// XPath expression, set only by `text`
    pub path_query: Option<String>,
}

impl LocatorDescriptor {
    /// A descriptor that can never match anything
    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.path_query.is_none() && self.selector.trim().is_empty()
    }
}

impl fmt::Display for LocatorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path_query {
            Some(query) => write!(f, "xpath={query}"),
            None if self.is_inert() => f.write_str("<inert>"),
            None => write!(f, "css={}", self.selector),
        }
    }
}

/// A composable element matcher.
///
/// Combinators consume and return the matcher so calls chain the way the
/// native API does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matcher {
    selector: String,
    path_query: Option<String>,
    diagnostics: Vec<Diagnostic>,
}

impl Matcher {
    fn from_selector(selector: String) -> Self {
        Self {
            selector,
            path_query: None,
            diagnostics: Vec::new(),
        }
    }

    fn from_path_query(query: String) -> Self {
        Self {
            selector: String::new(),
            path_query: Some(query),
            diagnostics: Vec::new(),
        }
    }

    fn inert(diagnostic: Diagnostic) -> Self {
        Self {
            selector: String::new(),
            path_query: None,
            diagnostics: vec![diagnostic],
        }
    }

    /// Both this matcher and `other` must hold.
    ///
    /// `other`'s selector is prepended to this one. Adjacent compound
    /// selectors only express a conjunction when both target the same node,
    /// so this is a loose AND.
    #[must_use]
    pub fn and(self, other: Matcher) -> Self {
        self.combine("and", other, |current, operand| format!("{operand}{current}"))
    }

    /// Match only inside an element matched by `parent`
    #[must_use]
    pub fn with_ancestor(self, parent: Matcher) -> Self {
        self.combine("withAncestor", parent, |current, operand| {
            format!("{operand} {current}")
        })
    }

    /// Match elements that contain an element matched by `child`
    #[must_use]
    pub fn with_descendant(self, child: Matcher) -> Self {
        self.combine("withDescendant", child, |current, operand| {
            format!("{current} {operand}")
        })
    }

    fn combine(
        mut self,
        operation: &str,
        other: Matcher,
        splice: impl FnOnce(&str, &str) -> String,
    ) -> Self {
        let Matcher {
            selector: operand,
            path_query: operand_query,
            diagnostics: operand_diagnostics,
        } = other;
        self.diagnostics.extend(operand_diagnostics);

        if self.path_query.is_some() {
            self.diagnostics.push(Diagnostic::matcher_conflict(
                operation,
                format!("cannot refine a text matcher with {operand:?}; combinator ignored"),
            ));
            return self;
        }
        if let Some(query) = operand_query {
            self.diagnostics.push(Diagnostic::matcher_conflict(
                operation,
                format!("text matcher operand {query:?} ignored"),
            ));
            return self;
        }
        if self.selector.is_empty() || operand.is_empty() {
            // Inert on either side: nothing meaningful to splice.
            return self;
        }

        self.selector = splice(&self.selector, &operand);
        self
    }

    /// Current descriptor. Calling it repeatedly without further combinators
    /// returns equal descriptors.
    #[must_use]
    pub fn get(&self) -> LocatorDescriptor {
        LocatorDescriptor {
            selector: self.selector.clone(),
            path_query: self.path_query.clone(),
        }
    }

    /// Diagnostics raised while building this matcher
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Whether this matcher resolves through a path query
    #[must_use]
    pub const fn is_text_based(&self) -> bool {
        self.path_query.is_some()
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.get().fmt(f)
    }
}

impl MatcherFacade for Matcher {
    fn and(self, other: Self) -> Self {
        Matcher::and(self, other)
    }

    fn with_ancestor(self, parent: Self) -> Self {
        Matcher::with_ancestor(self, parent)
    }

    fn with_descendant(self, child: Self) -> Self {
        Matcher::with_descendant(self, child)
    }

    fn get(&self) -> LocatorDescriptor {
        Matcher::get(self)
    }
}

/// Matcher factory for the web platform
#[derive(Debug, Clone, Copy, Default)]
pub struct WebBy;

impl ByFacade for WebBy {
    type Matcher = Matcher;

    fn id(&self, id: &str) -> Matcher {
        Matcher::from_selector(attribute_selector(TEST_ID_ATTRIBUTE, id, '\''))
    }

    fn text(&self, text: &str) -> Matcher {
        Matcher::from_path_query(format!("//*[text() = {}]", xpath_literal(text)))
    }

    fn label(&self, label: &str) -> Matcher {
        Matcher::from_selector(attribute_selector(LABEL_ATTRIBUTE, label, '"'))
    }

    fn r#type(&self, native_view_type: &str) -> Matcher {
        Matcher::inert(Diagnostic::unsupported(format!("type({native_view_type})")))
    }

    fn traits(&self, traits: &[&str]) -> Matcher {
        let Some(first) = traits.first() else {
            return Matcher::inert(Diagnostic::unsupported("traits([])"));
        };
        let mut matcher = Matcher::from_selector(attribute_selector(ROLE_ATTRIBUTE, first, '"'));
        if traits.len() > 1 {
            matcher.diagnostics.push(Diagnostic::degraded(
                format!("traits([{}])", traits.join(", ")),
                format!("only the first trait ({first}) is matched"),
            ));
        }
        matcher
    }
}

/// Free-function form of [`WebBy`], mirroring `by.id(...)`.
pub mod by {
    use super::{Matcher, WebBy};
    use crate::facade::ByFacade;

    /// Element whose `data-testid` equals `id`
    #[must_use]
    pub fn id(id: &str) -> Matcher {
        WebBy.id(id)
    }

    /// Element whose own text is exactly `text`
    #[must_use]
    pub fn text(text: &str) -> Matcher {
        WebBy.text(text)
    }

    /// Element whose `aria-label` equals `label`
    #[must_use]
    pub fn label(label: &str) -> Matcher {
        WebBy.label(label)
    }

    /// Native view type; unsupported on web, yields an inert matcher
    #[must_use]
    pub fn r#type(native_view_type: &str) -> Matcher {
        WebBy.r#type(native_view_type)
    }

    /// Accessibility traits; only the first is matched
    #[must_use]
    pub fn traits(traits: &[&str]) -> Matcher {
        WebBy.traits(traits)
    }
}

/// `[name='value']` with the value escaped for the chosen quote. Control
/// characters become hex escapes, as `CSS.escape` writes them.
fn attribute_selector(name: &str, value: &str, quote: char) -> String {
    let mut out = String::with_capacity(name.len() + value.len() + 4);
    out.push('[');
    out.push_str(name);
    out.push('=');
    out.push(quote);
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            c if c.is_ascii_control() => {
                out.push_str(&format!("\\{:x} ", u32::from(c)));
            }
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out.push(']');
    out
}

/// XPath string literal for arbitrary text. XPath 1.0 has no escapes, so text
/// containing both quote kinds is built with `concat()`.
fn xpath_literal(text: &str) -> String {
    if !text.contains('"') {
        return format!("\"{text}\"");
    }
    if !text.contains('\'') {
        return format!("'{text}'");
    }
    let parts: Vec<String> = text.split('"').map(|part| format!("\"{part}\"")).collect();
    format!("concat({})", parts.join(", '\"', "))
}
