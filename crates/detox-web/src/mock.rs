//! In-memory page for tests.
//!
//! Holds a flat list of nodes with parent links and evaluates the selector
//! subset the matcher builder emits: attribute-equality compounds
//! (`[a='x'][b="y"]`) joined by descendant combinators, and the exact-text
//! path query `//*[text() = "..."]`. Anything else is rejected as an invalid
//! selector, the way a browser would reject malformed input.
//!
//! Every dispatched action is recorded as a [`DriverEvent`].

use crate::driver::{
    BoundingBox, ClickOptions, ComputedStyle, ElementHandle, GeolocationPosition, Key, PageDriver,
};
use crate::launch::Permission;
use crate::result::{DetoxError, DetoxResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// PNG file signature, returned as the default screenshot
const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// A node in the mock document
#[derive(Debug, Clone, PartialEq)]
pub struct MockNode {
    /// Tag name
    pub tag: String,
    /// Attributes
    pub attributes: BTreeMap<String, String>,
    /// Own text content
    pub text: Option<String>,
    /// Parent node index
    pub parent: Option<usize>,
    /// Computed style
    pub style: ComputedStyle,
    /// Layout box, `None` when not rendered
    pub bounding_box: Option<BoundingBox>,
    /// Number of queries that miss the node before it appears
    pub appears_after: u32,
    /// Removed from the document
    pub detached: bool,
}

impl MockNode {
    /// Rendered, visible node with no attributes
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            text: None,
            parent: None,
            style: ComputedStyle::default(),
            bounding_box: Some(BoundingBox::new(0.0, 0.0, 100.0, 40.0)),
            appears_after: 0,
            detached: false,
        }
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set `data-testid`
    #[must_use]
    pub fn test_id(self, id: impl Into<String>) -> Self {
        self.attr(crate::matcher::TEST_ID_ATTRIBUTE, id)
    }

    /// Set `aria-label`
    #[must_use]
    pub fn label(self, label: impl Into<String>) -> Self {
        self.attr(crate::matcher::LABEL_ATTRIBUTE, label)
    }

    /// Set own text
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Nest under the node at `parent`
    #[must_use]
    pub const fn child_of(mut self, parent: usize) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Override the computed style
    #[must_use]
    pub fn style(mut self, style: ComputedStyle) -> Self {
        self.style = style;
        self
    }

    /// Override the layout box
    #[must_use]
    pub const fn bounding_box(mut self, bbox: BoundingBox) -> Self {
        self.bounding_box = Some(bbox);
        self
    }

    /// No layout box (e.g. inside a `display: none` subtree)
    #[must_use]
    pub const fn not_rendered(mut self) -> Self {
        self.bounding_box = None;
        self
    }

    /// Miss the first `polls` queries
    #[must_use]
    pub const fn appears_after(mut self, polls: u32) -> Self {
        self.appears_after = polls;
        self
    }

    fn matches(&self, compound: &[(String, String)]) -> bool {
        compound
            .iter()
            .all(|(name, value)| self.attributes.get(name) == Some(value))
    }
}

/// A primitive dispatched to the mock page
#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
    /// Navigation
    Goto(String),
    /// Reload
    Reload,
    /// History back
    GoBack,
    /// Init script registered
    InitScript(String),
    /// Click on a node
    Click {
        /// Node id
        node: String,
        /// Click count
        click_count: u32,
        /// Press duration
        delay: Duration,
    },
    /// Click at coordinates
    MouseClick {
        /// X
        x: f64,
        /// Y
        y: f64,
    },
    /// Page-level character input
    SendCharacter(char),
    /// Character typed into a node
    TypeCharacter {
        /// Node id
        node: String,
        /// Character
        ch: char,
    },
    /// Key press
    KeyPress(Key),
    /// Function called on a node
    CallOn {
        /// Node id
        node: String,
        /// Function source
        function: String,
    },
    /// Screenshot captured
    Screenshot,
    /// Geolocation override
    Geolocation(GeolocationPosition),
    /// Permissions granted
    GrantPermissions {
        /// Origin
        origin: String,
        /// Granted permissions
        permissions: Vec<Permission>,
    },
}

#[derive(Debug, Default)]
struct MockState {
    nodes: Vec<MockNode>,
    events: Vec<DriverEvent>,
    queries: u32,
    history: Vec<String>,
    screenshot: Option<Vec<u8>>,
    fail_screenshots: bool,
}

/// In-memory [`PageDriver`]
#[derive(Debug, Default)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    /// Empty document
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Add a node (builder form)
    #[must_use]
    pub fn with_node(self, node: MockNode) -> Self {
        self.add_node(node);
        self
    }

    /// Add a node, returning its index
    pub fn add_node(&self, node: MockNode) -> usize {
        let mut state = self.lock();
        state.nodes.push(node);
        state.nodes.len() - 1
    }

    /// Remove a node from the document
    pub fn detach(&self, index: usize) {
        if let Some(node) = self.lock().nodes.get_mut(index) {
            node.detached = true;
        }
    }

    /// Change a node's computed style
    pub fn set_style(&self, index: usize, style: ComputedStyle) {
        if let Some(node) = self.lock().nodes.get_mut(index) {
            node.style = style;
        }
    }

    /// Handle id of the node at `index`
    #[must_use]
    pub fn node_id(&self, index: usize) -> String {
        format!("node-{index}")
    }

    /// Every event dispatched so far
    #[must_use]
    pub fn events(&self) -> Vec<DriverEvent> {
        self.lock().events.clone()
    }

    /// Clicks dispatched to the node at `index`
    #[must_use]
    pub fn clicks_on(&self, index: usize) -> usize {
        let id = self.node_id(index);
        self.lock()
            .events
            .iter()
            .filter(|e| matches!(e, DriverEvent::Click { node, .. } if *node == id))
            .count()
    }

    /// Number of selector and path queries evaluated
    #[must_use]
    pub fn query_count(&self) -> u32 {
        self.lock().queries
    }

    /// Bytes returned by `screenshot`
    pub fn set_screenshot(&self, bytes: Vec<u8>) {
        self.lock().screenshot = Some(bytes);
    }

    /// Make every screenshot fail
    pub fn fail_screenshots(&self) {
        self.lock().fail_screenshots = true;
    }

    /// Last navigated URL
    #[must_use]
    pub fn current_url(&self) -> Option<String> {
        self.lock().history.last().cloned()
    }

    fn record(&self, event: DriverEvent) {
        self.lock().events.push(event);
    }

    fn node_index(state: &MockState, element: &ElementHandle) -> DetoxResult<usize> {
        element
            .id
            .strip_prefix("node-")
            .and_then(|i| i.parse::<usize>().ok())
            .filter(|&i| state.nodes.get(i).is_some_and(|n| !n.detached))
            .ok_or_else(|| DetoxError::PageError {
                message: format!("node {} is detached from the document", element.id),
            })
    }

    fn find(
        &self,
        locator: &str,
        predicate: impl Fn(&MockState, usize) -> bool,
    ) -> Option<ElementHandle> {
        let mut state = self.lock();
        let polls = state.queries;
        state.queries += 1;
        (0..state.nodes.len())
            .find(|&i| {
                let node = &state.nodes[i];
                !node.detached && polls >= node.appears_after && predicate(&*state, i)
            })
            .map(|i| ElementHandle::new(self.node_id(i), locator))
    }
}

fn matches_selector(state: &MockState, index: usize, compounds: &[Vec<(String, String)>]) -> bool {
    let Some((last, ancestors)) = compounds.split_last() else {
        return false;
    };
    let Some(target) = state.nodes.get(index) else {
        return false;
    };
    if !target.matches(last) {
        return false;
    }
    // Dangling parents end the chain; the budget cuts off cycles.
    let mut cursor = target.parent;
    let mut budget = state.nodes.len();
    for compound in ancestors.iter().rev() {
        loop {
            let Some(node) = cursor.and_then(|i| state.nodes.get(i)) else {
                return false;
            };
            if budget == 0 {
                return false;
            }
            budget -= 1;
            cursor = node.parent;
            if !node.detached && node.matches(compound) {
                break;
            }
        }
    }
    true
}

fn invalid(selector: &str, message: &str) -> DetoxError {
    DetoxError::InvalidSelector {
        selector: selector.to_string(),
        message: message.to_string(),
    }
}

/// Parse `[a='x'][b="y"] [c='z']` into descendant-ordered compounds
fn parse_selector(selector: &str) -> DetoxResult<Vec<Vec<(String, String)>>> {
    let mut compounds: Vec<Vec<(String, String)>> = Vec::new();
    let mut chars = selector.chars().peekable();
    let mut current: Vec<(String, String)> = Vec::new();

    loop {
        match chars.peek() {
            None => break,
            Some(c) if c.is_whitespace() => {
                chars.next();
                if !current.is_empty() {
                    compounds.push(std::mem::take(&mut current));
                }
            }
            Some('[') => {
                chars.next();
                let name: String = chars.by_ref().take_while(|&c| c != '=').collect();
                if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '-') {
                    return Err(invalid(selector, "expected attribute name"));
                }
                let quote = match chars.next() {
                    Some(q @ ('\'' | '"')) => q,
                    _ => return Err(invalid(selector, "expected quoted value")),
                };
                let value = parse_quoted(&mut chars, quote)
                    .ok_or_else(|| invalid(selector, "unterminated value"))?;
                if chars.next() != Some(']') {
                    return Err(invalid(selector, "expected ']'"));
                }
                current.push((name, value));
            }
            Some(_) => return Err(invalid(selector, "unsupported selector syntax")),
        }
    }
    if !current.is_empty() {
        compounds.push(current);
    }
    if compounds.is_empty() {
        return Err(invalid(selector, "empty selector"));
    }
    Ok(compounds)
}

/// Read a CSS string body up to `quote`, resolving backslash escapes
fn parse_quoted(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    quote: char,
) -> Option<String> {
    let mut value = String::new();
    loop {
        match chars.next()? {
            c if c == quote => return Some(value),
            // A raw line break cannot appear inside a CSS string
            '\n' | '\r' | '\u{c}' => return None,
            '\\' => {
                let mut hex = String::new();
                while hex.len() < 6 && chars.peek().is_some_and(char::is_ascii_hexdigit) {
                    hex.extend(chars.next());
                }
                if hex.is_empty() {
                    value.push(chars.next()?);
                } else {
                    let code = u32::from_str_radix(&hex, 16).ok()?;
                    value.push(match char::from_u32(code) {
                        Some('\0') | None => char::REPLACEMENT_CHARACTER,
                        Some(c) => c,
                    });
                    if chars.peek() == Some(&' ') {
                        chars.next();
                    }
                }
            }
            c => value.push(c),
        }
    }
}

/// Parse `//*[text() = LIT]` into the text it matches
fn parse_text_query(xpath: &str) -> DetoxResult<String> {
    let literal = xpath
        .strip_prefix("//*[text() = ")
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| invalid(xpath, "unsupported path query"))?;
    parse_xpath_literal(literal).ok_or_else(|| invalid(xpath, "malformed string literal"))
}

fn parse_xpath_literal(literal: &str) -> Option<String> {
    if let Some(args) = literal
        .strip_prefix("concat(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let mut out = String::new();
        let mut rest = args.trim_start();
        while !rest.is_empty() {
            let quote = rest.chars().next()?;
            if quote != '"' && quote != '\'' {
                return None;
            }
            let end = rest[1..].find(quote)? + 1;
            out.push_str(&rest[1..end]);
            rest = rest[end + 1..].trim_start();
            if let Some(next) = rest.strip_prefix(',') {
                rest = next.trim_start();
            } else if !rest.is_empty() {
                return None;
            }
        }
        return Some(out);
    }
    let quote = literal.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let body = literal[1..].strip_suffix(quote)?;
    (!body.contains(quote)).then(|| body.to_string())
}

#[async_trait]
impl PageDriver for MockDriver {
    fn name(&self) -> &str {
        "mock"
    }

    async fn goto(&self, url: &str) -> DetoxResult<()> {
        let mut state = self.lock();
        state.history.push(url.to_string());
        state.events.push(DriverEvent::Goto(url.to_string()));
        Ok(())
    }

    async fn reload(&self) -> DetoxResult<()> {
        self.record(DriverEvent::Reload);
        Ok(())
    }

    async fn go_back(&self) -> DetoxResult<()> {
        let mut state = self.lock();
        if state.history.len() > 1 {
            state.history.pop();
        }
        state.events.push(DriverEvent::GoBack);
        Ok(())
    }

    async fn add_init_script(&self, script: &str) -> DetoxResult<()> {
        self.record(DriverEvent::InitScript(script.to_string()));
        Ok(())
    }

    async fn query_selector(&self, selector: &str) -> DetoxResult<Option<ElementHandle>> {
        let compounds = match parse_selector(selector) {
            Ok(compounds) => compounds,
            Err(e) => {
                self.lock().queries += 1;
                return Err(e);
            }
        };
        Ok(self.find(&format!("css={selector}"), |state, i| {
            matches_selector(state, i, &compounds)
        }))
    }

    async fn query_xpath(&self, xpath: &str) -> DetoxResult<Option<ElementHandle>> {
        let text = match parse_text_query(xpath) {
            Ok(text) => text,
            Err(e) => {
                self.lock().queries += 1;
                return Err(e);
            }
        };
        Ok(self.find(&format!("xpath={xpath}"), |state, i| {
            state.nodes[i].text.as_deref() == Some(text.as_str())
        }))
    }

    async fn click(&self, element: &ElementHandle, options: ClickOptions) -> DetoxResult<()> {
        let mut state = self.lock();
        Self::node_index(&state, element)?;
        state.events.push(DriverEvent::Click {
            node: element.id.clone(),
            click_count: options.click_count,
            delay: options.delay,
        });
        Ok(())
    }

    async fn mouse_click(&self, x: f64, y: f64) -> DetoxResult<()> {
        self.record(DriverEvent::MouseClick { x, y });
        Ok(())
    }

    async fn send_character(&self, ch: char) -> DetoxResult<()> {
        self.record(DriverEvent::SendCharacter(ch));
        Ok(())
    }

    async fn type_character(&self, element: &ElementHandle, ch: char) -> DetoxResult<()> {
        let mut state = self.lock();
        Self::node_index(&state, element)?;
        state.events.push(DriverEvent::TypeCharacter {
            node: element.id.clone(),
            ch,
        });
        Ok(())
    }

    async fn press_key(&self, key: Key) -> DetoxResult<()> {
        self.record(DriverEvent::KeyPress(key));
        Ok(())
    }

    async fn call_on(
        &self,
        element: &ElementHandle,
        function: &str,
    ) -> DetoxResult<serde_json::Value> {
        let mut state = self.lock();
        Self::node_index(&state, element)?;
        state.events.push(DriverEvent::CallOn {
            node: element.id.clone(),
            function: function.to_string(),
        });
        Ok(serde_json::Value::Null)
    }

    async fn bounding_box(&self, element: &ElementHandle) -> DetoxResult<Option<BoundingBox>> {
        let state = self.lock();
        let index = Self::node_index(&state, element)?;
        Ok(state.nodes[index].bounding_box)
    }

    async fn computed_style(&self, element: &ElementHandle) -> DetoxResult<ComputedStyle> {
        let state = self.lock();
        let index = Self::node_index(&state, element)?;
        Ok(state.nodes[index].style.clone())
    }

    async fn screenshot(&self) -> DetoxResult<Vec<u8>> {
        let mut state = self.lock();
        if state.fail_screenshots {
            return Err(DetoxError::ScreenshotError {
                message: "mock screenshot failure".to_string(),
            });
        }
        state.events.push(DriverEvent::Screenshot);
        Ok(state
            .screenshot
            .clone()
            .unwrap_or_else(|| PNG_SIGNATURE.to_vec()))
    }

    async fn set_geolocation(&self, position: GeolocationPosition) -> DetoxResult<()> {
        self.record(DriverEvent::Geolocation(position));
        Ok(())
    }

    async fn grant_permissions(
        &self,
        origin: &str,
        permissions: &[Permission],
    ) -> DetoxResult<()> {
        self.record(DriverEvent::GrantPermissions {
            origin: origin.to_string(),
            permissions: permissions.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::by;

    mod selector_tests {
        use super::*;

        #[test]
        fn test_parses_compound_and_descendant() {
            let parsed = parse_selector(r#"[data-testid='row'] [aria-label="Delete"][aria-role="button"]"#)
                .unwrap();
            assert_eq!(parsed.len(), 2);
            assert_eq!(parsed[0], vec![("data-testid".to_string(), "row".to_string())]);
            assert_eq!(parsed[1].len(), 2);
        }

        #[test]
        fn test_resolves_escapes() {
            let parsed = parse_selector(r"[aria-label='it\'s \\ a\a line']").unwrap();
            assert_eq!(parsed[0][0].1, "it's \\ a\nline");
        }

        #[test]
        fn test_rejects_other_syntax() {
            assert!(parse_selector("div > span").is_err());
            assert!(parse_selector("").is_err());
            assert!(parse_selector("[x='unterminated]").is_err());
            assert!(parse_selector("[x='line\nbreak']").is_err());
            assert!(parse_selector("[x='carriage\rreturn']").is_err());
            assert!(parse_selector("[x='form\u{c}feed']").is_err());
        }

        #[test]
        fn test_null_escape_becomes_replacement_character() {
            let parsed = parse_selector(r"[x='a\0 b']").unwrap();
            assert_eq!(parsed[0][0].1, "a\u{fffd}b");
        }

        #[tokio::test]
        async fn test_control_characters_in_ids_resolve() {
            for id in ["a\rb", "a\u{c}b", "a\tb", "a\u{7f}b", "line\nbreak"] {
                let driver = MockDriver::new()
                    .with_node(MockNode::new("div").test_id("decoy"))
                    .with_node(MockNode::new("div").test_id(id));
                let selector = by::id(id).get().selector;
                let handle = driver.query_selector(&selector).await.unwrap().unwrap();
                assert_eq!(handle.id, driver.node_id(1), "{id:?}");
            }
        }

        #[tokio::test]
        async fn test_descendant_requires_ancestor() {
            let driver = MockDriver::new()
                .with_node(MockNode::new("ul").test_id("list"))
                .with_node(MockNode::new("li").label("Item").child_of(0))
                .with_node(MockNode::new("li").label("Item"));
            let inside = by::label("Item").with_ancestor(by::id("list")).get();
            let handle = driver.query_selector(&inside.selector).await.unwrap().unwrap();
            assert_eq!(handle.id, driver.node_id(1));

            let outside = by::label("Item").with_ancestor(by::id("other")).get();
            assert!(driver.query_selector(&outside.selector).await.unwrap().is_none());
        }

        #[tokio::test]
        async fn test_dangling_or_cyclic_parent_does_not_match() {
            let driver = MockDriver::new()
                .with_node(MockNode::new("li").label("Item").child_of(99))
                .with_node(MockNode::new("li").label("Loop").child_of(1));
            let dangling = by::label("Item").with_ancestor(by::id("list")).get();
            assert!(driver.query_selector(&dangling.selector).await.unwrap().is_none());
            let cyclic = by::label("Loop").with_ancestor(by::id("list")).get();
            assert!(driver.query_selector(&cyclic.selector).await.unwrap().is_none());

            let plain = driver.query_selector("[aria-label='Item']").await.unwrap();
            assert_eq!(plain.unwrap().id, driver.node_id(0));
        }

        #[tokio::test]
        async fn test_matcher_output_round_trips_through_parser() {
            let tricky = "say \"hi\" it's\nnew";
            let driver = MockDriver::new().with_node(MockNode::new("b").label(tricky).test_id(tricky));
            for descriptor in [by::label(tricky).get(), by::id(tricky).get()] {
                assert!(driver.query_selector(&descriptor.selector).await.unwrap().is_some());
            }
        }
    }

    mod xpath_tests {
        use super::*;

        #[test]
        fn test_literal_forms() {
            assert_eq!(parse_xpath_literal(r#""plain""#).unwrap(), "plain");
            assert_eq!(parse_xpath_literal(r#"'say "hi"'"#).unwrap(), r#"say "hi""#);
            assert_eq!(
                parse_xpath_literal(r#"concat("it's ", '"', "x", '"')"#).unwrap(),
                r#"it's "x""#
            );
        }

        #[tokio::test]
        async fn test_text_match_is_exact() {
            let text = r#"it's "quoted""#;
            let driver = MockDriver::new().with_node(MockNode::new("p").text(text));
            let query = by::text(text).get().path_query.unwrap();
            assert!(driver.query_xpath(&query).await.unwrap().is_some());
            let prefix = by::text("it's").get().path_query.unwrap();
            assert!(driver.query_xpath(&prefix).await.unwrap().is_none());
        }
    }

    mod state_tests {
        use super::*;

        #[tokio::test]
        async fn test_detached_node_rejects_actions() {
            let driver = MockDriver::new().with_node(MockNode::new("a").test_id("x"));
            let handle = driver.query_selector("[data-testid='x']").await.unwrap().unwrap();
            driver.detach(0);
            let err = driver.click(&handle, ClickOptions::default()).await.unwrap_err();
            assert!(matches!(err, DetoxError::PageError { .. }));
            assert!(driver.query_selector("[data-testid='x']").await.unwrap().is_none());
        }

        #[tokio::test]
        async fn test_history() {
            let driver = MockDriver::new();
            driver.goto("http://a").await.unwrap();
            driver.goto("http://b").await.unwrap();
            driver.go_back().await.unwrap();
            assert_eq!(driver.current_url().as_deref(), Some("http://a"));
        }

        #[tokio::test]
        async fn test_screenshot_failure() {
            let driver = MockDriver::new();
            assert!(driver.screenshot().await.unwrap().starts_with(b"\x89PNG"));
            driver.fail_screenshots();
            assert!(driver.screenshot().await.is_err());
        }
    }
}
