//! Property-based tests for matcher resolution.
//!
//! Arbitrary ids and texts, including quotes, backslashes and control
//! characters, must survive selector/XPath quoting and resolve exactly the
//! node that carries them.

use detox_web::prelude::*;
use detox_web::{MockDriver, MockNode};
use proptest::prelude::*;
use std::time::Duration;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

fn config() -> DetoxConfig {
    DetoxConfig::default().with_resolve_timeout(Duration::ZERO)
}

proptest! {
    /// `id(v)` resolves the node whose test id is exactly `v`.
    #[test]
    fn prop_id_resolves_exact_test_id(
        id in "[a-zA-Z0-9 _'\"\\\\\n\r\t\x0c\x7f-]{1,16}",
        suffix in "[a-z]{1,3}"
    ) {
        let decoy = format!("{id}{suffix}");
        let driver = MockDriver::new()
            .with_node(MockNode::new("div").test_id(decoy.clone()))
            .with_node(MockNode::new("div").test_id(id.clone()));
        let session = DetoxSession::new(driver, config());

        let el = block_on(session.element(&by::id(&id))).unwrap();
        prop_assert_eq!(&el.handle().id, &session.driver().node_id(1));
    }

    /// `text(t)` never matches a node whose text merely starts with `t`.
    #[test]
    fn prop_text_is_exact_not_prefix(
        text in "[a-zA-Z0-9 '\"!?]{1,16}",
        extra in "[a-z!]{1,3}"
    ) {
        let driver = MockDriver::new().with_node(MockNode::new("p").text(format!("{text}{extra}")));
        let session = DetoxSession::new(driver, config());
        let result = block_on(session.element(&by::text(&text)));
        prop_assert!(
            matches!(result, Err(DetoxError::ElementNotFound { .. })),
            "expected ElementNotFound, got {:?}",
            result
        );

        session.driver().add_node(MockNode::new("span").text(text.clone()));
        let el = block_on(session.element(&by::text(&text))).unwrap();
        prop_assert_eq!(&el.handle().id, &session.driver().node_id(1));
    }

    /// A label scoped by an ancestor only matches inside that ancestor.
    #[test]
    fn prop_with_ancestor_scopes(label in "[a-zA-Z ]{1,10}") {
        let driver = MockDriver::new()
            .with_node(MockNode::new("li").label(label.clone()))
            .with_node(MockNode::new("ul").test_id("list"))
            .with_node(MockNode::new("li").label(label.clone()).child_of(1));
        let session = DetoxSession::new(driver, config());

        let scoped = by::label(&label).with_ancestor(by::id("list"));
        let el = block_on(session.element(&scoped)).unwrap();
        prop_assert_eq!(&el.handle().id, &session.driver().node_id(2));
    }
}
