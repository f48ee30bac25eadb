//! Convenience wrappers for the most common test steps.

use crate::diagnostic::Outcome;
use crate::driver::{PageDriver, Point};
use crate::facade::{DeviceFacade, ElementActions, ExpectFacade};
use crate::launch::{LaunchAppConfig, Permissions};
use crate::matcher::{by, Matcher};
use crate::result::DetoxResult;
use crate::session::DetoxSession;
use std::time::Duration;

/// Replace the text of the element with test id `id`, optionally pressing
/// return afterwards.
pub async fn replace_text_by_id<D: PageDriver>(
    session: &DetoxSession<D>,
    id: &str,
    text: &str,
    press_return: bool,
) -> DetoxResult<Outcome<()>> {
    let el = session.element(&by::id(id)).await?;
    let mut outcome = el.replace_text(text).await?;
    if press_return {
        outcome.absorb(el.tap_return_key().await?);
    }
    Ok(outcome)
}

async fn is_visible<D: PageDriver>(session: &DetoxSession<D>, matcher: &Matcher) -> DetoxResult<bool> {
    let el = session.element(matcher).await?;
    session.expect(&el).to_be_visible().await
}

/// Whether the element whose text is exactly `text` is visible
pub async fn is_visible_by_text<D: PageDriver>(
    session: &DetoxSession<D>,
    text: &str,
) -> DetoxResult<bool> {
    is_visible(session, &by::text(text)).await
}

/// Whether the element with test id `id` is visible
pub async fn is_visible_by_id<D: PageDriver>(
    session: &DetoxSession<D>,
    id: &str,
) -> DetoxResult<bool> {
    is_visible(session, &by::id(id)).await
}

/// Tap the element with test id `id`, at `point` (relative to its top-left
/// corner) when given.
pub async fn tap_by_id<D: PageDriver>(
    session: &DetoxSession<D>,
    id: &str,
    point: Option<Point>,
) -> DetoxResult<Outcome<()>> {
    let el = session.element(&by::id(id)).await?;
    match point {
        Some(point) => el.tap_at_point(point).await,
        None => el.tap().await,
    }
}

/// Tap the element whose text is exactly `text`
pub async fn tap_by_text<D: PageDriver>(
    session: &DetoxSession<D>,
    text: &str,
) -> DetoxResult<Outcome<()>> {
    session.element(&by::text(text)).await?.tap().await
}

/// Tap the element labelled `label`
pub async fn tap_by_label<D: PageDriver>(
    session: &DetoxSession<D>,
    label: &str,
) -> DetoxResult<Outcome<()>> {
    session.element(&by::label(label)).await?.tap().await
}

/// Relaunch with storage cleared and camera, microphone and notifications
/// granted
pub async fn reset<D: PageDriver>(session: &mut DetoxSession<D>) -> DetoxResult<Outcome<()>> {
    let config = LaunchAppConfig::new()
        .delete(true)
        .new_instance(true)
        .permissions(Permissions::default_grants());
    session.device_mut().launch_app(config).await
}

/// Suspend the test for `duration`
pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetoxConfig;
    use crate::driver::{BoundingBox, ComputedStyle, Key};
    use crate::launch::Permission;
    use crate::mock::{DriverEvent, MockDriver, MockNode};
    use crate::scripts;

    fn session() -> DetoxSession<MockDriver> {
        let driver = MockDriver::new()
            .with_node(
                MockNode::new("input")
                    .test_id("email")
                    .bounding_box(BoundingBox::new(10.0, 10.0, 200.0, 30.0)),
            )
            .with_node(MockNode::new("button").text("Sign in").label("sign-in"))
            .with_node(
                MockNode::new("div")
                    .test_id("banner")
                    .style(ComputedStyle::hidden_by_display()),
            );
        DetoxSession::new(driver, DetoxConfig::default())
    }

    mod text_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_replace_text_by_id_with_return() {
            let s = session();
            replace_text_by_id(&s, "email", "a@b", true).await.unwrap();
            let events = s.driver().events();
            assert_eq!(events.first().map(|e| matches!(e, DriverEvent::Click { click_count: 3, .. })), Some(true));
            assert_eq!(events.last(), Some(&DriverEvent::KeyPress(Key::Enter)));
            assert_eq!(events.len(), 1 + 3 + 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_replace_text_by_id_without_return() {
            let s = session();
            replace_text_by_id(&s, "email", "x", false).await.unwrap();
            assert!(!s.driver().events().contains(&DriverEvent::KeyPress(Key::Enter)));
        }
    }

    mod tap_tests {
        use super::*;

        #[tokio::test]
        async fn test_tap_by_id_with_point() {
            let s = session();
            tap_by_id(&s, "email", Some(Point::new(4.0, 6.0))).await.unwrap();
            assert_eq!(s.driver().events(), vec![DriverEvent::MouseClick { x: 14.0, y: 16.0 }]);
        }

        #[tokio::test]
        async fn test_tap_by_text_and_label_hit_same_node() {
            let s = session();
            tap_by_text(&s, "Sign in").await.unwrap();
            tap_by_label(&s, "sign-in").await.unwrap();
            assert_eq!(s.driver().clicks_on(1), 2);
        }
    }

    mod visibility_tests {
        use super::*;

        #[tokio::test]
        async fn test_visibility_helpers() {
            let s = session();
            assert!(is_visible_by_id(&s, "email").await.unwrap());
            assert!(is_visible_by_text(&s, "Sign in").await.unwrap());
            assert!(!is_visible_by_id(&s, "banner").await.unwrap());
        }

        #[tokio::test(start_paused = true)]
        async fn test_missing_element_propagates() {
            let s = session();
            let err = is_visible_by_id(&s, "ghost").await.unwrap_err();
            assert!(err.is_not_found());
        }
    }

    mod reset_tests {
        use super::*;

        #[tokio::test]
        async fn test_reset_relaunches_clean() {
            let mut s = session();
            reset(&mut s).await.unwrap();
            assert_eq!(
                s.driver().events(),
                vec![
                    DriverEvent::InitScript(scripts::CLEAR_LOCAL_STORAGE.to_string()),
                    DriverEvent::GrantPermissions {
                        origin: "http://localhost:3000".to_string(),
                        permissions: vec![
                            Permission::Camera,
                            Permission::Microphone,
                            Permission::Notifications
                        ],
                    },
                    DriverEvent::Goto("http://localhost:3000".to_string()),
                ]
            );
        }

        #[tokio::test(start_paused = true)]
        async fn test_sleep_advances_clock() {
            let start = tokio::time::Instant::now();
            sleep(Duration::from_millis(250)).await;
            assert_eq!(start.elapsed(), Duration::from_millis(250));
        }
    }
}
