// End-to-end tests for the completion dropdown

use crate::common::fake_backend::FakeBackend;
use crate::common::harness::SurfaceHarness;
use crossterm::event::{KeyCode, KeyModifiers};
use livepad::config::EditorOptions;
use livepad::input::{DropdownState, InputResult};
use livepad::services::analysis::CompletionSuggestion;

const SOURCE: &str = "const foo = { bar: 1 };\n";

/// Harness with the caret at the end of `text`
fn harness_at_end(text: &str) -> SurfaceHarness {
    let mut harness = SurfaceHarness::new(text);
    let len = text.chars().count();
    harness.surface_mut().set_cursor(len);
    harness
}

fn suggestion_names(harness: &SurfaceHarness) -> Vec<String> {
    match harness.surface().dropdown() {
        DropdownState::Open { suggestions, .. } => suggestions.iter().map(|s| s.name.clone()).collect(),
        DropdownState::Closed => Vec::new(),
    }
}

fn highlighted(harness: &SurfaceHarness) -> Option<usize> {
    match harness.surface().dropdown() {
        DropdownState::Open { highlighted, .. } => Some(*highlighted),
        DropdownState::Closed => None,
    }
}

#[tokio::test]
async fn test_dot_opens_member_list() {
    let mut harness = harness_at_end(SOURCE);
    harness.type_text("foo.");
    harness.settle().await;

    assert_eq!(
        harness.surface().dropdown(),
        &DropdownState::Open {
            suggestions: vec![
                CompletionSuggestion::new("bar", "property"),
                CompletionSuggestion::new("baz", "method"),
            ],
            highlighted: 0,
        }
    );

    // Listed just below the caret line
    let rows = harness.screen_rows();
    assert_eq!(rows[1], "foo.");
    assert!(rows[2].contains("bar  property"));
    assert!(rows[3].contains("baz    method"));
}

#[tokio::test]
async fn test_arrow_keys_wrap() {
    let mut harness = harness_at_end(SOURCE);
    harness.type_text("foo.");
    harness.settle().await;

    assert_eq!(harness.send_key(KeyCode::Up, KeyModifiers::NONE), InputResult::Consumed);
    assert_eq!(highlighted(&harness), Some(1));
    harness.send_key(KeyCode::Down, KeyModifiers::NONE);
    assert_eq!(highlighted(&harness), Some(0));
    harness.send_key(KeyCode::Down, KeyModifiers::NONE);
    assert_eq!(highlighted(&harness), Some(1));

    // Navigation leaves the text alone
    assert_eq!(harness.surface().text(), format!("{}foo.", SOURCE));
}

#[tokio::test]
async fn test_enter_commits_highlighted_suggestion() {
    let mut harness = harness_at_end(SOURCE);
    harness.type_text("foo.b");
    harness.settle().await;
    assert_eq!(suggestion_names(&harness), ["bar", "baz"]);

    harness.send_key(KeyCode::Down, KeyModifiers::NONE);
    harness.send_key(KeyCode::Enter, KeyModifiers::NONE);

    let expected = format!("{}foo.baz", SOURCE);
    assert_eq!(harness.surface().text(), expected);
    assert_eq!(harness.surface().cursor(), expected.chars().count());
    assert_eq!(harness.surface().dropdown(), &DropdownState::Closed);
}

#[tokio::test]
async fn test_pointer_selection_commits() {
    let mut harness = harness_at_end(SOURCE);
    harness.type_text("foo.");
    harness.settle().await;

    harness.surface_mut().select_suggestion(0);
    assert_eq!(harness.surface().text(), format!("{}foo.bar", SOURCE));
    assert_eq!(harness.surface().dropdown(), &DropdownState::Closed);
}

#[tokio::test]
async fn test_explicit_trigger_requests_identifiers() {
    let mut harness = harness_at_end("const foo = 1;\nfo");
    assert_eq!(
        harness.send_key(KeyCode::Char(' '), KeyModifiers::CONTROL),
        InputResult::Consumed
    );
    harness.settle().await;
    assert_eq!(suggestion_names(&harness), ["foo"]);

    harness.send_key(KeyCode::Enter, KeyModifiers::NONE);
    assert_eq!(harness.surface().text(), "const foo = 1;\nfoo");
}

#[tokio::test]
async fn test_explicit_trigger_after_whitespace_stays_closed() {
    let mut harness = harness_at_end("foo ");
    assert_eq!(
        harness.send_key(KeyCode::Char(' '), KeyModifiers::CONTROL),
        InputResult::Consumed
    );
    harness.settle().await;

    assert_eq!(harness.backend().completion_calls(), 0);
    assert_eq!(harness.surface().dropdown(), &DropdownState::Closed);
    assert_eq!(harness.surface().text(), "foo ");
}

#[tokio::test]
async fn test_explicit_trigger_after_dot_lists_members() {
    let mut harness = harness_at_end(&format!("{}foo.", SOURCE));
    harness.send_key(KeyCode::Char(' '), KeyModifiers::CONTROL);
    harness.settle().await;
    assert_eq!(suggestion_names(&harness), ["bar", "baz"]);
}

#[tokio::test]
async fn test_backspace_requests_again() {
    let mut harness = harness_at_end(&format!("{}foo.bx", SOURCE));
    harness.send_key(KeyCode::Backspace, KeyModifiers::NONE);
    harness.settle().await;
    assert_eq!(suggestion_names(&harness), ["bar", "baz"]);
}

#[tokio::test]
async fn test_escape_closes() {
    let mut harness = harness_at_end(SOURCE);
    harness.type_text("foo.");
    harness.settle().await;

    assert_eq!(harness.send_key(KeyCode::Esc, KeyModifiers::NONE), InputResult::Consumed);
    assert_eq!(harness.surface().dropdown(), &DropdownState::Closed);
    assert_eq!(harness.send_key(KeyCode::Esc, KeyModifiers::NONE), InputResult::Ignored);

    // Enter is a newline again
    harness.send_key(KeyCode::Enter, KeyModifiers::NONE);
    assert_eq!(harness.surface().text(), format!("{}foo.\n", SOURCE));
}

#[tokio::test]
async fn test_non_identifier_key_closes() {
    let mut harness = harness_at_end(SOURCE);
    harness.type_text("foo.");
    harness.settle().await;

    harness.type_text(" ");
    harness.settle().await;
    assert_eq!(harness.surface().dropdown(), &DropdownState::Closed);
}

#[tokio::test]
async fn test_blur_closes() {
    let mut harness = harness_at_end(SOURCE);
    harness.type_text("foo.");
    harness.settle().await;

    harness.surface_mut().handle_blur();
    assert_eq!(harness.surface().dropdown(), &DropdownState::Closed);
    assert!(!harness.surface().is_focused());
    assert!(harness.surface().frame().dropdown.is_none());
}

#[tokio::test]
async fn test_result_after_caret_move_is_dropped() {
    let mut harness = harness_at_end(SOURCE);
    harness.type_text("foo.");
    harness.send_key(KeyCode::Left, KeyModifiers::NONE);
    harness.settle().await;

    assert!(harness.backend().completion_calls() > 0);
    assert_eq!(harness.surface().dropdown(), &DropdownState::Closed);
}

#[tokio::test]
async fn test_empty_answer_stays_closed() {
    let mut harness = harness_at_end(SOURCE);
    harness.type_text("foo.bar.");
    harness.settle().await;
    assert_eq!(harness.surface().dropdown(), &DropdownState::Closed);
}

#[tokio::test]
async fn test_failed_lookup_keeps_dropdown_closed() {
    let mut harness = SurfaceHarness::with_backend(
        FakeBackend::new().with_failing_lookups(),
        EditorOptions {
            default_value: Some(SOURCE.to_string()),
            filename: Some("index.ts".to_string()),
            ..Default::default()
        },
    );
    harness.surface_mut().set_cursor(SOURCE.len());
    harness.type_text("foo.");
    harness.settle().await;

    assert!(harness.backend().completion_calls() > 0);
    assert_eq!(harness.surface().dropdown(), &DropdownState::Closed);
    assert_eq!(harness.surface().text(), format!("{}foo.", SOURCE));
}

#[tokio::test]
async fn test_member_completion_scenario() {
    let mut harness = harness_at_end("const foo = { bar: 1 };\nfo");
    harness.type_text("o.");
    harness.settle().await;

    assert!(suggestion_names(&harness).contains(&"bar".to_string()));
    assert_eq!(highlighted(&harness), Some(0));
}
