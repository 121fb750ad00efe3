// End-to-end tests for hover tooltips

use crate::common::fake_backend::FakeBackend;
use crate::common::harness::SurfaceHarness;
use livepad::config::EditorOptions;
use livepad::model::token::lines_text;

const SOURCE: &str = "const foo = { bar: 1 };\nfoo.bar";

async fn settled(text: &str) -> SurfaceHarness {
    let mut harness = SurfaceHarness::new(text);
    harness.settle().await;
    harness
}

#[tokio::test]
async fn test_pointer_over_member_shows_quick_info() {
    let mut harness = settled(SOURCE).await;
    harness.surface_mut().handle_pointer_cell(5, 1);
    harness.settle().await;

    let hover = harness.surface().hover().expect("hover shown");
    assert_eq!(lines_text(&hover.info.content), "(property) bar: number");
    assert_eq!(hover.info.documentation, "The bar.");
    assert_eq!(hover.node, 28..31);
    assert_eq!(hover.info.anchor_offset, 28);
    assert_eq!(hover.anchor, (4.0, 1.0));
}

#[tokio::test]
async fn test_one_query_per_node() {
    let mut harness = settled(SOURCE).await;
    for column in [4, 5, 6] {
        harness.surface_mut().handle_pointer_cell(column, 1);
        harness.settle().await;
    }
    assert_eq!(harness.backend().quick_info_calls(), 1);

    // A different node asks again
    harness.surface_mut().handle_pointer_cell(1, 1);
    harness.settle().await;
    assert_eq!(harness.backend().quick_info_calls(), 2);
    let hover = harness.surface().hover().unwrap();
    assert_eq!(hover.node, 24..27);
    assert!(lines_text(&hover.info.content).starts_with("const foo"));
}

#[tokio::test]
async fn test_pointer_leave_clears() {
    let mut harness = settled(SOURCE).await;
    harness.surface_mut().handle_pointer_cell(5, 1);
    harness.settle().await;
    assert!(harness.surface().hover().is_some());

    harness.surface_mut().handle_pointer_leave();
    assert!(harness.surface().hover().is_none());
}

#[tokio::test]
async fn test_symbol_without_info_hides_tooltip() {
    let mut harness = settled("let zed = 1;\nzed").await;
    harness.surface_mut().handle_pointer_cell(1, 1);
    harness.settle().await;
    assert!(harness.surface().hover().is_none());
    assert_eq!(harness.backend().quick_info_calls(), 1);
}

#[tokio::test]
async fn test_leave_before_answer_drops_it() {
    let mut harness = settled(SOURCE).await;
    harness.surface_mut().handle_pointer_cell(5, 1);
    harness.surface_mut().handle_pointer_leave();
    harness.settle().await;
    assert!(harness.surface().hover().is_none());
}

#[tokio::test]
async fn test_edit_clears_hover() {
    let mut harness = settled(SOURCE).await;
    harness.surface_mut().handle_pointer_cell(5, 1);
    harness.settle().await;
    assert!(harness.surface().hover().is_some());

    harness.type_text(" ");
    assert!(harness.surface().hover().is_none());
}

#[tokio::test]
async fn test_tooltip_is_rendered() {
    let mut harness = settled(SOURCE).await;
    harness.surface_mut().handle_pointer_cell(5, 1);
    harness.settle().await;

    let screen = harness.screen_to_string();
    assert!(screen.contains("(property) bar: number"));
    assert!(screen.contains("The bar."));
}

#[tokio::test]
async fn test_no_hover_for_plain_languages() {
    let mut harness = SurfaceHarness::with_options(EditorOptions {
        default_value: Some("foo.bar".to_string()),
        language: Some("css".to_string()),
        ..Default::default()
    });
    harness.settle().await;

    harness.surface_mut().handle_pointer_cell(5, 0);
    harness.settle().await;
    assert!(harness.surface().hover().is_none());
    assert_eq!(harness.backend().quick_info_calls(), 0);
}

#[tokio::test]
async fn test_scrolling_moves_tooltip() {
    let text = format!("{}\n{}", "const foo = { bar: 1 };\n".repeat(20), "foo.bar");
    let mut harness = SurfaceHarness::new(&text).with_size(60, 8);
    harness.render();
    harness.settle().await;

    // "foo" on the second line
    harness.surface_mut().handle_pointer_cell(7, 1);
    harness.settle().await;
    let before = harness.surface().hover().unwrap().anchor;

    harness.surface_mut().scroll_lines(1);
    let after = harness.surface().hover().unwrap().anchor;
    assert_eq!(after, (before.0, before.1 - 1.0));
}

#[tokio::test]
async fn test_failed_lookup_means_no_tooltip() {
    let mut harness = SurfaceHarness::with_backend(
        FakeBackend::new().with_failing_lookups(),
        EditorOptions {
            default_value: Some(SOURCE.to_string()),
            filename: Some("index.ts".to_string()),
            ..Default::default()
        },
    );
    harness.settle().await;

    harness.surface_mut().handle_pointer_cell(5, 1);
    harness.settle().await;
    assert_eq!(harness.backend().quick_info_calls(), 1);
    assert!(harness.surface().hover().is_none());
}
