// End-to-end tests for version-gated analysis: diagnostics, error flags and
// re-tokenization

use std::sync::Arc;
use std::time::Duration;

use crate::common::fake_backend::FakeBackend;
use crate::common::fixtures::TestFixture;
use crate::common::harness::SurfaceHarness;
use crossterm::event::{KeyCode, KeyModifiers};
use livepad::config::EditorOptions;
use livepad::input::DropdownState;
use livepad::model::diagnostic::Severity;
use livepad::model::token::{lines_text, Token};
use livepad::services::host::{EngineHost, HighlighterConfig};
use livepad::view::theme::Theme;
use livepad::EditingSurface;
use ratatui::style::{Color, Modifier};

fn flagged_text(harness: &SurfaceHarness) -> String {
    harness
        .surface()
        .tokens()
        .iter()
        .flatten()
        .filter(|t| t.has_error)
        .map(|t| t.content.as_str())
        .collect()
}

#[tokio::test]
async fn test_initial_analysis_flags_errors() {
    let mut harness = SurfaceHarness::new("const a = oops;");
    harness.settle().await;

    let diagnostics = harness.surface().diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].range, 10..14);
    assert_eq!(diagnostics[0].severity, Severity::Error);
    assert_eq!(harness.surface().tokens_version(), 1);

    assert!(flagged_text(&harness).contains("oops"));
    let keyword = harness.surface().tokens()[0]
        .iter()
        .find(|t| t.content == "const")
        .unwrap();
    assert!(!keyword.has_error);
}

#[tokio::test]
async fn test_clean_typescript_scenario() {
    let mut harness = SurfaceHarness::with_options(EditorOptions {
        default_value: Some("const a = 1".to_string()),
        language: Some("typescript".to_string()),
        filename: Some("index.tsx".to_string()),
        ..Default::default()
    });
    harness.settle().await;

    assert!(harness.surface().diagnostics().is_empty());
    assert!(flagged_text(&harness).is_empty());
    let keyword = harness.host().try_ready().unwrap().style_for_capture("keyword");
    let token = harness.surface().tokens()[0]
        .iter()
        .find(|t| t.content == "const")
        .unwrap();
    assert_eq!(token.style(), keyword);
}

#[tokio::test]
async fn test_errors_render_underlined_with_list() {
    let mut harness = SurfaceHarness::new("const a = oops;");
    harness.settle().await;

    let buf = harness.render();
    let cell = &buf[(11, 0)];
    assert_eq!(cell.symbol(), "o");
    assert!(cell.modifier.contains(Modifier::UNDERLINED));
    assert!(!buf[(1, 0)].modifier.contains(Modifier::UNDERLINED));

    let rows = harness.screen_rows();
    let list = rows.iter().find(|row| row.starts_with("1:11")).unwrap();
    assert_eq!(list, "1:11 error: Cannot find name 'oops'.");
}

#[tokio::test]
async fn test_fixing_the_error_clears_it() {
    let mut harness = SurfaceHarness::new("oops");
    harness.settle().await;
    assert_eq!(harness.surface().diagnostics().len(), 1);

    harness.send_key(KeyCode::End, KeyModifiers::NONE);
    harness.send_key(KeyCode::Backspace, KeyModifiers::NONE);
    harness.settle().await;

    assert_eq!(harness.surface().text(), "oop");
    assert!(harness.surface().diagnostics().is_empty());
    assert!(flagged_text(&harness).is_empty());
}

#[tokio::test]
async fn test_edit_hides_diagnostics_of_previous_text() {
    let mut harness = SurfaceHarness::new("a = oops");
    harness.settle().await;
    assert_eq!(harness.surface().diagnostics().len(), 1);

    harness.send_key(KeyCode::End, KeyModifiers::NONE);
    for _ in 0..4 {
        harness.send_key(KeyCode::Backspace, KeyModifiers::NONE);
    }

    // New analysis not applied yet
    assert_eq!(harness.surface().text(), "a = ");
    assert!(harness.surface().tokens_version() < harness.surface().version());
    assert!(harness.surface().diagnostics().is_empty());
    let frame = harness.surface().frame();
    assert!(frame.diagnostics.is_empty());
    assert!(frame.tokens.iter().flatten().all(|t| !t.has_error));
    let rows = harness.screen_rows();
    assert!(rows.iter().all(|row| !row.contains("error:")));
    let buf = harness.render();
    assert!((0..10).all(|x| !buf[(x, 0)].modifier.contains(Modifier::UNDERLINED)));
}

#[tokio::test]
async fn test_stale_analysis_is_discarded() {
    let backend = FakeBackend::new().with_slow_first_diagnostics(Duration::from_millis(100));
    let mut harness = SurfaceHarness::with_backend(
        backend,
        EditorOptions {
            default_value: Some("const a = 1".to_string()),
            filename: Some("index.ts".to_string()),
            ..Default::default()
        },
    );

    // The first analysis is still in flight while the text changes
    harness.send_key(KeyCode::End, KeyModifiers::NONE);
    harness.type_text("; oops");
    harness.settle().await;

    let surface = harness.surface();
    assert_eq!(surface.text(), "const a = 1; oops");
    assert_eq!(surface.tokens_version(), surface.version());
    assert_eq!(lines_text(surface.tokens()), surface.text());
    assert_eq!(surface.diagnostics().len(), 1);
    assert_eq!(surface.diagnostics()[0].range, 13..17);

    // The backend saw the latest text last
    let registrations = harness.backend().registrations();
    assert_eq!(registrations.last().unwrap().1, "const a = 1; oops");
}

#[tokio::test]
async fn test_non_analyzable_language_is_only_highlighted() {
    let mut harness = SurfaceHarness::with_options(EditorOptions {
        default_value: Some("echo oops".to_string()),
        language: Some("bash".to_string()),
        ..Default::default()
    });
    harness.settle().await;

    assert!(harness.surface().diagnostics().is_empty());
    assert_eq!(lines_text(harness.surface().tokens()), "echo oops");
    assert!(flagged_text(&harness).is_empty());

    harness.send_key(KeyCode::End, KeyModifiers::NONE);
    harness.type_text("x");
    harness.settle().await;
    assert_eq!(harness.backend().completion_calls(), 0);
    assert_eq!(harness.surface().dropdown(), &DropdownState::Closed);
}

#[tokio::test]
async fn test_language_switch_reanalyzes() {
    let mut harness = SurfaceHarness::with_options(EditorOptions {
        default_value: Some("oops".to_string()),
        language: Some("css".to_string()),
        filename: Some("snippet".to_string()),
        ..Default::default()
    });
    harness.settle().await;
    assert!(harness.surface().diagnostics().is_empty());

    harness.surface_mut().set_language(Some("typescript"));
    harness.settle().await;
    assert_eq!(harness.surface().diagnostics().len(), 1);
}

#[tokio::test]
async fn test_prerendered_tokens_until_first_analysis() {
    let host = Arc::new(EngineHost::new(
        Arc::new(FakeBackend::new()),
        HighlighterConfig::default(),
    ));
    let style = Theme::dark().default_style();
    let prerendered = vec![vec![Token::new("let a", style, 0)]];
    let mut surface = EditingSurface::new(
        host,
        EditorOptions {
            default_value: Some("let a".to_string()),
            ..Default::default()
        },
    )
    .with_prerendered(prerendered.clone());
    assert_eq!(surface.tokens(), prerendered.as_slice());

    surface.settle().await;
    assert_eq!(surface.tokens_version(), 1);
    let keyword = surface.tokens()[0].iter().find(|t| t.content == "let").unwrap();
    assert_ne!(keyword.style(), style);
}

#[tokio::test]
async fn test_surface_theme_overrides_host_theme() {
    let mut harness = SurfaceHarness::with_options(EditorOptions {
        default_value: Some("const a = 1".to_string()),
        filename: Some("index.ts".to_string()),
        theme: Some("light".to_string()),
        ..Default::default()
    });
    harness.settle().await;

    assert_eq!(harness.surface().theme().name, "light");
    let keyword = harness.surface().tokens()[0]
        .iter()
        .find(|t| t.content == "const")
        .unwrap();
    assert_eq!(keyword.color, Color::Rgb(0, 0, 255));
}

#[tokio::test]
async fn test_theme_file_option() {
    let fixture = TestFixture::new(
        "ocean.json",
        r##"{ "colors": { "editor.background": "#001122" }, "tokenColors": [] }"##,
    )
    .unwrap();
    let mut harness = SurfaceHarness::with_options(EditorOptions {
        default_value: Some("a".to_string()),
        theme: Some(fixture.path_str()),
        ..Default::default()
    });
    assert_eq!(harness.surface().theme().name, "ocean");

    let buf = harness.render();
    assert_eq!(buf[(5, 5)].bg, Color::Rgb(0x00, 0x11, 0x22));
}

#[tokio::test]
async fn test_unreadable_theme_falls_back_to_host() {
    let harness = SurfaceHarness::with_options(EditorOptions {
        theme: Some("/nonexistent/missing.json".to_string()),
        ..Default::default()
    });
    assert_eq!(harness.surface().theme().name, harness.host().theme().name);
}
