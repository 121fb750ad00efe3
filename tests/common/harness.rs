use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use livepad::config::EditorOptions;
use livepad::input::InputResult;
use livepad::services::host::{EngineHost, HighlighterConfig};
use livepad::view::surface::SurfaceWidget;
use livepad::EditingSurface;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::widgets::Widget;

use super::fake_backend::FakeBackend;

/// Drives one editing surface over a [`FakeBackend`] and renders it into an
/// in-memory buffer
pub struct SurfaceHarness {
    surface: EditingSurface,
    backend: Arc<FakeBackend>,
    host: Arc<EngineHost>,
    width: u16,
    height: u16,
}

impl SurfaceHarness {
    /// Uncontrolled TypeScript surface holding `text`
    pub fn new(text: &str) -> Self {
        Self::with_options(EditorOptions {
            default_value: Some(text.to_string()),
            filename: Some("index.ts".to_string()),
            ..Default::default()
        })
    }

    pub fn with_options(options: EditorOptions) -> Self {
        Self::with_backend(FakeBackend::new(), options)
    }

    pub fn with_backend(backend: FakeBackend, options: EditorOptions) -> Self {
        let backend = Arc::new(backend);
        let host = Arc::new(EngineHost::new(backend.clone(), HighlighterConfig::default()));
        Self::with_host(host, backend, options)
    }

    pub fn with_host(host: Arc<EngineHost>, backend: Arc<FakeBackend>, options: EditorOptions) -> Self {
        super::tracing::init_tracing_from_env();
        let surface = EditingSurface::new(host.clone(), options);
        Self {
            surface,
            backend,
            host,
            width: 60,
            height: 12,
        }
    }

    pub fn with_size(mut self, width: u16, height: u16) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn surface(&self) -> &EditingSurface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut EditingSurface {
        &mut self.surface
    }

    pub fn backend(&self) -> &Arc<FakeBackend> {
        &self.backend
    }

    pub fn host(&self) -> &Arc<EngineHost> {
        &self.host
    }

    pub fn send_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> InputResult {
        self.surface.handle_key(&KeyEvent::new(code, modifiers))
    }

    pub fn type_text(&mut self, text: &str) {
        for c in text.chars() {
            let code = if c == '\n' { KeyCode::Enter } else { KeyCode::Char(c) };
            self.send_key(code, KeyModifiers::NONE);
        }
    }

    /// Wait for all background work and apply it
    pub async fn settle(&mut self) {
        self.surface.settle().await;
    }

    /// Render the surface into a fresh buffer of the harness size
    pub fn render(&mut self) -> Buffer {
        let area = Rect::new(0, 0, self.width, self.height);
        let probe = self.surface.frame();
        self.surface.resize(area.width, probe.text_rows(area));

        let frame = self.surface.frame();
        let mut buf = Buffer::empty(area);
        SurfaceWidget::new(&frame).render(area, &mut buf);
        buf
    }

    /// Rendered rows with trailing blanks trimmed
    pub fn screen_rows(&mut self) -> Vec<String> {
        let buf = self.render();
        (0..self.height)
            .map(|y| {
                (0..self.width)
                    .map(|x| buf[(x, y)].symbol())
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .collect()
    }

    pub fn screen_to_string(&mut self) -> String {
        self.screen_rows().join("\n")
    }
}
