use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use crossterm::event::{
    self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, Event,
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::{DefaultTerminal, Frame};

use livepad::config::{EditorOptions, HostConfig};
use livepad::services::tracing_setup;
use livepad::{EditingSurface, EngineHost};

/// Terminal editor with live highlighting, diagnostics, completion and hover
#[derive(Parser, Debug)]
#[command(name = "livepad", version, about)]
struct Args {
    /// File to edit (created on save when missing)
    file: Option<PathBuf>,

    /// Language id, overriding detection from the file name
    #[arg(long)]
    language: Option<String>,

    /// Theme name or path to a theme JSON file
    #[arg(long)]
    theme: Option<String>,

    /// Host configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log file
    #[arg(long, default_value = "/tmp/livepad.log")]
    log_file: PathBuf,

    /// Print the JSON schema of the configuration file and exit
    #[arg(long)]
    dump_config_schema: bool,
}

struct State {
    surface: EditingSurface,
    path: Option<PathBuf>,
    saved_text: String,
    status: String,
    text_area: Rect,
}

impl State {
    fn run(&mut self, mut terminal: DefaultTerminal) -> anyhow::Result<()> {
        loop {
            self.surface.process_pending();
            terminal.draw(|frame| self.render(frame))?;

            if !event::poll(Duration::from_millis(16))? {
                continue;
            }
            match event::read()? {
                Event::Key(KeyEvent {
                    code: KeyCode::Char('q'),
                    modifiers: KeyModifiers::CONTROL,
                    kind: KeyEventKind::Press,
                    ..
                }) => break Ok(()),
                Event::Key(KeyEvent {
                    code: KeyCode::Char('s'),
                    modifiers: KeyModifiers::CONTROL,
                    kind: KeyEventKind::Press,
                    ..
                }) => self.save(),
                Event::Key(key) => {
                    self.surface.handle_key(&key);
                }
                Event::Mouse(mouse) => self.handle_mouse(mouse),
                Event::FocusGained => self.surface.handle_focus(),
                Event::FocusLost => self.surface.handle_blur(),
                _ => {}
            }
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let area = self.text_area;
        let inside = mouse.column >= area.x
            && mouse.column < area.x + area.width
            && mouse.row >= area.y
            && mouse.row < area.y + area.height;
        match mouse.kind {
            MouseEventKind::Moved if inside => {
                self.surface
                    .handle_pointer_cell(mouse.column - area.x, mouse.row - area.y);
            }
            MouseEventKind::Moved => self.surface.handle_pointer_leave(),
            MouseEventKind::ScrollUp => self.surface.scroll_lines(-3),
            MouseEventKind::ScrollDown => self.surface.scroll_lines(3),
            _ => {}
        }
    }

    fn save(&mut self) {
        let Some(path) = &self.path else {
            self.status = "No file name; start with `livepad FILE` to save".to_string();
            return;
        };
        match std::fs::write(path, self.surface.text()) {
            Ok(()) => {
                self.saved_text = self.surface.text().to_string();
                self.status = format!("Saved {}", path.display());
                tracing::info!("Saved {}", path.display());
            }
            Err(e) => {
                self.status = format!("Save failed: {}", e);
                tracing::error!("Failed to save {}: {}", path.display(), e);
            }
        }
    }

    fn render(&mut self, frame: &mut Frame) {
        let [text_area, status_area] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(frame.area());
        self.text_area = text_area;
        self.surface.render(frame, text_area);

        let theme = self.surface.theme().clone();
        let modified = if self.surface.text() != self.saved_text { " [+]" } else { "" };
        let errors = self.surface.diagnostics().len();
        let status = Line::from(vec![
            Span::raw(format!(
                " {} ({}){}  ",
                self.surface.file_id(),
                self.surface.language(),
                modified
            )),
            Span::raw(format!("{} problem(s)  ", errors)),
            Span::raw(self.status.as_str()),
        ])
        .style(Style::default().fg(theme.background).bg(theme.foreground));
        frame.render_widget(status, status_area);
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.dump_config_schema {
        println!("{}", HostConfig::json_schema()?);
        return Ok(());
    }

    if let Err(e) = tracing_setup::init_global(&args.log_file) {
        eprintln!("Logging disabled: {:#}", e);
    }

    let config = match &args.config {
        Some(path) => HostConfig::from_file(path)?,
        None => HostConfig::load()?,
    };

    let text = match &args.file {
        Some(path) if path.exists() => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        _ => String::new(),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let _guard = runtime.enter();

    let host = runtime.block_on(EngineHost::from_config(&config))?;
    let host = EngineHost::install_global(host);
    tracing::info!("Host ready to start, theme {}", host.theme().name);

    let options = EditorOptions {
        default_value: Some(text.clone()),
        filename: args
            .file
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|name| name.to_string_lossy().into_owned()),
        language: args.language.clone(),
        theme: args.theme.clone(),
        ..Default::default()
    };
    let mut state = State {
        surface: EditingSurface::new(host, options),
        path: args.file.clone(),
        saved_text: text,
        status: "Ctrl+S save  Ctrl+Q quit  Ctrl+Space complete".to_string(),
        text_area: Rect::default(),
    };

    let terminal = ratatui::init();
    execute!(io::stdout(), EnableMouseCapture, EnableFocusChange)?;
    let result = state.run(terminal);
    let _ = execute!(io::stdout(), DisableMouseCapture, DisableFocusChange);
    ratatui::restore();
    result
}
