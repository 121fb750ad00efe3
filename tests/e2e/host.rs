// End-to-end tests for the shared engine host: one-time initialization and
// ambient declaration bundles

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::common::fake_backend::FakeBackend;
use crate::common::harness::SurfaceHarness;
use livepad::config::EditorOptions;
use livepad::services::declarations::{DeclarationFile, HttpDeclarationSource, InMemoryDeclarations};
use livepad::services::host::{EngineHost, HighlighterConfig};

const BUNDLE: &str = r#"[{ "path": "lib.d.ts", "code": "declare const lib: number;" }]"#;

fn ts_options(text: &str) -> EditorOptions {
    EditorOptions {
        default_value: Some(text.to_string()),
        filename: Some("index.ts".to_string()),
        ..Default::default()
    }
}

/// Serves a declaration bundle and counts the requests it answers
struct BundleServer {
    url: String,
    requests: Arc<AtomicUsize>,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl BundleServer {
    fn start(body: &'static str) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();
        let requests = Arc::new(AtomicUsize::new(0));
        let stop = Arc::new(AtomicBool::new(false));

        let counter = requests.clone();
        let stopped = stop.clone();
        let handle = thread::spawn(move || {
            while !stopped.load(Ordering::SeqCst) {
                let Ok(Some(request)) = server.recv_timeout(Duration::from_millis(20)) else {
                    continue;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let header = "Content-Type: application/json"
                    .parse::<tiny_http::Header>()
                    .unwrap();
                let _ = request.respond(tiny_http::Response::from_string(body).with_header(header));
            }
        });

        Self {
            url: format!("http://127.0.0.1:{}/types.json", port),
            requests,
            stop,
            handle: Some(handle),
        }
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Drop for BundleServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bundle_fetched_once_before_buffers() {
    let server = BundleServer::start(BUNDLE);
    let backend = Arc::new(FakeBackend::new());
    let host = Arc::new(
        EngineHost::new(backend.clone(), HighlighterConfig::default())
            .with_declarations(Box::new(HttpDeclarationSource::new(server.url.clone()))),
    );

    let mut first = SurfaceHarness::with_host(host.clone(), backend.clone(), ts_options("lib + 1"));
    let mut second = SurfaceHarness::with_host(
        host.clone(),
        backend.clone(),
        EditorOptions {
            default_value: Some("lib * 2".to_string()),
            filename: Some("other.ts".to_string()),
            ..Default::default()
        },
    );
    first.settle().await;
    second.settle().await;

    assert_eq!(server.requests(), 1);
    let registrations = backend.registrations();
    assert_eq!(
        registrations[0],
        ("lib.d.ts".to_string(), "declare const lib: number;".to_string())
    );
    assert_eq!(registrations.len(), 3);
    assert!(registrations.contains(&("index.ts".to_string(), "lib + 1".to_string())));
    assert!(registrations.contains(&("other.ts".to_string(), "lib * 2".to_string())));
}

#[tokio::test]
async fn test_surfaces_share_one_initialization() {
    let backend = Arc::new(FakeBackend::new());
    let host = Arc::new(
        EngineHost::new(backend.clone(), HighlighterConfig::default()).with_declarations(Box::new(
            InMemoryDeclarations::new(vec![DeclarationFile {
                path: "lib.d.ts".to_string(),
                code: "declare const lib: number;".to_string(),
            }]),
        )),
    );

    let mut first = SurfaceHarness::with_host(host.clone(), backend.clone(), ts_options("a"));
    let mut second = SurfaceHarness::with_host(
        host.clone(),
        backend.clone(),
        EditorOptions {
            default_value: Some("b".to_string()),
            filename: Some("other.ts".to_string()),
            ..Default::default()
        },
    );
    first.settle().await;
    second.settle().await;

    let ambient = backend
        .registrations()
        .iter()
        .filter(|(path, _)| path == "lib.d.ts")
        .count();
    assert_eq!(ambient, 1);
    assert!(host.try_ready().is_some());
    assert_eq!(first.surface().tokens_version(), 1);
    assert_eq!(second.surface().tokens_version(), 1);
}

#[tokio::test]
async fn test_new_surface_reusing_filename_is_analyzed() {
    let backend = Arc::new(FakeBackend::new());
    let host = Arc::new(EngineHost::new(backend.clone(), HighlighterConfig::default()));

    let mut first = SurfaceHarness::with_host(host.clone(), backend.clone(), ts_options("const a = 1;"));
    first.type_text("xyz");
    first.settle().await;
    assert_eq!(first.surface().version(), 4);
    drop(first);

    let mut second = SurfaceHarness::with_host(host, backend.clone(), ts_options("const b = oops;"));
    second.settle().await;

    let surface = second.surface();
    assert_eq!(surface.version(), 1);
    assert_eq!(surface.tokens_version(), 1);
    assert_eq!(surface.diagnostics().len(), 1);
    assert_eq!(backend.text_of("index.ts").as_deref(), Some("const b = oops;"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unreachable_bundle_still_highlights() {
    // Bind then drop to get a port nobody listens on
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let source = HttpDeclarationSource::new(format!("http://127.0.0.1:{}/types.json", port))
        .with_timeout(Duration::from_secs(2));
    let backend = Arc::new(FakeBackend::new());
    let host = Arc::new(
        EngineHost::new(backend.clone(), HighlighterConfig::default())
            .with_declarations(Box::new(source)),
    );

    let mut harness = SurfaceHarness::with_host(host, backend.clone(), ts_options("const a = 1"));
    harness.settle().await;

    assert_eq!(harness.surface().tokens_version(), 1);
    assert_eq!(backend.registrations().len(), 1);
}

#[tokio::test]
async fn test_global_host_is_installed_once() {
    let installed = EngineHost::install_global(EngineHost::new(
        Arc::new(FakeBackend::new()),
        HighlighterConfig::default(),
    ));
    let again = EngineHost::install_global(EngineHost::new(
        Arc::new(FakeBackend::new()),
        HighlighterConfig::default(),
    ));
    assert!(Arc::ptr_eq(&installed, &again));
    assert!(Arc::ptr_eq(&installed, &EngineHost::global()));

    let mut surface = livepad::EditingSurface::with_global_host(ts_options("let a = 1"));
    surface.settle().await;
    assert_eq!(surface.tokens_version(), 1);
}
