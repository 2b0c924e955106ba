//! # Dev Server
//!
//! Serves the docs directory (`index.html`, `assets/`, `api/<version>/...`)
//! over plain HTTP for local browsing. One blocking `tiny_http` loop handles
//! one request at a time; there is no caching and no TLS.
//!
//! Only `GET` and `HEAD` are answered. Request paths are percent-decoded,
//! the query string is dropped, and any path that would leave the docs
//! directory is a 404. Directories resolve to their `index.html`.

use crate::config::Settings;
use crate::error::{AemonError, Result};
use crate::html::INDEX_PAGE;
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tiny_http::{Header, Method, Request, Response};
use tracing::{debug, info, warn};

/// How often the request loop checks the stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Maps request paths to files under a base directory.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    base_dir: PathBuf,
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self { base_dir: base.into() }
    }

    /// Decoded, query-free request path mapped under the base directory, or
    /// `None` when it would escape it.
    fn map_path(&self, url: &str) -> Option<PathBuf> {
        let raw = url.split(['?', '#']).next().unwrap_or("");
        let decoded = urlencoding::decode(raw).ok()?;
        let mut pb = self.base_dir.clone();
        for comp in Path::new(decoded.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    /// File that answers `url`, if any.
    #[must_use]
    pub fn resolve(&self, url: &str) -> Option<PathBuf> {
        let mut path = self.map_path(url)?;
        if path.is_dir() {
            path.push(INDEX_PAGE);
        }
        path.is_file().then_some(path)
    }

    #[must_use]
    pub fn content_type(path: &Path) -> &'static str {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase()
            .as_str()
        {
            "html" | "htm" => "text/html; charset=utf-8",
            "css" => "text/css; charset=utf-8",
            "js" => "application/javascript; charset=utf-8",
            "json" => "application/json",
            "yaml" | "yml" => "application/yaml",
            "txt" => "text/plain; charset=utf-8",
            "svg" => "image/svg+xml",
            "png" => "image/png",
            "ico" => "image/x-icon",
            "woff2" => "font/woff2",
            _ => "application/octet-stream",
        }
    }
}

/// A bound documentation server.
pub struct DocsServer {
    files: StaticFiles,
    server: tiny_http::Server,
}

impl DocsServer {
    /// Bind `host:port` to serve `docs_dir`. Port `0` picks a free port.
    pub fn bind(docs_dir: &Path, host: &str, port: u16) -> Result<Self> {
        let server = tiny_http::Server::http((host, port))
            .map_err(|e| AemonError::Server(format!("failed to bind {host}:{port}: {e}")))?;
        Ok(Self {
            files: StaticFiles::new(docs_dir),
            server,
        })
    }

    /// Port actually bound.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.server.server_addr().to_ip().map(|a| a.port())
    }

    /// Handle requests until `stop` is set.
    pub fn run(&self, stop: &AtomicBool) -> Result<()> {
        while !stop.load(Ordering::Relaxed) {
            match self.server.recv_timeout(POLL_INTERVAL) {
                Ok(Some(request)) => self.handle(request),
                Ok(None) => {}
                Err(e) => return Err(AemonError::Server(format!("accept failed: {e}"))),
            }
        }
        info!("server stopped");
        Ok(())
    }

    fn handle(&self, request: Request) {
        let method = request.method().clone();
        let url = request.url().to_string();

        // tiny_http omits the body of HEAD responses itself
        let response = match method {
            Method::Get | Method::Head => match self.files.resolve(&url) {
                Some(path) => match fs::read(&path) {
                    Ok(bytes) => with_header(
                        Response::from_data(bytes),
                        "Content-Type",
                        StaticFiles::content_type(&path),
                    ),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "failed to read file");
                        text_response(500, "Internal Server Error")
                    }
                },
                None => text_response(404, "Not Found"),
            },
            _ => with_header(text_response(405, "Method Not Allowed"), "Allow", "GET, HEAD"),
        };
        debug!(%method, %url, status = response.status_code().0, "request");
        if let Err(e) = request.respond(response) {
            debug!(%url, error = %e, "client went away");
        }
    }
}

fn with_header<R: Read>(response: Response<R>, name: &str, value: &str) -> Response<R> {
    match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

fn text_response(status: u16, body: &str) -> Response<Cursor<Vec<u8>>> {
    with_header(
        Response::from_string(body).with_status_code(status),
        "Content-Type",
        "text/plain; charset=utf-8",
    )
}

/// Flag set by SIGINT or SIGTERM.
fn stop_flag() -> Result<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    #[cfg(unix)]
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&stop))
            .map_err(|e| AemonError::Server(format!("failed to install signal handler: {e}")))?;
    }
    Ok(stop)
}

/// Serve the docs directory of `settings` until interrupted.
///
/// # Errors
///
/// Fails without a generated `index.html`, when the address cannot be bound,
/// or when accepting connections fails.
pub fn serve(settings: &Settings, host: &str, port: u16, open_browser: bool) -> Result<()> {
    let docs_dir = settings.docs_dir();
    if !docs_dir.join(INDEX_PAGE).is_file() {
        return Err(AemonError::configuration(
            "No documentation found. Run 'aemon generate' first.",
        ));
    }

    let server = DocsServer::bind(&docs_dir, host, port)?;
    let url = format!("http://{host}:{}", server.port().unwrap_or(port));
    info!(%url, dir = %docs_dir.display(), "🚀 serving documentation, press Ctrl+C to stop");

    if open_browser {
        if let Err(e) = open::that(&url) {
            warn!(error = %e, "failed to open browser, open the URL manually");
        }
    }

    let stop = stop_flag()?;
    server.run(&stop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpStream;
    use tempfile::TempDir;

    fn docs() -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("index.html"), "<h1>docs</h1>").unwrap();
        fs::create_dir_all(tmp.path().join("api/v1")).unwrap();
        fs::write(tmp.path().join("api/v1/index.html"), "viewer").unwrap();
        fs::write(tmp.path().join("api/v1/api_config.yaml"), "openapi: 3.1.0\n").unwrap();
        fs::create_dir_all(tmp.path().join("my docs")).unwrap();
        fs::write(tmp.path().join("my docs/a.txt"), "spaced").unwrap();
        tmp
    }

    #[test]
    fn test_map_path_prevents_traversal() {
        let tmp = docs();
        let sf = StaticFiles::new(tmp.path());
        assert!(sf.map_path("/../Cargo.toml").is_none());
        assert!(sf.map_path("/api/%2e%2e/%2e%2e/etc/passwd").is_none());
        assert!(sf.resolve("/../index.html").is_none());
    }

    #[test]
    fn test_resolve_directories_queries_and_encoding() {
        let tmp = docs();
        let sf = StaticFiles::new(tmp.path());
        assert_eq!(sf.resolve("/").unwrap(), tmp.path().join("index.html"));
        assert_eq!(sf.resolve("/api/v1/").unwrap(), tmp.path().join("api/v1/index.html"));
        assert_eq!(
            sf.resolve("/api/v1/api_config.yaml?download=1").unwrap(),
            tmp.path().join("api/v1/api_config.yaml")
        );
        assert_eq!(sf.resolve("/my%20docs/a.txt").unwrap(), tmp.path().join("my docs/a.txt"));
        assert!(sf.resolve("/missing.html").is_none());
    }

    #[test]
    fn test_content_types() {
        assert_eq!(StaticFiles::content_type(Path::new("a.HTML")), "text/html; charset=utf-8");
        assert_eq!(StaticFiles::content_type(Path::new("api_config.yaml")), "application/yaml");
        assert_eq!(StaticFiles::content_type(Path::new("x.bin")), "application/octet-stream");
    }

    fn raw_request(port: u16, request: &str) -> String {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        stream.write_all(request.as_bytes()).unwrap();
        let mut buf = String::new();
        let _ = stream.read_to_string(&mut buf);
        buf
    }

    #[test]
    fn test_server_answers_get_and_rejects_post() {
        let tmp = docs();
        let server = DocsServer::bind(tmp.path(), "127.0.0.1", 0).unwrap();
        let port = server.port().unwrap();
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || server.run(&stop))
        };

        let ok = raw_request(
            port,
            "GET /api/v1/api_config.yaml HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        );
        assert!(ok.starts_with("HTTP/1.1 200"), "{ok}");
        assert!(ok.contains("application/yaml"));
        assert!(ok.contains("openapi: 3.1.0"));

        let head = raw_request(
            port,
            "HEAD /api/v1/api_config.yaml HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        );
        assert!(head.starts_with("HTTP/1.1 200"), "{head}");
        assert!(head.contains("application/yaml"));
        assert!(!head.contains("openapi: 3.1.0"), "{head}");

        let missing = raw_request(port, "GET /nope HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        assert!(missing.starts_with("HTTP/1.1 404"), "{missing}");

        let post = raw_request(
            port,
            "POST / HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        assert!(post.starts_with("HTTP/1.1 405"), "{post}");

        stop.store(true, Ordering::Relaxed);
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn test_stop_flag_ends_idle_server() {
        let tmp = docs();
        let server = DocsServer::bind(tmp.path(), "127.0.0.1", 0).unwrap();
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || server.run(&stop))
        };

        std::thread::sleep(POLL_INTERVAL);
        assert!(!handle.is_finished());
        stop.store(true, Ordering::Relaxed);

        let deadline = std::time::Instant::now() + POLL_INTERVAL * 8;
        while !handle.is_finished() {
            assert!(std::time::Instant::now() < deadline, "server ignored the stop flag");
            std::thread::sleep(Duration::from_millis(20));
        }
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn test_serve_requires_index() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::default().with_output_dir(tmp.path().join("docs/api"));
        let err = serve(&settings, "127.0.0.1", 0, false).unwrap_err();
        assert!(err.to_string().contains("Run 'aemon generate' first"));
    }
}
