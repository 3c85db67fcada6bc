use crate::report::Console;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tide::{Middleware, Next, Request, Response, StatusCode};

/// Static file server for the local root, mounted under `prefix`.
///
/// Only requests under `prefix` are logged. Dot-files (including the
/// `.partial` files of in-flight downloads) are never served.
///
/// Fails when `root` does not exist yet, since tide resolves the directory
/// up front.
pub fn build_app(root: &Path, prefix: &str, console: Arc<Console>) -> std::io::Result<tide::Server<()>> {
    let mut app = tide::new();
    app.at(prefix.trim_end_matches('/'))
        .with(AccessLog { console })
        .with(HideDotFiles)
        .serve_dir(root)?;
    Ok(app)
}

struct AccessLog {
    console: Arc<Console>,
}

#[tide::utils::async_trait]
impl<State: Clone + Send + Sync + 'static> Middleware<State> for AccessLog {
    async fn handle(&self, req: Request<State>, next: Next<'_, State>) -> tide::Result {
        let ip = client_ip(req.remote());
        self.console.access(&ip, req.url().path());
        Ok(next.run(req).await)
    }
}

struct HideDotFiles;

#[tide::utils::async_trait]
impl<State: Clone + Send + Sync + 'static> Middleware<State> for HideDotFiles {
    async fn handle(&self, req: Request<State>, next: Next<'_, State>) -> tide::Result {
        if is_hidden(req.url().path()) {
            return Ok(Response::new(StatusCode::NotFound));
        }
        Ok(next.run(req).await)
    }
}

fn is_hidden(path: &str) -> bool {
    path.split('/').any(|segment| segment.starts_with('.'))
}

/// Forwarded-for address if present, otherwise the peer without its port.
fn client_ip(remote: Option<&str>) -> String {
    match remote {
        Some(addr) => addr
            .parse::<SocketAddr>()
            .map(|a| a.ip().to_string())
            .unwrap_or_else(|_| addr.to_string()),
        None => "unknown".to_string(),
    }
}
