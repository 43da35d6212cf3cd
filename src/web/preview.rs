use axum::Router;
use std::path::{Path, PathBuf};
use tokio::sync::oneshot;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

pub const PREVIEW_ADDR: &str = "127.0.0.1:5921";
pub const PREVIEW_BASE_URL: &str = "http://127.0.0.1:5921";

/// Builds the preview URL for a file under the served source root.
pub fn file_url(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let rel = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    format!("{PREVIEW_BASE_URL}/{rel}")
}

/// Serves the bytes of the current source directory over a fixed local
/// address so a UI can show thumbnails. Lifecycle is tied 1:1 to the
/// active session.
pub struct PreviewServer {
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl PreviewServer {
    /// Starts serving `dir` on [`PREVIEW_ADDR`]. Spawns onto the ambient
    /// tokio runtime; without one (unit tests) previews are simply
    /// disabled. Bind failures are logged, never fatal: the session works
    /// without previews.
    pub fn start(dir: &Path) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let dir = dir.to_path_buf();
                handle.spawn(serve(dir, shutdown_rx));
            }
            Err(_) => debug!("no async runtime available, preview server disabled"),
        }
        Self {
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Triggers graceful shutdown. Dropping the handle has the same
    /// effect.
    pub fn stop(mut self) {
        self.shutdown_tx.take();
    }
}

async fn serve(dir: PathBuf, shutdown_rx: oneshot::Receiver<()>) {
    let app = Router::new().fallback_service(ServeDir::new(&dir));
    let listener = match tokio::net::TcpListener::bind(PREVIEW_ADDR).await {
        Ok(listener) => listener,
        Err(err) => {
            warn!("preview server failed to bind {PREVIEW_ADDR}: {err}");
            return;
        }
    };
    info!("preview server serving {} on http://{PREVIEW_ADDR}", dir.display());

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            // Resolves on stop() or when the handle is dropped.
            let _ = shutdown_rx.await;
        })
        .await;
    if let Err(err) = result {
        warn!("preview server error: {err}");
    }
    debug!("preview server stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_url_joins_base_and_relative_path() {
        let root = Path::new("/data/src");
        assert_eq!(
            file_url(root, Path::new("/data/src/a.gif")),
            format!("{PREVIEW_BASE_URL}/a.gif")
        );
        assert_eq!(
            file_url(root, Path::new("/data/src/sub/deep/b.gif")),
            format!("{PREVIEW_BASE_URL}/sub/deep/b.gif")
        );
    }

    #[tokio::test]
    async fn test_start_and_stop_without_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let server = PreviewServer::start(dir.path());
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        server.stop();
    }
}
