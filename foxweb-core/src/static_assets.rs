// Static asset collaborator: byte reading keyed by path, content-type sniffing

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// The static-file collaborator: relative URL path in, bytes out.
#[async_trait]
pub trait StaticFiles: Send + Sync {
    async fn read(&self, path: &str) -> Option<Vec<u8>>;
}

/// Disk-backed static files rooted at a directory.
pub struct DiskStatic {
    root: PathBuf,
}

impl DiskStatic {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl StaticFiles for DiskStatic {
    async fn read(&self, path: &str) -> Option<Vec<u8>> {
        let relative = Path::new(path.trim_start_matches('/'));
        // Reject anything that could climb out of the root.
        let traversal = relative.components().any(|component| {
            !matches!(component, Component::Normal(_) | Component::CurDir)
        });
        if traversal {
            return None;
        }
        tokio::fs::read(self.root.join(relative)).await.ok()
    }
}

/// Content type from the path's extension.
pub fn content_type_for(path: &str) -> &'static str {
    match path.rsplit_once('.').map(|(_, ext)| ext) {
        Some("css") => "text/css",
        Some("js") | Some("mjs") => "application/javascript",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("html") | Some("htm") => "text/html",
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}
