//! Full-page redirect seam

use parking_lot::RwLock;
use std::sync::Arc;
use url::Url;

/// Performs the browser-level navigation to a provider endpoint
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &Url);
}

/// Logs redirects and remembers them so the front end can surface the link
#[derive(Default)]
pub struct LogNavigator {
    visited: Arc<RwLock<Vec<Url>>>,
}

impl LogNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<Url> {
        self.visited.read().last().cloned()
    }

    pub fn visited(&self) -> Vec<Url> {
        self.visited.read().clone()
    }
}

impl Navigator for LogNavigator {
    fn navigate(&self, url: &Url) {
        tracing::info!(url = %url, "Redirecting to identity provider");
        self.visited.write().push(url.clone());
    }
}

impl Clone for LogNavigator {
    fn clone(&self) -> Self {
        Self {
            visited: Arc::clone(&self.visited),
        }
    }
}
