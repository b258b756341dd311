//! Renderer abstraction for the hosted browsing surface.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide).

pub mod chromium;

use std::sync::Arc;

use adshield::{GuardInjector, ResponseInterceptor};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// A browser engine that can create browsing surfaces.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browsing surface (tab or window).
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<()>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
}

/// A single browsing surface.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Route every outbound request of every resource type through
    /// `interceptor`. Must be called before the first navigation.
    async fn install_interceptor(&mut self, interceptor: Arc<ResponseInterceptor>) -> Result<()>;
    /// Run the guard script from `injector` after every completed navigation.
    async fn install_guard(&mut self, injector: Arc<GuardInjector>) -> Result<()>;
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;
    /// Execute JavaScript in the page context and return the result.
    async fn execute_js(&self, script: &str) -> Result<serde_json::Value>;
    /// Get the current URL.
    async fn get_url(&self) -> Result<String>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A no-op renderer used when Chromium is unavailable.
///
/// Offline commands (`check`, `guard`, `sweep`, `rules`) work without a
/// browser; only `run` needs a real one.
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        Err(anyhow::anyhow!("Browser not available; run `adshield-shell doctor`"))
    }
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
    fn active_contexts(&self) -> usize {
        0
    }
}
