//! Chromium-based renderer using chromiumoxide.
//!
//! Request filtering rides on the CDP Fetch domain: every request is paused at
//! the request stage and answered with either `Fetch.continueRequest` or
//! `Fetch.fulfillRequest`. The guard runs on every `Page.loadEventFired`.

use super::{NavigationResult, RenderContext, Renderer};
use adshield::{
    GuardInjector, InterceptDecision, ResourceRequest, ResourceType, ResponseInterceptor,
    SyntheticResponse,
};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose;
use base64::Engine;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::fetch::{
    self, ContinueRequestParams, EventRequestPaused, FulfillRequestParams, HeaderEntry,
    RequestId, RequestPattern, RequestStage,
};
use chromiumoxide::cdp::browser_protocol::page::EventLoadEventFired;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. ADSHIELD_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("ADSHIELD_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. System PATH
    for name in [
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
        "msedge",
    ] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 3. Common install locations
    let common: &[&str] = if cfg!(target_os = "macos") {
        &["/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"]
    } else if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
        ]
    } else {
        &[]
    };
    common.iter().map(PathBuf::from).find(|p| p.exists())
}

/// Chromium-based renderer.
pub struct ChromiumRenderer {
    browser: Browser,
    handler_task: JoinHandle<()>,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    /// Launch Chromium with a persistent profile in `profile_dir`.
    pub async fn launch(profile_dir: &Path, headless: bool) -> Result<Self> {
        let chrome_path = find_chromium()
            .context("Chromium not found. Install Chrome or set ADSHIELD_CHROMIUM_PATH.")?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .user_data_dir(profile_dir)
            .arg("--disable-extensions")
            .arg("--autoplay-policy=no-user-gesture-required");
        if headless {
            builder = builder.arg("--headless=new").arg("--disable-gpu");
        } else {
            builder = builder.with_head().viewport(None);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("browser handler error: {e}");
                }
            }
        });

        Ok(Self {
            browser,
            handler_task,
            active_count: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;

        self.active_count.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(ChromiumContext {
            page,
            active_count: Arc::clone(&self.active_count),
            tasks: Vec::new(),
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        self.handler_task.abort();
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// A single Chromium page context.
pub struct ChromiumContext {
    page: Page,
    active_count: Arc<AtomicUsize>,
    tasks: Vec<JoinHandle<()>>,
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn install_interceptor(&mut self, interceptor: Arc<ResponseInterceptor>) -> Result<()> {
        // Subscribe before enabling so no paused request goes unanswered.
        let mut paused = self
            .page
            .event_listener::<EventRequestPaused>()
            .await
            .context("failed to subscribe to paused requests")?;

        self.page
            .execute(
                fetch::EnableParams::builder()
                    .pattern(
                        RequestPattern::builder()
                            .url_pattern("*")
                            .request_stage(RequestStage::Request)
                            .build(),
                    )
                    .build(),
            )
            .await
            .context("failed to enable request interception")?;

        let page = self.page.clone();
        self.tasks.push(tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let request = ResourceRequest::new(
                    event.request.url.clone(),
                    ResourceType::from_name(event.resource_type.as_ref()),
                );
                let answered = match interceptor.on_resource_requested(&request) {
                    InterceptDecision::Continue => page
                        .execute(ContinueRequestParams::new(event.request_id.clone()))
                        .await
                        .map(|_| ()),
                    InterceptDecision::Fulfill(response) => page
                        .execute(fulfill_params(event.request_id.clone(), &response))
                        .await
                        .map(|_| ()),
                };
                if let Err(e) = answered {
                    tracing::warn!(url = %request.url, "failed to answer paused request: {e}");
                }
            }
        }));

        Ok(())
    }

    async fn install_guard(&mut self, injector: Arc<GuardInjector>) -> Result<()> {
        let mut loads = self
            .page
            .event_listener::<EventLoadEventFired>()
            .await
            .context("failed to subscribe to load events")?;

        let page = self.page.clone();
        self.tasks.push(tokio::spawn(async move {
            while loads.next().await.is_some() {
                let script = injector.script_for_navigation();
                if let Err(e) = page.evaluate(script).await {
                    tracing::warn!("guard injection failed: {e}");
                }
            }
        }));

        Ok(())
    }

    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        let start = Instant::now();

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(timeout_ms),
            self.page.goto(url),
        )
        .await;

        let load_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(_)) => {
                let final_url = self
                    .page
                    .url()
                    .await
                    .unwrap_or_default()
                    .unwrap_or_else(|| url.to_string());

                Ok(NavigationResult {
                    final_url,
                    load_time_ms,
                })
            }
            Ok(Err(e)) => bail!("navigation failed: {e}"),
            Err(_) => bail!("navigation timed out after {timeout_ms}ms"),
        }
    }

    async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .context("JS execution failed")?;

        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn get_url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .context("failed to get URL")?
            .unwrap_or_default();
        Ok(url)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        for task in &self.tasks {
            task.abort();
        }
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        self.page
            .clone()
            .close()
            .await
            .context("failed to close page")?;
        Ok(())
    }
}

/// Build the CDP fulfill command for a synthetic response.
fn fulfill_params(request_id: RequestId, response: &SyntheticResponse) -> FulfillRequestParams {
    let mut params = FulfillRequestParams::new(request_id, i64::from(response.status));
    params.response_phrase = Some(response.reason.clone());
    params.response_headers = Some(
        response
            .headers
            .iter()
            .map(|(name, value)| HeaderEntry {
                name: name.clone(),
                value: value.clone(),
            })
            .collect(),
    );
    params.body = Some(general_purpose::STANDARD.encode(&response.body).into());
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use adshield::{ContentShield, RuleSet};

    #[test]
    fn test_fulfill_params_for_blocked_response() {
        let params = fulfill_params(RequestId::new("interception-1"), &SyntheticResponse::blocked());
        assert_eq!(params.response_code, 403);
        assert_eq!(params.response_phrase.as_deref(), Some("Blocked"));
        let headers = params.response_headers.unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].name, "Content-Type");
        assert_eq!(headers[0].value, "text/plain");
    }

    const GUARDED_PAGE: &str = "data:text/html,<script>var ITVAds={showAds:true};</script>\
        <div class=\"itv-ad\">ad</div><p id=\"keep\">ok</p>";

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_blocks_and_guards() {
        let profile = tempfile::tempdir().unwrap();
        let renderer = ChromiumRenderer::launch(profile.path(), true)
            .await
            .expect("failed to launch Chromium");
        let shield = ContentShield::new(RuleSet::builtin());

        let mut ctx = renderer.new_context().await.expect("failed to create context");
        ctx.install_interceptor(shield.interceptor()).await.unwrap();
        ctx.install_guard(shield.injector()).await.unwrap();

        ctx.navigate(GUARDED_PAGE, 10_000)
            .await
            .expect("navigation failed");
        tokio::time::sleep(std::time::Duration::from_millis(800)).await;

        // DOM sweep
        let remaining = ctx
            .execute_js("document.querySelectorAll('.itv-ad').length")
            .await
            .unwrap();
        assert_eq!(remaining, serde_json::json!(0));
        let kept = ctx
            .execute_js("document.getElementById('keep').textContent")
            .await
            .unwrap();
        assert_eq!(kept, serde_json::json!("ok"));

        // The page declared ITVAds itself; it must still end up read-only.
        let writable = ctx
            .execute_js("Object.getOwnPropertyDescriptor(window, 'ITVAds').writable")
            .await
            .unwrap();
        assert_eq!(writable, serde_json::json!(false));
        let reassigned = ctx
            .execute_js("ITVAds = {showAds: 'again'}; JSON.stringify(window.ITVAds)")
            .await
            .unwrap();
        assert_eq!(reassigned, serde_json::json!("{}"));

        // fetch to a hooked host never settles
        ctx.execute_js(
            "window.__fetchState = 'pending'; \
             fetch('https://ads.itv.com/x').then(\
               function () { window.__fetchState = 'resolved'; },\
               function () { window.__fetchState = 'rejected'; }); \
             true",
        )
        .await
        .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        let state = ctx.execute_js("window.__fetchState").await.unwrap();
        assert_eq!(state, serde_json::json!("pending"));

        // XHR open to a hooked host is a no-op; other hosts still open.
        let hooked = ctx
            .execute_js(
                "var x = new XMLHttpRequest(); x.open('GET', 'https://ads.itv.com/y'); x.readyState",
            )
            .await
            .unwrap();
        assert_eq!(hooked, serde_json::json!(0));
        let normal = ctx
            .execute_js(
                "var y = new XMLHttpRequest(); y.open('GET', 'https://www.itv.com/'); y.readyState",
            )
            .await
            .unwrap();
        assert_eq!(normal, serde_json::json!(1));

        ctx.close().await.unwrap();
        assert_eq!(renderer.active_contexts(), 0);
        renderer.shutdown().await.unwrap();
    }
}
