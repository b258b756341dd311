//! Navigation controller tests against an in-memory browsing surface.

use std::sync::{Arc, Mutex};

use adshield::{
    ContentShield, GuardInjector, InterceptDecision, ResourceRequest, ResourceType,
    ResponseInterceptor, RuleSet,
};
use adshield_shell::repl::{self, ReplCommand};
use adshield_shell::{NavigationController, NavigationResult, RenderContext};
use anyhow::Result;
use async_trait::async_trait;

// ─────────────────────── fake surface ───────────────────────

#[derive(Default)]
struct Record {
    /// Ordered log of what the surface was asked to do.
    events: Vec<String>,
    /// Scripts executed in the page.
    scripts: Vec<String>,
    /// Decision for every request the fake page raised.
    decisions: Vec<(String, InterceptDecision)>,
    closed: bool,
}

struct FakeContext {
    record: Arc<Mutex<Record>>,
    /// Resources every page load requests.
    resources: Vec<(String, ResourceType)>,
    interceptor: Option<Arc<ResponseInterceptor>>,
    injector: Option<Arc<GuardInjector>>,
    url: String,
}

impl FakeContext {
    fn new(record: Arc<Mutex<Record>>, resources: &[(&str, ResourceType)]) -> Self {
        Self {
            record,
            resources: resources
                .iter()
                .map(|(u, t)| (u.to_string(), *t))
                .collect(),
            interceptor: None,
            injector: None,
            url: "about:blank".into(),
        }
    }
}

#[async_trait]
impl RenderContext for FakeContext {
    async fn install_interceptor(&mut self, interceptor: Arc<ResponseInterceptor>) -> Result<()> {
        self.record.lock().unwrap().events.push("interceptor".into());
        self.interceptor = Some(interceptor);
        Ok(())
    }

    async fn install_guard(&mut self, injector: Arc<GuardInjector>) -> Result<()> {
        self.record.lock().unwrap().events.push("guard".into());
        self.injector = Some(injector);
        Ok(())
    }

    async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<NavigationResult> {
        let mut record = self.record.lock().unwrap();
        record.events.push(format!("navigate {url}"));

        let mut requests = vec![(url.to_string(), ResourceType::Document)];
        requests.extend(self.resources.iter().cloned());
        for (req_url, rt) in requests {
            let decision = match &self.interceptor {
                Some(i) => i.on_resource_requested(&ResourceRequest::new(req_url.clone(), rt)),
                None => InterceptDecision::Continue,
            };
            record.decisions.push((req_url, decision));
        }

        if let Some(injector) = &self.injector {
            record.scripts.push(injector.script_for_navigation());
        }
        self.url = url.to_string();

        Ok(NavigationResult {
            final_url: url.to_string(),
            load_time_ms: 1,
        })
    }

    async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
        self.record.lock().unwrap().scripts.push(script.to_string());
        Ok(serde_json::Value::Null)
    }

    async fn get_url(&self) -> Result<String> {
        Ok(self.url.clone())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.record.lock().unwrap().closed = true;
        Ok(())
    }
}

async fn controller(
    resources: &[(&str, ResourceType)],
) -> (NavigationController, Arc<Mutex<Record>>) {
    let record = Arc::new(Mutex::new(Record::default()));
    let ctx = FakeContext::new(Arc::clone(&record), resources);
    let controller = NavigationController::with_context(
        Box::new(ctx),
        ContentShield::new(RuleSet::builtin()),
        30_000,
    )
    .await
    .unwrap();
    (controller, record)
}

// ─────────────────────── tests ───────────────────────

#[tokio::test]
async fn test_filter_installed_before_first_navigation() {
    let (mut nav, record) = controller(&[]).await;
    nav.navigate("https://www.itv.com/").await.unwrap();

    let events = record.lock().unwrap().events.clone();
    assert_eq!(
        events,
        vec!["interceptor", "guard", "navigate https://www.itv.com/"]
    );
}

#[tokio::test]
async fn test_page_resources_filtered() {
    let (mut nav, record) = controller(&[
        ("https://ads.itv.com/banner.js", ResourceType::Script),
        ("https://www.itv.com/video/main.m3u8", ResourceType::Media),
        ("https://www.itv.com/adbreak1.m3u8", ResourceType::Media),
        ("https://cdn.doubleclick.net/tag", ResourceType::Xhr),
        ("https://www.itv.com/app.js", ResourceType::Script),
    ])
    .await;
    nav.navigate("https://www.itv.com/").await.unwrap();

    let record = record.lock().unwrap();
    let blocked: Vec<&str> = record
        .decisions
        .iter()
        .filter(|(_, d)| matches!(d, InterceptDecision::Fulfill(_)))
        .map(|(u, _)| u.as_str())
        .collect();
    assert_eq!(
        blocked,
        vec![
            "https://ads.itv.com/banner.js",
            "https://www.itv.com/adbreak1.m3u8",
            "https://cdn.doubleclick.net/tag",
        ]
    );

    let stats = nav.stats();
    assert_eq!(stats.blocked, 3);
    assert_eq!(stats.allowed, 3);
}

#[tokio::test]
async fn test_guard_reinjected_on_every_navigation() {
    let (mut nav, record) = controller(&[]).await;
    nav.navigate("https://www.itv.com/").await.unwrap();
    nav.navigate("https://www.itv.com/watch/show").await.unwrap();

    let scripts = record.lock().unwrap().scripts.clone();
    assert_eq!(scripts.len(), 2);
    assert!(scripts.iter().all(|s| s.contains(r#""adGlobals":["ITVAds"]"#)));
    assert_eq!(nav.navigations(), 2);
}

#[tokio::test]
async fn test_replaced_rules_apply_from_next_navigation() {
    let (mut nav, record) = controller(&[]).await;
    nav.navigate("https://www.itv.com/").await.unwrap();
    nav.shield().store().replace(RuleSet::default());
    nav.navigate("https://ads.itv.com/").await.unwrap();

    let record = record.lock().unwrap();
    assert!(record.scripts[0].contains(".itv-ad"));
    assert!(!record.scripts[1].contains(".itv-ad"));
    assert_eq!(
        record.decisions.last().unwrap().1,
        InterceptDecision::Continue
    );
}

#[tokio::test]
async fn test_keyboard_lazily_opened_and_closed() {
    let (mut nav, record) = controller(&[]).await;
    assert!(nav.keyboard().is_none());

    nav.send_key("a").await.unwrap();
    nav.send_key("<").await.unwrap();
    assert_eq!(nav.keyboard().map(|k| k.keys_sent()), Some(2));

    // Showing again reuses the open keyboard.
    nav.show_keyboard();
    assert_eq!(nav.keyboard().map(|k| k.keys_sent()), Some(2));

    assert!(nav.close_keyboard());
    assert!(!nav.close_keyboard());
    assert!(nav.keyboard().is_none());

    let scripts = record.lock().unwrap().scripts.clone();
    assert!(scripts[0].contains(r#"s.value+="a";"#));
    assert!(scripts[1].contains("s.value.slice(0,-1)"));
}

#[tokio::test]
async fn test_console_types_and_navigates() {
    let (mut nav, record) = controller(&[]).await;

    assert!(repl::execute(&mut nav, ReplCommand::parse("/go https://www.itv.com/"), None).await);
    assert!(repl::execute(&mut nav, ReplCommand::parse("hi"), None).await);
    assert!(repl::execute(&mut nav, ReplCommand::parse("/reload"), None).await);
    assert!(!repl::execute(&mut nav, ReplCommand::parse("/exit"), None).await);

    assert_eq!(nav.current_url().await.unwrap(), "https://www.itv.com/");
    assert_eq!(nav.keyboard().map(|k| k.keys_sent()), Some(2));
    // one guard script plus two keys
    assert_eq!(record.lock().unwrap().scripts.len(), 3);
}

#[tokio::test]
async fn test_console_text_is_literal() {
    let (mut nav, record) = controller(&[]).await;

    assert!(repl::execute(&mut nav, ReplCommand::parse("a<b"), None).await);
    assert!(repl::execute(&mut nav, ReplCommand::parse("/back"), None).await);

    let scripts = record.lock().unwrap().scripts.clone();
    assert_eq!(scripts.len(), 4);
    assert!(scripts[0].contains(r#"s.value+="a";"#));
    assert!(scripts[1].contains(r#"s.value+="<";"#));
    assert!(scripts[2].contains(r#"s.value+="b";"#));
    assert!(scripts[3].contains("s.value.slice(0,-1)"));
    assert_eq!(nav.keyboard().map(|k| k.keys_sent()), Some(4));
}

#[test]
fn test_close_releases_surface() {
    tokio_test::block_on(async {
        let (nav, record) = controller(&[]).await;
        nav.close().await.unwrap();
        assert!(record.lock().unwrap().closed);
    });
}
