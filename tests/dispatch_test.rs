// tests/dispatch_test.rs — Integration test: fan-out of submitted pages

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use siterelay::plugins::context::{DataItem, PluginLog, RequestContext, Severity};
use siterelay::plugins::{Dispatcher, LoadOutcome, PluginDescriptor, PluginHandler};
use siterelay::utils::Utils;

type Calls = Arc<Mutex<Vec<String>>>;

/// Records each call; optionally notifies, optionally fails afterwards.
struct Tracked {
    id: &'static str,
    calls: Calls,
    notify: Option<(&'static str, Severity)>,
    fail: bool,
}

#[async_trait]
impl PluginHandler for Tracked {
    async fn on_request(&self, ctx: RequestContext, log: PluginLog) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.id, ctx.site.root_url));
        if let Some((info, severity)) = self.notify {
            log.to_web(info, severity);
        }
        if self.fail {
            anyhow::bail!("{} blew up", self.id);
        }
        Ok(())
    }
}

fn tracked(id: &'static str, calls: &Calls, prefixes: &[&str]) -> PluginDescriptor {
    tracked_with(id, calls, prefixes, None, false)
}

fn tracked_with(
    id: &'static str,
    calls: &Calls,
    prefixes: &[&str],
    notify: Option<(&'static str, Severity)>,
    fail: bool,
) -> PluginDescriptor {
    PluginDescriptor::native(
        id,
        Arc::new(Tracked {
            id,
            calls: calls.clone(),
            notify,
            fail,
        }),
    )
    .with_prefixes(prefixes.iter().copied())
}

fn dispatcher(plugins: Vec<PluginDescriptor>) -> Dispatcher {
    Dispatcher::new(
        Arc::new(LoadOutcome {
            plugins,
            inactive: Vec::new(),
        }),
        Utils::default(),
    )
}

fn item() -> Vec<DataItem> {
    vec![DataItem {
        label: "title".into(),
        value: "x".into(),
        images: vec![],
    }]
}

#[tokio::test]
async fn test_trailing_slash_prefix_matches_origin() {
    let calls = Calls::default();
    let d = dispatcher(vec![tracked("a", &calls, &["http://a.com/"])]);

    let outcome = d.dispatch("http://a.com", item()).await;
    assert!(outcome.matched_any);
    assert_eq!(*calls.lock().unwrap(), vec!["a:http://a.com"]);
}

#[tokio::test]
async fn test_path_prefix_requires_extension_of_exact_prefix() {
    let calls = Calls::default();
    let d = dispatcher(vec![tracked("sub", &calls, &["http://a.com/sub"])]);

    assert!(!d.dispatch("http://a.com", item()).await.matched_any);
    assert!(!d.dispatch("http://a.com/other", item()).await.matched_any);
    assert!(d.dispatch("http://a.com/sub", item()).await.matched_any);
    assert!(d.dispatch("http://a.com/sub/1", item()).await.matched_any);
    assert_eq!(calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_failure_does_not_suppress_later_match() {
    let calls = Calls::default();
    let d = dispatcher(vec![
        tracked_with("first", &calls, &["http://a.com"], Some(("partial", Severity::Warn)), true),
        tracked_with("second", &calls, &["http://a.com/"], Some(("saved", Severity::Success)), false),
        tracked("other", &calls, &["http://b.com"]),
    ]);

    let outcome = d.dispatch("http://a.com/page", item()).await;
    assert!(outcome.matched_any);
    assert_eq!(
        *calls.lock().unwrap(),
        vec!["first:http://a.com/page", "second:http://a.com/page"]
    );

    let got: Vec<(&str, &str, Severity)> = outcome
        .notifications
        .iter()
        .map(|n| (n.plugin.as_str(), n.info.as_str(), n.severity))
        .collect();
    assert_eq!(
        got,
        vec![
            ("first", "partial", Severity::Warn),
            ("second", "saved", Severity::Success),
        ]
    );
}

#[tokio::test]
async fn test_failing_only_match_still_counts() {
    let calls = Calls::default();
    let d = dispatcher(vec![tracked_with("bad", &calls, &["http://a.com"], None, true)]);

    let outcome = d.dispatch("http://a.com", item()).await;
    assert!(outcome.matched_any);
    assert!(outcome.notifications.is_empty());
}

#[tokio::test]
async fn test_no_match() {
    let calls = Calls::default();
    let d = dispatcher(vec![tracked("a", &calls, &["http://a.com"])]);

    let outcome = d.dispatch("https://elsewhere.org/x", item()).await;
    assert!(!outcome.matched_any);
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_percent_encoded_site_is_decoded() {
    let calls = Calls::default();
    let d = dispatcher(vec![tracked("a", &calls, &["http://a.com/%E4%B8%AD"])]);

    // Decoded text reaches the plugin; the URL parser re-encodes the path.
    let outcome = d.dispatch("http%3A%2F%2Fa.com%2F%E4%B8%AD", item()).await;
    assert!(outcome.matched_any);
}

#[tokio::test]
async fn test_repeated_dispatch_is_stable() {
    let calls = Calls::default();
    let d = dispatcher(vec![tracked("a", &calls, &["http://a.com/"])]);

    for _ in 0..3 {
        assert!(d.dispatch("http://a.com/", item()).await.matched_any);
    }
    assert_eq!(d.catalog().plugins[0].url_prefixes, vec!["http://a.com/"]);
}
