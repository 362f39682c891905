// src/plugins/dispatch.rs — Fan a submitted page out to matching plugins

use std::sync::Arc;

use url::Url;

use crate::infra::errors::RelayError;
use crate::plugins::context::{
    DataItem, Notification, NotificationSink, RequestContext, SiteInfo,
};
use crate::plugins::loader::{LoadOutcome, PluginDescriptor};
use crate::utils::Utils;

/// Result of one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// True iff at least one matched handler was invoked, even if it failed.
    pub matched_any: bool,
    pub notifications: Vec<Notification>,
}

/// Percent-decode the site, keeping the raw text when decoding fails.
pub fn decode_site(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Strip at most one trailing slash.
pub fn strip_slash(s: &str) -> &str {
    s.strip_suffix('/').unwrap_or(s)
}

/// Break a (decoded) site URL down. The match target is origin + path with
/// one trailing slash stripped; an unparseable site yields empty parts.
pub fn site_info(url: &str) -> SiteInfo {
    match Url::parse(url) {
        Ok(parsed) => {
            let origin = parsed.origin().ascii_serialization();
            let pathname = parsed.path().to_string();
            let root_url = strip_slash(&format!("{origin}{pathname}")).to_string();
            SiteInfo {
                url: url.to_string(),
                root_url,
                origin,
                pathname,
            }
        }
        Err(_) => SiteInfo {
            url: url.to_string(),
            ..SiteInfo::default()
        },
    }
}

/// Whether any of `prefixes` is a literal prefix of `target`.
pub fn matches(prefixes: &[String], target: &str) -> bool {
    prefixes
        .iter()
        .any(|p| target.starts_with(strip_slash(p)))
}

/// Routes submitted pages to plugins.
///
/// The plugin list is fixed at startup, so dispatch needs no locking.
#[derive(Clone)]
pub struct Dispatcher {
    catalog: Arc<LoadOutcome>,
    utils: Utils,
}

impl Dispatcher {
    pub fn new(catalog: Arc<LoadOutcome>, utils: Utils) -> Self {
        Self { catalog, utils }
    }

    pub fn catalog(&self) -> &LoadOutcome {
        &self.catalog
    }

    pub fn utils(&self) -> &Utils {
        &self.utils
    }

    /// Plugins whose prefixes match `site`, in load order.
    pub fn matching<'a>(&'a self, site: &'a SiteInfo) -> impl Iterator<Item = &'a PluginDescriptor> {
        self.catalog
            .plugins
            .iter()
            .filter(move |p| matches(&p.url_prefixes, &site.root_url))
    }

    /// Invoke every matching plugin, one after another.
    ///
    /// A failing handler is logged and does not stop the rest.
    pub async fn dispatch(&self, site: &str, data: Vec<DataItem>) -> DispatchOutcome {
        let url = decode_site(site);
        let site = site_info(&url);
        let mut outcome = DispatchOutcome::default();

        for plugin in self.matching(&site) {
            let sink = NotificationSink::new();
            let log = plugin.log.with_sink(sink.clone());
            log.info(&format!("handling {}", site.url));

            let ctx = RequestContext {
                site: site.clone(),
                data: data.clone(),
                utils: self.utils.clone(),
            };
            if let Err(e) = plugin.handler.on_request(ctx, log.clone()).await {
                let err = RelayError::Handler {
                    plugin: plugin.name.clone(),
                    message: format!("{e:#}"),
                };
                log.warn(&err.to_string());
            }
            outcome.matched_any = true;

            outcome
                .notifications
                .extend(sink.drain().into_iter().map(|n| Notification {
                    plugin: plugin.name.clone(),
                    ..n
                }));
            log.info("done");
        }

        if !outcome.matched_any {
            tracing::info!("No plugin handled {}", url);
        }
        outcome
    }
}
