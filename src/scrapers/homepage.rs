//! Homepage anchor discovery.
//!
//! Downloads the source's base URL once and keeps the anchors the classifier
//! accepts, up to half of the per-source link budget.

use super::{Discovery, DiscoveryContext, Strategy, collect_article_links, get_once};
use crate::http::HttpClient;
use tracing::{info, instrument, warn};

#[instrument(level = "info", skip(ctx))]
pub async fn discover<C: HttpClient>(ctx: DiscoveryContext<'_, C>, base_url: &str) -> Discovery {
    let mut discovery = Discovery::new(Strategy::Homepage);
    if ctx.cancel.is_cancelled() {
        return discovery;
    }

    let resp = match get_once(ctx.client, base_url).await {
        Ok(resp) => resp,
        Err(e) => {
            discovery.record(e);
            return discovery;
        }
    };
    if !resp.is_success() {
        warn!(status = resp.status, "Homepage answered with an error status");
        return discovery;
    }

    let cap = (ctx.limits.max_links / 2).max(1);
    collect_article_links(&resp.body, base_url, ctx.classifier, ctx.policy, cap, &mut discovery);
    info!(count = discovery.len(), cap, "Homepage discovery finished");
    discovery
}
