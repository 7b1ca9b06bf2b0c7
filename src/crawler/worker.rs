//! Per-resource processing
//!
//! One call to [`process`] handles one claimed resource end to end: fetch,
//! destination claim, optional drilldown, write, and outcome reporting.
//! Everything a task needs travels in a shared [`CrawlContext`].

use crate::config::CrawlSettings;
use crate::crawler::fetcher::{fetch_url, FetchResult};
use crate::crawler::parser::{extract_css_references, extract_links};
use crate::logging::{CrawlLogger, Severity};
use crate::output::RunStatistics;
use crate::state::{CrawlState, FetchOutcome, QueuedUrl};
use crate::storage::{rename_reference, FileStore};
use crate::url::{
    classify_link, is_drilldown_target, is_stylesheet, normalize_link, LinkOrigin, NormalizedLink,
    ResourceKind,
};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// Shared, read-mostly context for every worker task in a run
pub struct CrawlContext {
    pub settings: CrawlSettings,
    pub client: Client,
    pub state: CrawlState,
    pub stats: RunStatistics,
    pub logger: Arc<dyn CrawlLogger>,
    pub store: Arc<dyn FileStore>,
}

impl CrawlContext {
    fn destination_for(&self, queued: &QueuedUrl) -> PathBuf {
        queued.destination.clone().unwrap_or_else(|| {
            self.store
                .map_url_to_local_path(&self.settings.output_root, &queued.url)
        })
    }
}

/// What became of a fetch before anything was written
enum Fetched {
    /// The caller owns the destination and must write `body`
    Claimed { final_url: Url, body: Vec<u8> },
    /// Timed out and was put back on the frontier
    Requeued,
    /// Skipped or failed; already reported
    Dropped,
}

/// Processes one claimed resource
///
/// # Flow
///
/// 1. Fetch the resource
/// 2. Claim its destination path (at most one write per path per run)
/// 3. Pages: extract and normalize links; stylesheets: fetch and rewrite
///    their `url()` references. Both resolve against the URL the server
///    finally answered from.
/// 4. Write the (possibly rewritten) body
/// 5. Pages only: route discovered links to the frontier or auxiliary set
pub async fn process(ctx: Arc<CrawlContext>, queued: QueuedUrl) {
    let destination = ctx.destination_for(&queued);
    let Fetched::Claimed { final_url, body } = fetch_body(&ctx, &queued, &destination).await else {
        return;
    };

    match queued.kind {
        ResourceKind::Page if is_drilldown_target(&queued.url, &ctx.settings) => {
            let links = collect_links(&ctx, &final_url, &body);
            if save(&ctx, &queued, body, destination).await {
                route_links(&ctx, links);
            }
        }
        ResourceKind::Auxiliary if is_stylesheet(&queued.url, &ctx.settings) => {
            let contents = rewrite_stylesheet(&ctx, &final_url, &body).await;
            save(&ctx, &queued, contents, destination).await;
        }
        _ => {
            save(&ctx, &queued, body, destination).await;
        }
    }
}

/// Fetches `queued` and claims `destination`
///
/// Anything other than [`Fetched::Claimed`] has already been reported.
async fn fetch_body(ctx: &CrawlContext, queued: &QueuedUrl, destination: &Path) -> Fetched {
    let outcome = match fetch_url(&ctx.client, &queued.url, &ctx.settings.base_host).await {
        FetchResult::Success {
            final_url,
            status_code,
            body,
        } => {
            if final_url != queued.url {
                ctx.logger.insignificant(&format!(
                    "{} answered from {} (HTTP {})",
                    queued.url, final_url, status_code
                ));
            }
            if ctx.state.try_claim_path(destination) {
                return Fetched::Claimed { final_url, body };
            }
            FetchOutcome::SkippedDuplicatePath(destination.to_path_buf())
        }
        FetchResult::RedirectOffDomain { host, .. } => FetchOutcome::SkippedOutOfDomain(host),
        FetchResult::HttpError { status_code } => FetchOutcome::FailedHttpStatus(status_code),
        FetchResult::Timeout { error } => FetchOutcome::FailedTransient(error),
        FetchResult::NetworkError { error } => FetchOutcome::FailedOther(error),
    };

    if record_outcome(ctx, queued, outcome) {
        Fetched::Requeued
    } else {
        Fetched::Dropped
    }
}

/// Writes `contents` to `destination`; true if the file was written
async fn save(ctx: &CrawlContext, queued: &QueuedUrl, contents: Vec<u8>, destination: PathBuf) -> bool {
    let outcome = match ctx.store.save_file(contents, &destination).await {
        Ok(()) => FetchOutcome::Saved(destination),
        Err(e) => FetchOutcome::FailedOther(format!(
            "failed to write {}: {}",
            destination.display(),
            e
        )),
    };

    let saved = outcome.is_success();
    record_outcome(ctx, queued, outcome);
    saved
}

/// Logs an outcome and folds it into the run statistics
///
/// Returns true if the resource was requeued instead.
fn record_outcome(ctx: &CrawlContext, queued: &QueuedUrl, outcome: FetchOutcome) -> bool {
    let mut message = format!("{} {}", queued.url, outcome);

    if outcome.is_retryable() && ctx.settings.retry_on_timeout {
        match requeue_after_timeout(ctx, queued) {
            Ok(()) => return true,
            Err(attempts) => {
                message.push_str(&format!(" (giving up after {} attempts)", attempts));
            }
        }
    }

    match outcome.severity() {
        Severity::Success => ctx.stats.record_download(),
        Severity::Warning => ctx.stats.record_warning(message.clone()),
        Severity::Error => ctx.stats.record_error(message.clone()),
        _ => {}
    }

    ctx.logger.log(outcome.severity(), &message, None);
    false
}

/// Un-claims a timed-out resource and puts it back on the frontier
///
/// The resource keeps its kind and destination. Fails with the number of
/// attempts made once the retry ceiling is exceeded.
fn requeue_after_timeout(ctx: &CrawlContext, queued: &QueuedUrl) -> Result<(), u32> {
    let timeouts = ctx.state.record_timeout(&queued.key);
    if let Some(max) = ctx.settings.max_timeout_retries {
        if timeouts > max {
            return Err(timeouts);
        }
    }

    ctx.state.release(&queued.key);
    ctx.state.enqueue(queued.clone());

    let message = format!(
        "{} timed out; requeued for attempt {}",
        queued.url,
        timeouts + 1
    );
    ctx.stats.record_warning(message.clone());
    ctx.logger.warning(&message);
    Ok(())
}

/// Extracts and normalizes the links of a downloaded page
///
/// Links that fail resolution or leave the mirrored host are dropped and
/// logged as insignificant.
fn collect_links(ctx: &CrawlContext, page_url: &Url, body: &[u8]) -> Vec<(LinkOrigin, NormalizedLink)> {
    let html = String::from_utf8_lossy(body);
    let extracted = extract_links(&html);

    let mut links = Vec::with_capacity(extracted.len());
    for (origin, raw) in extracted.iter() {
        match normalize_link(raw, page_url, &ctx.settings.base_host) {
            Ok(link) => links.push((origin, link)),
            Err(e) => ctx
                .logger
                .insignificant(&format!("Dropping link '{}' on {}: {}", raw, page_url, e)),
        }
    }

    links
}

/// Sends page links to the frontier and everything else to the auxiliary set
fn route_links(ctx: &CrawlContext, links: Vec<(LinkOrigin, NormalizedLink)>) {
    let mut pages = 0;
    let mut auxiliary = 0;

    for (origin, link) in links {
        if ctx.state.is_visited(&link.key) {
            continue;
        }

        match classify_link(origin, &link.url, &ctx.settings) {
            ResourceKind::Page => {
                ctx.state.enqueue(QueuedUrl::from_link(&link, ResourceKind::Page));
                pages += 1;
            }
            ResourceKind::Auxiliary => {
                if ctx
                    .state
                    .add_auxiliary(QueuedUrl::from_link(&link, ResourceKind::Auxiliary))
                {
                    auxiliary += 1;
                }
            }
        }
    }

    if pages + auxiliary > 0 {
        ctx.logger.insignificant(&format!(
            "Queued {} page link(s) and {} auxiliary resource(s)",
            pages, auxiliary
        ));
    }
}

/// Fetches the `url()` references of a stylesheet and rewrites it
///
/// References with a query string are stored under a collision-safe name and
/// the reference text is rewritten to match. Only the reference bytes change;
/// everything else, line endings and non-UTF-8 text included, is copied as is.
async fn rewrite_stylesheet(ctx: &CrawlContext, stylesheet_url: &Url, body: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(body.len());
    let mut rewritten = 0;

    for line in body.split_inclusive(|&b| b == b'\n') {
        let references = extract_css_references(line);
        let mut last = 0;

        for reference in references {
            let replacement = fetch_css_reference(ctx, stylesheet_url, &reference.raw).await;
            if let Some(replacement) = replacement {
                output.extend_from_slice(&line[last..reference.range.start]);
                output.extend_from_slice(replacement.as_bytes());
                last = reference.range.end;
                rewritten += 1;
            }
        }

        output.extend_from_slice(&line[last..]);
    }

    if rewritten > 0 {
        ctx.logger.normal(&format!(
            "Rewrote {} reference(s) in {}",
            rewritten, stylesheet_url
        ));
    }
    output
}

/// Fetches one stylesheet reference; returns its replacement text if renamed
async fn fetch_css_reference(ctx: &CrawlContext, stylesheet_url: &Url, raw: &str) -> Option<String> {
    let link = match normalize_link(raw, stylesheet_url, &ctx.settings.base_host) {
        Ok(link) => link,
        Err(e) => {
            ctx.logger.insignificant(&format!(
                "Dropping reference '{}' in {}: {}",
                raw, stylesheet_url, e
            ));
            return None;
        }
    };

    let mapped = ctx
        .store
        .map_url_to_local_path(&ctx.settings.output_root, &link.url);

    if !link.has_query() {
        let queued = QueuedUrl {
            url: link.url.clone(),
            key: link.key.clone(),
            kind: ResourceKind::Auxiliary,
            destination: Some(mapped),
        };
        fetch_auxiliary(ctx, queued).await;
        return None;
    }

    let key = link.query_key();
    let mut modified_reference = None;
    let (destination, first_use) = ctx.state.derived_path(&key, || {
        let (reference, path) = ctx.store.modify_paths(raw, &mapped);
        modified_reference = Some(reference);
        path
    })?;
    let reference = modified_reference.unwrap_or_else(|| rename_reference(raw, &mapped, &destination));

    if reference == raw {
        let message = format!(
            "{}: cannot rewrite reference '{}' to a collision-safe name",
            stylesheet_url, raw
        );
        ctx.stats.record_warning(message.clone());
        ctx.logger.warning(&message);
        return None;
    }

    if first_use {
        let queued = QueuedUrl::with_destination(link.original.clone(), key.clone(), destination);
        if !fetch_auxiliary(ctx, queued).await {
            ctx.state.abandon_derived_path(&key);
            ctx.logger.insignificant(&format!(
                "{}: keeping reference '{}' since its variant was not saved",
                stylesheet_url, raw
            ));
            return None;
        }
    }

    Some(reference)
}

/// Claims and fetches a resource referenced from a stylesheet, without drilldown
///
/// Returns true if the resource was written or requeued for a later round.
async fn fetch_auxiliary(ctx: &CrawlContext, queued: QueuedUrl) -> bool {
    if !ctx.state.try_claim(&queued.key) {
        let outcome = FetchOutcome::SkippedDuplicateVisit;
        ctx.logger
            .log(outcome.severity(), &format!("{} {}", queued.url, outcome), None);
        return false;
    }

    let destination = ctx.destination_for(&queued);
    match fetch_body(ctx, &queued, &destination).await {
        Fetched::Claimed { body, .. } => save(ctx, &queued, body, destination).await,
        Fetched::Requeued => true,
        Fetched::Dropped => false,
    }
}
