use crate::config::{ConfigError, FetcherConfig};
use crate::gate::RateGate;
use crate::http::{classify, AttemptOutcome, HttpSend, RequestSpec};
use crate::pagination::PaginationConfig;
use futures::future::join_all;
use log::{debug, error, info, warn};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use uuid::Uuid;

/// Bounded-concurrency request executor with retry and page fan-out.
///
/// Every call to [`Fetcher::request`] holds one permit of a shared semaphore for
/// its whole retry loop, so pagination fan-out is capped like any other caller.
pub struct Fetcher<S> {
    sender: S,
    gate: Arc<RateGate>,
    permits: Arc<Semaphore>,
    max_retries: u32,
    pagination: PaginationConfig,
}

impl<S: HttpSend + Sync> Fetcher<S> {
    pub fn new(sender: S, cfg: FetcherConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self {
            sender,
            gate: Arc::new(RateGate::new()),
            permits: Arc::new(Semaphore::new(cfg.concurrency)),
            max_retries: cfg.max_retries,
            pagination: cfg.pagination,
        })
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    pub fn gate(&self) -> &Arc<RateGate> {
        &self.gate
    }

    pub fn pagination(&self) -> &PaginationConfig {
        &self.pagination
    }

    /// Run one logical request. `None` means every attempt failed.
    pub async fn request(&self, spec: &RequestSpec) -> Option<Value> {
        let request_id = Uuid::new_v4();
        info!("Making request to {} - Request ID: {}", spec.url, request_id);
        // Closed only if the semaphore is dropped, which cannot happen while &self lives.
        let Ok(_permit) = self.permits.acquire().await else {
            error!("Concurrency limiter closed - Request ID: {}", request_id);
            return None;
        };

        let mut last_failure = String::from("no attempt made");
        for attempt in 1..=self.max_retries {
            self.gate.await_clear().await;
            debug!(
                "Request to {} - Request ID: {}. Params: {:?} - Attempt: {}/{}",
                spec.url, request_id, spec.params, attempt, self.max_retries
            );
            let resp = match self.sender.send(spec).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(
                        "Error in request to {} - Request ID: {}. Error: {}",
                        spec.url, request_id, e
                    );
                    last_failure = e.to_string();
                    continue;
                }
            };
            match classify(resp) {
                AttemptOutcome::Success(body) => {
                    debug!("Request to {} successful - Request ID: {}", spec.url, request_id);
                    return Some(body);
                }
                AttemptOutcome::RateLimited { retry_after } => {
                    warn!(
                        "Rate limited on {} - Request ID: {}. Retry-After: {}s",
                        spec.url, request_id, retry_after
                    );
                    self.gate.report_cooldown(retry_after);
                    last_failure = format!("status 429, retry-after {}s", retry_after);
                }
                AttemptOutcome::Failed { status, reason } => {
                    warn!(
                        "Request to {} failed - Request ID: {}. Status: {} ({})",
                        spec.url, request_id, status, reason
                    );
                    last_failure = format!("status {} ({})", status.as_u16(), reason);
                }
            }
        }

        error!(
            "Max retries reached for {} - Request ID: {}. Last failure: {}",
            spec.url, request_id, last_failure
        );
        None
    }

    /// Fetch page 1, discover the last page from its links, then fetch the rest
    /// concurrently. Items come back in page order; failed pages add nothing.
    pub async fn fetch_all_pages(&self, spec: &RequestSpec) -> Vec<Value> {
        let Some(mut first) = self.request(spec).await else {
            error!("First page unavailable for {} and params {:?}", spec.url, spec.params);
            return Vec::new();
        };
        let last_page = self.pagination.last_page(&first);
        let mut items = self.pagination.take_items(&mut first);

        let Some(mut last_page) = last_page.filter(|&n| n >= 2) else {
            debug!("Single page of data for {} and params {:?}", spec.url, spec.params);
            return items;
        };
        if last_page > self.pagination.max_pages {
            warn!(
                "{} announces {} pages, fetching only the first {}",
                spec.url, last_page, self.pagination.max_pages
            );
            last_page = self.pagination.max_pages;
        }

        let page_param = &self.pagination.page_param;
        let pages: Vec<RequestSpec> = (2..=last_page)
            .map(|n| spec.with_param(page_param, n))
            .collect();
        let results = join_all(pages.iter().map(|p| self.request(p))).await;

        let mut failed = 0usize;
        for (page, result) in (2..=last_page).zip(results) {
            match result {
                Some(mut body) => items.extend(self.pagination.take_items(&mut body)),
                None => {
                    failed += 1;
                    warn!("Page {} of {} contributed no items", page, spec.url);
                }
            }
        }
        info!(
            "Fetched {} pages of data for {} and params {:?} ({} failed)",
            last_page, spec.url, spec.params, failed
        );
        items
    }

    /// Fetch `<base_url>/<id>` for every id and keep the value under `expected_key`.
    pub async fn fetch_endpoint_list(
        &self,
        base_url: &str,
        ids: &[String],
        expected_key: &str,
        headers: &BTreeMap<String, String>,
    ) -> BTreeMap<String, Value> {
        let base = base_url.trim_end_matches('/');
        let specs: Vec<RequestSpec> = ids
            .iter()
            .map(|id| RequestSpec {
                url: format!("{}/{}", base, id),
                headers: headers.clone(),
                params: BTreeMap::new(),
            })
            .collect();
        let results = join_all(specs.iter().map(|s| self.request(s))).await;

        let mut data = BTreeMap::new();
        for (id, result) in ids.iter().zip(results) {
            match result.and_then(|mut body| body.get_mut(expected_key).map(Value::take)) {
                Some(value) => {
                    info!("Fetched data {} from {}", id, base);
                    data.insert(id.clone(), value);
                }
                None => error!("Failed to fetch data {} from {}", id, base),
            }
        }
        data
    }
}
