use crate::fetcher::Fetcher;
use crate::http::{HttpSend, RequestSpec};
use log::info;
use serde_json::Value;
use std::future::Future;

/// Something an external driver can run to collect data.
pub trait Miner {
    type Output;

    fn name(&self) -> &str;

    fn mine(&self) -> impl Future<Output = anyhow::Result<Self::Output>>;
}

/// Mines every page of one paginated endpoint.
pub struct EndpointMiner<S> {
    name: String,
    fetcher: Fetcher<S>,
    request: RequestSpec,
}

impl<S: HttpSend + Sync> EndpointMiner<S> {
    pub fn new(name: impl Into<String>, fetcher: Fetcher<S>, request: RequestSpec) -> Self {
        Self {
            name: name.into(),
            fetcher,
            request,
        }
    }

    pub fn fetcher(&self) -> &Fetcher<S> {
        &self.fetcher
    }
}

impl<S: HttpSend + Sync> Miner for EndpointMiner<S> {
    type Output = Vec<Value>;

    fn name(&self) -> &str {
        &self.name
    }

    async fn mine(&self) -> anyhow::Result<Vec<Value>> {
        info!("Miner {} starting on {}", self.name, self.request.url);
        let items = self.fetcher.fetch_all_pages(&self.request).await;
        info!("Miner {} collected {} items", self.name, items.len());
        Ok(items)
    }
}
