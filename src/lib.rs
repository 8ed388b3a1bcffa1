pub mod config;
pub mod fetcher;
pub mod gate;
pub mod http;
pub mod miner;
pub mod pagination;

pub use config::{Config, ConfigError, FetcherConfig};
pub use fetcher::Fetcher;
pub use gate::RateGate;
pub use http::{HttpError, HttpSend, RawResponse, ReqwestSender, RequestSpec};
pub use miner::{EndpointMiner, Miner};
pub use pagination::PaginationConfig;
