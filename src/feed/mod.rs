mod fetcher;
mod normalizer;

pub use fetcher::FeedFetcher;
pub use normalizer::{normalize, FeedFormat};
