pub mod api;
pub mod http;
pub mod sse;

pub use api::{AllowlistApi, FeedItem, LogFeed};
pub use http::{AllowlistClient, ClientConfig};
