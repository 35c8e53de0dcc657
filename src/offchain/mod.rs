pub mod feed;
pub mod selector;

pub use feed::{FeedRequest, FeedResponse, FeedTransport, HttpTransport};
pub use selector::{AllowList, Pool, SelectError, pool_to_strategy, select_best_pool};
