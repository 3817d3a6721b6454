pub mod links;
pub mod shards;
pub mod types;

pub use links::{LinkError, id_from_href, last_link};
pub use shards::{ShardHosts, lookup_shard};
pub use types::*;
