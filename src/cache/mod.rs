//! Cache store capability and its backends.
//!
//! The core only ever talks to [`CacheStore`]; which backend sits behind it
//! (process memory, Redis, nothing at all) is decided by whoever builds the
//! [`Validator`](crate::Validator).

mod error;
mod memo;
mod memory;
mod null;
#[cfg(feature = "with-redis")]
mod redis;
mod store;

pub use error::{CacheError, CacheResult};
pub use memo::Memoizer;
pub use memory::MemoryCache;
pub use null::NullCache;
#[cfg(feature = "with-redis")]
pub use redis::RedisCache;
pub use store::{CacheStore, get_json, set_json};
