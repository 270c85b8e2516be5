//! Redis-backed `NavigationIndex` (§4.9).

mod keys;
mod redis;

pub use self::redis::RedisNavigationIndex;
