//! Eviction policies
//!
//! Both policies are pure selections over a [`CacheSnapshot`](crate::CacheSnapshot);
//! the engine performs the deletions.

pub mod capacity;
pub mod ttl;

pub use capacity::{select_victims, CapacitySelection};
pub use ttl::{expired_dirs, expiry_of};
