//! Primary and secondary provider implementations.

pub mod pool;
pub mod primary;
pub mod secondary;

pub use pool::{ConnectionPool, PoolLease};
pub use primary::{PrimaryProvider, PrimaryProviderConfig};
pub use secondary::SecondaryProvider;
