//! PostgreSQL target: connection pool, TLS and the per-table record store.

mod pool;
mod store;
pub mod tls;

pub use pool::{build_pool, ping};
pub use store::PgStore;
pub use tls::{SslMode, TlsBuilder};
