pub mod pool;

pub use pool::{Database, DbPool};
