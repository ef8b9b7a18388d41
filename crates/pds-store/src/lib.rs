pub mod db;
pub mod enumerable;
pub mod error;
pub mod pagination;
pub mod store;

pub use db::{ArrayDb, DictDb, Namespace, VarDb};
pub use enumerable::{EnumerableMap, EnumerableSet};
pub use error::{StoreError, StoreResult};
pub use pagination::{paginate, paginate_with_default, Page, PageWindow, DEFAULT_PAGE_LIMIT};
pub use store::{KeyValueStore, MemoryStore, StoreTransaction};
