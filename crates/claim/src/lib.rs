//! The claim-and-finalize protocol: the `BackingStore` seam, the retrying
//! `ClaimProtocol` adapter, the advisory `DailyCounter`, and a deterministic
//! in-memory double for tests.

pub mod backing_store;
pub mod daily_counter;
pub mod http_store;
pub mod memory_store;
pub mod protocol;

pub use backing_store::{BackingStore, ClaimRequest, MarkDoneRequest, StoreError};
pub use daily_counter::{DailyCounter, SUCCESS_CACHE_TTL_SECONDS};
pub use http_store::{HttpBackingStore, HttpStoreConfig};
pub use memory_store::MemoryStore;
pub use protocol::{jst_day_bounds_utc, jst_now, jst_today, ClaimProtocol};
