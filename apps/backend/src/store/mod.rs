//! Game state store access: key layout, codecs, the IN/OUT pipelines,
//! the per-game lock, and the contention queue.

pub mod codec;
pub mod keys;
pub mod lock;
pub mod package_store;
pub mod pipeline;
pub mod queue;
pub mod session;

pub use lock::LockToken;
pub use pipeline::{OutBatch, Prefetch};
pub use session::SocketSession;
