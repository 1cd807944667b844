pub mod conversations;
pub mod error;
pub mod feed;
pub mod memory;
pub mod orders;
pub mod postgres;

pub use conversations::{
    ConversationStore, CounterOp, MessageFeed, SummaryFeed, SummaryPatch,
};
pub use error::{Result, StoreError};
pub use feed::{SnapshotStream, into_stream};
pub use memory::{InMemoryConversationStore, InMemoryOrderStore};
pub use orders::{OrderFeed, OrderStore};
pub use postgres::{PostgresConversationStore, PostgresOrderStore};
