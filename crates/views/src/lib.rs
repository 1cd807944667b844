//! Live read views over the stores.
//!
//! Each view holds a watch subscription and answers queries from the latest
//! snapshot: the order board (filter, counts, pagination), the conversation
//! list (recency sort, search, badges), and a single message thread. Views
//! never write order state; the thread clears the admin-side unread counter
//! when opened, and nothing else.

pub mod conversation_list;
pub mod message_thread;
pub mod order_board;

pub use conversation_list::ConversationList;
pub use message_thread::MessageThread;
pub use order_board::{OrderBoard, OrderPage, PAGE_SIZE};
