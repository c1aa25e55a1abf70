//! Wire protocol: the frames exchanged over the frontend's WebSocket link,
//! and the compact event schema fed to the LLM as conversation history.

pub mod compact;
pub mod frame;

pub use compact::CompactEvent;
pub use frame::{InboundFrame, OutboundFrame};
