//! Streaming transport
//!
//! Server side encodes turn output as `data:` events separated by blank
//! lines. Client side rebuilds the fragments from arbitrary byte reads and
//! joins them into readable text.

mod event;
mod reassembler;
mod text;
mod transport;

pub use event::{StreamEvent, OPEN_PAYLOAD};
pub use reassembler::{reassemble_events, SseReassembler};
pub use text::{reassemble_text, smart_append};
pub use transport::{event_channel, EventReceiver, EventSender, SseWriter};
