//! Chat side of the voice chat: the SSE reply decoder, the transcript the
//! reply accumulates into, the chat relay client, and the [`Session`] that
//! ties them to playback.

pub mod error;
pub mod prompt;
pub mod relay;
pub mod session;
pub mod sse;
pub mod transcript;
pub mod types;

pub use error::ChatError;
pub use relay::{ByteStream, ChatRelay, HttpChatRelay};
pub use session::{SendOutcome, Session, SessionEvent, FALLBACK_REPLY, WELCOME_MESSAGE_ID};
pub use sse::{decode_stream, DecodeSummary, SseDecoder, StreamFrame};
pub use transcript::Transcript;
pub use types::{ChatRelayRequest, ConversationTurn, DisplayMessage, Role};
