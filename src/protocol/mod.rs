//! Tag-based wire protocol: header fields, the typed message catalogue, and
//! the streaming encoder/decoder.

pub mod codec;
pub mod header;
pub mod message;

pub use codec::{Codec, CodecError, Decoded};
pub use header::Header;
pub use message::{ExecStatus, Message};
