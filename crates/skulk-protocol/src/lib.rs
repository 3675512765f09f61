//! Wire protocol for Skulk.
//!
//! This crate defines what clients and the authority say to each other:
//!
//! - **Types** ([`Envelope`], [`SystemMessage`], [`PlayerId`],
//!   [`LobbyCode`], etc.): the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages are
//!   converted to and from bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! Game traffic (ready toggles, eliminations, perceived-role pushes) rides
//! inside [`Payload::Game`] as opaque bytes; its shape is owned by
//! `skulk-lobby`. This crate only knows the framework envelope.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Lobby (game actions/events)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    Channel, Envelope, LobbyCode, LobbyListEntry, Payload, PlayerId,
    Recipient, SystemMessage,
};
