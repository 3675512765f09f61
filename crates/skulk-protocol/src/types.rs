//! Core protocol types for Skulk's wire format.
//!
//! Everything here is serialized and sent over the network. Game-level
//! traffic is opaque to this module: it travels as bytes inside
//! [`Payload::Game`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a participant's connection identity.
///
/// Serialized as a plain number (`#[serde(transparent)]`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A short, human-typeable join code identifying one hosted lobby.
///
/// Codes are [`LobbyCode::LEN`] characters drawn from
/// [`LobbyCode::ALPHABET`], which leaves out look-alikes (`0/O`, `1/I`).
/// Parsing is case-insensitive and the stored form is upper case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LobbyCode(String);

impl LobbyCode {
    /// Number of characters in a code.
    pub const LEN: usize = 6;

    /// Characters a code may contain.
    pub const ALPHABET: &'static [u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

    /// Parses user input into a code.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] if the trimmed input has
    /// the wrong length or a character outside the alphabet.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let code = raw.trim().to_ascii_uppercase();
        if code.len() != Self::LEN {
            return Err(ProtocolError::InvalidMessage(format!(
                "lobby code must be {} characters",
                Self::LEN
            )));
        }
        if !code.bytes().all(|b| Self::ALPHABET.contains(&b)) {
            return Err(ProtocolError::InvalidMessage(format!(
                "lobby code {code:?} contains invalid characters"
            )));
        }
        Ok(Self(code))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LobbyCode {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LobbyCode> for String {
    fn from(code: LobbyCode) -> Self {
        code.0
    }
}

impl fmt::Display for LobbyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who should receive an outbound message.
///
/// The authority pairs every event it emits with a `Recipient`. Anything
/// carrying role truth must use [`Recipient::Player`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every connection in the lobby.
    All,

    /// Exactly one connection.
    Player(PlayerId),

    /// Every connection except one.
    AllExcept(PlayerId),
}

impl Recipient {
    /// Returns `true` if `player` is addressed by this recipient.
    pub fn includes(&self, player: PlayerId) -> bool {
        match self {
            Self::All => true,
            Self::Player(p) => *p == player,
            Self::AllExcept(p) => *p != player,
        }
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// The delivery guarantee for a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "PascalCase")]
pub enum Channel {
    /// Delivered in order, no loss. Everything authoritative uses this.
    #[default]
    ReliableOrdered,

    /// May be lost or reordered. Position reports and cosmetic effects
    /// can tolerate it.
    Unreliable,
}

// ---------------------------------------------------------------------------
// SystemMessage: framework-level messages
// ---------------------------------------------------------------------------

/// A summary of a lobby returned in lobby listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyListEntry {
    /// The lobby's join code.
    pub code: LobbyCode,
    /// Participants currently in the roster.
    pub participant_count: usize,
    /// Current `maxParticipants` setting.
    pub max_participants: usize,
    /// `true` while the lobby is open (not mid-match).
    pub open: bool,
}

/// Messages used by the framework itself: connecting, identity, hosting and
/// joining lobbies, heartbeats, and errors.
///
/// Internally tagged: `{ "type": "JoinLobby", "code": "K7QX2M" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SystemMessage {
    // -- Connection lifecycle --
    /// Client → Server: protocol version, an identity token for the sign-in
    /// service, and optionally a session token from a previous connection.
    Handshake {
        version: u32,
        token: Option<String>,
        #[serde(default)]
        session_token: Option<String>,
    },

    /// Server → Client: identity confirmed. `session_token` lets the client
    /// resume the same identity after a dropped connection.
    HandshakeAck {
        player_id: PlayerId,
        server_time: u64,
        session_token: String,
    },

    /// Either direction: "I'm disconnecting."
    Disconnect { reason: String },

    // -- Heartbeat --
    /// Client → Server keep-alive carrying the client clock for RTT.
    Heartbeat { client_time: u64 },

    /// Server → Client echo of the client clock plus server time.
    HeartbeatAck { client_time: u64, server_time: u64 },

    // -- Lobby directory --
    /// Client → Server: create a new lobby with me as host.
    HostLobby,

    /// Client → Server: join the lobby with this code.
    JoinLobby { code: LobbyCode },

    /// Client → Server: join any open lobby with a free slot.
    QuickJoin,

    /// Client → Server: leave my current lobby.
    LeaveLobby,

    /// Client → Server: list lobbies.
    ListLobbies,

    /// Server → Client: the lobby listing.
    LobbyList { lobbies: Vec<LobbyListEntry> },

    /// Server → Client: you are now in this lobby.
    LobbyJoined { code: LobbyCode },

    /// Server → Client: you are no longer in a lobby.
    LobbyLeft,

    // -- Errors --
    /// Server → Client: an operational failure (HTTP-style code). Never
    /// used for game-rule rejections.
    Error { code: u16, message: String },
}

// ---------------------------------------------------------------------------
// Payload / Envelope
// ---------------------------------------------------------------------------

/// The content of a message: either a system message or game bytes.
///
/// Adjacently tagged: `{ "type": "System", "data": { ... } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    /// A framework-level message.
    System(SystemMessage),

    /// A lobby game action or event, encoded by the codec.
    Game(Vec<u8>),
}

/// The top-level wire wrapper. Every message on the wire is an Envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-sender auto-incrementing sequence number.
    pub seq: u64,

    /// Milliseconds since the sender started.
    pub timestamp: u64,

    /// Delivery guarantee. Defaults to `ReliableOrdered` when absent.
    #[serde(default)]
    pub channel: Channel,

    /// The actual message content.
    pub payload: Payload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&PlayerId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_player_id_display() {
        assert_eq!(PlayerId(7).to_string(), "P-7");
    }

    #[test]
    fn test_lobby_code_parse_normalizes_case_and_whitespace() {
        let code = LobbyCode::parse("  k7qx2m ").unwrap();
        assert_eq!(code.as_str(), "K7QX2M");
        assert_eq!(code.to_string(), "K7QX2M");
    }

    #[test]
    fn test_lobby_code_parse_wrong_length_rejected() {
        assert!(LobbyCode::parse("ABC").is_err());
        assert!(LobbyCode::parse("ABCDEFG").is_err());
    }

    #[test]
    fn test_lobby_code_parse_confusable_characters_rejected() {
        // 0, O, 1 and I are not in the alphabet.
        assert!(LobbyCode::parse("ABCDE0").is_err());
        assert!(LobbyCode::parse("ABCDEI").is_err());
    }

    #[test]
    fn test_lobby_code_deserialize_validates() {
        let ok: LobbyCode = serde_json::from_str("\"abcdef\"").unwrap();
        assert_eq!(ok.as_str(), "ABCDEF");
        let bad: Result<LobbyCode, _> = serde_json::from_str("\"ab\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_recipient_includes() {
        let p1 = PlayerId(1);
        let p2 = PlayerId(2);
        assert!(Recipient::All.includes(p1));
        assert!(Recipient::Player(p1).includes(p1));
        assert!(!Recipient::Player(p1).includes(p2));
        assert!(!Recipient::AllExcept(p1).includes(p1));
        assert!(Recipient::AllExcept(p1).includes(p2));
    }

    #[test]
    fn test_channel_serializes_as_pascal_case() {
        let json = serde_json::to_string(&Channel::ReliableOrdered).unwrap();
        assert_eq!(json, "\"ReliableOrdered\"");
    }

    #[test]
    fn test_handshake_session_token_defaults_when_missing() {
        let json = r#"{"type": "Handshake", "version": 1, "token": "7"}"#;
        let msg: SystemMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            SystemMessage::Handshake {
                version: 1,
                token: Some("7".into()),
                session_token: None,
            }
        );
    }

    #[test]
    fn test_payload_system_json_format() {
        let payload = Payload::System(SystemMessage::LeaveLobby);
        let json: serde_json::Value = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "System");
        assert_eq!(json["data"]["type"], "LeaveLobby");
    }

    #[test]
    fn test_envelope_channel_defaults_when_missing() {
        let json = r#"{
            "seq": 1,
            "timestamp": 100,
            "payload": { "type": "Game", "data": [1] }
        }"#;
        let envelope: Envelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.channel, Channel::ReliableOrdered);
    }

    #[test]
    fn test_decode_unknown_system_message_type_returns_error() {
        let unknown = r#"{"type": "FlyToMoon", "speed": 9000}"#;
        let result: Result<SystemMessage, _> = serde_json::from_str(unknown);
        assert!(result.is_err());
    }
}
