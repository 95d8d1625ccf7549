use crate::protocol::packets::ConnectReturnCode;
use crate::protocol::PacketType;

/// Wire-level protocol violations detected while encoding or decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// First header byte carries a reserved packet type (0 or 15).
    BadPacketType { value: u8 },

    /// Flag nibble does not match the fixed value required for the packet type.
    BadFlags { packet_type: PacketType, flags: u8 },

    /// Remaining length field uses more than 4 bytes.
    MalformedRemainingLength,

    /// Remaining length above the protocol maximum of 268,435,455.
    RemainingLengthTooLarge { value: u32 },

    /// Fixed-shape packet arrived with an impossible remaining length.
    BadRemainingLength { packet_type: PacketType, value: u32 },

    /// Zero-length MQTT string where the protocol requires content.
    ZeroLengthString,

    /// String field is not valid UTF-8.
    MalformedUtf8,

    /// Non-allocating decoder ran out of user buffer space.
    UserBufferFull,

    BadQos { value: u8 },

    /// DUP flag set on a QoS 0 PUBLISH.
    DupOnQos0,

    /// Packet identifier 0 where a nonzero identifier is required.
    ZeroPacketIdentifier,

    /// CONNACK return code outside the defined 0..5 range.
    BadReturnCode { value: u8 },

    /// CONNACK acknowledge flags with bits other than session-present set.
    BadAckFlags { value: u8 },

    /// CONNECT password flag set without the username flag.
    PasswordWithoutUsername,

    /// CONNECT connect-flags reserved bit set.
    ReservedFlagSet,

    /// SUBSCRIBE/UNSUBSCRIBE with no topic filters.
    EmptyFilterList,

    /// Wildcard character in a PUBLISH topic name.
    WildcardInTopic,

    /// Topic filter with an attached wildcard ("finance#") or a non-final "#".
    MalformedWildcard,

    /// Staging buffer cannot hold the encoded packet.
    BufferTooSmall,
}

impl core::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ProtocolError::BadPacketType { value } => {
                write!(f, "Invalid packet type: {}", value)
            }
            ProtocolError::BadFlags { packet_type, flags } => {
                write!(f, "Invalid flags {:#06b} for {:?}", flags, packet_type)
            }
            ProtocolError::MalformedRemainingLength => {
                write!(f, "Malformed remaining length")
            }
            ProtocolError::RemainingLengthTooLarge { value } => {
                write!(f, "Remaining length too large: {}", value)
            }
            ProtocolError::BadRemainingLength { packet_type, value } => {
                write!(f, "Invalid remaining length {} for {:?}", value, packet_type)
            }
            ProtocolError::ZeroLengthString => write!(f, "Zero-length MQTT string"),
            ProtocolError::MalformedUtf8 => write!(f, "Malformed UTF-8 string"),
            ProtocolError::UserBufferFull => write!(f, "User buffer full"),
            ProtocolError::BadQos { value } => write!(f, "Invalid QoS: {}", value),
            ProtocolError::DupOnQos0 => write!(f, "DUP flag set with QoS 0"),
            ProtocolError::ZeroPacketIdentifier => write!(f, "Packet identifier is zero"),
            ProtocolError::BadReturnCode { value } => {
                write!(f, "Invalid CONNACK return code: {}", value)
            }
            ProtocolError::BadAckFlags { value } => {
                write!(f, "Invalid CONNACK acknowledge flags: {:#010b}", value)
            }
            ProtocolError::PasswordWithoutUsername => {
                write!(f, "Password flag requires username flag")
            }
            ProtocolError::ReservedFlagSet => {
                write!(f, "Reserved bit set in CONNECT flags")
            }
            ProtocolError::EmptyFilterList => {
                write!(f, "Packet must contain at least one topic filter")
            }
            ProtocolError::WildcardInTopic => {
                write!(f, "Wildcard character in topic name")
            }
            ProtocolError::MalformedWildcard => write!(f, "Malformed topic filter wildcard"),
            ProtocolError::BufferTooSmall => write!(f, "Buffer too small"),
        }
    }
}

impl core::error::Error for ProtocolError {}

/// Transport-level failures surfaced by [`Transport`](crate::network::Transport)
/// implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkError {
    ConnectionClosed,
    ReadFailed,
    WriteFailed,
    FlushFailed,
    CloseFailed,
}

impl core::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            NetworkError::ConnectionClosed => write!(f, "Connection closed"),
            NetworkError::ReadFailed => write!(f, "Read operation failed"),
            NetworkError::WriteFailed => write!(f, "Write operation failed"),
            NetworkError::FlushFailed => write!(f, "Flush operation failed"),
            NetworkError::CloseFailed => write!(f, "Close operation failed"),
        }
    }
}

impl core::error::Error for NetworkError {}

/// Top-level error type; also the value a session stores as its close reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    Protocol(ProtocolError),

    Network(NetworkError),

    /// PUBLISH callback returned without consuming the whole payload.
    PayloadUnderread { missing: u32 },

    /// Packet that makes no sense in the current session state,
    /// e.g. CONNACK while already connected.
    UnexpectedPacket { packet_type: PacketType },

    /// SUBACK return-code count differs from the pending subscribe.
    SubackMismatch { requested: usize, granted: usize },

    /// Server refused the CONNECT.
    ConnectRejected(ConnectReturnCode),

    /// Server sent a DISCONNECT.
    PeerDisconnected,

    /// Session has not connected yet.
    NeverConnected,

    /// Operation requires a connected session, or the session ended.
    Disconnected,

    /// CONNECT attempted while a session is live.
    AlreadyConnected,

    /// SUBSCRIBE attempted while a SUBACK is still pending.
    SubscribePending,

    /// Client-side publishing supports QoS 0 only.
    UnsupportedQos,

    /// Deadline expired or the wait was cancelled.
    Cancelled,

    /// Default close reason for a caller-requested disconnect.
    DisconnectRequested,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Protocol(e) => write!(f, "Protocol error: {}", e),
            Error::Network(e) => write!(f, "Network error: {}", e),
            Error::PayloadUnderread { missing } => {
                write!(f, "Publish callback left {} payload bytes unread", missing)
            }
            Error::UnexpectedPacket { packet_type } => {
                write!(f, "Unexpected {:?} packet", packet_type)
            }
            Error::SubackMismatch { requested, granted } => {
                write!(
                    f,
                    "SUBACK carries {} return codes for {} pending filters",
                    granted, requested
                )
            }
            Error::ConnectRejected(code) => write!(f, "Connection rejected: {}", code),
            Error::PeerDisconnected => write!(f, "Received graceful disconnect request"),
            Error::NeverConnected => write!(f, "Yet to connect"),
            Error::Disconnected => write!(f, "Disconnected"),
            Error::AlreadyConnected => {
                write!(f, "Already connected; disconnect before connecting")
            }
            Error::SubscribePending => {
                write!(f, "Subscribe attempted while still awaiting SUBACK")
            }
            Error::UnsupportedQos => write!(f, "Only QoS 0 publishing is supported"),
            Error::Cancelled => write!(f, "Operation cancelled"),
            Error::DisconnectRequested => write!(f, "Disconnect requested by user"),
        }
    }
}

impl core::error::Error for Error {}

impl From<ProtocolError> for Error {
    fn from(error: ProtocolError) -> Self {
        Error::Protocol(error)
    }
}

impl From<NetworkError> for Error {
    fn from(error: NetworkError) -> Self {
        Error::Network(error)
    }
}

pub type Result<T> = core::result::Result<T, Error>;
