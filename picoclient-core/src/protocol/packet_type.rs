use crate::error::ProtocolError;

/// Reserved flag nibble for PUBREL, SUBSCRIBE and UNSUBSCRIBE packet types.
pub const FLAGS_PUBREL_SUB_UNSUB: u8 = 0b0010;

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Default)]
pub enum PacketType {
    /// Reserved
    /// Direction: Forbidden
    #[default]
    Reserved = 0,

    /// Client request to connect to Server
    /// Direction: Client to Server
    Connect = 1,

    /// Connect acknowledgment
    /// Direction: Server to Client
    ConnAck = 2,

    /// Publish message
    /// Direction: Client to Server or Server to Client
    Publish = 3,

    /// Publish acknowledgment
    /// Direction: Client to Server or Server to Client
    PubAck = 4,

    /// Publish received (assured delivery part 1)
    /// Direction: Client to Server or Server to Client
    PubRec = 5,

    /// Publish release (assured delivery part 2)
    /// Direction: Client to Server or Server to Client
    PubRel = 6,

    /// Publish complete (assured delivery part 3)
    /// Direction: Client to Server or Server to Client
    PubComp = 7,

    /// Client subscribe request
    /// Direction: Client to Server
    Subscribe = 8,

    /// Subscribe acknowledgment
    /// Direction: Server to Client
    SubAck = 9,

    /// Client unsubscribe request
    /// Direction: Client to Server
    Unsubscribe = 10,

    /// Unsubscribe acknowledgment
    /// Direction: Server to Client
    UnsubAck = 11,

    /// Ping request
    /// Direction: Client to Server
    PingReq = 12,

    /// Ping response
    /// Direction: Server to Client
    PingResp = 13,

    /// Client disconnect request
    /// Direction: Client to Server
    Disconnect = 14,

    /// Reserved
    /// Direction: Forbidden
    Reserved2 = 15,
}

impl PacketType {
    /// Decode the high nibble of a fixed header first byte.
    pub const fn from_first_byte(byte: u8) -> Option<Self> {
        match byte >> 4 {
            1 => Some(PacketType::Connect),
            2 => Some(PacketType::ConnAck),
            3 => Some(PacketType::Publish),
            4 => Some(PacketType::PubAck),
            5 => Some(PacketType::PubRec),
            6 => Some(PacketType::PubRel),
            7 => Some(PacketType::PubComp),
            8 => Some(PacketType::Subscribe),
            9 => Some(PacketType::SubAck),
            10 => Some(PacketType::Unsubscribe),
            11 => Some(PacketType::UnsubAck),
            12 => Some(PacketType::PingReq),
            13 => Some(PacketType::PingResp),
            14 => Some(PacketType::Disconnect),
            _ => None,
        }
    }

    /// Validate the flag nibble against the fixed values mandated per type.
    ///
    /// PUBLISH flags carry DUP/QoS/RETAIN and are validated separately by
    /// [`PublishFlags`](crate::protocol::packets::PublishFlags).
    pub fn validate_flags(self, flags: u8) -> Result<(), ProtocolError> {
        let is_release_class = matches!(
            self,
            PacketType::PubRel | PacketType::Subscribe | PacketType::Unsubscribe
        );
        let expected = if is_release_class {
            FLAGS_PUBREL_SUB_UNSUB
        } else {
            0
        };
        if self == PacketType::Publish || flags == expected {
            return Ok(());
        }
        Err(ProtocolError::BadFlags {
            packet_type: self,
            flags,
        })
    }

    /// True for packet classes carrying a 2-octet packet identifier.
    ///
    /// PUBLISH carries one only for QoS above 0, which is why the flag
    /// nibble participates.
    pub fn has_packet_identifier(self, flags: u8) -> bool {
        match self {
            PacketType::Publish => (flags >> 1) & 0b11 != 0,
            PacketType::PubAck
            | PacketType::PubRec
            | PacketType::PubRel
            | PacketType::PubComp
            | PacketType::Subscribe
            | PacketType::SubAck
            | PacketType::Unsubscribe
            | PacketType::UnsubAck => true,
            _ => false,
        }
    }

    /// The flag nibble mandated for this packet type (0b0010 for the
    /// release class, 0 otherwise; PUBLISH composes its own).
    pub const fn fixed_flags(self) -> u8 {
        match self {
            PacketType::PubRel | PacketType::Subscribe | PacketType::Unsubscribe => {
                FLAGS_PUBREL_SUB_UNSUB
            }
            _ => 0,
        }
    }
}

impl core::fmt::Display for PacketType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            PacketType::Reserved | PacketType::Reserved2 => "forbidden",
            PacketType::Connect => "CONNECT",
            PacketType::ConnAck => "CONNACK",
            PacketType::Publish => "PUBLISH",
            PacketType::PubAck => "PUBACK",
            PacketType::PubRec => "PUBREC",
            PacketType::PubRel => "PUBREL",
            PacketType::PubComp => "PUBCOMP",
            PacketType::Subscribe => "SUBSCRIBE",
            PacketType::SubAck => "SUBACK",
            PacketType::Unsubscribe => "UNSUBSCRIBE",
            PacketType::UnsubAck => "UNSUBACK",
            PacketType::PingReq => "PINGREQ",
            PacketType::PingResp => "PINGRESP",
            PacketType::Disconnect => "DISCONNECT",
        };
        write!(f, "{}", s)
    }
}
