use crate::error::{ProtocolError, Result};
use crate::network::{read_full, Transport};

/// CONNACK acknowledge-flags bit 0; all other bits are reserved.
const SESSION_PRESENT: u8 = 0b0000_0001;

/// CONNACK return code, the second byte of the variable header. 0 means the
/// connection was accepted; 1..5 are the defined refusal reasons; anything
/// above is invalid on the wire.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ConnectReturnCode {
    #[default]
    Accepted = 0,
    UnacceptableProtocol = 1,
    IdentifierRejected = 2,
    ServerUnavailable = 3,
    BadCredentials = 4,
    NotAuthorized = 5,
}

impl ConnectReturnCode {
    pub const fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(ConnectReturnCode::Accepted),
            1 => Ok(ConnectReturnCode::UnacceptableProtocol),
            2 => Ok(ConnectReturnCode::IdentifierRejected),
            3 => Ok(ConnectReturnCode::ServerUnavailable),
            4 => Ok(ConnectReturnCode::BadCredentials),
            5 => Ok(ConnectReturnCode::NotAuthorized),
            _ => Err(crate::Error::Protocol(ProtocolError::BadReturnCode {
                value,
            })),
        }
    }
}

impl core::fmt::Display for ConnectReturnCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            ConnectReturnCode::Accepted => "connection accepted",
            ConnectReturnCode::UnacceptableProtocol => "unacceptable protocol version",
            ConnectReturnCode::IdentifierRejected => "client identifier rejected",
            ConnectReturnCode::ServerUnavailable => "server unavailable",
            ConnectReturnCode::BadCredentials => "bad user name or password",
            ConnectReturnCode::NotAuthorized => "not authorized",
        };
        write!(f, "{}", s)
    }
}

/// CONNACK variable header: session-present flag plus return code.
/// Fixed-shape (always 2 bytes), so decoding never needs the user buffer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConnAck {
    pub session_present: bool,
    pub return_code: ConnectReturnCode,
}

impl ConnAck {
    /// Remaining length of every CONNACK packet.
    pub const SIZE: u32 = 2;

    pub const fn encoded_size(&self) -> usize {
        Self::SIZE as usize
    }

    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize> {
        if buffer.len() < 2 {
            return Err(ProtocolError::BufferTooSmall.into());
        }
        buffer[0] = if self.session_present {
            SESSION_PRESENT
        } else {
            0
        };
        buffer[1] = self.return_code as u8;
        Ok(2)
    }

    pub async fn decode<T: Transport>(transport: &mut T) -> Result<(Self, usize)> {
        let mut buf = [0u8; 2];
        read_full(transport, &mut buf).await?;
        if buf[0] & !SESSION_PRESENT != 0 {
            return Err(ProtocolError::BadAckFlags { value: buf[0] }.into());
        }
        let return_code = ConnectReturnCode::from_u8(buf[1])?;
        Ok((
            ConnAck {
                session_present: buf[0] & SESSION_PRESENT != 0,
                return_code,
            },
            2,
        ))
    }
}
