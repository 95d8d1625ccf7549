use crate::error::{ProtocolError, Result};
use crate::protocol::qos::QoS;
use crate::protocol::utils::{write_binary, write_string, write_u16};

pub const MQTT_PROTOCOL_NAME: &str = "MQTT";
pub const MQTT_3_1_1_PROTOCOL_LEVEL: u8 = 4;

/// Default keep-alive interval in seconds applied by [`Connect::new`].
pub const DEFAULT_KEEP_ALIVE: u16 = 60;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct ConnectFlags(u8);

impl ConnectFlags {
    pub const RESERVED: Self = Self(0b_0000_0001);
    pub const CLEAN_SESSION: Self = Self(0b_0000_0010);
    pub const WILL_FLAG: Self = Self(0b_0000_0100);
    pub const WILL_QOS_1: Self = Self(0b_0000_1000);
    pub const WILL_QOS_2: Self = Self(0b_0001_0000);
    pub const WILL_RETAIN: Self = Self(0b_0010_0000);
    pub const PASSWORD: Self = Self(0b_0100_0000);
    pub const USERNAME: Self = Self(0b_1000_0000);

    pub const fn empty() -> Self {
        Self(0)
    }
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }
    pub const fn bits(self) -> u8 {
        self.0
    }
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub const fn will_qos(self) -> u8 {
        (self.0 >> 3) & 0b11
    }
}

/// CONNECT variable header and payload fields.
///
/// Variable Header
///   Protocol Name      ("MQTT" as UTF-8 string)
///   Protocol Level     (0x04 for MQTT 3.1.1)
///   Connect Flags      (bitfield)
///   Keep Alive         (2 bytes)
///
/// Payload (order matters, some fields optional)
///   Client Identifier  (UTF-8 string)
///   Will Topic         (UTF-8 string)   [if Will Flag = 1]
///   Will Message       (binary data)    [if Will Flag = 1]
///   User Name          (UTF-8 string)   [if User Name Flag = 1]
///   Password           (binary data)    [if Password Flag = 1]
///
/// All string fields borrow from caller or decoder memory; nothing here
/// owns its storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connect<'a> {
    pub protocol_name: &'a str,
    pub protocol_level: u8,
    pub clean_session: bool,
    pub keep_alive: u16,
    pub client_id: &'a str,
    pub will_topic: Option<&'a str>,
    pub will_message: Option<&'a [u8]>,
    pub will_qos: QoS,
    pub will_retain: bool,
    pub username: Option<&'a str>,
    pub password: Option<&'a [u8]>,
}

impl<'a> Connect<'a> {
    /// CONNECT with the MQTT 3.1.1 defaults: protocol "MQTT" level 4,
    /// clean session, 60 second keep-alive, no will and no credentials.
    pub const fn new(client_id: &'a str) -> Self {
        Connect {
            protocol_name: MQTT_PROTOCOL_NAME,
            protocol_level: MQTT_3_1_1_PROTOCOL_LEVEL,
            clean_session: true,
            keep_alive: DEFAULT_KEEP_ALIVE,
            client_id,
            will_topic: None,
            will_message: None,
            will_qos: QoS::AtMostOnce,
            will_retain: false,
            username: None,
            password: None,
        }
    }

    pub const fn will_flag(&self) -> bool {
        self.will_topic.is_some()
    }

    /// Compose the connect-flags byte. The reserved bit stays 0.
    pub fn flags(&self) -> ConnectFlags {
        let mut flags = ConnectFlags::empty();
        if self.clean_session {
            flags.insert(ConnectFlags::CLEAN_SESSION);
        }
        if self.will_flag() {
            flags.insert(ConnectFlags::WILL_FLAG);
            flags.insert(ConnectFlags::from_bits((self.will_qos as u8) << 3));
            if self.will_retain {
                flags.insert(ConnectFlags::WILL_RETAIN);
            }
        }
        if self.username.is_some() {
            flags.insert(ConnectFlags::USERNAME);
            if self.password.is_some() {
                flags.insert(ConnectFlags::PASSWORD);
            }
        }
        flags
    }

    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() {
            return Err(ProtocolError::ZeroLengthString.into());
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(ProtocolError::PasswordWithoutUsername.into());
        }
        if self.will_topic.is_some() != self.will_message.is_some() {
            return Err(ProtocolError::ZeroLengthString.into());
        }
        Ok(())
    }

    /// Size of the variable header plus payload, i.e. the remaining length
    /// of the CONNECT packet.
    pub fn encoded_size(&self) -> usize {
        let mut size = 2 + self.protocol_name.len(); // Protocol Name
        size += 1; // Protocol Level
        size += 1; // Connect Flags
        size += 2; // Keep Alive
        size += 2 + self.client_id.len(); // Client ID
        if let Some(will_topic) = self.will_topic {
            size += 2 + will_topic.len();
        }
        if let Some(will_message) = self.will_message {
            size += 2 + will_message.len();
        }
        if let Some(username) = self.username {
            size += 2 + username.len();
            if let Some(password) = self.password {
                size += 2 + password.len();
            }
        }
        size
    }

    /// Encode variable header and payload into `buffer`, returning the byte
    /// count. The fixed header is the transmit engine's business.
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize> {
        let mut offset = 0;

        // variable header
        write_string(self.protocol_name, buffer, &mut offset)?;
        if offset + 2 > buffer.len() {
            return Err(ProtocolError::BufferTooSmall.into());
        }
        buffer[offset] = self.protocol_level;
        buffer[offset + 1] = self.flags().bits();
        offset += 2;
        write_u16(self.keep_alive, buffer, &mut offset)?;

        // payload
        write_string(self.client_id, buffer, &mut offset)?;
        if let Some(will_topic) = self.will_topic {
            write_string(will_topic, buffer, &mut offset)?;
            if let Some(will_message) = self.will_message {
                write_binary(will_message, buffer, &mut offset)?;
            }
        }
        if let Some(username) = self.username {
            write_string(username, buffer, &mut offset)?;
            if let Some(password) = self.password {
                write_binary(password, buffer, &mut offset)?;
            }
        }

        Ok(offset)
    }
}
