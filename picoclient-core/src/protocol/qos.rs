use crate::error::ProtocolError;

#[repr(u8)]
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum QoS {
    #[default]
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

impl QoS {
    pub const fn from_u8(value: u8) -> Result<Self, ProtocolError> {
        match value {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            _ => Err(ProtocolError::BadQos { value }),
        }
    }
}

/// SUBACK subscription failure marker byte.
pub const SUBACK_FAILURE: u8 = 0x80;

/// Per-filter SUBACK return code: the QoS the server granted, or the
/// failure marker for a rejected filter.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SubackReturnCode {
    Granted(QoS),
    #[default]
    Failure,
}

impl SubackReturnCode {
    pub const fn from_u8(value: u8) -> Result<Self, ProtocolError> {
        match value {
            SUBACK_FAILURE => Ok(SubackReturnCode::Failure),
            _ => match QoS::from_u8(value) {
                Ok(qos) => Ok(SubackReturnCode::Granted(qos)),
                Err(e) => Err(e),
            },
        }
    }

    pub const fn to_u8(self) -> u8 {
        match self {
            SubackReturnCode::Granted(qos) => qos as u8,
            SubackReturnCode::Failure => SUBACK_FAILURE,
        }
    }

    /// The granted QoS, or None for a rejected filter.
    pub const fn granted(self) -> Option<QoS> {
        match self {
            SubackReturnCode::Granted(qos) => Some(qos),
            SubackReturnCode::Failure => None,
        }
    }

    pub const fn is_failure(self) -> bool {
        matches!(self, SubackReturnCode::Failure)
    }
}
