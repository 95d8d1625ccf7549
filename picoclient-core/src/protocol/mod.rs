mod header;
mod packet_type;
pub mod packets;
mod qos;
mod utils;

pub use header::FixedHeader;
pub use packet_type::{PacketType, FLAGS_PUBREL_SUB_UNSUB};
pub use qos::{QoS, SubackReturnCode, SUBACK_FAILURE};
pub use utils::{
    read_byte, read_u16, read_variable_length, variable_length_length, write_binary,
    write_string, write_u16, write_variable_length, MAX_REMAINING_LENGTH,
};
