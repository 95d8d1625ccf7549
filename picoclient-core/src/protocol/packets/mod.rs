mod connack;
mod connect;
mod publish;
mod suback;
mod subscribe;
mod unsubscribe;

pub use crate::protocol::packets::connack::ConnAck;
pub use crate::protocol::packets::connack::ConnectReturnCode;
pub use crate::protocol::packets::connect::Connect;
pub use crate::protocol::packets::connect::ConnectFlags;
pub use crate::protocol::packets::connect::DEFAULT_KEEP_ALIVE;
pub use crate::protocol::packets::connect::MQTT_3_1_1_PROTOCOL_LEVEL;
pub use crate::protocol::packets::connect::MQTT_PROTOCOL_NAME;
pub use crate::protocol::packets::publish::Publish;
pub use crate::protocol::packets::publish::PublishFlags;
pub use crate::protocol::packets::suback::SubAck;
pub use crate::protocol::packets::subscribe::Subscribe;
pub use crate::protocol::packets::subscribe::SubscribeFilter;
pub use crate::protocol::packets::unsubscribe::Unsubscribe;
