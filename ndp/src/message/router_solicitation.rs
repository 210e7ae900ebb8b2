use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::message::Message;
use crate::message_type::NDPMessageType;
use crate::option::{NDPOption, NDPOptionError, marshal_options, parse_options};
use crate::{TryFromBytes, impl_try_from_bytes};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterSolicitationMessageError {
    #[error("Invalid router solicitation message type. Expected 133, but got {0}.")]
    InvalidMessageType(u8),
    #[error(
        "Invalid router solicitation message length. Expected at least 8 bytes, but got {0} bytes."
    )]
    InvalidMessageLength(usize),
    #[error(transparent)]
    InvalidOptions(#[from] NDPOptionError),
}

/// Router Solicitation メッセージ
///
/// RFC 4861 Section 4.1で定義されるRouter Solicitation (Type 133)。
/// ホストがルーターに即時のRouter Advertisementを要求するために送信する
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouterSolicitationMessage {
    /// Options (variable length)
    /// 可能なオプション:
    /// - Source Link-layer Address (Type 1)
    pub options: Vec<NDPOption>,
}

impl RouterSolicitationMessage {
    /// 新しいRouter Solicitationメッセージを作成
    pub fn new(options: impl Into<Vec<NDPOption>>) -> Self {
        Self {
            options: options.into(),
        }
    }
}

impl TryFromBytes for RouterSolicitationMessage {
    type Error = RouterSolicitationMessageError;

    fn try_from_bytes(value: impl AsRef<[u8]>) -> Result<Self, Self::Error> {
        let bytes = value.as_ref();
        if bytes.len() < 8 {
            return Err(RouterSolicitationMessageError::InvalidMessageLength(
                bytes.len(),
            ));
        }
        if bytes[0] != 133 {
            return Err(RouterSolicitationMessageError::InvalidMessageType(bytes[0]));
        }

        // bytes[4..8]は予約フィールド、受信時は無視する
        let options = parse_options(&bytes[8..])?;

        Ok(RouterSolicitationMessage { options })
    }
}
impl_try_from_bytes!(RouterSolicitationMessage, RouterSolicitationMessageError);

impl Message for RouterSolicitationMessage {
    fn message_type(&self) -> NDPMessageType {
        NDPMessageType::RouterSolicitation
    }

    fn code(&self) -> u8 {
        0 // Router Solicitation always has code 0
    }
}

impl TryFrom<&RouterSolicitationMessage> for Bytes {
    type Error = RouterSolicitationMessageError;

    fn try_from(message: &RouterSolicitationMessage) -> Result<Self, Self::Error> {
        let options = marshal_options(&message.options)?;

        let mut data = BytesMut::with_capacity(8 + options.len());
        // Type (1 byte)
        data.put_u8(message.message_type().into());
        // Code (1 byte)
        data.put_u8(message.code());
        // Checksum (2 bytes) - カーネルまたは呼び出し側が計算する
        data.put_u16(0);
        // Reserved (4 bytes)
        data.put_u32(0);
        // Options (variable length)
        data.extend_from_slice(&options);

        Ok(data.freeze())
    }
}

impl TryFrom<RouterSolicitationMessage> for Bytes {
    type Error = RouterSolicitationMessageError;

    fn try_from(message: RouterSolicitationMessage) -> Result<Self, Self::Error> {
        Bytes::try_from(&message)
    }
}
