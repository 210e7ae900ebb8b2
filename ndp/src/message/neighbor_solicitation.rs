use std::net::Ipv6Addr;

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::address::IPv6AddrExt;
use crate::message::Message;
use crate::message_type::NDPMessageType;
use crate::option::{NDPOption, NDPOptionError, marshal_options, parse_options};
use crate::{TryFromBytes, impl_try_from_bytes};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NeighborSolicitationMessageError {
    #[error("Invalid neighbor solicitation message type. Expected 135, but got {0}.")]
    InvalidMessageType(u8),
    #[error(
        "Invalid neighbor solicitation message length. Expected at least 24 bytes, but got {0} bytes."
    )]
    InvalidMessageLength(usize),
    #[error("Invalid target address: {0} is an IPv4-mapped address")]
    InvalidTargetAddress(Ipv6Addr),
    #[error(transparent)]
    InvalidOptions(#[from] NDPOptionError),
}

/// Neighbor Solicitation メッセージ
///
/// RFC 4861 Section 4.3で定義されるNeighbor Solicitation (Type 135)。
/// 近隣ノードのリンクレイヤアドレス解決と到達性確認に使用する
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborSolicitationMessage {
    /// Target Address
    /// 解決対象のIPv6アドレス。IPv4射影アドレスは拒否される
    pub target_address: Ipv6Addr,

    /// Options (variable length)
    /// 可能なオプション:
    /// - Source Link-layer Address (Type 1)
    /// - Nonce (Type 14)
    pub options: Vec<NDPOption>,
}

impl NeighborSolicitationMessage {
    /// 新しいNeighbor Solicitationメッセージを作成
    pub fn new(target_address: Ipv6Addr, options: impl Into<Vec<NDPOption>>) -> Self {
        Self {
            target_address,
            options: options.into(),
        }
    }
}

impl TryFromBytes for NeighborSolicitationMessage {
    type Error = NeighborSolicitationMessageError;

    fn try_from_bytes(value: impl AsRef<[u8]>) -> Result<Self, Self::Error> {
        let bytes = value.as_ref();
        if bytes.len() < 24 {
            return Err(NeighborSolicitationMessageError::InvalidMessageLength(
                bytes.len(),
            ));
        }
        if bytes[0] != 135 {
            return Err(NeighborSolicitationMessageError::InvalidMessageType(
                bytes[0],
            ));
        }

        // bytes[4..8]は予約フィールド、受信時は無視する
        let mut octets = [0u8; 16];
        octets.copy_from_slice(&bytes[8..24]);
        let target_address = Ipv6Addr::from(octets);
        if target_address.is_ipv4_mapped() {
            return Err(NeighborSolicitationMessageError::InvalidTargetAddress(
                target_address,
            ));
        }

        let options = parse_options(&bytes[24..])?;

        Ok(NeighborSolicitationMessage {
            target_address,
            options,
        })
    }
}
impl_try_from_bytes!(NeighborSolicitationMessage, NeighborSolicitationMessageError);

impl Message for NeighborSolicitationMessage {
    fn message_type(&self) -> NDPMessageType {
        NDPMessageType::NeighborSolicitation
    }

    fn code(&self) -> u8 {
        0 // Neighbor Solicitation always has code 0
    }
}

impl TryFrom<&NeighborSolicitationMessage> for Bytes {
    type Error = NeighborSolicitationMessageError;

    fn try_from(message: &NeighborSolicitationMessage) -> Result<Self, Self::Error> {
        if message.target_address.is_ipv4_mapped() {
            return Err(NeighborSolicitationMessageError::InvalidTargetAddress(
                message.target_address,
            ));
        }

        let options = marshal_options(&message.options)?;

        let mut data = BytesMut::with_capacity(24 + options.len());
        // Type (1 byte)
        data.put_u8(message.message_type().into());
        // Code (1 byte)
        data.put_u8(message.code());
        // Checksum (2 bytes) - カーネルまたは呼び出し側が計算する
        data.put_u16(0);
        // Reserved (4 bytes)
        data.put_u32(0);
        // Target Address (16 bytes)
        data.extend_from_slice(&message.target_address.octets());
        // Options (variable length)
        data.extend_from_slice(&options);

        Ok(data.freeze())
    }
}

impl TryFrom<NeighborSolicitationMessage> for Bytes {
    type Error = NeighborSolicitationMessageError;

    fn try_from(message: NeighborSolicitationMessage) -> Result<Self, Self::Error> {
        Bytes::try_from(&message)
    }
}
