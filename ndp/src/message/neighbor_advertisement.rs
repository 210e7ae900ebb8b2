use std::net::Ipv6Addr;

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::address::IPv6AddrExt;
use crate::message::Message;
use crate::message_type::NDPMessageType;
use crate::option::{NDPOption, NDPOptionError, marshal_options, parse_options};
use crate::{TryFromBytes, impl_try_from_bytes};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NeighborAdvertisementMessageError {
    #[error("Invalid neighbor advertisement message type. Expected 136, but got {0}.")]
    InvalidMessageType(u8),
    #[error(
        "Invalid neighbor advertisement message length. Expected at least 24 bytes, but got {0} bytes."
    )]
    InvalidMessageLength(usize),
    #[error("Invalid target address: {0} is an IPv4-mapped address")]
    InvalidTargetAddress(Ipv6Addr),
    #[error(transparent)]
    InvalidOptions(#[from] NDPOptionError),
}

/// Neighbor Advertisement メッセージ
///
/// RFC 4861 Section 4.4で定義されるNeighbor Advertisement (Type 136)。
/// Neighbor Solicitationへの応答、または自発的な情報更新として送信される
///
/// R/S/Oの3フラグに続く29ビットは予約領域で、送信時は0、受信時は無視される
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborAdvertisementMessage {
    /// R flag (Router)
    /// 送信者がルーターかどうか
    pub router: bool,

    /// S flag (Solicited)
    /// このAdvertisementがSolicitationに対する応答かどうか
    pub solicited: bool,

    /// O flag (Override)
    /// 既存のキャッシュエントリを上書きするかどうか
    pub override_flag: bool,

    /// Target Address
    /// 対象となるIPv6アドレス。IPv4射影アドレスは拒否される
    pub target_address: Ipv6Addr,

    /// Options (variable length)
    /// 可能なオプション:
    /// - Target Link-layer Address (Type 2)
    pub options: Vec<NDPOption>,
}

impl NeighborAdvertisementMessage {
    /// 新しいNeighbor Advertisementメッセージを作成
    pub fn new(
        router: bool,
        solicited: bool,
        override_flag: bool,
        target_address: Ipv6Addr,
        options: impl Into<Vec<NDPOption>>,
    ) -> Self {
        Self {
            router,
            solicited,
            override_flag,
            target_address,
            options: options.into(),
        }
    }
}

impl TryFromBytes for NeighborAdvertisementMessage {
    type Error = NeighborAdvertisementMessageError;

    fn try_from_bytes(value: impl AsRef<[u8]>) -> Result<Self, Self::Error> {
        let bytes = value.as_ref();
        if bytes.len() < 24 {
            return Err(NeighborAdvertisementMessageError::InvalidMessageLength(
                bytes.len(),
            ));
        }
        if bytes[0] != 136 {
            return Err(NeighborAdvertisementMessageError::InvalidMessageType(
                bytes[0],
            ));
        }

        let flags = bytes[4];
        let router = (flags & 0x80) != 0;
        let solicited = (flags & 0x40) != 0;
        let override_flag = (flags & 0x20) != 0;
        // フラグに続く29ビットは予約領域、受信時は無視する

        let mut octets = [0u8; 16];
        octets.copy_from_slice(&bytes[8..24]);
        let target_address = Ipv6Addr::from(octets);
        if target_address.is_ipv4_mapped() {
            return Err(NeighborAdvertisementMessageError::InvalidTargetAddress(
                target_address,
            ));
        }

        let options = parse_options(&bytes[24..])?;

        Ok(NeighborAdvertisementMessage {
            router,
            solicited,
            override_flag,
            target_address,
            options,
        })
    }
}
impl_try_from_bytes!(NeighborAdvertisementMessage, NeighborAdvertisementMessageError);

impl Message for NeighborAdvertisementMessage {
    fn message_type(&self) -> NDPMessageType {
        NDPMessageType::NeighborAdvertisement
    }

    fn code(&self) -> u8 {
        0 // Neighbor Advertisement always has code 0
    }
}

impl TryFrom<&NeighborAdvertisementMessage> for Bytes {
    type Error = NeighborAdvertisementMessageError;

    fn try_from(message: &NeighborAdvertisementMessage) -> Result<Self, Self::Error> {
        if message.target_address.is_ipv4_mapped() {
            return Err(NeighborAdvertisementMessageError::InvalidTargetAddress(
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
        // Flags (1 byte) + Reserved (3 bytes)
        let flags = if message.router { 0x80u8 } else { 0 }
            | if message.solicited { 0x40 } else { 0 }
            | if message.override_flag { 0x20 } else { 0 };
        data.put_u8(flags);
        data.extend_from_slice(&[0; 3]);
        // Target Address (16 bytes)
        data.extend_from_slice(&message.target_address.octets());
        // Options (variable length)
        data.extend_from_slice(&options);

        Ok(data.freeze())
    }
}

impl TryFrom<NeighborAdvertisementMessage> for Bytes {
    type Error = NeighborAdvertisementMessageError;

    fn try_from(message: NeighborAdvertisementMessage) -> Result<Self, Self::Error> {
        Bytes::try_from(&message)
    }
}
