mod neighbor_advertisement;
mod neighbor_solicitation;
mod router_advertisement;
mod router_solicitation;

use std::net::Ipv6Addr;

use bytes::{Bytes, BytesMut};
use thiserror::Error;

pub use self::neighbor_advertisement::{
    NeighborAdvertisementMessage, NeighborAdvertisementMessageError,
};
pub use self::neighbor_solicitation::{
    NeighborSolicitationMessage, NeighborSolicitationMessageError,
};
pub use self::router_advertisement::{
    RouterAdvertisementMessage, RouterAdvertisementMessageError,
};
pub use self::router_solicitation::{RouterSolicitationMessage, RouterSolicitationMessageError};
use crate::checksum::calculate_icmpv6_checksum;
use crate::message_type::{NDPMessageType, NDPMessageTypeError};
use crate::{TryFromBytes, impl_try_from_bytes};

/// NDPメッセージの共通トレイト
pub trait Message {
    /// メッセージのタイプを取得
    fn message_type(&self) -> NDPMessageType;

    /// メッセージのコードを取得
    fn code(&self) -> u8;
}

/// NDPメッセージ処理に関するエラー
///
/// NDPメッセージのパース・検証で発生する可能性のあるエラーを定義します。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NDPMessageError {
    #[error("Invalid NDP packet length: must be at least 4 bytes, but got {0} bytes")]
    InvalidPacketLength(usize),
    #[error(transparent)]
    UnknownMessageType(#[from] NDPMessageTypeError),
    #[error(transparent)]
    InvalidRouterSolicitationMessage(#[from] RouterSolicitationMessageError),
    #[error(transparent)]
    InvalidRouterAdvertisementMessage(#[from] RouterAdvertisementMessageError),
    #[error(transparent)]
    InvalidNeighborSolicitationMessage(#[from] NeighborSolicitationMessageError),
    #[error(transparent)]
    InvalidNeighborAdvertisementMessage(#[from] NeighborAdvertisementMessageError),
}

/// NDPメッセージ
///
/// RFC 4861で定義されるNeighbor Discoveryメッセージのタグ付きバリアント。
/// マーシャル結果はICMPv6ヘッダー（タイプ、コード0、チェックサム0）で始まる。
/// チェックサムはカーネルのオフロードか[`NDPMessage::marshal_with_checksum`]で
/// 埋められる
///
/// 参照:
/// - [RFC 4861 - Neighbor Discovery for IP version 6 (IPv6)](https://tools.ietf.org/rfc/rfc4861.txt)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NDPMessage {
    RouterSolicitation(RouterSolicitationMessage),
    RouterAdvertisement(RouterAdvertisementMessage),
    NeighborSolicitation(NeighborSolicitationMessage),
    NeighborAdvertisement(NeighborAdvertisementMessage),
}

impl NDPMessage {
    /// メッセージタイプを取得
    pub fn message_type(&self) -> NDPMessageType {
        match self {
            NDPMessage::RouterSolicitation(message) => message.message_type(),
            NDPMessage::RouterAdvertisement(message) => message.message_type(),
            NDPMessage::NeighborSolicitation(message) => message.message_type(),
            NDPMessage::NeighborAdvertisement(message) => message.message_type(),
        }
    }

    /// メッセージをICMPv6パケットにマーシャル
    ///
    /// チェックサムフィールドは0のままにする。カーネルのチェックサム
    /// オフロードが有効な場合は送信時に埋められる
    pub fn marshal(&self) -> Result<Bytes, NDPMessageError> {
        match self {
            NDPMessage::RouterSolicitation(message) => {
                Bytes::try_from(message).map_err(NDPMessageError::from)
            }
            NDPMessage::RouterAdvertisement(message) => {
                Bytes::try_from(message).map_err(NDPMessageError::from)
            }
            NDPMessage::NeighborSolicitation(message) => {
                Bytes::try_from(message).map_err(NDPMessageError::from)
            }
            NDPMessage::NeighborAdvertisement(message) => {
                Bytes::try_from(message).map_err(NDPMessageError::from)
            }
        }
    }

    /// チェックサムを計算してメッセージをICMPv6パケットにマーシャル
    ///
    /// チェックサムオフロードが使えないプラットフォーム向けに、
    /// IPv6疑似ヘッダーからICMPv6チェックサムを計算してバイト2-3に書き込む
    pub fn marshal_with_checksum(
        &self,
        src: &Ipv6Addr,
        dst: &Ipv6Addr,
    ) -> Result<Bytes, NDPMessageError> {
        let mut data = BytesMut::from(self.marshal()?.as_ref());
        let checksum = calculate_icmpv6_checksum(src, dst, &data);
        data[2..4].copy_from_slice(&checksum.to_be_bytes());
        Ok(data.freeze())
    }
}

impl TryFromBytes for NDPMessage {
    type Error = NDPMessageError;

    fn try_from_bytes(value: impl AsRef<[u8]>) -> Result<Self, Self::Error> {
        let bytes = value.as_ref();
        if bytes.len() < 4 {
            return Err(NDPMessageError::InvalidPacketLength(bytes.len()));
        }

        // チェックサム（bytes[2..4]）は検証しない
        // プラットフォームが配送前に検証している前提
        let message_type = NDPMessageType::try_from(bytes[0])?;

        match message_type {
            NDPMessageType::RouterSolicitation => RouterSolicitationMessage::try_from_bytes(bytes)
                .map(NDPMessage::RouterSolicitation)
                .map_err(NDPMessageError::from),
            NDPMessageType::RouterAdvertisement => {
                RouterAdvertisementMessage::try_from_bytes(bytes)
                    .map(NDPMessage::RouterAdvertisement)
                    .map_err(NDPMessageError::from)
            }
            NDPMessageType::NeighborSolicitation => {
                NeighborSolicitationMessage::try_from_bytes(bytes)
                    .map(NDPMessage::NeighborSolicitation)
                    .map_err(NDPMessageError::from)
            }
            NDPMessageType::NeighborAdvertisement => {
                NeighborAdvertisementMessage::try_from_bytes(bytes)
                    .map(NDPMessage::NeighborAdvertisement)
                    .map_err(NDPMessageError::from)
            }
        }
    }
}
impl_try_from_bytes!(NDPMessage, NDPMessageError);

impl From<RouterSolicitationMessage> for NDPMessage {
    fn from(message: RouterSolicitationMessage) -> Self {
        NDPMessage::RouterSolicitation(message)
    }
}
impl From<RouterAdvertisementMessage> for NDPMessage {
    fn from(message: RouterAdvertisementMessage) -> Self {
        NDPMessage::RouterAdvertisement(message)
    }
}
impl From<NeighborSolicitationMessage> for NDPMessage {
    fn from(message: NeighborSolicitationMessage) -> Self {
        NDPMessage::NeighborSolicitation(message)
    }
}
impl From<NeighborAdvertisementMessage> for NDPMessage {
    fn from(message: NeighborAdvertisementMessage) -> Self {
        NDPMessage::NeighborAdvertisement(message)
    }
}

impl TryFrom<&NDPMessage> for Bytes {
    type Error = NDPMessageError;

    fn try_from(message: &NDPMessage) -> Result<Self, Self::Error> {
        message.marshal()
    }
}

impl TryFrom<NDPMessage> for Bytes {
    type Error = NDPMessageError;

    fn try_from(message: NDPMessage) -> Result<Self, Self::Error> {
        message.marshal()
    }
}
