use std::fmt::{self, Display};

use thiserror::Error;

/// NDPメッセージタイプエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NDPMessageTypeError {
    #[error("Unsupported ICMPv6 message type for NDP: {0}")]
    UnsupportedMessageType(u8),
}

/// NDPメッセージタイプ
///
/// RFC 4861で定義されるNeighbor DiscoveryのICMPv6メッセージタイプ。
/// Redirect (137) はこのライブラリではサポートしない
///
/// 参照:
/// - [RFC 4861 - Neighbor Discovery for IP version 6 (IPv6)](https://tools.ietf.org/rfc/rfc4861.txt)
/// - [IANA ICMPv6 Parameters](https://www.iana.org/assignments/icmpv6-parameters/)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NDPMessageType {
    /// Router Solicitation
    /// ルーター発見のためのリクエスト
    RouterSolicitation = 133,

    /// Router Advertisement
    /// ルーターからのアドバタイズメント
    RouterAdvertisement = 134,

    /// Neighbor Solicitation
    /// 近隣ノードの発見・到達性確認
    NeighborSolicitation = 135,

    /// Neighbor Advertisement
    /// 近隣ノードからの応答
    NeighborAdvertisement = 136,
}

impl Display for NDPMessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NDPMessageType::RouterSolicitation => write!(f, "Router Solicitation"),
            NDPMessageType::RouterAdvertisement => write!(f, "Router Advertisement"),
            NDPMessageType::NeighborSolicitation => write!(f, "Neighbor Solicitation"),
            NDPMessageType::NeighborAdvertisement => write!(f, "Neighbor Advertisement"),
        }
    }
}

impl From<NDPMessageType> for u8 {
    fn from(message_type: NDPMessageType) -> Self {
        message_type as u8
    }
}

impl TryFrom<u8> for NDPMessageType {
    type Error = NDPMessageTypeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            133 => Ok(NDPMessageType::RouterSolicitation),
            134 => Ok(NDPMessageType::RouterAdvertisement),
            135 => Ok(NDPMessageType::NeighborSolicitation),
            136 => Ok(NDPMessageType::NeighborAdvertisement),
            _ => Err(NDPMessageTypeError::UnsupportedMessageType(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ndp_message_type_try_from_u8() {
        // [正常系] 有効なメッセージタイプ
        assert_eq!(
            NDPMessageType::try_from(133),
            Ok(NDPMessageType::RouterSolicitation)
        );
        assert_eq!(
            NDPMessageType::try_from(134),
            Ok(NDPMessageType::RouterAdvertisement)
        );
        assert_eq!(
            NDPMessageType::try_from(135),
            Ok(NDPMessageType::NeighborSolicitation)
        );
        assert_eq!(
            NDPMessageType::try_from(136),
            Ok(NDPMessageType::NeighborAdvertisement)
        );

        // [異常系] Redirectはサポートしない
        assert_eq!(
            NDPMessageType::try_from(137).unwrap_err(),
            NDPMessageTypeError::UnsupportedMessageType(137)
        );

        // [異常系] NDP以外のICMPv6タイプ
        assert_eq!(
            NDPMessageType::try_from(128).unwrap_err(),
            NDPMessageTypeError::UnsupportedMessageType(128)
        );
        assert_eq!(
            NDPMessageType::try_from(255).unwrap_err(),
            NDPMessageTypeError::UnsupportedMessageType(255)
        );
    }

    #[test]
    fn test_ndp_message_type_from_u8() {
        // [正常系] NDPMessageType -> u8の変換
        assert_eq!(u8::from(NDPMessageType::RouterSolicitation), 133);
        assert_eq!(u8::from(NDPMessageType::RouterAdvertisement), 134);
        assert_eq!(u8::from(NDPMessageType::NeighborSolicitation), 135);
        assert_eq!(u8::from(NDPMessageType::NeighborAdvertisement), 136);
    }

    #[test]
    fn test_ndp_message_type_display() {
        // [正常系] Displayトレイトのテスト
        assert_eq!(
            format!("{}", NDPMessageType::RouterSolicitation),
            "Router Solicitation"
        );
        assert_eq!(
            format!("{}", NDPMessageType::NeighborAdvertisement),
            "Neighbor Advertisement"
        );
    }
}
