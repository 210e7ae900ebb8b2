use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::message::Message;
use crate::message_type::NDPMessageType;
use crate::option::{NDPOption, NDPOptionError, marshal_options, parse_options};
use crate::preference::{Preference, PreferenceError};
use crate::{TryFromBytes, impl_try_from_bytes};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterAdvertisementMessageError {
    #[error("Invalid router advertisement message type. Expected 134, but got {0}.")]
    InvalidMessageType(u8),
    #[error(
        "Invalid router advertisement message length. Expected at least 16 bytes, but got {0} bytes."
    )]
    InvalidMessageLength(usize),
    #[error(transparent)]
    InvalidPreference(#[from] PreferenceError),
    #[error("Invalid router lifetime: {0:?} does not fit in 16 bits of seconds")]
    InvalidRouterLifetime(Duration),
    #[error("Invalid timer value: {0:?} does not fit in 32 bits of milliseconds")]
    InvalidTimer(Duration),
    #[error(transparent)]
    InvalidOptions(#[from] NDPOptionError),
}

/// Router Advertisement メッセージ
///
/// RFC 4861 Section 4.2で定義されるRouter Advertisement (Type 134)。
/// ルーターがRouter Solicitationへの応答または定期送信で、
/// 自身の存在とネットワーク設定情報を通知する
///
/// フラグはRFC 4861のM/Oに加えて、RFC 3775のH（Home Agent）、
/// RFC 4191のPrf（2ビットの優先度）、RFC 4389のP（NDプロキシ）を持つ
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouterAdvertisementMessage {
    /// Current Hop Limit
    /// このルーターから送信されるパケットのHop Limitの初期値
    pub current_hop_limit: u8,

    /// M flag (Managed address configuration)
    /// DHCPv6による自動アドレス設定を使用するかどうか
    pub managed_configuration: bool,

    /// O flag (Other configuration)
    /// DHCPv6によるアドレス以外の自動設定を使用するかどうか
    pub other_configuration: bool,

    /// H flag (Mobile IPv6 Home Agent)
    pub mobile_ipv6_home_agent: bool,

    /// Prf (Default Router Preference)
    /// 予約値10bは送受信ともに拒否される
    pub preference: Preference,

    /// P flag (Neighbor Discovery Proxy)
    pub neighbor_discovery_proxy: bool,

    /// Router Lifetime
    /// このルーターをデフォルトルーターとして使用できる時間（秒単位）
    pub router_lifetime: Duration,

    /// Reachable Time
    /// 近隣ノードが到達可能と判断する時間（ミリ秒単位）
    pub reachable_time: Duration,

    /// Retrans Timer
    /// 近隣要請メッセージの再送間隔（ミリ秒単位）
    pub retrans_timer: Duration,

    /// Options (variable length)
    /// 可能なオプション:
    /// - Source Link-layer Address (Type 1)
    /// - MTU (Type 5)
    /// - Prefix Information (Type 3)
    /// - Route Information (Type 24) など
    pub options: Vec<NDPOption>,
}

impl TryFromBytes for RouterAdvertisementMessage {
    type Error = RouterAdvertisementMessageError;

    fn try_from_bytes(value: impl AsRef<[u8]>) -> Result<Self, Self::Error> {
        let bytes = value.as_ref();
        if bytes.len() < 16 {
            return Err(RouterAdvertisementMessageError::InvalidMessageLength(
                bytes.len(),
            ));
        }
        if bytes[0] != 134 {
            return Err(RouterAdvertisementMessageError::InvalidMessageType(
                bytes[0],
            ));
        }

        let current_hop_limit = bytes[4];
        let flags = bytes[5];
        let managed_configuration = (flags & 0x80) != 0;
        let other_configuration = (flags & 0x40) != 0;
        let mobile_ipv6_home_agent = (flags & 0x20) != 0;
        let preference = Preference::try_from((flags >> 3) & 0x03)?;
        let neighbor_discovery_proxy = (flags & 0x04) != 0;

        let router_lifetime = u16::from_be_bytes([bytes[6], bytes[7]]);
        let reachable_time = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        let retrans_timer = u32::from_be_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);

        let options = parse_options(&bytes[16..])?;

        Ok(RouterAdvertisementMessage {
            current_hop_limit,
            managed_configuration,
            other_configuration,
            mobile_ipv6_home_agent,
            preference,
            neighbor_discovery_proxy,
            router_lifetime: Duration::from_secs(router_lifetime as u64),
            reachable_time: Duration::from_millis(reachable_time as u64),
            retrans_timer: Duration::from_millis(retrans_timer as u64),
            options,
        })
    }
}
impl_try_from_bytes!(RouterAdvertisementMessage, RouterAdvertisementMessageError);

impl Message for RouterAdvertisementMessage {
    fn message_type(&self) -> NDPMessageType {
        NDPMessageType::RouterAdvertisement
    }

    fn code(&self) -> u8 {
        0 // Router Advertisement always has code 0
    }
}

impl TryFrom<&RouterAdvertisementMessage> for Bytes {
    type Error = RouterAdvertisementMessageError;

    fn try_from(message: &RouterAdvertisementMessage) -> Result<Self, Self::Error> {
        let router_lifetime = u16::try_from(message.router_lifetime.as_secs())
            .map_err(|_| {
                RouterAdvertisementMessageError::InvalidRouterLifetime(message.router_lifetime)
            })?;
        let reachable_time = u32::try_from(message.reachable_time.as_millis())
            .map_err(|_| RouterAdvertisementMessageError::InvalidTimer(message.reachable_time))?;
        let retrans_timer = u32::try_from(message.retrans_timer.as_millis())
            .map_err(|_| RouterAdvertisementMessageError::InvalidTimer(message.retrans_timer))?;

        let options = marshal_options(&message.options)?;

        let mut data = BytesMut::with_capacity(16 + options.len());
        // Type (1 byte)
        data.put_u8(message.message_type().into());
        // Code (1 byte)
        data.put_u8(message.code());
        // Checksum (2 bytes) - カーネルまたは呼び出し側が計算する
        data.put_u16(0);
        // Current Hop Limit (1 byte)
        data.put_u8(message.current_hop_limit);
        // Flags (1 byte): M, O, H, Prf(2bit), P, Reserved(2bit)
        let flags = if message.managed_configuration { 0x80u8 } else { 0 }
            | if message.other_configuration { 0x40 } else { 0 }
            | if message.mobile_ipv6_home_agent { 0x20 } else { 0 }
            | (u8::from(message.preference) << 3)
            | if message.neighbor_discovery_proxy { 0x04 } else { 0 };
        data.put_u8(flags);
        // Router Lifetime (2 bytes)
        data.put_u16(router_lifetime);
        // Reachable Time (4 bytes)
        data.put_u32(reachable_time);
        // Retrans Timer (4 bytes)
        data.put_u32(retrans_timer);
        // Options (variable length)
        data.extend_from_slice(&options);

        Ok(data.freeze())
    }
}

impl TryFrom<RouterAdvertisementMessage> for Bytes {
    type Error = RouterAdvertisementMessageError;

    fn try_from(message: RouterAdvertisementMessage) -> Result<Self, Self::Error> {
        Bytes::try_from(&message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::{LinkLayerAddressOption, MTUOption};

    const MAC: [u8; 6] = [0xde, 0xad, 0xbe, 0xef, 0xde, 0xad];

    #[test]
    fn test_router_advertisement_message_marshal() {
        // [正常系] M/Oフラグとタイマー、オプション付き
        let message = RouterAdvertisementMessage {
            current_hop_limit: 10,
            managed_configuration: true,
            other_configuration: true,
            preference: Preference::Medium,
            router_lifetime: Duration::from_secs(30),
            reachable_time: Duration::from_millis(12345),
            retrans_timer: Duration::from_millis(23456),
            options: vec![
                LinkLayerAddressOption::source(MAC).into(),
                MTUOption::new(1280).into(),
            ],
            ..Default::default()
        };
        let bytes = Bytes::try_from(&message).unwrap();
        let expected = [
            0x86, 0x00, 0x00, 0x00, // Type: 134, Code: 0, Checksum: 0
            0x0a, // Current Hop Limit: 10
            0xc0, // Flags: M=1, O=1
            0x00, 0x1e, // Router Lifetime: 30
            0x00, 0x00, 0x30, 0x39, // Reachable Time: 12345
            0x00, 0x00, 0x5b, 0xa0, // Retrans Timer: 23456
            0x01, 0x01, 0xde, 0xad, 0xbe, 0xef, 0xde, 0xad, // Source LLA option
            0x05, 0x01, 0x00, 0x00, 0x00, 0x00, 0x05, 0x00, // MTU option: 1280
        ];
        assert_eq!(bytes.as_ref(), &expected);

        // [正常系] H/Prf/Pフラグ
        let message = RouterAdvertisementMessage {
            mobile_ipv6_home_agent: true,
            preference: Preference::Low,
            neighbor_discovery_proxy: true,
            ..Default::default()
        };
        let bytes = Bytes::try_from(&message).unwrap();
        assert_eq!(bytes[5], 0x3c);

        // [正常系] Prf High
        let message = RouterAdvertisementMessage {
            preference: Preference::High,
            ..Default::default()
        };
        let bytes = Bytes::try_from(&message).unwrap();
        assert_eq!(bytes[5], 0x08);

        // [異常系] Router Lifetimeが16ビット秒に収まらない
        let message = RouterAdvertisementMessage {
            router_lifetime: Duration::from_secs(u64::from(u16::MAX) + 1),
            ..Default::default()
        };
        assert!(matches!(
            Bytes::try_from(&message).unwrap_err(),
            RouterAdvertisementMessageError::InvalidRouterLifetime(_)
        ));

        // [異常系] Reachable Timeが32ビットミリ秒に収まらない
        let message = RouterAdvertisementMessage {
            reachable_time: Duration::from_millis(u64::from(u32::MAX) + 1),
            ..Default::default()
        };
        assert!(matches!(
            Bytes::try_from(&message).unwrap_err(),
            RouterAdvertisementMessageError::InvalidTimer(_)
        ));
    }

    #[test]
    fn test_router_advertisement_message_try_from_bytes() {
        // [正常系] フラグとタイマーのパース
        let bytes = [
            134, 0, 0, 0, // Type: 134, Code: 0, Checksum: 0
            64,   // Current Hop Limit: 64
            0x80, // Flags: M=1
            0x07, 0x08, // Router Lifetime: 1800
            0x00, 0x00, 0x75, 0x30, // Reachable Time: 30000
            0x00, 0x00, 0x03, 0xE8, // Retrans Timer: 1000
        ];
        let message = RouterAdvertisementMessage::try_from(&bytes[..]).unwrap();
        assert_eq!(message.current_hop_limit, 64);
        assert!(message.managed_configuration);
        assert!(!message.other_configuration);
        assert_eq!(message.preference, Preference::Medium);
        assert_eq!(message.router_lifetime, Duration::from_secs(1800));
        assert_eq!(message.reachable_time, Duration::from_millis(30000));
        assert_eq!(message.retrans_timer, Duration::from_millis(1000));
        assert!(message.options.is_empty());

        // [異常系] 予約されたPrf値 (10b)
        let bytes = [
            134, 0, 0, 0, 0, 0x10, // Flags: Prf=10b
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ];
        assert!(matches!(
            RouterAdvertisementMessage::try_from(&bytes[..]).unwrap_err(),
            RouterAdvertisementMessageError::InvalidPreference(PreferenceError::ReservedPreference)
        ));

        // [異常系] バイト列が短い
        let short = [134u8, 0, 0, 0, 0];
        assert!(matches!(
            RouterAdvertisementMessage::try_from(&short[..]).unwrap_err(),
            RouterAdvertisementMessageError::InvalidMessageLength(5)
        ));

        // [異常系] メッセージタイプが不正
        let bytes = [133u8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(matches!(
            RouterAdvertisementMessage::try_from(&bytes[..]).unwrap_err(),
            RouterAdvertisementMessageError::InvalidMessageType(133)
        ));
    }

    #[test]
    fn test_router_advertisement_message_round_trip() {
        // [正常系] ラウンドトリップ
        let original = RouterAdvertisementMessage {
            current_hop_limit: 64,
            managed_configuration: true,
            other_configuration: false,
            mobile_ipv6_home_agent: true,
            preference: Preference::High,
            neighbor_discovery_proxy: false,
            router_lifetime: Duration::from_secs(1800),
            reachable_time: Duration::from_millis(30000),
            retrans_timer: Duration::from_millis(1000),
            options: vec![
                LinkLayerAddressOption::source(MAC).into(),
                MTUOption::new(1500).into(),
            ],
        };
        let bytes = Bytes::try_from(&original).unwrap();
        let parsed = RouterAdvertisementMessage::try_from(bytes).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_router_advertisement_message_ignores_reserved_flags() {
        // [正常系] フラグの予約ビットが立っていてもパースは成功する
        let bytes = [
            134, 0, 0, 0, 0, 0x03, // Flags: 予約2ビットが非ゼロ
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ];
        let message = RouterAdvertisementMessage::try_from(&bytes[..]).unwrap();
        assert!(!message.managed_configuration);
        assert!(!message.neighbor_discovery_proxy);
    }
}
