use std::net::Ipv6Addr;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::option::raw::{RawOption, RawOptionError};
use crate::preference::{Preference, PreferenceError};
use crate::prefix::mask_address;
use crate::{TryFromBytes, impl_try_from_bytes};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteInformationOptionError {
    #[error(transparent)]
    InvalidOption(#[from] RawOptionError),
    #[error("Invalid route information option length {0} for prefix length {1}.")]
    InvalidOptionLength(u8, u8),
    #[error("Invalid prefix length. Must be between 0 and 128, but got {0}")]
    InvalidPrefixLength(u8),
    #[error("Invalid prefix: {0} has bits set beyond prefix length {1}")]
    UnmaskedPrefix(Ipv6Addr, u8),
    #[error(transparent)]
    InvalidPreference(#[from] PreferenceError),
    #[error("Invalid lifetime: {0:?} does not fit in 32 bits of seconds")]
    InvalidLifetime(Duration),
}

/// Route Information オプション
///
/// RFC 4191 Section 2.3で定義されるオプション。
/// デフォルトルート以外の経路とその優先度を広告する
///
/// プレフィックスはプレフィックス長に応じて0/8/16バイトに切り詰めて
/// 符号化される。受信時は/64に対して長さ3（パディング付き）の
/// オプションも受理する（実機で観測される挙動）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteInformationOption {
    /// プレフィックス長
    pub prefix_length: u8,

    /// 経路の優先度
    pub preference: Preference,

    /// Route Lifetime
    pub route_lifetime: Duration,

    /// 広告される経路のプレフィックス
    pub prefix: Ipv6Addr,
}

impl TryFromBytes for RouteInformationOption {
    type Error = RouteInformationOptionError;

    fn try_from_bytes(value: impl AsRef<[u8]>) -> Result<Self, Self::Error> {
        let raw = RawOption::try_from_bytes(value)?;

        let prefix_length = raw.value[0];
        if prefix_length > 128 {
            return Err(RouteInformationOptionError::InvalidPrefixLength(
                prefix_length,
            ));
        }

        // RFC 4191 Section 2.3: オプション長はプレフィックス長に応じて1〜3
        let length_valid = match prefix_length {
            0 => (1..=3).contains(&raw.length),
            1..=64 => (2..=3).contains(&raw.length),
            _ => raw.length == 3,
        };
        if !length_valid {
            return Err(RouteInformationOptionError::InvalidOptionLength(
                raw.length,
                prefix_length,
            ));
        }

        let preference = Preference::try_from((raw.value[1] >> 3) & 0x03)?;
        let route_lifetime = u32::from_be_bytes([
            raw.value[2],
            raw.value[3],
            raw.value[4],
            raw.value[5],
        ]);

        // プレフィックスは切り詰められている可能性があるため0で拡張する
        let mut octets = [0u8; 16];
        let prefix_bytes = &raw.value[6..];
        octets[..prefix_bytes.len().min(16)]
            .copy_from_slice(&prefix_bytes[..prefix_bytes.len().min(16)]);
        let prefix = mask_address(&Ipv6Addr::from(octets), prefix_length);

        Ok(RouteInformationOption {
            prefix_length,
            preference,
            route_lifetime: Duration::from_secs(route_lifetime as u64),
            prefix,
        })
    }
}
impl_try_from_bytes!(RouteInformationOption, RouteInformationOptionError);

impl TryFrom<&RouteInformationOption> for Bytes {
    type Error = RouteInformationOptionError;

    fn try_from(option: &RouteInformationOption) -> Result<Self, Self::Error> {
        if option.prefix_length > 128 {
            return Err(RouteInformationOptionError::InvalidPrefixLength(
                option.prefix_length,
            ));
        }
        if mask_address(&option.prefix, option.prefix_length) != option.prefix {
            return Err(RouteInformationOptionError::UnmaskedPrefix(
                option.prefix,
                option.prefix_length,
            ));
        }

        // 送信時はプレフィックス長に対して最小のオプション長を使用する
        let (length, prefix_len_bytes) = match option.prefix_length {
            0 => (1u8, 0usize),
            1..=64 => (2, 8),
            _ => (3, 16),
        };

        let lifetime = u32::try_from(option.route_lifetime.as_secs())
            .map_err(|_| RouteInformationOptionError::InvalidLifetime(option.route_lifetime))?;

        let mut data = BytesMut::with_capacity(length as usize * 8);
        data.put_u8(24);
        data.put_u8(length);
        data.put_u8(option.prefix_length);
        data.put_u8(u8::from(option.preference) << 3);
        data.put_u32(lifetime);
        data.extend_from_slice(&option.prefix.octets()[..prefix_len_bytes]);
        Ok(data.freeze())
    }
}
