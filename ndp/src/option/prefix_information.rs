use std::net::Ipv6Addr;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::address::IPv6AddrExt;
use crate::option::raw::{RawOption, RawOptionError};
use crate::prefix::mask_address;
use crate::{TryFromBytes, impl_try_from_bytes};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrefixInformationOptionError {
    #[error(transparent)]
    InvalidOption(#[from] RawOptionError),
    #[error("Invalid prefix information option length. Expected 4, but got {0}.")]
    InvalidOptionLength(u8),
    #[error("Invalid prefix length. Must be between 0 and 128, but got {0}")]
    InvalidPrefixLength(u8),
    #[error("Invalid prefix: {0} has bits set beyond prefix length {1}")]
    UnmaskedPrefix(Ipv6Addr, u8),
    #[error("Invalid prefix: {0} is an IPv4-mapped address")]
    IPv4MappedPrefix(Ipv6Addr),
    #[error("Invalid lifetime: {0:?} does not fit in 32 bits of seconds")]
    InvalidLifetime(Duration),
}

/// Prefix Information オプション
///
/// RFC 4861 Section 4.6.2で定義されるオプション。
/// Router AdvertisementでSLAACやon-link判定に使うプレフィックスを広告する
///
/// ライフタイムは秒単位で符号化され、0xffffffff ([`crate::INFINITY`]) は無限を表す
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixInformationOption {
    /// プレフィックス長
    pub prefix_length: u8,

    /// L flag (On-link)
    /// プレフィックスがon-link判定に使用できるかどうか
    pub on_link: bool,

    /// A flag (Autonomous address-configuration)
    /// プレフィックスがSLAACに使用できるかどうか
    pub autonomous: bool,

    /// Valid Lifetime
    pub valid_lifetime: Duration,

    /// Preferred Lifetime
    pub preferred_lifetime: Duration,

    /// 広告されるプレフィックス
    /// prefix_lengthを超えるビットは0でなければならない
    pub prefix: Ipv6Addr,
}

fn lifetime_seconds(lifetime: Duration) -> Result<u32, PrefixInformationOptionError> {
    u32::try_from(lifetime.as_secs())
        .map_err(|_| PrefixInformationOptionError::InvalidLifetime(lifetime))
}

impl TryFromBytes for PrefixInformationOption {
    type Error = PrefixInformationOptionError;

    fn try_from_bytes(value: impl AsRef<[u8]>) -> Result<Self, Self::Error> {
        let raw = RawOption::try_from_bytes(value)?;
        if raw.length != 4 {
            return Err(PrefixInformationOptionError::InvalidOptionLength(
                raw.length,
            ));
        }

        let prefix_length = raw.value[0];
        if prefix_length > 128 {
            return Err(PrefixInformationOptionError::InvalidPrefixLength(
                prefix_length,
            ));
        }

        let flags = raw.value[1];
        let on_link = (flags & 0x80) != 0;
        let autonomous = (flags & 0x40) != 0;

        let valid_lifetime = u32::from_be_bytes([
            raw.value[2],
            raw.value[3],
            raw.value[4],
            raw.value[5],
        ]);
        let preferred_lifetime = u32::from_be_bytes([
            raw.value[6],
            raw.value[7],
            raw.value[8],
            raw.value[9],
        ]);
        // raw.value[10..14]は予約フィールド、受信時は無視する

        let mut octets = [0u8; 16];
        octets.copy_from_slice(&raw.value[14..30]);
        // プレフィックス長を超えるビットは受信時に0にクリアする
        let prefix = mask_address(&Ipv6Addr::from(octets), prefix_length);

        Ok(PrefixInformationOption {
            prefix_length,
            on_link,
            autonomous,
            valid_lifetime: Duration::from_secs(valid_lifetime as u64),
            preferred_lifetime: Duration::from_secs(preferred_lifetime as u64),
            prefix,
        })
    }
}
impl_try_from_bytes!(PrefixInformationOption, PrefixInformationOptionError);

impl TryFrom<&PrefixInformationOption> for Bytes {
    type Error = PrefixInformationOptionError;

    fn try_from(option: &PrefixInformationOption) -> Result<Self, Self::Error> {
        if option.prefix_length > 128 {
            return Err(PrefixInformationOptionError::InvalidPrefixLength(
                option.prefix_length,
            ));
        }
        if option.prefix.is_ipv4_mapped() {
            return Err(PrefixInformationOptionError::IPv4MappedPrefix(option.prefix));
        }
        // プレフィックス長を超えるビットが立っているアドレスは不正
        if mask_address(&option.prefix, option.prefix_length) != option.prefix {
            return Err(PrefixInformationOptionError::UnmaskedPrefix(
                option.prefix,
                option.prefix_length,
            ));
        }

        let mut data = BytesMut::with_capacity(32);
        data.put_u8(3);
        data.put_u8(4);
        data.put_u8(option.prefix_length);
        let flags = if option.on_link { 0x80u8 } else { 0 }
            | if option.autonomous { 0x40 } else { 0 };
        data.put_u8(flags);
        data.put_u32(lifetime_seconds(option.valid_lifetime)?);
        data.put_u32(lifetime_seconds(option.preferred_lifetime)?);
        data.put_u32(0); // Reserved
        data.extend_from_slice(&option.prefix.octets());
        Ok(data.freeze())
    }
}
