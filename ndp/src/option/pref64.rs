use std::net::Ipv6Addr;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::option::raw::{RawOption, RawOptionError};
use crate::prefix::{IPv6Prefix, IPv6PrefixError, mask_address};
use crate::{TryFromBytes, impl_try_from_bytes};

/// Scaled Lifetimeフィールドの最大値（13ビット）
const MAX_SCALED_LIFETIME: u64 = 0x1fff;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PREF64OptionError {
    #[error(transparent)]
    InvalidOption(#[from] RawOptionError),
    #[error(transparent)]
    InvalidPrefix(#[from] IPv6PrefixError),
    #[error("Invalid PREF64 option length. Expected 2, but got {0}.")]
    InvalidOptionLength(u8),
    #[error("Invalid PREF64 prefix length. Must be one of 96, 64, 56, 48, 40 or 32, but got {0}")]
    InvalidPrefixLength(u8),
    #[error("Invalid PREF64 prefix length code: {0}")]
    InvalidPLC(u8),
    #[error("Invalid PREF64 lifetime {0:?}: must be zero or at least 8 seconds")]
    LifetimeTooShort(Duration),
    #[error("Invalid PREF64 lifetime {0:?}: must be at most 65528 seconds")]
    LifetimeTooLong(Duration),
}

/// PREF64 オプション
///
/// RFC 8781 Section 4で定義されるオプション。
/// NAT64プレフィックスとそのライフタイムを広告する
///
/// ライフタイムは8秒単位の13ビット値（Scaled Lifetime）で、
/// プレフィックス長は3ビットのPrefix Length Code (PLC) で符号化される
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PREF64Option {
    /// NAT64プレフィックス
    /// プレフィックス長は96/64/56/48/40/32のいずれか
    pub prefix: IPv6Prefix,

    /// Lifetime（8秒単位に切り捨てられる）
    pub lifetime: Duration,
}

/// プレフィックス長からPrefix Length Codeへの変換
fn plc_from_prefix_length(prefix_length: u8) -> Option<u16> {
    match prefix_length {
        96 => Some(0),
        64 => Some(1),
        56 => Some(2),
        48 => Some(3),
        40 => Some(4),
        32 => Some(5),
        _ => None,
    }
}

/// Prefix Length Codeからプレフィックス長への変換
fn prefix_length_from_plc(plc: u16) -> Option<u8> {
    match plc {
        0 => Some(96),
        1 => Some(64),
        2 => Some(56),
        3 => Some(48),
        4 => Some(40),
        5 => Some(32),
        _ => None,
    }
}

impl TryFromBytes for PREF64Option {
    type Error = PREF64OptionError;

    fn try_from_bytes(value: impl AsRef<[u8]>) -> Result<Self, Self::Error> {
        let raw = RawOption::try_from_bytes(value)?;
        if raw.length != 2 {
            return Err(PREF64OptionError::InvalidOptionLength(raw.length));
        }

        let packed = u16::from_be_bytes([raw.value[0], raw.value[1]]);
        let plc = packed & 0x07;
        let prefix_length = prefix_length_from_plc(plc)
            .ok_or(PREF64OptionError::InvalidPLC(plc as u8))?;
        let scaled_lifetime = packed >> 3;

        // プレフィックスは上位96ビットのみが符号化されている
        let mut octets = [0u8; 16];
        octets[..12].copy_from_slice(&raw.value[2..14]);

        Ok(PREF64Option {
            prefix: IPv6Prefix::new(Ipv6Addr::from(octets), prefix_length)?,
            lifetime: Duration::from_secs(scaled_lifetime as u64 * 8),
        })
    }
}
impl_try_from_bytes!(PREF64Option, PREF64OptionError);

impl TryFrom<&PREF64Option> for Bytes {
    type Error = PREF64OptionError;

    fn try_from(option: &PREF64Option) -> Result<Self, Self::Error> {
        let plc = plc_from_prefix_length(option.prefix.prefix_length())
            .ok_or(PREF64OptionError::InvalidPrefixLength(
                option.prefix.prefix_length(),
            ))?;

        let scaled_lifetime = option.lifetime.as_secs() / 8;
        if scaled_lifetime == 0 && !option.lifetime.is_zero() {
            return Err(PREF64OptionError::LifetimeTooShort(option.lifetime));
        }
        if scaled_lifetime > MAX_SCALED_LIFETIME {
            return Err(PREF64OptionError::LifetimeTooLong(option.lifetime));
        }

        let packed = ((scaled_lifetime as u16) << 3) | plc;
        let masked = mask_address(&option.prefix.address(), option.prefix.prefix_length());

        let mut data = BytesMut::with_capacity(16);
        data.put_u8(38);
        data.put_u8(2);
        data.put_u16(packed);
        data.extend_from_slice(&masked.octets()[..12]);
        Ok(data.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pref64_option_marshal() {
        // [正常系] /96プレフィックス、最大ライフタイム
        let option = PREF64Option {
            prefix: "2001:db8::/96".parse().unwrap(),
            lifetime: Duration::from_secs(8 * 8191),
        };
        let bytes = Bytes::try_from(&option).unwrap();
        let expected = [
            0x26, 0x02, // Type: 38, Length: 2
            0xff, 0xf8, // Scaled Lifetime: 8191, PLC: 0
            0x20, 0x01, 0x0d, 0xb8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        assert_eq!(bytes.as_ref(), &expected);

        // [正常系] PLCの各値
        for (prefix, packed_low) in [
            ("2001:db8::/96", 0xf8u8),
            ("2001:db8::/64", 0xf9),
            ("2001:db8::/56", 0xfa),
            ("2001:db8::/48", 0xfb),
            ("2001:db8::/40", 0xfc),
        ] {
            let option = PREF64Option {
                prefix: prefix.parse().unwrap(),
                lifetime: Duration::from_secs(8 * 8191),
            };
            let bytes = Bytes::try_from(&option).unwrap();
            assert_eq!(bytes[2], 0xff);
            assert_eq!(bytes[3], packed_low);
        }

        // [正常系] /32プレフィックス、10分のライフタイム
        let option = PREF64Option {
            prefix: "2001:db8::/32".parse().unwrap(),
            lifetime: Duration::from_secs(10 * 60),
        };
        let bytes = Bytes::try_from(&option).unwrap();
        assert_eq!(&bytes[2..4], &[0x02, 0x5d]);

        // [異常系] 不正なプレフィックス長
        let option = PREF64Option {
            prefix: "2001:db8::/33".parse().unwrap(),
            lifetime: Duration::ZERO,
        };
        assert!(matches!(
            Bytes::try_from(&option).unwrap_err(),
            PREF64OptionError::InvalidPrefixLength(33)
        ));

        // [異常系] ライフタイムが上限を超える
        let option = PREF64Option {
            prefix: "2001:db8::/32".parse().unwrap(),
            lifetime: Duration::from_secs(24 * 3600),
        };
        assert!(matches!(
            Bytes::try_from(&option).unwrap_err(),
            PREF64OptionError::LifetimeTooLong(_)
        ));

        // [異常系] 8秒未満の非ゼロライフタイム
        let option = PREF64Option {
            prefix: "2001:db8::/96".parse().unwrap(),
            lifetime: Duration::from_secs(7),
        };
        assert!(matches!(
            Bytes::try_from(&option).unwrap_err(),
            PREF64OptionError::LifetimeTooShort(_)
        ));
    }

    #[test]
    fn test_pref64_option_round_trip() {
        // [正常系] ラウンドトリップ
        for original in [
            PREF64Option {
                prefix: "2001:db8::/96".parse().unwrap(),
                lifetime: Duration::from_secs(8 * 8191),
            },
            PREF64Option {
                prefix: "64:ff9b::/96".parse().unwrap(),
                lifetime: Duration::from_secs(600),
            },
            PREF64Option {
                prefix: "2001:db8::/32".parse().unwrap(),
                lifetime: Duration::ZERO,
            },
        ] {
            let bytes = Bytes::try_from(&original).unwrap();
            let parsed = PREF64Option::try_from(bytes).unwrap();
            assert_eq!(original, parsed);
        }
    }

    #[test]
    fn test_pref64_option_try_from_bytes_error() {
        // [異常系] 不正なPLC
        let mut bytes = vec![0x26u8, 0x02, 0x00, 0x07];
        bytes.extend_from_slice(&[0u8; 12]);
        assert!(matches!(
            PREF64Option::try_from(&bytes[..]).unwrap_err(),
            PREF64OptionError::InvalidPLC(7)
        ));

        // [異常系] 長さフィールドが2以外
        let bytes = [0x26u8, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert!(matches!(
            PREF64Option::try_from(&bytes[..]).unwrap_err(),
            PREF64OptionError::InvalidOptionLength(1)
        ));
    }
}
