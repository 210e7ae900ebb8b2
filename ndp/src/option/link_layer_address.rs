use std::fmt::{self, Display};

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::link_layer::MacAddr;
use crate::option::raw::{RawOption, RawOptionError};
use crate::{TryFromBytes, impl_try_from_bytes};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkLayerAddressOptionError {
    #[error(transparent)]
    InvalidOption(#[from] RawOptionError),
    #[error("Invalid link-layer address option type. Expected 1 or 2, but got {0}.")]
    InvalidOptionType(u8),
    #[error("Invalid link-layer address option length. Expected 1, but got {0}.")]
    InvalidOptionLength(u8),
}

/// リンクレイヤアドレスオプションの方向
///
/// Source (Type 1) とTarget (Type 2) はオプションタイプのみが異なる
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Source = 1,
    Target = 2,
}

impl Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Source => write!(f, "source"),
            Direction::Target => write!(f, "target"),
        }
    }
}

/// Source/Target Link-layer Address オプション
///
/// RFC 4861 Section 4.6.1で定義されるオプション。
/// 6バイト（Ethernet）のリンクレイヤアドレスのみをサポートする
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkLayerAddressOption {
    pub direction: Direction,
    pub addr: MacAddr,
}

impl LinkLayerAddressOption {
    /// Source Link-layer Addressオプションを作成
    pub fn source(addr: impl Into<MacAddr>) -> Self {
        LinkLayerAddressOption {
            direction: Direction::Source,
            addr: addr.into(),
        }
    }

    /// Target Link-layer Addressオプションを作成
    pub fn target(addr: impl Into<MacAddr>) -> Self {
        LinkLayerAddressOption {
            direction: Direction::Target,
            addr: addr.into(),
        }
    }
}

impl TryFromBytes for LinkLayerAddressOption {
    type Error = LinkLayerAddressOptionError;

    fn try_from_bytes(value: impl AsRef<[u8]>) -> Result<Self, Self::Error> {
        let raw = RawOption::try_from_bytes(value)?;

        let direction = match raw.option_type {
            1 => Direction::Source,
            2 => Direction::Target,
            t => return Err(LinkLayerAddressOptionError::InvalidOptionType(t)),
        };
        if raw.length != 1 {
            return Err(LinkLayerAddressOptionError::InvalidOptionLength(raw.length));
        }

        // length == 1なので値は常に6バイト
        let mut octets = [0u8; 6];
        octets.copy_from_slice(&raw.value);

        Ok(LinkLayerAddressOption {
            direction,
            addr: MacAddr::from(octets),
        })
    }
}
impl_try_from_bytes!(LinkLayerAddressOption, LinkLayerAddressOptionError);

impl TryFrom<&LinkLayerAddressOption> for Bytes {
    type Error = LinkLayerAddressOptionError;

    fn try_from(option: &LinkLayerAddressOption) -> Result<Self, Self::Error> {
        let mut data = BytesMut::with_capacity(8);
        data.put_u8(option.direction as u8);
        data.put_u8(1);
        data.extend_from_slice(&option.addr.octets());
        Ok(data.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAC: [u8; 6] = [0xde, 0xad, 0xbe, 0xef, 0xde, 0xad];

    #[test]
    fn test_link_layer_address_option_marshal() {
        // [正常系] Source Link-layer Address
        let option = LinkLayerAddressOption::source(MAC);
        let bytes = Bytes::try_from(&option).unwrap();
        assert_eq!(
            bytes.as_ref(),
            &[0x01, 0x01, 0xde, 0xad, 0xbe, 0xef, 0xde, 0xad]
        );

        // [正常系] Target Link-layer Address
        let option = LinkLayerAddressOption::target(MAC);
        let bytes = Bytes::try_from(&option).unwrap();
        assert_eq!(
            bytes.as_ref(),
            &[0x02, 0x01, 0xde, 0xad, 0xbe, 0xef, 0xde, 0xad]
        );
    }

    #[test]
    fn test_link_layer_address_option_try_from_bytes() {
        // [正常系] ラウンドトリップ
        for original in [
            LinkLayerAddressOption::source(MAC),
            LinkLayerAddressOption::target(MAC),
        ] {
            let bytes = Bytes::try_from(&original).unwrap();
            let parsed = LinkLayerAddressOption::try_from(bytes).unwrap();
            assert_eq!(original, parsed);
        }

        // [異常系] バイト列が短い
        assert!(LinkLayerAddressOption::try_from(&[0x01u8, 0x01, 0xff][..]).is_err());

        // [異常系] 不正なオプションタイプ
        let mut bytes = vec![0x10, 0x01];
        bytes.extend_from_slice(&MAC);
        assert!(matches!(
            LinkLayerAddressOption::try_from(&bytes[..]).unwrap_err(),
            LinkLayerAddressOptionError::InvalidOptionType(0x10)
        ));

        // [異常系] 長さフィールドが1以外
        let mut bytes = vec![0x01, 0x02];
        bytes.extend_from_slice(&[0u8; 16]);
        assert!(matches!(
            LinkLayerAddressOption::try_from(&bytes[..]).unwrap_err(),
            LinkLayerAddressOptionError::InvalidOptionLength(2)
        ));
    }
}
