use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::option::raw::{RawOption, RawOptionError};
use crate::{TryFromBytes, impl_try_from_bytes};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MTUOptionError {
    #[error(transparent)]
    InvalidOption(#[from] RawOptionError),
    #[error("Invalid MTU option length. Expected 1, but got {0}.")]
    InvalidOptionLength(u8),
}

/// MTU オプション
///
/// RFC 4861 Section 4.6.4で定義されるオプション。
/// ルーターがリンクの推奨MTUを通知するために使用する
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MTUOption {
    pub mtu: u32,
}

impl MTUOption {
    pub fn new(mtu: u32) -> Self {
        MTUOption { mtu }
    }
}

impl TryFromBytes for MTUOption {
    type Error = MTUOptionError;

    fn try_from_bytes(value: impl AsRef<[u8]>) -> Result<Self, Self::Error> {
        let raw = RawOption::try_from_bytes(value)?;
        if raw.length != 1 {
            return Err(MTUOptionError::InvalidOptionLength(raw.length));
        }

        // 値は2バイトの予約フィールドと4バイトのMTU
        let mtu = u32::from_be_bytes([raw.value[2], raw.value[3], raw.value[4], raw.value[5]]);

        Ok(MTUOption { mtu })
    }
}
impl_try_from_bytes!(MTUOption, MTUOptionError);

impl TryFrom<&MTUOption> for Bytes {
    type Error = MTUOptionError;

    fn try_from(option: &MTUOption) -> Result<Self, Self::Error> {
        let mut data = BytesMut::with_capacity(8);
        data.put_u8(5);
        data.put_u8(1);
        data.put_u16(0); // Reserved
        data.put_u32(option.mtu);
        Ok(data.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mtu_option_marshal() {
        // [正常系] MTU 1500
        let option = MTUOption::new(1500);
        let bytes = Bytes::try_from(&option).unwrap();
        assert_eq!(
            bytes.as_ref(),
            &[0x05, 0x01, 0x00, 0x00, 0x00, 0x00, 0x05, 0xdc]
        );

        // [正常系] MTU 1280 (IPv6最小MTU)
        let option = MTUOption::new(1280);
        let bytes = Bytes::try_from(&option).unwrap();
        assert_eq!(
            bytes.as_ref(),
            &[0x05, 0x01, 0x00, 0x00, 0x00, 0x00, 0x05, 0x00]
        );
    }

    #[test]
    fn test_mtu_option_try_from_bytes() {
        // [正常系] ラウンドトリップ
        let original = MTUOption::new(9000);
        let bytes = Bytes::try_from(&original).unwrap();
        let parsed = MTUOption::try_from(bytes).unwrap();
        assert_eq!(original, parsed);

        // [異常系] バイト列が短い
        assert!(MTUOption::try_from(&[0x05u8][..]).is_err());

        // [異常系] 長さフィールドが1以外
        let bytes = [0x05u8, 0x02, 0, 0, 0, 0, 5, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(matches!(
            MTUOption::try_from(&bytes[..]).unwrap_err(),
            MTUOptionError::InvalidOptionLength(2)
        ));
    }
}
