use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::{TryFromBytes, impl_try_from_bytes};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RawOptionError {
    #[error("Invalid option length. Expected at least 2 bytes, but got {0} bytes.")]
    InvalidOptionLength(usize),
    #[error("Invalid option length field: must be at least 1")]
    ZeroLength,
    #[error(
        "Option length field mismatch. Length field {0} requires {1} value bytes, but got {2} bytes."
    )]
    LengthMismatch(u8, usize, usize),
}

/// 未知のタイプのNDPオプション
///
/// RFC 4861 Section 4.6の共通フレーミング（タイプ1バイト、8バイト単位の
/// 長さ1バイト、値）をそのまま保持する。既知のオプションのアンマーシャルでも
/// フレーミング検証のために内部的に使用される
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOption {
    /// オプションタイプ
    pub option_type: u8,

    /// オプション長（8バイト単位、タイプ・長さフィールドを含む）
    pub length: u8,

    /// 値（`length * 8 - 2`バイト）
    pub value: Bytes,
}

impl TryFromBytes for RawOption {
    type Error = RawOptionError;

    fn try_from_bytes(value: impl AsRef<[u8]>) -> Result<Self, Self::Error> {
        let bytes = value.as_ref();
        if bytes.len() < 2 {
            return Err(RawOptionError::InvalidOptionLength(bytes.len()));
        }

        let option_type = bytes[0];
        let length = bytes[1];
        if length == 0 {
            return Err(RawOptionError::ZeroLength);
        }

        let value_len = length as usize * 8 - 2;
        if bytes[2..].len() < value_len {
            return Err(RawOptionError::LengthMismatch(
                length,
                value_len,
                bytes[2..].len(),
            ));
        }

        Ok(RawOption {
            option_type,
            length,
            value: Bytes::copy_from_slice(&bytes[2..2 + value_len]),
        })
    }
}
impl_try_from_bytes!(RawOption, RawOptionError);

impl TryFrom<&RawOption> for Bytes {
    type Error = RawOptionError;

    fn try_from(option: &RawOption) -> Result<Self, Self::Error> {
        // 値の長さは長さフィールドと整合していなければならない
        if option.length == 0 {
            return Err(RawOptionError::ZeroLength);
        }
        let expected = option.length as usize * 8 - 2;
        if option.value.len() != expected {
            return Err(RawOptionError::LengthMismatch(
                option.length,
                expected,
                option.value.len(),
            ));
        }

        let mut data = BytesMut::with_capacity(2 + option.value.len());
        data.put_u8(option.option_type);
        data.put_u8(option.length);
        data.extend_from_slice(&option.value);
        Ok(data.freeze())
    }
}
