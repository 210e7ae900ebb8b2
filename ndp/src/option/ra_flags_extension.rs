use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::option::raw::{RawOption, RawOptionError};
use crate::{TryFromBytes, impl_try_from_bytes};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RAFlagsExtensionOptionError {
    #[error(transparent)]
    InvalidOption(#[from] RawOptionError),
    #[error("Invalid RA flags extension option length. Expected 1 or 2, but got {0}.")]
    InvalidOptionLength(u8),
    #[error("Invalid RA flags length. Expected 6 or 14 bytes, but got {0} bytes.")]
    InvalidFlagsLength(usize),
    #[error("RA flags extension must carry at least one non-zero flag bit")]
    ZeroFlags,
}

/// RA Flags Extension オプション
///
/// RFC 5175 Section 4で定義されるオプション。
/// Router Advertisementのフラグフィールドを6バイトまたは14バイト分拡張する
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RAFlagsExtensionOption {
    /// 拡張フラグビット列（6または14バイト、少なくとも1ビットが非ゼロ）
    pub flags: Bytes,
}

impl RAFlagsExtensionOption {
    fn validate_flags(flags: &[u8]) -> Result<(), RAFlagsExtensionOptionError> {
        if flags.len() != 6 && flags.len() != 14 {
            return Err(RAFlagsExtensionOptionError::InvalidFlagsLength(flags.len()));
        }
        if flags.iter().all(|&b| b == 0) {
            return Err(RAFlagsExtensionOptionError::ZeroFlags);
        }
        Ok(())
    }
}

impl TryFromBytes for RAFlagsExtensionOption {
    type Error = RAFlagsExtensionOptionError;

    fn try_from_bytes(value: impl AsRef<[u8]>) -> Result<Self, Self::Error> {
        let raw = RawOption::try_from_bytes(value)?;
        if raw.length != 1 && raw.length != 2 {
            return Err(RAFlagsExtensionOptionError::InvalidOptionLength(raw.length));
        }

        Self::validate_flags(&raw.value)?;

        Ok(RAFlagsExtensionOption { flags: raw.value })
    }
}
impl_try_from_bytes!(RAFlagsExtensionOption, RAFlagsExtensionOptionError);

impl TryFrom<&RAFlagsExtensionOption> for Bytes {
    type Error = RAFlagsExtensionOptionError;

    fn try_from(option: &RAFlagsExtensionOption) -> Result<Self, Self::Error> {
        RAFlagsExtensionOption::validate_flags(&option.flags)?;

        let mut data = BytesMut::with_capacity(2 + option.flags.len());
        data.put_u8(26);
        data.put_u8(((2 + option.flags.len()) / 8) as u8);
        data.extend_from_slice(&option.flags);
        Ok(data.freeze())
    }
}
