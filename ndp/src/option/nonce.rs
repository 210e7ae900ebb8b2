use bytes::{BufMut, Bytes, BytesMut};
use rand::Rng;
use thiserror::Error;

use crate::option::raw::{RawOption, RawOptionError};
use crate::{TryFromBytes, impl_try_from_bytes};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NonceOptionError {
    #[error(transparent)]
    InvalidOption(#[from] RawOptionError),
    #[error("Invalid nonce: must not be empty")]
    EmptyNonce,
    #[error("Invalid nonce length {0}: option must be a multiple of 8 bytes")]
    UnalignedNonce(usize),
}

/// Nonce オプション
///
/// RFC 3971 Section 5.3.2で定義され、RFC 6494で利用が緩和されたオプション。
/// Solicitation/Advertisementの対応付けとリプレイ防止に使用する
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonceOption {
    nonce: Bytes,
}

impl NonceOption {
    /// ランダムな6バイトのnonceを生成
    pub fn new() -> Self {
        let mut nonce = [0u8; 6];
        rand::rng().fill(&mut nonce[..]);
        NonceOption {
            nonce: Bytes::copy_from_slice(&nonce),
        }
    }

    /// nonceのバイト列を取得
    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }
}

impl Default for NonceOption {
    fn default() -> Self {
        NonceOption::new()
    }
}

impl TryFromBytes for NonceOption {
    type Error = NonceOptionError;

    fn try_from_bytes(value: impl AsRef<[u8]>) -> Result<Self, Self::Error> {
        let raw = RawOption::try_from_bytes(value)?;
        // フレーミング済みの値は常に8バイト境界に揃っている
        Ok(NonceOption { nonce: raw.value })
    }
}
impl_try_from_bytes!(NonceOption, NonceOptionError);

impl TryFrom<&NonceOption> for Bytes {
    type Error = NonceOptionError;

    fn try_from(option: &NonceOption) -> Result<Self, Self::Error> {
        if option.nonce.is_empty() {
            return Err(NonceOptionError::EmptyNonce);
        }
        // タイプ・長さフィールドを含めて8バイトの倍数でなければならない
        if (2 + option.nonce.len()) % 8 != 0 {
            return Err(NonceOptionError::UnalignedNonce(option.nonce.len()));
        }

        let mut data = BytesMut::with_capacity(2 + option.nonce.len());
        data.put_u8(14);
        data.put_u8(((2 + option.nonce.len()) / 8) as u8);
        data.extend_from_slice(&option.nonce);
        Ok(data.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_option_marshal() {
        // [正常系] 最小長（6バイト）のnonce
        let option = NonceOption {
            nonce: Bytes::from(vec![0u8; 6]),
        };
        let bytes = Bytes::try_from(&option).unwrap();
        assert_eq!(bytes.as_ref(), &[14, 1, 0, 0, 0, 0, 0, 0]);

        // [正常系] 14バイトのnonce
        let option = NonceOption {
            nonce: Bytes::from(vec![0u8; 14]),
        };
        let bytes = Bytes::try_from(&option).unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[..2], &[14, 2]);

        // [異常系] 空のnonce
        let option = NonceOption {
            nonce: Bytes::new(),
        };
        assert!(matches!(
            Bytes::try_from(&option).unwrap_err(),
            NonceOptionError::EmptyNonce
        ));

        // [異常系] 8バイト境界に揃わないnonce
        let option = NonceOption {
            nonce: Bytes::from(vec![0xff]),
        };
        assert!(matches!(
            Bytes::try_from(&option).unwrap_err(),
            NonceOptionError::UnalignedNonce(1)
        ));
    }

    #[test]
    fn test_nonce_option_new() {
        // [正常系] 生成されたnonceは6バイト
        let option = NonceOption::new();
        assert_eq!(option.nonce().len(), 6);

        // [正常系] 生成されたnonceはマーシャル可能
        let bytes = Bytes::try_from(&option).unwrap();
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[2..], option.nonce());
    }

    #[test]
    fn test_nonce_option_round_trip() {
        // [正常系] ラウンドトリップ
        let original = NonceOption::new();
        let bytes = Bytes::try_from(&original).unwrap();
        let parsed = NonceOption::try_from(bytes).unwrap();
        assert_eq!(original, parsed);
    }
}
