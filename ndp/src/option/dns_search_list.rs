use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::option::raw::{RawOption, RawOptionError};
use crate::{TryFromBytes, impl_try_from_bytes};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DNSSearchListOptionError {
    #[error(transparent)]
    InvalidOption(#[from] RawOptionError),
    #[error("Invalid DNS search list option length. Expected at least 2, but got {0}.")]
    InvalidOptionLength(u8),
    #[error("DNS search list option must carry at least one domain name")]
    NoDomains,
    #[error("DNS label sequence is missing its null terminator")]
    MissingNullTerminator,
    #[error("DNS label length {0} exceeds the remaining option bytes")]
    LabelOverrun(u8),
    #[error("Invalid DNS label length. Must be at most 63 bytes, but got {0}")]
    LabelTooLong(usize),
    #[error("Invalid DNS label: empty label")]
    EmptyLabel,
    #[error("Invalid DNS label: contains non-ASCII bytes")]
    NonASCIILabel,
    #[error("Invalid domain name: {0:?}")]
    InvalidDomainName(String),
    #[error("Invalid lifetime: {0:?} does not fit in 32 bits of seconds")]
    InvalidLifetime(Duration),
}

/// DNS Search List (DNSSL) オプション
///
/// RFC 8106 (旧RFC 6106) Section 5.2で定義されるオプション。
/// DNS検索ドメインのリストをRFC 1035のラベル形式で広告する
///
/// 非ASCIIのドメイン名は送信時にpunycode（ACE形式, `xn--…`）へ変換し、
/// 受信時にUnicode形式へ復元する。復元できないACEラベルは
/// Unicode置換文字を含む形で呼び出し側へ渡される
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DNSSearchListOption {
    /// Lifetime
    pub lifetime: Duration,

    /// 検索ドメイン名（1つ以上）
    pub domain_names: Vec<String>,
}

impl TryFromBytes for DNSSearchListOption {
    type Error = DNSSearchListOptionError;

    fn try_from_bytes(value: impl AsRef<[u8]>) -> Result<Self, Self::Error> {
        let raw = RawOption::try_from_bytes(value)?;
        if raw.length < 2 {
            return Err(DNSSearchListOptionError::InvalidOptionLength(raw.length));
        }

        let lifetime = u32::from_be_bytes([
            raw.value[2],
            raw.value[3],
            raw.value[4],
            raw.value[5],
        ]);

        let mut domain_names = Vec::new();
        let mut i = 6;
        // 先頭が0のバイトに到達したら残りはパディングとみなす
        while i < raw.value.len() && raw.value[i] != 0 {
            let mut labels: Vec<String> = Vec::new();
            loop {
                if i >= raw.value.len() {
                    return Err(DNSSearchListOptionError::MissingNullTerminator);
                }
                let label_len = raw.value[i];
                i += 1;
                if label_len == 0 {
                    break;
                }
                if label_len > 63 {
                    return Err(DNSSearchListOptionError::LabelTooLong(label_len as usize));
                }
                if i + label_len as usize > raw.value.len() {
                    return Err(DNSSearchListOptionError::LabelOverrun(label_len));
                }

                let label = &raw.value[i..i + label_len as usize];
                if !label.is_ascii() {
                    return Err(DNSSearchListOptionError::NonASCIILabel);
                }
                labels.push(String::from_utf8_lossy(label).into_owned());
                i += label_len as usize;
            }

            // punycodeをUnicode形式へ復元する
            // 不正なACEラベルは置換文字入りの出力になるためエラーにはしない
            let ace = labels.join(".");
            let (unicode, _) = idna::domain_to_unicode(&ace);
            if unicode.is_empty() {
                return Err(DNSSearchListOptionError::InvalidDomainName(ace));
            }
            domain_names.push(unicode);
        }

        if domain_names.is_empty() {
            return Err(DNSSearchListOptionError::NoDomains);
        }

        Ok(DNSSearchListOption {
            lifetime: Duration::from_secs(lifetime as u64),
            domain_names,
        })
    }
}
impl_try_from_bytes!(DNSSearchListOption, DNSSearchListOptionError);

impl TryFrom<&DNSSearchListOption> for Bytes {
    type Error = DNSSearchListOptionError;

    fn try_from(option: &DNSSearchListOption) -> Result<Self, Self::Error> {
        if option.domain_names.is_empty() {
            return Err(DNSSearchListOptionError::NoDomains);
        }
        let lifetime = u32::try_from(option.lifetime.as_secs())
            .map_err(|_| DNSSearchListOptionError::InvalidLifetime(option.lifetime))?;

        let mut labels_buf = BytesMut::new();
        for domain in &option.domain_names {
            // 非ASCIIドメインはACE形式（xn--…）に変換して符号化する
            let ascii = idna::domain_to_ascii(domain)
                .map_err(|_| DNSSearchListOptionError::InvalidDomainName(domain.clone()))?;

            for label in ascii.split('.') {
                if label.is_empty() {
                    return Err(DNSSearchListOptionError::EmptyLabel);
                }
                if label.len() > 63 {
                    return Err(DNSSearchListOptionError::LabelTooLong(label.len()));
                }
                labels_buf.put_u8(label.len() as u8);
                labels_buf.extend_from_slice(label.as_bytes());
            }
            labels_buf.put_u8(0); // ドメイン名の終端
        }

        // 8バイト境界までゼロパディング
        let unpadded = 2 + 2 + 4 + labels_buf.len();
        let padding = (8 - unpadded % 8) % 8;

        let mut data = BytesMut::with_capacity(unpadded + padding);
        data.put_u8(31);
        data.put_u8(((unpadded + padding) / 8) as u8);
        data.put_u16(0); // Reserved
        data.put_u32(lifetime);
        data.extend_from_slice(&labels_buf);
        data.resize(unpadded + padding, 0);
        Ok(data.freeze())
    }
}
