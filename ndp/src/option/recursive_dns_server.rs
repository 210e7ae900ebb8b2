use std::net::Ipv6Addr;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::option::raw::{RawOption, RawOptionError};
use crate::{TryFromBytes, impl_try_from_bytes};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecursiveDNSServerOptionError {
    #[error(transparent)]
    InvalidOption(#[from] RawOptionError),
    #[error("Recursive DNS server option must carry at least one server address")]
    NoServers,
    #[error("Invalid recursive DNS server option value length: {0} bytes")]
    InvalidValueLength(usize),
    #[error("Invalid lifetime: {0:?} does not fit in 32 bits of seconds")]
    InvalidLifetime(Duration),
}

/// Recursive DNS Server (RDNSS) オプション
///
/// RFC 8106 (旧RFC 6106) Section 5.1で定義されるオプション。
/// 再帰DNSサーバーのIPv6アドレスを広告する
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecursiveDNSServerOption {
    /// Lifetime
    pub lifetime: Duration,

    /// DNSサーバーのアドレス（1つ以上）
    pub servers: Vec<Ipv6Addr>,
}

impl TryFromBytes for RecursiveDNSServerOption {
    type Error = RecursiveDNSServerOptionError;

    fn try_from_bytes(value: impl AsRef<[u8]>) -> Result<Self, Self::Error> {
        let raw = RawOption::try_from_bytes(value)?;

        // 値は予約2バイト + ライフタイム4バイト + 16バイト単位のアドレス列
        if raw.value.len() < 6 + 16 || (raw.value.len() - 6) % 16 != 0 {
            return Err(RecursiveDNSServerOptionError::InvalidValueLength(
                raw.value.len(),
            ));
        }

        let lifetime = u32::from_be_bytes([
            raw.value[2],
            raw.value[3],
            raw.value[4],
            raw.value[5],
        ]);

        let servers = raw.value[6..]
            .chunks_exact(16)
            .map(|chunk| {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(chunk);
                Ipv6Addr::from(octets)
            })
            .collect();

        Ok(RecursiveDNSServerOption {
            lifetime: Duration::from_secs(lifetime as u64),
            servers,
        })
    }
}
impl_try_from_bytes!(RecursiveDNSServerOption, RecursiveDNSServerOptionError);

impl TryFrom<&RecursiveDNSServerOption> for Bytes {
    type Error = RecursiveDNSServerOptionError;

    fn try_from(option: &RecursiveDNSServerOption) -> Result<Self, Self::Error> {
        if option.servers.is_empty() {
            return Err(RecursiveDNSServerOptionError::NoServers);
        }
        let lifetime = u32::try_from(option.lifetime.as_secs())
            .map_err(|_| RecursiveDNSServerOptionError::InvalidLifetime(option.lifetime))?;

        let mut data = BytesMut::with_capacity(8 + 16 * option.servers.len());
        data.put_u8(25);
        data.put_u8(1 + 2 * option.servers.len() as u8);
        data.put_u16(0); // Reserved
        data.put_u32(lifetime);
        for server in &option.servers {
            data.extend_from_slice(&server.octets());
        }
        Ok(data.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recursive_dns_server_option_marshal() {
        let first: Ipv6Addr = "2001:db8::1".parse().unwrap();
        let second: Ipv6Addr = "2001:db8::2".parse().unwrap();

        // [正常系] サーバー1つ
        let option = RecursiveDNSServerOption {
            lifetime: Duration::from_secs(3600),
            servers: vec![first],
        };
        let bytes = Bytes::try_from(&option).unwrap();
        assert_eq!(bytes.len(), 24);
        assert_eq!(&bytes[..8], &[25, 3, 0x00, 0x00, 0x00, 0x00, 0x0e, 0x10]);
        assert_eq!(&bytes[8..24], &first.octets());

        // [正常系] サーバー2つ
        let option = RecursiveDNSServerOption {
            lifetime: Duration::from_secs(24 * 3600),
            servers: vec![first, second],
        };
        let bytes = Bytes::try_from(&option).unwrap();
        assert_eq!(bytes.len(), 40);
        assert_eq!(&bytes[..8], &[25, 5, 0x00, 0x00, 0x00, 0x01, 0x51, 0x80]);
        assert_eq!(&bytes[8..24], &first.octets());
        assert_eq!(&bytes[24..40], &second.octets());

        // [異常系] サーバーなし
        let option = RecursiveDNSServerOption {
            lifetime: Duration::from_secs(1),
            servers: vec![],
        };
        assert!(matches!(
            Bytes::try_from(&option).unwrap_err(),
            RecursiveDNSServerOptionError::NoServers
        ));
    }

    #[test]
    fn test_recursive_dns_server_option_round_trip() {
        // [正常系] ラウンドトリップ
        let original = RecursiveDNSServerOption {
            lifetime: Duration::from_secs(3600),
            servers: vec![
                "2001:db8::1".parse().unwrap(),
                "2001:db8::2".parse().unwrap(),
            ],
        };
        let bytes = Bytes::try_from(&original).unwrap();
        let parsed = RecursiveDNSServerOption::try_from(bytes).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_recursive_dns_server_option_try_from_bytes_error() {
        // [異常系] サーバーアドレスなし
        let bytes = [25u8, 1, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert!(matches!(
            RecursiveDNSServerOption::try_from(&bytes[..]).unwrap_err(),
            RecursiveDNSServerOptionError::InvalidValueLength(6)
        ));

        // [異常系] 最初のサーバーアドレスが不完全（IPv6アドレスの半分）
        let mut bytes = vec![25u8, 2, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        bytes.extend_from_slice(&[0u8; 8]);
        assert!(matches!(
            RecursiveDNSServerOption::try_from(&bytes[..]).unwrap_err(),
            RecursiveDNSServerOptionError::InvalidValueLength(14)
        ));

        // [異常系] 2つ目のサーバーアドレスが不完全
        let mut bytes = vec![25u8, 4, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        bytes.extend_from_slice(&[0u8; 24]);
        assert!(matches!(
            RecursiveDNSServerOption::try_from(&bytes[..]).unwrap_err(),
            RecursiveDNSServerOptionError::InvalidValueLength(30)
        ));
    }
}
