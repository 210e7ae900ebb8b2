use std::net::IpAddr;

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;
use url::Url;

use crate::option::raw::{RawOption, RawOptionError};
use crate::{TryFromBytes, impl_try_from_bytes};

/// キャプティブポータルが存在しないことを示すURN (RFC 8910 Section 2)
pub const UNRESTRICTED_PORTAL: &str = "urn:ietf:params:capport:unrestricted";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptivePortalOptionError {
    #[error(transparent)]
    InvalidOption(#[from] RawOptionError),
    #[error("Captive portal URI must not be empty")]
    EmptyUri,
    #[error("Captive portal URI is too long. Must be at most 255 bytes, but got {0} bytes.")]
    UriTooLong(usize),
    #[error("Invalid captive portal URI: {0:?}")]
    InvalidUri(String),
    #[error("Captive portal URI must not be a bare IP address: {0:?}")]
    IPAddressUri(String),
    #[error("Captive portal URI is not valid UTF-8")]
    InvalidUtf8,
}

/// Captive Portal オプション
///
/// RFC 7710 Section 2で定義されるオプション。
/// キャプティブポータルのURIを広告する
///
/// RFCはURIを素のIPアドレスにすべきでない (SHOULD NOT) としている。
/// コンストラクタはIPアドレスのURIを拒否するが、デコーダは受理する
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptivePortalOption {
    pub uri: String,
}

impl CaptivePortalOption {
    /// URIを検証してCaptive Portalオプションを作成
    ///
    /// 空文字列は「ポータルなし」を表す[`UNRESTRICTED_PORTAL`]のURNになる
    pub fn new(uri: &str) -> Result<Self, CaptivePortalOptionError> {
        if uri.is_empty() {
            return Ok(CaptivePortalOption {
                uri: UNRESTRICTED_PORTAL.to_string(),
            });
        }
        if uri.len() > 255 {
            return Err(CaptivePortalOptionError::UriTooLong(uri.len()));
        }

        // 素のIPアドレス（パス付きも含む）はRFC 7710のSHOULD NOTに従い拒否
        let host = uri.split('/').next().unwrap_or(uri);
        if uri.parse::<IpAddr>().is_ok() || host.parse::<IpAddr>().is_ok() {
            return Err(CaptivePortalOptionError::IPAddressUri(uri.to_string()));
        }

        if Url::parse(uri).is_err() {
            return Err(CaptivePortalOptionError::InvalidUri(uri.to_string()));
        }

        Ok(CaptivePortalOption {
            uri: uri.to_string(),
        })
    }
}

impl TryFromBytes for CaptivePortalOption {
    type Error = CaptivePortalOptionError;

    fn try_from_bytes(value: impl AsRef<[u8]>) -> Result<Self, Self::Error> {
        let raw = RawOption::try_from_bytes(value)?;

        // 末尾のパディングを取り除く
        let end = raw
            .value
            .iter()
            .rposition(|&b| b != 0)
            .map(|pos| pos + 1)
            .unwrap_or(0);
        if end == 0 {
            return Err(CaptivePortalOptionError::EmptyUri);
        }

        let uri = std::str::from_utf8(&raw.value[..end])
            .map_err(|_| CaptivePortalOptionError::InvalidUtf8)?;

        Ok(CaptivePortalOption {
            uri: uri.to_string(),
        })
    }
}
impl_try_from_bytes!(CaptivePortalOption, CaptivePortalOptionError);

impl TryFrom<&CaptivePortalOption> for Bytes {
    type Error = CaptivePortalOptionError;

    fn try_from(option: &CaptivePortalOption) -> Result<Self, Self::Error> {
        if option.uri.is_empty() {
            return Err(CaptivePortalOptionError::EmptyUri);
        }
        if option.uri.len() > 255 {
            return Err(CaptivePortalOptionError::UriTooLong(option.uri.len()));
        }

        // 8バイト境界までゼロパディング
        let unpadded = 2 + option.uri.len();
        let padding = (8 - unpadded % 8) % 8;

        let mut data = BytesMut::with_capacity(unpadded + padding);
        data.put_u8(37);
        data.put_u8(((unpadded + padding) / 8) as u8);
        data.extend_from_slice(option.uri.as_bytes());
        data.resize(unpadded + padding, 0);
        Ok(data.freeze())
    }
}
