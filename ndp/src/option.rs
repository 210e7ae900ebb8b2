mod captive_portal;
mod dns_search_list;
mod link_layer_address;
mod mtu;
mod nonce;
mod pref64;
mod prefix_information;
mod ra_flags_extension;
mod raw;
mod recursive_dns_server;
mod route_information;

use bytes::{Bytes, BytesMut};
use thiserror::Error;

pub use self::captive_portal::{
    CaptivePortalOption, CaptivePortalOptionError, UNRESTRICTED_PORTAL,
};
pub use self::dns_search_list::{DNSSearchListOption, DNSSearchListOptionError};
pub use self::link_layer_address::{
    Direction, LinkLayerAddressOption, LinkLayerAddressOptionError,
};
pub use self::mtu::{MTUOption, MTUOptionError};
pub use self::nonce::{NonceOption, NonceOptionError};
pub use self::pref64::{PREF64Option, PREF64OptionError};
pub use self::prefix_information::{PrefixInformationOption, PrefixInformationOptionError};
pub use self::ra_flags_extension::{RAFlagsExtensionOption, RAFlagsExtensionOptionError};
pub use self::raw::{RawOption, RawOptionError};
pub use self::recursive_dns_server::{RecursiveDNSServerOption, RecursiveDNSServerOptionError};
pub use self::route_information::{RouteInformationOption, RouteInformationOptionError};
use crate::{TryFromBytes, impl_try_from_bytes};

/// NDPオプション処理に関するエラー
///
/// 各オプションのパース・検証で発生する可能性のあるエラーを定義します。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NDPOptionError {
    #[error(transparent)]
    InvalidRawOption(#[from] RawOptionError),
    #[error(transparent)]
    InvalidLinkLayerAddressOption(#[from] LinkLayerAddressOptionError),
    #[error(transparent)]
    InvalidPrefixInformationOption(#[from] PrefixInformationOptionError),
    #[error(transparent)]
    InvalidMTUOption(#[from] MTUOptionError),
    #[error(transparent)]
    InvalidNonceOption(#[from] NonceOptionError),
    #[error(transparent)]
    InvalidRouteInformationOption(#[from] RouteInformationOptionError),
    #[error(transparent)]
    InvalidRecursiveDNSServerOption(#[from] RecursiveDNSServerOptionError),
    #[error(transparent)]
    InvalidRAFlagsExtensionOption(#[from] RAFlagsExtensionOptionError),
    #[error(transparent)]
    InvalidDNSSearchListOption(#[from] DNSSearchListOptionError),
    #[error(transparent)]
    InvalidCaptivePortalOption(#[from] CaptivePortalOptionError),
    #[error(transparent)]
    InvalidPREF64Option(#[from] PREF64OptionError),
}

/// NDPオプションタイプ
///
/// RFC 4861 Section 4.6と各拡張RFCで定義されるオプションタイプ。
/// ここに無いタイプのオプションは[`RawOption`]として扱われる
///
/// 参照:
/// - [IANA IPv6 Neighbor Discovery Option Formats](https://www.iana.org/assignments/icmpv6-parameters/)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NDPOptionType {
    /// Source Link-layer Address (RFC 4861)
    SourceLinkLayerAddress = 1,

    /// Target Link-layer Address (RFC 4861)
    TargetLinkLayerAddress = 2,

    /// Prefix Information (RFC 4861)
    PrefixInformation = 3,

    /// MTU (RFC 4861)
    MTU = 5,

    /// Nonce (RFC 3971)
    Nonce = 14,

    /// Route Information (RFC 4191)
    RouteInformation = 24,

    /// Recursive DNS Server (RFC 8106)
    RecursiveDNSServer = 25,

    /// RA Flags Extension (RFC 5175)
    RAFlagsExtension = 26,

    /// DNS Search List (RFC 8106)
    DNSSearchList = 31,

    /// Captive Portal (RFC 7710)
    CaptivePortal = 37,

    /// PREF64 (RFC 8781)
    PREF64 = 38,
}

impl From<NDPOptionType> for u8 {
    fn from(option_type: NDPOptionType) -> Self {
        option_type as u8
    }
}

impl TryFrom<u8> for NDPOptionType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(NDPOptionType::SourceLinkLayerAddress),
            2 => Ok(NDPOptionType::TargetLinkLayerAddress),
            3 => Ok(NDPOptionType::PrefixInformation),
            5 => Ok(NDPOptionType::MTU),
            14 => Ok(NDPOptionType::Nonce),
            24 => Ok(NDPOptionType::RouteInformation),
            25 => Ok(NDPOptionType::RecursiveDNSServer),
            26 => Ok(NDPOptionType::RAFlagsExtension),
            31 => Ok(NDPOptionType::DNSSearchList),
            37 => Ok(NDPOptionType::CaptivePortal),
            38 => Ok(NDPOptionType::PREF64),
            _ => Err(value),
        }
    }
}

/// NDPオプション
///
/// RFC 4861 Section 4.6の共通フレーミング（タイプ、8バイト単位の長さ、値）を
/// 持つオプションのタグ付きバリアント。パーサはタイプ値のテーブルで
/// ディスパッチし、未知のタイプは[`RawOption`]として保持する
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NDPOption {
    LinkLayerAddress(LinkLayerAddressOption),
    PrefixInformation(PrefixInformationOption),
    MTU(MTUOption),
    Nonce(NonceOption),
    RouteInformation(RouteInformationOption),
    RecursiveDNSServer(RecursiveDNSServerOption),
    RAFlagsExtension(RAFlagsExtensionOption),
    DNSSearchList(DNSSearchListOption),
    CaptivePortal(CaptivePortalOption),
    PREF64(PREF64Option),
    Raw(RawOption),
}

impl NDPOption {
    /// オプションタイプの数値を取得
    pub fn option_type(&self) -> u8 {
        match self {
            NDPOption::LinkLayerAddress(option) => option.direction as u8,
            NDPOption::PrefixInformation(_) => NDPOptionType::PrefixInformation.into(),
            NDPOption::MTU(_) => NDPOptionType::MTU.into(),
            NDPOption::Nonce(_) => NDPOptionType::Nonce.into(),
            NDPOption::RouteInformation(_) => NDPOptionType::RouteInformation.into(),
            NDPOption::RecursiveDNSServer(_) => NDPOptionType::RecursiveDNSServer.into(),
            NDPOption::RAFlagsExtension(_) => NDPOptionType::RAFlagsExtension.into(),
            NDPOption::DNSSearchList(_) => NDPOptionType::DNSSearchList.into(),
            NDPOption::CaptivePortal(_) => NDPOptionType::CaptivePortal.into(),
            NDPOption::PREF64(_) => NDPOptionType::PREF64.into(),
            NDPOption::Raw(option) => option.option_type,
        }
    }
}

impl From<LinkLayerAddressOption> for NDPOption {
    fn from(option: LinkLayerAddressOption) -> Self {
        NDPOption::LinkLayerAddress(option)
    }
}
impl From<PrefixInformationOption> for NDPOption {
    fn from(option: PrefixInformationOption) -> Self {
        NDPOption::PrefixInformation(option)
    }
}
impl From<MTUOption> for NDPOption {
    fn from(option: MTUOption) -> Self {
        NDPOption::MTU(option)
    }
}
impl From<NonceOption> for NDPOption {
    fn from(option: NonceOption) -> Self {
        NDPOption::Nonce(option)
    }
}
impl From<RouteInformationOption> for NDPOption {
    fn from(option: RouteInformationOption) -> Self {
        NDPOption::RouteInformation(option)
    }
}
impl From<RecursiveDNSServerOption> for NDPOption {
    fn from(option: RecursiveDNSServerOption) -> Self {
        NDPOption::RecursiveDNSServer(option)
    }
}
impl From<RAFlagsExtensionOption> for NDPOption {
    fn from(option: RAFlagsExtensionOption) -> Self {
        NDPOption::RAFlagsExtension(option)
    }
}
impl From<DNSSearchListOption> for NDPOption {
    fn from(option: DNSSearchListOption) -> Self {
        NDPOption::DNSSearchList(option)
    }
}
impl From<CaptivePortalOption> for NDPOption {
    fn from(option: CaptivePortalOption) -> Self {
        NDPOption::CaptivePortal(option)
    }
}
impl From<PREF64Option> for NDPOption {
    fn from(option: PREF64Option) -> Self {
        NDPOption::PREF64(option)
    }
}
impl From<RawOption> for NDPOption {
    fn from(option: RawOption) -> Self {
        NDPOption::Raw(option)
    }
}

impl TryFromBytes for NDPOption {
    type Error = NDPOptionError;

    fn try_from_bytes(value: impl AsRef<[u8]>) -> Result<Self, Self::Error> {
        let bytes = value.as_ref();
        if bytes.len() < 2 {
            return Err(RawOptionError::InvalidOptionLength(bytes.len()).into());
        }

        // 既知のパーサが存在するタイプでパースに失敗した場合はエラーになる
        // （RawOptionへのフォールバックは行わない）
        match NDPOptionType::try_from(bytes[0]) {
            Ok(NDPOptionType::SourceLinkLayerAddress) | Ok(NDPOptionType::TargetLinkLayerAddress) => {
                LinkLayerAddressOption::try_from_bytes(bytes)
                    .map(NDPOption::LinkLayerAddress)
                    .map_err(NDPOptionError::from)
            }
            Ok(NDPOptionType::PrefixInformation) => PrefixInformationOption::try_from_bytes(bytes)
                .map(NDPOption::PrefixInformation)
                .map_err(NDPOptionError::from),
            Ok(NDPOptionType::MTU) => MTUOption::try_from_bytes(bytes)
                .map(NDPOption::MTU)
                .map_err(NDPOptionError::from),
            Ok(NDPOptionType::Nonce) => NonceOption::try_from_bytes(bytes)
                .map(NDPOption::Nonce)
                .map_err(NDPOptionError::from),
            Ok(NDPOptionType::RouteInformation) => RouteInformationOption::try_from_bytes(bytes)
                .map(NDPOption::RouteInformation)
                .map_err(NDPOptionError::from),
            Ok(NDPOptionType::RecursiveDNSServer) => {
                RecursiveDNSServerOption::try_from_bytes(bytes)
                    .map(NDPOption::RecursiveDNSServer)
                    .map_err(NDPOptionError::from)
            }
            Ok(NDPOptionType::RAFlagsExtension) => RAFlagsExtensionOption::try_from_bytes(bytes)
                .map(NDPOption::RAFlagsExtension)
                .map_err(NDPOptionError::from),
            Ok(NDPOptionType::DNSSearchList) => DNSSearchListOption::try_from_bytes(bytes)
                .map(NDPOption::DNSSearchList)
                .map_err(NDPOptionError::from),
            Ok(NDPOptionType::CaptivePortal) => CaptivePortalOption::try_from_bytes(bytes)
                .map(NDPOption::CaptivePortal)
                .map_err(NDPOptionError::from),
            Ok(NDPOptionType::PREF64) => PREF64Option::try_from_bytes(bytes)
                .map(NDPOption::PREF64)
                .map_err(NDPOptionError::from),
            Err(_) => RawOption::try_from_bytes(bytes)
                .map(NDPOption::Raw)
                .map_err(NDPOptionError::from),
        }
    }
}
impl_try_from_bytes!(NDPOption, NDPOptionError);

impl TryFrom<&NDPOption> for Bytes {
    type Error = NDPOptionError;

    fn try_from(option: &NDPOption) -> Result<Self, Self::Error> {
        match option {
            NDPOption::LinkLayerAddress(option) => Bytes::try_from(option).map_err(Into::into),
            NDPOption::PrefixInformation(option) => Bytes::try_from(option).map_err(Into::into),
            NDPOption::MTU(option) => Bytes::try_from(option).map_err(Into::into),
            NDPOption::Nonce(option) => Bytes::try_from(option).map_err(Into::into),
            NDPOption::RouteInformation(option) => Bytes::try_from(option).map_err(Into::into),
            NDPOption::RecursiveDNSServer(option) => Bytes::try_from(option).map_err(Into::into),
            NDPOption::RAFlagsExtension(option) => Bytes::try_from(option).map_err(Into::into),
            NDPOption::DNSSearchList(option) => Bytes::try_from(option).map_err(Into::into),
            NDPOption::CaptivePortal(option) => Bytes::try_from(option).map_err(Into::into),
            NDPOption::PREF64(option) => Bytes::try_from(option).map_err(Into::into),
            NDPOption::Raw(option) => Bytes::try_from(option).map_err(Into::into),
        }
    }
}

impl TryFrom<NDPOption> for Bytes {
    type Error = NDPOptionError;

    fn try_from(option: NDPOption) -> Result<Self, Self::Error> {
        Bytes::try_from(&option)
    }
}

/// オプション列をバイト列にシリアライズ
///
/// 各オプションは8バイトの倍数のバイト列になり、順番に連結される
pub fn marshal_options(options: &[NDPOption]) -> Result<Bytes, NDPOptionError> {
    let mut data = BytesMut::new();
    for option in options {
        data.extend_from_slice(&Bytes::try_from(option)?);
    }
    Ok(data.freeze())
}

/// バイト列からオプション列をパース
///
/// 空のバイト列は空のオプション列になる。途中で不正なオプションが
/// 見つかった場合はエラーを返す
pub fn parse_options(value: impl AsRef<[u8]>) -> Result<Vec<NDPOption>, NDPOptionError> {
    let mut bytes = value.as_ref();
    let mut options = Vec::new();

    while !bytes.is_empty() {
        if bytes.len() < 2 {
            return Err(RawOptionError::InvalidOptionLength(bytes.len()).into());
        }
        let length = bytes[1];
        if length == 0 {
            return Err(RawOptionError::ZeroLength.into());
        }
        let total = length as usize * 8;
        if bytes.len() < total {
            return Err(RawOptionError::LengthMismatch(length, total - 2, bytes.len() - 2).into());
        }

        options.push(NDPOption::try_from_bytes(&bytes[..total])?);
        bytes = &bytes[total..];
    }

    Ok(options)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::INFINITY;
    use crate::preference::Preference;

    const MAC: [u8; 6] = [0xde, 0xad, 0xbe, 0xef, 0xde, 0xad];

    #[test]
    fn test_parse_options_empty() {
        // [正常系] 空のバイト列は空のオプション列になる
        let options = parse_options(&[]).unwrap();
        assert!(options.is_empty());
    }

    #[test]
    fn test_options_round_trip() {
        // [正常系] 全オプション種別のラウンドトリップ（順序が保存される）
        let options = vec![
            NDPOption::from(LinkLayerAddressOption::source(MAC)),
            NDPOption::from(PrefixInformationOption {
                prefix_length: 64,
                on_link: true,
                autonomous: true,
                valid_lifetime: INFINITY,
                preferred_lifetime: Duration::from_secs(1200),
                prefix: "2001:db8::".parse().unwrap(),
            }),
            NDPOption::from(MTUOption::new(1500)),
            NDPOption::from(NonceOption::new()),
            NDPOption::from(RouteInformationOption {
                prefix_length: 64,
                preference: Preference::High,
                route_lifetime: Duration::from_secs(600),
                prefix: "2001:db8:1::".parse().unwrap(),
            }),
            NDPOption::from(RecursiveDNSServerOption {
                lifetime: Duration::from_secs(3600),
                servers: vec!["2001:db8::53".parse().unwrap()],
            }),
            NDPOption::from(RAFlagsExtensionOption {
                flags: Bytes::from_static(&[0x80, 0, 0, 0, 0, 0]),
            }),
            NDPOption::from(DNSSearchListOption {
                lifetime: Duration::from_secs(3600),
                domain_names: vec!["example.com".to_string()],
            }),
            NDPOption::from(CaptivePortalOption::new("urn:xx").unwrap()),
            NDPOption::from(PREF64Option {
                prefix: "64:ff9b::/96".parse().unwrap(),
                lifetime: Duration::from_secs(600),
            }),
            NDPOption::from(RawOption {
                option_type: 200,
                length: 2,
                value: Bytes::from(vec![0xabu8; 14]),
            }),
        ];

        let bytes = marshal_options(&options).unwrap();
        assert_eq!(bytes.len() % 8, 0);

        let parsed = parse_options(&bytes).unwrap();
        assert_eq!(options, parsed);
    }

    #[test]
    fn test_parse_options_unknown_type() {
        // [正常系] 未知のタイプはRawOptionになる
        let bytes = [0x0a, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let options = parse_options(&bytes).unwrap();
        assert_eq!(options.len(), 1);
        assert!(matches!(
            &options[0],
            NDPOption::Raw(raw) if raw.option_type == 0x0a && raw.length == 1
        ));
    }

    #[test]
    fn test_parse_options_known_type_failure() {
        // [異常系] 既知のタイプのパース失敗はRawOptionにフォールバックしない
        let bytes = [0x01, 0x02, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(matches!(
            parse_options(&bytes).unwrap_err(),
            NDPOptionError::InvalidLinkLayerAddressOption(_)
        ));
    }

    #[test]
    fn test_parse_options_framing_error() {
        // [異常系] 長さフィールドが0
        assert!(matches!(
            parse_options(&[0x01, 0x00, 0, 0, 0, 0, 0, 0]).unwrap_err(),
            NDPOptionError::InvalidRawOption(RawOptionError::ZeroLength)
        ));

        // [異常系] 末尾の切り詰め
        assert!(matches!(
            parse_options(&[0x01, 0x01, 0, 0]).unwrap_err(),
            NDPOptionError::InvalidRawOption(RawOptionError::LengthMismatch(1, 6, 2))
        ));

        // [異常系] 1バイトしかないオプション
        assert!(matches!(
            parse_options(&[0x01]).unwrap_err(),
            NDPOptionError::InvalidRawOption(RawOptionError::InvalidOptionLength(1))
        ));
    }

    #[test]
    fn test_option_type_conversion() {
        // [正常系] 既知のタイプの相互変換
        assert_eq!(NDPOptionType::try_from(1), Ok(NDPOptionType::SourceLinkLayerAddress));
        assert_eq!(NDPOptionType::try_from(38), Ok(NDPOptionType::PREF64));
        assert_eq!(u8::from(NDPOptionType::DNSSearchList), 31);

        // [異常系] 未知のタイプ
        assert_eq!(NDPOptionType::try_from(0), Err(0));
        assert_eq!(NDPOptionType::try_from(39), Err(39));
    }

    #[test]
    fn test_option_type_accessor() {
        // [正常系] option_typeはワイヤ上のタイプ値を返す
        assert_eq!(
            NDPOption::from(LinkLayerAddressOption::source(MAC)).option_type(),
            1
        );
        assert_eq!(
            NDPOption::from(LinkLayerAddressOption::target(MAC)).option_type(),
            2
        );
        assert_eq!(NDPOption::from(MTUOption::new(1280)).option_type(), 5);
        assert_eq!(
            NDPOption::from(RawOption {
                option_type: 200,
                length: 1,
                value: Bytes::from(vec![0u8; 6]),
            })
            .option_type(),
            200
        );
    }
}
