//! リンクレイヤ（ハードウェア）アドレス
//!
//! NDPのLink-Layer Addressオプションで使用する48ビットのアドレス。
//! コーデックは6バイトのアドレスのみをサポートする

use std::fmt::{self, Display};
use std::num::ParseIntError;

use thiserror::Error;

use crate::{TryFromBytes, impl_try_from_bytes};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MacAddrError {
    #[error("Invalid MAC address length. Expected 6 bytes, but got {0} bytes.")]
    InvalidMacAddrLength(usize),
    #[error("Failed to parse MAC address: {0}")]
    MacAddrParseError(#[from] ParseIntError),
}

/// 48ビットのMACアドレス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    /// 未指定MACアドレス (00:00:00:00:00:00)
    pub const UNSPECIFIED: Self = MacAddr([0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);

    /// アドレスのバイト列を取得
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(value: [u8; 6]) -> Self {
        MacAddr(value)
    }
}

impl From<&[u8; 6]> for MacAddr {
    fn from(value: &[u8; 6]) -> Self {
        MacAddr(*value)
    }
}

impl From<MacAddr> for [u8; 6] {
    fn from(value: MacAddr) -> [u8; 6] {
        value.0
    }
}

impl From<&MacAddr> for [u8; 6] {
    fn from(value: &MacAddr) -> [u8; 6] {
        value.0
    }
}

impl TryFromBytes for MacAddr {
    type Error = MacAddrError;

    fn try_from_bytes(value: impl AsRef<[u8]>) -> Result<Self, Self::Error> {
        let value = value.as_ref();
        let octets: [u8; 6] = value
            .try_into()
            .map_err(|_| MacAddrError::InvalidMacAddrLength(value.len()))?;
        Ok(MacAddr(octets))
    }
}
impl_try_from_bytes!(MacAddr, MacAddrError);

impl TryFrom<&str> for MacAddr {
    type Error = MacAddrError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let parts: Vec<&str> = value.split(':').collect();
        if parts.len() != 6 {
            return Err(MacAddrError::InvalidMacAddrLength(parts.len()));
        }

        let parts = parts
            .iter()
            .map(|part| u8::from_str_radix(part, 16))
            .collect::<Result<Vec<u8>, _>>()
            .map_err(MacAddrError::MacAddrParseError)?;

        parts.try_into()
    }
}
