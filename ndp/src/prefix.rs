//! IPv6プレフィックス
//!
//! アドレスとプレフィックス長の組。PREF64オプションや
//! Router Advertisementの広告プレフィックスで使用する

use std::fmt::Display;
use std::net::{AddrParseError, Ipv6Addr};
use std::num::ParseIntError;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IPv6PrefixError {
    #[error("Invalid prefix length. Must be between 0 and 128, but got {0}")]
    InvalidPrefixLength(u8),
    #[error("Invalid prefix format. Expected <address>/<length>, but got {0}")]
    InvalidFormat(String),
    #[error("Failed to parse prefix address: {0}")]
    AddressParseError(#[from] AddrParseError),
    #[error("Failed to parse prefix length: {0}")]
    LengthParseError(#[from] ParseIntError),
}

/// 指定したプレフィックス長を超えるビットを0にマスクしたアドレスを返す
pub(crate) fn mask_address(address: &Ipv6Addr, prefix_length: u8) -> Ipv6Addr {
    let mask = if prefix_length == 0 {
        0
    } else {
        u128::MAX << (128 - prefix_length.min(128) as u32)
    };
    Ipv6Addr::from(u128::from(*address) & mask)
}

/// IPv6プレフィックス（アドレスとプレフィックス長の組）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IPv6Prefix {
    address: Ipv6Addr,
    prefix_length: u8,
}

impl IPv6Prefix {
    /// 新しいプレフィックスを作成
    ///
    /// プレフィックス長を超えるホスト部のビットはそのまま保持される
    pub fn new(address: impl Into<Ipv6Addr>, prefix_length: u8) -> Result<Self, IPv6PrefixError> {
        if prefix_length > 128 {
            return Err(IPv6PrefixError::InvalidPrefixLength(prefix_length));
        }
        Ok(IPv6Prefix {
            address: address.into(),
            prefix_length,
        })
    }

    pub const fn address(&self) -> Ipv6Addr {
        self.address
    }

    pub const fn prefix_length(&self) -> u8 {
        self.prefix_length
    }

    /// ホスト部のビットを0にしたプレフィックスを返す
    pub fn masked(&self) -> Self {
        IPv6Prefix {
            address: mask_address(&self.address, self.prefix_length),
            prefix_length: self.prefix_length,
        }
    }

    /// アドレスがこのプレフィックスに含まれるかを判定
    pub fn contains(&self, address: &Ipv6Addr) -> bool {
        mask_address(address, self.prefix_length) == mask_address(&self.address, self.prefix_length)
    }
}

impl Display for IPv6Prefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_length)
    }
}

impl FromStr for IPv6Prefix {
    type Err = IPv6PrefixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, length) = s
            .split_once('/')
            .ok_or_else(|| IPv6PrefixError::InvalidFormat(s.to_string()))?;
        let address: Ipv6Addr = address.parse()?;
        let prefix_length: u8 = length.parse()?;
        IPv6Prefix::new(address, prefix_length)
    }
}
