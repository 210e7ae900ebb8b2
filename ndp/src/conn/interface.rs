//! ネットワークインターフェースの列挙とアドレス選択

use std::fmt::{self, Display};
use std::net::Ipv6Addr;
use std::str::FromStr;

use fxhash::FxHashMap;
use nix::ifaddrs::getifaddrs;
use nix::net::if_::{InterfaceFlags, if_nametoindex};
use thiserror::Error;

use crate::address::IPv6AddrExt;
use crate::link_layer::MacAddr;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterfaceError {
    #[error("Failed to get network interfaces: {0}")]
    FailedToGetIfAddrs(#[source] nix::Error),
    #[error("No such network interface: {0}")]
    NoSuchInterface(String),
    #[error("No usable IPv6-enabled network interface found")]
    NoUsableInterface,
    #[error("No {0} address on interface {1}")]
    NoAddress(AddressSelector, String),
    #[error("Invalid address selector: {0:?}")]
    InvalidAddressSelector(String),
}

/// コネクションをバインドするアドレスの選択方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressSelector {
    /// 未指定アドレス (::)
    Unspecified,
    /// 最初のリンクローカルアドレス (fe80::/10)
    LinkLocal,
    /// 最初のユニークローカルアドレス (fc00::/7)
    UniqueLocal,
    /// 最初のグローバルアドレス
    Global,
    /// 指定したアドレスへの完全一致
    Literal(Ipv6Addr),
}

impl Display for AddressSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressSelector::Unspecified => write!(f, "unspecified"),
            AddressSelector::LinkLocal => write!(f, "link-local"),
            AddressSelector::UniqueLocal => write!(f, "unique-local"),
            AddressSelector::Global => write!(f, "global"),
            AddressSelector::Literal(addr) => write!(f, "{addr}"),
        }
    }
}

impl FromStr for AddressSelector {
    type Err = InterfaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unspecified" => Ok(AddressSelector::Unspecified),
            "linklocal" => Ok(AddressSelector::LinkLocal),
            "uniquelocal" => Ok(AddressSelector::UniqueLocal),
            "global" => Ok(AddressSelector::Global),
            literal => literal
                .parse::<Ipv6Addr>()
                .map(AddressSelector::Literal)
                .map_err(|_| InterfaceError::InvalidAddressSelector(s.to_string())),
        }
    }
}

/// ネットワークインターフェース
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Interface {
    pub index: u32,
    pub name: String,
    pub mac_addr: Option<MacAddr>,
    pub ipv6_addrs: Vec<Ipv6Addr>,
    pub up: bool,
    pub loopback: bool,
}

impl Interface {
    /// システムの全ネットワークインターフェースを列挙
    pub fn list() -> Result<Vec<Interface>, InterfaceError> {
        let ifaddrs = getifaddrs().map_err(InterfaceError::FailedToGetIfAddrs)?;
        let mut interfaces: FxHashMap<String, Interface> = FxHashMap::default();

        for ifaddr in ifaddrs {
            let iface_name = ifaddr.interface_name.clone();

            // 既存インターフェースを取得または新規作成
            let iface = interfaces.entry(iface_name.clone()).or_insert_with(|| {
                let index = if_nametoindex(iface_name.as_str()).unwrap_or(0);
                Interface {
                    index,
                    name: iface_name,
                    mac_addr: None,
                    ipv6_addrs: Vec::new(),
                    up: ifaddr.flags.contains(InterfaceFlags::IFF_UP),
                    loopback: ifaddr.flags.contains(InterfaceFlags::IFF_LOOPBACK),
                }
            });
            let Some(address) = ifaddr.address else {
                continue;
            };

            // MACアドレスの処理
            if let Some(link_addr) = address.as_link_addr() {
                if let Some(mac_bytes) = link_addr.addr() {
                    iface.mac_addr = Some(MacAddr::from(mac_bytes));
                }
                continue;
            }

            // IPv6アドレスの処理
            let Some(ipv6_addr) = address.as_sockaddr_in6() else {
                continue;
            };
            let mut octets = ipv6_addr.ip().octets();
            // リンクローカルアドレスはscope_idが3-4バイト目に埋め込まれる
            // プラットフォームがあるため正規化する
            if octets[0] == 0xfe && (octets[1] & 0xc0) == 0x80 {
                octets[2] = 0x00;
                octets[3] = 0x00;
            }
            iface.ipv6_addrs.push(Ipv6Addr::from(octets));
        }

        Ok(interfaces.into_values().collect())
    }

    /// 名前でインターフェースを検索
    pub fn find_by_name(name: &str) -> Result<Interface, InterfaceError> {
        Interface::list()?
            .into_iter()
            .find(|iface| iface.name == name)
            .ok_or_else(|| InterfaceError::NoSuchInterface(name.to_string()))
    }

    /// NDP通信に使用できる最初のインターフェースを検索
    ///
    /// upかつloopbackでなく、IPv6アドレスを持つインターフェースを選ぶ
    pub fn find_usable() -> Result<Interface, InterfaceError> {
        Interface::list()?
            .into_iter()
            .find(|iface| iface.up && !iface.loopback && !iface.ipv6_addrs.is_empty())
            .ok_or(InterfaceError::NoUsableInterface)
    }

    /// セレクタに従ってインターフェースのIPv6アドレスを選択
    ///
    /// 複数のアドレスが条件に合う場合はインターフェースの報告順で
    /// 最初のものを返す
    pub fn choose_ipv6(&self, selector: &AddressSelector) -> Result<Ipv6Addr, InterfaceError> {
        let chosen = match selector {
            AddressSelector::Unspecified => Some(Ipv6Addr::UNSPECIFIED),
            AddressSelector::LinkLocal => self
                .ipv6_addrs
                .iter()
                .find(|addr| addr.is_link_local())
                .copied(),
            AddressSelector::UniqueLocal => self
                .ipv6_addrs
                .iter()
                .find(|addr| addr.is_unique_local())
                .copied(),
            AddressSelector::Global => self
                .ipv6_addrs
                .iter()
                .find(|addr| {
                    !addr.is_link_local()
                        && !addr.is_unique_local()
                        && !addr.is_loopback()
                        && !addr.is_multicast()
                        && !addr.is_ipv4_mapped()
                })
                .copied(),
            AddressSelector::Literal(literal) => {
                self.ipv6_addrs.iter().find(|addr| *addr == literal).copied()
            }
        };

        chosen.ok_or_else(|| InterfaceError::NoAddress(*selector, self.name.clone()))
    }
}
