//! IPv6アドレスの分類・導出ヘルパー
//!
//! NDPで必要となるアドレス種別の判定と、Solicited-Nodeマルチキャスト
//! アドレス (RFC 4291 Section 2.7.1) の導出を提供する

use std::net::Ipv6Addr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Invalid IPv6 address: {0} is an IPv4-mapped address")]
    IPv4MappedAddress(Ipv6Addr),
    #[error("Invalid address for solicited-node derivation: {0} is a multicast address")]
    MulticastAddress(Ipv6Addr),
}

/// IPv6アドレスタイプ判定用のヘルパートレイト
pub trait IPv6AddrExt {
    /// IPv6アドレスがグローバルユニキャストアドレス（2000::/3）かを判定
    fn is_global_unicast(&self) -> bool;

    /// IPv6アドレスがリンクローカルアドレス（fe80::/10）かを判定
    fn is_link_local(&self) -> bool;

    /// IPv6アドレスがユニークローカルアドレス（fc00::/7）かを判定
    fn is_unique_local(&self) -> bool;

    /// IPv6アドレスがIPv4射影アドレス（::ffff:0:0/96）かを判定
    ///
    /// NDPのコーデックはIPv4射影アドレスを一切受け付けない
    fn is_ipv4_mapped(&self) -> bool;

    /// ユニキャストアドレスからSolicited-Nodeマルチキャストアドレスを導出
    ///
    /// ff02::1:ff00:0/104 にアドレスの下位24ビットを連結した
    /// マルチキャストアドレスを返す
    fn to_solicited_node_multicast(&self) -> Result<Ipv6Addr, AddressError>;
}

impl IPv6AddrExt for Ipv6Addr {
    fn is_global_unicast(&self) -> bool {
        let octets = self.octets();
        // グローバルユニキャストアドレスは2000::/3の範囲
        (octets[0] & 0xe0) == 0x20
    }

    fn is_link_local(&self) -> bool {
        let octets = self.octets();
        // リンクローカルアドレスはfe80::/10の範囲
        octets[0] == 0xfe && (octets[1] & 0xc0) == 0x80
    }

    fn is_unique_local(&self) -> bool {
        let octets = self.octets();
        // ユニークローカルアドレスはfc00::/7の範囲
        (octets[0] & 0xfe) == 0xfc
    }

    fn is_ipv4_mapped(&self) -> bool {
        matches!(
            self.segments(),
            [0, 0, 0, 0, 0, 0xffff, _, _]
        )
    }

    fn to_solicited_node_multicast(&self) -> Result<Ipv6Addr, AddressError> {
        if self.is_ipv4_mapped() {
            return Err(AddressError::IPv4MappedAddress(*self));
        }
        if self.is_multicast() {
            return Err(AddressError::MulticastAddress(*self));
        }

        let octets = self.octets();
        Ok(Ipv6Addr::from([
            0xff, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0xff,
            octets[13], octets[14], octets[15],
        ]))
    }
}
