//! Internet Checksum 計算モジュール
//!
//! RFC 1071に準拠したInternet Checksumと、IPv6疑似ヘッダーを含む
//! ICMPv6チェックサム (RFC 4443 Section 2.3) の実装

use std::net::Ipv6Addr;

use bytes::{BufMut, BytesMut};

/// Internet Checksumを計算
///
/// # Arguments
/// * `data` - チェックサムを計算するデータ
///
/// # Returns
/// 16ビットのチェックサム値
pub fn calculate_internet_checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;

    // 16ビット単位で加算
    let mut chunks = data.chunks_exact(2);
    for chunk in &mut chunks {
        let word = u16::from_be_bytes([chunk[0], chunk[1]]);
        sum = sum.wrapping_add(word as u32);
    }

    // 奇数バイトが残っている場合は0でパディングして加算
    if let [last] = chunks.remainder() {
        let word = u16::from_be_bytes([*last, 0]);
        sum = sum.wrapping_add(word as u32);
    }

    // キャリーを畳み込む
    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    // 1の補数を取る
    !(sum as u16)
}

/// ICMPv6チェックサムを計算
///
/// IPv6疑似ヘッダー（送信元アドレス、宛先アドレス、上位層パケット長、
/// Next Header = 58）とICMPv6パケット全体からチェックサムを計算する
///
/// `packet`のチェックサムフィールド（バイト2-3）は0にした状態で渡すこと
pub fn calculate_icmpv6_checksum(src: &Ipv6Addr, dst: &Ipv6Addr, packet: &[u8]) -> u16 {
    let mut data = BytesMut::with_capacity(40 + packet.len());
    data.extend_from_slice(&src.octets());
    data.extend_from_slice(&dst.octets());
    data.put_u32(packet.len() as u32);
    data.extend_from_slice(&[0; 3]); // ゼロフィールド(24bit)
    data.put_u8(58); // Next Header (ICMPv6)
    data.extend_from_slice(packet);

    calculate_internet_checksum(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_internet_checksum_even_bytes() {
        // [正常系] 偶数バイトのデータ
        let data = vec![0x45, 0x00, 0x00, 0x3c, 0x12, 0x34];
        let checksum = calculate_internet_checksum(&data);
        assert_ne!(checksum, 0);
    }

    #[test]
    fn test_calculate_internet_checksum_odd_bytes() {
        // [正常系] 奇数バイトのデータ
        let data = vec![0x45, 0x00, 0x00, 0x3c, 0x12];
        let checksum = calculate_internet_checksum(&data);
        assert_ne!(checksum, 0);
    }

    #[test]
    fn test_calculate_internet_checksum_empty() {
        // [正常系] 空データ
        let checksum = calculate_internet_checksum(&[]);
        assert_eq!(checksum, 0xFFFF);
    }

    #[test]
    fn test_calculate_internet_checksum_single_byte() {
        // [正常系] 1バイトのデータ
        let checksum = calculate_internet_checksum(&[0xFF]);
        assert_eq!(checksum, 0x00FF);
    }

    #[test]
    fn test_checksum_verification() {
        // [正常系] チェックサムを含むデータのチェックサムは0になる
        let mut data = vec![0x45, 0x00, 0x00, 0x3c];
        let original_checksum = calculate_internet_checksum(&data);

        data.extend_from_slice(&original_checksum.to_be_bytes());

        let verification_checksum = calculate_internet_checksum(&data);
        assert_eq!(verification_checksum, 0);
    }

    #[test]
    fn test_calculate_icmpv6_checksum() {
        // [正常系] 疑似ヘッダーを含むチェックサム計算
        let src = Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0x10);
        let dst = Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1);
        let packet = [0x88, 0x00, 0x00, 0x00, 0x60, 0x00, 0x00, 0x00];

        let checksum = calculate_icmpv6_checksum(&src, &dst, &packet);
        assert_ne!(checksum, 0);

        // チェックサムを書き込んだパケットを再計算すると0になる
        let mut filled = packet;
        filled[2..4].copy_from_slice(&checksum.to_be_bytes());
        assert_eq!(calculate_icmpv6_checksum(&src, &dst, &filled), 0);

        // 送信元・宛先が変わるとチェックサムも変わる
        let other_dst = Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 2);
        assert_ne!(
            calculate_icmpv6_checksum(&src, &dst, &packet),
            calculate_icmpv6_checksum(&src, &other_dst, &packet)
        );
    }
}
