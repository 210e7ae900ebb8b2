//! ICMPv6ソケットオプションの低レベル操作
//!
//! socket2/nixが直接サポートしないICMP6_FILTER、IPV6_CHECKSUM、
//! 受信制御情報のソケットオプションをlibc経由で設定する

use std::os::fd::RawFd;
use std::{io, mem};

// ICMP6_FILTERソケットオプションの定数
// 定義: include/uapi/linux/icmpv6.h, netinet/icmp6.h
#[cfg(target_os = "linux")]
const ICMP6_FILTER: libc::c_int = 1;
#[cfg(any(target_os = "macos", target_os = "freebsd"))]
const ICMP6_FILTER: libc::c_int = 18;

// IPV6_CHECKSUMソケットオプションの定数
#[cfg(target_os = "linux")]
const IPV6_CHECKSUM: libc::c_int = 7;
#[cfg(any(target_os = "macos", target_os = "freebsd"))]
const IPV6_CHECKSUM: libc::c_int = 26;

/// ICMPv6タイプフィルタ (RFC 3542 Section 3.2)
///
/// ビットが1のタイプはカーネルで破棄される
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct Icmp6Filter {
    data: [u32; 8],
}

impl Icmp6Filter {
    /// 全タイプを破棄するフィルタを作成 (ICMP6_FILTER_SETBLOCKALL相当)
    pub(crate) fn block_all() -> Self {
        Icmp6Filter {
            data: [u32::MAX; 8],
        }
    }

    /// 指定タイプの通過を許可 (ICMP6_FILTER_SETPASS相当)
    pub(crate) fn pass(&mut self, message_type: u8) {
        self.data[(message_type >> 5) as usize] &= !(1u32 << (message_type & 31));
    }
}

fn setsockopt_result(result: libc::c_int) -> io::Result<()> {
    if result < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// ICMPv6タイプフィルタをソケットに設定
pub(crate) fn set_icmp6_filter(fd: RawFd, filter: &Icmp6Filter) -> io::Result<()> {
    let result = unsafe {
        libc::setsockopt(
            fd,
            libc::IPPROTO_ICMPV6,
            ICMP6_FILTER,
            filter as *const Icmp6Filter as *const libc::c_void,
            mem::size_of::<Icmp6Filter>() as libc::socklen_t,
        )
    };
    setsockopt_result(result)
}

/// ICMPv6チェックサムの計算オフセットを設定
///
/// カーネルが送信時に指定オフセットへチェックサムを書き込む。
/// ICMPv6ソケットでは常時計算されるプラットフォームもある
pub(crate) fn set_checksum_offset(fd: RawFd, offset: libc::c_int) -> io::Result<()> {
    let result = unsafe {
        libc::setsockopt(
            fd,
            libc::IPPROTO_IPV6,
            IPV6_CHECKSUM,
            &offset as *const libc::c_int as *const libc::c_void,
            mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    setsockopt_result(result)
}

/// IPv6レベルのint型ソケットオプションを設定
///
/// IPV6_RECVPKTINFO / IPV6_RECVHOPLIMITの有効化に使用する
pub(crate) fn set_ipv6_option(fd: RawFd, option: libc::c_int, value: libc::c_int) -> io::Result<()> {
    let result = unsafe {
        libc::setsockopt(
            fd,
            libc::IPPROTO_IPV6,
            option,
            &value as *const libc::c_int as *const libc::c_void,
            mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    setsockopt_result(result)
}
