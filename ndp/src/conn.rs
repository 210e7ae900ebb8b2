//! リンクにバインドされたICMPv6データグラムエンドポイント
//!
//! NDPメッセージの送受信に必要なソケット設定（Hop Limit 255、
//! 制御情報の受信、ICMPv6タイプフィルタ、チェックサムオフロード）を
//! まとめて行うコネクションを提供する

mod filter;
mod interface;

use std::io::{self, IoSlice, IoSliceMut};
use std::net::{Ipv6Addr, SocketAddrV6};
use std::os::fd::AsRawFd;

use log::{debug, warn};
use nix::sys::socket::{
    ControlMessage, ControlMessageOwned, MsgFlags, SockaddrIn6, recvmsg, sendmsg,
};
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tokio::io::Interest;
use tokio::io::unix::AsyncFd;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub use self::interface::{AddressSelector, Interface, InterfaceError};
use crate::address::IPv6AddrExt;
use crate::message::{NDPMessage, NDPMessageError};

/// 全ノードマルチキャストアドレス (ff02::1)
pub const ALL_NODES_MULTICAST: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 1);

/// 受信バッファサイズ
const RECV_BUFFER_SIZE: usize = 65535;

#[derive(Debug, Error)]
pub enum NDPConnectionError {
    #[error(transparent)]
    Interface(#[from] InterfaceError),
    #[error(transparent)]
    InvalidMessage(#[from] NDPMessageError),
    #[error("Connection is closed")]
    Closed,
    #[error("Read deadline exceeded")]
    ReadTimeout,
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl NDPConnectionError {
    /// タイムアウトによるエラーかどうかを判定
    ///
    /// タイムアウトの場合、呼び出し側は読み取りを安全に再試行できる
    pub fn is_timeout(&self) -> bool {
        matches!(self, NDPConnectionError::ReadTimeout)
    }
}

/// パケットに付随する制御情報
///
/// 受信時はカーネルから得られた値、送信時はソース選択・Hop Limitの
/// 指定として使用する
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlInfo {
    /// Hop Limit
    pub hop_limit: u8,

    /// 送信元アドレス
    /// 送信時はソースアドレス選択に使用される
    pub src: Ipv6Addr,

    /// 宛先アドレス（受信時にIPV6_PKTINFOから得られる）
    pub dst: Option<Ipv6Addr>,

    /// インターフェースインデックス
    pub interface_index: u32,
}

/// NDPコネクション
///
/// 特定のインターフェースとソースアドレスにバインドされた
/// ICMPv6データグラムエンドポイント。1つの読み取りタスクと
/// 1つの書き込みタスクから同時に使用できる
pub struct NDPConnection {
    fd: AsyncFd<Socket>,
    interface: Interface,
    bound_addr: Ipv6Addr,
    deadline: watch::Sender<Option<Instant>>,
    closed: CancellationToken,
}

impl NDPConnection {
    /// インターフェースとアドレスセレクタを指定してコネクションを開く
    ///
    /// 選択されたバインドアドレスも返す。開く過程で以下を行う:
    /// 1. セレクタによるソースアドレス選択
    /// 2. ICMPv6ソケットの作成（raw、権限がなければデータグラムを試行）
    /// 3. 全ノードマルチキャストグループ (ff02::1) への参加
    /// 4. チェックサムオフロードの有効化（オフセット2）
    /// 5. 送信Hop Limitを255に設定 (RFC 4861 Section 4)
    /// 6. 受信制御情報（宛先アドレス・Hop Limit）の要求
    /// 7. NDPタイプ (133-137) のみを通すICMPv6フィルタの設定
    pub fn open(
        interface: &Interface,
        selector: &AddressSelector,
    ) -> Result<(NDPConnection, Ipv6Addr), NDPConnectionError> {
        let bound_addr = interface.choose_ipv6(selector)?;

        let socket = match Socket::new(Domain::IPV6, Type::RAW, Some(Protocol::ICMPV6)) {
            Ok(socket) => socket,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                warn!("raw ICMPv6 socket not permitted, falling back to datagram: {e}");
                Socket::new(Domain::IPV6, Type::DGRAM, Some(Protocol::ICMPV6))?
            }
            Err(e) => return Err(e.into()),
        };

        let scope_id = if bound_addr.is_link_local() {
            interface.index
        } else {
            0
        };
        socket.bind(&SocketAddrV6::new(bound_addr, 0, 0, scope_id).into())?;

        // 全ノードマルチキャストグループに参加
        socket.join_multicast_v6(&ALL_NODES_MULTICAST, interface.index)?;
        socket.set_multicast_if_v6(interface.index)?;

        // チェックサムオフロード
        // ICMPv6で常時チェックサムを計算するプラットフォームでは失敗してもよい
        if let Err(e) = filter::set_checksum_offset(socket.as_raw_fd(), 2) {
            debug!("failed to enable ICMPv6 checksum offload: {e}");
        }

        // RFC 4861 Section 4: NDPパケットのHop Limitは255でなければならない
        socket.set_multicast_hops_v6(255)?;
        socket.set_unicast_hops_v6(255)?;

        // 受信時の制御情報を要求
        filter::set_ipv6_option(socket.as_raw_fd(), libc::IPV6_RECVPKTINFO, 1)?;
        filter::set_ipv6_option(socket.as_raw_fd(), libc::IPV6_RECVHOPLIMIT, 1)?;

        // NDPメッセージタイプのみを通すフィルタを設定
        // フィルタ未対応のソケットでは受信パスの検証が防波堤になる
        let mut icmp6_filter = filter::Icmp6Filter::block_all();
        for message_type in 133..=137 {
            icmp6_filter.pass(message_type);
        }
        if let Err(e) = filter::set_icmp6_filter(socket.as_raw_fd(), &icmp6_filter) {
            warn!("failed to install ICMPv6 type filter: {e}");
        }

        socket.set_nonblocking(true)?;
        let fd = AsyncFd::new(socket)?;

        let (deadline, _) = watch::channel(None);
        let conn = NDPConnection {
            fd,
            interface: interface.clone(),
            bound_addr,
            deadline,
            closed: CancellationToken::new(),
        };
        Ok((conn, bound_addr))
    }

    /// バインドされたソースアドレスを取得
    pub fn bound_addr(&self) -> Ipv6Addr {
        self.bound_addr
    }

    /// バインドされたインターフェースを取得
    pub fn interface(&self) -> &Interface {
        &self.interface
    }

    /// 省略時に使用される制御情報
    fn default_control_info(&self) -> ControlInfo {
        ControlInfo {
            hop_limit: 255,
            src: self.bound_addr,
            dst: None,
            interface_index: self.interface.index,
        }
    }

    /// NDPメッセージを1つ受信する
    ///
    /// 次のパケットは破棄して読み取りを継続する:
    /// - Hop Limitが255でないもの (RFC 4861 Section 4)
    /// - フィルタを通過したがNDPメッセージとしてパースできないもの
    ///
    /// タイムアウト（[`NDPConnection::set_read_deadline`]）、クローズ、
    /// 下位層のI/Oエラーはエラーとして返す
    pub async fn read_from(
        &self,
    ) -> Result<(NDPMessage, ControlInfo, Ipv6Addr), NDPConnectionError> {
        if self.closed.is_cancelled() {
            return Err(NDPConnectionError::Closed);
        }

        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        let mut deadline_rx = self.deadline.subscribe();

        loop {
            let deadline = *deadline_rx.borrow_and_update();

            let (len, peer, hop_limit, packet_info) = tokio::select! {
                _ = self.closed.cancelled() => return Err(NDPConnectionError::Closed),
                _ = sleep_until_deadline(deadline) => return Err(NDPConnectionError::ReadTimeout),
                _ = deadline_rx.changed() => {
                    // 期限が差し替えられたので待機をやり直す
                    continue;
                }
                result = self.recv_packet(&mut buf) => result?,
            };

            // RFC 4861 Section 4: Hop Limitが255でないNDPパケットは破棄する
            if let Some(hop_limit) = hop_limit {
                if hop_limit != 255 {
                    debug!("dropping NDP packet with hop limit {hop_limit} from {peer}");
                    continue;
                }
            }

            let message = match NDPMessage::try_from(&buf[..len]) {
                Ok(message) => message,
                Err(e) => {
                    // パースできないパケットは破棄して次を待つ
                    debug!("dropping unparseable ICMPv6 packet from {peer}: {e}");
                    continue;
                }
            };

            let control = ControlInfo {
                hop_limit: hop_limit.unwrap_or(0) as u8,
                src: peer,
                dst: packet_info.map(|(dst, _)| dst),
                interface_index: packet_info
                    .map(|(_, index)| index)
                    .unwrap_or(self.interface.index),
            };

            return Ok((message, control, peer));
        }
    }

    /// NDPメッセージを送信する
    ///
    /// `control`を省略するとHop Limit 255、バインドアドレスをソースとする
    /// 既定の制御情報を使用する。`dst`を省略すると全ノードマルチキャスト
    /// (ff02::1) 宛てになる
    pub async fn write_to(
        &self,
        message: &NDPMessage,
        control: Option<&ControlInfo>,
        dst: Option<Ipv6Addr>,
    ) -> Result<(), NDPConnectionError> {
        let data = message.marshal()?;
        self.write_raw(&data, control, dst).await
    }

    /// マーシャル済みのバイト列をそのまま送信する
    ///
    /// フィルタ動作のテストで不正なパケットを注入するために使用する
    pub(crate) async fn write_raw(
        &self,
        data: &[u8],
        control: Option<&ControlInfo>,
        dst: Option<Ipv6Addr>,
    ) -> Result<(), NDPConnectionError> {
        if self.closed.is_cancelled() {
            return Err(NDPConnectionError::Closed);
        }

        let default_control = self.default_control_info();
        let control = control.unwrap_or(&default_control);
        let dst = dst.unwrap_or(ALL_NODES_MULTICAST);

        let scope_id = if dst.is_multicast() || dst.is_link_local() {
            control.interface_index
        } else {
            0
        };
        let addr = SockaddrIn6::from(SocketAddrV6::new(dst, 0, 0, scope_id));

        let packet_info = libc::in6_pktinfo {
            ipi6_addr: libc::in6_addr {
                s6_addr: control.src.octets(),
            },
            ipi6_ifindex: control.interface_index as libc::c_uint,
        };
        let hop_limit = control.hop_limit as libc::c_int;

        self.fd
            .async_io(Interest::WRITABLE, |sock| {
                let iov = [IoSlice::new(data)];
                let cmsgs = [
                    ControlMessage::Ipv6PacketInfo(&packet_info),
                    ControlMessage::Ipv6HopLimit(&hop_limit),
                ];
                sendmsg(
                    sock.as_raw_fd(),
                    &iov,
                    &cmsgs,
                    MsgFlags::empty(),
                    Some(&addr),
                )
                .map_err(io::Error::from)?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// マルチキャストグループに参加する
    pub fn join_group(&self, group: Ipv6Addr) -> Result<(), NDPConnectionError> {
        if self.closed.is_cancelled() {
            return Err(NDPConnectionError::Closed);
        }
        self.fd
            .get_ref()
            .join_multicast_v6(&group, self.interface.index)
            .map_err(Into::into)
    }

    /// マルチキャストグループから離脱する
    pub fn leave_group(&self, group: Ipv6Addr) -> Result<(), NDPConnectionError> {
        if self.closed.is_cancelled() {
            return Err(NDPConnectionError::Closed);
        }
        self.fd
            .get_ref()
            .leave_multicast_v6(&group, self.interface.index)
            .map_err(Into::into)
    }

    /// 読み取り期限を設定する
    ///
    /// 進行中の読み取りにも即座に反映される。過去の時刻を設定すると
    /// ブロック中の読み取りはタイムアウトエラーで戻る。`None`で解除する
    pub fn set_read_deadline(&self, deadline: Option<Instant>) {
        self.deadline.send_replace(deadline);
    }

    /// コネクションを閉じる
    ///
    /// ブロック中の読み取りは[`NDPConnectionError::Closed`]で戻り、
    /// 以降の操作は全て失敗する。ソケットと参加中のグループは
    /// コネクションのドロップ時に解放される
    pub fn close(&self) {
        self.closed.cancel();
    }

    async fn recv_packet(
        &self,
        buf: &mut [u8],
    ) -> Result<(usize, Ipv6Addr, Option<i32>, Option<(Ipv6Addr, u32)>), NDPConnectionError> {
        let received = self
            .fd
            .async_io(Interest::READABLE, |sock| {
                let mut iov = [IoSliceMut::new(buf)];
                let mut cmsg_buffer = nix::cmsg_space!(libc::in6_pktinfo, libc::c_int);
                let msg = recvmsg::<SockaddrIn6>(
                    sock.as_raw_fd(),
                    &mut iov,
                    Some(&mut cmsg_buffer),
                    MsgFlags::empty(),
                )
                .map_err(io::Error::from)?;

                let mut hop_limit = None;
                let mut packet_info = None;
                for cmsg in msg.cmsgs().map_err(io::Error::from)? {
                    match cmsg {
                        ControlMessageOwned::Ipv6HopLimit(limit) => hop_limit = Some(limit),
                        ControlMessageOwned::Ipv6PacketInfo(info) => {
                            packet_info = Some((
                                Ipv6Addr::from(info.ipi6_addr.s6_addr),
                                info.ipi6_ifindex as u32,
                            ));
                        }
                        _ => {}
                    }
                }

                let peer = msg
                    .address
                    .map(|addr: SockaddrIn6| addr.ip())
                    .unwrap_or(Ipv6Addr::UNSPECIFIED);

                Ok((msg.bytes, peer, hop_limit, packet_info))
            })
            .await?;
        Ok(received)
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        // 期限なしの場合は永遠に待つ
        None => std::future::pending().await,
    }
}
