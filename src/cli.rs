use std::net::Ipv6Addr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use ndp::conn::AddressSelector;
use ndp::prefix::IPv6Prefix;

/// 実行する操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub(crate) enum Operation {
    /// 受信したNDPメッセージを表示する
    #[default]
    Listen,
    /// Router Solicitationを送信してRouter Advertisementを待つ
    Rs,
    /// Neighbor Solicitationを送信してNeighbor Advertisementを待つ
    Ns,
    /// ルーターとしてRouter Advertisementを広告する
    Ra,
}

#[derive(Debug, Clone, Parser)]
#[clap(about = "NDPメッセージの監視・送信を行うユーティリティ")]
pub(crate) struct Cli {
    /// 実行する操作
    #[clap(value_enum, default_value_t = Operation::Listen)]
    pub(crate) operation: Operation,

    /// 使用するネットワークインターフェース名（省略時は自動選択）
    #[clap(long, short)]
    pub(crate) interface: Option<String>,

    /// バインドするアドレスの選択方法
    /// (unspecified, linklocal, uniquelocal, global, またはIPv6アドレス)
    #[clap(long, short, default_value = "linklocal")]
    pub(crate) address: AddressSelector,

    /// Neighbor SolicitationのターゲットIPv6アドレス
    #[clap(long, short)]
    pub(crate) target: Option<Ipv6Addr>,

    /// Router Advertisementで広告する/64プレフィックス
    #[clap(long, short)]
    pub(crate) prefix: Option<IPv6Prefix>,

    /// 設定ファイルのパス
    #[clap(long, short)]
    pub(crate) config: Option<PathBuf>,
}

impl Cli {
    pub(crate) fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
