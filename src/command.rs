//! NDPユーティリティの各操作の実装

use std::fmt::Write as _;
use std::net::Ipv6Addr;

use anyhow::{Context, Result, bail};
use log::{debug, info};
use ndp::INFINITY;
use ndp::address::IPv6AddrExt;
use ndp::conn::{ControlInfo, Interface, NDPConnection};
use ndp::message::{
    NDPMessage, NeighborSolicitationMessage, RouterAdvertisementMessage,
    RouterSolicitationMessage,
};
use ndp::option::{LinkLayerAddressOption, NDPOption, PrefixInformationOption};
use ndp::prefix::IPv6Prefix;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::cli::Operation;
use crate::config::Config;

/// 全ルーターマルチキャストアドレス (ff02::2)
const ALL_ROUTERS_MULTICAST: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 2);

/// 操作を実行する
pub(crate) async fn run(
    token: CancellationToken,
    conn: NDPConnection,
    interface: &Interface,
    operation: Operation,
    target: Option<Ipv6Addr>,
    prefix: Option<IPv6Prefix>,
    config: &Config,
) -> Result<()> {
    if operation != Operation::Ns && target.is_some() {
        bail!("flag '--target' is only valid for neighbor solicitation operation");
    }
    if operation != Operation::Ra && prefix.is_some() {
        bail!("flag '--prefix' is only valid for router advertisement operation");
    }

    let retransmit_interval = config
        .retransmit_interval
        .to_std()
        .unwrap_or(Duration::from_secs(1));
    let advertise_interval = config
        .advertise_interval
        .to_std()
        .unwrap_or(Duration::from_secs(10));

    match operation {
        Operation::Listen => listen(token, &conn).await,
        Operation::Rs => send_rs(token, &conn, interface, retransmit_interval).await,
        Operation::Ns => {
            let target = target
                .context("flag '--target' is required for neighbor solicitation operation")?;
            send_ns(token, &conn, interface, target, retransmit_interval).await
        }
        Operation::Ra => {
            let prefix = prefix
                .context("flag '--prefix' is required for router advertisement operation")?;
            advertise(token, &conn, interface, prefix, advertise_interval).await
        }
    }
}

/// 読み取り結果
enum Received {
    Message(NDPMessage, ControlInfo, Ipv6Addr),
    Timeout,
    Cancelled,
}

/// 期限付きでメッセージを1つ受信する
async fn receive_until(
    token: &CancellationToken,
    conn: &NDPConnection,
    deadline: Instant,
) -> Result<Received> {
    conn.set_read_deadline(Some(deadline));
    tokio::select! {
        _ = token.cancelled() => Ok(Received::Cancelled),
        result = conn.read_from() => match result {
            Ok((message, control, from)) => Ok(Received::Message(message, control, from)),
            Err(e) if e.is_timeout() => Ok(Received::Timeout),
            Err(e) => Err(e.into()),
        },
    }
}

/// 受信した全メッセージを表示する
async fn listen(token: CancellationToken, conn: &NDPConnection) -> Result<()> {
    // 他ホストからのRouter Solicitationも受信できるようにする
    conn.join_group(ALL_ROUTERS_MULTICAST)?;

    info!("listening for NDP messages");

    let mut count = 0usize;
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                info!("received {count} message(s)");
                return Ok(());
            }
            result = conn.read_from() => {
                let (message, _, from) = result?;
                count += 1;
                println!("{}", format_message(&message, &from));
            }
        }
    }
}

/// Router Solicitationを送信してRouter Advertisementを待つ
async fn send_rs(
    token: CancellationToken,
    conn: &NDPConnection,
    interface: &Interface,
    interval: Duration,
) -> Result<()> {
    let mut options: Vec<NDPOption> = Vec::new();
    // PPPoEなどMACアドレスを持たないインターフェースではオプションを省略する
    if let Some(mac) = interface.mac_addr {
        info!("router solicitation with source link-layer address: {mac}");
        options.push(LinkLayerAddressOption::source(mac).into());
    } else {
        info!("router solicitation without source link-layer address");
    }
    let rs = NDPMessage::from(RouterSolicitationMessage::new(options));

    let mut sent = 0usize;
    loop {
        conn.write_to(&rs, None, Some(ALL_ROUTERS_MULTICAST)).await?;
        sent += 1;

        match receive_until(&token, conn, Instant::now() + interval).await? {
            Received::Message(message @ NDPMessage::RouterAdvertisement(_), _, from) => {
                println!("{}", format_message(&message, &from));
                return Ok(());
            }
            Received::Message(_, _, _) => {
                // 目的のメッセージではない。送信からやり直す
                continue;
            }
            Received::Timeout => {
                debug!("no router advertisement received, retrying");
                continue;
            }
            Received::Cancelled => {
                info!("canceled, sent {sent} message(s)");
                return Ok(());
            }
        }
    }
}

/// Neighbor Solicitationを送信してNeighbor Advertisementを待つ
async fn send_ns(
    token: CancellationToken,
    conn: &NDPConnection,
    interface: &Interface,
    target: Ipv6Addr,
    interval: Duration,
) -> Result<()> {
    // MACアドレスを知らない前提でSolicited-Nodeマルチキャストに送る
    let solicited_node = target.to_solicited_node_multicast()?;
    conn.join_group(solicited_node)?;

    let mut options: Vec<NDPOption> = Vec::new();
    if let Some(mac) = interface.mac_addr {
        info!("neighbor solicitation for {target} with source link-layer address: {mac}");
        options.push(LinkLayerAddressOption::source(mac).into());
    } else {
        info!("neighbor solicitation for {target}");
    }
    let ns = NDPMessage::from(NeighborSolicitationMessage::new(target, options));

    let mut sent = 0usize;
    let result = loop {
        conn.write_to(&ns, None, Some(solicited_node)).await?;
        sent += 1;

        match receive_until(&token, conn, Instant::now() + interval).await? {
            Received::Message(NDPMessage::NeighborAdvertisement(na), _, from)
                if na.target_address == target =>
            {
                println!("{}", format_message(&NDPMessage::from(na), &from));
                break Ok(());
            }
            Received::Message(_, _, _) => continue,
            Received::Timeout => {
                debug!("no neighbor advertisement received, retrying");
                continue;
            }
            Received::Cancelled => {
                info!("canceled, sent {sent} message(s)");
                break Ok(());
            }
        }
    };

    conn.leave_group(solicited_node)?;
    result
}

/// ルーターとしてRouter Advertisementを広告する
///
/// 定期的に非送信請求のRAを送り、Router Solicitationを受信したら
/// 即座に応答する。終了時はRouter Lifetime 0のRAで広告を取り消す
async fn advertise(
    token: CancellationToken,
    conn: &NDPConnection,
    interface: &Interface,
    prefix: IPv6Prefix,
    interval: Duration,
) -> Result<()> {
    if prefix.prefix_length() != 64 {
        bail!("advertised prefix must be a /64, got {prefix}");
    }
    let prefix = prefix.masked();

    // テスト用ツールのため広告内容の大半は固定値
    let mut options: Vec<NDPOption> = vec![PrefixInformationOption {
        prefix_length: prefix.prefix_length(),
        on_link: false,
        autonomous: true,
        valid_lifetime: Duration::from_secs(60),
        preferred_lifetime: Duration::from_secs(30),
        prefix: prefix.address(),
    }
    .into()];
    if let Some(mac) = interface.mac_addr {
        options.push(LinkLayerAddressOption::source(mac).into());
    }

    let ra = RouterAdvertisementMessage {
        current_hop_limit: 64,
        router_lifetime: Duration::from_secs(30),
        options,
        ..Default::default()
    };
    let message = NDPMessage::from(ra.clone());

    // ルーターとして全ルーターマルチキャストグループに参加する
    conn.join_group(ALL_ROUTERS_MULTICAST)?;

    info!("advertising prefix {prefix} for SLAAC");

    loop {
        conn.write_to(&message, None, None).await?;

        // 次の定期送信までRouter Solicitationに応答する
        let next_advertisement = Instant::now() + interval;
        let cancelled = loop {
            match receive_until(&token, conn, next_advertisement).await? {
                Received::Message(NDPMessage::RouterSolicitation(_), _, from) => {
                    debug!("router solicitation from {from}, advertising");
                    break false;
                }
                Received::Message(_, _, _) => continue,
                Received::Timeout => break false,
                Received::Cancelled => break true,
            }
        };

        if cancelled {
            // Router Lifetime 0のRAで自身をデフォルトルーター候補から外す
            let mut final_ra = ra.clone();
            final_ra.router_lifetime = Duration::ZERO;
            conn.write_to(&NDPMessage::from(final_ra), None, None).await?;
            info!("canceled, sent final router advertisement");
            return Ok(());
        }
    }
}

fn format_lifetime(lifetime: &Duration) -> String {
    if *lifetime == INFINITY {
        "infinite".to_string()
    } else {
        format!("{}s", lifetime.as_secs())
    }
}

/// メッセージを表示用の文字列に整形する
pub(crate) fn format_message(message: &NDPMessage, from: &Ipv6Addr) -> String {
    let mut s = String::new();
    match message {
        NDPMessage::RouterSolicitation(rs) => {
            let _ = write!(s, "router solicitation from {from}:");
            s.push_str(&format_options(&rs.options));
        }
        NDPMessage::RouterAdvertisement(ra) => {
            let mut flags = String::new();
            if ra.managed_configuration {
                flags.push('M');
            }
            if ra.other_configuration {
                flags.push('O');
            }
            if ra.mobile_ipv6_home_agent {
                flags.push('H');
            }
            if ra.neighbor_discovery_proxy {
                flags.push('P');
            }

            let _ = write!(s, "router advertisement from {from}:");
            if ra.current_hop_limit > 0 {
                let _ = write!(s, "\n    - hop limit:        {}", ra.current_hop_limit);
            }
            if !flags.is_empty() {
                let _ = write!(s, "\n    - flags:            [{flags}]");
            }
            let _ = write!(s, "\n    - preference:       {}", ra.preference);
            if !ra.router_lifetime.is_zero() {
                let _ = write!(
                    s,
                    "\n    - router lifetime:  {}",
                    format_lifetime(&ra.router_lifetime)
                );
            }
            if !ra.reachable_time.is_zero() {
                let _ = write!(
                    s,
                    "\n    - reachable time:   {}ms",
                    ra.reachable_time.as_millis()
                );
            }
            if !ra.retrans_timer.is_zero() {
                let _ = write!(
                    s,
                    "\n    - retransmit timer: {}ms",
                    ra.retrans_timer.as_millis()
                );
            }
            s.push_str(&format_options(&ra.options));
        }
        NDPMessage::NeighborSolicitation(ns) => {
            let _ = write!(
                s,
                "neighbor solicitation from {from}:\n    - target address: {}",
                ns.target_address
            );
            s.push_str(&format_options(&ns.options));
        }
        NDPMessage::NeighborAdvertisement(na) => {
            let _ = write!(
                s,
                "neighbor advertisement from {from}:\n    - router:         {}\n    - solicited:      {}\n    - override:       {}\n    - target address: {}",
                na.router, na.solicited, na.override_flag, na.target_address
            );
            s.push_str(&format_options(&na.options));
        }
    }
    s
}

fn format_options(options: &[NDPOption]) -> String {
    if options.is_empty() {
        return String::new();
    }

    let mut s = String::from("\n    - options:");
    for option in options {
        let _ = write!(s, "\n        - {}", format_option(option));
    }
    s
}

fn format_option(option: &NDPOption) -> String {
    match option {
        NDPOption::LinkLayerAddress(lla) => {
            format!("{} link-layer address: {}", lla.direction, lla.addr)
        }
        NDPOption::PrefixInformation(pi) => {
            let mut flags = String::new();
            if pi.on_link {
                flags.push('O');
            }
            if pi.autonomous {
                flags.push('A');
            }
            format!(
                "prefix information: {}/{}, flags: [{}], valid: {}, preferred: {}",
                pi.prefix,
                pi.prefix_length,
                flags,
                format_lifetime(&pi.valid_lifetime),
                format_lifetime(&pi.preferred_lifetime),
            )
        }
        NDPOption::MTU(mtu) => format!("MTU: {}", mtu.mtu),
        NDPOption::Nonce(nonce) => format!("nonce: {:02x?}", nonce.nonce()),
        NDPOption::RouteInformation(ri) => format!(
            "route information: {}/{}, preference: {}, lifetime: {}",
            ri.prefix,
            ri.prefix_length,
            ri.preference,
            format_lifetime(&ri.route_lifetime),
        ),
        NDPOption::RecursiveDNSServer(rdnss) => {
            let servers = rdnss
                .servers
                .iter()
                .map(|server| server.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "recursive DNS servers: lifetime: {}, servers: {}",
                format_lifetime(&rdnss.lifetime),
                servers
            )
        }
        NDPOption::RAFlagsExtension(raf) => format!("RA flags extension: {:02x?}", &raf.flags[..]),
        NDPOption::DNSSearchList(dnssl) => format!(
            "DNS search list: lifetime: {}, domain names: {}",
            format_lifetime(&dnssl.lifetime),
            dnssl.domain_names.join(", ")
        ),
        NDPOption::CaptivePortal(cp) => format!("captive portal: {}", cp.uri),
        NDPOption::PREF64(pref64) => format!(
            "PREF64: {}, lifetime: {}",
            pref64.prefix,
            format_lifetime(&pref64.lifetime)
        ),
        NDPOption::Raw(raw) => format!(
            "type: {:03}, value: {:02x?}",
            raw.option_type,
            &raw.value[..]
        ),
    }
}
