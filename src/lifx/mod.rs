//! A client for the LIFX LAN UDP protocol: discovery, state queries, and
//! `SetPower`/`SetColor` writes with ack-based retry.

pub mod discovery;
pub mod products;
pub mod protocol;

use crate::error::DiscoError;
use discovery::{ipv4_broadcast_addrs, Backoff};
use protocol::{ptype, set_color_payload, set_power_payload, Header, Packet, Payload};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, Mutex, Notify};
use tokio::time::Duration;

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    crate::cmd::parse_duration_str(&s).map_err(serde::de::Error::custom)
}

/// Discovery and request-retry tuning.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Config {
    /// How long to wait for discovery/requests before giving up.
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
    /// Expected device count; discovery declares itself ready early once
    /// this many devices have fully resolved (address and product).
    pub devices: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            timeout: Duration::from_secs(2),
            devices: 0,
        }
    }
}

/// A light's reported HSBK color state.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Color {
    pub h: u16,
    pub s: u16,
    pub b: u16,
    pub k: u16,
}

/// A light's full observed state.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct State {
    pub target: u64,
    pub power: u16,
    pub color: Color,
    pub product_name: Option<String>,
}

/// Desired power level for [`Client::set_power`].
#[derive(Clone, Copy, Debug)]
pub struct SetPower {
    pub level: u16,
}

/// Desired color and transition time for [`Client::set_color`].
#[derive(Clone, Copy, Debug)]
pub struct SetColor {
    pub color: Color,
    pub duration: Duration,
}

#[derive(Clone, Debug, Default)]
struct Discovery {
    addr: Option<SocketAddr>,
    product_pid: Option<u32>,
}

impl Discovery {
    fn ready(&self) -> bool {
        self.addr.is_some() && self.product_pid.is_some()
    }
}

/// A LIFX LAN client. Discovers devices on the local broadcast domain and
/// exposes state queries and writes. Cheaply cloneable; all state is
/// shared through `Arc`.
#[derive(Clone)]
pub struct Client {
    config: Config,
    socket: Arc<UdpSocket>,
    source: Arc<AtomicU32>,
    discos: Arc<Mutex<HashMap<u64, Discovery>>>,
    ready: Arc<Notify>,
    is_ready: Arc<std::sync::atomic::AtomicBool>,
    fanout: broadcast::Sender<Packet>,
}

impl Client {
    pub async fn new(config: Config) -> Result<Client, DiscoError> {
        let socket = UdpSocket::bind(("0.0.0.0", 56700))
            .await
            .map_err(|e| DiscoError::Transport(format!("lifx bind: {e}")))?;
        socket
            .set_broadcast(true)
            .map_err(|e| DiscoError::Transport(format!("lifx set_broadcast: {e}")))?;

        let bcaddrs = ipv4_broadcast_addrs()?;
        if bcaddrs.is_empty() {
            return Err(DiscoError::Config("lifx: no ip broadcast address".to_string()));
        }

        let (fanout, _) = broadcast::channel(256);
        let client = Client {
            config,
            socket: Arc::new(socket),
            source: Arc::new(AtomicU32::new(2)),
            discos: Arc::new(Mutex::new(HashMap::new())),
            ready: Arc::new(Notify::new()),
            is_ready: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            fanout,
        };

        client.spawn_rx_loop();
        client.spawn_discover_tx(bcaddrs);
        client.spawn_discover_rx();

        Ok(client)
    }

    fn next_source(&self) -> u32 {
        let s = self.source.fetch_add(1, Ordering::Relaxed);
        if s == 0 || s == 1 {
            self.source.store(2, Ordering::Relaxed);
            2
        } else {
            s
        }
    }

    fn spawn_rx_loop(&self) {
        let socket = self.socket.clone();
        let fanout = self.fanout.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1024];
            loop {
                match socket.recv_from(&mut buf).await {
                    Ok((n, addr)) => match Packet::decode(&buf[..n]) {
                        Ok(p) => {
                            let _ = fanout.send(tag_addr(p, addr));
                        }
                        Err(e) => log::warn!("lifx rx decode: {e}"),
                    },
                    Err(e) => log::error!("lifx rx: {e}"),
                }
            }
        });
    }

    fn spawn_discover_tx(&self, bcaddrs: Vec<SocketAddr>) {
        let socket = self.socket.clone();
        let source = self.clone();
        tokio::spawn(async move {
            let mut backoff = Backoff::new(1, 60_000);
            loop {
                for addr in &bcaddrs {
                    let _ = send(&socket, source.next_source(), addr, Header {
                        tagged: true,
                        ptype: ptype::DEV_GET_SERVICE,
                        ..Default::default()
                    }, &[]).await;
                    let _ = send(&socket, source.next_source(), addr, Header {
                        tagged: true,
                        ptype: ptype::DEV_GET_VERSION,
                        ..Default::default()
                    }, &[]).await;
                }
                tokio::time::sleep(backoff.next()).await;
            }
        });
    }

    fn spawn_discover_rx(&self) {
        let mut rx = self.fanout.subscribe();
        let discos = self.discos.clone();
        let ready = self.ready.clone();
        let is_ready = self.is_ready.clone();
        let devices = self.config.devices;
        let timeout = self.config.timeout;
        tokio::spawn(async move {
            let deadline = tokio::time::sleep(timeout);
            tokio::pin!(deadline);
            loop {
                tokio::select! {
                    res = rx.recv() => {
                        let Ok(p) = res else { continue };
                        let mut d = discos.lock().await;
                        match p.decoded {
                            Payload::Service { port } => {
                                let mut addr = match fanout_addr(&p) {
                                    Some(a) => a,
                                    None => continue,
                                };
                                addr.set_port(port as u16);
                                d.entry(p.header.target).or_default().addr = Some(addr);
                            }
                            Payload::Version { product, .. } => {
                                d.entry(p.header.target).or_default().product_pid = Some(product);
                            }
                            _ => continue,
                        }
                        if !is_ready.load(Ordering::Relaxed)
                            && d.len() >= devices
                            && d.values().all(|disco| disco.ready())
                        {
                            is_ready.store(true, Ordering::Relaxed);
                            ready.notify_waiters();
                        }
                    }
                    _ = &mut deadline => {
                        if !is_ready.load(Ordering::Relaxed) {
                            log::warn!("lifx: discovery timeout");
                            is_ready.store(true, Ordering::Relaxed);
                            ready.notify_waiters();
                        }
                    }
                }
            }
        });
    }

    async fn wait_ready(&self) {
        if self.is_ready.load(Ordering::Relaxed) {
            return;
        }
        self.ready.notified().await;
    }

    /// Queries state for `targets`, or every known device if empty.
    pub async fn state(&self, targets: &[u64]) -> Result<Vec<State>, DiscoError> {
        self.wait_ready().await;
        let discos = self.discos.lock().await.clone();

        let wanted: Vec<(u64, Discovery)> = if targets.is_empty() {
            discos.into_iter().collect()
        } else {
            let mut errs: Option<DiscoError> = None;
            let mut out = Vec::new();
            for &t in targets {
                match discos.get(&t) {
                    Some(d) => out.push((t, d.clone())),
                    None => {
                        errs = Some(DiscoError::join(
                            errs,
                            DiscoError::NotFound(format!("{t:x}: light not found or not reachable")),
                        ));
                    }
                }
            }
            if let Some(e) = errs {
                return Err(e);
            }
            out
        };

        let mut states = Vec::new();
        let mut errs: Option<DiscoError> = None;
        for (target, d) in wanted {
            let Some(addr) = d.addr else { continue };
            match self.get(addr).await {
                Ok(sp) => {
                    let mut s = state_from_payload(target, &sp);
                    s.product_name = d.product_pid.and_then(|pid| products::lookup(pid)).map(|p| p.name.clone());
                    states.push(s);
                }
                Err(e) => errs = Some(DiscoError::join(errs, e)),
            }
        }
        match errs {
            Some(e) => Err(e),
            None => Ok(states),
        }
    }

    /// Sets a target's power level, retrying with an ack-based backoff
    /// until `config.timeout` elapses.
    pub async fn set_power(&self, target: u64, s: SetPower) -> Result<(), DiscoError> {
        self.wait_ready().await;
        let addr = self.addr_for(target).await?;
        let payload = set_power_payload(s.level);
        self.tx_ack(addr, ptype::LI_SET_POWER, &payload).await
    }

    /// Sets a target's color, retrying with an ack-based backoff until
    /// `config.timeout` elapses.
    pub async fn set_color(&self, target: u64, s: SetColor) -> Result<(), DiscoError> {
        self.wait_ready().await;
        let addr = self.addr_for(target).await?;
        let payload = set_color_payload(
            s.color.h,
            s.color.s,
            s.color.b,
            s.color.k,
            s.duration.as_millis() as u32,
        );
        self.tx_ack(addr, ptype::LI_SET_COLOR, &payload).await
    }

    /// Streams state changes: polls every known broadcast domain once a
    /// second and forwards any `LiState` reply whose value differs from
    /// what was last seen.
    pub fn watch(&self) -> tokio::sync::mpsc::Receiver<State> {
        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let socket = self.socket.clone();
        let client = self.clone();
        tokio::spawn(async move {
            let Ok(addrs) = ipv4_broadcast_addrs() else {
                return;
            };
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            let mut sub = client.fanout.subscribe();
            let mut last: HashMap<u64, State> = HashMap::new();
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        for addr in &addrs {
                            let _ = send(&socket, client.next_source(), addr, Header {
                                tagged: true,
                                ptype: ptype::LI_GET,
                                ..Default::default()
                            }, &[]).await;
                        }
                    }
                    res = sub.recv() => {
                        let Ok(p) = res else { continue };
                        if p.header.ptype != ptype::LI_STATE {
                            continue;
                        }
                        if let Payload::State { h, s, b, k, power, .. } = p.decoded {
                            let state = State {
                                target: p.header.target,
                                power,
                                color: Color { h, s, b, k },
                                product_name: None,
                            };
                            if last.get(&state.target) != Some(&state) {
                                last.insert(state.target, state.clone());
                                if tx.send(state).await.is_err() {
                                    return;
                                }
                            }
                        }
                    }
                }
            }
        });
        rx
    }

    async fn addr_for(&self, target: u64) -> Result<SocketAddr, DiscoError> {
        let discos = self.discos.lock().await;
        discos
            .get(&target)
            .and_then(|d| d.addr)
            .ok_or_else(|| DiscoError::NotFound("light not found".to_string()))
    }

    async fn get(&self, addr: SocketAddr) -> Result<protocol::Payload, DiscoError> {
        let p = self
            .tx_res(addr, ptype::LI_GET, &[])
            .await?
            .ok_or_else(|| DiscoError::Timeout(format!("lifx get {addr}: no response")))?;
        if p.header.ptype != ptype::LI_STATE {
            return Err(DiscoError::Protocol(format!("lifx get {addr}: response is not state")));
        }
        Ok(p.decoded)
    }

    async fn tx_ack(&self, addr: SocketAddr, ptype_code: u16, payload: &[u8]) -> Result<(), DiscoError> {
        let source = self.next_source();
        let mut sub = self.fanout.subscribe();
        let mut backoff = Backoff::new(1, 100);
        let deadline = tokio::time::Instant::now() + self.config.timeout;

        loop {
            send(
                &self.socket,
                source,
                &addr,
                Header {
                    ack: true,
                    ptype: ptype_code,
                    ..Default::default()
                },
                payload,
            )
            .await?;

            let wait = backoff.next();
            let recv_deadline = tokio::time::Instant::now() + wait;
            loop {
                let now = tokio::time::Instant::now();
                if now >= deadline {
                    return Err(DiscoError::Timeout("did not ack".to_string()));
                }
                let until = recv_deadline.min(deadline);
                match tokio::time::timeout_at(until, sub.recv()).await {
                    Ok(Ok(p)) => {
                        if p.header.source == source && p.header.ptype == ptype::ACK {
                            return Ok(());
                        }
                    }
                    Ok(Err(_)) => continue,
                    Err(_) => break,
                }
            }
        }
    }

    async fn tx_res(&self, addr: SocketAddr, ptype_code: u16, payload: &[u8]) -> Result<Option<Packet>, DiscoError> {
        let source = self.next_source();
        let mut sub = self.fanout.subscribe();
        let mut backoff = Backoff::new(1, 100);
        let deadline = tokio::time::Instant::now() + self.config.timeout;

        loop {
            send(
                &self.socket,
                source,
                &addr,
                Header {
                    res: true,
                    ptype: ptype_code,
                    ..Default::default()
                },
                payload,
            )
            .await?;

            let wait = backoff.next();
            let recv_deadline = tokio::time::Instant::now() + wait;
            loop {
                let now = tokio::time::Instant::now();
                if now >= deadline {
                    return Ok(None);
                }
                let until = recv_deadline.min(deadline);
                match tokio::time::timeout_at(until, sub.recv()).await {
                    Ok(Ok(p)) => {
                        if p.header.source != source || p.header.ptype == ptype::ACK {
                            continue;
                        }
                        return Ok(Some(p));
                    }
                    Ok(Err(_)) => continue,
                    Err(_) => break,
                }
            }
        }
    }
}

fn state_from_payload(target: u64, payload: &Payload) -> State {
    match payload {
        Payload::State { h, s, b, k, power, .. } => State {
            target,
            power: *power,
            color: Color { h: *h, s: *s, b: *b, k: *k },
            product_name: None,
        },
        _ => State {
            target,
            ..Default::default()
        },
    }
}

fn fanout_addr(p: &Packet) -> Option<SocketAddr> {
    p.source_addr
}

fn tag_addr(mut p: Packet, addr: SocketAddr) -> Packet {
    p.source_addr = Some(addr);
    p
}

async fn send(
    socket: &UdpSocket,
    source: u32,
    addr: &SocketAddr,
    mut header: Header,
    payload: &[u8],
) -> Result<(), DiscoError> {
    header.source = source;
    let pkt = Packet {
        header,
        payload: payload.to_vec(),
        decoded: Payload::None,
        source_addr: None,
    };
    socket
        .send_to(&pkt.encode(), addr)
        .await
        .map_err(|e| DiscoError::Transport(format!("lifx tx {addr}: {e}")))?;
    Ok(())
}
