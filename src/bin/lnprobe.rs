//! Transport smoke test against a live Lightning node.
//!
//! Dials `<host:port>`, runs the BOLT 8 handshake against `<node_id>`,
//! exchanges `init`, then measures one ping round-trip. Useful for
//! checking that a node is reachable and speaks the transport correctly
//! before pointing anything heavier at it.

use std::net::ToSocketAddrs;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use brontide::bolt::{Init, Message, Ping, Pong};
use brontide::noise::{ConnectionConfig, NoiseConnection, PeerEvent};
use secp256k1::{PublicKey, Secp256k1};

const EVENT_DEADLINE: Duration = Duration::from_secs(10);

fn main() -> ExitCode {
    simple_logger::init_with_env().expect("Failed to initialize logger");

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        log::error!("usage: {} <host:port> <node_id>", args[0]);
        return ExitCode::FAILURE;
    }

    let Some(addr) = args[1]
        .as_str()
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
    else {
        log::error!("could not resolve address: {}", args[1]);
        return ExitCode::FAILURE;
    };
    let node_id: PublicKey = match args[2].parse() {
        Ok(key) => key,
        Err(e) => {
            log::error!("invalid node id {}: {e}", args[2]);
            return ExitCode::FAILURE;
        }
    };

    // A throwaway identity is enough: XK authenticates us to the node, but
    // a probe has no reputation to protect.
    let secp = Secp256k1::new();
    let (local_static, local_pub) = secp.generate_keypair(&mut rand::rng());
    log::info!("probing {addr} as {local_pub}");

    let mut conn =
        match NoiseConnection::connect(addr, node_id, local_static, &ConnectionConfig::default()) {
            Ok(conn) => conn,
            Err(e) => {
                log::error!("connection failed: {e}");
                return ExitCode::FAILURE;
            }
        };
    log::info!("handshake complete, node id {}", conn.remote_static());

    let result = run_probe(&conn);
    conn.shutdown();
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("probe failed: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Init exchange followed by one timed ping round-trip.
fn run_probe(conn: &NoiseConnection) -> Result<(), Box<dyn std::error::Error>> {
    conn.send_message(&Message::Init(Init::empty()).encode())?;

    let mut ping_sent: Option<Instant> = None;
    loop {
        let event = conn.events().recv_timeout(EVENT_DEADLINE)?;
        let raw = match event {
            PeerEvent::Message(raw) => raw,
            PeerEvent::Disconnected(e) => return Err(Box::new(e)),
        };

        let msg = match Message::decode(&raw) {
            Ok(msg) => msg,
            Err(e) => {
                log::warn!("undecodable message ({} bytes): {e}", raw.len());
                continue;
            }
        };

        match msg {
            Message::Init(init) => {
                log::info!(
                    "peer init: {} feature bytes, {} extension bytes",
                    init.features.len(),
                    init.extension.len()
                );
                conn.send_message(&Message::Ping(Ping::new(8)).encode())?;
                ping_sent = Some(Instant::now());
            }
            Message::Pong(pong) => {
                match ping_sent {
                    Some(start) => {
                        log::info!(
                            "pong: {} bytes in {:?}",
                            pong.ignored.len(),
                            start.elapsed()
                        );
                        return Ok(());
                    }
                    None => log::warn!("unsolicited pong"),
                }
            }
            Message::Ping(ping) => {
                if let Some(pong) = Pong::respond_to(&ping) {
                    conn.send_message(&Message::Pong(pong).encode())?;
                }
            }
            Message::Error(error) => {
                return Err(format!(
                    "peer sent error: {}",
                    String::from_utf8_lossy(&error.data)
                )
                .into());
            }
            Message::Warning(warning) => {
                log::warn!("peer warning: {}", String::from_utf8_lossy(&warning.data));
            }
            Message::Unknown { msg_type, .. } => {
                log::debug!("ignoring message type {msg_type}");
            }
        }
    }
}
