//! Encrypted TCP connection for Lightning Network peers.
//!
//! Owns the socket end-to-end: drives the three handshake acts
//! byte-exactly, then runs a single background read loop while callers
//! write through a serialized send path.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info};
use secp256k1::{PublicKey, SecretKey};

use super::act::{NoiseHandshake, ACT_ONE_SIZE, ACT_THREE_SIZE, ACT_TWO_SIZE};
use super::cipher::{CipherState, MAC_SIZE};
use super::error::NoiseError;
use super::transport::{
    decrypt_frame_body, decrypt_frame_length, encrypt_frame, Transport, ENCRYPTED_LENGTH_SIZE,
    MAX_MESSAGE_SIZE,
};

/// Tunables for connection setup and the read loop.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Deadline for the TCP connect and each handshake act read/write.
    pub handshake_timeout: Duration,
    /// Deadline for post-handshake socket writes.
    pub write_timeout: Duration,
    /// Deadline for reading the rest of a frame once its header arrived.
    /// Idle waiting for the next header is unbounded.
    pub frame_body_timeout: Duration,
    /// Capacity of the bounded event queue; the read loop blocks when the
    /// consumer falls this far behind.
    pub event_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(10),
            frame_body_timeout: Duration::from_secs(30),
            event_capacity: 128,
        }
    }
}

/// Events delivered by the background read loop, in arrival order.
#[derive(Debug)]
pub enum PeerEvent {
    /// A decrypted wire message.
    Message(Vec<u8>),
    /// The read loop hit a fatal error; no further events follow.
    Disconnected(ConnectionError),
}

/// The serialized write path: one lock covers both the cipher and the
/// socket because the send nonce must advance in exact wire order.
struct WriteState {
    stream: TcpStream,
    cipher: CipherState,
}

/// A Noise-encrypted connection to a Lightning Network peer.
pub struct NoiseConnection {
    stream: TcpStream,
    writer: Mutex<WriteState>,
    remote_static: PublicKey,
    connected: Arc<AtomicBool>,
    stopping: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
    events: Receiver<PeerEvent>,
}

impl std::fmt::Debug for NoiseConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseConnection")
            .field("remote_static", &self.remote_static)
            .field("connected", &self.connected.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl NoiseConnection {
    /// Connects to a remote node and performs the handshake as initiator.
    ///
    /// `remote_static` is the node ID being dialed; a fresh ephemeral key
    /// is generated internally for the session.
    ///
    /// # Errors
    ///
    /// Any TCP failure, timeout, or handshake violation is fatal; the
    /// connection is never retried at this layer.
    pub fn connect(
        addr: SocketAddr,
        remote_static: PublicKey,
        local_static: SecretKey,
        config: &ConnectionConfig,
    ) -> Result<Self, ConnectionError> {
        debug!("dialing {addr}");
        let mut stream = TcpStream::connect_timeout(&addr, config.handshake_timeout)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(config.handshake_timeout))?;
        stream.set_write_timeout(Some(config.handshake_timeout))?;

        let mut handshake = NoiseHandshake::new_initiator(local_static, remote_static);

        let act_one = handshake.get_act_one()?;
        stream.write_all(&act_one)?;

        let mut act_two = [0u8; ACT_TWO_SIZE];
        stream.read_exact(&mut act_two)?;

        let act_three = handshake.process_act_two(&act_two)?;
        stream.write_all(&act_three)?;

        let (transport, _handshake_hash) = handshake.into_transport()?;
        info!("handshake complete with {remote_static}");
        Self::start(stream, transport, remote_static, config)
    }

    /// Performs the handshake as responder on an accepted stream.
    ///
    /// The initiator's identity is learned from Act Three and exposed via
    /// [`Self::remote_static`].
    ///
    /// # Errors
    ///
    /// Same failure model as [`Self::connect`].
    pub fn accept(
        mut stream: TcpStream,
        local_static: SecretKey,
        config: &ConnectionConfig,
    ) -> Result<Self, ConnectionError> {
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(config.handshake_timeout))?;
        stream.set_write_timeout(Some(config.handshake_timeout))?;

        let mut handshake = NoiseHandshake::new_responder(local_static);

        let mut act_one = [0u8; ACT_ONE_SIZE];
        stream.read_exact(&mut act_one)?;

        let act_two = handshake.process_act_one(&act_one)?;
        stream.write_all(&act_two)?;

        let mut act_three = [0u8; ACT_THREE_SIZE];
        stream.read_exact(&mut act_three)?;

        let remote_static = handshake.process_act_three(&act_three)?;
        let (transport, _handshake_hash) = handshake.into_transport()?;
        info!("accepted handshake from {remote_static}");
        Self::start(stream, transport, remote_static, config)
    }

    /// Common tail: split the channel, arm post-handshake timeouts, spawn
    /// the read loop.
    fn start(
        stream: TcpStream,
        transport: Transport,
        remote_static: PublicKey,
        config: &ConnectionConfig,
    ) -> Result<Self, ConnectionError> {
        let (send_cipher, recv_cipher) = transport.into_directions();
        stream.set_write_timeout(Some(config.write_timeout))?;

        let reader_stream = stream.try_clone()?;
        let writer_stream = stream.try_clone()?;
        let (events_tx, events_rx) = mpsc::sync_channel(config.event_capacity);
        let connected = Arc::new(AtomicBool::new(true));
        let stopping = Arc::new(AtomicBool::new(false));

        let reader = {
            let connected = Arc::clone(&connected);
            let stopping = Arc::clone(&stopping);
            let body_timeout = config.frame_body_timeout;
            thread::Builder::new()
                .name("noise-reader".into())
                .spawn(move || {
                    read_loop(
                        reader_stream,
                        recv_cipher,
                        &events_tx,
                        &connected,
                        &stopping,
                        body_timeout,
                    );
                })?
        };

        Ok(Self {
            stream,
            writer: Mutex::new(WriteState {
                stream: writer_stream,
                cipher: send_cipher,
            }),
            remote_static,
            connected,
            stopping,
            reader: Some(reader),
            events: events_rx,
        })
    }

    /// Encrypts and sends one wire message.
    ///
    /// Concurrent callers are serialized through a single gate; unordered
    /// writes would desynchronize the peer's implicit nonce.
    ///
    /// # Errors
    ///
    /// Returns `MessageTooLarge` beyond [`MAX_MESSAGE_SIZE`],
    /// `NotConnected` after the connection went down, or the underlying
    /// IO/timeout error.
    pub fn send_message(&self, msg: &[u8]) -> Result<(), ConnectionError> {
        if msg.len() > MAX_MESSAGE_SIZE {
            return Err(ConnectionError::MessageTooLarge(msg.len()));
        }
        if !self.is_connected() {
            return Err(ConnectionError::NotConnected);
        }

        let mut writer = self.writer.lock().expect("writer lock poisoned");
        let frame = encrypt_frame(&mut writer.cipher, msg);
        writer.stream.write_all(&frame)?;
        Ok(())
    }

    /// The queue of decrypted messages and the terminal disconnect event,
    /// in arrival order. Intended for a single consumer.
    #[must_use]
    pub fn events(&self) -> &Receiver<PeerEvent> {
        &self.events
    }

    /// Whether the read loop is still serving the connection.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// The peer's static public key (its node ID), authenticated by the
    /// handshake.
    #[must_use]
    pub fn remote_static(&self) -> PublicKey {
        self.remote_static
    }

    /// Stops the read loop and closes the socket.
    ///
    /// Waits for the loop to finish before returning, so no read ever
    /// races the released socket: shutting the socket down unblocks the
    /// idle header read, and a mid-frame read is bounded by the body
    /// timeout. Idempotent; also invoked on drop.
    pub fn shutdown(&mut self) {
        self.stopping.store(true, Ordering::Release);
        let _ = self.stream.shutdown(Shutdown::Both);
        if let Some(reader) = self.reader.take() {
            // Drain the queue while waiting: a reader blocked on the full
            // bounded queue must complete its send before it can observe
            // the shutdown. Undelivered events are discarded.
            while !reader.is_finished() {
                while self.events.try_recv().is_ok() {}
                thread::yield_now();
            }
            let _ = reader.join();
            debug!("read loop for {} stopped", self.remote_static);
        }
        self.connected.store(false, Ordering::Release);
    }
}

impl Drop for NoiseConnection {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The single background read loop: exactly 18 header bytes, then exactly
/// the announced body, decrypted and delivered in order. Any failure is
/// terminal.
fn read_loop(
    mut stream: TcpStream,
    mut cipher: CipherState,
    events: &SyncSender<PeerEvent>,
    connected: &AtomicBool,
    stopping: &AtomicBool,
    body_timeout: Duration,
) {
    loop {
        // Idle wait for the next header is unbounded; shutdown() unblocks
        // it by closing the socket.
        if stream.set_read_timeout(None).is_err() {
            break;
        }
        let mut header = [0u8; ENCRYPTED_LENGTH_SIZE];
        if let Err(e) = stream.read_exact(&mut header) {
            if !stopping.load(Ordering::Acquire) {
                error!("read loop terminated: {e}");
                let _ = events.send(PeerEvent::Disconnected(e.into()));
            }
            break;
        }

        match read_body(&mut stream, &mut cipher, &header, body_timeout) {
            Ok(msg) => {
                // A closed receiver means the consumer is gone; stop
                // reading rather than decrypt into the void.
                if events.send(PeerEvent::Message(msg)).is_err() {
                    break;
                }
            }
            Err(e) => {
                if !stopping.load(Ordering::Acquire) {
                    error!("read loop terminated: {e}");
                    let _ = events.send(PeerEvent::Disconnected(e));
                }
                break;
            }
        }
    }
    connected.store(false, Ordering::Release);
}

/// Decrypts the header and reads the announced body under the mid-frame
/// timeout, so a stalled peer cannot hold a half-read frame open forever.
fn read_body(
    stream: &mut TcpStream,
    cipher: &mut CipherState,
    header: &[u8; ENCRYPTED_LENGTH_SIZE],
    body_timeout: Duration,
) -> Result<Vec<u8>, ConnectionError> {
    let len = decrypt_frame_length(cipher, header)?;

    stream.set_read_timeout(Some(body_timeout))?;
    let mut ciphertext = vec![0u8; usize::from(len) + MAC_SIZE];
    stream.read_exact(&mut ciphertext)?;

    Ok(decrypt_frame_body(cipher, &ciphertext)?)
}

/// Errors that can occur during connection operations.
#[derive(Debug)]
pub enum ConnectionError {
    /// IO error (connection, read, write)
    Io(io::Error),
    /// Noise protocol error (handshake, decryption)
    Noise(NoiseError),
    /// A socket deadline elapsed (handshake act, write, or frame body)
    Timeout,
    /// Message exceeds `MAX_MESSAGE_SIZE`
    MessageTooLarge(usize),
    /// The connection has already gone down
    NotConnected,
}

impl std::fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Noise(e) => write!(f, "Noise error: {e}"),
            Self::Timeout => write!(f, "socket deadline elapsed"),
            Self::MessageTooLarge(size) => {
                write!(f, "message too large: {size} bytes (max {MAX_MESSAGE_SIZE})")
            }
            Self::NotConnected => write!(f, "connection is closed"),
        }
    }
}

impl std::error::Error for ConnectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Noise(e) => Some(e),
            Self::Timeout | Self::MessageTooLarge(_) | Self::NotConnected => None,
        }
    }
}

impl From<io::Error> for ConnectionError {
    fn from(e: io::Error) -> Self {
        // Distinguish elapsed deadlines so callers can tell a slow peer
        // from a protocol violation. Both kinds occur across platforms.
        match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::Timeout,
            _ => Self::Io(e),
        }
    }
}

impl From<NoiseError> for ConnectionError {
    fn from(e: NoiseError) -> Self {
        Self::Noise(e)
    }
}
