//! Kernel side of the socket transport

use crate::codec::{read_frames, write_frames};
use core_types::Identity;
use ipc::Frames;
use kernel_api::{Channel, RecvMode, Transport, TransportError};
use std::collections::HashMap;
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

/// Channels a kernel listens on, in port order
pub const KERNEL_CHANNELS: [Channel; 3] = [Channel::Shell, Channel::IoPub, Channel::Stdin];

/// How long a new connection has to announce its identity
pub const DEFAULT_ANNOUNCE_TIMEOUT: Duration = Duration::from_secs(5);

/// How long one write to a peer may block before the peer is dropped
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// Socket timeouts for the kernel side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketOptions {
    pub announce_timeout: Duration,
    pub write_timeout: Duration,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            announce_timeout: DEFAULT_ANNOUNCE_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

impl SocketOptions {
    pub fn with_announce_timeout(mut self, timeout: Duration) -> Self {
        self.announce_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }
}

/// A routed connection, numbered so a stale reader cannot drop a newer one
struct Peer {
    connection: u64,
    stream: TcpStream,
}

type Peers = Arc<Mutex<HashMap<(Channel, Identity), Peer>>>;
type Subscribers = Arc<Mutex<Vec<(Identity, TcpStream)>>>;

static NEXT_CONNECTION: AtomicU64 = AtomicU64::new(0);

/// Socket transport for a kernel
///
/// Binds one listener per channel. Every connection first sends a frame
/// list holding its identity. Frames read from shell and stdin connections
/// reach the kernel with that identity prepended, and outbound frames on
/// those channels are routed by their leading identity frame, which is
/// stripped before writing. Iopub frames go to every subscriber.
pub struct TcpKernelTransport {
    addrs: HashMap<Channel, SocketAddr>,
    inbound: HashMap<Channel, Receiver<Frames>>,
    peers: Peers,
    subscribers: Subscribers,
}

impl TcpKernelTransport {
    /// Binds shell, iopub and stdin on `ip`
    ///
    /// A port of 0 lets the operating system pick one; see
    /// [`TcpKernelTransport::port`].
    pub fn bind(ip: &str, shell: u16, iopub: u16, stdin: u16) -> Result<Self, TransportError> {
        Self::bind_with(ip, [shell, iopub, stdin], SocketOptions::default())
    }

    /// Binds with explicit ports, in [`KERNEL_CHANNELS`] order, and timeouts
    pub fn bind_with(
        ip: &str,
        ports: [u16; 3],
        options: SocketOptions,
    ) -> Result<Self, TransportError> {
        let peers: Peers = Arc::default();
        let subscribers: Subscribers = Arc::default();
        let mut addrs = HashMap::new();
        let mut inbound = HashMap::new();

        for (channel, port) in KERNEL_CHANNELS.into_iter().zip(ports) {
            let listener = TcpListener::bind((ip, port))?;
            let addr = listener.local_addr()?;
            tracing::debug!(%channel, %addr, "listening");
            addrs.insert(channel, addr);

            let (sender, receiver) = mpsc::channel();
            if channel.is_routed() {
                inbound.insert(channel, receiver);
            }
            let acceptor = Acceptor {
                channel,
                listener,
                options,
                sender,
                peers: Arc::clone(&peers),
                subscribers: Arc::clone(&subscribers),
            };
            thread::Builder::new()
                .name(format!("accept-{}", channel))
                .spawn(move || acceptor.run())?;
        }

        Ok(Self {
            addrs,
            inbound,
            peers,
            subscribers,
        })
    }

    /// Port a channel is bound to
    pub fn port(&self, channel: Channel) -> Option<u16> {
        self.addrs.get(&channel).map(SocketAddr::port)
    }

    /// Number of connected iopub subscribers
    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }

    /// Returns whether `identity` is connected on a routed channel
    pub fn has_peer(&self, channel: Channel, identity: &Identity) -> bool {
        lock(&self.peers).contains_key(&(channel, identity.clone()))
    }

    fn route(&self, channel: Channel, frames: Frames) -> Result<(), TransportError> {
        let mut frames = frames.into_iter();
        let identity = frames
            .next()
            .map(Identity::new)
            .ok_or_else(|| TransportError::NoRoute(String::new()))?;
        let body: Frames = frames.collect();

        let mut peers = lock(&self.peers);
        let key = (channel, identity);
        let peer = peers
            .get_mut(&key)
            .ok_or_else(|| TransportError::NoRoute(key.1.to_string()))?;
        if let Err(err) = write_frames(&mut peer.stream, &body) {
            tracing::warn!(%channel, identity = %key.1, error = %err, "dropping peer");
            peers.remove(&key);
            return Err(err.into());
        }
        Ok(())
    }

    fn broadcast(&self, frames: &[Vec<u8>]) {
        lock(&self.subscribers).retain_mut(|(identity, stream)| {
            match write_frames(stream, frames) {
                Ok(()) => true,
                Err(err) => {
                    tracing::debug!(%identity, error = %err, "dropping subscriber");
                    false
                }
            }
        });
    }
}

impl Transport for TcpKernelTransport {
    fn send(&mut self, channel: Channel, frames: Frames) -> Result<(), TransportError> {
        match channel {
            Channel::IoPub => {
                self.broadcast(&frames);
                Ok(())
            }
            Channel::Shell | Channel::Stdin => self.route(channel, frames),
            Channel::Control | Channel::Heartbeat => Err(TransportError::UnsupportedChannel(channel)),
        }
    }

    fn recv(&mut self, channel: Channel, mode: RecvMode) -> Result<Option<Frames>, TransportError> {
        let receiver = self
            .inbound
            .get(&channel)
            .ok_or(TransportError::UnsupportedChannel(channel))?;
        match mode {
            RecvMode::Blocking => receiver
                .recv()
                .map(Some)
                .map_err(|_| TransportError::Disconnected(channel)),
            RecvMode::NonBlocking => match receiver.try_recv() {
                Ok(frames) => Ok(Some(frames)),
                Err(TryRecvError::Empty) => Ok(None),
                Err(TryRecvError::Disconnected) => Err(TransportError::Disconnected(channel)),
            },
        }
    }
}

impl std::fmt::Debug for TcpKernelTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpKernelTransport")
            .field("addrs", &self.addrs)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Accepts connections for one channel
struct Acceptor {
    channel: Channel,
    listener: TcpListener,
    options: SocketOptions,
    sender: Sender<Frames>,
    peers: Peers,
    subscribers: Subscribers,
}

impl Acceptor {
    fn run(self) {
        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(err) => {
                    tracing::warn!(channel = %self.channel, error = %err, "accept failed");
                    continue;
                }
            };
            let admission = Admission {
                channel: self.channel,
                options: self.options,
                sender: self.sender.clone(),
                peers: Arc::clone(&self.peers),
                subscribers: Arc::clone(&self.subscribers),
            };
            let spawned = thread::Builder::new()
                .name(format!("read-{}", self.channel))
                .spawn(move || admission.run(stream));
            if let Err(err) = spawned {
                tracing::warn!(channel = %self.channel, error = %err, "could not start reader");
            }
        }
    }
}

/// Admits one connection on its own thread
struct Admission {
    channel: Channel,
    options: SocketOptions,
    sender: Sender<Frames>,
    peers: Peers,
    subscribers: Subscribers,
}

impl Admission {
    fn run(self, stream: TcpStream) {
        let channel = self.channel;
        match self.admit(stream) {
            Ok(Some(reader)) => reader.run(),
            Ok(None) => {}
            Err(err) => tracing::warn!(%channel, error = %err, "rejected connection"),
        }
    }

    /// Reads the identity announcement and registers the connection
    ///
    /// Returns the reader for routed channels.
    fn admit(self, mut stream: TcpStream) -> io::Result<Option<PeerReader>> {
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(self.options.announce_timeout))?;
        let identity = match read_frames(&mut stream)? {
            Some(mut frames) if frames.len() == 1 => Identity::new(frames.remove(0)),
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "expected an identity announcement",
                ))
            }
        };
        stream.set_read_timeout(None)?;
        stream.set_write_timeout(Some(self.options.write_timeout))?;
        tracing::debug!(channel = %self.channel, %identity, "peer connected");

        let writer = stream.try_clone()?;
        if !self.channel.is_routed() {
            lock(&self.subscribers).push((identity, writer));
            return Ok(None);
        }

        let connection = NEXT_CONNECTION.fetch_add(1, Ordering::Relaxed);
        let peer = Peer {
            connection,
            stream: writer,
        };
        lock(&self.peers).insert((self.channel, identity.clone()), peer);
        Ok(Some(PeerReader {
            channel: self.channel,
            identity,
            connection,
            stream,
            sender: self.sender,
            peers: self.peers,
        }))
    }
}

/// Moves frames from one routed connection into the kernel's queue
struct PeerReader {
    channel: Channel,
    identity: Identity,
    connection: u64,
    stream: TcpStream,
    sender: Sender<Frames>,
    peers: Peers,
}

impl PeerReader {
    fn run(mut self) {
        loop {
            match read_frames(&mut self.stream) {
                Ok(Some(frames)) => {
                    let mut routed = Vec::with_capacity(frames.len() + 1);
                    routed.push(self.identity.as_bytes().to_vec());
                    routed.extend(frames);
                    if self.sender.send(routed).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!(channel = %self.channel, identity = %self.identity, error = %err, "read failed");
                    break;
                }
            }
        }
        tracing::debug!(channel = %self.channel, identity = %self.identity, "peer disconnected");
        let mut peers = lock(&self.peers);
        let key = (self.channel, self.identity);
        if peers.get(&key).map(|peer| peer.connection) == Some(self.connection) {
            peers.remove(&key);
        }
    }
}
