//! Frontend side of the socket transport

use crate::codec::{read_frames, write_frames};
use core_types::Identity;
use ipc::Frames;
use kernel_api::{Channel, KernelPorts, RecvMode, Transport, TransportError};
use std::collections::HashMap;
use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::Duration;

/// Socket transport for a frontend
///
/// Connects to the shell, iopub and stdin ports of a kernel and announces
/// the same identity on each. A reader thread per channel queues whatever
/// the kernel sends.
pub struct TcpClientTransport {
    identity: Identity,
    writers: HashMap<Channel, TcpStream>,
    inbound: HashMap<Channel, Receiver<Frames>>,
}

impl TcpClientTransport {
    /// Connects to a kernel on `ip`
    pub fn connect(ip: &str, ports: KernelPorts, identity: Identity) -> Result<Self, TransportError> {
        let mut writers = HashMap::new();
        let mut inbound = HashMap::new();

        for (channel, port) in [
            (Channel::Shell, ports.xrep_port),
            (Channel::IoPub, ports.pub_port),
            (Channel::Stdin, ports.req_port),
        ] {
            let mut stream = TcpStream::connect((ip, port))?;
            stream.set_nodelay(true)?;
            write_frames(&mut stream, &[identity.as_bytes().to_vec()])?;

            let mut reader = stream.try_clone()?;
            let (sender, receiver) = mpsc::channel();
            thread::Builder::new()
                .name(format!("client-{}", channel))
                .spawn(move || loop {
                    match read_frames(&mut reader) {
                        Ok(Some(frames)) => {
                            if sender.send(frames).is_err() {
                                break;
                            }
                        }
                        Ok(None) => break,
                        Err(err) => {
                            tracing::debug!(%channel, error = %err, "client read failed");
                            break;
                        }
                    }
                })?;

            writers.insert(channel, stream);
            inbound.insert(channel, receiver);
        }

        tracing::debug!(%identity, ip, ?ports, "connected to kernel");
        Ok(Self {
            identity,
            writers,
            inbound,
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Waits up to `timeout` for frames on `channel`
    pub fn recv_timeout(
        &mut self,
        channel: Channel,
        timeout: Duration,
    ) -> Result<Option<Frames>, TransportError> {
        match self.receiver(channel)?.recv_timeout(timeout) {
            Ok(frames) => Ok(Some(frames)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Disconnected(channel)),
        }
    }

    fn receiver(&self, channel: Channel) -> Result<&Receiver<Frames>, TransportError> {
        self.inbound
            .get(&channel)
            .ok_or(TransportError::UnsupportedChannel(channel))
    }
}

impl Transport for TcpClientTransport {
    fn send(&mut self, channel: Channel, frames: Frames) -> Result<(), TransportError> {
        let stream = self
            .writers
            .get_mut(&channel)
            .ok_or(TransportError::UnsupportedChannel(channel))?;
        write_frames(stream, &frames)?;
        Ok(())
    }

    fn recv(&mut self, channel: Channel, mode: RecvMode) -> Result<Option<Frames>, TransportError> {
        let receiver = self.receiver(channel)?;
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

impl std::fmt::Debug for TcpClientTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpClientTransport")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
