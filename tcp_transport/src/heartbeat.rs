//! Heartbeat echo
//!
//! Frontends check that a kernel is alive by writing bytes to the heartbeat
//! port and waiting for them to come back. The echo runs on its own
//! threads, so it keeps answering while the kernel is busy.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Listener that echoes every byte it receives
#[derive(Debug)]
pub struct Heartbeat {
    listener: TcpListener,
    addr: SocketAddr,
}

impl Heartbeat {
    /// Binds the heartbeat port; 0 picks a free one
    pub fn bind(ip: &str, port: u16) -> io::Result<Self> {
        let listener = TcpListener::bind((ip, port))?;
        let addr = listener.local_addr()?;
        Ok(Self { listener, addr })
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Starts echoing on a background thread
    pub fn start(self) -> io::Result<JoinHandle<()>> {
        tracing::debug!(addr = %self.addr, "heartbeat listening");
        thread::Builder::new()
            .name("heartbeat".to_string())
            .spawn(move || {
                for stream in self.listener.incoming() {
                    match stream {
                        Ok(stream) => {
                            if let Err(err) = spawn_echo(stream) {
                                tracing::warn!(error = %err, "heartbeat connection failed");
                            }
                        }
                        Err(err) => tracing::warn!(error = %err, "heartbeat accept failed"),
                    }
                }
            })
    }
}

fn spawn_echo(stream: TcpStream) -> io::Result<()> {
    let mut reader = stream.try_clone()?;
    let mut writer = stream;
    thread::Builder::new()
        .name("heartbeat-echo".to_string())
        .spawn(move || {
            let mut buf = [0u8; 1024];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if writer.write_all(&buf[..n]).is_err() {
                            break;
                        }
                    }
                }
            }
        })?;
    Ok(())
}

/// Sends `payload` to a heartbeat port and waits for the echo
///
/// Returns `Ok(false)` when the echo does not arrive within `timeout`.
pub fn ping(addr: impl ToSocketAddrs, payload: &[u8], timeout: Duration) -> io::Result<bool> {
    let mut stream = TcpStream::connect(addr)?;
    stream.set_read_timeout(Some(timeout))?;
    stream.write_all(payload)?;

    let mut echoed = vec![0u8; payload.len()];
    match stream.read_exact(&mut echoed) {
        Ok(()) => Ok(echoed == payload),
        Err(err) if matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
            Ok(false)
        }
        Err(err) => Err(err),
    }
}
