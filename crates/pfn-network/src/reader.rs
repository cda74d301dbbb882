//! UDP receive side of the transport.
//!
//! One task per reader keeps exactly one receive outstanding. Each datagram is
//! decoded as UTF-8, parsed into a [`Package`], queued, and announced to the
//! observer. Datagrams that fail to decode are logged and dropped. A fatal
//! socket error ends the loop and is reported through
//! [`ReaderObserver::reader_failed`].

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use pfn_protocol::Package;

use crate::{NetworkError, PackageQueue, ReaderObserver, TransportConfig};

const TAG: &str = "NetworkReader";

pub struct NetworkReader<T> {
    socket: Mutex<Option<Arc<UdpSocket>>>,
    local_addr: SocketAddr,
    queue: Arc<PackageQueue<T>>,
    observer: Arc<dyn ReaderObserver>,
    config: TransportConfig,
    running: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> NetworkReader<T> {
    /// Bind a reader to `port` on all IPv4 interfaces. Port 0 picks an
    /// ephemeral port; see [`NetworkReader::local_addr`].
    pub async fn bind(
        port: u16,
        observer: Arc<dyn ReaderObserver>,
        config: TransportConfig,
    ) -> Result<Self, NetworkError> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map_err(|source| NetworkError::Bind { port, source })?;
        let local_addr = socket.local_addr()?;
        tracing::debug!(reader = TAG, addr = %local_addr, "Reader socket bound");

        Ok(Self {
            socket: Mutex::new(Some(Arc::new(socket))),
            local_addr,
            queue: Arc::new(PackageQueue::new()),
            observer,
            config,
            running: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Start the receive loop. Calling it on a running reader does nothing.
    pub fn start(&self) -> Result<(), NetworkError> {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.is_some() {
            return Ok(());
        }
        let socket = self
            .socket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(NetworkError::Closed)?;

        tracing::info!(reader = TAG, addr = %self.local_addr, "Start reading for data");
        self.running.store(true, Ordering::SeqCst);
        *task = Some(tokio::spawn(receive_loop(
            socket,
            Arc::clone(&self.queue),
            Arc::clone(&self.observer),
            self.config.recv_buffer_size,
            Arc::clone(&self.running),
        )));
        Ok(())
    }

    /// Cancel the outstanding receive and close the socket. Packages already
    /// queued stay readable.
    pub fn stop(&self) {
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            tracing::info!(reader = TAG, addr = %self.local_addr, "Stopping the reader");
            task.abort();
        }
        self.running.store(false, Ordering::SeqCst);
        self.socket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Whether the receive loop is alive. Turns false after `stop` or after
    /// a fatal socket error.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Take the oldest received package, if any.
    pub fn read(&self) -> Option<Package<T>> {
        self.queue.pop()
    }

    /// Number of packages waiting to be read.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl<T> Drop for NetworkReader<T> {
    fn drop(&mut self) {
        if let Some(task) = self
            .task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

async fn receive_loop<T>(
    socket: Arc<UdpSocket>,
    queue: Arc<PackageQueue<T>>,
    observer: Arc<dyn ReaderObserver>,
    buffer_size: usize,
    running: Arc<AtomicBool>,
) {
    let mut buffer = vec![0u8; buffer_size];
    loop {
        match socket.recv_from(&mut buffer).await {
            Ok((len, from)) => {
                let text = match std::str::from_utf8(&buffer[..len]) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(reader = TAG, %from, error = %e, "Dropping non UTF-8 datagram");
                        continue;
                    }
                };
                tracing::trace!(reader = TAG, %from, bytes = len, "Received datagram");
                match Package::parse(text) {
                    Ok(package) => {
                        queue.push(package);
                        observer.received_data();
                    }
                    Err(e) => {
                        tracing::warn!(reader = TAG, %from, error = %e, "Dropping malformed datagram");
                    }
                }
            }
            // ICMP unreachable replies to earlier sends surface here on some
            // platforms; they say nothing about this socket.
            Err(e) if matches!(
                e.kind(),
                io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionRefused
            ) =>
            {
                tracing::debug!(reader = TAG, error = %e, "Ignoring ICMP error on receive");
            }
            Err(e) => {
                tracing::error!(reader = TAG, error = %e, "Receive failed, reader stopped");
                running.store(false, Ordering::SeqCst);
                observer.reader_failed(&NetworkError::Io(e));
                return;
            }
        }
    }
}
