//! UDP send side of the transport.
//!
//! Packages written to a [`NetworkWriter`] are queued and drained by a send
//! task, one datagram each, to the configured next hop. Nothing is retried
//! or acknowledged: a failed or lost send is logged and forgotten.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::net::{lookup_host, UdpSocket};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use pfn_protocol::{DataItem, Package, MAX_DATAGRAM_SIZE};

use crate::{NetworkError, PackageQueue};

const TAG: &str = "NetworkWriter";

pub struct NetworkWriter<T> {
    socket: Arc<UdpSocket>,
    next_hop: SocketAddr,
    queue: Arc<PackageQueue<T>>,
    wake: Arc<Notify>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<T: DataItem> NetworkWriter<T> {
    /// Resolve `next_hop` (`host:port`) and bind a local ephemeral socket of
    /// the same address family.
    pub async fn connect(next_hop: &str) -> Result<Self, NetworkError> {
        let next_hop_addr = lookup_host(next_hop)
            .await
            .map_err(|_| NetworkError::Resolve(next_hop.to_string()))?
            .next()
            .ok_or_else(|| NetworkError::Resolve(next_hop.to_string()))?;

        let local: SocketAddr = if next_hop_addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| NetworkError::Bind { port: 0, source })?;
        tracing::debug!(writer = TAG, next_hop = %next_hop_addr, "Writer socket ready");

        Ok(Self {
            socket: Arc::new(socket),
            next_hop: next_hop_addr,
            queue: Arc::new(PackageQueue::new()),
            wake: Arc::new(Notify::new()),
            task: Mutex::new(None),
        })
    }

    pub fn next_hop(&self) -> SocketAddr {
        self.next_hop
    }

    /// Start the send task. Calling it twice does nothing.
    pub fn start(&self) {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.is_none() {
            *task = Some(tokio::spawn(send_loop(
                Arc::clone(&self.socket),
                self.next_hop,
                Arc::clone(&self.queue),
                Arc::clone(&self.wake),
            )));
        }
    }

    /// Stop the send task. Packages still queued are discarded.
    pub fn stop(&self) {
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
        let dropped = self.queue.drain().len();
        if dropped > 0 {
            tracing::debug!(writer = TAG, dropped, "Discarded unsent packages");
        }
    }

    /// Queue a package for sending.
    pub fn write(&self, package: Package<T>) {
        self.queue.push(package);
        self.wake.notify_one();
    }

    /// Number of packages waiting to be sent.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Send one package immediately, bypassing the queue.
    pub async fn send_now(&self, package: &Package<T>) -> Result<usize, NetworkError> {
        send_package(&self.socket, self.next_hop, package).await
    }
}

impl<T> Drop for NetworkWriter<T> {
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

async fn send_package<T: DataItem>(
    socket: &UdpSocket,
    addr: SocketAddr,
    package: &Package<T>,
) -> Result<usize, NetworkError> {
    let wire = package.to_wire();
    if wire.len() > MAX_DATAGRAM_SIZE {
        return Err(NetworkError::Oversized(wire.len()));
    }
    socket
        .send_to(wire.as_bytes(), addr)
        .await
        .map_err(|source| NetworkError::Send { addr, source })
}

async fn send_loop<T: DataItem>(
    socket: Arc<UdpSocket>,
    next_hop: SocketAddr,
    queue: Arc<PackageQueue<T>>,
    wake: Arc<Notify>,
) {
    loop {
        wake.notified().await;
        while let Some(package) = queue.pop() {
            match send_package(&socket, next_hop, &package).await {
                Ok(bytes) => {
                    tracing::trace!(writer = TAG, %next_hop, bytes, kind = %package.kind(), "Sent datagram");
                }
                Err(e) => {
                    tracing::warn!(writer = TAG, error = %e, "Datagram dropped");
                }
            }
        }
    }
}
