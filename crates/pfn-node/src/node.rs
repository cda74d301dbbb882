//! The processor node.
//!
//! Everything a node does to packages happens on one dispatch task per run:
//! datagrams decoded by the reader, packages injected by producers and
//! packages re-injected by handlers are all threaded through the handler
//! chain there, one at a time. Packages that survive the chain go to the
//! writer. A `shutdown` command is forwarded and then stops the node.
//!
//! A handler that panics loses the package it was working on; the node
//! reports an error and keeps dispatching. A reader that fails stops the node.

use std::future::Future;
use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

use pfn_network::{NetworkError, NetworkReader, NetworkWriter, ReaderObserver, TransportConfig};
use pfn_protocol::{ControlCommand, DataItem, Package};

use crate::{
    ChainOutcome, ConfigLoader, DataHandler, EventCategory, HandlerChain, HandlerId, NodeConfig,
    NodeError, NodeEvent, NodeObserver, NullObserver, TomlConfigLoader,
};

const TAG: &str = "Node";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Created,
    Configured,
    ConfigurationFailed,
    Running,
    Stopped,
}

/// Collaborators a node is built with.
#[derive(Clone)]
pub struct NodeOptions {
    pub loader: Arc<dyn ConfigLoader>,
    pub observer: Arc<dyn NodeObserver>,
    pub transport: TransportConfig,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            loader: Arc::new(TomlConfigLoader),
            observer: Arc::new(NullObserver),
            transport: TransportConfig::default(),
        }
    }
}

enum Command<T> {
    Inject(Package<T>),
    Resume { after: HandlerId, package: Package<T> },
}

/// What the reader tells the dispatch loop: new packages, or that it died.
#[derive(Default)]
struct ReaderSignal {
    wake: Notify,
    failure: Mutex<Option<String>>,
}

impl ReaderSignal {
    fn take_failure(&self) -> Option<String> {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl ReaderObserver for ReaderSignal {
    fn received_data(&self) {
        self.wake.notify_one();
    }

    fn reader_failed(&self, error: &NetworkError) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(error.to_string());
        self.wake.notify_one();
    }
}

struct Running<T> {
    commands: mpsc::UnboundedSender<Command<T>>,
    signal: Arc<ReaderSignal>,
    reader: Arc<NetworkReader<T>>,
    writer: Option<Arc<NetworkWriter<T>>>,
    shutdown: Arc<Notify>,
    dispatcher: JoinHandle<()>,
}

impl<T: DataItem> Running<T> {
    fn close_transport(&self) {
        self.reader.stop();
        if let Some(writer) = &self.writer {
            writer.stop();
        }
    }
}

struct Shared<T> {
    name: String,
    options: NodeOptions,
    lifecycle: tokio::sync::Mutex<()>,
    state: Mutex<NodeState>,
    config: Mutex<Option<NodeConfig>>,
    chain: Mutex<Arc<HandlerChain<T>>>,
    running: Mutex<Option<Running<T>>>,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        let running = self
            .running
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(running) = running {
            running.dispatcher.abort();
        }
    }
}

impl<T: DataItem> Shared<T> {
    fn emit(&self, category: EventCategory, message: impl Into<String>) {
        let event = NodeEvent::new(category, message);
        match category {
            EventCategory::Lifecycle | EventCategory::Message => {
                tracing::info!(node = %self.name, category = %category, "{}", event.message)
            }
            EventCategory::Warning => {
                tracing::warn!(node = %self.name, "{}", event.message)
            }
            EventCategory::Error => {
                tracing::error!(node = %self.name, "{}", event.message)
            }
        }
        self.options.observer.node_event(&event);
    }

    fn set_state(&self, state: NodeState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn state(&self) -> NodeState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn config(&self) -> Option<NodeConfig> {
        self.config
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|running| !running.dispatcher.is_finished())
    }

    fn chain(&self) -> Arc<HandlerChain<T>> {
        Arc::clone(&self.chain.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn submit(&self, command: Command<T>) -> Result<(), NodeError> {
        let running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        let running = running.as_ref().ok_or(NodeError::NotRunning)?;
        running
            .commands
            .send(command)
            .map_err(|_| NodeError::NotRunning)
    }

    fn send_data(&self, package: Package<T>) -> Result<(), NodeError> {
        let running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        let running = running.as_ref().ok_or(NodeError::NotRunning)?;
        let writer = running.writer.as_ref().ok_or(NodeError::NoNextHop)?;
        writer.write(package);
        Ok(())
    }

    fn update_queue_depth(&self, label: &str, count: usize) {
        tracing::debug!(node = %self.name, label, count, "Queue depth");
        self.options.observer.queue_depth(label, count);
    }

    fn process(&self, start: usize, mut package: Package<T>) -> Option<Package<T>> {
        if start == 0 && package.command() == Some(ControlCommand::Ping) {
            self.emit(EventCategory::Message, "Ping received");
        }
        let chain = self.chain();
        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| chain.dispatch(start, &mut package)));
        match outcome {
            Ok(ChainOutcome::Consumed(_)) => None,
            Ok(ChainOutcome::Passed) => Some(package),
            Err(_) => {
                self.emit(
                    EventCategory::Error,
                    format!("A handler panicked on a {} package, package dropped", package.kind()),
                );
                None
            }
        }
    }

    /// Tear down the current run from inside the dispatch task.
    fn halt(&self, reason: &str) {
        let running = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(running) = running {
            running.close_transport();
            self.set_state(NodeState::Stopped);
            self.emit(EventCategory::Lifecycle, format!("Node stopped: {reason}"));
        }
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task);
        let mut background = self.background.lock().unwrap_or_else(PoisonError::into_inner);
        background.retain(|task| !task.is_finished());
        background.push(handle);
    }
}

/// A processor node: a handler chain between a reader and a writer.
pub struct Node<T> {
    shared: Arc<Shared<T>>,
}

impl<T: DataItem> Node<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_options(name, NodeOptions::default())
    }

    pub fn with_options(name: impl Into<String>, options: NodeOptions) -> Self {
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                options,
                lifecycle: tokio::sync::Mutex::new(()),
                state: Mutex::new(NodeState::Created),
                config: Mutex::new(None),
                chain: Mutex::new(Arc::new(HandlerChain::new())),
                running: Mutex::new(None),
                background: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// A weak handle for handlers and background tasks.
    pub fn handle(&self) -> NodeHandle<T> {
        NodeHandle {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Append a handler to the end of the chain.
    ///
    /// A package already being dispatched keeps the chain it started with.
    pub fn add_handler(&self, handler: Arc<dyn DataHandler<T>>) -> HandlerId {
        let id = {
            let mut chain = self.shared.chain.lock().unwrap_or_else(PoisonError::into_inner);
            let mut next = HandlerChain::clone(&chain);
            let id = next.push(Arc::clone(&handler));
            *chain = Arc::new(next);
            id
        };
        handler.attached(id);
        tracing::debug!(node = %self.shared.name, handler = handler.name(), id = %id, "Handler added");
        id
    }

    pub fn handler_names(&self) -> Vec<String> {
        self.shared.chain().names()
    }

    /// Load and validate the configuration at `path`.
    pub fn configure(&self, path: impl AsRef<Path>) -> Result<(), NodeError> {
        let path = path.as_ref();
        let loaded = self.shared.options.loader.load(path);
        self.apply_config(loaded.map_err(NodeError::from), &path.display().to_string())
    }

    /// Use an already built configuration.
    pub fn configure_with(&self, config: NodeConfig) -> Result<(), NodeError> {
        let checked = config.validate().map(|()| config).map_err(NodeError::from);
        self.apply_config(checked, "memory")
    }

    fn apply_config(
        &self,
        loaded: Result<NodeConfig, NodeError>,
        source: &str,
    ) -> Result<(), NodeError> {
        if self.shared.is_running() {
            return Err(NodeError::AlreadyRunning);
        }
        let mut config = self.shared.config.lock().unwrap_or_else(PoisonError::into_inner);
        match loaded {
            Ok(loaded) => {
                *config = Some(loaded);
                drop(config);
                self.shared.set_state(NodeState::Configured);
                self.shared
                    .emit(EventCategory::Lifecycle, format!("Configuration loaded from {source}"));
                Ok(())
            }
            Err(e) => {
                *config = None;
                drop(config);
                self.shared.set_state(NodeState::ConfigurationFailed);
                self.shared
                    .emit(EventCategory::Error, format!("Configuration failed: {e}"));
                Err(e)
            }
        }
    }

    pub fn config(&self) -> Option<NodeConfig> {
        self.shared.config()
    }

    pub fn state(&self) -> NodeState {
        self.shared.state()
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Address the reader is bound to while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.shared
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|running| running.reader.local_addr())
    }

    /// Bind the transport and start dispatching. Starting a running node
    /// does nothing.
    pub async fn start(&self) -> Result<(), NodeError> {
        let shared = &self.shared;
        let _lifecycle = shared.lifecycle.lock().await;
        if shared.is_running() {
            return Ok(());
        }
        let stale = shared
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(stale) = stale {
            tracing::warn!(node = %shared.name, "Dispatch task had exited, closing its transport");
            stale.close_transport();
        }
        let config = shared.config().ok_or(NodeError::NotConfigured)?;

        let signal = Arc::new(ReaderSignal::default());
        let observer: Arc<dyn ReaderObserver> = signal.clone();
        let reader = Arc::new(
            NetworkReader::bind(
                config.network.listen_port,
                observer,
                shared.options.transport.clone(),
            )
            .await?,
        );
        let writer = match config.network.next_hop.as_deref() {
            Some(hop) => Some(Arc::new(NetworkWriter::connect(hop).await?)),
            None => None,
        };
        reader.start()?;
        if let Some(writer) = &writer {
            writer.start();
        }

        let (commands, receiver) = mpsc::unbounded_channel();
        let shutdown = Arc::new(Notify::new());
        let dispatcher = tokio::spawn(dispatch_loop(
            Arc::downgrade(shared),
            Arc::clone(&reader),
            writer.clone(),
            Arc::clone(&signal),
            receiver,
            Arc::clone(&shutdown),
        ));

        let listen = reader.local_addr();
        let next_hop = writer.as_ref().map(|w| w.next_hop().to_string());
        *shared.running.lock().unwrap_or_else(PoisonError::into_inner) = Some(Running {
            commands,
            signal,
            reader,
            writer,
            shutdown,
            dispatcher,
        });
        shared.set_state(NodeState::Running);
        shared.emit(
            EventCategory::Lifecycle,
            format!(
                "Node started on {listen}, next hop {}",
                next_hop.as_deref().unwrap_or("none")
            ),
        );
        Ok(())
    }

    /// Stop dispatching and close the transport. Safe to call when the node
    /// is not running. Background tasks are not cancelled; they find the
    /// node stopped and deliver nothing.
    pub async fn stop(&self) {
        let shared = &self.shared;
        let _lifecycle = shared.lifecycle.lock().await;
        let running = shared
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(running) = running else {
            return;
        };

        running.close_transport();
        running.shutdown.notify_one();
        drop(running.commands);
        if let Err(e) = running.dispatcher.await {
            if e.is_panic() {
                tracing::error!(node = %shared.name, "Dispatch task panicked");
            }
        }
        shared.set_state(NodeState::Stopped);
        shared.emit(EventCategory::Lifecycle, "Node stopped");
    }

    /// Wait for every background task spawned through a handle.
    pub async fn join_background(&self) {
        loop {
            let tasks = std::mem::take(
                &mut *self
                    .shared
                    .background
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner),
            );
            if tasks.is_empty() {
                return;
            }
            for task in tasks {
                if let Err(e) = task.await {
                    if e.is_panic() {
                        tracing::warn!(node = %self.shared.name, "Background task panicked");
                    }
                }
            }
        }
    }

    /// Send a package straight to the next hop, bypassing the chain.
    pub fn send_data(&self, package: Package<T>) -> Result<(), NodeError> {
        self.shared.send_data(package)
    }

    /// Thread a package through the whole chain.
    pub fn pass_to_handlers(&self, package: Package<T>) -> Result<(), NodeError> {
        self.shared.submit(Command::Inject(package))
    }

    /// Thread a package through the handlers after `after`.
    pub fn pass_to_next_handlers(
        &self,
        after: HandlerId,
        package: Package<T>,
    ) -> Result<(), NodeError> {
        self.shared.submit(Command::Resume { after, package })
    }

    pub fn update_queue_depth(&self, label: &str, count: usize) {
        self.shared.update_queue_depth(label, count);
    }

    pub fn show_ui_message(&self, message: impl Into<String>) {
        self.shared.emit(EventCategory::Message, message);
    }
}

/// What handlers hold on to. It does not keep the node alive; once the node
/// is gone every call is a no-op or `NotRunning`.
pub struct NodeHandle<T> {
    shared: Weak<Shared<T>>,
}

impl<T> Clone for NodeHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<T: DataItem> NodeHandle<T> {
    /// A handle bound to no node, for handlers used outside one.
    pub fn detached() -> Self {
        Self { shared: Weak::new() }
    }

    pub fn is_running(&self) -> bool {
        self.shared.upgrade().is_some_and(|s| s.is_running())
    }

    pub fn config(&self) -> Option<NodeConfig> {
        self.shared.upgrade().and_then(|s| s.config())
    }

    /// A configuration value by dotted name, e.g. `files.data_file`.
    pub fn setting(&self, name: &str) -> Option<String> {
        self.config().and_then(|c| c.setting(name))
    }

    pub fn send_data(&self, package: Package<T>) -> Result<(), NodeError> {
        self.shared
            .upgrade()
            .ok_or(NodeError::NotRunning)?
            .send_data(package)
    }

    pub fn pass_to_handlers(&self, package: Package<T>) -> Result<(), NodeError> {
        self.shared
            .upgrade()
            .ok_or(NodeError::NotRunning)?
            .submit(Command::Inject(package))
    }

    pub fn pass_to_next_handlers(
        &self,
        after: HandlerId,
        package: Package<T>,
    ) -> Result<(), NodeError> {
        self.shared
            .upgrade()
            .ok_or(NodeError::NotRunning)?
            .submit(Command::Resume { after, package })
    }

    pub fn update_queue_depth(&self, label: &str, count: usize) {
        if let Some(shared) = self.shared.upgrade() {
            shared.update_queue_depth(label, count);
        }
    }

    pub fn show_ui_message(&self, message: impl Into<String>) {
        self.report(EventCategory::Message, message);
    }

    pub fn report(&self, category: EventCategory, message: impl Into<String>) {
        if let Some(shared) = self.shared.upgrade() {
            shared.emit(category, message);
        }
    }

    /// Run `task` in the background. Must be called within a Tokio runtime.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.shared.upgrade() {
            Some(shared) => shared.spawn(task),
            None => tracing::debug!(node = TAG, "Node gone, background task not started"),
        }
    }
}

enum Flow {
    Continue,
    Exit,
}

async fn dispatch_loop<T: DataItem>(
    shared: Weak<Shared<T>>,
    reader: Arc<NetworkReader<T>>,
    writer: Option<Arc<NetworkWriter<T>>>,
    signal: Arc<ReaderSignal>,
    mut commands: mpsc::UnboundedReceiver<Command<T>>,
    shutdown: Arc<Notify>,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.notified() => break,
            _ = signal.wake.notified() => {
                while let Some(package) = reader.read() {
                    if let Flow::Exit = route(&shared, writer.as_deref(), 0, package).await {
                        return;
                    }
                }
                if let Some(error) = signal.take_failure() {
                    if let Some(shared) = shared.upgrade() {
                        shared.emit(EventCategory::Error, format!("Reader failed: {error}"));
                        shared.halt("reader failed");
                    }
                    return;
                }
            }
            command = commands.recv() => {
                let (start, package) = match command {
                    Some(Command::Inject(package)) => (0, package),
                    Some(Command::Resume { after, package }) => (after.next(), package),
                    None => break,
                };
                if let Flow::Exit = route(&shared, writer.as_deref(), start, package).await {
                    return;
                }
            }
        }
    }
    tracing::debug!(node = TAG, "Dispatch loop finished");
}

async fn route<T: DataItem>(
    shared: &Weak<Shared<T>>,
    writer: Option<&NetworkWriter<T>>,
    start: usize,
    package: Package<T>,
) -> Flow {
    let Some(shared) = shared.upgrade() else {
        return Flow::Exit;
    };
    let Some(package) = shared.process(start, package) else {
        return Flow::Continue;
    };

    let Some(writer) = writer else {
        tracing::debug!(node = %shared.name, kind = %package.kind(), "No next hop, package dropped");
        if package.command() == Some(ControlCommand::Shutdown) {
            shared.halt("shutdown received");
            return Flow::Exit;
        }
        return Flow::Continue;
    };

    if package.command() == Some(ControlCommand::Shutdown) {
        if let Err(e) = writer.send_now(&package).await {
            tracing::warn!(node = %shared.name, error = %e, "Could not forward shutdown");
        }
        shared.halt("shutdown received");
        return Flow::Exit;
    }
    writer.write(package);
    Flow::Continue
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pfn_protocol::ProtocolError;

    use super::*;
    use crate::EventLog;

    #[derive(Debug, Clone)]
    struct Line(String);

    impl DataItem for Line {
        fn parse_line(raw: &str, _content_type: &str) -> Result<Self, ProtocolError> {
            Ok(Line(raw.to_string()))
        }

        fn from_wire(body: &str) -> Result<Self, ProtocolError> {
            Ok(Line(body.to_string()))
        }

        fn to_wire_body(&self) -> String {
            self.0.clone()
        }

        fn identity(&self) -> &str {
            &self.0
        }

        fn merge_from(&mut self, other: &Self) {
            self.0.clone_from(&other.0);
        }
    }

    fn signal_of(node: &Node<Line>) -> Arc<ReaderSignal> {
        let running = node.shared.running.lock().unwrap();
        Arc::clone(&running.as_ref().expect("node is running").signal)
    }

    #[tokio::test]
    async fn reader_failure_stops_the_node_with_an_error() {
        let log = Arc::new(EventLog::new());
        let node: Node<Line> = Node::with_options(
            "deaf",
            NodeOptions {
                observer: log.clone(),
                ..NodeOptions::default()
            },
        );
        node.configure_with(NodeConfig::new("deaf").with_listen_port(0))
            .unwrap();
        node.start().await.unwrap();

        signal_of(&node).reader_failed(&NetworkError::Closed);

        tokio::time::timeout(Duration::from_secs(5), async {
            while node.state() != NodeState::Stopped {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("a failed reader stops the node");

        assert!(!node.is_running());
        let errors = log.messages(EventCategory::Error);
        assert_eq!(errors, [format!("Reader failed: {}", NetworkError::Closed)]);
        assert!(matches!(
            node.pass_to_handlers(Package::data_text("late")),
            Err(NodeError::NotRunning)
        ));

        node.stop().await;
        node.start().await.unwrap();
        assert!(node.is_running(), "a failed node can be started again");
        node.stop().await;
    }

    #[test]
    fn reader_failure_is_taken_once() {
        let signal = ReaderSignal::default();
        signal.reader_failed(&NetworkError::Closed);
        assert_eq!(signal.take_failure(), Some(NetworkError::Closed.to_string()));
        assert_eq!(signal.take_failure(), None);
    }
}
