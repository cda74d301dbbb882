mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::*;
use pfn_node::*;
use pfn_protocol::*;

fn local_config(name: &str) -> NodeConfig {
    NodeConfig::new(name).with_listen_port(0)
}

fn configured_node(name: &str, next_hop: Option<String>) -> Node<Score> {
    let node: Node<Score> = Node::new(name);
    let mut config = local_config(name);
    config.network.next_hop = next_hop;
    node.configure_with(config).unwrap();
    node
}

#[tokio::test]
async fn test_start_without_configuration_fails() {
    let node: Node<Score> = Node::new("idle");
    assert_eq!(node.state(), NodeState::Created);
    assert!(matches!(node.start().await, Err(NodeError::NotConfigured)));
    assert!(!node.is_running());
}

#[tokio::test]
async fn test_failed_configuration_blocks_start() {
    let dir = tempfile::tempdir().unwrap();
    let node: Node<Score> = Node::new("broken");
    let result = node.configure(dir.path().join("missing.toml"));
    assert!(matches!(
        result,
        Err(NodeError::Configuration(ConfigError::Read { .. }))
    ));
    assert_eq!(node.state(), NodeState::ConfigurationFailed);
    assert!(matches!(node.start().await, Err(NodeError::NotConfigured)));
}

#[tokio::test]
async fn test_start_and_stop_are_idempotent() {
    let node = configured_node("twice", None);
    node.stop().await;
    node.start().await.unwrap();
    let addr = node.local_addr().unwrap();
    node.start().await.unwrap();
    assert_eq!(node.local_addr(), Some(addr));
    assert_eq!(node.state(), NodeState::Running);

    node.stop().await;
    node.stop().await;
    assert_eq!(node.state(), NodeState::Stopped);
    assert!(node.local_addr().is_none());
    assert!(matches!(
        node.pass_to_handlers(Package::data_text("late")),
        Err(NodeError::NotRunning)
    ));
}

#[tokio::test]
async fn test_first_consuming_handler_short_circuits_chain() {
    let node = configured_node("chain", None);
    let (a, mut a_rx) = Recorder::new("a", false);
    let (b, mut b_rx) = Recorder::new("b", true);
    let (c, mut c_rx) = Recorder::new("c", false);
    node.add_handler(Arc::new(a));
    node.add_handler(Arc::new(b));
    node.add_handler(Arc::new(c));
    assert_eq!(node.handler_names(), ["a", "b", "c"]);
    node.start().await.unwrap();

    node.pass_to_handlers(Package::data_text("x")).unwrap();
    assert_eq!(next_seen(&mut a_rx).await, "data:x");
    assert_eq!(next_seen(&mut b_rx).await, "data:x");
    assert!(nothing_seen(&mut c_rx).await);
    node.stop().await;
}

#[tokio::test]
async fn test_pass_to_next_handlers_skips_the_caller() {
    let node = configured_node("resume", None);
    let (a, mut a_rx) = Recorder::new("a", true);
    let (b, mut b_rx) = Recorder::new("b", false);
    let a_id = node.add_handler(Arc::new(a));
    node.add_handler(Arc::new(b));
    node.start().await.unwrap();

    node.pass_to_next_handlers(a_id, Package::data_text("downstream"))
        .unwrap();
    assert_eq!(next_seen(&mut b_rx).await, "data:downstream");
    assert!(nothing_seen(&mut a_rx).await);
    node.stop().await;
}

#[tokio::test]
async fn test_surviving_packages_reach_the_next_node() {
    let sink = configured_node("sink", None);
    let (tail, mut tail_rx) = Recorder::new("tail", true);
    sink.add_handler(Arc::new(tail));
    sink.start().await.unwrap();
    let hop = format!("127.0.0.1:{}", sink.local_addr().unwrap().port());

    let source = configured_node("source", Some(hop));
    let (head, mut head_rx) = Recorder::new("head", false);
    source.add_handler(Arc::new(head));
    source.start().await.unwrap();

    let record = Score::new("S1", Some(7));
    source
        .pass_to_handlers(Package::data_item(record.clone()))
        .unwrap();
    assert_eq!(next_seen(&mut head_rx).await, format!("data:{}", record.to_wire_body()));

    let arrived = next_seen(&mut tail_rx).await;
    let parsed: Package<Score> = Package::parse(&arrived).unwrap();
    assert_eq!(Score::from_wire(parsed.text().unwrap()).unwrap(), record);

    source.send_data(Package::control(ControlCommand::Ping)).unwrap();
    assert_eq!(next_seen(&mut tail_rx).await, "control:ping");
    assert!(nothing_seen(&mut head_rx).await, "send_data bypasses the chain");

    source.stop().await;
    sink.stop().await;
}

#[tokio::test]
async fn test_send_data_without_next_hop() {
    let node = configured_node("end", None);
    node.start().await.unwrap();
    assert!(matches!(
        node.send_data(Package::control(ControlCommand::Ping)),
        Err(NodeError::NoNextHop)
    ));
    node.stop().await;
}

#[tokio::test]
async fn test_shutdown_is_forwarded_then_stops_node() {
    let sink = configured_node("sink", None);
    sink.start().await.unwrap();
    let hop = format!("127.0.0.1:{}", sink.local_addr().unwrap().port());

    let source = configured_node("source", Some(hop));
    source.start().await.unwrap();
    source
        .pass_to_handlers(Package::control(ControlCommand::Shutdown))
        .unwrap();

    wait_until(|| !source.is_running()).await;
    wait_until(|| !sink.is_running()).await;
    assert_eq!(source.state(), NodeState::Stopped);
    assert_eq!(sink.state(), NodeState::Stopped);
    source.stop().await;
}

#[tokio::test]
async fn test_ping_and_queue_depth_reach_the_observer() {
    let log = Arc::new(EventLog::new());
    let node: Node<Score> = Node::with_options(
        "observed",
        NodeOptions {
            observer: log.clone(),
            ..NodeOptions::default()
        },
    );
    node.configure_with(local_config("observed")).unwrap();
    node.start().await.unwrap();

    node.pass_to_handlers(Package::control(ControlCommand::Ping))
        .unwrap();
    wait_until(|| !log.messages(EventCategory::Message).is_empty()).await;
    assert_eq!(log.messages(EventCategory::Message), ["Ping received"]);

    node.handle().update_queue_depth("pending", 4);
    assert_eq!(log.depth("pending"), Some(4));

    node.stop().await;
    let lifecycle = log.messages(EventCategory::Lifecycle);
    assert!(lifecycle.iter().any(|m| m.starts_with("Node started")));
    assert_eq!(lifecycle.last().map(String::as_str), Some("Node stopped"));
}

/// Panics on the data body `boom`, passes everything else.
struct Fragile;

impl DataHandler<Score> for Fragile {
    fn name(&self) -> &str {
        "fragile"
    }

    fn consume(&self, package: &mut Package<Score>) -> bool {
        if package.text() == Some("boom") {
            panic!("cannot handle {:?}", package.text());
        }
        false
    }
}

#[tokio::test]
async fn test_panicking_handler_drops_package_and_node_keeps_running() {
    let log = Arc::new(EventLog::new());
    let node: Node<Score> = Node::with_options(
        "fragile",
        NodeOptions {
            observer: log.clone(),
            ..NodeOptions::default()
        },
    );
    node.configure_with(local_config("fragile")).unwrap();
    let (after, mut after_rx) = Recorder::new("after", true);
    node.add_handler(Arc::new(Fragile));
    node.add_handler(Arc::new(after));
    node.start().await.unwrap();

    node.pass_to_handlers(Package::data_text("boom")).unwrap();
    wait_until(|| !log.messages(EventCategory::Error).is_empty()).await;
    assert!(log.messages(EventCategory::Error)[0].contains("handler panicked"));
    assert!(nothing_seen(&mut after_rx).await, "the failing package goes no further");

    assert!(node.is_running());
    assert_eq!(node.state(), NodeState::Running);
    node.pass_to_handlers(Package::data_text("fine")).unwrap();
    assert_eq!(next_seen(&mut after_rx).await, "data:fine");

    node.stop().await;
}

#[tokio::test]
async fn test_handle_after_stop_skips_delivery() {
    let node = configured_node("late", None);
    let (a, mut a_rx) = Recorder::new("a", true);
    node.add_handler(Arc::new(a));
    node.start().await.unwrap();
    let handle = node.handle();
    node.stop().await;

    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = delivered.clone();
    let task_handle = handle.clone();
    handle.spawn(async move {
        if task_handle.pass_to_handlers(Package::data_text("x")).is_ok() {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });
    node.join_background().await;

    assert_eq!(delivered.load(Ordering::SeqCst), 0);
    assert!(nothing_seen(&mut a_rx).await);
}

#[tokio::test]
async fn test_handle_outlives_node() {
    let handle = {
        let node: Node<Score> = Node::new("gone");
        node.handle()
    };
    assert!(!handle.is_running());
    assert!(handle.config().is_none());
    assert!(matches!(
        handle.send_data(Package::data_text("x")),
        Err(NodeError::NotRunning)
    ));
}
