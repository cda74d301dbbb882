//! Line console standing in for the node's operator UI.
//!
//! Reads one command per line. Node events are printed to stdout as they
//! happen; logging goes to stderr.

use anyhow::bail;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use pfn_node::{Node, NodeEvent, NodeObserver};
use pfn_protocol::{ControlCommand, Package};
use pfn_student::StudentDataItem;

const HELP: &str = "\
commands:
  start                     bind the transport and start processing
  stop                      stop processing
  ping                      send a ping straight to the next node
  readfile                  read the data file here and down the pipeline
  shutdown                  shut down this node and the ones after it
  add <id>;<name>;<program> inject a student record into the chain
  status                    show node state
  quit                      stop the node and exit";

/// Prints node events for the operator.
pub struct ConsoleObserver;

impl NodeObserver for ConsoleObserver {
    fn node_event(&self, event: &NodeEvent) {
        println!("{event}");
    }

    fn queue_depth(&self, label: &str, count: usize) {
        println!("  {label}: {count}");
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Start,
    Stop,
    Ping,
    ReadFile,
    Shutdown,
    Add(StudentDataItem),
    Status,
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Parse one input line. Blank lines give `None`.
    pub fn parse(line: &str) -> anyhow::Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let command = match word.to_ascii_lowercase().as_str() {
            "start" => ConsoleCommand::Start,
            "stop" => ConsoleCommand::Stop,
            "ping" => ConsoleCommand::Ping,
            "readfile" => ConsoleCommand::ReadFile,
            "shutdown" => ConsoleCommand::Shutdown,
            "status" => ConsoleCommand::Status,
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" => ConsoleCommand::Quit,
            "add" => ConsoleCommand::Add(parse_student(rest)?),
            other => bail!("unknown command {other:?}, try help"),
        };
        Ok(Some(command))
    }
}

fn parse_student(args: &str) -> anyhow::Result<StudentDataItem> {
    let mut fields = args.split(';').map(str::trim);
    let id = match fields.next() {
        Some(id) if !id.is_empty() => id,
        _ => bail!("usage: add <id>;<name>;<program>"),
    };
    let mut student = StudentDataItem::new(id);
    if let Some(name) = fields.next().filter(|s| !s.is_empty()) {
        student = student.with_name(name);
    }
    if let Some(program) = fields.next().filter(|s| !s.is_empty()) {
        student = student.with_study_program(program);
    }
    Ok(student)
}

pub struct Console<'a> {
    node: &'a Node<StudentDataItem>,
}

impl<'a> Console<'a> {
    pub fn new(node: &'a Node<StudentDataItem>) -> Self {
        Self { node }
    }

    /// Run commands from `input` until `quit` or end of input.
    pub async fn run<R>(&self, input: R) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        println!("{} ready, type help for commands", self.node.name());
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            match ConsoleCommand::parse(&line) {
                Ok(Some(ConsoleCommand::Quit)) => break,
                Ok(Some(command)) => self.execute(command).await,
                Ok(None) => {}
                Err(e) => println!("{e}"),
            }
        }
        Ok(())
    }

    pub async fn execute(&self, command: ConsoleCommand) {
        let node = self.node;
        let result = match command {
            ConsoleCommand::Start => node.start().await,
            ConsoleCommand::Stop => {
                node.stop().await;
                Ok(())
            }
            ConsoleCommand::Ping => node.send_data(Package::control(ControlCommand::Ping)),
            ConsoleCommand::ReadFile => {
                node.pass_to_handlers(Package::control(ControlCommand::ReadFile))
            }
            ConsoleCommand::Shutdown => {
                node.pass_to_handlers(Package::control(ControlCommand::Shutdown))
            }
            ConsoleCommand::Add(student) => node.pass_to_handlers(Package::data_item(student)),
            ConsoleCommand::Status => {
                println!("state: {:?}", node.state());
                if let Some(addr) = node.local_addr() {
                    println!("listening on {addr}");
                }
                if let Some(config) = node.config() {
                    println!(
                        "next hop: {}",
                        config.network.next_hop.as_deref().unwrap_or("none")
                    );
                }
                Ok(())
            }
            ConsoleCommand::Help => {
                println!("{HELP}");
                Ok(())
            }
            ConsoleCommand::Quit => Ok(()),
        };
        if let Err(e) = result {
            println!("error: {e}");
        }
    }
}
