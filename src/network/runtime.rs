//! Threaded runtime driving one program per network node.
//!
//! Each node runs on its own blocking thread, booted with its id as first
//! input and connected to the shared [`Mailbox`]. A watchdog on the async
//! side ticks at a fixed interval and asks the mailbox to replay the rescue
//! packet whenever the network is idle. The run ends when the watchdog sees
//! the same rescue `y` twice in a row, or when a node fails.
//!
//! Node threads are not joined. They observe the stop flag between fuel
//! slices and exit on their own.

use crate::network::interface::NetworkInterface;
use crate::network::mailbox::{Mailbox, WatchdogEvent};
use crate::network::message::BROADCAST_ADDRESS;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::program::Program;
use crate::virtual_machine::vm::{Exit, Fuel, VM};
use crate::virtual_machine::word::Word;
use crate::{debug, error, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::{Receiver, Sender, channel};
use tokio::time::interval;

/// Errors that end a network run without a result.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// A node's program failed.
    #[error("node {id} failed: {source}")]
    Node {
        id: usize,
        #[source]
        source: VMError,
    },

    /// The network was configured without nodes.
    #[error("network has no nodes")]
    NoNodes,

    /// Every node halted before the rescue value repeated.
    #[error("every node halted before the network settled")]
    AllNodesHalted,
}

/// Configuration options for the network runtime.
#[derive(Clone, Debug)]
pub struct NetworkOptions {
    /// Number of nodes, with ids `0..nodes`.
    pub nodes: usize,
    /// How often the watchdog checks for idleness.
    pub idle_interval: Duration,
    /// Instructions a node executes between checks of the stop flag.
    pub fuel_per_slice: u64,
    /// Destination whose packets fill the rescue slot.
    pub broadcast_address: i64,
}

impl Default for NetworkOptions {
    fn default() -> Self {
        Self {
            nodes: 50,
            idle_interval: Duration::from_millis(100),
            fuel_per_slice: 10_000,
            broadcast_address: BROADCAST_ADDRESS,
        }
    }
}

/// Result of a network run that settled.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NetworkReport {
    /// `y` of the first broadcast packet.
    pub first_broadcast_y: Option<Word>,
    /// Rescue `y` delivered twice in a row.
    pub repeated_rescue_y: Word,
}

/// Message from a node thread to the watchdog.
#[derive(Debug)]
enum NodeEvent {
    Halted(usize),
    Failed(NetworkError),
}

pub struct NetworkRuntime {
    options: NetworkOptions,
    mailbox: Arc<Mailbox>,
    stop: Arc<AtomicBool>,
}

impl NetworkRuntime {
    pub fn new(options: NetworkOptions) -> Self {
        let mailbox = Arc::new(Mailbox::new(options.nodes, options.broadcast_address));
        Self {
            options,
            mailbox,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn mailbox(&self) -> &Arc<Mailbox> {
        &self.mailbox
    }

    /// Asks every node thread to exit after its current slice.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Boots one copy of `code` per node and watches the network until the
    /// rescue value repeats.
    pub async fn run(&self, code: &[Word]) -> Result<NetworkReport, NetworkError> {
        if self.options.nodes == 0 {
            return Err(NetworkError::NoNodes);
        }

        let (tx, mut rx) = channel::<NodeEvent>(self.options.nodes);
        self.boot(code, &tx);
        drop(tx);

        let result = self.watch(&mut rx).await;
        self.stop();
        result
    }

    fn boot(&self, code: &[Word], events: &Sender<NodeEvent>) {
        info!(
            "booting {} nodes, idle check every {:?}",
            self.options.nodes, self.options.idle_interval
        );

        for id in 0..self.options.nodes {
            let nic = NetworkInterface::new(id, self.mailbox.clone());
            let program = Program::from_code(code.to_vec())
                .with_inputs([id as i64])
                .with_output(nic.clone())
                .with_input_source(nic);

            let stop = self.stop.clone();
            let events = events.clone();
            let fuel = self.options.fuel_per_slice;

            // Nodes busy-poll the mailbox, so each one needs a thread of its own
            tokio::task::spawn_blocking(move || {
                let event = run_node(id, program, fuel, &stop);
                if let Some(event) = event {
                    let _ = events.blocking_send(event);
                }
            });
        }
    }

    async fn watch(
        &self,
        events: &mut Receiver<NodeEvent>,
    ) -> Result<NetworkReport, NetworkError> {
        let mut ticker = interval(self.options.idle_interval);
        let mut halted = 0;

        loop {
            tokio::select! {
                Some(event) = events.recv() => match event {
                    NodeEvent::Failed(e) => {
                        error!("{e}");
                        return Err(e);
                    }
                    NodeEvent::Halted(id) => {
                        halted += 1;
                        warn!("node {id} halted");
                        if halted == self.options.nodes {
                            return Err(NetworkError::AllNodesHalted);
                        }
                    }
                },
                _ = ticker.tick() => match self.mailbox.restart_if_idle() {
                    WatchdogEvent::Repeated(y) => {
                        info!("rescue y={y} delivered twice in a row, stopping network");
                        return Ok(NetworkReport {
                            first_broadcast_y: self.mailbox.first_broadcast_y(),
                            repeated_rescue_y: y,
                        });
                    }
                    WatchdogEvent::Delivered(y) => {
                        info!("network idle, rescue y={y} sent to node 0")
                    }
                    WatchdogEvent::IdleNoRescue => debug!("network idle, nothing to rescue"),
                    WatchdogEvent::Busy => {}
                },
            }
        }
    }
}

/// Runs a node in fuel slices until it halts, fails, or the runtime stops.
fn run_node(id: usize, program: Program, fuel: u64, stop: &AtomicBool) -> Option<NodeEvent> {
    let mut vm = VM::new(program);
    while !stop.load(Ordering::SeqCst) {
        match vm.run_for(Fuel::Limited(fuel)) {
            Ok(Exit::OutOfFuel) => {}
            Ok(Exit::Halted) => return Some(NodeEvent::Halted(id)),
            // The mailbox always answers, so a suspension means the program
            // was left without an input source
            Ok(Exit::Suspended) => std::thread::yield_now(),
            Err(source) => return Some(NodeEvent::Failed(NetworkError::Node { id, source })),
        }
    }
    None
}
