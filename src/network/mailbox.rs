//! Shared switchboard of the networked runtime.
//!
//! Every piece of shared network state lives behind one mutex: the per-node
//! packet queues, the partially emitted packets, the record of what each node
//! last received and the rescue slot. Each operation holds the lock for its
//! whole read-modify-write, so the idle check never observes a delivery in
//! flight.

use crate::network::message::{NO_PACKET, PACKET_LEN, Packet};
use crate::virtual_machine::word::Word;
use crate::{debug, info, warn};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// What a node got the last time it polled its queue.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Delivery {
    /// The node never polled.
    Never,
    /// The node received a packet payload.
    Payload([Word; 2]),
    /// The node found its queue empty and received [`NO_PACKET`].
    Empty,
}

/// Outcome of one watchdog check.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WatchdogEvent {
    /// Packets are queued, half emitted, or some node received one since it
    /// last polled.
    Busy,
    /// Idle, but no rescue packet was ever broadcast.
    IdleNoRescue,
    /// Idle; the rescue packet was delivered to node 0.
    Delivered(Word),
    /// Idle, and the rescue `y` equals the previously delivered one. Terminal.
    Repeated(Word),
}

#[derive(Debug)]
struct Switchboard {
    queues: Vec<VecDeque<Packet>>,
    partial: Vec<Vec<Word>>,
    last: Vec<Delivery>,
    rescue: Option<Packet>,
    first_broadcast_y: Option<Word>,
    last_rescue_y: Option<Word>,
}

impl Switchboard {
    fn is_idle(&self) -> bool {
        self.queues.iter().all(VecDeque::is_empty)
            && self.partial.iter().all(Vec::is_empty)
            && self.last.iter().all(|d| matches!(d, Delivery::Empty))
    }
}

/// Mutex-guarded mailboxes for nodes `0..nodes`.
#[derive(Debug)]
pub struct Mailbox {
    state: Mutex<Switchboard>,
    broadcast_address: i64,
}

impl Mailbox {
    pub fn new(nodes: usize, broadcast_address: i64) -> Self {
        Self {
            state: Mutex::new(Switchboard {
                queues: vec![VecDeque::new(); nodes],
                partial: vec![Vec::with_capacity(PACKET_LEN); nodes],
                last: vec![Delivery::Never; nodes],
                rescue: None,
                first_broadcast_y: None,
                last_rescue_y: None,
            }),
            broadcast_address,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Switchboard> {
        // If a node thread panicked while holding the lock, keep the state.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn nodes(&self) -> usize {
        self.lock().queues.len()
    }

    /// Records one value emitted by node `source`. The third value of a
    /// packet completes it and posts it.
    pub fn emit(&self, source: usize, value: Word) {
        let mut board = self.lock();
        let Some(partial) = board.partial.get_mut(source) else {
            warn!("value {value} emitted by unknown node {source}");
            return;
        };
        partial.push(value);
        if partial.len() < PACKET_LEN {
            return;
        }

        let Ok(values) = <[Word; PACKET_LEN]>::try_from(partial.split_off(0)) else {
            return;
        };
        self.route(&mut board, Packet::from_values(values));
    }

    /// Posts a complete packet.
    pub fn post(&self, packet: Packet) {
        let mut board = self.lock();
        self.route(&mut board, packet);
    }

    fn route(&self, board: &mut Switchboard, packet: Packet) {
        if packet.destination == self.broadcast_address {
            if board.first_broadcast_y.is_none() {
                info!("first broadcast: y={}", packet.y);
                board.first_broadcast_y = Some(packet.y.clone());
            }
            debug!("rescue slot updated: x={} y={}", packet.x, packet.y);
            board.rescue = Some(packet);
            return;
        }

        match packet.destination.to_usize() {
            Some(dest) if dest < board.queues.len() => board.queues[dest].push_back(packet),
            _ => warn!("dropping packet to unknown node: {packet}"),
        }
    }

    /// Pops the next payload for node `id`, or returns [`NO_PACKET`] when its
    /// queue is empty. Never blocks.
    pub fn retrieve(&self, id: usize) -> Vec<Word> {
        let mut board = self.lock();
        let Some(queue) = board.queues.get_mut(id) else {
            return vec![Word::from(NO_PACKET)];
        };
        let (delivery, values) = match queue.pop_front() {
            Some(packet) => {
                let payload = packet.payload();
                (Delivery::Payload(payload.clone()), payload.to_vec())
            }
            None => (Delivery::Empty, vec![Word::from(NO_PACKET)]),
        };
        board.last[id] = delivery;
        values
    }

    /// Whether nothing moved through the network since every node last polled.
    pub fn is_idle(&self) -> bool {
        self.lock().is_idle()
    }

    /// Watchdog step: if the network is idle and a rescue packet exists,
    /// delivers it to node 0, unless its `y` repeats the previous delivery.
    ///
    /// The rescue slot keeps its packet after delivery, so a network that goes
    /// idle again without a new broadcast replays the same `y` and terminates.
    pub fn restart_if_idle(&self) -> WatchdogEvent {
        let mut board = self.lock();
        if !board.is_idle() {
            return WatchdogEvent::Busy;
        }
        let Some(Packet { x, y, .. }) = board.rescue.clone() else {
            return WatchdogEvent::IdleNoRescue;
        };
        if board.last_rescue_y.as_ref() == Some(&y) {
            return WatchdogEvent::Repeated(y);
        }

        match board.queues.first_mut() {
            Some(queue) => queue.push_back(Packet::new(0, x, y.clone())),
            None => return WatchdogEvent::IdleNoRescue,
        }
        board.last_rescue_y = Some(y.clone());
        WatchdogEvent::Delivered(y)
    }

    /// `y` of the first packet ever broadcast.
    pub fn first_broadcast_y(&self) -> Option<Word> {
        self.lock().first_broadcast_y.clone()
    }

    pub fn rescue(&self) -> Option<Packet> {
        self.lock().rescue.clone()
    }

    /// Number of packets queued for node `id`.
    pub fn pending(&self, id: usize) -> usize {
        self.lock().queues.get(id).map_or(0, VecDeque::len)
    }

    pub fn last_delivery(&self, id: usize) -> Option<Delivery> {
        self.lock().last.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::message::BROADCAST_ADDRESS;

    fn emit_all(mailbox: &Mailbox, source: usize, values: &[i64]) {
        for value in values {
            mailbox.emit(source, Word::from(*value));
        }
    }

    fn poll_all(mailbox: &Mailbox) {
        for id in 0..mailbox.nodes() {
            mailbox.retrieve(id);
        }
    }

    #[test]
    fn packets_are_assembled_from_three_values() {
        let mailbox = Mailbox::new(3, BROADCAST_ADDRESS);
        emit_all(&mailbox, 0, &[2, 10]);
        assert_eq!(mailbox.pending(2), 0);
        emit_all(&mailbox, 0, &[20]);
        assert_eq!(mailbox.pending(2), 1);
        assert_eq!(mailbox.retrieve(2), [10, 20]);
        assert_eq!(
            mailbox.last_delivery(2),
            Some(Delivery::Payload([Word::from(10), Word::from(20)]))
        );
    }

    #[test]
    fn partial_packets_per_source() {
        let mailbox = Mailbox::new(2, BROADCAST_ADDRESS);
        emit_all(&mailbox, 0, &[1]);
        emit_all(&mailbox, 1, &[0]);
        emit_all(&mailbox, 0, &[5]);
        emit_all(&mailbox, 1, &[7]);
        emit_all(&mailbox, 0, &[6]);
        emit_all(&mailbox, 1, &[8]);
        assert_eq!(mailbox.retrieve(1), [5, 6]);
        assert_eq!(mailbox.retrieve(0), [7, 8]);
    }

    #[test]
    fn queues_are_fifo() {
        let mailbox = Mailbox::new(1, BROADCAST_ADDRESS);
        mailbox.post(Packet::new(0, 1, 2));
        mailbox.post(Packet::new(0, 3, 4));
        assert_eq!(mailbox.retrieve(0), [1, 2]);
        assert_eq!(mailbox.retrieve(0), [3, 4]);
        assert_eq!(mailbox.retrieve(0), [NO_PACKET]);
        assert_eq!(mailbox.last_delivery(0), Some(Delivery::Empty));
    }

    #[test]
    fn unknown_destination_is_dropped() {
        let mailbox = Mailbox::new(2, BROADCAST_ADDRESS);
        mailbox.post(Packet::new(7, 1, 2));
        mailbox.post(Packet::new(-3, 1, 2));
        assert_eq!(mailbox.pending(0), 0);
        assert_eq!(mailbox.pending(1), 0);
        poll_all(&mailbox);
        assert!(mailbox.is_idle());
    }

    #[test]
    fn broadcast_fills_rescue_slot() {
        let mailbox = Mailbox::new(2, BROADCAST_ADDRESS);
        mailbox.post(Packet::new(BROADCAST_ADDRESS, 1, 7));
        mailbox.post(Packet::new(BROADCAST_ADDRESS, 2, 9));
        assert_eq!(mailbox.first_broadcast_y(), Some(Word::from(7)));
        assert_eq!(mailbox.rescue(), Some(Packet::new(BROADCAST_ADDRESS, 2, 9)));
        assert_eq!(mailbox.pending(0), 0);
    }

    #[test]
    fn not_idle_until_every_node_polled() {
        let mailbox = Mailbox::new(2, BROADCAST_ADDRESS);
        assert!(!mailbox.is_idle());
        mailbox.retrieve(0);
        assert!(!mailbox.is_idle());
        mailbox.retrieve(1);
        assert!(mailbox.is_idle());
    }

    #[test]
    fn half_emitted_packet_is_traffic() {
        let mailbox = Mailbox::new(2, BROADCAST_ADDRESS);
        poll_all(&mailbox);
        emit_all(&mailbox, 1, &[0]);
        assert!(!mailbox.is_idle());
        assert_eq!(mailbox.restart_if_idle(), WatchdogEvent::Busy);
    }

    #[test]
    fn idle_without_rescue() {
        let mailbox = Mailbox::new(2, BROADCAST_ADDRESS);
        poll_all(&mailbox);
        assert_eq!(mailbox.restart_if_idle(), WatchdogEvent::IdleNoRescue);
    }

    #[test]
    fn repeated_rescue_terminates() {
        let mailbox = Mailbox::new(3, BROADCAST_ADDRESS);
        poll_all(&mailbox);
        emit_all(&mailbox, 2, &[BROADCAST_ADDRESS, 3, 7]);

        assert_eq!(
            mailbox.restart_if_idle(),
            WatchdogEvent::Delivered(Word::from(7))
        );
        assert_eq!(mailbox.restart_if_idle(), WatchdogEvent::Busy);
        assert_eq!(mailbox.retrieve(0), [3, 7]);
        assert_eq!(mailbox.restart_if_idle(), WatchdogEvent::Busy);
        assert_eq!(mailbox.retrieve(0), [NO_PACKET]);

        assert_eq!(
            mailbox.restart_if_idle(),
            WatchdogEvent::Repeated(Word::from(7))
        );
        assert_eq!(mailbox.pending(0), 0);
    }

    #[test]
    fn new_rescue_value_is_delivered() {
        let mailbox = Mailbox::new(1, BROADCAST_ADDRESS);
        poll_all(&mailbox);
        mailbox.post(Packet::new(BROADCAST_ADDRESS, 0, 7));
        assert_eq!(
            mailbox.restart_if_idle(),
            WatchdogEvent::Delivered(Word::from(7))
        );
        mailbox.retrieve(0);
        mailbox.post(Packet::new(BROADCAST_ADDRESS, 0, 8));
        mailbox.retrieve(0);
        assert_eq!(
            mailbox.restart_if_idle(),
            WatchdogEvent::Delivered(Word::from(8))
        );
    }

    #[test]
    fn large_rescue_value_repeats() {
        let y: Word = "1000000000000000000000".parse().unwrap();
        let mailbox = Mailbox::new(1, BROADCAST_ADDRESS);
        poll_all(&mailbox);
        mailbox.post(Packet::new(BROADCAST_ADDRESS, 0, y.clone()));
        assert_eq!(mailbox.restart_if_idle(), WatchdogEvent::Delivered(y.clone()));
        assert_eq!(mailbox.retrieve(0), [Word::ZERO, y.clone()]);
        mailbox.retrieve(0);
        assert_eq!(mailbox.restart_if_idle(), WatchdogEvent::Repeated(y));
    }
}
