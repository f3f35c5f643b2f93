use crate::network::mailbox::Mailbox;
use crate::virtual_machine::io::{InputSource, OutputSink};
use crate::virtual_machine::word::Word;
use std::sync::Arc;

/// A node's connection to the shared [`Mailbox`].
///
/// Attached to a program as both its output sink and its input source:
/// emitted values are assembled into packets, and polls never suspend the
/// program because an empty mailbox answers with the no-packet sentinel.
#[derive(Clone, Debug)]
pub struct NetworkInterface {
    id: usize,
    mailbox: Arc<Mailbox>,
}

impl NetworkInterface {
    pub fn new(id: usize, mailbox: Arc<Mailbox>) -> Self {
        Self { id, mailbox }
    }

    pub fn id(&self) -> usize {
        self.id
    }
}

impl OutputSink for NetworkInterface {
    fn process(&mut self, value: Word) {
        self.mailbox.emit(self.id, value);
    }
}

impl InputSource for NetworkInterface {
    fn send(&mut self) -> Vec<Word> {
        self.mailbox.retrieve(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::mailbox::Delivery;
    use crate::network::message::{BROADCAST_ADDRESS, NO_PACKET, Packet};
    use crate::virtual_machine::program::Program;
    use crate::virtual_machine::vm::{ExecState, Exit, Fuel, VM};

    #[test]
    fn program_sends_packet_to_peer() {
        let mailbox = Arc::new(Mailbox::new(2, BROADCAST_ADDRESS));
        let nic = NetworkInterface::new(0, mailbox.clone());
        let program = Program::new(&[104, 1, 104, 10, 104, 20, 99])
            .with_output(nic.clone())
            .with_input_source(nic);
        assert_eq!(VM::new(program).run().unwrap(), Exit::Halted);
        assert_eq!(mailbox.retrieve(1), [10, 20]);
    }

    #[test]
    fn empty_mailbox_never_suspends() {
        let mailbox = Arc::new(Mailbox::new(1, BROADCAST_ADDRESS));
        let nic = NetworkInterface::new(0, mailbox.clone());
        // Reads forever into cell 5, past the code.
        let program = Program::new(&[3, 5, 1105, 1, 0, 0])
            .with_output(nic.clone())
            .with_input_source(nic);
        let mut vm = VM::new(program);
        assert_eq!(vm.run_for(Fuel::Limited(100)).unwrap(), Exit::OutOfFuel);
        assert_eq!(vm.state(), ExecState::Runnable);
        assert_eq!(vm.memory().read(5), NO_PACKET);
        assert_eq!(vm.memory().to_vec(5), [3, 5, 1105, 1, 0]);
        assert_eq!(mailbox.last_delivery(0), Some(Delivery::Empty));
    }

    #[test]
    fn queued_packet_is_read_before_sentinel() {
        let mailbox = Arc::new(Mailbox::new(1, BROADCAST_ADDRESS));
        mailbox.post(Packet::new(0, 4, 9));
        let nic = NetworkInterface::new(0, mailbox.clone());
        // Reads three values into cells 20..23 and halts.
        let program = Program::new(&[3, 20, 3, 21, 3, 22, 99])
            .with_output(nic.clone())
            .with_input_source(nic);
        let mut vm = VM::new(program);
        assert_eq!(vm.run().unwrap(), Exit::Halted);
        assert_eq!(vm.memory().read(20), 4);
        assert_eq!(vm.memory().read(21), 9);
        assert_eq!(vm.memory().read(22), NO_PACKET);
    }
}
