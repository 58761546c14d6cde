//! Memory and I/O request hooks.

/// The CPU's view of the machine.
///
/// One method per bus cycle kind. The `mreq_*` hooks address the 64K
/// memory space, the `iorq_*` hooks the 64K port space. `iorq_m1` is the
/// interrupt-acknowledge cycle: the returned byte is whatever the
/// interrupting device places on the data bus.
pub trait Bus {
    /// Opcode fetch (M1 cycle).
    fn mreq_m1(&mut self, addr: u16) -> u8;

    /// Memory read.
    fn mreq_rd(&mut self, addr: u16) -> u8;

    /// Memory write.
    fn mreq_wr(&mut self, addr: u16, data: u8);

    /// Interrupt acknowledge.
    fn iorq_m1(&mut self) -> u8;

    /// Port read.
    fn iorq_rd(&mut self, port: u16) -> u8;

    /// Port write.
    fn iorq_wr(&mut self, port: u16, data: u8);
}

/// Flat 64K RAM with a 64K port space, for CPU tests.
///
/// Port reads return the last value written to that port (or `0xFF`).
/// Every port access is logged so tests can assert on I/O traffic.
pub struct SimpleBus {
    pub memory: Box<[u8; 0x10000]>,
    pub ports: Box<[u8; 0x10000]>,
    /// Byte placed on the data bus during interrupt acknowledge.
    pub int_vector: u8,
    /// `(port, value, is_write)` in access order.
    pub io_log: Vec<(u16, u8, bool)>,
}

impl SimpleBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            memory: Box::new([0; 0x10000]),
            ports: Box::new([0xFF; 0x10000]),
            int_vector: 0xFF,
            io_log: Vec::new(),
        }
    }

    /// Copy `bytes` into memory starting at `addr`, wrapping at 64K.
    pub fn load(&mut self, addr: u16, bytes: &[u8]) {
        for (i, &byte) in bytes.iter().enumerate() {
            self.memory[usize::from(addr.wrapping_add(i as u16))] = byte;
        }
    }

    #[must_use]
    pub fn peek(&self, addr: u16) -> u8 {
        self.memory[usize::from(addr)]
    }
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for SimpleBus {
    fn mreq_m1(&mut self, addr: u16) -> u8 {
        self.memory[usize::from(addr)]
    }

    fn mreq_rd(&mut self, addr: u16) -> u8 {
        self.memory[usize::from(addr)]
    }

    fn mreq_wr(&mut self, addr: u16, data: u8) {
        self.memory[usize::from(addr)] = data;
    }

    fn iorq_m1(&mut self) -> u8 {
        self.int_vector
    }

    fn iorq_rd(&mut self, port: u16) -> u8 {
        let value = self.ports[usize::from(port)];
        self.io_log.push((port, value, false));
        value
    }

    fn iorq_wr(&mut self, port: u16, data: u8) {
        self.ports[usize::from(port)] = data;
        self.io_log.push((port, data, true));
    }
}
