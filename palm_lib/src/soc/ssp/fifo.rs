/// Usable FIFO depth
pub const FIFO_DEPTH: u8 = 16;

/// One more slot than the depth so that a full FIFO can be told apart from an empty one
const FIFO_SLOTS: u8 = FIFO_DEPTH + 1;

/// SSP receive and transmit FIFOs
///
/// Both positions point at the slot that was last read or written, the next access
/// pre-increments them.
pub struct Fifo {
    buffer: [u16; FIFO_SLOTS as usize],
    read_position: u8,
    write_position: u8,
    /// Set when a push is dropped because the FIFO is full. Only meaningful for the receive
    /// FIFO, where it's reported as the overrun flag.
    overflowed: bool,
}

impl Fifo {
    pub fn new() -> Fifo {
        Fifo {
            buffer: [0; FIFO_SLOTS as usize],
            read_position: 0,
            write_position: 0,
            overflowed: false,
        }
    }

    pub fn len(&self) -> u8 {
        (self.write_position + FIFO_SLOTS - self.read_position) % FIFO_SLOTS
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == FIFO_DEPTH
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    pub fn clear_overflow(&mut self) {
        self.overflowed = false;
    }

    /// Push `val`. If the FIFO is full the value is dropped, the overflow flag latched and false
    /// returned.
    pub fn push(&mut self, val: u16) -> bool {
        if self.is_full() {
            self.overflowed = true;
            return false;
        }

        self.write_position = (self.write_position + 1) % FIFO_SLOTS;
        self.buffer[self.write_position as usize] = val;

        // The write index never catches up with the read index
        debug_assert!(self.len() > 0 && self.len() <= FIFO_DEPTH);

        true
    }

    /// Pop the oldest entry. Popping an empty FIFO doesn't move anything and returns the last
    /// value that was popped, like reading an idle shift register would.
    pub fn pop(&mut self) -> u16 {
        if !self.is_empty() {
            self.read_position = (self.read_position + 1) % FIFO_SLOTS;
        }

        self.buffer[self.read_position as usize]
    }

    /// Discard the contents
    pub fn flush(&mut self) {
        self.read_position = self.write_position;
    }
}

impl Default for Fifo {
    fn default() -> Fifo {
        Fifo::new()
    }
}

#[test]
fn test_fifo_order() {
    let mut fifo = Fifo::new();

    assert!(fifo.is_empty());
    assert!(!fifo.is_full());

    for n in 1..=FIFO_DEPTH {
        for i in 0..n {
            assert!(fifo.push(u16::from(i) * 3 + 1));
        }

        assert_eq!(fifo.len(), n);

        for i in 0..n {
            assert_eq!(fifo.pop(), u16::from(i) * 3 + 1);
        }

        assert!(fifo.is_empty());
    }

    assert!(!fifo.overflowed());
}

#[test]
fn test_fifo_overflow() {
    let mut fifo = Fifo::new();

    for i in 0..FIFO_DEPTH {
        assert!(fifo.push(u16::from(i)));
    }

    assert!(fifo.is_full());
    assert!(!fifo.overflowed());

    // 17th word is dropped
    assert!(!fifo.push(0xbeef));
    assert!(fifo.overflowed());
    assert_eq!(fifo.len(), FIFO_DEPTH);

    for i in 0..FIFO_DEPTH {
        assert_eq!(fifo.pop(), u16::from(i));
    }

    fifo.clear_overflow();
    assert!(!fifo.overflowed());
}

#[test]
fn test_fifo_empty_pop_is_stale() {
    let mut fifo = Fifo::new();

    assert_eq!(fifo.pop(), 0);

    fifo.push(0x1234);
    assert_eq!(fifo.pop(), 0x1234);
    assert_eq!(fifo.pop(), 0x1234);
    assert_eq!(fifo.len(), 0);
}

#[test]
fn test_fifo_flush_and_wrap() {
    let mut fifo = Fifo::new();

    // Run the positions around the ring a few times
    for round in 0..40u16 {
        fifo.push(round);
        fifo.push(round + 1000);
        assert_eq!(fifo.pop(), round);
        assert_eq!(fifo.pop(), round + 1000);
        assert!(fifo.is_empty());
    }

    for i in 0..10 {
        fifo.push(i);
    }

    fifo.flush();
    assert!(fifo.is_empty());
    assert_eq!(fifo.len(), 0);

    fifo.push(0xaaaa);
    assert_eq!(fifo.pop(), 0xaaaa);
}
