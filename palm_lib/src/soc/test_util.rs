//! Test doubles for the collaborators of the SoC

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use super::irq::{Interrupt, InterruptController};
use super::ssp::WiredDevice;
use super::Soc;
use crate::settings::Settings;

/// Interrupt controller remembering every line change
#[derive(Clone, Default)]
pub struct RecordingController {
    pub lines: Rc<RefCell<Vec<(Interrupt, bool)>>>,
}

impl RecordingController {
    pub fn take(&self) -> Vec<(Interrupt, bool)> {
        self.lines.borrow_mut().drain(..).collect()
    }
}

impl InterruptController for RecordingController {
    fn raise_interrupt_line(&mut self, source: Interrupt, asserted: bool) {
        self.lines.borrow_mut().push((source, asserted));
    }
}

#[derive(Default)]
pub struct WireLog {
    /// Bits clocked out by the SSP
    pub sent: Vec<bool>,
    /// Bits to send back, the device replies 0 once it runs out
    pub replies: VecDeque<bool>,
    pub selects: u32,
}

/// Wired device replaying a bit script and recording what it receives
#[derive(Clone, Default)]
pub struct ScriptedDevice {
    pub log: Rc<RefCell<WireLog>>,
}

impl ScriptedDevice {
    /// Queue `word` as a reply, `bits` long, MSB first
    pub fn reply(&self, word: u16, bits: u8) {
        let mut log = self.log.borrow_mut();

        for i in (0..bits).rev() {
            log.replies.push_back((word >> i) & 1 != 0);
        }
    }

    /// Bits sent so far, assembled MSB first into words of `bits` bits
    pub fn sent_words(&self, bits: usize) -> Vec<u16> {
        self.log
            .borrow()
            .sent
            .chunks(bits)
            .map(|c| c.iter().fold(0, |w, &b| (w << 1) | u16::from(b)))
            .collect()
    }

    pub fn selects(&self) -> u32 {
        self.log.borrow().selects
    }
}

impl WiredDevice for ScriptedDevice {
    fn description(&self) -> String {
        "Scripted test device".to_string()
    }

    fn select(&mut self) {
        self.log.borrow_mut().selects += 1;
    }

    fn exchange_bit(&mut self, out: bool) -> bool {
        let mut log = self.log.borrow_mut();

        log.sent.push(out);
        log.replies.pop_front().unwrap_or(false)
    }
}

/// Fresh SoC with a recording interrupt controller and a scripted SSP device
pub fn soc_with_doubles() -> (Soc, RecordingController, ScriptedDevice) {
    let mut soc = Soc::new(Settings::default()).unwrap();

    let controller = RecordingController::default();
    let device = ScriptedDevice::default();

    soc.connect_interrupt_controller(Box::new(controller.clone()));
    soc.connect_ssp_device(Box::new(device.clone()));

    (soc, controller, device)
}
