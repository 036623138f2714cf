use crate::settings::SspDeviceKind;

/// Trait used to abstract away the device wired to the other end of the serial line (on a real
/// handheld, the touchscreen/audio codec).
pub trait WiredDevice {
    /// Human-readable description of the device
    fn description(&self) -> String;

    /// Called when the port is enabled, a fresh frame is about to start
    fn select(&mut self) {}

    /// Exchange one bit. `out` is the bit driven by the SSP, the return value is the bit the
    /// device drove at the same clock edge.
    fn exchange_bit(&mut self, out: bool) -> bool;
}

/// Nothing connected, the data line floats high
pub struct DisconnectedDevice;

impl WiredDevice for DisconnectedDevice {
    fn description(&self) -> String {
        "Disconnected".to_string()
    }

    fn exchange_bit(&mut self, _: bool) -> bool {
        true
    }
}

/// Data out wired straight to data in
pub struct LoopbackDevice;

impl WiredDevice for LoopbackDevice {
    fn description(&self) -> String {
        "Loopback".to_string()
    }

    fn exchange_bit(&mut self, out: bool) -> bool {
        out
    }
}

pub fn from_kind(kind: SspDeviceKind) -> Box<dyn WiredDevice> {
    match kind {
        SspDeviceKind::Disconnected => Box::new(DisconnectedDevice),
        SspDeviceKind::Loopback => Box::new(LoopbackDevice),
    }
}
