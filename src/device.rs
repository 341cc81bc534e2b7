use std::time::{Duration, Instant};

use crate::error::{Fault, Result};
use crate::notify::Notifier;

/// An input slot on the control unit.
///
/// A switch is toggled by the operator; a blinker flips its own value on a
/// fixed period and is not user-modifiable. The blinker holds only its timing
/// origin and is evaluated against the clock on every read, so it needs no
/// thread of its own.
pub enum InputDevice {
    Switch {
        label: String,
        value: bool,
    },
    Blinker {
        label: String,
        origin: Instant,
        period: Duration,
    },
}

impl InputDevice {
    pub fn switch(label: impl Into<String>) -> Self {
        InputDevice::Switch { label: label.into(), value: false }
    }

    pub fn blinker(label: impl Into<String>, period: Duration) -> Self {
        InputDevice::Blinker {
            label: label.into(),
            origin: Instant::now(),
            // A zero period would divide by zero on read
            period: period.max(Duration::from_millis(1)),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            InputDevice::Switch { label, .. } | InputDevice::Blinker { label, .. } => label,
        }
    }

    pub fn value(&self) -> bool {
        match self {
            InputDevice::Switch { value, .. } => *value,
            InputDevice::Blinker { origin, period, .. } => {
                // Starts false, flips once per elapsed period
                let elapsed = origin.elapsed().as_millis();
                (elapsed / period.as_millis()) % 2 == 1
            }
        }
    }

    pub fn is_modifiable(&self) -> bool {
        matches!(self, InputDevice::Switch { .. })
    }
}

/// Bank of input devices. All slots start out as switches; a front end may
/// install a blinker into any slot. Operator-set values deliberately survive
/// engine restarts, so there is no reset here.
pub struct Inputs {
    devices: Vec<InputDevice>,
    notifier: Notifier,
}

impl Inputs {
    pub fn new(len: usize) -> Self {
        Inputs {
            devices: (0..len)
                .map(|i| InputDevice::switch(format!("Switch {i:2}")))
                .collect(),
            notifier: Notifier::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn get(&self, addr: usize) -> Result<bool> {
        self.devices
            .get(addr)
            .map(InputDevice::value)
            .ok_or(Fault::OutOfRange { bank: "input", addr, len: self.devices.len() })
    }

    pub fn device(&self, addr: usize) -> Result<&InputDevice> {
        self.devices
            .get(addr)
            .ok_or(Fault::OutOfRange { bank: "input", addr, len: self.devices.len() })
    }

    /// Flip a switch. Faults on a non-modifiable device such as a blinker.
    pub fn toggle(&mut self, addr: usize) -> Result<()> {
        let len = self.devices.len();
        match self.devices.get_mut(addr) {
            Some(InputDevice::Switch { value, .. }) => {
                *value = !*value;
                self.notifier.notify();
                Ok(())
            }
            Some(_) => Err(Fault::ReadOnlyInput { addr }),
            None => Err(Fault::OutOfRange { bank: "input", addr, len }),
        }
    }

    /// Replace the device in a slot, e.g. to wire in a blinker.
    pub fn install(&mut self, addr: usize, device: InputDevice) -> Result<()> {
        let len = self.devices.len();
        match self.devices.get_mut(addr) {
            Some(slot) => {
                *slot = device;
                self.notifier.notify();
                Ok(())
            }
            None => Err(Fault::OutOfRange { bank: "input", addr, len }),
        }
    }

    pub fn subscribe(&mut self, observer: impl Fn() + Send + 'static) {
        self.notifier.subscribe(observer);
    }
}

/// One program-driven output lamp.
pub struct OutputDevice {
    pub label: String,
    pub value: bool,
}

/// Bank of output devices. Unlike the other banks this one only notifies when
/// a write actually changes the stored value, so a program rewriting the same
/// state every cycle does not spam observers.
pub struct Outputs {
    devices: Vec<OutputDevice>,
    notifier: Notifier,
}

impl Outputs {
    pub fn new(len: usize) -> Self {
        Outputs {
            devices: (0..len)
                .map(|i| OutputDevice { label: format!("Output {i:2}"), value: false })
                .collect(),
            notifier: Notifier::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn get(&self, addr: usize) -> Result<bool> {
        self.devices
            .get(addr)
            .map(|device| device.value)
            .ok_or(Fault::OutOfRange { bank: "output", addr, len: self.devices.len() })
    }

    pub fn label(&self, addr: usize) -> Result<&str> {
        self.devices
            .get(addr)
            .map(|device| device.label.as_str())
            .ok_or(Fault::OutOfRange { bank: "output", addr, len: self.devices.len() })
    }

    pub fn set(&mut self, addr: usize, value: bool) -> Result<()> {
        let len = self.devices.len();
        match self.devices.get_mut(addr) {
            Some(device) => {
                let prior = device.value;
                device.value = value;
                if prior != value {
                    self.notifier.notify();
                }
                Ok(())
            }
            None => Err(Fault::OutOfRange { bank: "output", addr, len }),
        }
    }

    pub fn reset(&mut self) {
        for device in &mut self.devices {
            device.value = false;
        }
        self.notifier.notify();
    }

    pub fn subscribe(&mut self, observer: impl Fn() + Send + 'static) {
        self.notifier.subscribe(observer);
    }
}
