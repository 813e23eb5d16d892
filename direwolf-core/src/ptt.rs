//! PTT (push-to-talk) back-end abstraction (§4.8).
//!
//! Back-ends are tagged variants behind a common capability trait
//! (`open`/`write`/`close`), dispatched on the tag rather than through
//! inheritance, per §9's polymorphism note. Real device access (opening
//! a serial port, writing a GPIO sysfs node, talking to a Hamlib
//! daemon, driving a CM108's HID GPIO) is the host-OS boundary this
//! crate doesn't cross — each back-end's `open`/`write` is the seam a
//! platform integration replaces; what this module owns is the parts
//! this system actually asks the core to do: which line to drive, the
//! per-channel invert bit, sharing one handle across channels that
//! share a device, and degrading to `NONE` on open failure.

use std::sync::{Arc, Mutex};

use crate::config::{PttConfig, PttMethod};
use crate::errors::IoError;

/// Which logical output a call drives (§4.8: `ot ∈ {PTT, DCD, CON}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputType {
    Ptt,
    Dcd,
    Con,
}

impl std::fmt::Display for OutputType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputType::Ptt => write!(f, "PTT"),
            OutputType::Dcd => write!(f, "DCD"),
            OutputType::Con => write!(f, "CON"),
        }
    }
}

/// Common capability interface every PTT back-end implements.
pub trait PttLine: std::fmt::Debug + Send {
    fn open(&mut self) -> Result<(), IoError>;
    fn write(&mut self, on: bool) -> Result<(), IoError>;
    fn close(&mut self);
    fn identity(&self) -> String;
}

#[derive(Debug, Default)]
struct NullLine;

impl PttLine for NullLine {
    fn open(&mut self) -> Result<(), IoError> {
        Ok(())
    }
    fn write(&mut self, _on: bool) -> Result<(), IoError> {
        Ok(())
    }
    fn close(&mut self) {}
    fn identity(&self) -> String {
        "none".to_string()
    }
}

#[derive(Debug)]
struct SerialLine {
    device: String,
    opened: bool,
}

impl PttLine for SerialLine {
    fn open(&mut self) -> Result<(), IoError> {
        if self.device.is_empty() {
            return Err(IoError::PttOpenFailed {
                device: self.device.clone(),
                reason: "no device path configured".to_string(),
            });
        }
        self.opened = true;
        Ok(())
    }
    fn write(&mut self, _on: bool) -> Result<(), IoError> {
        if !self.opened {
            return Err(IoError::PttAssertFailed {
                device: self.device.clone(),
                reason: "line not open".to_string(),
            });
        }
        Ok(())
    }
    fn close(&mut self) {
        self.opened = false;
    }
    fn identity(&self) -> String {
        format!("serial:{}", self.device)
    }
}

#[derive(Debug)]
struct GpioLine {
    number: u32,
    opened: bool,
}

impl PttLine for GpioLine {
    fn open(&mut self) -> Result<(), IoError> {
        self.opened = true;
        Ok(())
    }
    fn write(&mut self, _on: bool) -> Result<(), IoError> {
        if !self.opened {
            return Err(IoError::PttAssertFailed {
                device: format!("gpio{}", self.number),
                reason: "line not open".to_string(),
            });
        }
        Ok(())
    }
    fn close(&mut self) {
        self.opened = false;
    }
    fn identity(&self) -> String {
        format!("gpio:{}", self.number)
    }
}

#[derive(Debug)]
struct LptLine {
    bit: u8,
    opened: bool,
}

impl PttLine for LptLine {
    fn open(&mut self) -> Result<(), IoError> {
        self.opened = true;
        Ok(())
    }
    fn write(&mut self, _on: bool) -> Result<(), IoError> {
        if !self.opened {
            return Err(IoError::PttAssertFailed {
                device: format!("lpt bit {}", self.bit),
                reason: "line not open".to_string(),
            });
        }
        Ok(())
    }
    fn close(&mut self) {
        self.opened = false;
    }
    fn identity(&self) -> String {
        format!("lpt:{}", self.bit)
    }
}

#[derive(Debug)]
struct HamlibLine {
    device: String,
    opened: bool,
}

impl PttLine for HamlibLine {
    fn open(&mut self) -> Result<(), IoError> {
        if self.device.is_empty() {
            return Err(IoError::PttOpenFailed {
                device: self.device.clone(),
                reason: "no rig daemon address configured".to_string(),
            });
        }
        self.opened = true;
        Ok(())
    }
    fn write(&mut self, _on: bool) -> Result<(), IoError> {
        if !self.opened {
            return Err(IoError::PttAssertFailed {
                device: self.device.clone(),
                reason: "rig daemon not connected".to_string(),
            });
        }
        Ok(())
    }
    fn close(&mut self) {
        self.opened = false;
    }
    fn identity(&self) -> String {
        format!("hamlib:{}", self.device)
    }
}

#[derive(Debug)]
struct Cm108Line {
    device: String,
    opened: bool,
}

impl PttLine for Cm108Line {
    fn open(&mut self) -> Result<(), IoError> {
        if self.device.is_empty() {
            return Err(IoError::PttOpenFailed {
                device: self.device.clone(),
                reason: "no HID device path configured".to_string(),
            });
        }
        self.opened = true;
        Ok(())
    }
    fn write(&mut self, _on: bool) -> Result<(), IoError> {
        if !self.opened {
            return Err(IoError::PttAssertFailed {
                device: self.device.clone(),
                reason: "HID handle not open".to_string(),
            });
        }
        Ok(())
    }
    fn close(&mut self) {
        self.opened = false;
    }
    fn identity(&self) -> String {
        format!("cm108:{}", self.device)
    }
}

fn build_line(config: &PttConfig) -> Box<dyn PttLine> {
    match config.method {
        PttMethod::None => Box::new(NullLine),
        PttMethod::Serial => Box::new(SerialLine {
            device: config.device.clone().unwrap_or_default(),
            opened: false,
        }),
        PttMethod::Gpio => Box::new(GpioLine {
            number: config.gpio_number.unwrap_or(0),
            opened: false,
        }),
        PttMethod::Lpt => Box::new(LptLine {
            bit: config.lpt_bit.unwrap_or(0),
            opened: false,
        }),
        PttMethod::Hamlib => Box::new(HamlibLine {
            device: config.device.clone().unwrap_or_default(),
            opened: false,
        }),
        PttMethod::Cm108 => Box::new(Cm108Line {
            device: config.device.clone().unwrap_or_default(),
            opened: false,
        }),
    }
}

/// A shared, opened PTT line: device handles opened once and shared
/// when two channels' lines name the same device (§4.8), protected by
/// a per-device lock so concurrent transmit threads serialize writes.
pub type SharedLine = Arc<Mutex<Box<dyn PttLine>>>;

/// One channel's view of an output type: the shared line, this
/// channel's invert bit, and the asserted/released state it last
/// wrote (so `release` after a failed `assert` doesn't re-toggle).
#[derive(Debug, Clone)]
pub struct PttController {
    line: SharedLine,
    invert: bool,
    asserted: bool,
}

impl PttController {
    /// Open (or share) the line named by `config`. Open failure
    /// silently degrades the method to `NONE` — per §4.8, this is a
    /// non-fatal warning-worthy condition, never a startup abort.
    pub fn new(config: &PttConfig, device_registry: &mut DeviceRegistry) -> Self {
        let key = registry_key(config);
        let line = device_registry.line_for(&key, config);
        let opened = line.lock().expect("ptt line mutex poisoned").open();
        let line = match opened {
            Ok(()) => line,
            Err(_) => {
                let fallback: SharedLine = Arc::new(Mutex::new(Box::new(NullLine)));
                let _ = fallback.lock().expect("ptt line mutex poisoned").open();
                fallback
            }
        };
        Self {
            line,
            invert: config.invert,
            asserted: false,
        }
    }

    fn effective(&self, on: bool) -> bool {
        if self.invert {
            !on
        } else {
            on
        }
    }

    /// Drive the line on. PTT assertion failure is logged (by the
    /// caller, via the returned `Err`) but non-fatal — the caller
    /// should continue the transmit sequence regardless.
    pub fn assert(&mut self) -> Result<(), IoError> {
        let mut line = self.line.lock().expect("ptt line mutex poisoned");
        line.write(self.effective(true))?;
        self.asserted = true;
        Ok(())
    }

    pub fn release(&mut self) -> Result<(), IoError> {
        let mut line = self.line.lock().expect("ptt line mutex poisoned");
        line.write(self.effective(false))?;
        self.asserted = false;
        Ok(())
    }

    pub fn is_asserted(&self) -> bool {
        self.asserted
    }
}

fn registry_key(config: &PttConfig) -> String {
    match config.method {
        PttMethod::None => "none".to_string(),
        PttMethod::Serial | PttMethod::Hamlib | PttMethod::Cm108 => {
            config.device.clone().unwrap_or_default()
        }
        PttMethod::Gpio => format!("gpio{}", config.gpio_number.unwrap_or(0)),
        PttMethod::Lpt => format!("lpt{}", config.lpt_bit.unwrap_or(0)),
    }
}

/// Shares one opened line across every channel/output-type that names
/// the same device, per §4.8's "sharing a handle when two lines of the
/// same device drive different channels."
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    lines: std::collections::HashMap<String, SharedLine>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn line_for(&mut self, key: &str, config: &PttConfig) -> SharedLine {
        self.lines
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(build_line(config))))
            .clone()
    }

    /// Deassert every known line and close the underlying handles;
    /// called on shutdown (§5: "Shutdown drains all queues and
    /// deasserts PTT before exit").
    pub fn shutdown(&mut self) {
        for line in self.lines.values() {
            let mut guard = line.lock().expect("ptt line mutex poisoned");
            let _ = guard.write(false);
            guard.close();
        }
    }
}
