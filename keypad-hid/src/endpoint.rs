//! HID endpoints and the bus-backed device provider
//!
//! A composite HID device exposes one endpoint per report descriptor
//! collection. Endpoints are matched by (usage page, usage):
//!
//! | Device   | Usage page | Usage |
//! |----------|-----------:|------:|
//! | Keyboard |       0x01 |  0x06 |
//! | Mouse    |       0x01 |  0x02 |
//! | Consumer |       0x0C |  0x01 |

use tracing::{debug, trace};

use crate::error::HidError;
use crate::report::{ConsumerReport, KeyboardReport, MouseReport};
use crate::{ConsumerOutput, DeviceProvider, KeyboardOutput, MouseOutput};

/// Usage page / usage pairs for the three endpoints we drive
pub mod usage {
    pub const KEYBOARD: (u16, u16) = (0x01, 0x06);
    pub const MOUSE: (u16, u16) = (0x01, 0x02);
    pub const CONSUMER: (u16, u16) = (0x0C, 0x01);
}

/// Destination for raw report bytes
pub trait ReportSink: Send {
    fn send_report(&mut self, report: &[u8]) -> Result<(), HidError>;
}

impl ReportSink for Box<dyn ReportSink> {
    fn send_report(&mut self, report: &[u8]) -> Result<(), HidError> {
        (**self).send_report(report)
    }
}

/// A USB HID link that hands out report sinks by usage
pub trait HidBus: Send {
    fn is_connected(&self) -> bool;

    /// Open the endpoint matching `usage_page`/`usage`
    fn open(&mut self, usage_page: u16, usage: u16) -> Result<Box<dyn ReportSink>, HidError>;
}

/// [`DeviceProvider`] that builds report devices on top of a [`HidBus`]
pub struct BusProvider<B> {
    bus: B,
}

impl<B: HidBus> BusProvider<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    fn open(&mut self, (usage_page, usage): (u16, u16)) -> Result<Box<dyn ReportSink>, HidError> {
        if !self.bus.is_connected() {
            return Err(HidError::Disconnected);
        }
        self.bus.open(usage_page, usage)
    }
}

impl<B: HidBus> DeviceProvider for BusProvider<B> {
    fn is_connected(&self) -> bool {
        self.bus.is_connected()
    }

    fn open_keyboard(&mut self) -> Result<Box<dyn KeyboardOutput>, HidError> {
        let sink = self.open(usage::KEYBOARD)?;
        Ok(Box::new(KeyboardReport::new(sink)))
    }

    fn open_mouse(&mut self) -> Result<Box<dyn MouseOutput>, HidError> {
        let sink = self.open(usage::MOUSE)?;
        Ok(Box::new(MouseReport::new(sink)))
    }

    fn open_consumer(&mut self) -> Result<Box<dyn ConsumerOutput>, HidError> {
        let sink = self.open(usage::CONSUMER)?;
        Ok(Box::new(ConsumerReport::new(sink)))
    }
}

/// Bus with no hardware behind it: every report is logged at debug level.
///
/// Exposes all three endpoints and is always connected. Used for dry runs.
#[derive(Debug, Default)]
pub struct TraceBus;

struct TraceSink {
    name: &'static str,
}

impl ReportSink for TraceSink {
    fn send_report(&mut self, report: &[u8]) -> Result<(), HidError> {
        debug!("{} report: {:02X?}", self.name, report);
        Ok(())
    }
}

impl HidBus for TraceBus {
    fn is_connected(&self) -> bool {
        true
    }

    fn open(&mut self, usage_page: u16, usage: u16) -> Result<Box<dyn ReportSink>, HidError> {
        let name = match (usage_page, usage) {
            usage::KEYBOARD => "keyboard",
            usage::MOUSE => "mouse",
            usage::CONSUMER => "consumer",
            _ => return Err(HidError::EndpointNotFound { usage_page, usage }),
        };
        trace!("opened {} endpoint", name);
        Ok(Box::new(TraceSink { name }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UnpluggedBus;

    impl HidBus for UnpluggedBus {
        fn is_connected(&self) -> bool {
            false
        }

        fn open(&mut self, _usage_page: u16, _usage: u16) -> Result<Box<dyn ReportSink>, HidError> {
            Ok(Box::new(TraceSink { name: "never" }))
        }
    }

    #[test]
    fn trace_bus_opens_all_three_devices() {
        let mut provider = BusProvider::new(TraceBus);
        assert!(provider.is_connected());
        assert!(provider.open_keyboard().is_ok());
        assert!(provider.open_mouse().is_ok());
        assert!(provider.open_consumer().is_ok());
    }

    #[test]
    fn trace_bus_rejects_unknown_usage() {
        let err = TraceBus.open(0xFF60, 0x61).err().unwrap();
        assert!(matches!(err, HidError::EndpointNotFound { usage_page: 0xFF60, usage: 0x61 }));
        assert!(err.is_unavailable());
    }

    #[test]
    fn unplugged_bus_refuses_to_open() {
        let mut provider = BusProvider::new(UnpluggedBus);
        assert!(matches!(provider.open_keyboard().err(), Some(HidError::Disconnected)));
    }
}
