//! Adapters (external I/O)
//!
//! Implementations of the port traits: the real serial port and a simulated
//! device for running without hardware.

pub mod mock_device;
pub mod serial_port;

pub use mock_device::MockDeviceFactory;
pub use serial_port::SerialPortFactory;
