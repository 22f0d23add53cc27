// Library module organization

// Receipt rendering core
pub mod escpos;
pub mod layout;
pub mod receipt;

// Printer device and session lifecycle
pub mod printers;
pub mod session;

// Service plumbing
pub mod config;
pub mod errors;
pub mod routes;

// Re-export commonly used types for convenience
pub use errors::{AppError, ConfigError, DeviceError, ValidationError};
pub use layout::{render, render_at, Align, RenderCommand, TextStyle};
pub use printers::{detect_printer, PrinterDevice, SharedPrinter};
pub use receipt::{Amount, ItemEntry, LineItem, ReceiptRequest};
pub use session::{execute, JobKind, PrintJob, PrintOutcome};

#[cfg(feature = "usb-printer")]
pub use printers::UsbPrinter;
