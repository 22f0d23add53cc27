use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[cfg(feature = "usb-printer")]
use std::path::PathBuf;
#[cfg(feature = "usb-printer")]
use tokio::fs::{File, OpenOptions};
#[cfg(feature = "usb-printer")]
use tokio::io::AsyncWriteExt;

use crate::config::PrinterConfig;
use crate::errors::DeviceError;
use crate::layout::RenderCommand;

#[cfg(feature = "usb-printer")]
use crate::escpos;

/// A printer the session manager can drive for exactly one receipt at a time.
///
/// `open` must fully complete before the first `emit`; the session never
/// calls `emit` or `close` after a failed `open`.
#[async_trait]
pub trait PrinterDevice: Send {
    async fn open(&mut self) -> Result<(), DeviceError>;
    async fn emit(&mut self, command: &RenderCommand) -> Result<(), DeviceError>;
    async fn close(&mut self) -> Result<(), DeviceError>;
    fn describe(&self) -> String;
}

/// The detected device, owned by the HTTP layer. Holding the lock is what
/// keeps two sessions off the hardware at once.
pub type SharedPrinter = Arc<Mutex<Box<dyn PrinterDevice>>>;

pub fn share(device: Box<dyn PrinterDevice>) -> SharedPrinter {
    Arc::new(Mutex::new(device))
}

// USB printer-class device (usblp), written to as a plain device node
#[cfg(feature = "usb-printer")]
pub struct UsbPrinter {
    path: PathBuf,
    handle: Option<File>,
}

#[cfg(feature = "usb-printer")]
impl UsbPrinter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        UsbPrinter {
            path: path.into(),
            handle: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }
}

#[cfg(feature = "usb-printer")]
#[async_trait]
impl PrinterDevice for UsbPrinter {
    async fn open(&mut self) -> Result<(), DeviceError> {
        if self.handle.is_some() {
            return Err(DeviceError::Busy(format!(
                "{} is already open",
                self.path.display()
            )));
        }

        let mut file = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => DeviceError::NotFound {
                    path: self.path.display().to_string(),
                },
                _ => DeviceError::Open(format!("{}: {}", self.path.display(), e)),
            })?;

        let open_error = |e: std::io::Error| {
            DeviceError::Open(format!("{}: {}", self.path.display(), e))
        };
        file.write_all(&escpos::preamble())
            .await
            .map_err(open_error)?;
        file.flush().await.map_err(open_error)?;

        info!("Opened printer device {}", self.path.display());
        self.handle = Some(file);
        Ok(())
    }

    async fn emit(&mut self, command: &RenderCommand) -> Result<(), DeviceError> {
        let file = self.handle.as_mut().ok_or(DeviceError::NotOpen)?;
        let write_error = |e: std::io::Error| {
            DeviceError::Write(format!("{}: {}", self.path.display(), e))
        };

        // tokio::fs::File queues writes; flush so a failure lands on this command
        file.write_all(&escpos::encode(command))
            .await
            .map_err(write_error)?;
        file.flush().await.map_err(write_error)
    }

    async fn close(&mut self) -> Result<(), DeviceError> {
        let mut file = self.handle.take().ok_or(DeviceError::NotOpen)?;

        file.flush()
            .await
            .map_err(|e| DeviceError::Close(format!("{}: {}", self.path.display(), e)))?;

        info!("Closed printer device {}", self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("USB ESC/POS printer at {}", self.path.display())
    }
}

/// Decide once, at startup, whether a physical printer is available.
/// `None` puts the service in mock mode.
pub async fn detect_printer(config: &PrinterConfig) -> Option<Box<dyn PrinterDevice>> {
    if config.use_mock {
        info!("USE_MOCK_PRINTER is set, running in mock mode");
        return None;
    }

    detect_usb_printer(config).await
}

#[cfg(feature = "usb-printer")]
async fn detect_usb_printer(config: &PrinterConfig) -> Option<Box<dyn PrinterDevice>> {
    let path = &config.device_path;
    match tokio::fs::try_exists(path).await {
        Ok(true) => {
            info!("Found printer device at {}", path.display());
            Some(Box::new(UsbPrinter::new(path.clone())))
        }
        Ok(false) => {
            warn!("Printer device {} not present, running in mock mode", path.display());
            None
        }
        Err(e) => {
            warn!(
                "Cannot inspect printer device {}: {}, running in mock mode",
                path.display(),
                e
            );
            None
        }
    }
}

#[cfg(not(feature = "usb-printer"))]
async fn detect_usb_printer(_config: &PrinterConfig) -> Option<Box<dyn PrinterDevice>> {
    warn!("Built without USB printer support, running in mock mode");
    None
}
