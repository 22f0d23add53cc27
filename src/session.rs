use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::errors::DeviceError;
use crate::escpos;
use crate::layout::{self, RenderCommand};
use crate::printers::PrinterDevice;
use crate::receipt::ReceiptRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Receipt,
    TestPage,
}

impl JobKind {
    fn printed_message(&self) -> &'static str {
        match self {
            JobKind::Receipt => "Receipt printed successfully",
            JobKind::TestPage => "Test receipt printed successfully",
        }
    }

    fn mock_message(&self) -> &'static str {
        match self {
            JobKind::Receipt => "Mock mode: Receipt would be printed",
            JobKind::TestPage => "Mock mode: Test receipt would be printed",
        }
    }
}

/// Rendered commands plus what the caller needs echoed back.
#[derive(Debug, Clone)]
pub struct PrintJob {
    pub kind: JobKind,
    pub transaction_id: Option<String>,
    pub commands: Vec<RenderCommand>,
}

impl PrintJob {
    pub fn receipt(request: &ReceiptRequest) -> Self {
        PrintJob {
            kind: JobKind::Receipt,
            transaction_id: request.transaction_id.clone(),
            commands: layout::render(request),
        }
    }

    pub fn test_page() -> Self {
        PrintJob {
            kind: JobKind::TestPage,
            transaction_id: None,
            commands: layout::render(&layout::test_page()),
        }
    }
}

/// The only thing a session hands back; device failures never escape as errors.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintOutcome {
    pub success: bool,
    pub mock: bool,
    pub message: String,
    pub transaction_id: Option<String>,
    pub error_detail: Option<String>,
}

impl PrintOutcome {
    fn printed(job: &PrintJob) -> Self {
        PrintOutcome {
            success: true,
            mock: false,
            message: job.kind.printed_message().to_string(),
            transaction_id: job.transaction_id.clone(),
            error_detail: None,
        }
    }

    fn mocked(job: &PrintJob) -> Self {
        PrintOutcome {
            success: true,
            mock: true,
            message: job.kind.mock_message().to_string(),
            transaction_id: job.transaction_id.clone(),
            error_detail: None,
        }
    }

    fn failed(job: &PrintJob, err: &SessionError) -> Self {
        PrintOutcome {
            success: false,
            mock: false,
            message: err.summary().to_string(),
            transaction_id: job.transaction_id.clone(),
            error_detail: Some(err.detail()),
        }
    }

    /// JSON body for the HTTP response. Failure details are only included
    /// when `expose_detail` is set.
    pub fn response_body(&self, expose_detail: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "success": self.success,
            "message": self.message,
        });

        if self.mock {
            body["mock"] = serde_json::Value::Bool(true);
        }
        if let Some(transaction_id) = &self.transaction_id {
            body["transactionId"] = serde_json::Value::String(transaction_id.clone());
        }
        if !self.success {
            let error = match (&self.error_detail, expose_detail) {
                (Some(detail), true) => format!("{}: {}", self.message, detail),
                _ => self.message.clone(),
            };
            body["error"] = serde_json::Value::String(error);
        }

        body
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to open printer device: {0}")]
    Open(DeviceError),

    #[error("Print error at command {index}: {source}")]
    Emit {
        index: usize,
        source: DeviceError,
        cleanup: Option<DeviceError>,
    },

    #[error("Failed to close printer device: {0}")]
    Close(DeviceError),
}

impl SessionError {
    fn summary(&self) -> &'static str {
        match self {
            SessionError::Open(_) => "Failed to open printer device",
            SessionError::Emit { .. } => "Print error",
            SessionError::Close(_) => "Failed to close printer device",
        }
    }

    // The emit failure stays the reported cause; a failed cleanup close is
    // only appended.
    fn detail(&self) -> String {
        match self {
            SessionError::Open(e) | SessionError::Close(e) => e.to_string(),
            SessionError::Emit {
                source,
                cleanup: None,
                ..
            } => source.to_string(),
            SessionError::Emit {
                source,
                cleanup: Some(cleanup),
                ..
            } => format!("{} (close after failure also failed: {})", source, cleanup),
        }
    }
}

/// Play a job against the printer, or report a mock print when there is none.
///
/// Callers must serialize calls against the same device. A session is never
/// retried: once `open` succeeds it runs until the commands are done or a
/// device call fails.
pub async fn execute(job: &PrintJob, device: Option<&mut dyn PrinterDevice>) -> PrintOutcome {
    let Some(device) = device else {
        info!(
            "Mock print request received (printer not available), transaction: {:?}",
            job.transaction_id
        );
        for line in job.commands.iter().filter_map(RenderCommand::as_text) {
            debug!("  | {}", line);
        }
        debug!(
            commands = job.commands.len(),
            bytes = escpos::encode_all(&job.commands).len(),
            "Mock print finished"
        );
        return PrintOutcome::mocked(job);
    };

    let printer = device.describe();
    match run_session(&job.commands, device).await {
        Ok(()) => {
            info!("{} on {}", job.kind.printed_message(), printer);
            PrintOutcome::printed(job)
        }
        Err(e) => {
            error!("Print session on {} failed: {}", printer, e);
            PrintOutcome::failed(job, &e)
        }
    }
}

async fn run_session(
    commands: &[RenderCommand],
    device: &mut dyn PrinterDevice,
) -> Result<(), SessionError> {
    debug!("Session opening");
    device.open().await.map_err(SessionError::Open)?;

    debug!(commands = commands.len(), "Session emitting");
    for (index, command) in commands.iter().enumerate() {
        if let Err(source) = device.emit(command).await {
            let cleanup = match device.close().await {
                Ok(()) => None,
                Err(close_err) => {
                    warn!("Failed to close device after print error: {}", close_err);
                    Some(close_err)
                }
            };
            return Err(SessionError::Emit {
                index,
                source,
                cleanup,
            });
        }
    }

    debug!("Session closing");
    device.close().await.map_err(SessionError::Close)?;

    debug!("Session done");
    Ok(())
}
