//! Unit tests for error.rs
//!
//! Covers Display, operation names, the message accessor and the error macros.

use crate::error::{Error, Result};
use crate::log::{self, LogEntry, LogSeverity, Logger};
use serial_test::serial;
use std::sync::{Arc, Mutex};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_adapter_selection_failed_display() {
    let err = Error::AdapterSelectionFailed("only software adapters".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Adapter selection failed"));
    assert!(display.contains("only software adapters"));
}

#[test]
fn test_surface_resize_failed_display() {
    let err = Error::SurfaceResizeFailed("swapchain lost".to_string());
    assert_eq!(format!("{}", err), "Surface resize failed: swapchain lost");
}

#[test]
fn test_surface_out_of_date_display() {
    let err = Error::SurfaceOutOfDate("window extent changed".to_string());
    assert_eq!(format!("{}", err), "Surface out of date: window extent changed");
    assert_eq!(err.message(), "window extent changed");
}

#[test]
fn test_invalid_buffer_state_display() {
    let err = Error::InvalidBufferState("already mapped".to_string());
    assert_eq!(format!("{}", err), "Invalid buffer state: already mapped");
}

#[test]
fn test_command_list_errors_display() {
    let reset = Error::CommandListResetFailed("pending work".to_string());
    let close = Error::CommandListCloseFailed("not recording".to_string());
    assert!(format!("{}", reset).starts_with("Command list reset failed"));
    assert!(format!("{}", close).starts_with("Command list close failed"));
}

// ============================================================================
// OPERATION / MESSAGE ACCESSORS
// ============================================================================

#[test]
fn test_operation_names_identify_failing_step() {
    assert_eq!(Error::AdapterSelectionFailed(String::new()).operation(), "adapter selection");
    assert_eq!(Error::DeviceCreationFailed(String::new()).operation(), "device creation");
    assert_eq!(Error::QueueCreationFailed(String::new()).operation(), "queue creation");
    assert_eq!(Error::SurfaceCreationFailed(String::new()).operation(), "surface creation");
    assert_eq!(Error::SurfaceResizeFailed(String::new()).operation(), "surface resize");
    assert_eq!(Error::SurfaceOutOfDate(String::new()).operation(), "image acquisition");
    assert_eq!(Error::ResourceAllocationFailed(String::new()).operation(), "resource allocation");
    assert_eq!(Error::CommandListResetFailed(String::new()).operation(), "command list reset");
    assert_eq!(Error::CommandListCloseFailed(String::new()).operation(), "command list close");
}

#[test]
fn test_message_accessor() {
    let err = Error::ResourceAllocationFailed("out of device memory".to_string());
    assert_eq!(err.message(), "out of device memory");
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::BackendError("x".to_string());
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_clone() {
    let err1 = Error::SubmissionFailed("device lost".to_string());
    let err2 = err1.clone();
    assert_eq!(format!("{}", err1), format!("{}", err2));
}

#[test]
fn test_result_type_err() {
    fn returns_error() -> Result<i32> {
        Err(Error::QueueCreationFailed("no direct queue".to_string()))
    }

    match returns_error() {
        Err(Error::QueueCreationFailed(msg)) => assert_eq!(msg, "no direct queue"),
        other => panic!("unexpected result: {:?}", other),
    }
}

// ============================================================================
// MACRO TESTS
// ============================================================================

struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

#[test]
#[serial]
fn test_harness_err_logs_and_builds_backend_error() {
    let entries = Arc::new(Mutex::new(Vec::new()));
    log::set_logger(CaptureLogger { entries: entries.clone() });

    let err = crate::harness_err!("harness::test", "vkQueueSubmit returned {}", -4);

    log::reset_logger();

    match err {
        Error::BackendError(msg) => assert_eq!(msg, "vkQueueSubmit returned -4"),
        other => panic!("unexpected variant: {:?}", other),
    }

    // Other tests may log concurrently through the global logger
    let captured: Vec<LogEntry> = entries
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.source == "harness::test")
        .cloned()
        .collect();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].severity, LogSeverity::Error);
    assert_eq!(captured[0].source, "harness::test");
    assert!(captured[0].file.is_some());
    assert!(captured[0].line.is_some());
}

#[test]
#[serial]
fn test_harness_bail_returns_early() {
    let entries = Arc::new(Mutex::new(Vec::new()));
    log::set_logger(CaptureLogger { entries: entries.clone() });

    fn bounded(index: u32) -> Result<u32> {
        if index >= 3 {
            crate::harness_bail!("harness::test", "index {} out of range", index);
        }
        Ok(index)
    }

    assert_eq!(bounded(1).unwrap(), 1);
    assert!(matches!(bounded(5), Err(Error::BackendError(_))));

    log::reset_logger();
    let count = entries
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.source == "harness::test")
        .count();
    assert_eq!(count, 1);
}
