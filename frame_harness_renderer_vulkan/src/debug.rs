/// Vulkan debug messenger - routes validation layer messages to the harness logger
///
/// Only compiled with the `vulkan-validation` feature. Messages are counted per
/// severity and identical messages are grouped, so a message repeated every
/// frame shows up with its occurrence count instead of flooding the log.

use ash::vk;
use frame_harness::harness::log::{self, LogSeverity};
use rustc_hash::FxHashMap;
use std::ffi::CStr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

/// Log source of validation messages
const SOURCE: &str = "harness::vulkan::validation";

/// A repeated message is logged again only every this many occurrences
const REPEAT_LOG_INTERVAL: u32 = 100;

/// Set while a messenger is alive
static ENABLED: AtomicBool = AtomicBool::new(false);

/// Global validation statistics (thread-safe atomic counters)
static VALIDATION_STATS: ValidationStatsTracker = ValidationStatsTracker::new();

/// Global message tracker for grouping identical messages
static MESSAGE_TRACKER: Mutex<Option<FxHashMap<String, u32>>> = Mutex::new(None);

/// Validation message counts since the messenger was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }
}

/// Thread-safe validation statistics tracker
struct ValidationStatsTracker {
    errors: AtomicU32,
    warnings: AtomicU32,
    info: AtomicU32,
    verbose: AtomicU32,
}

impl ValidationStatsTracker {
    const fn new() -> Self {
        Self {
            errors: AtomicU32::new(0),
            warnings: AtomicU32::new(0),
            info: AtomicU32::new(0),
            verbose: AtomicU32::new(0),
        }
    }

    fn increment(&self, severity: LogSeverity) {
        let counter = match severity {
            LogSeverity::Error => &self.errors,
            LogSeverity::Warn => &self.warnings,
            LogSeverity::Info => &self.info,
            LogSeverity::Debug | LogSeverity::Trace => &self.verbose,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn get_stats(&self) -> ValidationStats {
        ValidationStats {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            info: self.info.load(Ordering::Relaxed),
            verbose: self.verbose.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.errors.store(0, Ordering::Relaxed);
        self.warnings.store(0, Ordering::Relaxed);
        self.info.store(0, Ordering::Relaxed);
        self.verbose.store(0, Ordering::Relaxed);
    }
}

/// Count one occurrence of `message`, returning the new count
fn track_message(message: &str) -> u32 {
    let mut guard = MESSAGE_TRACKER
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let messages = guard.get_or_insert_with(FxHashMap::default);
    let count = messages.entry(message.to_string()).or_insert(0);
    *count += 1;
    *count
}

/// Enable message routing and reset statistics
pub fn init_debug_config() {
    VALIDATION_STATS.reset();
    *MESSAGE_TRACKER
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(FxHashMap::default());
    ENABLED.store(true, Ordering::Release);
}

/// Disable message routing (called before the messenger is destroyed)
pub fn cleanup_debug_config() {
    ENABLED.store(false, Ordering::Release);
}

/// Get current validation statistics
pub fn get_validation_stats() -> ValidationStats {
    VALIDATION_STATS.get_stats()
}

/// Log a one-line summary of the validation statistics
pub fn log_validation_stats_report() {
    let stats = get_validation_stats();
    if stats.total() == 0 {
        log::log(LogSeverity::Info, SOURCE, "No validation messages".to_string());
        return;
    }

    let repeated = MESSAGE_TRACKER
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .as_ref()
        .map(|messages| messages.values().filter(|&&count| count > 1).count())
        .unwrap_or(0);

    let severity = if stats.errors > 0 {
        LogSeverity::Warn
    } else {
        LogSeverity::Info
    };
    log::log(
        severity,
        SOURCE,
        format!(
            "Validation report: {} error(s), {} warning(s), {} info, {} verbose ({} message(s) repeated)",
            stats.errors, stats.warnings, stats.info, stats.verbose, repeated
        ),
    );
}

/// Map a Vulkan message severity to a log severity
pub(crate) fn message_severity(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> LogSeverity {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        LogSeverity::Error
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        LogSeverity::Warn
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        LogSeverity::Info
    } else {
        LogSeverity::Debug
    }
}

fn message_type_name(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    }
}

/// Vulkan debug messenger callback
///
/// Called by the validation layers. Errors go through `log_detailed` so they
/// carry a location like every other harness error.
pub unsafe extern "system" fn vulkan_debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if !ENABLED.load(Ordering::Acquire) || p_callback_data.is_null() {
        return vk::FALSE;
    }

    let callback_data = *p_callback_data;
    let message_id_name = if callback_data.p_message_id_name.is_null() {
        "Unknown"
    } else {
        CStr::from_ptr(callback_data.p_message_id_name)
            .to_str()
            .unwrap_or("Invalid UTF-8")
    };
    let message = if callback_data.p_message.is_null() {
        "No message"
    } else {
        CStr::from_ptr(callback_data.p_message)
            .to_str()
            .unwrap_or("Invalid UTF-8")
    };

    let severity = message_severity(severity);
    VALIDATION_STATS.increment(severity);

    let count = track_message(message);
    if count > 1 && count % REPEAT_LOG_INTERVAL != 0 {
        return vk::FALSE;
    }
    let repeat = if count > 1 {
        format!(" [x{}]", count)
    } else {
        String::new()
    };

    let text = format!(
        "[{}] {}{}: {}",
        message_type_name(message_type),
        message_id_name,
        repeat,
        message
    );

    if severity == LogSeverity::Error {
        log::log_detailed(severity, SOURCE, text, file!(), line!());
    } else {
        log::log(severity, SOURCE, text);
    }

    // Never abort the Vulkan call
    vk::FALSE
}

/// Messenger create info: errors and warnings of every message type
pub(crate) fn messenger_create_info<'a>() -> vk::DebugUtilsMessengerCreateInfoEXT<'a> {
    vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_callback))
}
