//! FFI bindings for Nestling Rhythm
//!
//! This module provides C-compatible functions for calling the engine from the
//! app shell. All functions take C strings (null-terminated) and return
//! allocated memory that must be freed by the caller using `rhythm_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::aggregate::{TrendWindow, MAX_TREND_WINDOW_DAYS};
use crate::error::RhythmError;
use crate::pipeline::{activities_to_daily_insight, activities_to_trend_report, RhythmProcessor};
use crate::schema::ActivityAdapter;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Read a required string argument, recording an error when it is missing
unsafe fn required_arg(ptr: *const c_char, name: &str) -> Option<String> {
    let value = cstr_to_string(ptr);
    if value.is_none() {
        set_last_error(&format!("Invalid {} string pointer", name));
    }
    value
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Hand a pipeline result across the boundary
fn into_c_result(result: Result<String, RhythmError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Window length from the C side: 7 when zero or negative, rejected past the maximum
fn window_days_arg(window_days: i32) -> Result<u32, RhythmError> {
    match u32::try_from(window_days) {
        Ok(0) | Err(_) => Ok(TrendWindow::Week.days()),
        Ok(days) if days > MAX_TREND_WINDOW_DAYS => Err(RhythmError::InvalidConfig(format!(
            "window_days must be at most {}, got {}",
            MAX_TREND_WINDOW_DAYS, days
        ))),
        Ok(days) => Ok(days),
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Compute today's insight and return it as a JSON payload.
///
/// # Safety
/// - `activities_json`, `household_json`, and `now` must be valid null-terminated C strings.
/// - `household_json` may be NULL for default household settings.
/// - Returns a newly allocated string that must be freed with `rhythm_free_string`.
/// - Returns NULL on error; call `rhythm_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn rhythm_daily_insight(
    activities_json: *const c_char,
    household_json: *const c_char,
    now: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(activities) = required_arg(activities_json, "activities JSON") else {
        return ptr::null_mut();
    };
    let household = cstr_to_string(household_json).unwrap_or_default();
    let Some(now) = required_arg(now, "now") else {
        return ptr::null_mut();
    };

    into_c_result(activities_to_daily_insight(activities, household, now))
}

/// Compute a trend report over `window_days` (7 when zero or negative, at most 366).
///
/// # Safety
/// - `activities_json`, `household_json`, and `now` must be valid null-terminated C strings.
/// - `household_json` may be NULL for default household settings.
/// - Returns a newly allocated string that must be freed with `rhythm_free_string`.
/// - Returns NULL on error; call `rhythm_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn rhythm_trend_report(
    activities_json: *const c_char,
    household_json: *const c_char,
    now: *const c_char,
    window_days: i32,
) -> *mut c_char {
    clear_last_error();

    let Some(activities) = required_arg(activities_json, "activities JSON") else {
        return ptr::null_mut();
    };
    let household = cstr_to_string(household_json).unwrap_or_default();
    let Some(now) = required_arg(now, "now") else {
        return ptr::null_mut();
    };

    into_c_result(
        window_days_arg(window_days)
            .and_then(|days| activities_to_trend_report(activities, household, now, days)),
    )
}

/// Validate activity records and return the validation report as JSON.
///
/// # Safety
/// - `activities_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `rhythm_free_string`.
/// - Returns NULL on error; call `rhythm_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn rhythm_validate_activities(activities_json: *const c_char) -> *mut c_char {
    clear_last_error();

    let Some(activities) = required_arg(activities_json, "activities JSON") else {
        return ptr::null_mut();
    };

    into_c_result(ActivityAdapter::parse(&activities).and_then(|records| {
        let report = ActivityAdapter::validate(&records);
        serde_json::to_string(&report).map_err(RhythmError::JsonError)
    }))
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a RhythmProcessor
pub struct RhythmProcessorHandle {
    processor: RhythmProcessor,
}

/// Create a new RhythmProcessor, optionally configured from JSON.
///
/// # Safety
/// - `config_json` may be NULL for default settings.
/// - Returns a pointer to a newly allocated RhythmProcessor.
/// - Must be freed with `rhythm_processor_free`.
/// - Returns NULL on error; call `rhythm_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn rhythm_processor_new(config_json: *const c_char) -> *mut RhythmProcessorHandle {
    clear_last_error();

    let mut processor = RhythmProcessor::new();
    if let Some(json) = cstr_to_string(config_json) {
        if let Err(e) = processor.load_config(&json) {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    }

    Box::into_raw(Box::new(RhythmProcessorHandle { processor }))
}

/// Free a RhythmProcessor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `rhythm_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn rhythm_processor_free(processor: *mut RhythmProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Compute today's insight with a configured processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `rhythm_processor_new`.
/// - `activities_json` and `now` must be valid null-terminated C strings.
/// - `household_json` may be NULL for default household settings.
/// - Returns a newly allocated string that must be freed with `rhythm_free_string`.
/// - Returns NULL on error; call `rhythm_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn rhythm_processor_daily_insight(
    processor: *const RhythmProcessorHandle,
    activities_json: *const c_char,
    household_json: *const c_char,
    now: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &*processor;

    let Some(activities) = required_arg(activities_json, "activities JSON") else {
        return ptr::null_mut();
    };
    let household = cstr_to_string(household_json).unwrap_or_default();
    let Some(now) = required_arg(now, "now") else {
        return ptr::null_mut();
    };

    into_c_result(handle.processor.daily_insight_json(&activities, &household, &now))
}

/// Compute a trend report with a configured processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `rhythm_processor_new`.
/// - `activities_json` and `now` must be valid null-terminated C strings.
/// - `household_json` may be NULL for default household settings.
/// - Returns a newly allocated string that must be freed with `rhythm_free_string`.
/// - Returns NULL on error; call `rhythm_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn rhythm_processor_trend_report(
    processor: *const RhythmProcessorHandle,
    activities_json: *const c_char,
    household_json: *const c_char,
    now: *const c_char,
    window_days: i32,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &*processor;

    let Some(activities) = required_arg(activities_json, "activities JSON") else {
        return ptr::null_mut();
    };
    let household = cstr_to_string(household_json).unwrap_or_default();
    let Some(now) = required_arg(now, "now") else {
        return ptr::null_mut();
    };

    into_c_result(window_days_arg(window_days).and_then(|days| {
        handle
            .processor
            .trend_report_json(&activities, &household, &now, days)
    }))
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by rhythm functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a rhythm function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn rhythm_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next rhythm function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn rhythm_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn rhythm_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn sample_activities() -> CString {
        CString::new(
            r#"[
                {"id": "n1", "type": "nap", "loggedAt": "2024-03-15T09:00:00",
                 "details": {"startTime": "9:00 AM", "endTime": "10:00 AM"}},
                {"id": "f1", "type": "feed", "loggedAt": "2024-03-15T07:00:00",
                 "details": {"quantity": "4", "unit": "oz"}},
                {"id": "x", "type": "bath", "loggedAt": "2024-03-15T08:00:00"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_ffi_daily_insight() {
        let activities = sample_activities();
        let now = CString::new("2024-03-15T11:00:00").unwrap();

        unsafe {
            let result = rhythm_daily_insight(activities.as_ptr(), ptr::null(), now.as_ptr());
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            assert!(result_str.contains("\"daily_insight\""));
            assert!(result_str.contains("narrative"));

            rhythm_free_string(result);
        }
    }

    #[test]
    fn test_ffi_processor_lifecycle() {
        let config = CString::new(r#"{"baseline_window_days": 5}"#).unwrap();
        let activities = sample_activities();
        let household = CString::new(r#"{"householdId": "hh-9"}"#).unwrap();
        let now = CString::new("2024-03-15T20:00:00").unwrap();

        unsafe {
            let processor = rhythm_processor_new(config.as_ptr());
            assert!(!processor.is_null());

            let result = rhythm_processor_trend_report(
                processor,
                activities.as_ptr(),
                household.as_ptr(),
                now.as_ptr(),
                30,
            );
            assert!(!result.is_null());
            let result_str = CStr::from_ptr(result).to_str().unwrap();
            assert!(result_str.contains("\"hh-9\""));
            rhythm_free_string(result);

            let result = rhythm_processor_daily_insight(
                processor,
                activities.as_ptr(),
                household.as_ptr(),
                now.as_ptr(),
            );
            assert!(!result.is_null());
            rhythm_free_string(result);

            rhythm_processor_free(processor);
        }
    }

    #[test]
    fn test_ffi_invalid_config() {
        let config = CString::new(r#"{"judgement_hour": 99}"#).unwrap();
        unsafe {
            let processor = rhythm_processor_new(config.as_ptr());
            assert!(processor.is_null());
            assert!(!rhythm_last_error().is_null());
        }
    }

    #[test]
    fn test_ffi_validate() {
        let activities = sample_activities();
        unsafe {
            let result = rhythm_validate_activities(activities.as_ptr());
            assert!(!result.is_null());
            let report: serde_json::Value =
                serde_json::from_str(CStr::from_ptr(result).to_str().unwrap()).unwrap();
            assert_eq!(report["total"], 3);
            assert_eq!(report["accepted"], 2);
            assert_eq!(report["rejected"][0]["activity_id"], "x");
            rhythm_free_string(result);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            let invalid_json = CString::new("not json").unwrap();
            let now = CString::new("2024-03-15T11:00:00").unwrap();

            let result = rhythm_daily_insight(invalid_json.as_ptr(), ptr::null(), now.as_ptr());
            assert!(result.is_null());

            let error = rhythm_last_error();
            assert!(!error.is_null());

            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(!error_str.is_empty());

            let missing = rhythm_daily_insight(ptr::null(), ptr::null(), now.as_ptr());
            assert!(missing.is_null());
            let error_str = CStr::from_ptr(rhythm_last_error()).to_str().unwrap();
            assert!(error_str.contains("activities JSON"));
        }
    }

    #[test]
    fn test_ffi_trend_window_bounds() {
        let activities = sample_activities();
        let now = CString::new("2024-03-15T20:00:00").unwrap();

        unsafe {
            let result =
                rhythm_trend_report(activities.as_ptr(), ptr::null(), now.as_ptr(), i32::MAX);
            assert!(result.is_null());
            let error_str = CStr::from_ptr(rhythm_last_error()).to_str().unwrap();
            assert!(error_str.contains("window_days"));

            let result = rhythm_trend_report(activities.as_ptr(), ptr::null(), now.as_ptr(), -5);
            assert!(!result.is_null());
            let payload: serde_json::Value =
                serde_json::from_str(CStr::from_ptr(result).to_str().unwrap()).unwrap();
            assert_eq!(payload["report"]["window_days"], 7);
            rhythm_free_string(result);
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = rhythm_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
