//! C-compatible FFI API for cross-language bindings.
//!
//! # ABI Contract
//!
//! All exported functions use `extern "C"` calling convention and `#[no_mangle]`
//! to ensure stable symbol names.
//!
//! ## Inputs
//! - Resume records are passed as UTF-8 JSON bytes (pointer + length, not
//!   necessarily null-terminated), in the editor's camelCase shape.
//! - Template ids are null-terminated strings; `NULL` or an unknown id selects
//!   the professional template.
//!
//! ## Memory management
//! - Buffers returned by `rforge_*` functions are allocated on the Rust heap.
//! - Callers **must** free them with `rforge_free_buffer` / `rforge_free_string`.
//! - Passing a null pointer to a free function is a no-op.
//!
//! ## Error handling
//! - Functions that can fail return a `c_int`: `0` success, `1` null pointer,
//!   `2` invalid UTF-8, `3` invalid record JSON, `4` pipeline failure.
//! - Error details can be retrieved via `rforge_last_error`.
//!
//! ## Thread safety
//! - `rforge_last_error` uses a thread-local, so it is safe to call from
//!   multiple threads.
//!
//! ## Usage from Go (cgo)
//! ```go
//! // #cgo LDFLAGS: -lresume_forge
//! // #include "rforge.h"
//! import "C"
//! ```

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::slice;

use crate::pipeline::{generate_resume_pdf, paginate_record, print_resume_html, PipelineConfig};
use crate::record::ResumeRecord;
use crate::variant::StyleVariant;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

// ---------------------------------------------------------------------------
// C-compatible configuration types
// ---------------------------------------------------------------------------

/// Optional page configuration for [`rforge_export_pdf`].
///
/// Fields set to `0` (or `NULL` for `title`) fall back to their A4 defaults:
/// - `page_width`  → 595.28 pt
/// - `page_height` → 841.89 pt
/// - `page_margin` → 40 pt
/// - `title`       → "Resume"
#[repr(C)]
pub struct RforgeConfig {
    /// Null-terminated UTF-8 document title embedded in PDF metadata.
    pub title: *const c_char,
    pub page_width: f32,
    pub page_height: f32,
    pub page_margin: f32,
}

/// # Safety
/// `cfg.title`, if non-null, must point to a valid null-terminated UTF-8 string.
unsafe fn pipeline_config_from_c(cfg: &RforgeConfig) -> PipelineConfig {
    let defaults = PipelineConfig::default();
    let or_default = |v: f32, d: f32| if v == 0.0 { d } else { v };

    let title = if cfg.title.is_null() {
        defaults.title.clone()
    } else {
        CStr::from_ptr(cfg.title)
            .to_str()
            .map(str::to_string)
            .unwrap_or_else(|_| defaults.title.clone())
    };

    PipelineConfig {
        title,
        page_width: or_default(cfg.page_width, defaults.page_width),
        page_height: or_default(cfg.page_height, defaults.page_height),
        page_margin: or_default(cfg.page_margin, defaults.page_margin),
        ..defaults
    }
}

/// # Safety
/// `ptr` must point to `len` valid bytes.
unsafe fn read_record(ptr: *const u8, len: u32) -> Result<ResumeRecord, c_int> {
    let bytes = slice::from_raw_parts(ptr, len as usize);
    let json = std::str::from_utf8(bytes).map_err(|e| {
        set_last_error(&format!("Invalid UTF-8: {e}"));
        2
    })?;
    ResumeRecord::from_json(json).map_err(|e| {
        set_last_error(&e.to_string());
        3
    })
}

/// # Safety
/// `template`, if non-null, must be a valid null-terminated string.
unsafe fn read_template(template: *const c_char) -> StyleVariant {
    if template.is_null() {
        return StyleVariant::default();
    }
    StyleVariant::parse(&CStr::from_ptr(template).to_string_lossy())
}

/// # Safety
/// `out` must be a valid pointer.
unsafe fn write_string(out: *mut *mut c_char, s: String) -> c_int {
    match CString::new(s) {
        Ok(cs) => {
            *out = cs.into_raw();
            0
        }
        Err(_) => {
            set_last_error("output contained null byte");
            4
        }
    }
}

// ---------------------------------------------------------------------------
// Core API
// ---------------------------------------------------------------------------

/// Measure and paginate a resume record. Returns the page assignment JSON.
///
/// # Parameters
/// - `record_ptr`, `record_len`: UTF-8 record JSON
/// - `template`: template id (nullable)
/// - `out_json_ptr`: receives a pointer to a null-terminated JSON string
///
/// # Safety
/// - `record_ptr` must point to `record_len` valid bytes.
/// - `out_json_ptr` must be a valid pointer; free `*out_json_ptr` with
///   `rforge_free_string`.
#[no_mangle]
pub unsafe extern "C" fn rforge_paginate(
    record_ptr: *const u8,
    record_len: u32,
    template: *const c_char,
    out_json_ptr: *mut *mut c_char,
) -> c_int {
    if record_ptr.is_null() || out_json_ptr.is_null() {
        set_last_error("Null pointer argument");
        return 1;
    }
    let record = match read_record(record_ptr, record_len) {
        Ok(r) => r,
        Err(code) => return code,
    };
    let config = PipelineConfig::default();
    let fonts = match config.load_fonts() {
        Ok(f) => f,
        Err(e) => {
            set_last_error(&e.to_string());
            return 4;
        }
    };

    match paginate_record(&record, read_template(template), &config, &fonts).and_then(|(_, a)| a.to_json()) {
        Ok(json) => write_string(out_json_ptr, json),
        Err(e) => {
            set_last_error(&e.to_string());
            4
        }
    }
}

/// Generate the resume PDF.
///
/// # Parameters
/// - `record_ptr`, `record_len`: UTF-8 record JSON
/// - `template`: template id (nullable)
/// - `cfg`: optional pointer to an [`RforgeConfig`]; pass `NULL` for defaults
/// - `out_buf`, `out_len`: PDF output
///
/// # Safety
/// - `record_ptr` must point to `record_len` valid bytes.
/// - `cfg`, if non-null, must point to a fully-initialised [`RforgeConfig`].
/// - The caller must free `*out_buf` with `rforge_free_buffer`.
#[no_mangle]
pub unsafe extern "C" fn rforge_export_pdf(
    record_ptr: *const u8,
    record_len: u32,
    template: *const c_char,
    cfg: *const RforgeConfig,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
) -> c_int {
    if record_ptr.is_null() || out_buf.is_null() || out_len.is_null() {
        set_last_error("Null pointer argument");
        return 1;
    }
    let record = match read_record(record_ptr, record_len) {
        Ok(r) => r,
        Err(code) => return code,
    };
    let config = if cfg.is_null() {
        PipelineConfig::default()
    } else {
        pipeline_config_from_c(&*cfg)
    };

    match generate_resume_pdf(&record, read_template(template), &config) {
        Ok(artifact) => {
            let len = artifact.bytes.len() as u32;
            let buf = artifact.bytes.into_boxed_slice();
            *out_buf = Box::into_raw(buf) as *mut u8;
            *out_len = len;
            0
        }
        Err(e) => {
            set_last_error(&e.to_string());
            4
        }
    }
}

/// Build the print document (HTML) for the native print dialog.
///
/// # Safety
/// Same as `rforge_paginate`.
#[no_mangle]
pub unsafe extern "C" fn rforge_print_html(
    record_ptr: *const u8,
    record_len: u32,
    template: *const c_char,
    out_html_ptr: *mut *mut c_char,
) -> c_int {
    if record_ptr.is_null() || out_html_ptr.is_null() {
        set_last_error("Null pointer argument");
        return 1;
    }
    let record = match read_record(record_ptr, record_len) {
        Ok(r) => r,
        Err(code) => return code,
    };

    match print_resume_html(&record, read_template(template), &PipelineConfig::default()) {
        Ok(html) => write_string(out_html_ptr, html),
        Err(e) => {
            set_last_error(&e.to_string());
            4
        }
    }
}

// ---------------------------------------------------------------------------
// Memory management
// ---------------------------------------------------------------------------

/// Free a PDF buffer returned by `rforge_export_pdf`.
///
/// # Safety
/// `buf` must have been returned by `rforge_export_pdf`, and `len` must be
/// the corresponding length.
#[no_mangle]
pub unsafe extern "C" fn rforge_free_buffer(buf: *mut u8, len: u32) {
    if !buf.is_null() {
        let _ = Box::from_raw(slice::from_raw_parts_mut(buf, len as usize));
    }
}

/// Free a string returned by `rforge_paginate` or `rforge_print_html`.
///
/// # Safety
/// `s` must have been returned by Rust's `CString::into_raw`.
#[no_mangle]
pub unsafe extern "C" fn rforge_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = CString::from_raw(s);
    }
}

/// Retrieve the last error message. Returns a null-terminated string.
///
/// The returned pointer is valid until the next failing `rforge_*` call on the
/// same thread. The caller should **not** free this pointer.
///
/// Returns null if no error has occurred.
#[no_mangle]
pub extern "C" fn rforge_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        let borrow = e.borrow();
        match borrow.as_ref() {
            Some(cs) => cs.as_ptr(),
            None => ptr::null(),
        }
    })
}

/// Return the library version as a null-terminated string.
/// The caller must **not** free this pointer.
#[no_mangle]
pub extern "C" fn rforge_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
