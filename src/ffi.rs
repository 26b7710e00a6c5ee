//! FFI interface for C/C++ hosts
//!
//! The mapping goes in as a JSON mapping document, the record comes back
//! as JSON `{"raw": {...}, "final": {...}}`.

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use crate::engine::Extractor;
use crate::mapping::MappingTable;

/// Result struct returned to the host
/// Both pointers are owned by Rust and must be freed via free_extraction_result
#[repr(C)]
pub struct ExtractionResultFFI {
    /// JSON-serialized record (null-terminated)
    pub json_ptr: *mut c_char,
    /// Error message if extraction failed (null-terminated), or null on success
    pub error_ptr: *mut c_char,
}

/// Run one extraction pass over HTML with a JSON mapping document.
///
/// # Arguments
/// * `html_ptr` - Pointer to HTML content (UTF-8, not necessarily null-terminated)
/// * `html_len` - Length of HTML content in bytes
/// * `mapping_json` - Mapping document, e.g. `{"name": "h1::text"}` (null-terminated)
///
/// # Returns
/// ExtractionResultFFI with either json_ptr set (success) or error_ptr set (failure)
///
/// # Safety
/// - `html_ptr` must point to valid memory of at least `html_len` bytes
/// - `mapping_json` must be a valid null-terminated C string
/// - Caller must free the result via `free_extraction_result`
#[no_mangle]
pub unsafe extern "C" fn extract_from_html(
    html_ptr: *const c_char,
    html_len: usize,
    mapping_json: *const c_char,
) -> ExtractionResultFFI {
    let html = if html_ptr.is_null() || html_len == 0 {
        String::new()
    } else {
        let slice = std::slice::from_raw_parts(html_ptr as *const u8, html_len);
        match std::str::from_utf8(slice) {
            Ok(s) => s.to_string(),
            Err(_) => return make_error_result("Invalid UTF-8 in HTML content"),
        }
    };

    if mapping_json.is_null() {
        return make_error_result("Mapping JSON is null");
    }
    let mapping_str = match CStr::from_ptr(mapping_json).to_str() {
        Ok(s) => s,
        Err(_) => return make_error_result("Invalid UTF-8 in mapping JSON"),
    };

    match extract(&html, mapping_str) {
        Ok(json) => match CString::new(json) {
            Ok(cstr) => ExtractionResultFFI {
                json_ptr: cstr.into_raw(),
                error_ptr: ptr::null_mut(),
            },
            Err(_) => make_error_result("Result JSON contains null bytes"),
        },
        Err(msg) => make_error_result(&msg),
    }
}

/// Free an ExtractionResultFFI returned by extract_from_html
///
/// # Safety
/// - `result` must have been returned by `extract_from_html`
/// - Must only be called once per result
#[no_mangle]
pub unsafe extern "C" fn free_extraction_result(result: ExtractionResultFFI) {
    if !result.json_ptr.is_null() {
        drop(CString::from_raw(result.json_ptr));
    }
    if !result.error_ptr.is_null() {
        drop(CString::from_raw(result.error_ptr));
    }
}

fn extract(html: &str, mapping_json: &str) -> Result<String, String> {
    let mapping = MappingTable::from_document(mapping_json)
        .map_err(|e| format!("Failed to parse mapping JSON: {}", e))?;
    let record = Extractor::from_mapping(mapping)
        .parse_html(html)
        .map_err(|e| e.to_string())?;
    serde_json::to_string(&record).map_err(|e| format!("Failed to serialize result: {}", e))
}

fn make_error_result(msg: &str) -> ExtractionResultFFI {
    let error_cstr = CString::new(msg.replace('\0', "")).unwrap_or_default();
    ExtractionResultFFI {
        json_ptr: ptr::null_mut(),
        error_ptr: error_cstr.into_raw(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(html: &str, mapping: &str) -> (Option<serde_json::Value>, Option<String>) {
        let mapping = CString::new(mapping).unwrap();
        unsafe {
            let result = extract_from_html(html.as_ptr() as *const c_char, html.len(), mapping.as_ptr());
            let json = (!result.json_ptr.is_null()).then(|| {
                let s = CStr::from_ptr(result.json_ptr).to_str().unwrap();
                serde_json::from_str(s).unwrap()
            });
            let error = (!result.error_ptr.is_null())
                .then(|| CStr::from_ptr(result.error_ptr).to_string_lossy().into_owned());
            free_extraction_result(result);
            (json, error)
        }
    }

    #[test]
    fn test_extract_from_html() {
        let html = r#"<span id="p">Bruno<a href="http://x.org">site</a></span>"#;
        let mapping = r##"{
            "name": {"css": "#p::text", "auto_extract": true, "take_first": true},
            "website": {"xpath": "//span[@id='p']/a/@href", "auto_extract": true, "take_first": true}
        }"##;

        let (json, error) = call(html, mapping);
        assert!(error.is_none());
        let json = json.unwrap();
        assert_eq!(json["final"]["name"], "Bruno");
        assert_eq!(json["final"]["website"], "http://x.org");
        assert_eq!(json["raw"]["name"], "Bruno");
    }

    #[test]
    fn test_bad_mapping_reports_error() {
        let (json, error) = call("<p>x</p>", r#"{"name": 42}"#);
        assert!(json.is_none());
        assert!(error.unwrap().starts_with("Failed to parse mapping JSON"));
    }

    #[test]
    fn test_malformed_selector_reports_error() {
        let (json, error) = call("<p>x</p>", r#"{"name": {"xpath": "//p["}}"#);
        assert!(json.is_none());
        assert!(error.unwrap().contains("xpath"));
    }

    #[test]
    fn test_null_mapping() {
        let result = unsafe { extract_from_html(ptr::null(), 0, ptr::null()) };
        assert!(result.json_ptr.is_null());
        assert!(!result.error_ptr.is_null());
        unsafe { free_extraction_result(result) };
    }
}
