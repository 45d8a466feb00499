//! Warnings with colored terminal output.
//!
//! Provides deduplication to avoid spamming the same warning multiple times.
//! Used by the style reader, selector parser and CLI to report unsupported
//! input without failing a pagination pass.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use owo_colors::OwoColorize;

/// Global set of warnings we've already printed (to deduplicate)
static WARNED: Mutex<Option<HashSet<String>>> = Mutex::new(None);

/// Warn about unsupported input (prints once per unique message)
///
/// Returns `true` if the message was printed, `false` if it was a repeat.
///
/// # Example
/// ```ignore
/// warn_once("style", "unsupported unit 'em' in line-height: 1.5em");
/// ```
pub fn warn_once(component: &str, message: &str) -> bool {
    let key = format!("[{component}] {message}");
    let should_print = WARNED
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get_or_insert_with(HashSet::new)
        .insert(key);

    if should_print {
        eprintln!("{}", format!("[Folio {component}] ⚠ {message}").yellow());
    }
    should_print
}

/// Clear all recorded warnings (call before paginating a new document)
pub fn clear_warnings() {
    let mut guard = WARNED.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(set) = guard.as_mut() {
        set.clear();
    }
}
