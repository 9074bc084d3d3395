use std::sync::LazyLock;

use regex::Regex;

static PYTHON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```python\r?\n(.*?)```").expect("valid fence pattern"));

/// Marker of an unfenced solution class.
const SOLUTION_CLASS_MARKER: &str = "class Solution";

/// Pull the submission out of a model response.
///
/// A `python`-tagged fenced block wins; otherwise a response that still
/// defines the solution class is taken whole. `None` means nothing usable was
/// found, which is reported as a parsing failure rather than a runtime one.
pub fn extract_code(response: &str) -> Option<String> {
    if let Some(caps) = PYTHON_FENCE.captures(response) {
        return caps.get(1).map(|m| m.as_str().trim().to_string());
    }
    if response.contains(SOLUTION_CLASS_MARKER) {
        return Some(response.trim().to_string());
    }
    None
}
