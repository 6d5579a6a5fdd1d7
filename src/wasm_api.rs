use wasm_bindgen::prelude::*;

use crate::json;

/// Initialize panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Main WASM API: solve one placement request
///
/// # Arguments
/// * `request` - JSON object, e.g.
///   ```json
///   {"table": [{"type": "run", "tiles": ["r1", "r2", "r3"]}],
///    "rack": ["r4", "w"], "time_limit_ms": 1000, "moves": true}
///   ```
///
/// # Returns
/// JSON string with `success`, `status`, `table`, `consumed` (rack indices),
/// optional `moves`, or `error`
#[wasm_bindgen]
pub fn solve_rummikub(request: &str) -> String {
    json::solve_json(request)
}

/// Get the git commit hash that this WASM module was built from
///
/// Returns the first 8 characters of the commit hash, or "unknown" if not available
#[wasm_bindgen]
pub fn get_build_commit() -> String {
    env!("BUILD_COMMIT").to_string()
}
