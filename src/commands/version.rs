//! `onhm version` — show version information.

use anyhow::Result;

/// Run `onhm version`.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn run(json: bool) -> Result<i32> {
    if json {
        let obj = serde_json::json!({
            "name": "onhm",
            "version": env!("CARGO_PKG_VERSION"),
        });
        println!("{}", serde_json::to_string_pretty(&obj)?);
    } else {
        println!("onhm {}", env!("CARGO_PKG_VERSION"));
    }
    Ok(0)
}
