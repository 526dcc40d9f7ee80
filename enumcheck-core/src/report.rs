//! Output formatting - plaintext and JSON.

use serde_json::json;

use crate::detect::Finding;

/// Prints findings in plain text format.
pub fn print_plain(findings: &[Finding]) {
    if findings.is_empty() {
        println!("No enum collection candidates found.");
    } else {
        println!("ENUM COLLECTION CANDIDATES ({}):", findings.len());
        for finding in findings {
            println!("- {}", finding);
        }
    }
}

/// Prints findings in JSON format.
///
/// Falls back to a simple format if serialization fails (should never happen
/// with these types, but all cases are handled).
pub fn print_json(findings: &[Finding]) {
    match serde_json::to_string_pretty(&json!({ "findings": findings })) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            // Fallback: output in a simpler format
            eprintln!("[WARN] JSON serialization failed: {}", e);
            for finding in findings {
                println!("{}", finding);
            }
        }
    }
}
