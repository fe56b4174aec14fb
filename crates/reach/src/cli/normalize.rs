//! `reach normalize` handler.

use reach::{Platform, normalize};

/// Print the canonical form of an identifier.
pub fn run_normalize(platform: Platform, input: &str) -> Result<(), Box<dyn std::error::Error>> {
    let id = normalize(platform, input)?;
    println!("{}", id.canonical());
    if id.already_resolved() {
        println!("  (already a platform ID)");
    }
    Ok(())
}
