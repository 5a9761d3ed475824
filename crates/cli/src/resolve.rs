use crate::view::{format_location, shorten_fqn};
use smaliscope_api::models::PositionContext;
use smaliscope_api::semantic::SymbolNavigator;
use std::path::PathBuf;

/// Resolve at a 1-based `line:column` of `file`.
pub fn run(
    navigator: &dyn SymbolNavigator,
    file: PathBuf,
    line: usize,
    column: usize,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = file.canonicalize()?;
    let ctx = PositionContext {
        path,
        line: line.saturating_sub(1),
        col: column.saturating_sub(1),
    };

    match navigator.resolve_at(&ctx)? {
        Some(location) if json => println!("{}", serde_json::to_string_pretty(&location)?),
        Some(location) => println!(
            "{}  {}",
            shorten_fqn(&location.fqn),
            format_location(&location)
        ),
        None if json => println!("null"),
        None => println!("Nothing resolvable at {}:{}:{}", file.display(), line, column),
    }
    Ok(())
}
