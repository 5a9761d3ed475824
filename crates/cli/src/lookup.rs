use crate::view::SymbolView;
use smaliscope_api::models::SymbolInfo;
use smaliscope_api::semantic::SymbolLookup;
use tabled::{Table, settings::Style};

pub fn run_lookup(
    lookup: &dyn SymbolLookup,
    name: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let found = lookup.lookup_by_qualified_name(name)?;
    if found.is_empty() && !json {
        println!("No class named {}", name);
        return Ok(());
    }
    print_symbols(&found, json)
}

pub fn run_members(
    lookup: &dyn SymbolLookup,
    name: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let members = lookup.members_of(name)?;
    print_symbols(&members, json)
}

fn print_symbols(symbols: &[SymbolInfo], json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(symbols)?);
    } else {
        let views: Vec<SymbolView> = symbols.iter().map(SymbolView::from_info).collect();
        println!("{}", Table::new(&views).with(Style::psql()));
    }
    Ok(())
}
