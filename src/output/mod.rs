//! Output formatting for CLI results

use serde::Serialize;

use crate::error::Result;

pub mod formatters;
pub mod json;
pub mod table;

/// Print data wrapped in the JSON envelope
pub fn print_json<T: Serialize + ?Sized>(data: &T) -> Result<()> {
    println!("{}", json::format_json(data)?);
    Ok(())
}
