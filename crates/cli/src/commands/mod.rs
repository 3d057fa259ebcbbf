//! Subcommand implementations.

pub mod account;
pub mod catalog;
pub mod shop;

use std::error::Error;
use std::io::Write;

use marketplace_storefront::Notice;

use crate::render;

pub type CommandResult = Result<(), Box<dyn Error>>;

/// Fail the command when a read fell back.
fn fallback(notice: Option<Notice>) -> CommandResult {
    notice.map_or(Ok(()), |notice| Err(notice.to_string().into()))
}

/// Print an info notice, or fail the command with an error notice.
fn outcome(out: &mut impl Write, notice: &Notice) -> CommandResult {
    if notice.is_error() {
        return Err(notice.to_string().into());
    }
    render::notice(out, notice)?;
    Ok(())
}
