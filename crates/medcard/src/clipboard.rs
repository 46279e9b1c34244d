//! Copying share URLs to the system clipboard.

use clipboard_rs::{Clipboard, ClipboardContext};
use tracing::debug;

use crate::error::{Error, Result};

/// Put `text` on the system clipboard.
///
/// # Errors
///
/// Returns [`Error::Clipboard`] when no clipboard is reachable (headless
/// session, missing display server) or the write is refused.
pub fn copy_text(text: &str) -> Result<()> {
    let ctx = ClipboardContext::new().map_err(|e| Error::clipboard(e.to_string()))?;
    ctx.set_text(text.to_string())
        .map_err(|e| Error::clipboard(e.to_string()))?;
    debug!("Copied {} bytes to clipboard", text.len());
    Ok(())
}
