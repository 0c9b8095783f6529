//! Navigation through the parent process.

use async_trait::async_trait;
use attachment_search::Navigator;
use std::io::Write;
use tracing::debug;

/// Asks the host shell to open a note by printing `NAVIGATE_NOTE=<id>` on
/// stdout, the same channel that announces `RPC_PORT=`.
#[derive(Debug, Default)]
pub struct StdoutNavigator;

#[async_trait]
impl Navigator for StdoutNavigator {
    async fn navigate_to_note(&self, note_id: &str) -> attachment_search::Result<()> {
        debug!("Requesting navigation to note {}", note_id);
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "NAVIGATE_NOTE={}", note_id)?;
        stdout.flush()?;
        Ok(())
    }
}
