use std::time::Instant;

use sequester_odb::ObjectDatabase;
use tracing::info;

use crate::error::{EngineResult, InStage, Stage};

/// Run the host database's aggressive compaction. Not retried.
pub fn compact(db: &dyn ObjectDatabase) -> EngineResult<()> {
    info!("compacting repository");
    let started = Instant::now();
    db.compact().in_stage(Stage::Compact)?;
    info!(elapsed_ms = started.elapsed().as_millis() as u64, "compaction finished");
    Ok(())
}
