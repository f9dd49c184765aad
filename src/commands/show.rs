use anyhow::Result;
use tracing::{info, warn};

use crate::cli::ShowArgs;
use crate::commands::output::{PageSnapshot, write_snapshot};
use crate::commands::session;

pub fn run(args: ShowArgs) -> Result<()> {
    let mut session = session::open(&args.lims)?;

    write_snapshot(
        &PageSnapshot::new(&session.client, session.revealed_sections),
        args.json,
        args.output.as_deref(),
    )?;

    if let Some(err) = session.client.take_error() {
        return Err(err.into());
    }
    if session.client.flags().is_empty() {
        warn!(run_id = %session.client.context().run_id, "LIMS returned no lane flags");
    }

    info!(
        run_id = %session.client.context().run_id,
        lanes = session.client.flags().len(),
        "lane flags shown"
    );
    Ok(())
}
