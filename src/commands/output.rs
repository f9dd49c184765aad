use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::client::{ClientState, LaneFlagClient};
use crate::context::ReportContext;
use crate::page::{Panel, ReportPage};
use crate::util::{now_utc_string, write_json_pretty};

#[derive(Debug, Serialize)]
pub(super) struct PageSnapshot<'a> {
    generated_at: String,
    context: &'a ReportContext,
    endpoint: String,
    state: ClientState,
    revealed_sections: usize,
    page: &'a ReportPage,
}

impl<'a> PageSnapshot<'a> {
    pub(super) fn new(client: &'a LaneFlagClient, revealed_sections: usize) -> Self {
        let context = client.context();
        Self {
            generated_at: now_utc_string(),
            context,
            endpoint: context.endpoint.flags_url(&context.run_id),
            state: client.state(),
            revealed_sections,
            page: client.page(),
        }
    }
}

pub(super) fn write_snapshot(
    snapshot: &PageSnapshot<'_>,
    json: bool,
    output_path: Option<&Path>,
) -> Result<()> {
    if let Some(path) = output_path {
        write_json_pretty(path, snapshot)?;
    }

    if json {
        write_json_stdout(snapshot)
    } else {
        write_text_snapshot(snapshot)
    }
}

pub(super) fn write_json_stdout<T: Serialize>(value: &T) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, value).context("failed to serialize json output")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

fn write_text_snapshot(snapshot: &PageSnapshot<'_>) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    let page = snapshot.page;

    writeln!(
        output,
        "Run: {}\tLane: {}\tState: {}",
        snapshot.context.run_id, snapshot.context.active_lane, snapshot.state
    )?;
    writeln!(output, "Endpoint: {}", snapshot.endpoint)?;

    match page.panel() {
        Some(Panel::Flag(panel)) => {
            writeln!(
                output,
                "{} {}\t[{}]",
                panel.heading,
                panel.summary(),
                panel.state
            )?;
        }
        Some(Panel::Failure { message }) => writeln!(output, "{message}")?,
        Some(Panel::Empty) | None => writeln!(output, "(no flag panel)")?,
    }

    if let Some(trigger) = page.trigger() {
        let status = if trigger.enabled { "enabled" } else { "disabled" };
        writeln!(output, "Trigger: {} ({status})", trigger.text)?;
    }
    if let Some(state) = page.sidebar_state() {
        writeln!(output, "Sidebar: {state}")?;
    }

    if let Some(browser) = &page.browser {
        writeln!(output, "Tabs: {}", browser.tabs.len())?;
        for tab in &browser.tabs {
            let marker = if tab.active { "*" } else { "" };
            let state = tab.state.map(|state| state.as_class()).unwrap_or("-");
            writeln!(output, "\t{}{marker}\t{state}", tab.lane)?;
        }
    }
    writeln!(output, "Internal sections revealed: {}", snapshot.revealed_sections)?;

    output.flush()?;
    Ok(())
}
