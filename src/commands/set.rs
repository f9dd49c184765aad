use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::cli::{SetArgs, UsableChoice};
use crate::client::{ClientState, FlagRequest, LaneFlagClient};
use crate::commands::output::{PageSnapshot, write_snapshot};
use crate::commands::session;

pub fn run(args: SetArgs) -> Result<()> {
    let mut session = session::open(&args.lims)?;

    if session.client.state() != ClientState::Loaded {
        write_snapshot(
            &PageSnapshot::new(&session.client, session.revealed_sections),
            args.json,
            args.output.as_deref(),
        )?;
        if let Some(err) = session.client.take_error() {
            return Err(err.into());
        }
        bail!("lane flags are not editable ({})", session.client.state());
    }

    let before = session.client.active_flag();
    let request = edit_active_lane(&mut session.client, args.usable, args.reason.as_deref())?;
    session.client.dispatch(&session.store, &request);

    write_snapshot(
        &PageSnapshot::new(&session.client, session.revealed_sections),
        args.json,
        args.output.as_deref(),
    )?;

    if let Some(err) = session.client.take_error() {
        return Err(err.into());
    }

    let context = session.client.context();
    let tab_state = session
        .client
        .page()
        .tab(&context.active_lane)
        .and_then(|tab| tab.state);
    info!(
        run_id = %context.run_id,
        lane = %context.active_lane,
        before = before.qc_label(),
        after = session.client.active_flag().qc_label(),
        tab = tab_state.map(|state| state.as_class()).unwrap_or("-"),
        "lane flag updated"
    );
    Ok(())
}

/// Fills in the dialog the way a user would and submits it. Remarks are left
/// as loaded unless `reason` is given. Without a Yes/No choice the dialog is
/// cancelled and nothing is sent.
fn edit_active_lane(
    client: &mut LaneFlagClient,
    usable: Option<UsableChoice>,
    reason: Option<&str>,
) -> Result<FlagRequest> {
    let dialog = client.open_editor()?;
    info!(title = dialog.title(), "editing lane flag");
    if let Some(usable) = usable {
        dialog.choose(Some(usable.as_bool()));
    }
    if let Some(reason) = reason {
        dialog.set_reason(reason);
    }

    let Some(request) = client.submit_edit() else {
        let label = client.dialog().label().text.clone();
        client.cancel_edit();
        warn!(label = %label, "flag not saved");
        bail!(
            "lane {} has no usable flag yet; pass --usable yes or --usable no",
            client.context().active_lane
        );
    };
    Ok(request)
}
