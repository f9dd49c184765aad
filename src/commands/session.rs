use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::LimsArgs;
use crate::client::LaneFlagClient;
use crate::config::LimsConfig;
use crate::context::{Activation, prepare_page};
use crate::page::ReportPage;
use crate::store::HttpFlagStore;
use crate::util::read_report;

/// A page whose flags have been requested from the LIMS, successfully or not.
pub(super) struct Session {
    pub(super) client: LaneFlagClient,
    pub(super) store: HttpFlagStore,
    pub(super) revealed_sections: usize,
}

pub(super) fn load_page(args: &LimsArgs) -> Result<ReportPage> {
    let mut page = match &args.report {
        Some(path) => ReportPage::parse_html(&read_report(path)?)
            .with_context(|| format!("failed to parse report: {}", path.display()))?,
        None => {
            let (Some(run_id), Some(lane)) = (&args.run_id, &args.lane) else {
                bail!("either --report or both --run-id and --lane are required");
            };
            ReportPage::for_lane(run_id, lane)
        }
    };

    if args.report.is_some() {
        if let Some(run_id) = &args.run_id {
            page.set_run_id(run_id);
        }
        if let Some(lane) = &args.lane {
            page.set_active_lane(lane);
        }
    }

    Ok(page)
}

/// Runs page-ready setup and the initial flag load.
pub(super) fn open(args: &LimsArgs) -> Result<Session> {
    let config = LimsConfig::from_args(args)?;
    let mut page = load_page(args)?;

    let activation = prepare_page(&config.location, &mut page, config.allow_insecure);
    let context = match activation {
        Activation::Active { context } => context,
        Activation::Inert { reason } => {
            bail!("lane usability indicator is inactive: {}", reason.as_str())
        }
    };
    let revealed_sections = page
        .internal_sections
        .iter()
        .filter(|section| section.visible)
        .count();

    if config.credentials.is_empty() {
        info!("no LIMS credentials configured; relying on the endpoint allowing anonymous access");
    }
    let store = HttpFlagStore::new(context.endpoint.clone(), &config)
        .context("failed to build LIMS http client")?;

    let mut client = LaneFlagClient::new(context, page);
    let request = client.initialize()?;
    client.dispatch(&store, &request);

    Ok(Session {
        client,
        store,
        revealed_sections,
    })
}
