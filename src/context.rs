use anyhow::{Context, Result};
use reqwest::Url;
use serde::Serialize;
use tracing::{debug, info};

use crate::page::ReportPage;

pub const INTERNAL_REPORT_PREFIX: &str = "multiqc_report_";
pub const FLAGS_PATH_PREFIX: &str = "/lims_run_info/v1/run/";

/// True iff the last path segment names an internal report
/// (`multiqc_report_*`). Customer copies of the report are renamed on release.
pub fn should_activate_internal_features(path: &str) -> bool {
    path.rsplit('/')
        .next()
        .is_some_and(|segment| segment.starts_with(INTERNAL_REPORT_PREFIX))
}

/// Where the report is being served from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLocation {
    pub origin: String,
    pub path: String,
    pub secure: bool,
}

impl PageLocation {
    pub fn parse(url: &str) -> Result<Self> {
        let parsed = Url::parse(url).with_context(|| format!("invalid page url: {url}"))?;
        Ok(Self {
            origin: parsed.origin().ascii_serialization(),
            path: parsed.path().to_string(),
            secure: parsed.scheme() == "https",
        })
    }

    /// A report opened straight from disk: no origin, no scheme.
    pub fn from_file_path(path: &str) -> Self {
        Self {
            origin: String::new(),
            path: path.to_string(),
            secure: false,
        }
    }
}

/// `{origin}/lims_run_info/v1/run/{run_id}/flags`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagEndpoint {
    base: String,
}

impl FlagEndpoint {
    pub fn for_origin(origin: &str) -> Self {
        Self {
            base: format!("{}{}", origin.trim_end_matches('/'), FLAGS_PATH_PREFIX),
        }
    }

    pub fn flags_url(&self, run_id: &str) -> String {
        format!("{}{}/flags", self.base, run_id)
    }
}

/// Everything the flag widget needs about its page, fixed once at setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportContext {
    pub run_id: String,
    pub active_lane: String,
    pub endpoint: FlagEndpoint,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InertReason {
    CustomerReport,
    NoPageBrowser,
    OverviewOnly,
    MissingRunId,
    NoActiveLane,
    BrowserHidden,
    InsecureOrigin,
}

impl InertReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CustomerReport => "report is not an internal multiqc_report_* page",
            Self::NoPageBrowser => "page has no lane browser",
            Self::OverviewOnly => "lane browser is in overview mode",
            Self::MissingRunId => "lane browser carries no run id",
            Self::NoActiveLane => "no lane tab is marked active",
            Self::BrowserHidden => "lane browser is hidden",
            Self::InsecureOrigin => "page is not served over https",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Activation {
    Active { context: ReportContext },
    Inert { reason: InertReason },
}

/// Page-ready setup: reveals internal sections for internal reports, then
/// decides whether the flag widget runs and with which context.
pub fn prepare_page(
    location: &PageLocation,
    page: &mut ReportPage,
    allow_insecure: bool,
) -> Activation {
    if !should_activate_internal_features(&location.path) {
        info!(path = %location.path, "treating report as a stand-alone report");
        return Activation::Inert {
            reason: InertReason::CustomerReport,
        };
    }

    let revealed = page.reveal_internal_sections();
    debug!(revealed, "revealed internal report sections");

    let reason = match page.browser.as_ref() {
        None => Some(InertReason::NoPageBrowser),
        Some(browser) if !browser.full => Some(InertReason::OverviewOnly),
        Some(browser) if browser.run_id.as_deref().is_none_or(str::is_empty) => {
            Some(InertReason::MissingRunId)
        }
        Some(_) if page.active_lane().is_none() => Some(InertReason::NoActiveLane),
        Some(browser) if browser.hidden => Some(InertReason::BrowserHidden),
        Some(_) if !location.secure && !allow_insecure => Some(InertReason::InsecureOrigin),
        Some(_) => None,
    };
    if let Some(reason) = reason {
        info!(reason = reason.as_str(), "skipping lane usability indicator");
        return Activation::Inert { reason };
    }

    let (Some(run_id), Some(active_lane)) = (page.run_id(), page.active_lane()) else {
        return Activation::Inert {
            reason: InertReason::NoPageBrowser,
        };
    };

    let context = ReportContext {
        run_id: run_id.to_string(),
        active_lane: active_lane.to_string(),
        endpoint: FlagEndpoint::for_origin(&location.origin),
    };
    info!(run_id = %context.run_id, lane = %context.active_lane, "looking at run lane");
    Activation::Active { context }
}
