use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "edgen-lui",
    version,
    about = "Lane usability flags for internal sequencing run reports"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Report whether a report path enables internal features.
    Detect(DetectArgs),
    /// Show what the widget would see on a saved report.
    Inspect(InspectArgs),
    /// Load the lane flags for a report page and render them.
    Show(ShowArgs),
    /// Set the usable flag for the report's active lane.
    Set(SetArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DetectArgs {
    /// Page URL or path of the report.
    pub location: String,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    #[arg(long)]
    pub report: PathBuf,

    /// URL the report is served from; defaults to the report's file name.
    #[arg(long)]
    pub url: Option<String>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct LimsArgs {
    /// URL the report page is served from. The LIMS endpoint lives on the
    /// same origin.
    #[arg(long)]
    pub url: String,

    /// Saved report HTML supplying the run id and lane tabs.
    #[arg(long)]
    pub report: Option<PathBuf>,

    #[arg(long)]
    pub run_id: Option<String>,

    #[arg(long)]
    pub lane: Option<String>,

    #[arg(long, default_value_t = false)]
    pub allow_insecure: bool,

    /// Ignore proxy settings from the environment when talking to the LIMS.
    #[arg(long, default_value_t = false)]
    pub no_proxy: bool,

    #[arg(long, env = "LUI_USER")]
    pub user: Option<String>,

    #[arg(long, env = "LUI_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[arg(long, env = "LUI_COOKIE", hide_env_values = true)]
    pub cookie: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    #[command(flatten)]
    pub lims: LimsArgs,

    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Also write a JSON snapshot of the rendered page here.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct SetArgs {
    #[command(flatten)]
    pub lims: LimsArgs,

    #[arg(long, value_enum)]
    pub usable: Option<UsableChoice>,

    /// Remarks for the flag; keeps the current remarks when omitted.
    #[arg(long)]
    pub reason: Option<String>,

    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum UsableChoice {
    Yes,
    No,
}

impl UsableChoice {
    pub fn as_bool(self) -> bool {
        matches!(self, Self::Yes)
    }
}
