use anyhow::Result;
use serde::Serialize;

use crate::cli::InspectArgs;
use crate::commands::output::write_json_stdout;
use crate::context::{Activation, PageLocation, prepare_page};
use crate::page::ReportPage;
use crate::util::read_report;

#[derive(Debug, Serialize)]
struct InspectReport {
    location: PageLocation,
    activation: Activation,
    page: ReportPage,
}

pub fn run(args: InspectArgs) -> Result<()> {
    let mut page = ReportPage::parse_html(&read_report(&args.report)?)?;

    // A file opened from disk has no scheme, so the https gate does not apply.
    let (location, allow_insecure) = match &args.url {
        Some(url) => (PageLocation::parse(url)?, false),
        None => (
            PageLocation::from_file_path(&args.report.display().to_string()),
            true,
        ),
    };
    let activation = prepare_page(&location, &mut page, allow_insecure);

    let report = InspectReport {
        location,
        activation,
        page,
    };

    if args.json {
        return write_json_stdout(&report);
    }

    println!("Path: {}", report.location.path);
    match &report.activation {
        Activation::Active { context } => {
            println!("Widget: active (run {} lane {})", context.run_id, context.active_lane);
            println!("Endpoint: {}", context.endpoint.flags_url(&context.run_id));
        }
        Activation::Inert { reason } => println!("Widget: inactive ({})", reason.as_str()),
    }
    if let Some(browser) = &report.page.browser {
        let lanes: Vec<&str> = browser.tabs.iter().map(|tab| tab.lane.as_str()).collect();
        println!("Lanes: {}", lanes.join(", "));
    }
    let visible = report
        .page
        .internal_sections
        .iter()
        .filter(|section| section.visible)
        .count();
    println!(
        "Internal sections: {} ({} visible)",
        report.page.internal_sections.len(),
        visible
    );
    Ok(())
}
