use anyhow::Result;
use tracing::info;

use crate::cli::DetectArgs;
use crate::context::{PageLocation, should_activate_internal_features};

pub fn run(args: DetectArgs) -> Result<()> {
    let path = if args.location.contains("://") {
        PageLocation::parse(&args.location)?.path
    } else {
        args.location.clone()
    };

    let internal = should_activate_internal_features(&path);
    info!(path = %path, internal, "checked report location");
    println!("{}", if internal { "internal" } else { "customer" });
    Ok(())
}
