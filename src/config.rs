use anyhow::{Result, bail};

use crate::cli::LimsArgs;
use crate::context::PageLocation;

/// What gets attached to every LIMS call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub basic: Option<(String, Option<String>)>,
    pub cookie: Option<String>,
}

impl Credentials {
    pub fn is_empty(&self) -> bool {
        self.basic.is_none() && self.cookie.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct LimsConfig {
    pub location: PageLocation,
    pub allow_insecure: bool,
    pub no_proxy: bool,
    pub credentials: Credentials,
}

impl LimsConfig {
    pub fn from_args(args: &LimsArgs) -> Result<Self> {
        let location = PageLocation::parse(&args.url)?;

        if args.password.is_some() && args.user.is_none() {
            bail!("--password requires --user");
        }

        let credentials = Credentials {
            basic: args
                .user
                .clone()
                .map(|user| (user, args.password.clone())),
            cookie: args.cookie.clone().filter(|cookie| !cookie.is_empty()),
        };

        Ok(Self {
            location,
            allow_insecure: args.allow_insecure,
            no_proxy: args.no_proxy,
            credentials,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> LimsArgs {
        LimsArgs {
            url: "https://reports.example.org/run7/multiqc_report_lane1.html".to_string(),
            report: None,
            run_id: Some("run7".to_string()),
            lane: Some("lane1".to_string()),
            allow_insecure: false,
            no_proxy: false,
            user: None,
            password: None,
            cookie: None,
        }
    }

    #[test]
    fn from_args_collects_location_and_credentials() {
        let mut args = args();
        args.user = Some("qc".to_string());
        args.password = Some("secret".to_string());
        args.cookie = Some(String::new());

        let config = LimsConfig::from_args(&args).expect("config should build");
        assert_eq!(config.location.origin, "https://reports.example.org");
        assert_eq!(
            config.credentials.basic,
            Some(("qc".to_string(), Some("secret".to_string())))
        );
        assert!(config.credentials.cookie.is_none());
        assert!(!config.credentials.is_empty());
    }

    #[test]
    fn from_args_rejects_password_without_user() {
        let mut args = args();
        args.password = Some("secret".to_string());
        assert!(LimsConfig::from_args(&args).is_err());
    }

    #[test]
    fn from_args_rejects_bad_url() {
        let mut args = args();
        args.url = "not a url".to_string();
        assert!(LimsConfig::from_args(&args).is_err());
    }
}
