use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::COOKIE;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{Credentials, LimsConfig};
use crate::context::FlagEndpoint;
use crate::model::{FlagEdit, FlagSet};

#[derive(Debug, Error)]
pub enum LuiError {
    #[error("failed to load usable/unusable flags for run {run_id}: {detail}")]
    LoadFailed { run_id: String, detail: String },
    #[error("failed to save usable/unusable flags for run {run_id}: {detail}")]
    SaveFailed { run_id: String, detail: String },
}

impl LuiError {
    fn load(run_id: &str, detail: impl ToString) -> Self {
        Self::LoadFailed {
            run_id: run_id.to_string(),
            detail: detail.to_string(),
        }
    }

    fn save(run_id: &str, detail: impl ToString) -> Self {
        Self::SaveFailed {
            run_id: run_id.to_string(),
            detail: detail.to_string(),
        }
    }
}

/// The remote flag store. Reads return the whole run; writes patch one lane.
pub trait FlagStore {
    fn fetch_flags(&self, run_id: &str) -> Result<FlagSet, LuiError>;

    fn put_flag(&self, run_id: &str, edit: &FlagEdit) -> Result<(), LuiError>;
}

/// LIMS-backed store speaking the `lims_run_info` JSON contract.
#[derive(Debug, Clone)]
pub struct HttpFlagStore {
    http: Client,
    endpoint: FlagEndpoint,
    credentials: Credentials,
}

impl HttpFlagStore {
    pub fn new(endpoint: FlagEndpoint, config: &LimsConfig) -> Result<Self, reqwest::Error> {
        let mut builder =
            Client::builder().user_agent(concat!("edgen-lui/", env!("CARGO_PKG_VERSION")));
        if config.no_proxy {
            builder = builder.no_proxy();
        }
        Ok(Self::with_client(
            builder.build()?,
            endpoint,
            config.credentials.clone(),
        ))
    }

    pub fn with_client(http: Client, endpoint: FlagEndpoint, credentials: Credentials) -> Self {
        Self {
            http,
            endpoint,
            credentials,
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let mut request = request;
        if let Some((user, password)) = &self.credentials.basic {
            request = request.basic_auth(user, password.as_deref());
        }
        if let Some(cookie) = &self.credentials.cookie {
            request = request.header(COOKIE, cookie);
        }
        request
    }
}

impl FlagStore for HttpFlagStore {
    fn fetch_flags(&self, run_id: &str) -> Result<FlagSet, LuiError> {
        let url = self.endpoint.flags_url(run_id);
        debug!(url = %url, "fetching lane flags");

        let response = self
            .authorize(self.http.get(&url))
            .send()
            .map_err(|err| LuiError::load(run_id, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LuiError::load(run_id, format!("unexpected status {status}")));
        }

        let flags: FlagSet = response
            .json()
            .map_err(|err| LuiError::load(run_id, format!("malformed flags payload: {err}")))?;
        info!(run_id, lanes = flags.len(), "loaded lane flags");
        Ok(flags)
    }

    fn put_flag(&self, run_id: &str, edit: &FlagEdit) -> Result<(), LuiError> {
        let url = self.endpoint.flags_url(run_id);
        debug!(url = %url, lane = %edit.lane, qc = edit.qc, "saving lane flag");

        let response = self
            .authorize(self.http.put(&url))
            .json(&edit.to_flag_set())
            .send()
            .map_err(|err| LuiError::save(run_id, err))?;

        // The body is ignored; the status alone says whether the LIMS took it.
        let status = response.status();
        if !status.is_success() {
            return Err(LuiError::save(run_id, format!("unexpected status {status}")));
        }

        info!(run_id, lane = %edit.lane, qc = edit.qc, "saved lane flag");
        Ok(())
    }
}
