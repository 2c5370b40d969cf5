#![deny(clippy::all, clippy::pedantic)]

use reqwest::{Client, Method, Response, Url};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::args::Cli;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("public URL is required (use --public-url or REPORTER_PUBLIC_URL)")]
    MissingPublic,
    #[error("admin URL is required (use --admin-url or REPORTER_ADMIN_URL)")]
    MissingAdmin,
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("URL cannot carry path segments: {0}")]
    UrlBase(Url),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server error: {0}")]
    Server(String),
}

/// Which listener a request goes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Listener {
    Public,
    Admin,
}

#[derive(Clone, Debug)]
pub struct Ctx {
    pub client: Client,
    pub public: Option<Url>,
    pub admin: Option<Url>,
}

impl Ctx {
    pub fn new(public: Option<&str>, admin: Option<&str>) -> Result<Self, CliError> {
        let public = public.map(parse_base).transpose()?;
        let admin = admin.map(parse_base).transpose()?;
        let client = Client::builder().user_agent(Self::user_agent()).build()?;
        Ok(Self {
            client,
            public,
            admin,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("reporter-cli/", env!("CARGO_PKG_VERSION"))
    }

    /// Join `segments` onto the listener's base URL, percent-encoding each one.
    pub fn url(&self, listener: Listener, segments: &[&str]) -> Result<Url, CliError> {
        let base = match listener {
            Listener::Public => self.public.as_ref().ok_or(CliError::MissingPublic)?,
            Listener::Admin => self.admin.as_ref().ok_or(CliError::MissingAdmin)?,
        };
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| CliError::UrlBase(base.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn request<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        listener: Listener,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<T, CliError> {
        let url = self.url(listener, segments)?;
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        Self::handle(resp).await
    }

    pub async fn request_no_body(
        &self,
        method: Method,
        listener: Listener,
        segments: &[&str],
    ) -> Result<(), CliError> {
        let url = self.url(listener, segments)?;
        let resp = self.client.request(method, url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(CliError::Server(format!("status {status} body {text}")));
        }
        Ok(())
    }

    async fn handle<T: DeserializeOwned>(resp: Response) -> Result<T, CliError> {
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes).into_owned();
            return Err(CliError::Server(format!("status {status} body {text}")));
        }
        let val = serde_json::from_slice(&bytes)
            .map_err(|e| CliError::Server(format!("failed to parse body: {e}")))?;
        Ok(val)
    }
}

fn parse_base(raw: &str) -> Result<Url, CliError> {
    Ok(Url::parse(raw)?)
}

pub fn build_ctx_from_cli(cli: &Cli) -> Result<Ctx, CliError> {
    Ctx::new(cli.public_url.as_deref(), cli.admin_url.as_deref())
}
