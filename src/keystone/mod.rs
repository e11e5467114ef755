//! Password authentication against the Identity v3 API.


use std::fs;
use std::time::Duration;

use anyhow::{anyhow, Context};
use log::debug;
use reqwest::{Certificate, Identity, StatusCode, Url};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::Options;
use crate::types::auth::{AuthRequest, AuthResponse, DomainRef, MIME_JSON, SUBJECT_TOKEN_HEADER};
use crate::types::token::Token;

const IDENTITY_VERSION: &str = "v3";

pub const MISSING_PASSWORD: &str = "You must provide a password to authenticate";
pub const MISSING_USERNAME: &str = "You must provide a username to authenticate";
pub const INVALID_DOMAIN: &str =
    "You must provide exactly one of DomainID or DomainName to authenticate by Username";
pub const INCOMPLETE_CLIENT_CERT: &str =
    "You must provide both client certificate and key to use client authentication";

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("{0}")]
    Validation(String),

    #[error("Identity service rejected request: code {code}, {message}")]
    Authentication { code: u16, message: String },

    #[error("Transport error: {0:#}")]
    Transport(#[from] anyhow::Error),

    #[error("Token request was cancelled")]
    Cancelled,
}

impl TokenError {
    /// The HTTP status returned by the identity service, if it answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            TokenError::Authentication { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status_code() == Some(StatusCode::UNAUTHORIZED.as_u16())
    }
}

/// Exchange the password credentials in `opts` for a token.
///
/// Invalid options are rejected before any request is made. Otherwise
/// exactly one `POST {endpoint}/v3/auth/tokens` is issued, with no retry. If
/// `cancel` fires before the exchange completes, [`TokenError::Cancelled`]
/// is returned.
pub async fn get_token(cancel: &CancellationToken, opts: &Options) -> Result<Token, TokenError> {
    let body = build_request(opts)?;
    let url = tokens_url(&opts.endpoint)?;
    let client = build_client(opts)?;

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!("Token request to '{url}' cancelled");
            Err(TokenError::Cancelled)
        }
        result = exchange(&client, url.clone(), &body) => result,
    }
}

fn build_request(opts: &Options) -> Result<AuthRequest, TokenError> {
    if opts.password.is_empty() {
        return Err(TokenError::Validation(MISSING_PASSWORD.to_string()));
    }
    if opts.username.is_empty() {
        return Err(TokenError::Validation(MISSING_USERNAME.to_string()));
    }

    let domain = match (opts.domain_id.is_empty(), opts.domain_name.is_empty()) {
        (true, false) => DomainRef::by_name(&opts.domain_name),
        (false, true) => DomainRef::by_id(&opts.domain_id),
        _ => return Err(TokenError::Validation(INVALID_DOMAIN.to_string())),
    };

    Ok(AuthRequest::password(domain, &opts.username, &opts.password))
}

/// Identity v3 lives under `/v3`. A trailing version segment such as
/// `/v2.0` or `/v3` is replaced, a bare endpoint gets `/v3` appended.
fn tokens_url(endpoint: &str) -> Result<Url, TokenError> {
    let endpoint = endpoint.trim_end_matches('/');
    let base = match endpoint.rsplit_once('/') {
        Some((base, segment)) if is_version_segment(segment) => base,
        _ => endpoint,
    };
    let url = match Url::parse(&format!("{base}/{IDENTITY_VERSION}/auth/tokens")) {
        Ok(url) => url,
        Err(_) => {
            return Err(TokenError::Validation(format!(
                "Invalid identity endpoint '{endpoint}'"
            )))
        }
    };
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(TokenError::Validation(format!(
            "Invalid identity endpoint scheme, expect 'http' or 'https', not '{scheme}'"
        ))),
    }
}

fn is_version_segment(segment: &str) -> bool {
    match segment.strip_prefix('v') {
        Some(version) => {
            version.starts_with(|c: char| c.is_ascii_digit())
                && version.chars().all(|c| c.is_ascii_digit() || c == '.')
        }
        None => false,
    }
}

fn build_client(opts: &Options) -> Result<reqwest::Client, TokenError> {
    let mut builder = reqwest::Client::builder();
    if opts.timeout_secs > 0 {
        builder = builder.timeout(Duration::from_secs(opts.timeout_secs));
    }

    if !opts.ca_cert_path.is_empty() {
        let data = fs::read(&opts.ca_cert_path)
            .with_context(|| format!("read ca cert file '{}'", opts.ca_cert_path))?;
        let cert = Certificate::from_pem(&data).context("load ca cert")?;
        builder = builder.add_root_certificate(cert);
    }

    match (
        opts.client_cert_path.is_empty(),
        opts.client_key_path.is_empty(),
    ) {
        (true, true) => {}
        (false, false) => {
            let cert = fs::read(&opts.client_cert_path)
                .with_context(|| format!("read client cert file '{}'", opts.client_cert_path))?;
            let key = fs::read(&opts.client_key_path)
                .with_context(|| format!("read client key file '{}'", opts.client_key_path))?;
            let identity =
                Identity::from_pkcs8_pem(&cert, &key).context("load client certificate")?;
            builder = builder.identity(identity);
        }
        _ => return Err(TokenError::Validation(INCOMPLETE_CLIENT_CERT.to_string())),
    }

    let client = builder.build().context("build http client")?;
    Ok(client)
}

async fn exchange(
    client: &reqwest::Client,
    url: Url,
    body: &AuthRequest,
) -> Result<Token, TokenError> {
    debug!("Requesting token from '{url}'");
    let resp = client
        .post(url)
        .header("Accept", MIME_JSON)
        .json(body)
        .send()
        .await
        .context("send token request")?;

    let status = resp.status();
    if status != StatusCode::CREATED {
        let message = resp.text().await.unwrap_or_default();
        debug!("Identity service returned status {status}");
        return Err(TokenError::Authentication {
            code: status.as_u16(),
            message: message.trim().to_string(),
        });
    }

    let id = match resp.headers().get(SUBJECT_TOKEN_HEADER) {
        Some(value) => value
            .to_str()
            .with_context(|| format!("invalid {SUBJECT_TOKEN_HEADER} header"))?
            .to_string(),
        None => return Err(anyhow!("missing {SUBJECT_TOKEN_HEADER} header").into()),
    };
    if id.is_empty() {
        return Err(anyhow!("empty {SUBJECT_TOKEN_HEADER} header").into());
    }

    let data = resp.bytes().await.context("read token response body")?;
    let data: AuthResponse =
        serde_json::from_slice(&data).context("parse token response json")?;

    debug!("Token issued, expires at {}", data.token.expires_at);
    Ok(Token::new(id, data.token.expires_at))
}
