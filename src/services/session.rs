// src/services/session.rs

//! Portal session management.
//!
//! Owns the authenticated web session and implements the two-phase
//! authentication protocol: restore saved cookies and probe the
//! academic-history link; fall back to a full identity-provider login
//! when the probe shows the session is stale.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{CredentialsConfig, HttpConfig, PortalConfig};
use crate::services::PageSource;
use crate::services::browser::{FormMatcher, WebSession};
use crate::storage::CookieFile;

/// Selector for the identity-provider login form.
const LOGIN_FORM_SELECTOR: &str = "form[action^=\"/adfs/ls\"]";

/// Outcome of the session probe.
///
/// A missing academic-history link is an expected signal here, not an
/// error: it means the restored cookies no longer carry a valid session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The restored session reached the academic-history page.
    Authenticated,
    /// The session is stale or absent; run the full login sub-protocol.
    NeedsFullLogin,
}

/// Manages the single authenticated portal session for the process.
pub struct SessionManager {
    session: WebSession,
    cookie_file: CookieFile,
    portal: PortalConfig,
    credentials: CredentialsConfig,
}

impl SessionManager {
    pub fn new(
        http: &HttpConfig,
        portal: PortalConfig,
        credentials: CredentialsConfig,
        cookie_file: CookieFile,
    ) -> Result<Self> {
        Ok(Self {
            session: WebSession::new(http)?,
            cookie_file,
            portal,
            credentials,
        })
    }

    /// Authenticate and return the academic-history page markup.
    ///
    /// Tries the cookie fast path first; on a failed probe the snapshot
    /// is discarded and the full login runs. Either way the cookie
    /// snapshot is rewritten on success. Errors propagate to the caller;
    /// there is no retry at this level.
    pub async fn authenticate(&mut self) -> Result<String> {
        self.cookie_file.load(&mut self.session)?;

        self.session.open(&self.portal.base_url).await?;
        self.session
            .submit_form(FormMatcher::PostMethod, &[])
            .await?;
        self.session
            .submit_form(FormMatcher::PostMethod, &[])
            .await?;

        match self.probe().await? {
            ProbeOutcome::Authenticated => {
                log::info!("Successfully logged in with saved cookies");
            }
            ProbeOutcome::NeedsFullLogin => {
                self.cookie_file.clear()?;
                self.full_login().await?;
            }
        }

        self.cookie_file.save(&self.session)?;
        Ok(self.session.page().to_string())
    }

    /// Try to reach the academic-history page with the current session.
    async fn probe(&mut self) -> Result<ProbeOutcome> {
        match self.session.follow_link(&self.portal.history_path).await {
            Ok(()) => Ok(ProbeOutcome::Authenticated),
            Err(AppError::LinkNotFound(_)) => Ok(ProbeOutcome::NeedsFullLogin),
            Err(e) => Err(e),
        }
    }

    /// Full credential login: submit the identity-provider form, then
    /// the two intermediate POST forms of the redirect chain, pausing
    /// between steps so server-side state can settle.
    async fn full_login(&mut self) -> Result<()> {
        let credentials = self.credentials.resolve()?;

        log::info!("Logging in:");
        self.session
            .submit_form(
                FormMatcher::Css(LOGIN_FORM_SELECTOR),
                &[
                    ("UserName", credentials.username.as_str()),
                    ("Password", credentials.password.as_str()),
                ],
            )
            .await?;
        self.settle().await;

        log::info!("1/3...");
        self.session
            .submit_form(FormMatcher::PostMethod, &[])
            .await?;

        log::info!("2/3...");
        self.settle().await;
        self.session
            .submit_form(FormMatcher::PostMethod, &[])
            .await?;

        log::info!("3/3...");
        self.settle().await;

        self.session.follow_link(&self.portal.history_path).await
    }

    async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(self.portal.settle_ms)).await;
    }
}

#[async_trait]
impl PageSource for SessionManager {
    async fn fetch_history_page(&mut self) -> Result<String> {
        self.authenticate().await
    }
}
