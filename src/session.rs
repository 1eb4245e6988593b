//! Internal IMAP session management.
//!
//! This module wraps async-imap operations with proper error handling.

use crate::config::Credentials;
use crate::connection::TlsStream;
use crate::error::{Error, Result};
use async_imap::Session;
use chrono::{DateTime, FixedOffset};
use futures::StreamExt;
use std::collections::HashSet;
use tracing::{debug, instrument};

/// Type alias for IMAP session over TLS.
pub(crate) type ImapSession = Session<TlsStream>;

/// Authentication configuration for IMAP.
pub(crate) struct AuthConfig<'a> {
    pub email: &'a str,
    pub credentials: &'a Credentials,
    pub secret: &'a str,
}

/// SASL XOAUTH2 responder; answers the first challenge with the bearer payload.
struct XOAuth2 {
    payload: String,
}

impl XOAuth2 {
    fn new(email: &str, access_token: &str) -> Self {
        Self {
            payload: xoauth2_payload(email, access_token),
        }
    }
}

impl async_imap::Authenticator for XOAuth2 {
    type Response = String;

    fn process(&mut self, _challenge: &[u8]) -> Self::Response {
        // A second challenge carries the server's error JSON; an empty
        // answer lets it finish with NO.
        std::mem::take(&mut self.payload)
    }
}

/// Builds the unencoded XOAUTH2 initial response.
fn xoauth2_payload(email: &str, access_token: &str) -> String {
    format!("user={email}\x01auth=Bearer {access_token}\x01\x01")
}

/// Authenticates to IMAP server and returns a session.
#[instrument(
    name = "session::authenticate",
    skip_all,
    fields(email = %config.email, mechanism = config.credentials.mechanism())
)]
pub(crate) async fn authenticate(
    tls_stream: TlsStream,
    config: &AuthConfig<'_>,
) -> Result<ImapSession> {
    let client = async_imap::Client::new(tls_stream);

    debug!("Authenticating to IMAP server");

    match config.credentials {
        Credentials::Password(_) => client
            .login(config.email, config.secret)
            .await
            .map_err(|e| Error::ImapLogin {
                email: config.email.to_string(),
                source: e.0,
            }),
        Credentials::AccessToken(_) => client
            .authenticate("XOAUTH2", XOAuth2::new(config.email, config.secret))
            .await
            .map_err(|e| Error::ImapAuthenticate {
                email: config.email.to_string(),
                source: e.0,
            }),
    }
}

/// Selects a mailbox (typically "INBOX").
#[instrument(name = "session::select", skip(session), fields(mailbox = %mailbox))]
pub(crate) async fn select_mailbox(session: &mut ImapSession, mailbox: &str) -> Result<()> {
    debug!("Selecting mailbox");

    session
        .select(mailbox)
        .await
        .map_err(|source| Error::SelectMailbox {
            mailbox: mailbox.to_string(),
            source,
        })?;

    Ok(())
}

/// Builds the UID SEARCH query for an optional sender filter.
pub(crate) fn search_query(sender: Option<&str>) -> String {
    match sender {
        Some(sender) => {
            let escaped = sender.replace('\\', "\\\\").replace('"', "\\\"");
            format!("FROM \"{escaped}\"")
        }
        None => "ALL".to_string(),
    }
}

/// Keeps the `limit` highest UIDs, newest first.
fn newest_uids(uids: HashSet<u32>, limit: usize) -> Vec<u32> {
    let mut sorted: Vec<u32> = uids.into_iter().collect();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    sorted.truncate(limit);
    sorted
}

/// Searches the selected mailbox and returns up to `limit` UIDs, newest first.
#[instrument(name = "session::search_newest", skip(session), fields(query = %query))]
pub(crate) async fn search_newest_uids(
    session: &mut ImapSession,
    query: &str,
    limit: usize,
) -> Result<Vec<u32>> {
    let uids = session
        .uid_search(query)
        .await
        .map_err(|source| Error::ImapSearch {
            query: query.to_string(),
            source,
        })?;

    let total = uids.len();
    let newest = newest_uids(uids, limit);

    debug!(total, kept = newest.len(), "Found messages");

    Ok(newest)
}

/// Raw message bytes as returned by `UID FETCH`.
#[derive(Debug)]
pub(crate) struct RawMessage {
    pub uid: u32,
    pub body: Vec<u8>,
    pub internal_date: Option<DateTime<FixedOffset>>,
}

/// Fetches one message by UID.
///
/// Returns `None` when the server answers without a body, e.g. because the
/// message was expunged between search and fetch.
#[instrument(name = "session::fetch_message", skip(session))]
pub(crate) async fn fetch_message(session: &mut ImapSession, uid: u32) -> Result<Option<RawMessage>> {
    let mut stream = session
        .uid_fetch(uid.to_string(), "(BODY.PEEK[] INTERNALDATE)")
        .await
        .map_err(|source| Error::ImapFetch { uid, source })?;

    let mut found = None;

    // Drain the whole response before the session is reused.
    while let Some(item) = stream.next().await {
        let fetch = item.map_err(|source| Error::FetchMessage { source })?;
        if found.is_some() {
            continue;
        }
        if let Some(body) = fetch.body() {
            found = Some(RawMessage {
                uid: fetch.uid.unwrap_or(uid),
                body: body.to_vec(),
                internal_date: fetch.internal_date(),
            });
        }
    }

    if found.is_none() {
        debug!("Message has no body");
    }

    Ok(found)
}

/// Logs out from IMAP session.
#[instrument(name = "session::logout", skip(session))]
pub(crate) async fn logout(session: &mut ImapSession) -> Result<()> {
    debug!("Logging out");

    session
        .logout()
        .await
        .map_err(|source| Error::ImapLogout { source })?;

    Ok(())
}
