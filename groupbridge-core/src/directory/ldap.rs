use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry, SearchResult};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::{DirectoryClient, DirectoryEntry, Filter};
use crate::error::{ResolverError, ResolverResult};
use crate::settings::directory::DirectorySettings;

/// Minimum time between two connection attempts after a failure.
const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

const RC_SUCCESS: u32 = 0;
const RC_TIME_LIMIT_EXCEEDED: u32 = 3;
const RC_SIZE_LIMIT_EXCEEDED: u32 = 4;

#[derive(Default)]
struct Connection {
    ldap: Option<Ldap>,
    last_failure: Option<Instant>,
}

/// Directory client backed by an LDAP server.
///
/// The connection is opened and bound on first use and then reused. A failed
/// proxy-agent bind falls back to an anonymous bind. When no connection can
/// be established every search returns no entries. A new attempt is made
/// once `RECONNECT_BACKOFF` has passed since the last failure.
pub struct LdapDirectoryClient {
    settings: DirectorySettings,
    connection: Mutex<Connection>,
}

/// Entries of a finished search. Time and size limit results still carry
/// the entries the server sent before stopping.
fn accepted_entries(
    rc: u32,
    text: &str,
    base: &str,
    entries: Vec<DirectoryEntry>,
) -> Vec<DirectoryEntry> {
    match rc {
        RC_SUCCESS => entries,
        RC_TIME_LIMIT_EXCEEDED | RC_SIZE_LIMIT_EXCEEDED => {
            warn!(
                rc,
                base = %base,
                returned = entries.len(),
                "Directory search hit a server limit ({}), results are partial",
                text
            );
            entries
        }
        _ => {
            debug!(rc, base = %base, "No entries returned from search: {}", text);
            vec![]
        }
    }
}

impl LdapDirectoryClient {
    pub fn new(settings: DirectorySettings) -> Self {
        Self {
            settings,
            connection: Mutex::new(Connection::default()),
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.settings.connection_timeout_secs)
    }

    async fn connect(&self) -> ResolverResult<Ldap> {
        let url = &self.settings.url;
        debug!(url = %url, "Connecting to LDAP server");

        let conn_settings = LdapConnSettings::new().set_conn_timeout(self.timeout());
        let (conn, mut ldap) = LdapConnAsync::with_settings(conn_settings, url)
            .await
            .map_err(|e| {
                ResolverError::DirectoryUnavailable(format!(
                    "Failed to connect to LDAP server at {}: {}",
                    url, e
                ))
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        if let Some(proxy_agent) = &self.settings.proxy_agent {
            debug!(bind_dn = %proxy_agent.dn, "Binding as proxy agent");
            match ldap
                .simple_bind(&proxy_agent.dn, proxy_agent.password.expose_secret())
                .await
            {
                Ok(result) if result.rc == 0 => {
                    info!(url = %url, "LDAP connection established as proxy agent");
                    return Ok(ldap);
                }
                Ok(result) => warn!(
                    rc = result.rc,
                    "Proxy agent bind rejected ({}), continuing with anonymous bind",
                    result.text
                ),
                Err(e) => warn!(
                    error = %e,
                    "Proxy agent bind failed, continuing with anonymous bind"
                ),
            }
        }

        let result = ldap.simple_bind("", "").await.map_err(|e| {
            ResolverError::DirectoryUnavailable(format!("Anonymous LDAP bind failed: {}", e))
        })?;
        if result.rc != 0 {
            return Err(ResolverError::DirectoryUnavailable(format!(
                "Anonymous LDAP bind failed with code {}: {}",
                result.rc, result.text
            )));
        }

        info!(url = %url, "LDAP connection established with anonymous bind");
        Ok(ldap)
    }

    /// Handle of the bound connection, connecting first when needed. Within
    /// the backoff after a failed attempt no connection is tried.
    async fn handle(&self) -> Option<Ldap> {
        let mut guard = self.connection.lock().await;
        if let Some(ldap) = guard.ldap.as_ref() {
            return Some(ldap.clone());
        }
        if let Some(failed_at) = guard.last_failure {
            if failed_at.elapsed() < RECONNECT_BACKOFF {
                debug!("Directory unavailable, next connection attempt after backoff");
                return None;
            }
        }

        match self.connect().await {
            Ok(ldap) => {
                guard.ldap = Some(ldap.clone());
                guard.last_failure = None;
                Some(ldap)
            }
            Err(e) => {
                warn!("{}", e);
                guard.last_failure = Some(Instant::now());
                None
            }
        }
    }

    async fn reset(&self) {
        let mut guard = self.connection.lock().await;
        guard.ldap = None;
    }

    async fn run_search(
        &self,
        base: &str,
        scope: Scope,
        filter: &str,
        attributes: &[&str],
    ) -> Vec<DirectoryEntry> {
        let Some(mut ldap) = self.handle().await else {
            return vec![];
        };

        let SearchResult(entries, result) = match ldap
            .with_timeout(self.timeout())
            .search(base, scope, filter, attributes.to_vec())
            .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, base = %base, "LDAP search failed, dropping connection");
                self.reset().await;
                return vec![];
            }
        };

        let entries = entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| DirectoryEntry {
                dn: entry.dn,
                attrs: entry.attrs.into_iter().collect(),
            })
            .collect();
        accepted_entries(result.rc, &result.text, base, entries)
    }
}

#[async_trait]
impl DirectoryClient for LdapDirectoryClient {
    async fn ensure_connected(&self) -> bool {
        self.handle().await.is_some()
    }

    #[instrument(skip(self, filter, attributes), fields(filter = %filter))]
    async fn search(&self, base: &str, filter: &Filter, attributes: &[&str]) -> Vec<DirectoryEntry> {
        self.run_search(base, Scope::Subtree, &filter.to_string(), attributes)
            .await
    }

    async fn read_entry(&self, dn: &str, attributes: &[&str]) -> Option<DirectoryEntry> {
        self.run_search(dn, Scope::Base, "(objectClass=*)", attributes)
            .await
            .into_iter()
            .next()
    }
}

impl std::fmt::Debug for LdapDirectoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapDirectoryClient")
            .field("url", &self.settings.url)
            .finish_non_exhaustive()
    }
}
