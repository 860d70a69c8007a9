//! Clears stored data kind by kind over the local and server scopes.
//!
//! Calls are made one at a time. The first failure stops the run and is
//! reported once, as a failed [`CleanupOutcome`].
//!
//! The CLI registers only the local [`Store`](crate::study::data::Store).
//! Server adapters are registered by embedders through
//! [`CleanupService::with_server`].

use std::fmt;

use anyhow::Result;
use thiserror::Error;
use tracing::{error, info};

/// Result of clearing study records, as reported by an adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct OperationResult {
    removed: usize,
    error: Option<String>,
}

impl OperationResult {
    pub fn ok(removed: usize) -> Self {
        Self {
            removed,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            removed: 0,
            error: Some(error.into()),
        }
    }

    pub fn failed(&self) -> bool {
        self.error.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn removed(&self) -> usize {
        self.removed
    }
}

/// Storage that knows how to forget each kind of data it holds.
pub trait CleanupAdapter {
    fn clear_studies(&mut self) -> OperationResult;
    fn clear_user_data(&mut self) -> Result<()>;
    fn clear_system_data(&mut self) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DataKind {
    Studies,
    UserData,
    SystemData,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataKind::Studies => "studies",
            DataKind::UserData => "user data",
            DataKind::SystemData => "system data",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Scope {
    Local,
    Server,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Scope::Local => "local",
            Scope::Server => "server",
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CleanupRequest {
    scopes: Vec<Scope>,
    kinds: Vec<DataKind>,
}

impl CleanupRequest {
    /// Scopes and kinds are put in canonical order with duplicates dropped.
    pub fn new(
        scopes: impl IntoIterator<Item = Scope>,
        kinds: impl IntoIterator<Item = DataKind>,
    ) -> Self {
        let mut scopes: Vec<_> = scopes.into_iter().collect();
        scopes.sort();
        scopes.dedup();
        let mut kinds: Vec<_> = kinds.into_iter().collect();
        kinds.sort();
        kinds.dedup();
        Self { scopes, kinds }
    }

    fn is_empty(&self) -> bool {
        self.scopes.is_empty() || self.kinds.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CleanupOutcome {
    pub success: bool,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum CleanupError {
    #[error("no {0} adapter configured")]
    MissingAdapter(Scope),

    #[error("failed to clear {scope} studies: {reason}")]
    Studies { scope: Scope, reason: String },

    #[error("failed to clear {scope} {kind}: {source:#}")]
    Adapter {
        scope: Scope,
        kind: DataKind,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Default)]
pub struct CleanupService<'a> {
    local: Option<Box<dyn CleanupAdapter + 'a>>,
    server: Option<Box<dyn CleanupAdapter + 'a>>,
}

impl<'a> CleanupService<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_local(mut self, adapter: impl CleanupAdapter + 'a) -> Self {
        self.local = Some(Box::new(adapter));
        self
    }

    #[allow(dead_code)]
    pub fn with_server(mut self, adapter: impl CleanupAdapter + 'a) -> Self {
        self.server = Some(Box::new(adapter));
        self
    }

    pub fn run(&mut self, request: &CleanupRequest) -> CleanupOutcome {
        if request.is_empty() {
            return CleanupOutcome {
                success: true,
                message: "Nothing to clear".to_string(),
            };
        }
        match self.clear_all(request) {
            Ok(()) => {
                let kinds: Vec<_> = request.kinds.iter().map(ToString::to_string).collect();
                let scopes: Vec<_> = request.scopes.iter().map(ToString::to_string).collect();
                CleanupOutcome {
                    success: true,
                    message: format!(
                        "Cleared {} from {} storage",
                        kinds.join(", "),
                        scopes.join(" and ")
                    ),
                }
            }
            Err(e) => {
                error!(error = %e, "cleanup aborted");
                CleanupOutcome {
                    success: false,
                    message: e.to_string(),
                }
            }
        }
    }

    fn clear_all(&mut self, request: &CleanupRequest) -> Result<(), CleanupError> {
        for &scope in &request.scopes {
            let adapter = match scope {
                Scope::Local => self.local.as_deref_mut(),
                Scope::Server => self.server.as_deref_mut(),
            }
            .ok_or(CleanupError::MissingAdapter(scope))?;
            for &kind in &request.kinds {
                clear(&mut *adapter, scope, kind)?;
            }
        }
        Ok(())
    }
}

fn clear(
    adapter: &mut dyn CleanupAdapter,
    scope: Scope,
    kind: DataKind,
) -> Result<(), CleanupError> {
    match kind {
        DataKind::Studies => {
            let result = adapter.clear_studies();
            if result.failed() {
                return Err(CleanupError::Studies {
                    scope,
                    reason: result.error().unwrap_or("unknown error").to_string(),
                });
            }
            info!(%scope, removed = result.removed(), "cleared studies");
        }
        DataKind::UserData => {
            adapter
                .clear_user_data()
                .map_err(|source| CleanupError::Adapter { scope, kind, source })?;
            info!(%scope, "cleared user data");
        }
        DataKind::SystemData => {
            adapter
                .clear_system_data()
                .map_err(|source| CleanupError::Adapter { scope, kind, source })?;
            info!(%scope, "cleared system data");
        }
    }
    Ok(())
}
