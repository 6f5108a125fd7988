//! CLI command implementations.

pub mod admin;
pub mod attach;
pub mod branch;
pub mod status;
pub mod sync;

use crate::client::ReqwestClient;
use crate::config::Identity;
use ngh_storage::DiskWorkspace;
use ngh_sync_engine::{load_link_state, GithubRemote, Repository, SyncError};
use std::path::Path;

/// The remote every command talks to.
pub type Remote = GithubRemote<ReqwestClient>;

/// A working directory on disk paired with its GitHub repository.
pub type CliRepository = Repository<Remote, DiskWorkspace>;

/// Connects to `repository` (`owner/name`) as `identity`.
pub fn connect(identity: &Identity, repository: &str) -> Result<Remote, Box<dyn std::error::Error>> {
    let client = ReqwestClient::new(identity)?;
    Ok(GithubRemote::new(&identity.api_url, repository, client))
}

/// Opens the linked working directory containing `path`.
pub fn open_linked(path: &Path) -> Result<CliRepository, Box<dyn std::error::Error>> {
    let workspace = DiskWorkspace::discover(path).map_err(SyncError::from)?;
    let state = load_link_state(&workspace)?.ok_or_else(|| SyncError::NotLinked {
        path: path.display().to_string(),
    })?;

    let identity = Identity::from_env()?;
    let remote = connect(&identity, &state.repository)?;
    Ok(Repository::new(remote, workspace, identity.engine_config()))
}
