//! Application state

use std::path::{Path, PathBuf};
use std::sync::Arc;

use command_runner::CommandRunner;
use plangate_core::artifact::ArtifactStore;
use plangate_core::backend::{CompilerDriver, DatastoreClient};
use plangate_core::dispatch::Gateway;

use crate::config::ServerConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    gateway: Gateway,
    upload_dir: PathBuf,
}

impl AppState {
    /// Wire the gateway to `runner` as described by `config`
    pub fn new(config: &ServerConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let datastore = DatastoreClient::new(Arc::clone(&runner), config.datastore.clone());
        let compiler = CompilerDriver::new(
            runner,
            config.compiler_program.clone(),
            config.compiler_args.clone(),
            &config.artifact_dir,
            config.limits,
        );
        let gateway = Gateway::new(
            datastore,
            compiler,
            ArtifactStore::new(&config.artifact_dir),
            config.public_url.clone(),
        );

        Self {
            inner: Arc::new(AppStateInner {
                gateway,
                upload_dir: config.upload_dir.clone(),
            }),
        }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.inner.gateway
    }

    pub fn upload_dir(&self) -> &Path {
        &self.inner.upload_dir
    }
}
