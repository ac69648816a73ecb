//! Docker implementation of the runtime adapter.
//!
//! Talks to the terminal VM's Docker engine over HTTP or TLS. Every
//! operation is keyed by the `mt5-terminal-{id}` container name, never
//! by Docker's internal container id, so repeated passes always find
//! the same unit.

use std::collections::HashSet;

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, ListContainersOptions, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions,
};
use bollard::models::{ContainerStateStatusEnum, HostConfig, RestartPolicy, RestartPolicyNameEnum};
use bollard::{API_DEFAULT_VERSION, Docker};
use tracing::{debug, error, info, warn};

use farm_core::{OrchestratorConfig, TerminalId, TerminalSpec};

use crate::error::{RuntimeError, RuntimeResult};
use crate::{ContainerRuntime, ContainerStatus, container_name, terminal_id};

const DOCKER_API_TIMEOUT_SECS: u64 = 30;
/// Grace period given to a terminal before the engine kills it.
const STOP_GRACE_SECS: i64 = 10;
/// 1 GiB per terminal container.
const MEMORY_LIMIT_BYTES: i64 = 1 << 30;

/// Docker-backed [`ContainerRuntime`].
pub struct DockerRuntime {
    docker: Docker,
    image: String,
    journal_url: String,
    webhook_secret: String,
}

impl DockerRuntime {
    /// Connect to the configured Docker endpoint and verify it with a
    /// ping. A dead endpoint here is fatal: the orchestrator cannot do
    /// anything without its runtime.
    pub async fn connect(config: &OrchestratorConfig) -> RuntimeResult<Self> {
        let docker = match &config.docker_cert_path {
            Some(cert_path) if config.docker_tls_verify => Docker::connect_with_ssl(
                &config.docker_host,
                &cert_path.join("key.pem"),
                &cert_path.join("cert.pem"),
                &cert_path.join("ca.pem"),
                DOCKER_API_TIMEOUT_SECS,
                API_DEFAULT_VERSION,
            ),
            _ => Docker::connect_with_http(
                &config.docker_host,
                DOCKER_API_TIMEOUT_SECS,
                API_DEFAULT_VERSION,
            ),
        }
        .map_err(RuntimeError::Connect)?;

        docker.ping().await.map_err(RuntimeError::Connect)?;
        info!(host = %config.docker_host, "docker client connected");

        Ok(Self {
            docker,
            image: config.terminal_image.clone(),
            journal_url: config.journal_url.clone(),
            webhook_secret: config.terminal_webhook_secret.clone(),
        })
    }

    /// Environment injected into a terminal container.
    ///
    /// `API_KEY` is the terminal's webhook secret, a trust
    /// relationship separate from the orchestrator's own control-plane
    /// secret.
    fn terminal_env(&self, spec: &TerminalSpec) -> Vec<String> {
        vec![
            format!("MT5_SERVER={}", spec.server),
            format!("MT5_LOGIN={}", spec.login),
            format!("MT5_PASSWORD={}", spec.password),
            format!("TERMINAL_ID={}", spec.id),
            format!("API_ENDPOINT={}", self.journal_url),
            format!("API_KEY={}", self.webhook_secret),
        ]
    }

    async fn remove_force(&self, name: &str) {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        if let Err(err) = self.docker.remove_container(name, Some(options)).await {
            if !is_not_found(&err) {
                warn!(container = %name, error = %err, "failed to remove container");
            }
        }
    }

    /// Create a fresh container for the spec and start it. If the
    /// start fails the container is removed again so no half-created
    /// unit lingers for the next pass to trip over.
    async fn create_and_start(&self, spec: &TerminalSpec, name: &str) -> bool {
        let config = Config {
            image: Some(self.image.clone()),
            env: Some(self.terminal_env(spec)),
            host_config: Some(HostConfig {
                memory: Some(MEMORY_LIMIT_BYTES),
                restart_policy: Some(RestartPolicy {
                    name: Some(RestartPolicyNameEnum::UNLESS_STOPPED),
                    maximum_retry_count: None,
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        let options = CreateContainerOptions {
            name: name.to_string(),
            platform: None,
        };

        if let Err(err) = self.docker.create_container(Some(options), config).await {
            error!(container = %name, error = %err, "failed to create container");
            return false;
        }

        match self
            .docker
            .start_container(name, None::<StartContainerOptions<String>>)
            .await
        {
            Ok(()) => {
                info!(container = %name, "created and started container");
                true
            }
            Err(err) => {
                error!(container = %name, error = %err, "failed to start created container");
                self.remove_force(name).await;
                false
            }
        }
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_running_ids(&self) -> HashSet<TerminalId> {
        let options = ListContainersOptions::<String> {
            all: true,
            ..Default::default()
        };
        let summaries = match self.docker.list_containers(Some(options)).await {
            Ok(summaries) => summaries,
            Err(err) => {
                error!(error = %err, "failed to list containers, treating actual state as empty");
                return HashSet::new();
            }
        };

        let mut ids = HashSet::new();
        for summary in summaries {
            let running = summary
                .state
                .as_deref()
                .is_some_and(|state| state.eq_ignore_ascii_case("running"));
            if !running {
                continue;
            }
            for name in summary.names.unwrap_or_default() {
                // The engine API reports names with a leading slash.
                if let Some(id) = terminal_id(name.trim_start_matches('/')) {
                    ids.insert(id.to_string());
                    break;
                }
            }
        }
        debug!(count = ids.len(), "listed running terminal containers");
        ids
    }

    async fn create_or_restart(&self, spec: &TerminalSpec) -> RuntimeResult<bool> {
        let missing = spec.missing_credentials();
        if !missing.is_empty() {
            warn!(
                terminal = %spec.id,
                missing = ?missing,
                "refusing to create terminal with incomplete credentials"
            );
            return Ok(false);
        }

        let name = container_name(&spec.id);
        match self.docker.inspect_container(&name, None).await {
            Ok(inspect) => {
                let status = inspect.state.and_then(|s| s.status).and_then(map_status);
                match status {
                    Some(ContainerStatus::Running) => {
                        debug!(container = %name, "container already running");
                        return Ok(true);
                    }
                    Some(status) if status.is_restartable() => {
                        info!(container = %name, %status, "starting existing container");
                        match self
                            .docker
                            .start_container(&name, None::<StartContainerOptions<String>>)
                            .await
                        {
                            Ok(()) => return Ok(true),
                            Err(err) => {
                                warn!(
                                    container = %name,
                                    error = %err,
                                    "failed to start existing container, recreating"
                                );
                                self.remove_force(&name).await;
                            }
                        }
                    }
                    _ => {
                        warn!(
                            container = %name,
                            status = ?status,
                            "container in unexpected state, recreating"
                        );
                        self.remove_force(&name).await;
                    }
                }
            }
            Err(err) if is_not_found(&err) => {}
            Err(err) => {
                error!(container = %name, error = %err, "failed to inspect container");
                return Ok(false);
            }
        }

        Ok(self.create_and_start(spec, &name).await)
    }

    async fn stop_and_remove(&self, id: &str) -> RuntimeResult<bool> {
        let name = container_name(id);
        match self
            .docker
            .stop_container(&name, Some(StopContainerOptions { t: STOP_GRACE_SECS }))
            .await
        {
            Ok(()) => {}
            Err(err) if is_not_found(&err) => {
                debug!(container = %name, "container already absent");
                return Ok(true);
            }
            // 304: already stopped, still needs removing.
            Err(err) if is_not_modified(&err) => {
                debug!(container = %name, "container already stopped");
            }
            Err(err) => {
                error!(container = %name, error = %err, "failed to stop container");
                return Ok(false);
            }
        }

        match self.docker.remove_container(&name, None).await {
            Ok(()) => {
                info!(container = %name, "stopped and removed container");
                Ok(true)
            }
            Err(err) if is_not_found(&err) => Ok(true),
            Err(err) => {
                error!(container = %name, error = %err, "failed to remove container");
                Ok(false)
            }
        }
    }

    async fn status(&self, id: &str) -> RuntimeResult<Option<ContainerStatus>> {
        let name = container_name(id);
        match self.docker.inspect_container(&name, None).await {
            Ok(inspect) => Ok(inspect.state.and_then(|s| s.status).and_then(map_status)),
            Err(err) if is_not_found(&err) => Ok(None),
            Err(err) => Err(RuntimeError::Api(err)),
        }
    }
}

fn map_status(status: ContainerStateStatusEnum) -> Option<ContainerStatus> {
    match status {
        ContainerStateStatusEnum::CREATED => Some(ContainerStatus::Created),
        ContainerStateStatusEnum::RUNNING => Some(ContainerStatus::Running),
        ContainerStateStatusEnum::PAUSED => Some(ContainerStatus::Paused),
        ContainerStateStatusEnum::RESTARTING => Some(ContainerStatus::Restarting),
        ContainerStateStatusEnum::REMOVING => Some(ContainerStatus::Removing),
        ContainerStateStatusEnum::EXITED => Some(ContainerStatus::Exited),
        ContainerStateStatusEnum::DEAD => Some(ContainerStatus::Dead),
        ContainerStateStatusEnum::EMPTY => None,
    }
}

fn is_not_found(err: &bollard::errors::Error) -> bool {
    matches!(
        err,
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}

fn is_not_modified(err: &bollard::errors::Error) -> bool {
    matches!(
        err,
        bollard::errors::Error::DockerResponseServerError {
            status_code: 304,
            ..
        }
    )
}
