//! Wiring one configured game server into running tasks.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use epsilon_deploy::{DeployParams, HardwareIni, OptionsIni, SshManager, StartParams};
use epsilon_rpc::EpsilonClient;
use epsilon_telemetry::{TelemetryDecoder, TelemetryListener};
use epsilon_types::InstanceId;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::InstanceConfig;
use crate::coordinator::{Coordinator, CoordinatorSettings, TelemetrySource};
use crate::error::{CommandError, LaunchError};

/// A running instance: its coordinator, telemetry decoder, optional remote
/// manager and background tasks.
///
/// Dropping the handle stops its tasks.
#[derive(Debug)]
pub struct InstanceHandle {
    config: InstanceConfig,
    coordinator: Arc<Coordinator>,
    decoder: Arc<TelemetryDecoder>,
    ssh: Option<SshManager>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl InstanceHandle {
    /// Assemble an instance without starting any task.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError`] if the RPC client or decoder cannot be built.
    pub fn new(config: InstanceConfig) -> Result<Self, LaunchError> {
        let client = EpsilonClient::new(&config.client_config()).map_err(|source| {
            LaunchError::Client {
                instance: config.id.clone(),
                source,
            }
        })?;
        let decoder = Arc::new(TelemetryDecoder::new(config.telemetry.universe).map_err(
            |source| LaunchError::Telemetry {
                instance: config.id.clone(),
                source,
            },
        )?);

        let coordinator = Arc::new(Coordinator::new(
            config.id.clone(),
            client,
            Arc::clone(&decoder) as Arc<dyn TelemetrySource>,
            CoordinatorSettings::from_config(&config),
        ));
        decoder.set_callback(Some(coordinator.telemetry_trigger()));

        Ok(Self {
            ssh: config.ssh_manager(),
            config,
            coordinator,
            decoder,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Assemble the instance, bind its telemetry socket and start the
    /// listener and coordinator loop.
    ///
    /// With `ssh.start_on_launch`, config is deployed and the game started
    /// first; the first cycle waits out the startup delay.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError`] if assembly fails or the socket cannot be
    /// bound.
    pub async fn launch(config: InstanceConfig) -> Result<Arc<Self>, LaunchError> {
        let listener = TelemetryListener::bind(config.listener_config())
            .await
            .map_err(|source| LaunchError::Telemetry {
                instance: config.id.clone(),
                source,
            })?;
        let handle = Arc::new(Self::new(config)?);

        let listener_task = listener.spawn(Arc::clone(&handle.decoder));

        let startup = Arc::clone(&handle);
        let coordinator_task = tokio::spawn(async move {
            let launch_delay = startup.config.ssh.as_ref().and_then(|ssh| {
                ssh.start_on_launch
                    .then(|| Duration::from_secs(ssh.startup_delay_seconds))
            });
            if let Some(delay) = launch_delay {
                match startup.deploy_and_start(None, None).await {
                    Ok(()) => {
                        info!(
                            instance = %startup.id(),
                            delay_secs = delay.as_secs(),
                            "waiting for EmptyEpsilon to boot"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    Err(e) => {
                        warn!(instance = %startup.id(), error = %e, "launch-time start failed");
                    }
                }
            }
            let coordinator = Arc::clone(&startup.coordinator);
            drop(startup);
            coordinator.run().await;
        });

        handle.track(listener_task);
        handle.track(coordinator_task);
        info!(
            instance = %handle.id(),
            universe = handle.config.telemetry.universe,
            "instance launched"
        );
        Ok(handle)
    }

    fn track(&self, task: JoinHandle<()>) {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(task);
    }

    /// Instance identifier.
    pub const fn id(&self) -> &InstanceId {
        &self.config.id
    }

    /// Configuration the instance was built from.
    pub const fn config(&self) -> &InstanceConfig {
        &self.config
    }

    /// The instance's coordinator.
    pub const fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    /// The instance's telemetry decoder.
    pub const fn decoder(&self) -> &Arc<TelemetryDecoder> {
        &self.decoder
    }

    /// Remote manager, if SSH is configured.
    pub const fn ssh(&self) -> Option<&SshManager> {
        self.ssh.as_ref()
    }

    /// Files that make the game broadcast telemetry for this instance and
    /// serve its HTTP API.
    pub fn deploy_params(&self, http_port: u16, scenario: &str) -> DeployParams {
        let telemetry = &self.config.telemetry;
        DeployParams {
            hardware: HardwareIni {
                universe: telemetry.universe,
                channels: telemetry.channels,
                resend_delay_ms: telemetry.resend_delay_ms,
            },
            options: Some(OptionsIni::for_server(http_port, scenario)),
            hardware_path: None,
            options_path: None,
        }
    }

    /// Push config and start the game.
    ///
    /// `http_port` and `scenario` default to the configured values.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::NoSsh`] without SSH settings and
    /// [`CommandError::Remote`] if either step fails.
    pub async fn deploy_and_start(
        &self,
        http_port: Option<u16>,
        scenario: Option<&str>,
    ) -> Result<(), CommandError> {
        let (ssh, ssh_config) = self
            .ssh
            .as_ref()
            .zip(self.config.ssh.as_ref())
            .ok_or_else(|| CommandError::NoSsh(self.id().clone()))?;
        let http_port = http_port.unwrap_or(self.config.server.http_port);
        let scenario = scenario.unwrap_or(&ssh_config.scenario);

        if !ssh.deploy_config(&self.deploy_params(http_port, scenario)).await {
            return Err(CommandError::Remote("deploy_config"));
        }
        let params = StartParams {
            http_port,
            scenario: scenario.to_owned(),
        };
        if !ssh.start(&params).await {
            return Err(CommandError::Remote("start"));
        }
        Ok(())
    }

    /// Stop every background task.
    pub fn shutdown(&self) {
        self.coordinator.stop();
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        for task in tasks {
            task.abort();
        }
    }
}

impl Drop for InstanceHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn deploy_params_follow_telemetry_config() {
        let mut config = InstanceConfig::new("a");
        config.telemetry.universe = 9;
        config.telemetry.channels = 24;
        let handle = InstanceHandle::new(config).unwrap();

        let params = handle.deploy_params(8081, "scenario_10_empty.lua");
        assert_eq!(params.hardware.universe, 9);
        assert_eq!(params.hardware.channels, 24);
        let options = params.options.unwrap();
        assert_eq!(options.get("httpserver"), Some("8081"));
        assert_eq!(options.get("headless"), Some("scenario_10_empty.lua"));
    }

    #[tokio::test]
    async fn start_without_ssh_is_rejected() {
        let handle = InstanceHandle::new(InstanceConfig::new("a")).unwrap();
        let err = handle.deploy_and_start(None, None).await.unwrap_err();
        assert!(matches!(err, CommandError::NoSsh(_)));
    }
}
