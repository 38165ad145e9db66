//! Remote commands through the system `ssh` client.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

use crate::error::DeployError;
use crate::ini::{HardwareIni, OptionsIni};

/// Limit for short remote commands.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(15);

/// Limit for uploads.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the game writes its console output once detached.
const REMOTE_LOG: &str = "/tmp/emptyepsilon.log";

/// Connection details for the machine running the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    /// Host name or address.
    pub host: String,
    /// SSH port.
    pub port: u16,
    /// Remote user.
    pub username: String,
    /// Password, passed to `sshpass` through the environment.
    pub password: Option<String>,
    /// Private key file.
    pub key_path: Option<PathBuf>,
    /// `known_hosts` file used for host key verification.
    pub known_hosts: Option<PathBuf>,
    /// Accept any host key.
    pub skip_host_key_check: bool,
}

/// Arguments for starting the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartParams {
    /// Port for the game's HTTP API.
    pub http_port: u16,
    /// Scenario loaded by the headless server.
    pub scenario: String,
}

/// Files pushed by [`SshManager::deploy_config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployParams {
    /// Telemetry output configuration.
    pub hardware: HardwareIni,
    /// Server options; skipped when `None`.
    pub options: Option<OptionsIni>,
    /// Remote path for `hardware.ini`; defaults to
    /// `{install_path}/scripts/hardware.ini`.
    pub hardware_path: Option<String>,
    /// Remote path for `options.ini`; defaults to
    /// `{install_path}/options.ini`.
    pub options_path: Option<String>,
}

/// Quote `text` for a POSIX shell.
pub fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

/// Parent directory of a remote path, if it has one.
fn remote_parent(path: &str) -> Option<&str> {
    path.rsplit_once('/')
        .map(|(parent, _)| parent)
        .filter(|parent| !parent.is_empty())
}

/// Runs start, stop and deploy operations on one remote host.
#[derive(Debug, Clone)]
pub struct SshManager {
    target: SshTarget,
    install_path: String,
    program: String,
}

impl SshManager {
    /// Create a manager for `target` with the game installed at
    /// `install_path`.
    pub fn new(target: SshTarget, install_path: impl Into<String>) -> Self {
        Self {
            target,
            install_path: install_path.into(),
            program: "ssh".to_owned(),
        }
    }

    /// Use a different `ssh` executable.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// The host this manager talks to.
    pub fn target(&self) -> &SshTarget {
        &self.target
    }

    /// Install directory on the remote host, without a trailing slash.
    pub fn install_path(&self) -> &str {
        let trimmed = self.install_path.trim_end_matches('/');
        if trimmed.is_empty() { "/" } else { trimmed }
    }

    /// Remote shell command that launches the game detached.
    pub fn start_command(&self, params: &StartParams) -> String {
        format!(
            "cd {} && nohup ./EmptyEpsilon httpserver={} headless={} > {REMOTE_LOG} 2>&1 &",
            shell_quote(self.install_path()),
            params.http_port,
            shell_quote(&params.scenario),
        )
    }

    /// Remote shell command that stops the game.
    pub const fn stop_command() -> &'static str {
        "pkill -f EmptyEpsilon"
    }

    /// Build the local process invocation for `remote`.
    pub fn command(&self, remote: &str) -> Command {
        let mut cmd = match &self.target.password {
            Some(password) => {
                let mut cmd = Command::new("sshpass");
                cmd.arg("-e").arg(&self.program).env("SSHPASS", password);
                cmd
            }
            None => {
                let mut cmd = Command::new(&self.program);
                cmd.args(["-o", "BatchMode=yes"]);
                cmd
            }
        };

        cmd.arg("-p")
            .arg(self.target.port.to_string())
            .args(["-o", "ConnectTimeout=10"]);

        if self.target.skip_host_key_check {
            cmd.args([
                "-o",
                "StrictHostKeyChecking=no",
                "-o",
                "UserKnownHostsFile=/dev/null",
            ]);
        } else if let Some(known_hosts) = &self.target.known_hosts {
            cmd.arg("-o")
                .arg(format!("UserKnownHostsFile={}", known_hosts.display()));
        }

        if let Some(key) = &self.target.key_path {
            cmd.arg("-i").arg(key);
        }

        cmd.arg(format!("{}@{}", self.target.username, self.target.host))
            .arg(remote)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Run `remote`, optionally feeding `input` on stdin, and return its
    /// standard output.
    async fn run(
        &self,
        remote: &str,
        input: Option<&str>,
        limit: Duration,
    ) -> Result<String, DeployError> {
        let mut cmd = self.command(remote);
        cmd.stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let program = cmd.as_std().get_program().to_string_lossy().into_owned();
        let mut child = cmd
            .spawn()
            .map_err(|source| DeployError::Spawn { program, source })?;

        let work = async move {
            if let (Some(text), Some(mut stdin)) = (input, child.stdin.take()) {
                stdin
                    .write_all(text.as_bytes())
                    .await
                    .map_err(DeployError::Io)?;
                stdin.shutdown().await.map_err(DeployError::Io)?;
            }
            child
                .wait_with_output()
                .await
                .map_err(DeployError::Io)
        };

        let output = tokio::time::timeout(limit, work)
            .await
            .map_err(|_elapsed| DeployError::Timeout(limit))??;

        if !output.status.success() {
            return Err(DeployError::Remote {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Write `content` to `remote_path`, creating its directory.
    async fn upload(&self, content: &str, remote_path: &str) -> Result<(), DeployError> {
        let write = format!("cat > {}", shell_quote(remote_path));
        let remote = match remote_parent(remote_path) {
            Some(parent) => format!("mkdir -p {} && {write}", shell_quote(parent)),
            None => write,
        };
        self.run(&remote, Some(content), UPLOAD_TIMEOUT)
            .await
            .map(drop)
    }

    /// Launch the game. Returns whether the remote shell accepted the
    /// command; the game itself takes several seconds to come up.
    pub async fn start(&self, params: &StartParams) -> bool {
        let command = self.start_command(params);
        match self.run(&command, None, COMMAND_TIMEOUT).await {
            Ok(_) => {
                info!(
                    host = %self.target.host,
                    port = params.http_port,
                    scenario = %params.scenario,
                    "started EmptyEpsilon"
                );
                true
            }
            Err(e) => {
                warn!(host = %self.target.host, error = %e, "failed to start EmptyEpsilon");
                false
            }
        }
    }

    /// Stop the game. A missing process counts as stopped.
    pub async fn stop(&self) -> bool {
        match self.run(Self::stop_command(), None, COMMAND_TIMEOUT).await {
            Ok(_) => {
                info!(host = %self.target.host, "stopped EmptyEpsilon");
                true
            }
            // pkill exits 1 when nothing matched.
            Err(DeployError::Remote { code: Some(1), .. }) => {
                info!(host = %self.target.host, "EmptyEpsilon was not running");
                true
            }
            Err(e) => {
                warn!(host = %self.target.host, error = %e, "failed to stop EmptyEpsilon");
                false
            }
        }
    }

    /// Push `hardware.ini` and, if given, `options.ini`.
    pub async fn deploy_config(&self, params: &DeployParams) -> bool {
        let hardware_path = params
            .hardware_path
            .clone()
            .unwrap_or_else(|| format!("{}/scripts/hardware.ini", self.install_path()));
        if let Err(e) = self.upload(&params.hardware.render(), &hardware_path).await {
            warn!(path = %hardware_path, error = %e, "hardware.ini upload failed");
            return false;
        }
        info!(path = %hardware_path, universe = params.hardware.universe, "deployed hardware.ini");

        if let Some(options) = &params.options {
            let options_path = params
                .options_path
                .clone()
                .unwrap_or_else(|| format!("{}/options.ini", self.install_path()));
            if let Err(e) = self.upload(&options.render(), &options_path).await {
                warn!(path = %options_path, error = %e, "options.ini upload failed");
                return false;
            }
            info!(path = %options_path, "deployed options.ini");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use super::*;

    fn target() -> SshTarget {
        SshTarget {
            host: "ee.local".to_owned(),
            port: 2222,
            username: "game".to_owned(),
            password: None,
            key_path: None,
            known_hosts: None,
            skip_host_key_check: false,
        }
    }

    fn args(cmd: &Command) -> Vec<String> {
        cmd.as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn quotes_embedded_single_quotes() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn start_command_quotes_paths_and_scenario() {
        let manager = SshManager::new(target(), "/opt/Empty Epsilon/");
        let command = manager.start_command(&StartParams {
            http_port: 8080,
            scenario: "scenario_00_basic.lua".to_owned(),
        });
        assert_eq!(
            command,
            "cd '/opt/Empty Epsilon' && nohup ./EmptyEpsilon httpserver=8080 \
             headless='scenario_00_basic.lua' > /tmp/emptyepsilon.log 2>&1 &"
        );
    }

    #[test]
    fn key_auth_uses_batch_mode() {
        let mut t = target();
        t.key_path = Some(PathBuf::from("/keys/id_ed25519"));
        let manager = SshManager::new(t, "/opt/EmptyEpsilon");
        let cmd = manager.command("true");

        assert_eq!(cmd.as_std().get_program(), OsStr::new("ssh"));
        let args = args(&cmd);
        assert!(args.windows(2).any(|w| w == ["-o", "BatchMode=yes"]));
        assert!(args.windows(2).any(|w| w == ["-p", "2222"]));
        assert!(args.windows(2).any(|w| w == ["-i", "/keys/id_ed25519"]));
        assert_eq!(args.last().map(String::as_str), Some("true"));
        assert!(args.iter().any(|a| a == "game@ee.local"));
    }

    #[test]
    fn password_auth_goes_through_sshpass_env() {
        let mut t = target();
        t.password = Some("hunter2".to_owned());
        let cmd = SshManager::new(t, "/opt/EmptyEpsilon").command("true");

        assert_eq!(cmd.as_std().get_program(), OsStr::new("sshpass"));
        let args = args(&cmd);
        assert_eq!(args.first().map(String::as_str), Some("-e"));
        assert!(!args.iter().any(|a| a.contains("hunter2")));
        let env: Vec<_> = cmd.as_std().get_envs().collect();
        assert!(env.contains(&(OsStr::new("SSHPASS"), Some(OsStr::new("hunter2")))));
    }

    #[test]
    fn skip_host_key_check_disables_known_hosts() {
        let mut t = target();
        t.skip_host_key_check = true;
        t.known_hosts = Some(PathBuf::from("/ignored"));
        let args = args(&SshManager::new(t, "/opt").command("true"));
        assert!(args.iter().any(|a| a == "StrictHostKeyChecking=no"));
        assert!(!args.iter().any(|a| a.contains("/ignored")));
    }

    #[test]
    fn remote_parent_handles_edge_paths() {
        assert_eq!(remote_parent("/opt/ee/scripts/hardware.ini"), Some("/opt/ee/scripts"));
        assert_eq!(remote_parent("/hardware.ini"), None);
        assert_eq!(remote_parent("hardware.ini"), None);
    }

    #[tokio::test]
    async fn missing_ssh_binary_reports_failure() {
        let manager =
            SshManager::new(target(), "/opt/EmptyEpsilon").with_program("/nonexistent/ssh-binary");
        assert!(!manager.stop().await);
        assert!(
            !manager
                .start(&StartParams {
                    http_port: 8080,
                    scenario: "scenario_00_basic.lua".to_owned(),
                })
                .await
        );
        let params = DeployParams {
            hardware: HardwareIni::default(),
            options: None,
            hardware_path: None,
            options_path: None,
        };
        assert!(!manager.deploy_config(&params).await);
    }
}
