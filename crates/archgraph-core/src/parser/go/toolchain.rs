//! Locating and running the external Go analysis toolchain.

use std::env;
use std::ffi::OsString;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::runtime::{Builder, Handle, RuntimeFlavor};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::model::GoAnalysis;
use crate::config::{GoConfig, GO_ANALYZER_BINARY, GO_ANALYZER_ENV};

/// Toolchain failures. Any of these aborts the analysis.
#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("Failed to start Go toolchain '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Go toolchain timed out after {}s", .timeout.as_secs())]
    Timeout { timeout: Duration },

    #[error("Go toolchain exited with {}: {stderr}", exit_label(.status))]
    Failed { status: Option<i32>, stderr: String },

    #[error("Go toolchain produced invalid output: {0}")]
    InvalidOutput(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Async runtime error: {0}")]
    Runtime(String),
}

fn exit_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

/// A program plus leading arguments; the runner appends `-o <file> <root>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl ToolchainCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl fmt::Display for ToolchainCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// One way of finding the toolchain. Chains are tried in order, first hit wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolchainLocator {
    /// An explicitly configured binary path.
    ConfiguredBinary(PathBuf),
    /// A binary path held in an environment variable.
    EnvironmentVariable(String),
    /// The binary installed next to the running executable.
    SiblingOfExecutable,
    /// The binary on `PATH`.
    SearchPath,
    /// `cargo run` against the analyzer crate at this directory.
    CargoSource(PathBuf),
    /// A fixed command, used as-is.
    Command(ToolchainCommand),
}

fn binary_file_name() -> String {
    format!("{}{}", GO_ANALYZER_BINARY, env::consts::EXE_SUFFIX)
}

fn find_on_path(name: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

impl ToolchainLocator {
    /// The default chain for a configuration.
    pub fn chain(config: &GoConfig) -> Vec<Self> {
        let mut chain = Vec::new();
        if let Some(binary) = &config.analyzer_binary {
            chain.push(Self::ConfiguredBinary(binary.clone()));
        }
        chain.push(Self::EnvironmentVariable(GO_ANALYZER_ENV.to_string()));
        chain.push(Self::SiblingOfExecutable);
        chain.push(Self::SearchPath);
        if let Some(source) = &config.analyzer_source {
            chain.push(Self::CargoSource(source.clone()));
        }
        chain
    }

    pub fn locate(&self) -> Option<ToolchainCommand> {
        match self {
            Self::ConfiguredBinary(path) => path.is_file().then(|| ToolchainCommand::new(path)),
            Self::EnvironmentVariable(name) => {
                let path = PathBuf::from(env::var_os(name)?);
                path.is_file().then(|| ToolchainCommand::new(path))
            }
            Self::SiblingOfExecutable => {
                let exe = env::current_exe().ok()?;
                let sibling = exe.parent()?.join(binary_file_name());
                sibling.is_file().then(|| ToolchainCommand::new(sibling))
            }
            Self::SearchPath => find_on_path(&binary_file_name()).map(ToolchainCommand::new),
            Self::CargoSource(dir) => {
                let manifest = dir.join("Cargo.toml");
                if !manifest.is_file() {
                    return None;
                }
                let cargo = find_on_path(&format!("cargo{}", env::consts::EXE_SUFFIX))?;
                Some(
                    ToolchainCommand::new(cargo)
                        .arg("run")
                        .arg("--quiet")
                        .arg("--release")
                        .arg("--manifest-path")
                        .arg(manifest)
                        .arg("--"),
                )
            }
            Self::Command(command) => Some(command.clone()),
        }
    }
}

/// Runs the toolchain once per project and parses its JSON document.
#[derive(Debug, Clone)]
pub struct ToolchainRunner {
    locators: Vec<ToolchainLocator>,
    timeout: Duration,
}

impl ToolchainRunner {
    pub fn new(locators: Vec<ToolchainLocator>, timeout: Duration) -> Self {
        Self { locators, timeout }
    }

    pub fn from_config(config: &GoConfig) -> Self {
        Self::new(ToolchainLocator::chain(config), config.timeout())
    }

    pub fn locate(&self) -> Option<ToolchainCommand> {
        self.locators.iter().find_map(|locator| {
            let found = locator.locate();
            debug!(?locator, found = found.is_some(), "Toolchain locator");
            found
        })
    }

    /// Analyse `project_root`. `Ok(None)` when no toolchain could be found.
    pub fn run(&self, project_root: &Path) -> Result<Option<GoAnalysis>, ToolchainError> {
        let Some(command) = self.locate() else {
            warn!("Go analysis toolchain not found, continuing with no packages");
            return Ok(None);
        };
        info!(toolchain = %command, root = %project_root.display(), "Running Go analysis toolchain");
        block_on(self.invoke(&command, project_root))?.map(Some)
    }

    async fn invoke(
        &self,
        command: &ToolchainCommand,
        project_root: &Path,
    ) -> Result<GoAnalysis, ToolchainError> {
        let output_file = env::temp_dir().join(format!(
            "archgraph-go-{}-{}.json",
            std::process::id(),
            Uuid::new_v4()
        ));

        let mut process = Command::new(&command.program);
        process
            .args(&command.args)
            .arg("-o")
            .arg(&output_file)
            .arg(project_root)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own group, so a timeout also reaches processes the toolchain spawned (`cargo run`).
        #[cfg(unix)]
        process.process_group(0);

        let mut child = process
            .spawn()
            .map_err(|source| ToolchainError::Spawn {
                program: command.to_string(),
                source,
            })?;

        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf).await;
                String::from_utf8_lossy(&buf).into_owned()
            })
        });

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Go toolchain timed out, killing it");
                terminate(&mut child).await;
                if let Some(task) = stderr_task {
                    task.abort();
                }
                let _ = tokio::fs::remove_file(&output_file).await;
                return Err(ToolchainError::Timeout {
                    timeout: self.timeout,
                });
            }
        };

        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            let _ = tokio::fs::remove_file(&output_file).await;
            return Err(ToolchainError::Failed {
                status: status.code(),
                stderr: stderr.trim().to_string(),
            });
        }
        if !stderr.trim().is_empty() {
            debug!(stderr = %stderr.trim(), "Go toolchain diagnostics");
        }

        let bytes = tokio::fs::read(&output_file).await;
        let _ = tokio::fs::remove_file(&output_file).await;
        let analysis: GoAnalysis = serde_json::from_slice(&bytes?)?;
        debug!(
            module = %analysis.module,
            packages = analysis.packages.len(),
            "Parsed Go toolchain output"
        );
        Ok(analysis)
    }
}

/// Kill the toolchain together with everything in its process group.
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: plain signal delivery to the group created at spawn.
        let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
        if rc != 0 {
            debug!(pid, error = %std::io::Error::last_os_error(), "Failed to signal toolchain group");
        }
    }
    if let Err(e) = child.kill().await {
        debug!(error = %e, "Failed to kill Go toolchain");
    }
}

/// Drive a future to completion from synchronous code, whatever runtime (if any) is current.
fn block_on<F>(future: F) -> Result<F::Output, ToolchainError>
where
    F: Future + Send,
    F::Output: Send,
{
    let current_thread = || {
        Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ToolchainError::Runtime(e.to_string()))
    };

    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            Ok(tokio::task::block_in_place(|| handle.block_on(future)))
        }
        // A current-thread runtime cannot be blocked from within; use a helper thread.
        Ok(_) => std::thread::scope(|scope| {
            scope
                .spawn(|| current_thread().map(|rt| rt.block_on(future)))
                .join()
                .map_err(|_| ToolchainError::Runtime("toolchain thread panicked".to_string()))?
        }),
        Err(_) => Ok(current_thread()?.block_on(future)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_order() {
        let config = GoConfig {
            analyzer_binary: Some(PathBuf::from("/opt/analyzer")),
            analyzer_source: Some(PathBuf::from("/src/analyzer")),
            timeout_secs: 5,
        };
        let chain = ToolchainLocator::chain(&config);
        assert_eq!(chain.first(), Some(&ToolchainLocator::ConfiguredBinary("/opt/analyzer".into())));
        assert_eq!(chain.last(), Some(&ToolchainLocator::CargoSource("/src/analyzer".into())));
        assert_eq!(chain.len(), 5);
    }

    #[test]
    fn test_missing_locations_yield_nothing() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert_eq!(
            ToolchainLocator::ConfiguredBinary(tmp.path().join("missing")).locate(),
            None
        );
        assert_eq!(ToolchainLocator::CargoSource(tmp.path().to_path_buf()).locate(), None);
        assert_eq!(
            ToolchainLocator::EnvironmentVariable("ARCHGRAPH_TEST_UNSET_VARIABLE".into()).locate(),
            None
        );
    }

    #[test]
    fn test_command_display() {
        let command = ToolchainCommand::new("cargo").arg("run").arg("--");
        assert_eq!(command.to_string(), "cargo run --");
    }

    #[test]
    fn test_unreachable_toolchain_is_none() {
        let tmp = tempfile::TempDir::new().unwrap();
        let runner = ToolchainRunner::new(
            vec![ToolchainLocator::ConfiguredBinary(tmp.path().join("nope"))],
            Duration::from_secs(1),
        );
        assert!(runner.run(tmp.path()).unwrap().is_none());
    }
}
