/// Command execution for the microk8s snap wrappers
use std::ffi::OsStr;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Failure of an external command
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("empty command line")]
    EmptyCommandLine,

    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Captured output of a finished command
#[derive(Debug)]
pub struct CommandOutput {
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Return stdout if the command exited zero
    pub fn into_result(self) -> Result<String, CommandError> {
        if self.success() {
            Ok(self.stdout)
        } else {
            Err(CommandError::Failed {
                command: self.command,
                status: self.status.to_string(),
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Builder for executing external commands
pub struct CommandBuilder {
    command: Command,
    display: String,
    context_msg: Option<String>,
}

impl CommandBuilder {
    /// Create a new command builder
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        let display = program.as_ref().to_string_lossy().into_owned();
        let mut command = Command::new(program);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        Self {
            command,
            display,
            context_msg: None,
        }
    }

    /// Build a command from a whitespace separated command line.
    ///
    /// No shell quoting is understood: `"get po -n kube-system"` becomes
    /// four arguments.
    pub fn from_command_line(line: &str) -> Result<Self, CommandError> {
        let mut parts = line.split_whitespace();
        let program = parts.next().ok_or(CommandError::EmptyCommandLine)?;
        Ok(Self::new(program).args(parts))
    }

    /// Add a single argument
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.display.push(' ');
        self.display.push_str(&arg.as_ref().to_string_lossy());
        self.command.arg(arg);
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    /// Set an environment variable
    pub fn env<K, V>(mut self, key: K, val: V) -> Self
    where
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        self.command.env(key, val);
        self
    }

    /// Prefix spawn errors with a message
    pub fn context<S: Into<String>>(mut self, msg: S) -> Self {
        self.context_msg = Some(msg.into());
        self
    }

    /// The command line as it will be run
    pub fn command_line(&self) -> &str {
        &self.display
    }

    /// Execute and return raw output
    pub async fn output(mut self) -> Result<CommandOutput, CommandError> {
        debug!("Running {}", self.display);

        let command = match &self.context_msg {
            Some(ctx) => format!("{} ({})", self.display, ctx),
            None => self.display.clone(),
        };
        let output = self
            .command
            .output()
            .await
            .map_err(|source| CommandError::Spawn {
                command: command.clone(),
                source,
            })?;

        Ok(CommandOutput {
            command,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status,
        })
    }

    /// Execute and return stdout on success, error on failure
    pub async fn run(self) -> Result<String, CommandError> {
        self.output().await?.into_result()
    }
}

/// Check if a command-line tool is installed
pub async fn check_tool_installed(
    tool: &str,
    version_args: &[&str],
    hint: &str,
) -> anyhow::Result<()> {
    let output = CommandBuilder::new(tool).args(version_args).output().await;

    match output {
        Ok(out) if out.success() => Ok(()),
        _ => anyhow::bail!("{} is not installed or not runnable. {}", tool, hint),
    }
}
