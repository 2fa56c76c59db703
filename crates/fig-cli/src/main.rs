//! `fig` - command-line client for the Fig companion app.
//!
//! Every subcommand is a thin wrapper over one `fig-ipc` entry point. Shell
//! integrations call the `hook` subcommands; users call the rest.

mod app;

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use fig_ipc::{ClientConfig, IpcClient, IpcError};

/// Command-line client for the Fig companion app.
#[derive(Parser, Debug)]
#[command(name = "fig")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Unix socket path (default: $TMPDIR/fig.socket)
    #[arg(long, global = true)]
    socket: Option<String>,

    /// Response timeout in seconds
    #[arg(long, global = true, value_parser = parse_timeout)]
    timeout: Option<Duration>,

    /// Print structured responses as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Notify the app about a shell event (used by shell integrations)
    #[command(subcommand)]
    Hook(HookCommand),

    /// Restart the app
    Restart,

    /// Quit the app
    Quit,

    /// Check for and install app updates
    Update {
        /// Update without asking for confirmation
        #[arg(long)]
        force: bool,
    },

    /// Open the issue reporter
    Report {
        /// Message to prefill
        message: Vec<String>,
    },

    /// Switch the app to a build
    Build {
        /// Branch name (e.g. prod, beta)
        branch: String,
    },

    /// Clear the app's completion cache
    ResetCache,

    /// Open the accessibility permission prompt
    PromptAccessibility,

    /// Restart the settings file listener
    RestartSettingsListener,

    /// Re-run the install script
    RunInstallScript,

    /// Open a window of the app
    Open {
        /// menubar, settings, mission-control or input-method-prompt
        element: String,
    },

    /// Get or change autocomplete debug mode
    DebugMode {
        /// on, off or toggle (omit to show the current mode)
        mode: Option<String>,
    },

    /// Manage the input method
    InputMethod {
        /// install, uninstall, list, enable, disable, select, deselect or status
        action: String,
    },

    /// Log out of the app
    Logout,

    /// Show diagnostics reported by the app
    Diagnostics,

    /// Manage terminal integrations
    #[command(subcommand)]
    Integrations(IntegrationsCommand),
}

#[derive(Subcommand, Debug)]
enum HookCommand {
    /// A shell session started
    Init { pid: i32, tty: String },
    /// The prompt is about to be drawn
    Prompt { pid: i32, tty: String },
    /// A command is about to run
    PreExec { pid: i32, tty: String },
    /// The edit buffer changed
    #[command(name = "editbuffer", disable_help_flag = true)]
    EditBuffer {
        pid: i32,
        tty: String,
        histno: i64,
        cursor: i64,
        /// Buffer contents, passed through even when they look like a flag
        #[arg(allow_hyphen_values = true)]
        text: String,
    },
    /// Keyboard focus moved to another terminal session
    KeyboardFocusChanged {
        app_identifier: String,
        focused_session_id: String,
    },
    /// A terminal integration finished loading
    IntegrationReady { identifier: String },
    /// Hide the autocomplete window
    Hide,
    /// Emit a named event
    Event { name: String },
    /// A callback script finished
    Callback {
        handler_id: String,
        filepath: String,
        exit_code: i64,
    },
}

#[derive(Subcommand, Debug)]
enum IntegrationsCommand {
    /// Install an integration
    Install { identifier: String },
    /// Check an integration
    Verify { identifier: String },
    /// Remove an integration
    Uninstall { identifier: String },
    /// List integrations known to the app
    List,
}

/// Seconds as a finite, positive duration.
fn parse_timeout(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("`{}` is not a number of seconds", value))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("timeout must be a positive number of seconds, got {}", value));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| e.to_string())
}

fn build_client(cli: &Cli) -> Result<IpcClient, IpcError> {
    let mut config = match &cli.socket {
        Some(socket) => ClientConfig::new(shellexpand::tilde(socket).to_string()),
        None => ClientConfig::from_env()?,
    };
    if let Some(timeout) = cli.timeout {
        config = config.with_timeout(timeout);
    }
    Ok(IpcClient::new(config))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match build_client(&cli) {
        Ok(client) => app::App::new(client, cli.json).run(cli.command).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            let code = app::exit_code(&e);
            match e.downcast_ref::<IpcError>() {
                Some(ipc) if ipc.is_not_running() => {
                    eprintln!("Error: {}", e);
                    eprintln!("Fig might not be running, run `fig launch` to start it");
                }
                _ => eprintln!("Error: {:#}", e),
            }
            ExitCode::from(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("fig").chain(args.iter().copied()))
    }

    #[test]
    fn test_timeout_accepts_fractional_seconds() {
        let cli = parse(&["--socket", "/tmp/x.sock", "--timeout", "0.5", "quit"]).unwrap();
        assert_eq!(cli.timeout, Some(Duration::from_millis(500)));

        let client = build_client(&cli).unwrap();
        assert_eq!(client.config().timeout, Duration::from_millis(500));
        assert_eq!(client.socket_path(), std::path::Path::new("/tmp/x.sock"));
    }

    #[test]
    fn test_timeout_rejects_invalid_values() {
        for bad in ["-1", "0", "NaN", "inf", "soon"] {
            let flag = format!("--timeout={}", bad);
            let err = parse(&["--socket", "/tmp/x.sock", &flag, "quit"]).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation, "{}", bad);
        }
    }

    #[test]
    fn test_editbuffer_text_may_look_like_a_flag() {
        for text in ["--help", "-la", "--amend"] {
            let cli = parse(&["hook", "editbuffer", "4321", "/dev/ttys003", "3", "5", text]).unwrap();
            match cli.command {
                Command::Hook(HookCommand::EditBuffer { text: parsed, cursor, .. }) => {
                    assert_eq!(parsed, text);
                    assert_eq!(cursor, 5);
                }
                other => panic!("expected editbuffer hook, got {:?}", other),
            }
        }
    }
}
