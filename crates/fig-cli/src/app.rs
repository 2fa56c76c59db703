//! Dispatch from parsed subcommands to the IPC client.

use anyhow::{bail, Result};
use fig_ipc::hooks;
use fig_ipc::proto::{InputMethodAction, UiElement};
use fig_ipc::{IpcClient, IpcError};
use tracing::debug;

use crate::{Command, HookCommand, IntegrationsCommand};

/// Exit status for an error returned from [`App::run`].
///
/// Companion-side failures use the exit code the companion sent, or 1.
/// Anything that kept the command from getting an answer is 2.
pub(crate) fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<IpcError>() {
        Some(IpcError::Application { exit_code, .. }) => exit_code
            .and_then(|code| u8::try_from(code).ok())
            .filter(|code| *code != 0)
            .unwrap_or(1),
        Some(_) => 2,
        None => 1,
    }
}

fn parse_ui_element(name: &str) -> Result<UiElement> {
    Ok(match name {
        "menubar" => UiElement::MenuBar,
        "settings" => UiElement::Settings,
        "mission-control" => UiElement::MissionControl,
        "input-method-prompt" => UiElement::InputMethodPrompt,
        other => bail!("Unknown UI element: {}", other),
    })
}

pub(crate) struct App {
    client: IpcClient,
    json: bool,
}

impl App {
    pub(crate) fn new(client: IpcClient, json: bool) -> Self {
        Self { client, json }
    }

    pub(crate) async fn run(&self, command: Command) -> Result<()> {
        debug!(?command, socket = %self.client.socket_path().display(), "running");

        match command {
            Command::Hook(hook) => self.hook(hook).await?,

            Command::Restart => self.client.restart().await?,
            Command::Quit => self.client.quit().await?,
            Command::Update { force } => self.client.update(force).await?,
            Command::Report { message } => self.client.report_window(message.join(" ")).await?,
            Command::Build { branch } => self.client.build(branch).await?,
            Command::ResetCache => self.client.reset_cache().await?,
            Command::PromptAccessibility => self.client.prompt_accessibility().await?,
            Command::RestartSettingsListener => self.client.restart_settings_listener().await?,
            Command::RunInstallScript => self.client.run_install_script().await?,

            Command::Open { element } => {
                let message = self
                    .client
                    .open_ui_element(parse_ui_element(&element)?)
                    .await?;
                print_message(&message);
            }
            Command::DebugMode { mode } => {
                let message = match mode.as_deref() {
                    None => self.client.get_debug_mode().await?,
                    Some("on") => self.client.set_debug_mode(true).await?,
                    Some("off") => self.client.set_debug_mode(false).await?,
                    Some("toggle") => self.client.toggle_debug_mode().await?,
                    Some(other) => bail!("Expected on, off or toggle, got {}", other),
                };
                print_message(&message);
            }
            Command::InputMethod { action } => {
                let message = self
                    .client
                    .input_method(InputMethodAction::from_name(&action))
                    .await?;
                print_message(&message);
            }
            Command::Logout => print_message(&self.client.logout().await?),
            Command::Diagnostics => {
                let diagnostics = self.client.diagnostics().await?;
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&diagnostics)?);
                } else {
                    println!("Bundle:         {}", diagnostics.path_to_bundle);
                    println!("Accessibility:  {}", diagnostics.accessibility);
                    if let Some(active) = diagnostics.autocomplete_active {
                        println!("Autocomplete:   {}", active);
                    }
                    if let Some(buffer) = &diagnostics.edit_buffer_string {
                        println!(
                            "Edit buffer:    {:?} (cursor {})",
                            buffer,
                            diagnostics.edit_buffer_cursor.unwrap_or_default()
                        );
                    }
                }
            }

            Command::Integrations(cmd) => self.integrations(cmd).await?,
        }

        Ok(())
    }

    async fn hook(&self, cmd: HookCommand) -> Result<()> {
        let hook = match cmd {
            HookCommand::Init { pid, tty } => hooks::new_init_hook(pid, tty)?,
            HookCommand::Prompt { pid, tty } => hooks::new_prompt_hook(pid, tty)?,
            HookCommand::PreExec { pid, tty } => hooks::new_preexec_hook(pid, tty)?,
            HookCommand::EditBuffer {
                pid,
                tty,
                histno,
                cursor,
                text,
            } => hooks::new_edit_buffer_hook(pid, tty, text, cursor, histno)?,
            HookCommand::KeyboardFocusChanged {
                app_identifier,
                focused_session_id,
            } => hooks::new_keyboard_focus_changed_hook(app_identifier, focused_session_id),
            HookCommand::IntegrationReady { identifier } => {
                hooks::new_integration_ready_hook(identifier)
            }
            HookCommand::Hide => hooks::new_hide_hook(),
            HookCommand::Event { name } => hooks::new_event_hook(name),
            HookCommand::Callback {
                handler_id,
                filepath,
                exit_code,
            } => hooks::new_callback_hook(handler_id, filepath, exit_code),
        };

        self.client.send_hook(hook).await?;
        Ok(())
    }

    async fn integrations(&self, cmd: IntegrationsCommand) -> Result<()> {
        let message = match cmd {
            IntegrationsCommand::Install { identifier } => {
                self.client.install_integration(&identifier).await?
            }
            IntegrationsCommand::Verify { identifier } => {
                self.client.verify_integration(&identifier).await?
            }
            IntegrationsCommand::Uninstall { identifier } => {
                self.client.uninstall_integration(&identifier).await?
            }
            IntegrationsCommand::List => {
                let integrations = self.client.list_integrations().await?;
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&integrations)?);
                } else {
                    for integration in &integrations {
                        println!(
                            "{} ({}): {}",
                            integration.name,
                            integration.bundle_identifier,
                            integration.status.as_deref().unwrap_or("unknown")
                        );
                    }
                }
                return Ok(());
            }
        };
        print_message(&message);
        Ok(())
    }
}

fn print_message(message: &str) {
    if !message.is_empty() {
        println!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fig_ipc::ConnectionError;

    #[test]
    fn test_exit_code_application_error() {
        let err = anyhow::Error::from(IpcError::Application {
            message: "nope".to_string(),
            exit_code: None,
        });
        assert_eq!(exit_code(&err), 1);

        let err = anyhow::Error::from(IpcError::Application {
            message: "nope".to_string(),
            exit_code: Some(3),
        });
        assert_eq!(exit_code(&err), 3);
    }

    #[test]
    fn test_exit_code_transport_error() {
        let err = anyhow::Error::from(IpcError::from(ConnectionError::TmpDirUnset));
        assert_eq!(exit_code(&err), 2);

        let err = anyhow::Error::from(IpcError::Timeout(std::time::Duration::from_secs(3)));
        assert_eq!(exit_code(&err), 2);
    }

    #[test]
    fn test_exit_code_usage_error() {
        let err = parse_ui_element("dock").unwrap_err();
        assert_eq!(exit_code(&err), 1);
    }

    #[test]
    fn test_parse_ui_element() {
        assert_eq!(parse_ui_element("settings").unwrap(), UiElement::Settings);
        assert_eq!(
            parse_ui_element("mission-control").unwrap(),
            UiElement::MissionControl
        );
    }
}
