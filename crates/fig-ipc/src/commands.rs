//! One helper per companion command.
//!
//! App lifecycle commands are one-way; commands whose outcome the user
//! needs to see wait for a response.

use crate::client::IpcClient;
use crate::error::{IpcError, ProtocolError};
use crate::proto::{
    command, BuildCommand, Command, DebugModeCommand, DiagnosticsCommand, DiagnosticsResponse,
    InputMethodAction, InputMethodCommand, LogoutCommand, OpenUiElementCommand,
    PromptAccessibilityCommand, QuitCommand, ReportWindowCommand, ResetCacheCommand,
    ResponseKind, RestartCommand, RestartSettingsListenerCommand, RunInstallScriptCommand,
    UiElement, UpdateCommand,
};

impl IpcClient {
    // =========================================================================
    // ONE-WAY
    // =========================================================================

    pub async fn restart(&self) -> Result<(), IpcError> {
        self.send_command(Command::new(command::Command::Restart(RestartCommand {})))
            .await
    }

    pub async fn quit(&self) -> Result<(), IpcError> {
        self.send_command(Command::new(command::Command::Quit(QuitCommand {})))
            .await
    }

    pub async fn update(&self, force: bool) -> Result<(), IpcError> {
        self.send_command(Command::new(command::Command::Update(UpdateCommand { force })))
            .await
    }

    /// Open the issue reporter, attaching `PATH`, `FIG_ENV_VAR` and `TERM`.
    pub async fn report_window(&self, report: impl Into<String>) -> Result<(), IpcError> {
        let env = |key: &str| std::env::var(key).unwrap_or_default();
        self.send_command(Command::new(command::Command::ReportWindow(
            ReportWindowCommand {
                report: report.into(),
                path: env("PATH"),
                fig_env_var: env("FIG_ENV_VAR"),
                terminal: env("TERM"),
            },
        )))
        .await
    }

    pub async fn restart_settings_listener(&self) -> Result<(), IpcError> {
        self.send_command(Command::new(command::Command::RestartSettingsListener(
            RestartSettingsListenerCommand {},
        )))
        .await
    }

    pub async fn run_install_script(&self) -> Result<(), IpcError> {
        self.send_command(Command::new(command::Command::RunInstallScript(
            RunInstallScriptCommand {},
        )))
        .await
    }

    pub async fn build(&self, branch: impl Into<String>) -> Result<(), IpcError> {
        self.send_command(Command::new(command::Command::Build(BuildCommand {
            branch: Some(branch.into()),
        })))
        .await
    }

    pub async fn reset_cache(&self) -> Result<(), IpcError> {
        self.send_command(Command::new(command::Command::ResetCache(ResetCacheCommand {})))
            .await
    }

    pub async fn prompt_accessibility(&self) -> Result<(), IpcError> {
        self.send_command(Command::new(command::Command::PromptAccessibility(
            PromptAccessibilityCommand {},
        )))
        .await
    }

    // =========================================================================
    // REQUEST / RESPONSE
    // =========================================================================

    pub async fn open_ui_element(&self, element: UiElement) -> Result<String, IpcError> {
        self.send_recv_message(Command::new(command::Command::OpenUiElement(
            OpenUiElementCommand {
                element: element.into(),
            },
        )))
        .await
    }

    pub async fn toggle_debug_mode(&self) -> Result<String, IpcError> {
        self.debug_mode(None, Some(true)).await
    }

    pub async fn set_debug_mode(&self, enabled: bool) -> Result<String, IpcError> {
        self.debug_mode(Some(enabled), None).await
    }

    /// Ask for the current debug mode without changing it.
    pub async fn get_debug_mode(&self) -> Result<String, IpcError> {
        self.debug_mode(None, None).await
    }

    async fn debug_mode(
        &self,
        set_debug_mode: Option<bool>,
        toggle_debug_mode: Option<bool>,
    ) -> Result<String, IpcError> {
        self.send_recv_message(Command::new(command::Command::DebugMode(DebugModeCommand {
            set_debug_mode,
            toggle_debug_mode,
        })))
        .await
    }

    pub async fn input_method(&self, action: InputMethodAction) -> Result<String, IpcError> {
        self.send_recv_message(Command::new(command::Command::InputMethod(
            InputMethodCommand {
                actions: Some(action.into()),
            },
        )))
        .await
    }

    pub async fn logout(&self) -> Result<String, IpcError> {
        self.send_recv_message(Command::new(command::Command::Logout(LogoutCommand {})))
            .await
    }

    pub async fn diagnostics(&self) -> Result<DiagnosticsResponse, IpcError> {
        let response = self
            .send_recv_command(Command::new(command::Command::Diagnostics(
                DiagnosticsCommand {},
            )))
            .await?;

        match response.into_result()? {
            ResponseKind::Diagnostics(diagnostics) => Ok(diagnostics),
            _ => Err(ProtocolError::UnknownVariant("Diagnostics").into()),
        }
    }
}
