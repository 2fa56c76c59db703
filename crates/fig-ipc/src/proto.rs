//! Message types exchanged with the companion app.
//!
//! Every type derives `prost::Message` for the binary (`fig-pbuf`) encoding
//! and `serde` for the JSON (`fig-json`) encoding. The JSON form mirrors the
//! protobuf schema: camelCase keys, oneofs as single-key objects, and
//! missing fields decode to their defaults.
//!
//! Wire layout of a command:
//! ```json
//! {"type": {"command": {"id": 7, "noResponse": false, "command": {"diagnostics": {}}}}}
//! ```

use std::collections::HashMap;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::frame::Encoding;

// =============================================================================
// ENVELOPE
// =============================================================================

/// Envelope for everything the client sends to the companion.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocalMessage {
    #[prost(oneof = "local_message::Type", tags = "1, 2")]
    #[serde(rename = "type")]
    pub r#type: Option<local_message::Type>,
}

pub mod local_message {
    use serde::{Deserialize, Serialize};

    #[derive(Clone, PartialEq, prost::Oneof, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub enum Type {
        #[prost(message, tag = "1")]
        Command(super::Command),
        #[prost(message, tag = "2")]
        Hook(super::Hook),
    }
}

impl From<Command> for LocalMessage {
    fn from(command: Command) -> Self {
        Self {
            r#type: Some(local_message::Type::Command(command)),
        }
    }
}

impl From<Hook> for LocalMessage {
    fn from(hook: Hook) -> Self {
        Self {
            r#type: Some(local_message::Type::Hook(hook)),
        }
    }
}

// =============================================================================
// SHELL CONTEXT
// =============================================================================

/// Snapshot of the shell process a hook or command originates from.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShellContext {
    #[prost(int32, optional, tag = "1")]
    pub pid: Option<i32>,
    #[prost(string, optional, tag = "2")]
    pub ttys: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub process_name: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub current_working_directory: Option<String>,
    #[prost(string, optional, tag = "5")]
    pub session_id: Option<String>,
    #[prost(int32, optional, tag = "6")]
    pub integration_version: Option<i32>,
    #[prost(string, optional, tag = "7")]
    pub terminal: Option<String>,
    #[prost(string, optional, tag = "8")]
    pub hostname: Option<String>,
}

// =============================================================================
// HOOKS
// =============================================================================

/// A fire-and-forget notification about a shell lifecycle event.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Hook {
    #[prost(oneof = "hook::Hook", tags = "1, 2, 3, 4, 5, 6, 7, 8, 9")]
    pub hook: Option<hook::Hook>,
}

pub mod hook {
    use serde::{Deserialize, Serialize};

    #[derive(Clone, PartialEq, prost::Oneof, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub enum Hook {
        #[prost(message, tag = "1")]
        Init(super::InitHook),
        #[prost(message, tag = "2")]
        Prompt(super::PromptHook),
        #[prost(message, tag = "3")]
        PreExec(super::PreExecHook),
        #[prost(message, tag = "4")]
        EditBuffer(super::EditBufferHook),
        #[prost(message, tag = "5")]
        KeyboardFocusChanged(super::KeyboardFocusChangedHook),
        #[prost(message, tag = "6")]
        IntegrationReady(super::IntegrationReadyHook),
        #[prost(message, tag = "7")]
        Hide(super::HideHook),
        #[prost(message, tag = "8")]
        Event(super::EventHook),
        #[prost(message, tag = "9")]
        Callback(super::CallbackHook),
    }
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitHook {
    #[prost(message, optional, tag = "1")]
    pub context: Option<ShellContext>,
    #[prost(bool, tag = "2")]
    pub called_direct: bool,
    #[prost(string, tag = "3")]
    pub bundle: String,
    #[prost(map = "string, string", tag = "4")]
    pub env: HashMap<String, String>,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PromptHook {
    #[prost(message, optional, tag = "1")]
    pub context: Option<ShellContext>,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreExecHook {
    #[prost(message, optional, tag = "1")]
    pub context: Option<ShellContext>,
    /// Reserved, never populated by the CLI.
    #[prost(string, optional, tag = "2")]
    pub command: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditBufferHook {
    #[prost(message, optional, tag = "1")]
    pub context: Option<ShellContext>,
    #[prost(string, tag = "2")]
    pub text: String,
    #[prost(int64, tag = "3")]
    pub cursor: i64,
    #[prost(int64, tag = "4")]
    pub histno: i64,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyboardFocusChangedHook {
    #[prost(string, tag = "1")]
    pub app_identifier: String,
    #[prost(string, tag = "2")]
    pub focused_session_id: String,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IntegrationReadyHook {
    #[prost(string, tag = "1")]
    pub identifier: String,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct HideHook {}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventHook {
    #[prost(string, tag = "1")]
    pub event_name: String,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CallbackHook {
    #[prost(string, tag = "1")]
    pub handler_id: String,
    #[prost(string, tag = "2")]
    pub filepath: String,
    #[prost(string, tag = "3")]
    pub exit_code: String,
}

// =============================================================================
// COMMANDS
// =============================================================================

/// A request to the companion app.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Command {
    /// Correlation id, echoed back in the response.
    #[prost(int64, optional, tag = "1")]
    pub id: Option<i64>,
    /// When true the companion sends nothing back.
    #[prost(bool, optional, tag = "2")]
    pub no_response: Option<bool>,
    #[prost(
        oneof = "command::Command",
        tags = "100, 101, 102, 103, 104, 105, 106, 107, 108, 109, 110, 111, 112, 113, 114, 115"
    )]
    pub command: Option<command::Command>,
}

impl Command {
    /// Wrap a request kind with no id and the default response behaviour.
    pub fn new(command: command::Command) -> Self {
        Self {
            id: None,
            no_response: None,
            command: Some(command),
        }
    }

    /// Short name of the request kind, used in log events.
    pub fn kind(&self) -> &'static str {
        use command::Command as C;
        match &self.command {
            Some(C::Diagnostics(_)) => "diagnostics",
            Some(C::Restart(_)) => "restart",
            Some(C::Quit(_)) => "quit",
            Some(C::Update(_)) => "update",
            Some(C::OpenUiElement(_)) => "open_ui_element",
            Some(C::ResetCache(_)) => "reset_cache",
            Some(C::DebugMode(_)) => "debug_mode",
            Some(C::PromptAccessibility(_)) => "prompt_accessibility",
            Some(C::InputMethod(_)) => "input_method",
            Some(C::TerminalIntegrationUpdate(_)) => "terminal_integration_update",
            Some(C::ListTerminalIntegrations(_)) => "list_terminal_integrations",
            Some(C::Logout(_)) => "logout",
            Some(C::ReportWindow(_)) => "report_window",
            Some(C::Build(_)) => "build",
            Some(C::RestartSettingsListener(_)) => "restart_settings_listener",
            Some(C::RunInstallScript(_)) => "run_install_script",
            None => "empty",
        }
    }
}

pub mod command {
    use serde::{Deserialize, Serialize};

    #[derive(Clone, PartialEq, prost::Oneof, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub enum Command {
        #[prost(message, tag = "100")]
        Diagnostics(super::DiagnosticsCommand),
        #[prost(message, tag = "101")]
        Restart(super::RestartCommand),
        #[prost(message, tag = "102")]
        Quit(super::QuitCommand),
        #[prost(message, tag = "103")]
        Update(super::UpdateCommand),
        #[prost(message, tag = "104")]
        OpenUiElement(super::OpenUiElementCommand),
        #[prost(message, tag = "105")]
        ResetCache(super::ResetCacheCommand),
        #[prost(message, tag = "106")]
        DebugMode(super::DebugModeCommand),
        #[prost(message, tag = "107")]
        PromptAccessibility(super::PromptAccessibilityCommand),
        #[prost(message, tag = "108")]
        InputMethod(super::InputMethodCommand),
        #[prost(message, tag = "109")]
        TerminalIntegrationUpdate(super::TerminalIntegrationCommand),
        #[prost(message, tag = "110")]
        ListTerminalIntegrations(super::ListTerminalIntegrationsCommand),
        #[prost(message, tag = "111")]
        Logout(super::LogoutCommand),
        #[prost(message, tag = "112")]
        ReportWindow(super::ReportWindowCommand),
        #[prost(message, tag = "113")]
        Build(super::BuildCommand),
        #[prost(message, tag = "114")]
        RestartSettingsListener(super::RestartSettingsListenerCommand),
        #[prost(message, tag = "115")]
        RunInstallScript(super::RunInstallScriptCommand),
    }
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct DiagnosticsCommand {}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct RestartCommand {}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct QuitCommand {}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateCommand {
    #[prost(bool, tag = "1")]
    pub force: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum UiElement {
    MenuBar = 0,
    Settings = 1,
    MissionControl = 2,
    InputMethodPrompt = 3,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenUiElementCommand {
    #[prost(enumeration = "UiElement", tag = "1")]
    pub element: i32,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct ResetCacheCommand {}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DebugModeCommand {
    #[prost(bool, optional, tag = "1")]
    pub set_debug_mode: Option<bool>,
    #[prost(bool, optional, tag = "2")]
    pub toggle_debug_mode: Option<bool>,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct PromptAccessibilityCommand {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum InputMethodAction {
    InstallInputMethod = 0,
    UninstallInputMethod = 1,
    ListInputMethods = 2,
    EnableInputMethod = 3,
    DisableInputMethod = 4,
    SelectInputMethod = 5,
    DeselectInputMethod = 6,
    StatusOfInputMethod = 7,
}

impl InputMethodAction {
    /// Parse the action names accepted by `fig input-method <action>`.
    /// Anything unrecognised asks for the status.
    pub fn from_name(name: &str) -> Self {
        match name {
            "install" => Self::InstallInputMethod,
            "uninstall" => Self::UninstallInputMethod,
            "list" => Self::ListInputMethods,
            "enable" => Self::EnableInputMethod,
            "disable" => Self::DisableInputMethod,
            "select" => Self::SelectInputMethod,
            "deselect" => Self::DeselectInputMethod,
            _ => Self::StatusOfInputMethod,
        }
    }
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct InputMethodCommand {
    #[prost(enumeration = "InputMethodAction", optional, tag = "1")]
    pub actions: Option<i32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum IntegrationAction {
    Install = 0,
    VerifyInstall = 1,
    Uninstall = 2,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalIntegrationCommand {
    /// Bundle identifier of the terminal, e.g. `com.googlecode.iterm2`.
    #[prost(string, tag = "1")]
    pub identifier: String,
    #[prost(enumeration = "IntegrationAction", tag = "2")]
    pub action: i32,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct ListTerminalIntegrationsCommand {}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct LogoutCommand {}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportWindowCommand {
    #[prost(string, tag = "1")]
    pub report: String,
    #[prost(string, tag = "2")]
    pub path: String,
    #[prost(string, tag = "3")]
    pub fig_env_var: String,
    #[prost(string, tag = "4")]
    pub terminal: String,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildCommand {
    #[prost(string, optional, tag = "1")]
    pub branch: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct RestartSettingsListenerCommand {}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct RunInstallScriptCommand {}

// =============================================================================
// RESPONSES
// =============================================================================

/// Reply to a [`Command`] that did not set `no_response`.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandResponse {
    /// Echo of the request id.
    #[prost(int64, optional, tag = "1")]
    pub id: Option<i64>,
    #[prost(oneof = "command_response::Response", tags = "2, 3, 4, 5")]
    #[serde(deserialize_with = "command_response::deserialize_known")]
    pub response: Option<command_response::Response>,
}

pub mod command_response {
    use serde::{Deserialize, Deserializer, Serialize};
    use serde_json::Value;

    const VARIANTS: &[&str] = &["success", "error", "integrationList", "diagnostics"];

    /// A variant this client does not know decodes to `None`, the same as
    /// an unknown oneof tag in the binary encoding.
    pub(super) fn deserialize_known<'de, D>(deserializer: D) -> Result<Option<Response>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map))
                if map.len() == 1 && map.keys().all(|key| !VARIANTS.contains(&key.as_str())) =>
            {
                Ok(None)
            }
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }

    #[derive(Clone, PartialEq, prost::Oneof, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub enum Response {
        #[prost(message, tag = "2")]
        Success(super::SuccessResponse),
        #[prost(message, tag = "3")]
        Error(super::ErrorResponse),
        #[prost(message, tag = "4")]
        IntegrationList(super::TerminalIntegrationsListResponse),
        #[prost(message, tag = "5")]
        Diagnostics(super::DiagnosticsResponse),
    }
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct SuccessResponse {
    #[prost(string, optional, tag = "1")]
    pub message: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorResponse {
    #[prost(int32, optional, tag = "1")]
    pub exit_code: Option<i32>,
    #[prost(string, optional, tag = "2")]
    pub message: Option<String>,
}

/// Installation state of one terminal integration.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TerminalIntegration {
    #[prost(string, tag = "1")]
    pub bundle_identifier: String,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, optional, tag = "3")]
    pub status: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalIntegrationsListResponse {
    #[prost(message, repeated, tag = "1")]
    pub integrations: Vec<TerminalIntegration>,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiagnosticsResponse {
    #[prost(string, tag = "1")]
    pub path_to_bundle: String,
    #[prost(string, tag = "2")]
    pub accessibility: String,
    #[prost(bool, optional, tag = "3")]
    pub autocomplete_active: Option<bool>,
    #[prost(string, optional, tag = "4")]
    pub edit_buffer_string: Option<String>,
    #[prost(int64, optional, tag = "5")]
    pub edit_buffer_cursor: Option<i64>,
    #[prost(message, optional, tag = "6")]
    pub shell_context: Option<ShellContext>,
}

/// What a well-formed response means to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseKind {
    Success(Option<String>),
    IntegrationList(Vec<TerminalIntegration>),
    Diagnostics(DiagnosticsResponse),
}

impl CommandResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            id: None,
            response: Some(command_response::Response::Success(SuccessResponse {
                message: Some(message.into()),
            })),
        }
    }

    pub fn error(message: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self {
            id: None,
            response: Some(command_response::Response::Error(ErrorResponse {
                exit_code,
                message: Some(message.into()),
            })),
        }
    }

    /// Closed decode of the response variant.
    ///
    /// `Error` responses become [`IpcError::Application`](crate::IpcError::Application),
    /// a missing variant is a protocol error rather than a panic.
    pub fn into_result(self) -> Result<ResponseKind, crate::IpcError> {
        use command_response::Response;
        match self.response {
            Some(Response::Success(success)) => Ok(ResponseKind::Success(success.message)),
            Some(Response::IntegrationList(list)) => {
                Ok(ResponseKind::IntegrationList(list.integrations))
            }
            Some(Response::Diagnostics(diagnostics)) => Ok(ResponseKind::Diagnostics(diagnostics)),
            Some(Response::Error(error)) => Err(crate::IpcError::Application {
                message: error.message.unwrap_or_default(),
                exit_code: error.exit_code,
            }),
            None => Err(ProtocolError::UnknownVariant("CommandResponse").into()),
        }
    }
}

// =============================================================================
// PAYLOAD ENCODING
// =============================================================================

/// A message that can travel in either frame encoding.
pub trait WireMessage: prost::Message + Serialize + DeserializeOwned + Default + Sized {
    /// Encode into a frame payload.
    fn encode_payload(&self, encoding: Encoding) -> Result<Bytes, ProtocolError> {
        match encoding {
            Encoding::Binary => Ok(Bytes::from(self.encode_to_vec())),
            Encoding::Json => Ok(Bytes::from(serde_json::to_vec(self)?)),
        }
    }

    /// Decode a frame payload.
    fn decode_payload(encoding: Encoding, payload: &[u8]) -> Result<Self, ProtocolError> {
        match encoding {
            Encoding::Binary => Ok(Self::decode(payload)?),
            Encoding::Json => Ok(serde_json::from_slice(payload)?),
        }
    }
}

impl<T> WireMessage for T where T: prost::Message + Serialize + DeserializeOwned + Default {}
