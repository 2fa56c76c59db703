//! Hook constructors.
//!
//! Hooks tell the companion about shell lifecycle events. Hooks that come
//! from a shell carry a [`ShellContext`] captured when the hook is built;
//! the rest only carry their own fields. Sending is fire-and-forget through
//! [`IpcClient::send_hook`](crate::IpcClient::send_hook).

use std::collections::HashMap;
use std::path::Path;
use std::process::Command as Process;

use crate::error::HookError;
use crate::proto::{
    hook, CallbackHook, EditBufferHook, EventHook, HideHook, Hook, InitHook,
    IntegrationReadyHook, KeyboardFocusChangedHook, PreExecHook, PromptHook, ShellContext,
};

/// Version of the shell integration scripts this CLI speaks for.
pub const INTEGRATION_VERSION: i32 = 7;

/// Terminal session id exported by the terminal emulator.
pub const SESSION_ID_VAR: &str = "TERM_SESSION_ID";

impl ShellContext {
    /// Snapshot the calling shell.
    ///
    /// `pid` and `tty` come from the shell integration; the shell name,
    /// working directory and session id are read from this process.
    pub fn capture(pid: i32, tty: impl Into<String>) -> Result<Self, HookError> {
        let cwd = std::env::current_dir().map_err(HookError::CurrentDir)?;

        Ok(Self {
            pid: Some(pid),
            ttys: Some(tty.into()),
            process_name: parent_process_name(),
            current_working_directory: Some(cwd.to_string_lossy().into_owned()),
            session_id: std::env::var(SESSION_ID_VAR).ok(),
            integration_version: Some(INTEGRATION_VERSION),
            terminal: None,
            hostname: None,
        })
    }
}

/// Name of the process that spawned the CLI, normally the user's shell.
fn parent_process_name() -> Option<String> {
    let ppid = std::os::unix::process::parent_id();

    let from_proc = std::fs::read_to_string(format!("/proc/{ppid}/comm")).ok();
    let from_ps = || {
        Process::new("ps")
            .args(["-o", "comm=", "-p", &ppid.to_string()])
            .output()
            .ok()
            .filter(|out| out.status.success())
            .map(|out| String::from_utf8_lossy(&out.stdout).into_owned())
    };
    let from_shell_var = || std::env::var("SHELL").ok();

    from_proc
        .or_else(from_ps)
        .or_else(from_shell_var)
        .and_then(|name| normalize_process_name(&name))
}

/// Strip the path and login-shell dash: `-/bin/zsh` -> `zsh`.
fn normalize_process_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_start_matches('-');
    let name = Path::new(trimmed).file_name()?.to_string_lossy().into_owned();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn wrap(hook: hook::Hook) -> Hook {
    Hook { hook: Some(hook) }
}

/// A new shell session started. Carries the full environment.
pub fn new_init_hook(pid: i32, tty: impl Into<String>) -> Result<Hook, HookError> {
    let context = ShellContext::capture(pid, tty)?;
    let env: HashMap<String, String> = std::env::vars().collect();

    Ok(wrap(hook::Hook::Init(InitHook {
        context: Some(context),
        called_direct: false,
        bundle: String::new(),
        env,
    })))
}

/// The shell is about to draw a prompt.
pub fn new_prompt_hook(pid: i32, tty: impl Into<String>) -> Result<Hook, HookError> {
    Ok(wrap(hook::Hook::Prompt(PromptHook {
        context: Some(ShellContext::capture(pid, tty)?),
    })))
}

/// The shell is about to run a command.
pub fn new_preexec_hook(pid: i32, tty: impl Into<String>) -> Result<Hook, HookError> {
    Ok(wrap(hook::Hook::PreExec(PreExecHook {
        context: Some(ShellContext::capture(pid, tty)?),
        command: None,
    })))
}

/// The line editor's buffer changed.
pub fn new_edit_buffer_hook(
    pid: i32,
    tty: impl Into<String>,
    text: impl Into<String>,
    cursor: i64,
    histno: i64,
) -> Result<Hook, HookError> {
    Ok(wrap(hook::Hook::EditBuffer(EditBufferHook {
        context: Some(ShellContext::capture(pid, tty)?),
        text: text.into(),
        cursor,
        histno,
    })))
}

pub fn new_keyboard_focus_changed_hook(
    app_identifier: impl Into<String>,
    focused_session_id: impl Into<String>,
) -> Hook {
    wrap(hook::Hook::KeyboardFocusChanged(KeyboardFocusChangedHook {
        app_identifier: app_identifier.into(),
        focused_session_id: focused_session_id.into(),
    }))
}

pub fn new_integration_ready_hook(identifier: impl Into<String>) -> Hook {
    wrap(hook::Hook::IntegrationReady(IntegrationReadyHook {
        identifier: identifier.into(),
    }))
}

pub fn new_hide_hook() -> Hook {
    wrap(hook::Hook::Hide(HideHook {}))
}

pub fn new_event_hook(event_name: impl Into<String>) -> Hook {
    wrap(hook::Hook::Event(EventHook {
        event_name: event_name.into(),
    }))
}

/// A callback script finished; `filepath` holds its output.
pub fn new_callback_hook(
    handler_id: impl Into<String>,
    filepath: impl Into<String>,
    exit_code: i64,
) -> Hook {
    wrap(hook::Hook::Callback(CallbackHook {
        handler_id: handler_id.into(),
        filepath: filepath.into(),
        exit_code: exit_code.to_string(),
    }))
}
