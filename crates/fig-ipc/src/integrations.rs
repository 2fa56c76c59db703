//! Terminal integration management through the companion app.

use crate::client::IpcClient;
use crate::error::{IpcError, ProtocolError};
use crate::proto::{
    command, Command, IntegrationAction, ListTerminalIntegrationsCommand, ResponseKind,
    TerminalIntegration, TerminalIntegrationCommand,
};

impl IpcClient {
    /// Install the integration for the terminal with bundle id `identifier`.
    pub async fn install_integration(&self, identifier: &str) -> Result<String, IpcError> {
        self.update_integration(identifier, IntegrationAction::Install)
            .await
    }

    /// Ask the companion to check an integration. Returns its status message.
    pub async fn verify_integration(&self, identifier: &str) -> Result<String, IpcError> {
        self.update_integration(identifier, IntegrationAction::VerifyInstall)
            .await
    }

    pub async fn uninstall_integration(&self, identifier: &str) -> Result<String, IpcError> {
        self.update_integration(identifier, IntegrationAction::Uninstall)
            .await
    }

    async fn update_integration(
        &self,
        identifier: &str,
        action: IntegrationAction,
    ) -> Result<String, IpcError> {
        self.send_recv_message(Command::new(command::Command::TerminalIntegrationUpdate(
            TerminalIntegrationCommand {
                identifier: identifier.to_string(),
                action: action.into(),
            },
        )))
        .await
    }

    /// Integrations known to the companion, in the order it reports them.
    pub async fn list_integrations(&self) -> Result<Vec<TerminalIntegration>, IpcError> {
        let response = self
            .send_recv_command(Command::new(command::Command::ListTerminalIntegrations(
                ListTerminalIntegrationsCommand {},
            )))
            .await?;

        match response.into_result()? {
            ResponseKind::IntegrationList(integrations) => Ok(integrations),
            _ => Err(ProtocolError::UnknownVariant("IntegrationList").into()),
        }
    }
}

pub async fn install(identifier: &str) -> Result<String, IpcError> {
    IpcClient::from_env()?.install_integration(identifier).await
}

pub async fn verify_install(identifier: &str) -> Result<String, IpcError> {
    IpcClient::from_env()?.verify_integration(identifier).await
}

pub async fn uninstall(identifier: &str) -> Result<String, IpcError> {
    IpcClient::from_env()?.uninstall_integration(identifier).await
}

pub async fn list() -> Result<Vec<TerminalIntegration>, IpcError> {
    IpcClient::from_env()?.list_integrations().await
}
