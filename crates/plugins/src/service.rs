use async_trait::async_trait;

/// External connection a plugin depends on (chat transport, API client, ...).
#[async_trait]
pub trait PluginService: Send + Sync + 'static {
    /// Establish the connection. Called once from the plugin's `init`.
    async fn connect(&self) -> anyhow::Result<()>;

    /// Release the connection. Called once from the plugin's `shutdown`.
    async fn disconnect(&self) -> anyhow::Result<()>;

    /// Informational message logged some time after startup, such as an
    /// invite link. Best effort.
    async fn startup_notice(&self) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}
