use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use flight_control::PowerControl;
use tracing::{info, warn};

/// Powers the companion computer off with `sudo shutdown -h now`.
///
/// Needs passwordless sudo for `shutdown`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPowerOff;

#[async_trait]
impl PowerControl for SystemPowerOff {
    async fn power_off(&self) -> Result<()> {
        info!("Initiating system shutdown...");
        let status = tokio::task::spawn_blocking(|| {
            std::process::Command::new("sudo")
                .args(["shutdown", "-h", "now"])
                .status()
        })
        .await
        .context("shutdown task panicked")?
        .context("failed to run shutdown")?;

        if !status.success() {
            warn!("Ensure passwordless sudo is configured for the shutdown command.");
            bail!("shutdown exited with {}", status);
        }
        Ok(())
    }
}
