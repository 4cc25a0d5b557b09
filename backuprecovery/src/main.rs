use backuprecovery::{logging, BackupRecoveryProvider};
use tfplug::ServerConfig;

#[tokio::main]
async fn main() -> tfplug::Result<()> {
    let config = ServerConfig::from_env();
    logging::init(config.log_level);
    tracing::info!(
        "starting terraform-provider-ibm {}",
        env!("CARGO_PKG_VERSION")
    );

    tfplug::serve(BackupRecoveryProvider::new(), config).await
}
