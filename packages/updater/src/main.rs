//! `unifi-cert-updater`: sync a UniFi console's certificate with a TLS secret

use std::process::ExitCode;

use clap::Parser;
use log::{debug, error, info, warn};
use unicert_unifi::{CertificateClient, ReqwestTransport, RetryingTransport, Session, Transport};
use unicert_updater::{
    Config, FileSecretSource, KubeSecretSource, LoggingTransformer, Result, SecretSource, Updater,
    UpdaterError,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();
    LoggingTransformer::init(config.log_level());

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    match run(&config).await {
        Ok(()) => {
            info!("Certificate successfully managed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &Config) -> Result<()> {
    config.validate()?;
    info!("Configuration validated");

    let transport = RetryingTransport::new(
        ReqwestTransport::new(&config.transport_config())?,
        config.retry_policy(),
    );
    let mut session = Session::with_site(
        config.api_url()?,
        &config.site,
        config.credentials()?,
        transport,
    )?;

    debug!("Logging in to UniFi");
    let flavor = session.login().await?;
    info!("Login successful ({flavor})");

    let mut client = CertificateClient::new(session);
    let outcome = manage(config, &mut client).await;

    if let Err(e) = client.session_mut().logout().await {
        warn!("Logout failed: {e}");
    }

    outcome
}

async fn manage<T: Transport>(config: &Config, client: &mut CertificateClient<T>) -> Result<()> {
    let source = secret_source(config).await?;
    let bundle = source.fetch().await?;

    let updater = Updater::new(config.fingerprinter(), config.max_certificates());

    if config.dry_run {
        let decision = updater.preview(client, &bundle).await?;
        info!("Dry run, no changes made: {decision:?}");
        return Ok(());
    }

    let report = updater.run(client, &bundle).await?;
    info!(
        "Certificate {} active (uploaded: {}, activated: {}, deleted: {}, failed deletes: {})",
        report.target_id,
        report.uploaded,
        report.activated,
        report.deleted.len(),
        report.failed_deletes.len()
    );
    Ok(())
}

async fn secret_source(config: &Config) -> Result<Box<dyn SecretSource>> {
    if let Some(dir) = &config.secret_dir {
        debug!("Reading certificate from {}", dir.display());
        return Ok(Box::new(FileSecretSource::new(dir.clone())));
    }

    match (config.namespace.as_deref(), config.secret_name.as_deref()) {
        (Some(namespace), Some(name)) => {
            debug!("Fetching certificate from namespace '{namespace}', secret '{name}'");
            Ok(Box::new(KubeSecretSource::try_default(namespace, name).await?))
        }
        _ => Err(UpdaterError::Configuration(
            "NAMESPACE and SECRET_NAME are required without SECRET_DIR".to_string(),
        )),
    }
}
