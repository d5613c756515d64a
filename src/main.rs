use std::sync::Arc;

use mail_relay::config::RelayConfig;
use mail_relay::mail::{MailTransport, SmtpTransport};
use mail_relay::relay::{MailRelay, relay_routes};

#[tokio::main]
async fn main() -> mail_relay::error::Result<()> {
    // A provider may already be installed; either way TLS has one.
    let _ = rustls::crypto::ring::default_provider().install_default();

    // Load .env if present; real environment wins.
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = RelayConfig::from_env()?;
    let sender = config.sender()?;
    let transport = SmtpTransport::from_config(&config.smtp)?;

    eprintln!("📮 Mail Relay v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Send API: http://{}/send-email", config.socket_addr());
    eprintln!(
        "   SMTP: {}:{} ({:?})",
        config.smtp.host, config.smtp.port, config.smtp.tls
    );
    eprintln!("   From: {}\n", sender);

    // Check the relay in the background; a failure only warns.
    let checker = transport.clone();
    tokio::spawn(async move {
        match checker.test_connection().await {
            Ok(true) => tracing::info!(relay = checker.name(), "SMTP relay reachable"),
            Ok(false) => tracing::warn!(relay = checker.name(), "SMTP relay refused connection test"),
            Err(e) => tracing::warn!(relay = checker.name(), error = %e, "SMTP relay unreachable"),
        }
    });

    let relay = MailRelay::new(Arc::new(transport), sender);
    let app = relay_routes(relay, config.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(config.socket_addr()).await?;
    tracing::info!(addr = %config.socket_addr(), "Mail relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Mail relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
