//! Registration Notifier Service
//!
//! Feeds document revisions into the registration notification pipeline and
//! mails administrators about new or validated accounts.
//!
//! ## Architecture
//!
//! ```text
//! NDJSON documents (REGISTRATION_EVENTS_FILE or stdin)
//!   ↓ (one revision per line)
//! InMemoryDocumentStore
//!   ↓ (DocumentCreated / DocumentUpdated)
//! ObservationManager
//!   ↓ ("usercreation" → "registrationNotifier")
//! TemplateMailSender (Handlebars)
//!   ↓
//! SmtpProvider (relay in production, Mailpit/MailHog in development)
//! ```
//!
//! Each line is a JSON document revision, for example:
//!
//! ```json
//! {"reference":"xwiki:XWiki.JohnDoe","objects":{"XWiki.XWikiUsers":{"active":0,"first_name":"John","last_name":"Doe","email":"john@x.com"}}}
//! ```

use core_config::{ConfigError, Environment, FromEnv, SmtpSettings, env_optional};
use domain_registration::mail::{EmailProvider, SmtpProvider};
use domain_registration::{
    ComponentRegistry, Document, InMemoryDocumentStore, MailSender, RegistrationNotifierConfig,
    RegistrationPipeline, TemplateEngine, TemplateMailSender,
};
use eyre::{Result, WrapErr};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};

/// Service settings loaded from the environment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NotifierSettings {
    /// Newline-delimited JSON documents; stdin when unset.
    pub events_file: Option<PathBuf>,
}

impl FromEnv for NotifierSettings {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            events_file: env_optional("REGISTRATION_EVENTS_FILE")
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}

/// Counters for one pass over the document feed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub saved: usize,
    pub skipped: usize,
}

/// Save every document read from `reader` through `pipeline`.
///
/// Blank lines are ignored; lines that are not a valid document are logged
/// and skipped.
pub async fn process_feed<R>(pipeline: &RegistrationPipeline, reader: R) -> Result<FeedStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut stats = FeedStats::default();
    let mut line_number = 0usize;

    while let Some(line) = lines
        .next_line()
        .await
        .wrap_err("Failed to read document feed")?
    {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Document>(&line) {
            Ok(document) => {
                pipeline.save(document).await;
                stats.saved += 1;
            }
            Err(e) => {
                warn!(line = line_number, error = %e, "Skipping malformed document");
                stats.skipped += 1;
            }
        }
    }

    Ok(stats)
}

async fn install<M: MailSender + 'static>(mail: M) -> Result<RegistrationPipeline> {
    RegistrationPipeline::install(
        ComponentRegistry::global(),
        Arc::new(InMemoryDocumentStore::new()),
        RegistrationNotifierConfig::from_env(),
        Arc::new(mail),
    )
    .await
    .wrap_err("Failed to install registration pipeline")
}

async fn consume(pipeline: &RegistrationPipeline, settings: &NotifierSettings) -> Result<FeedStats> {
    match &settings.events_file {
        Some(path) => {
            info!(path = %path.display(), "Reading documents from file");
            let file = tokio::fs::File::open(path)
                .await
                .wrap_err_with(|| format!("Failed to open {}", path.display()))?;
            process_feed(pipeline, BufReader::new(file)).await
        }
        None => {
            info!("Reading documents from stdin");
            process_feed(pipeline, BufReader::new(tokio::io::stdin())).await
        }
    }
}

/// Run the registration notifier
///
/// 1. Sets up structured logging (JSON for prod, pretty for dev)
/// 2. Selects the SMTP transport (configured relay for prod, local catcher for dev)
/// 3. Installs the notification pipeline into the global registry
/// 4. Processes the document feed until it ends or a shutdown signal arrives
///
/// # Errors
///
/// Returns an error if SMTP or service configuration is invalid, the feed
/// cannot be opened, or the pipeline was already installed.
pub async fn run() -> Result<()> {
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    info!(
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        "Starting registration notifier"
    );
    info!("Environment: {:?}", environment);

    let settings = NotifierSettings::from_env().wrap_err("Failed to load notifier settings")?;
    let templates = TemplateEngine::new().wrap_err("Failed to initialize template engine")?;

    let provider = match environment {
        Environment::Production => {
            let smtp = SmtpSettings::from_env().wrap_err(
                "SMTP configuration error. Ensure SMTP_HOST and EMAIL_FROM_ADDRESS are set.",
            )?;
            info!(host = %smtp.host, port = smtp.port, "Using SMTP relay");
            SmtpProvider::new(smtp)?
        }
        Environment::Development => {
            info!("Using SMTP provider for development (Mailpit/MailHog)");
            SmtpProvider::mailhog()?
        }
    };

    if let Err(e) = provider.health_check().await {
        warn!(provider = provider.name(), error = %e, "Mail transport not reachable");
    }

    let pipeline = install(TemplateMailSender::new(provider, templates)).await?;

    tokio::select! {
        stats = consume(&pipeline, &settings) => {
            let stats = stats?;
            info!(saved = stats.saved, skipped = stats.skipped, "Document feed finished");
        }
        result = shutdown_signal() => {
            result?;
        }
    }

    info!("Registration notifier stopped");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.wrap_err("Failed to listen for Ctrl+C") };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .wrap_err("Failed to install SIGTERM handler")?;
        sigterm.recv().await;
        Ok::<(), eyre::Report>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        result = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
            result
        },
        result = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
            result
        },
    }
}
