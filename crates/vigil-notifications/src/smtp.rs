use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParametersBuilder},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use vigil_core::{ConfigStore, EmailSettings, MailError, Mailer, TlsMode};

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Mailer that reads the stored SMTP account on every send, so edits to the
/// email settings apply to the next alert without a restart
pub struct SmtpMailer {
    config: Arc<dyn ConfigStore>,
}

impl SmtpMailer {
    pub fn new(config: Arc<dyn ConfigStore>) -> Self {
        Self { config }
    }

    async fn settings(&self) -> Result<EmailSettings, MailError> {
        self.config
            .email_settings()
            .await?
            .filter(EmailSettings::is_configured)
            .ok_or(MailError::NotConfigured)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let settings = self.settings().await?;
        let message = build_message(&settings.from, to, subject, body)?;
        let transport = build_transport(&settings)?;

        debug!(
            "Sending '{}' to {} via {}:{}",
            subject, to, settings.smtp_host, settings.smtp_port
        );
        transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|e| MailError::InvalidAddress(format!("{}: {}", address.trim(), e)))
}

/// Plain text message to every comma separated address in `to`
fn build_message(from: &str, to: &str, subject: &str, body: &str) -> Result<Message, MailError> {
    let mut builder = Message::builder()
        .from(parse_mailbox(from)?)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN);

    let mut recipients = 0;
    for address in to.split(',').filter(|a| !a.trim().is_empty()) {
        builder = builder.to(parse_mailbox(address)?);
        recipients += 1;
    }
    if recipients == 0 {
        return Err(MailError::InvalidAddress("no recipient given".to_string()));
    }

    builder
        .body(body.to_string())
        .map_err(|e| MailError::Message(e.to_string()))
}

fn build_transport(
    settings: &EmailSettings,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
    let host = settings.smtp_host.trim();
    // Local relays commonly run with self-signed certificates
    let local = host == "localhost" || host == "127.0.0.1";
    let credentials = (!settings.username.is_empty())
        .then(|| Credentials::new(settings.username.clone(), settings.password.clone()));

    let tls_parameters = || {
        TlsParametersBuilder::new(host.to_string())
            .dangerous_accept_invalid_certs(local)
            .dangerous_accept_invalid_hostnames(local)
            .build()
            .map_err(|e| MailError::Transport(e.to_string()))
    };

    let mut builder = match settings.tls_mode {
        TlsMode::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
        TlsMode::Starttls => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .tls(Tls::Required(tls_parameters()?)),
        TlsMode::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .tls(Tls::Wrapper(tls_parameters()?)),
    }
    .port(settings.smtp_port)
    .timeout(Some(SMTP_TIMEOUT));

    if let Some(credentials) = credentials {
        builder = builder.credentials(credentials);
    }

    Ok(builder.build())
}
