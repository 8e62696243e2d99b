use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::{
    error::{AppError, AppResult},
    services::recommendations::EmailPick,
};

const POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";

/// An outgoing email
#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub to: String,
    pub to_name: String,
    pub subject: String,
    pub html_body: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> AppResult<()>;
}

/// Minimal HTML escaping for text placed into the digest body
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Renders the daily recommendation email for one user
pub fn recommendation_email(to: &str, to_name: &str, pick: &EmailPick) -> Email {
    let item = &pick.item;
    let poster = item
        .poster_path
        .as_deref()
        .map(|path| {
            format!(
                r#"<img src="{}{}" alt="{}" width="250" />"#,
                POSTER_BASE_URL,
                escape(path),
                escape(&item.title)
            )
        })
        .unwrap_or_default();
    let overview = item.overview.as_deref().unwrap_or("No description available.");

    let html_body = format!(
        "<h2>Hi {name}!</h2>\
         <p>Because you like <strong>{reason}</strong>, we think you will enjoy:</p>\
         <h3>{title} ({rating:.1}/10)</h3>\
         {poster}\
         <p>{overview}</p>",
        name = escape(to_name),
        reason = escape(&pick.reason),
        title = escape(&item.title),
        rating = item.rating,
        poster = poster,
        overview = escape(overview),
    );

    Email {
        to: to.to_string(),
        to_name: to_name.to_string(),
        subject: "Your recommendation for today".to_string(),
        html_body,
    }
}

/// Sends mail through an SMTP relay using STARTTLS
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(
        host: &str,
        port: u16,
        username: Option<String>,
        password: Option<String>,
        from: &str,
    ) -> AppResult<Self> {
        let from: Mailbox = from
            .parse()
            .map_err(|e| AppError::Mail(format!("Invalid sender address {}: {}", from, e)))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| AppError::Mail(format!("Invalid SMTP relay {}: {}", host, e)))?
            .port(port);

        if let (Some(username), Some(password)) = (username, password) {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait::async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: Email) -> AppResult<()> {
        let to = Mailbox::new(
            Some(email.to_name.clone()),
            email
                .to
                .parse()
                .map_err(|e| AppError::Mail(format!("Invalid recipient {}: {}", email.to, e)))?,
        );

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject)
            .header(ContentType::TEXT_HTML)
            .body(email.html_body)
            .map_err(|e| AppError::Mail(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Mail(e.to_string()))?;

        Ok(())
    }
}

/// Logs emails instead of sending them; used when no SMTP relay is configured
#[derive(Clone, Default)]
pub struct LogMailer;

#[async_trait::async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> AppResult<()> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            body_len = email.html_body.len(),
            "SMTP not configured, email logged only"
        );
        Ok(())
    }
}
