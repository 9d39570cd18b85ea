use lettre::{
    Message, SmtpTransport, Transport,
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
};
use log::{info, warn};

use crate::models::Contact;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("mail transport is not configured")]
    NotConfigured,
    #[error("failed to build message: {0}")]
    Message(String),
    #[error("failed to deliver message: {0}")]
    Delivery(String),
}

#[derive(Debug, Clone)]
pub struct BidNote {
    pub to: Contact,
    pub project_id: String,
    pub project_title: String,
    pub quoted_price: f64,
    pub counterparty: String,
}

#[derive(Debug, Clone)]
pub struct RatingNote {
    pub to: Contact,
    pub project_title: String,
    pub rating: i32,
}

/// Fire-and-forget notification sink. Callers log failures and move on;
/// nothing here may influence the outcome of an already-committed operation.
#[rocket::async_trait]
pub trait Notifier: Send + Sync {
    async fn bid_received(&self, note: &BidNote) -> Result<(), NotifyError>;
    async fn bid_accepted(&self, note: &BidNote) -> Result<(), NotifyError>;
    async fn bid_rejected(&self, note: &BidNote) -> Result<(), NotifyError>;
    async fn rating_received(&self, note: &RatingNote) -> Result<(), NotifyError>;
}

pub struct EmailNotifier;

impl EmailNotifier {
    fn send_html(to_email: &str, subject: &str, body: String) -> Result<(), NotifyError> {
        let mail_user = crate::config::Config::mail_user();
        let mail_password = crate::config::Config::mail_password();

        if mail_user.is_empty() || mail_password.is_empty() {
            warn!("Email credentials not configured. Skipping email send.");
            return Err(NotifyError::NotConfigured);
        }

        let from_mailbox: Mailbox = crate::config::Config::mail_from()
            .parse()
            .map_err(|e| NotifyError::Message(format!("invalid from address: {}", e)))?;
        let to_mailbox: Mailbox = to_email
            .parse()
            .map_err(|e| NotifyError::Message(format!("invalid recipient address: {}", e)))?;

        let email_message = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body)
            .map_err(|e| NotifyError::Message(e.to_string()))?;

        let creds = Credentials::new(mail_user, mail_password);
        let mailer = SmtpTransport::relay(&crate::config::Config::mail_host())
            .map_err(|e| NotifyError::Delivery(e.to_string()))?
            .credentials(creds)
            .build();

        mailer
            .send(&email_message)
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        Ok(())
    }

    fn project_link(project_id: &str) -> String {
        format!("{}/projects/{}", crate::config::Config::base_url(), project_id)
    }
}

#[rocket::async_trait]
impl Notifier for EmailNotifier {
    async fn bid_received(&self, note: &BidNote) -> Result<(), NotifyError> {
        let body = format!(
            r#"
            <html>
            <body>
                <h1>New Bid Received</h1>
                <p>Hello {},</p>
                <p>A contractor has submitted a bid on your project <strong>{}</strong>.</p>
                <p><strong>Contractor:</strong> {}<br>
                   <strong>Bid Amount:</strong> &#8377;{:.0}</p>
                <p><a href="{}">View Bid Details</a></p>
                <p>Best regards,<br><strong>BuildConnect Team</strong></p>
            </body>
            </html>
            "#,
            note.to.full_name,
            note.project_title,
            note.counterparty,
            note.quoted_price,
            Self::project_link(&note.project_id),
        );
        Self::send_html(
            &note.to.email,
            &format!("New bid received on \"{}\"", note.project_title),
            body,
        )?;
        info!("Bid-received email sent to {}", note.to.email);
        Ok(())
    }

    async fn bid_accepted(&self, note: &BidNote) -> Result<(), NotifyError> {
        let body = format!(
            r#"
            <html>
            <body>
                <h1>Congratulations! Your Bid Was Accepted</h1>
                <p>Hello {},</p>
                <p>Your bid of <strong>&#8377;{:.0}</strong> on <strong>{}</strong> has been
                   accepted by {}. The project has been awarded to you.</p>
                <p><a href="{}">View Project</a></p>
                <p>Best regards,<br><strong>BuildConnect Team</strong></p>
            </body>
            </html>
            "#,
            note.to.full_name,
            note.quoted_price,
            note.project_title,
            note.counterparty,
            Self::project_link(&note.project_id),
        );
        Self::send_html(
            &note.to.email,
            &format!("Your bid on \"{}\" was accepted!", note.project_title),
            body,
        )?;
        info!("Bid-accepted email sent to {}", note.to.email);
        Ok(())
    }

    async fn bid_rejected(&self, note: &BidNote) -> Result<(), NotifyError> {
        let body = format!(
            r#"
            <html>
            <body>
                <h1>Bid Update</h1>
                <p>Hello {},</p>
                <p>Your bid on <strong>{}</strong> was not selected this time.
                   New projects are posted every day; keep bidding!</p>
                <p>Best regards,<br><strong>BuildConnect Team</strong></p>
            </body>
            </html>
            "#,
            note.to.full_name, note.project_title,
        );
        Self::send_html(
            &note.to.email,
            &format!("Update on your bid for \"{}\"", note.project_title),
            body,
        )?;
        info!("Bid-rejected email sent to {}", note.to.email);
        Ok(())
    }

    async fn rating_received(&self, note: &RatingNote) -> Result<(), NotifyError> {
        let stars = "★".repeat(note.rating as usize);
        let body = format!(
            r#"
            <html>
            <body>
                <h1>You Received a New Rating</h1>
                <p>Hello {},</p>
                <p>The builder of <strong>{}</strong> rated your work: {} ({}/5)</p>
                <p>Ratings build your reputation and help you win future projects.</p>
                <p>Best regards,<br><strong>BuildConnect Team</strong></p>
            </body>
            </html>
            "#,
            note.to.full_name, note.project_title, stars, note.rating,
        );
        Self::send_html(
            &note.to.email,
            &format!("New rating received for \"{}\"", note.project_title),
            body,
        )?;
        info!("Rating-received email sent to {}", note.to.email);
        Ok(())
    }
}
