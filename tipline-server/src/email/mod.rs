//! Email sending abstractions

pub mod console;
pub mod smtp;

pub use console::ConsoleEmailSender;
pub use smtp::{SmtpConfig, SmtpEmailSender};

/// A rendered message addressed to one recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    /// Plain-text body; values are not escaped
    pub text: String,
    /// HTML body; values are escaped
    pub html: String,
}

/// Trait for delivering outbound email
pub trait EmailSender: Send + Sync {
    fn send(&self, email: &OutboundEmail) -> Result<(), String>;
}

/// Allow using Box<dyn EmailSender> as an EmailSender
impl EmailSender for Box<dyn EmailSender> {
    fn send(&self, email: &OutboundEmail) -> Result<(), String> {
        (**self).send(email)
    }
}
