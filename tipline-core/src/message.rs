//! Outbound message rendering
//!
//! Every message is rendered twice: a plain-text body that carries
//! addresses verbatim and an HTML body where every interpolated value is
//! escaped. Literal template text is shared between the two.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kinds of message the identity manager sends or queues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Sent to an address being connected; carries the verification link
    Verification,
    /// Sent to the current primary address when another address is being connected
    VerificationNotice,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Verification => "verification",
            MessageKind::VerificationNotice => "verification_notice",
        }
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "verification" => Ok(MessageKind::Verification),
            "verification_notice" => Ok(MessageKind::VerificationNotice),
            other => Err(format!("unknown message kind: {other}")),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values interpolated into a message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContext {
    pub username: String,
    /// Recipient; falls back to the participant's primary address when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Address being connected (verification notices only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// A message ready to hand to a sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub text: String,
    pub html: String,
}

enum Segment<'a> {
    Literal(&'a str),
    Value(&'a str),
    Link(&'a str),
}

type Paragraph<'a> = Vec<Segment<'a>>;

/// Render `kind` for `site_name` with the given context
pub fn render(kind: MessageKind, site_name: &str, ctx: &MessageContext) -> RenderedMessage {
    let username = ctx.username.as_str();

    let (subject, paragraphs) = match kind {
        MessageKind::Verification => {
            let address = ctx.email.as_deref().unwrap_or_default();
            let mut paragraphs: Vec<Paragraph> = vec![vec![
                Segment::Literal("We've received a request to connect "),
                Segment::Value(address),
                Segment::Literal(" to the "),
                Segment::Value(username),
                Segment::Literal(" account on "),
                Segment::Value(site_name),
                Segment::Literal(". Sound familiar?"),
            ]];
            if let Some(link) = ctx.link.as_deref() {
                paragraphs.push(vec![
                    Segment::Literal("Follow this link to finish connecting your email: "),
                    Segment::Link(link),
                ]);
            }
            paragraphs.push(vec![Segment::Literal(
                "If you didn't request this, you can safely ignore this email.",
            )]);
            (format!("Connect to {username} on {site_name}?"), paragraphs)
        }
        MessageKind::VerificationNotice => {
            let new_email = ctx.new_email.as_deref().unwrap_or_default();
            let paragraphs = vec![
                vec![
                    Segment::Literal("We are connecting "),
                    Segment::Value(new_email),
                    Segment::Literal(" to the "),
                    Segment::Value(username),
                    Segment::Literal(" account on "),
                    Segment::Value(site_name),
                    Segment::Literal(". This is a notification sent to "),
                    Segment::Value(ctx.email.as_deref().unwrap_or_default()),
                    Segment::Literal(" because that is the primary email address we have on file."),
                ],
                vec![Segment::Literal(
                    "If you didn't request this, please sign in and remove the new address.",
                )],
            ];
            (format!("Connecting {new_email} to {username} on {site_name}."), paragraphs)
        }
    };

    RenderedMessage {
        subject,
        text: render_text(&paragraphs),
        html: render_html(&paragraphs),
    }
}

fn render_text(paragraphs: &[Paragraph]) -> String {
    paragraphs
        .iter()
        .map(|p| {
            p.iter()
                .map(|s| match s {
                    Segment::Literal(v) | Segment::Value(v) | Segment::Link(v) => *v,
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_html(paragraphs: &[Paragraph]) -> String {
    let mut out = String::from("<html><body>");
    for p in paragraphs {
        out.push_str("<p>");
        for s in p {
            match s {
                Segment::Literal(v) => out.push_str(v),
                Segment::Value(v) => out.push_str(&escape_html(v)),
                Segment::Link(v) => {
                    let escaped = escape_html(v);
                    out.push_str(&format!("<a href=\"{escaped}\">{escaped}</a>"));
                }
            }
        }
        out.push_str("</p>");
    }
    out.push_str("</body></html>");
    out
}

/// Escape text for inclusion in HTML element content or a quoted attribute
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
