//! MIME extraction over `mail-parser`.

use mail_parser::{Message, MessageParser};

use crate::error::MailStoreError;

/// Subject, plain-text body, and Message-ID pulled out of a raw message.
#[derive(Debug, Clone)]
pub struct ParsedMail {
    pub subject: String,
    pub body: String,
    /// RFC 822 Message-ID, used for permalinks.
    pub message_id: Option<String>,
}

/// Parse raw RFC 822 bytes.
///
/// Prefers the first plain-text part; an HTML-only message has its markup
/// stripped. A missing subject becomes `"(no subject)"`.
pub fn parse_mail(id: &str, raw: &[u8]) -> Result<ParsedMail, MailStoreError> {
    let message = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| MailStoreError::Malformed {
            id: id.to_string(),
            reason: "unparseable MIME message".into(),
        })?;

    let subject = message.subject().unwrap_or("(no subject)").to_string();
    let body = extract_text(&message);
    let message_id = message.message_id().map(str::to_string);

    Ok(ParsedMail {
        subject,
        body,
        message_id,
    })
}

/// Extract readable text from a parsed message: first plain-text part,
/// falling back to the first HTML part with tags stripped.
fn extract_text(message: &Message) -> String {
    if let Some(text) = message.body_text(0) {
        return text.to_string();
    }
    if let Some(html) = message.body_html(0) {
        return strip_html(html.as_ref());
    }
    String::new()
}

/// Strip HTML tags from content (basic) and normalize whitespace.
fn strip_html(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Gmail permalink for a message, keyed by its RFC 822 Message-ID.
pub fn permalink(message_id: Option<&str>) -> String {
    message_id
        .map(|id| format!("https://mail.google.com/mail/u/0/#search/rfc822msgid:{id}"))
        .unwrap_or_default()
}
