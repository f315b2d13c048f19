//! Report cards.
//!
//! A [`Card`] is the display form of one report. Cards keep the order of
//! the reports they were built from and render as plain text, an HTML page
//! or JSON.

use std::fmt::{self, Write as _};

use chrono::TimeZone;
use serde_json::Value;

use crate::error::Result;
use crate::media::VOICE_NOTE_CONTENT_TYPE;
use crate::report::Report;

/// Placeholder for a report without a voice note.
pub const NO_VOICE_NOTE: &str = "No voice note available";

/// Placeholder for a report without images.
pub const NO_MEDIA: &str = "No media";

const CALL_TIME_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// Display form of one report.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    /// Store identifier, when known.
    pub id: Option<String>,
    /// `Distress type: …`
    pub distress_type: String,
    /// `Caller: …`
    pub caller: String,
    /// `Caller number: …`
    pub caller_number: String,
    /// `Call time: …`, already formatted for the chosen time zone.
    pub call_time: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// `Help dispatched: …`
    pub message: String,
    /// Voice note URL.
    pub voice_note: Option<String>,
    /// Image URLs; `None` marks a failed upload.
    pub images: Vec<Option<String>>,
}

impl Card {
    /// Build the card for `report`, showing the call time in `tz`.
    pub fn from_report<Tz>(report: &Report, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        Self {
            id: report.id.clone(),
            distress_type: report.distress_type.to_string(),
            caller: report.caller_name.clone(),
            caller_number: report.caller_number.clone(),
            call_time: report
                .call_time
                .with_timezone(tz)
                .format(CALL_TIME_FORMAT)
                .to_string(),
            latitude: report.location.latitude,
            longitude: report.location.longitude,
            message: report.message.clone(),
            voice_note: report.voice_note.clone(),
            images: report.images.clone(),
        }
    }

    /// The six labelled text fields, in display order.
    #[must_use]
    pub fn text_fields(&self) -> [String; 6] {
        [
            format!("Distress type: {}", self.distress_type),
            format!("Caller: {}", self.caller),
            format!("Caller number: {}", self.caller_number),
            format!("Call time: {}", self.call_time),
            format!(
                "Distress location: Latitude {}, Longitude {}",
                self.latitude, self.longitude
            ),
            format!("Help dispatched: {}", self.message),
        ]
    }

    fn voice_note_line(&self) -> String {
        self.voice_note
            .as_ref()
            .map_or_else(|| NO_VOICE_NOTE.to_string(), |url| format!("Voice note: {url}"))
    }

    fn media_line(&self) -> String {
        if self.images.is_empty() {
            return NO_MEDIA.to_string();
        }
        let urls: Vec<&str> = self
            .images
            .iter()
            .map(|url| url.as_deref().unwrap_or("(upload failed)"))
            .collect();
        format!("Media: {}", urls.join(", "))
    }
}

/// Cards for `reports`, in the same order.
pub fn cards<Tz>(reports: &[Report], tz: &Tz) -> Vec<Card>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    reports.iter().map(|r| Card::from_report(r, tz)).collect()
}

/// Plain text, one block per card separated by blank lines.
#[must_use]
pub fn render_text(cards: &[Card]) -> String {
    let mut out = String::new();
    for (i, card) in cards.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        for field in card.text_fields() {
            let _ = writeln!(out, "{field}");
        }
        let _ = writeln!(out, "{}", card.voice_note_line());
        let _ = writeln!(out, "{}", card.media_line());
    }
    out
}

/// Escape text for inclusion in HTML content or attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn html_card(out: &mut String, card: &Card) {
    out.push_str("<article class=\"distress-card\">\n");
    for field in card.text_fields() {
        let _ = writeln!(out, "  <p>{}</p>", escape_html(&field));
    }

    out.push_str("  <div>");
    match &card.voice_note {
        Some(url) => {
            let _ = write!(
                out,
                "<audio controls><source src=\"{}\" type=\"{}\">Your browser does not support the audio element.</audio>",
                escape_html(url),
                VOICE_NOTE_CONTENT_TYPE
            );
        }
        None => out.push_str(NO_VOICE_NOTE),
    }
    out.push_str("</div>\n");

    out.push_str("  <div>");
    if card.images.is_empty() {
        out.push_str(NO_MEDIA);
    }
    for url in card.images.iter().flatten() {
        let _ = write!(
            out,
            "<img src=\"{}\" alt=\"media\" style=\"max-width: 100px;\"/>",
            escape_html(url)
        );
    }
    out.push_str("</div>\n");
    out.push_str("</article>\n");
}

/// A standalone HTML page with one article per card.
#[must_use]
pub fn render_html(cards: &[Card]) -> String {
    let mut out = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>SOS Messages</title>\n</head>\n<body>\n<div class=\"container\">\n",
    );
    for card in cards {
        html_card(&mut out, card);
    }
    out.push_str("</div>\n</body>\n</html>\n");
    out
}

/// Reports as a pretty-printed JSON array, each carrying its `id`.
///
/// # Errors
///
/// Returns an error if a report cannot be serialized.
pub fn render_json(reports: &[Report]) -> Result<String> {
    let documents = reports
        .iter()
        .map(|report| -> Result<Value> {
            let mut document = serde_json::to_value(report)?;
            if let (Value::Object(fields), Some(id)) = (&mut document, &report.id) {
                fields.insert("id".to_string(), Value::String(id.clone()));
            }
            Ok(document)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(serde_json::to_string_pretty(&documents)?)
}
