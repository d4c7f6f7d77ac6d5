//! Plain-text GRN summaries and WhatsApp deep links.
//!
//! # Invariants
//! - Links use `https://wa.me/<digits>?text=<message>` where the message is
//!   UTF-8 percent-encoded, keeping only RFC 3986 unreserved characters.
//! - Phone numbers in links are 8 to 15 digits with no `+`.

use crate::model::grn::GoodsReceivedNote;
use crate::model::ValidationError;
use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;

const WHATSAPP_BASE_URL: &str = "https://wa.me/";

static PHONE_SEPARATORS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\-().]").expect("valid phone separator regex"));
static WHATSAPP_DIGITS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{8,15}$").expect("valid whatsapp digits regex"));

/// Builds the message body shared with a supplier for one GRN.
pub fn grn_share_message(grn: &GoodsReceivedNote, supplier_name: &str) -> String {
    let mut lines = vec![
        format!("Goods Received Note {}", grn.grn_number),
        format!("Supplier: {supplier_name}"),
        format!("Date: {}", format_date(grn.received_date)),
    ];
    if let Some(invoice) = grn.invoice_number.as_deref() {
        lines.push(format!("Invoice: {invoice}"));
    }
    lines.push(String::new());
    for (index, item) in grn.items.iter().enumerate() {
        lines.push(format!(
            "{}. {} x{} @ {} = {}",
            index + 1,
            item.product_name,
            item.accepted_qty,
            format_cents(item.unit_cost_cents),
            format_cents(item.line_total_cents)
        ));
        if item.rejected_qty > 0 {
            lines.push(format!("   rejected: {}", item.rejected_qty));
        }
    }
    if !grn.items.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!("Total: {}", format_cents(grn.total_cents)));
    lines.push(format!("Paid: {}", format_cents(grn.paid_cents)));
    lines.push(format!("Outstanding: {}", format_cents(grn.outstanding_cents())));
    lines.push(format!(
        "Status: {} / payment {}",
        grn.status.as_str(),
        grn.payment_status.as_str()
    ));
    lines.join("\n")
}

/// Reduces a phone number to the digit form WhatsApp expects.
///
/// A leading `+` or `00` marks an international number. A single leading
/// `0` is a local number and is replaced by `default_country_code`.
pub fn normalize_whatsapp_phone(
    raw: &str,
    default_country_code: Option<&str>,
) -> Result<String, ValidationError> {
    let cleaned = PHONE_SEPARATORS_RE.replace_all(raw.trim(), "");
    let digits = if let Some(rest) = cleaned.strip_prefix('+') {
        rest.to_string()
    } else if let Some(rest) = cleaned.strip_prefix("00") {
        rest.to_string()
    } else if let Some(rest) = cleaned.strip_prefix('0') {
        let country_code = default_country_code
            .map(|code| code.trim().trim_start_matches('+'))
            .filter(|code| !code.is_empty())
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "phone",
                reason: "local number given but no default country code is configured"
                    .to_string(),
            })?;
        format!("{country_code}{rest}")
    } else {
        cleaned.into_owned()
    };

    if WHATSAPP_DIGITS_RE.is_match(&digits) {
        Ok(digits)
    } else {
        Err(ValidationError::InvalidFormat {
            field: "phone",
            reason: format!("`{raw}` must normalize to 8 to 15 digits"),
        })
    }
}

pub fn whatsapp_link(
    phone: &str,
    message: &str,
    default_country_code: Option<&str>,
) -> Result<String, ValidationError> {
    let digits = normalize_whatsapp_phone(phone, default_country_code)?;
    Ok(format!(
        "{WHATSAPP_BASE_URL}{digits}?text={}",
        percent_encode(message)
    ))
}

/// Formats cents as `1,234.50`, with a leading `-` for negative amounts.
pub fn format_cents(cents: i64) -> String {
    let abs = cents.unsigned_abs();
    let whole = (abs / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, ch) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if cents < 0 { "-" } else { "" };
    format!("{sign}{grouped}.{:02}", abs % 100)
}

fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

fn format_date(epoch_ms: i64) -> String {
    DateTime::from_timestamp_millis(epoch_ms)
        .map(|value| value.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| epoch_ms.to_string())
}
