//! Terminal presentation: banner, report lines and capture outcome styling.

use crate::request::{version_to_string, HopReport};
use crate::shared::capture::CaptureOutcome;
use crate::shared::headers::HeaderLine;
use crate::shared::peer_cert::CertSummary;
use colored::*;

const BANNER: &str = r"
 _     _   _                   _        _
| |__ | |_| |_ _ __        ___| |_ __ _| |_
| '_ \| __| __| '_ \ _____/ __| __/ _` | __|
| | | | |_| |_| |_) |_____\__ \ || (_| | |_
|_| |_|\__|\__| .__/      |___/\__\__,_|\__|
              |_|
";

pub fn render() -> String {
    BANNER.bright_blue().bold().to_string()
}

/// `Body read` in green, `Body discarded` in yellow; nothing when skipped.
pub fn style_outcome(outcome: &CaptureOutcome) -> Option<String> {
    match outcome {
        CaptureOutcome::Skipped => None,
        CaptureOutcome::Discarded => Some(outcome.to_string().bright_yellow().bold().to_string()),
        CaptureOutcome::Written(path) => Some(format!(
            "{} {}",
            outcome.to_string().bright_green().bold(),
            path.display().to_string().cyan().underline()
        )),
    }
}

/// `Key: value` with the key in white and the value in cyan.
pub fn style_header(line: &HeaderLine) -> String {
    format!("{}: {}", line.key().white(), line.value().cyan())
}

fn style_status(status: hyper::StatusCode) -> ColoredString {
    let text = status.to_string();
    match status.as_u16() {
        200..=299 => text.bright_green().bold(),
        300..=399 => text.bright_yellow().bold(),
        _ => text.bright_red().bold(),
    }
}

fn style_validity(cert: &CertSummary) -> Option<String> {
    Some(format!(
        "valid {} .. {} (unix)",
        cert.not_before?, cert.not_after?
    ))
}

/// The lines printed for one hop.
pub fn render_hop(hop: &HopReport) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(addr) = hop.remote_addr {
        lines.push(format!(
            "{} {}",
            "Connected to".white(),
            addr.to_string().bright_cyan().bold()
        ));
    }

    if let Some(tls) = &hop.tls {
        lines.push(format!(
            "{} {} {}",
            "TLS".white().bold(),
            tls.protocol.bright_blue(),
            tls.cipher.white()
        ));
        let cert = &tls.certificate;
        if let Some(subject) = &cert.subject {
            lines.push(format!("  subject: {}", subject.white()));
        }
        if let Some(issuer) = &cert.issuer {
            lines.push(format!("  issuer: {}", issuer.white()));
        }
        if !cert.san.is_empty() {
            lines.push(format!("  san: {}", cert.san.join(", ").white()));
        }
        if let Some(validity) = style_validity(cert) {
            lines.push(format!("  {}", validity));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "{} {}",
        version_to_string(hop.version).bright_green().bold(),
        style_status(hop.status)
    ));
    for header in &hop.headers {
        lines.push(style_header(header));
    }
    lines
}
