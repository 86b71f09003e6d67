//! Alert rendering for the email and chat channels.
//!
//! Both renderers include the category, severity, message, timestamp and the
//! numeric values of whichever excerpt sections are present.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::alerts::Alert;

/// Timestamp format used in notifications.
#[must_use]
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Email subject, e.g. `[CRITICAL] System Alert: High CPU usage: 95.0%`.
#[must_use]
pub fn email_subject(alert: &Alert) -> String {
    format!(
        "[{}] System Alert: {}",
        alert.severity.as_str().to_uppercase(),
        alert.message
    )
}

/// HTML email body.
#[must_use]
pub fn email_html(alert: &Alert) -> String {
    let excerpt = &alert.snapshot_excerpt;
    let mut items = String::new();
    if let Some(cpu) = excerpt.cpu {
        let _ = write!(items, "<li>CPU Usage: {:.1}%</li>", cpu.usage_percent);
    }
    if let Some(memory) = excerpt.memory {
        let _ = write!(items, "<li>Memory Usage: {:.1}%</li>", memory.percent_used);
    }
    if let Some(requests) = excerpt.requests {
        let _ = write!(
            items,
            "<li>Request Stats:<ul><li>Total: {}</li><li>Failed: {}</li>\
             <li>Avg Response Time: {:.2}ms</li></ul></li>",
            requests.total, requests.failed, requests.avg_response_time_ms
        );
    }

    let mut html = String::from("<h2>System Alert</h2>");
    let _ = write!(
        html,
        "<p><strong>Type:</strong> {}</p>\
         <p><strong>Category:</strong> {}</p>\
         <p><strong>Message:</strong> {}</p>\
         <p><strong>Time:</strong> {}</p>",
        alert.severity,
        alert.category,
        escape_html(&alert.message),
        format_timestamp(alert.timestamp)
    );
    if !items.is_empty() {
        let _ = write!(html, "<h3>System Metrics</h3><ul>{items}</ul>");
    }
    html
}

/// Chat message text in Slack `mrkdwn`.
#[must_use]
pub fn chat_text(alert: &Alert) -> String {
    let excerpt = &alert.snapshot_excerpt;
    let mut metrics = Vec::new();
    if let Some(cpu) = excerpt.cpu {
        metrics.push(format!("CPU Usage: {:.1}%", cpu.usage_percent));
    }
    if let Some(memory) = excerpt.memory {
        metrics.push(format!("Memory Usage: {:.1}%", memory.percent_used));
    }
    if let Some(requests) = excerpt.requests {
        metrics.push(format!(
            "Failed Requests: {}/{}",
            requests.failed, requests.total
        ));
        metrics.push(format!(
            "Avg Response Time: {:.2}ms",
            requests.avg_response_time_ms
        ));
    }

    let mut text = format!(
        ":rotating_light: *{} Alert* ({})\n*Message:* {}\n*Time:* {}",
        alert.severity.as_str().to_uppercase(),
        alert.category,
        escape_mrkdwn(&alert.message),
        format_timestamp(alert.timestamp)
    );
    if !metrics.is_empty() {
        let _ = write!(text, "\n*Metrics:* {}", metrics.join(" | "));
    }
    text
}

/// Slack control characters; everything else is sent verbatim.
fn escape_mrkdwn(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
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
