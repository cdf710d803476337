//! Access log format module
//!
//! Supports multiple log formats:
//! - `combined` (Apache/Nginx combined format, plus service time)
//! - `common` (Common Log Format - CLF)
//! - `json` (one JSON object per line)
//! - Custom patterns with `$variables`

use chrono::{DateTime, Local};
use serde_json::json;

const CLF_TIME: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Access log entry containing all request/response information
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    /// Client address
    pub remote_addr: String,
    /// Time the request was received
    pub time: DateTime<Local>,
    pub method: String,
    /// Request path as sent by the client (still percent-encoded)
    pub path: String,
    /// Query string (without leading ?)
    pub query: Option<String>,
    /// HTTP version (1.0, 1.1)
    pub http_version: String,
    pub status: u16,
    /// Declared response body size; 0 for HEAD and bodiless statuses
    pub body_bytes: u64,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    /// Time to produce the response head, in microseconds
    pub request_time_us: u64,
}

impl AccessLogEntry {
    /// Create a new access log entry stamped with the current time
    pub fn new(remote_addr: String, method: String, path: String) -> Self {
        Self {
            remote_addr,
            time: Local::now(),
            method,
            path,
            query: None,
            http_version: "1.1".to_string(),
            status: 200,
            body_bytes: 0,
            referer: None,
            user_agent: None,
            request_time_us: 0,
        }
    }

    /// Format the log entry according to the specified format
    pub fn format(&self, format: &str) -> String {
        match format {
            "combined" => self.format_combined(),
            "common" => self.format_common(),
            "json" => self.format_json(),
            custom => self.format_custom(custom),
        }
    }

    fn request_uri(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }

    fn request_line(&self) -> String {
        format!(
            "{} {} HTTP/{}",
            self.method,
            self.request_uri(),
            self.http_version
        )
    }

    /// `$remote_addr - - [$time_local] "$request" $status $body_bytes_sent "$http_referer" "$http_user_agent" ${request_time}us`
    fn format_combined(&self) -> String {
        format!(
            "{} \"{}\" \"{}\" {}us",
            self.format_common(),
            self.referer.as_deref().unwrap_or("-"),
            self.user_agent.as_deref().unwrap_or("-"),
            self.request_time_us,
        )
    }

    /// `$remote_addr - - [$time_local] "$request" $status $body_bytes_sent`
    fn format_common(&self) -> String {
        format!(
            "{} - - [{}] \"{}\" {} {}",
            self.remote_addr,
            self.time.format(CLF_TIME),
            self.request_line(),
            self.status,
            self.body_bytes,
        )
    }

    fn format_json(&self) -> String {
        json!({
            "remote_addr": self.remote_addr,
            "time": self.time.to_rfc3339(),
            "method": self.method,
            "path": self.path,
            "query": self.query,
            "http_version": self.http_version,
            "status": self.status,
            "body_bytes": self.body_bytes,
            "referer": self.referer,
            "user_agent": self.user_agent,
            "request_time_us": self.request_time_us,
        })
        .to_string()
    }

    /// Custom format with variable substitution
    ///
    /// Supported variables:
    /// - `$remote_addr` - Client address
    /// - `$time_local` - Local time in Common Log Format
    /// - `$time_iso8601` - ISO 8601 timestamp
    /// - `$request` - Full request line ("METHOD /path HTTP/version")
    /// - `$request_method` - HTTP method
    /// - `$request_uri` - Request URI with query string
    /// - `$request_time` - Service time in seconds (3 decimal places)
    /// - `$status` - Response status code
    /// - `$body_bytes_sent` - Response body size
    /// - `$http_referer` - Referer header
    /// - `$http_user_agent` - User-Agent header
    fn format_custom(&self, pattern: &str) -> String {
        #[allow(clippy::cast_precision_loss)]
        let request_time = self.request_time_us as f64 / 1_000_000.0;

        // Longer names first: `$request_time` and friends before `$request`
        let variables = [
            ("$remote_addr", self.remote_addr.clone()),
            ("$time_local", self.time.format(CLF_TIME).to_string()),
            ("$time_iso8601", self.time.to_rfc3339()),
            ("$request_time", format!("{request_time:.3}")),
            ("$request_method", self.method.clone()),
            ("$request_uri", self.request_uri()),
            ("$request", self.request_line()),
            ("$status", self.status.to_string()),
            ("$body_bytes_sent", self.body_bytes.to_string()),
            (
                "$http_referer",
                self.referer.clone().unwrap_or_else(|| "-".to_string()),
            ),
            (
                "$http_user_agent",
                self.user_agent.clone().unwrap_or_else(|| "-".to_string()),
            ),
        ];

        variables
            .iter()
            .fold(pattern.to_string(), |line, (name, value)| {
                line.replace(name, value)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_entry() -> AccessLogEntry {
        let mut entry = AccessLogEntry::new(
            "192.168.1.1:50000".to_string(),
            "GET".to_string(),
            "/music/Album%201/".to_string(),
        );
        entry.query = Some("zip".to_string());
        entry.status = 206;
        entry.body_bytes = 1234;
        entry.referer = Some("https://example.com".to_string());
        entry.user_agent = Some("mpv/0.38".to_string());
        entry.request_time_us = 1_250_000;
        entry
    }

    #[test]
    fn test_format_combined() {
        let log = create_test_entry().format("combined");
        assert!(log.starts_with("192.168.1.1:50000 - - ["));
        assert!(log.contains("\"GET /music/Album%201/?zip HTTP/1.1\""));
        assert!(log.contains("206 1234"));
        assert!(log.contains("\"https://example.com\" \"mpv/0.38\""));
        assert!(log.ends_with(" 1250000us"));
    }

    #[test]
    fn test_format_common() {
        let log = create_test_entry().format("common");
        assert!(log.contains("GET /music/Album%201/?zip HTTP/1.1"));
        assert!(log.ends_with("206 1234"));
        assert!(!log.contains("https://example.com"));
    }

    #[test]
    fn test_format_json() {
        let log = create_test_entry().format("json");
        let value: serde_json::Value = serde_json::from_str(&log).unwrap();
        assert_eq!(value["remote_addr"], "192.168.1.1:50000");
        assert_eq!(value["method"], "GET");
        assert_eq!(value["status"], 206);
        assert_eq!(value["body_bytes"], 1234);
        assert_eq!(value["query"], "zip");
        assert_eq!(value["request_time_us"], 1_250_000);
    }

    #[test]
    fn test_format_json_escapes() {
        let mut entry = create_test_entry();
        entry.user_agent = Some("quote\"and\\slash".to_string());
        entry.query = None;
        let value: serde_json::Value = serde_json::from_str(&entry.format("json")).unwrap();
        assert_eq!(value["user_agent"], "quote\"and\\slash");
        assert!(value["query"].is_null());
    }

    #[test]
    fn test_format_custom() {
        let log = create_test_entry().format("$request_method $request_uri $status $request_time");
        assert_eq!(log, "GET /music/Album%201/?zip 206 1.250");

        let log = create_test_entry().format("[$request]");
        assert_eq!(log, "[GET /music/Album%201/?zip HTTP/1.1]");
    }
}
