//! Editor notifications and per-request error surfacing.
//!
//! Two audiences exist. Block notifications are collected per render and only
//! shown inside the editor preview. Diagnostics collect configuration and
//! dependency problems for the whole request: a frontend error page for
//! visitors and backend notices for administrators.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Notice,
    Warning,
    Error,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Notice => "Notice",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Notice => "notice",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message shown to editors on top of a block preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub severity: Severity,
    pub type_name: &'static str,
}

impl Notification {
    pub fn new(block_title: &str, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: format!("{block_title} block"),
            message: message.into(),
            severity,
            type_name: severity.label(),
        }
    }
}

/// Where the current request is being served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestKind {
    #[default]
    Frontend,
    Admin,
    Login,
}

/// A visitor-facing error page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontendError {
    pub title: String,
    pub subtitle: String,
    pub message: String,
}

impl FrontendError {
    pub fn to_html(&self) -> String {
        format!(
            "<h1>{}<br><small>{}</small></h1><p>{}</p>",
            html_escape::encode_text(&self.title),
            html_escape::encode_text(&self.subtitle),
            html_escape::encode_text(&self.message)
        )
    }
}

/// An administrator-facing notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendNotice {
    pub message: String,
    pub severity: Severity,
    pub title: String,
}

/// Request-scoped collector for configuration and dependency problems.
///
/// Backend notices are deduplicated by message so that many instances of the
/// same broken block produce a single notice.
#[derive(Debug, Default)]
pub struct Diagnostics {
    theme_name: String,
    request: RequestKind,
    frontend_errors: Vec<FrontendError>,
    backend_notices: IndexMap<String, BackendNotice>,
}

impl Diagnostics {
    pub fn new(theme_name: impl Into<String>, request: RequestKind) -> Self {
        Self {
            theme_name: theme_name.into(),
            request,
            ..Self::default()
        }
    }

    pub fn request(&self) -> RequestKind {
        self.request
    }

    /// Record a visitor-facing error. Ignored in admin and login requests.
    pub fn frontend_error(&mut self, message: &str, subtitle: &str) {
        if self.request != RequestKind::Frontend {
            return;
        }
        if self.frontend_errors.iter().any(|e| e.message == message) {
            return;
        }

        log::error!("{message} {subtitle}");
        self.frontend_errors.push(FrontendError {
            title: format!("{} \u{203a} error", self.theme_name).trim().to_string(),
            subtitle: subtitle.to_string(),
            message: message.to_string(),
        });
    }

    pub fn backend_notification(&mut self, message: &str, severity: Severity, title: &str) {
        if self.backend_notices.contains_key(message) {
            return;
        }
        self.backend_notices.insert(
            message.to_string(),
            BackendNotice {
                message: message.to_string(),
                severity,
                title: title.to_string(),
            },
        );
    }

    pub fn backend_error(&mut self, message: &str, subtitle: &str) {
        self.backend_notification(message, Severity::Error, subtitle);
    }

    /// Surface a configuration or dependency problem to both audiences.
    pub fn configuration_error(&mut self, message: &str, subtitle: &str) {
        self.frontend_error(message, subtitle);
        self.backend_error(message, subtitle);
    }

    pub fn frontend_errors(&self) -> &[FrontendError] {
        &self.frontend_errors
    }

    pub fn backend_notices(&self) -> impl Iterator<Item = &BackendNotice> {
        self.backend_notices.values()
    }

    pub fn has_errors(&self) -> bool {
        !self.frontend_errors.is_empty()
            || self
                .backend_notices
                .values()
                .any(|n| n.severity == Severity::Error)
    }

    /// HTML for the admin notices area.
    pub fn render_backend_notices(&self) -> String {
        self.backend_notices
            .values()
            .map(|notice| {
                let type_title = format!("{} \u{203a} {}", self.theme_name, notice.severity.label());
                let subtitle = if notice.title.is_empty() {
                    String::new()
                } else {
                    format!("<br><small>{}</small>", html_escape::encode_text(&notice.title))
                };
                format!(
                    "<div class='notice notice-{}'><h2>{}{}</h2><p>{}</p></div>",
                    notice.severity,
                    html_escape::encode_text(type_title.trim()),
                    subtitle,
                    html_escape::encode_text(&notice.message)
                )
            })
            .collect()
    }
}
