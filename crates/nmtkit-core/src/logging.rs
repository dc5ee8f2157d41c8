//! Logging setup with request-ID aware log lines.
//!
//! Library code logs through the `log` facade (or `tracing`); services call
//! [`init_logging`] once at startup. Each line is rendered from the template in
//! [`LoggingSettings::format`], which may use these placeholders:
//!
//! | placeholder | value |
//! |---|---|
//! | `{ts}` | local timestamp |
//! | `{pid}` | process ID |
//! | `{tid}` | thread ID |
//! | `{rid}` | current request ID, `-` outside a request |
//! | `{level}` | level name |
//! | `{name}` | log target (module path) |
//! | `{file}` / `{line}` | source location |
//! | `{message}` | the formatted message and fields |
//!
//! Unknown placeholders are written out unchanged.

use std::fmt::{self, Write as _};

use tracing::{Event, Subscriber};
use tracing_log::NormalizeEvent;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt as tsfmt};

use crate::request_id::current_request_id;
use crate::settings::LoggingSettings;
use crate::{Error, Result};

/// Default line template.
pub const DEFAULT_FORMAT: &str = "[ts={ts}] [pid={pid}] [tid={tid}] [rid={rid}] \
     [level={level}] [name={name}] [file={file}:{line}] [message={message}]";

/// Values substituted into a line template.
#[derive(Debug, Clone, Default)]
pub struct LogLine<'a> {
    /// Timestamp.
    pub ts: String,
    /// Process ID.
    pub pid: u32,
    /// Thread ID.
    pub tid: String,
    /// Request ID, if any.
    pub rid: Option<String>,
    /// Level name.
    pub level: &'a str,
    /// Log target.
    pub name: &'a str,
    /// Source file.
    pub file: &'a str,
    /// Source line.
    pub line: Option<u32>,
    /// Message.
    pub message: String,
}

/// Render a line template.
pub fn render_line(template: &str, line: &LogLine<'_>) -> String {
    let mut out = String::with_capacity(template.len() + line.message.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        let after = &rest[start..];
        let Some(end) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let placeholder = &after[1..end];
        // write! into a String cannot fail
        let _ = match placeholder {
            "ts" => write!(out, "{}", line.ts),
            "pid" => write!(out, "{}", line.pid),
            "tid" => write!(out, "{}", line.tid),
            "rid" => write!(out, "{}", line.rid.as_deref().unwrap_or("-")),
            "level" => write!(out, "{}", line.level),
            "name" => write!(out, "{}", line.name),
            "file" => write!(out, "{}", line.file),
            "line" => match line.line {
                Some(n) => write!(out, "{n}"),
                None => write!(out, "?"),
            },
            "message" => write!(out, "{}", line.message),
            _ => write!(out, "{{{placeholder}}}"),
        };
        rest = &after[end + 1..];
    }
    // Whatever is left has no complete placeholder in it.
    out.push_str(rest);
    out
}

/// Translate a level name (`DEBUG`, `INFO`, `WARNING`, ...) to a filter directive.
pub fn level_directive(level: &str) -> Result<&'static str> {
    match level.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Ok("trace"),
        "DEBUG" => Ok("debug"),
        "INFO" => Ok("info"),
        "WARN" | "WARNING" => Ok("warn"),
        "ERROR" | "CRITICAL" | "FATAL" => Ok("error"),
        "OFF" => Ok("off"),
        other => Err(Error::config(format!("Unknown log level '{other}'"))),
    }
}

/// Build the `EnvFilter` directive string for the given settings.
pub fn filter_directives(settings: &LoggingSettings) -> Result<String> {
    let mut directives = vec![level_directive(&settings.level)?.to_string()];
    for logger in &settings.loggers {
        if logger.name.trim().is_empty() {
            return Err(Error::config("Logger override without a name"));
        }
        directives.push(format!(
            "{}={}",
            logger.name.trim(),
            level_directive(&logger.level)?
        ));
    }
    Ok(directives.join(","))
}

/// Event formatter rendering [`LoggingSettings::format`] templates.
#[derive(Debug, Clone)]
pub struct TemplateFormat {
    template: String,
}

impl TemplateFormat {
    /// Create a formatter for the given template.
    pub fn new<S: Into<String>>(template: S) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl Default for TemplateFormat {
    fn default() -> Self {
        Self::new(DEFAULT_FORMAT)
    }
}

impl<S, N> FormatEvent<S, N> for TemplateFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        // Records bridged from `log` carry their real target and location here.
        let normalized = event.normalized_metadata();
        let meta = normalized.as_ref().unwrap_or_else(|| event.metadata());

        let mut message = String::new();
        ctx.format_fields(Writer::new(&mut message), event)?;

        let tid = format!("{:?}", std::thread::current().id());
        let line = LogLine {
            ts: chrono::Local::now()
                .format("%Y-%m-%d %H:%M:%S%.3f")
                .to_string(),
            pid: std::process::id(),
            tid: tid
                .trim_start_matches("ThreadId(")
                .trim_end_matches(')')
                .to_string(),
            rid: current_request_id(),
            level: meta.level().as_str(),
            name: meta.target(),
            file: meta.file().unwrap_or("?"),
            line: meta.line(),
            message,
        };

        writeln!(writer, "{}", render_line(&self.template, &line))
    }
}

/// Install the global subscriber for these settings.
///
/// `log` records are forwarded to it. Fails if a global subscriber is already set.
pub fn init_logging(settings: &LoggingSettings) -> Result<()> {
    let filter = EnvFilter::try_new(filter_directives(settings)?)
        .map_err(|e| Error::config(format!("Invalid logging filter: {e}")))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tsfmt::layer().event_format(TemplateFormat::new(settings.format.clone())))
        .try_init()
        .map_err(|e| Error::config(format!("Failed to initialize logging: {e}")))
}
