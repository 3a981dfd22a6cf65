//! Colorful console output for randomization events.
//!
//! Provides a `tracing` layer that prints aggregate log messages and
//! randomization summaries with colors. Initialized on the first
//! randomization when the `console` feature is enabled.

use std::fmt;
use std::io::{self, Write};
use std::sync::OnceLock;

use owo_colors::OwoColorize;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: OnceLock<()> = OnceLock::new();

const DEFAULT_DIRECTIVES: [&str; 2] = ["randforge_core=info", "randforge_solver=info"];

/// Initializes console output.
///
/// Only the first call has effect. `RUST_LOG` directives are honored on
/// top of the `randforge_core=info` and `randforge_solver=info` defaults.
pub fn init() {
    INIT.get_or_init(|| {
        let mut filter = EnvFilter::from_default_env();
        for default in DEFAULT_DIRECTIVES {
            if let Ok(directive) = default.parse() {
                filter = filter.add_directive(directive);
            }
        }
        // Another subscriber may already be installed by the host program.
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(ConsoleLayer)
            .try_init();
    });
}

/// A tracing layer that formats RandForge events with colors.
pub struct ConsoleLayer;

impl<S: Subscriber> Layer<S> for ConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !metadata.target().starts_with("randforge") {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let output = format_event(*metadata.level(), &visitor);
        if !output.is_empty() {
            let _ = writeln!(io::stdout(), "{output}");
        }
    }
}

#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    event: Option<String>,
    group: Option<String>,
    object: Option<String>,
    variables: Option<u64>,
    hard: Option<u64>,
    soft: Option<u64>,
    drawn: Option<u64>,
    elapsed_ms: Option<u64>,
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let s = format!("{value:?}");
        let s = s.trim_matches('"').to_string();
        match field.name() {
            "message" => self.message = Some(s),
            "event" => self.event = Some(s),
            "group" => self.group = Some(s),
            "object" => self.object = Some(s),
            _ => {}
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        match field.name() {
            "variables" => self.variables = Some(value),
            "hard" => self.hard = Some(value),
            "soft" => self.soft = Some(value),
            "drawn" => self.drawn = Some(value),
            "elapsed_ms" => self.elapsed_ms = Some(value),
            _ => {}
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_u64(field, value as u64);
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            "group" => self.group = Some(value.to_string()),
            "object" => self.object = Some(value.to_string()),
            _ => {}
        }
    }
}

fn format_event(level: Level, v: &EventVisitor) -> String {
    match v.event.as_deref() {
        Some("randomize_done") => format_randomize_done(level, v),
        Some(_) => String::new(),
        None => format_message(level, v),
    }
}

fn format_message(level: Level, v: &EventVisitor) -> String {
    let message = v.message.as_deref().unwrap_or("");
    let group = v.group.as_deref().or(v.object.as_deref()).unwrap_or("randforge");
    format!(
        "{} {} {} {}",
        timestamp().bright_black(),
        format_level(level),
        format!("[{group}]").bright_cyan(),
        message
    )
}

fn format_randomize_done(level: Level, v: &EventVisitor) -> String {
    let object = v.object.as_deref().unwrap_or("?");
    format!(
        "{} {} {} randomized {} variables ({} hard, {} soft, {} drawn) in {}",
        timestamp().bright_black(),
        format_level(level),
        format!("[{object}]").bright_cyan(),
        v.variables.unwrap_or(0).bright_yellow(),
        v.hard.unwrap_or(0).yellow(),
        v.soft.unwrap_or(0).yellow(),
        v.drawn.unwrap_or(0).white(),
        format_duration_ms(v.elapsed_ms.unwrap_or(0)).bright_magenta()
    )
}

fn format_level(level: Level) -> String {
    match level {
        Level::ERROR => "ERROR".bright_red().bold().to_string(),
        Level::WARN => " WARN".yellow().to_string(),
        Level::INFO => " INFO".bright_green().to_string(),
        Level::DEBUG => "DEBUG".bright_blue().to_string(),
        Level::TRACE => "TRACE".bright_black().to_string(),
    }
}

fn timestamp() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| {
            let secs = d.as_secs() % 100000;
            let millis = d.subsec_millis();
            format!("{:5}.{:03}", secs, millis)
        })
        .unwrap_or_else(|_| "    0.000".to_string())
}

fn format_duration_ms(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else {
        format!("{:.2}s", ms as f64 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_format() {
        assert_eq!(format_duration_ms(15), "15ms");
        assert_eq!(format_duration_ms(2500), "2.50s");
    }

    #[test]
    fn test_unknown_events_are_silent() {
        let visitor = EventVisitor {
            event: Some("solver_check".to_string()),
            ..EventVisitor::default()
        };
        assert!(format_event(Level::DEBUG, &visitor).is_empty());
    }

    #[test]
    fn test_randomize_summary_is_shown() {
        let visitor = EventVisitor {
            event: Some("randomize_done".to_string()),
            object: Some("top.pair".to_string()),
            variables: Some(2),
            hard: Some(1),
            soft: Some(16),
            drawn: Some(0),
            elapsed_ms: Some(3),
            ..EventVisitor::default()
        };
        let line = format_event(Level::INFO, &visitor);
        assert!(line.contains("[top.pair]"));
        assert!(line.contains("randomized"));
        assert!(line.contains("3ms"));
    }

    #[test]
    fn test_default_directives_parse() {
        for directive in DEFAULT_DIRECTIVES {
            assert!(directive.parse::<tracing_subscriber::filter::Directive>().is_ok());
        }
    }

    #[test]
    fn test_messages_show_group() {
        let visitor = EventVisitor {
            message: Some("hello".to_string()),
            group: Some("top.env".to_string()),
            ..EventVisitor::default()
        };
        let line = format_event(Level::INFO, &visitor);
        assert!(line.contains("[top.env]"));
        assert!(line.ends_with("hello"));
    }
}
