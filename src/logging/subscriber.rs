//! Tracing wiring: console event format, run-log layer and initialisation.
use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::sync::Mutex;

use tracing::field::{Field, Visit};

use super::render::{LineKind, render_console, render_file, run_header, timestamp};

/// Fields lrc events carry.
#[derive(Debug, Default)]
struct EventFields {
    message: String,
    location: String,
    severity: String,
}

impl EventFields {
    fn of(event: &tracing::Event<'_>) -> Self {
        let mut fields = Self::default();
        event.record(&mut fields);
        fields
    }

    fn slot(&mut self, field: &Field) -> Option<&mut String> {
        match field.name() {
            "message" => Some(&mut self.message),
            "location" => Some(&mut self.location),
            "severity" => Some(&mut self.severity),
            _ => None,
        }
    }

    fn kind(&self, metadata: &tracing::Metadata<'_>) -> LineKind<'_> {
        LineKind::classify(
            *metadata.level(),
            metadata.target(),
            &self.location,
            &self.severity,
        )
    }
}

impl Visit for EventFields {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if let Some(slot) = self.slot(field) {
            *slot = format!("{value:?}");
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if let Some(slot) = self.slot(field) {
            value.clone_into(slot);
        }
    }
}

/// Layer that appends every event to the run log as plain text.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Truncate `path`, write the run header for `command`, and keep the
    /// file open for appending.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be written or reopened.
    pub(super) fn create(path: &Path, command: &str) -> std::io::Result<Self> {
        let header = run_header(
            crate::commands::version::version(),
            command,
            chrono::Utc::now(),
        );
        fs::write(path, header)?;
        let file = fs::OpenOptions::new().append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let fields = EventFields::of(event);
        let line = render_file(
            &timestamp(),
            fields.kind(event.metadata()),
            &fields.message,
        );
        if let Ok(mut file) = self.file.lock() {
            writeln!(file, "{line}").ok();
        }
    }
}

/// Console event format for lrc.
struct ConsoleFormat;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ConsoleFormat
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let fields = EventFields::of(event);
        let line = render_console(fields.kind(event.metadata()), &fields.message);
        writeln!(writer, "{line}")
    }
}

/// Install the global subscriber.
///
/// The console shows INFO and above (DEBUG with `verbose`), warnings and
/// errors on stderr. When `log_file` is given, every event from DEBUG up is
/// also appended to it. Call once, before anything logs.
pub fn init_subscriber(verbose: bool, command: &str, log_file: Option<&Path>) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let console_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let writer = std::io::stderr
        .with_max_level(tracing::Level::WARN)
        .and(std::io::stdout.with_min_level(tracing::Level::INFO));
    let console = fmt::layer()
        .event_format(ConsoleFormat)
        .with_writer(writer)
        .with_filter(console_level);

    let run_log = log_file
        .and_then(|path| FileLayer::create(path, command).ok())
        .map(|layer| layer.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console)
        .with(run_log)
        .init();
}
