//! Rendering of operation events to stdout/stderr in one of two formats.

pub mod event;
mod json;
mod table;

pub use event::{Direction, OutputEvent, function_name};

use json::JsonRenderer;
use table::TableRenderer;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::io::{self, Stderr, Stdout, Write};

#[derive(
    Serialize, Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

/// Rendering options, fixed for the lifetime of an [`Output`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub verbose: bool,
    pub quiet: bool,
    pub colors_enabled: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Human,
            verbose: false,
            quiet: false,
            colors_enabled: true,
        }
    }
}

impl OutputOptions {
    pub fn human(colors_enabled: bool) -> Self {
        Self {
            colors_enabled,
            ..Default::default()
        }
    }

    pub fn json() -> Self {
        Self {
            format: OutputFormat::Json,
            colors_enabled: false,
            ..Default::default()
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }
}

#[derive(Debug)]
enum Renderer {
    Json(JsonRenderer),
    Table(TableRenderer),
}

impl Renderer {
    fn new(options: &OutputOptions) -> Self {
        match options.format {
            OutputFormat::Json => Self::Json(JsonRenderer::default()),
            OutputFormat::Human => Self::Table(TableRenderer::new(options.colors_enabled)),
        }
    }

    fn set_iteration(&mut self, iteration: Option<u32>) {
        match self {
            Self::Json(r) => r.set_iteration(iteration),
            Self::Table(r) => r.set_iteration(iteration),
        }
    }

    fn render(&self, out: &mut dyn Write, event: &OutputEvent) -> io::Result<()> {
        match self {
            Self::Json(r) => r.render(out, event),
            Self::Table(r) => r.render(out, event),
        }
    }
}

/// Event sink bound to a primary and a diagnostic stream.
pub struct Output<O: Write = Stdout, E: Write = Stderr> {
    options: OutputOptions,
    renderer: Renderer,
    out: O,
    err: E,
}

impl Output {
    pub fn new(options: OutputOptions) -> Self {
        Self::with_writers(options, io::stdout(), io::stderr())
    }
}

impl<O: Write, E: Write> Output<O, E> {
    pub fn with_writers(options: OutputOptions, out: O, err: E) -> Self {
        Self {
            renderer: Renderer::new(&options),
            options,
            out,
            err,
        }
    }

    pub fn options(&self) -> &OutputOptions {
        &self.options
    }

    /// Tag all following events with a polling iteration, `None` clears the tag.
    pub fn set_iteration(&mut self, iteration: Option<u32>) {
        self.renderer.set_iteration(iteration);
    }

    pub fn render(&mut self, event: &OutputEvent) -> io::Result<()> {
        if self.options.quiet && event.is_chatter() {
            return Ok(());
        }

        let sink: &mut dyn Write = if event.is_diagnostic() {
            &mut self.err
        } else {
            &mut self.out
        };
        self.renderer.render(sink, event)?;
        sink.flush()
    }

    pub fn info(&mut self, message: impl Into<String>) -> io::Result<()> {
        self.render(&OutputEvent::Info(message.into()))
    }

    pub fn success(&mut self, message: impl Into<String>) -> io::Result<()> {
        self.render(&OutputEvent::Success(message.into()))
    }

    pub fn warning(&mut self, message: impl Into<String>) -> io::Result<()> {
        self.render(&OutputEvent::Warning(message.into()))
    }

    pub fn error(&mut self, message: impl Into<String>) -> io::Result<()> {
        self.render(&OutputEvent::Error(message.into()))
    }

    /// Report a failed operation. Verbose mode includes the full cause chain.
    pub fn report(&mut self, error: &anyhow::Error) -> io::Result<()> {
        let message = if self.options.verbose {
            format!("{error:?}")
        } else {
            format!("{error:#}")
        };
        self.error(message)
    }

    pub fn into_writers(self) -> (O, E) {
        (self.out, self.err)
    }
}
