mod config;
mod test_runner;

use std::io::Write as _;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::{Files, SimpleFiles};
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

use deck::{Document, Element, Section};
use deck_renderer::{RenderWarning, Renderer, Rules};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "deck", version, about = "Slide deck parser and renderer")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Path to a deck.toml configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a deck to HTML
    Render(RenderArgs),

    /// Parse only; exit 0 if the deck is valid
    Check(FileArgs),

    /// Print the section tree
    Tree(FileArgs),

    /// Run .test.slide fixture files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct FileArgs {
    /// Slide source file
    file: PathBuf,
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Slide source file
    file: PathBuf,

    /// Write output here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.slide file or directory containing them
    path: PathBuf,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short = 'C', long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            1
        }
    };
    process::exit(code);
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<i32> {
    let color_choice = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Render(args) => {
            let session = Session::open(&args.file, color_choice)?;
            let Some(doc) = session.parse(&config) else {
                return Ok(1);
            };
            let renderer = Renderer::new(Rules::html())
                .with_playground(config.playground)
                .with_options(config.render);
            let rendered = renderer.render(&doc)?;
            session.emit_warnings(&rendered.warnings);

            match &args.output {
                Some(path) => std::fs::write(path, &rendered.output)
                    .with_context(|| format!("cannot write '{}'", path.display()))?,
                None => std::io::stdout()
                    .write_all(rendered.output.as_bytes())
                    .context("cannot write to stdout")?,
            }
            Ok(0)
        }
        Command::Check(args) => {
            let session = Session::open(&args.file, color_choice)?;
            let Some(doc) = session.parse(&config) else {
                return Ok(1);
            };
            eprintln!(
                "ok: {} parsed successfully ({} sections, {} elements)",
                args.file.display(),
                doc.section_count(),
                doc.element_count()
            );
            Ok(0)
        }
        Command::Tree(args) => {
            let session = Session::open(&args.file, color_choice)?;
            let Some(doc) = session.parse(&config) else {
                return Ok(1);
            };
            print!("{}", format_tree(&doc));
            Ok(0)
        }
        Command::Test(args) => {
            if args.list_categories {
                test_runner::list_categories(&args.path);
                return Ok(0);
            }
            Ok(test_runner::run_tests(
                &args.path,
                cli.no_color,
                &args.category,
                &config.parse,
            ))
        }
    }
}

/// One source file registered with codespan for diagnostics.
struct Session {
    files: SimpleFiles<String, String>,
    file_id: usize,
    writer: StandardStream,
}

impl Session {
    fn open(path: &Path, color_choice: ColorChoice) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read '{}'", path.display()))?;
        let mut files = SimpleFiles::new();
        let file_id = files.add(path.display().to_string(), source);
        Ok(Session {
            files,
            file_id,
            writer: StandardStream::stderr(color_choice),
        })
    }

    /// Parse the file, printing the diagnostic on failure.
    fn parse(&self, config: &Config) -> Option<Document> {
        let source = self.files.source(self.file_id).ok()?.to_string();
        let parser = deck::Parser::new(source, self.file_id).with_options(config.parse);
        match parser.parse() {
            Ok(doc) => Some(doc),
            Err(error) => {
                self.emit(&error.to_diagnostic());
                None
            }
        }
    }

    fn emit_warnings(&self, warnings: &[RenderWarning]) {
        for warning in warnings {
            let mut diagnostic = Diagnostic::warning().with_message(warning.to_string());
            if let Some(span) = self.warning_span(warning) {
                diagnostic = diagnostic.with_labels(vec![
                    Label::primary(self.file_id, span)
                        .with_message(format!("in section {}", warning.section)),
                ]);
            }
            self.emit(&diagnostic);
        }
    }

    /// Byte span of the offending delimiter, clamped to its line.
    fn warning_span(&self, warning: &RenderWarning) -> Option<Range<usize>> {
        let line = self
            .files
            .line_range(self.file_id, warning.origin.line.checked_sub(1)?)
            .ok()?;
        let text = self.files.source(self.file_id).ok()?.get(line.clone())?;
        let (offset, _) = text
            .char_indices()
            .nth(warning.origin.column.checked_sub(1)?)?;
        let start = line.start + offset;
        let end = (start + warning.warning.sequence.len()).min(line.end);
        Some(start..end)
    }

    fn emit(&self, diagnostic: &Diagnostic<usize>) {
        let config = term::Config::default();
        let _ = term::emit_to_write_style(&mut self.writer.lock(), &config, &self.files, diagnostic);
    }
}

/// Indented outline of sections and their element kinds.
fn format_tree(doc: &Document) -> String {
    fn walk(section: &Section, out: &mut String) {
        let pad = "  ".repeat(section.depth() - 1);
        out.push_str(&format!(
            "{pad}{} {} (line {})\n",
            section.formatted_number(),
            section.title,
            section.line
        ));
        for element in &section.elements {
            out.push_str(&format!("{pad}  - {}\n", describe(element)));
        }
        for child in &section.children {
            walk(child, out);
        }
    }

    let mut out = String::new();
    for section in &doc.sections {
        walk(section, &mut out);
    }
    out
}

fn describe(element: &Element) -> String {
    match element {
        Element::List(list) => format!("list ({} items)", list.bullets.len()),
        Element::Text(text) if text.pre => format!("text, pre ({} lines)", text.lines.len()),
        Element::Text(text) => format!("text ({} lines)", text.lines.len()),
        Element::Code(code) => match &code.language {
            Some(lang) => format!("code {lang}"),
            None => "code".to_string(),
        },
        Element::Image(media) | Element::Background(media) | Element::Iframe(media) => {
            format!("{} {}", element.kind(), media.url)
        }
        Element::Video(video) => format!("video {} ({})", video.media.url, video.source_type),
        Element::Link(link) => format!("link {}", link.url),
        Element::Html(_) => "html".to_string(),
        Element::Caption(_) => "caption".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_lists_sections_and_elements() {
        let doc = deck::parse("# Intro\n- a\n- b\n## Detail\n```go\nx\n```\n# End\n.link u\n")
            .unwrap();
        assert_eq!(
            format_tree(&doc),
            "1 Intro (line 1)\n  - list (2 items)\n  1.1 Detail (line 4)\n    - code go\n2 End (line 8)\n  - link u\n"
        );
    }
}
