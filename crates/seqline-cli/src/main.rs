use seqline_core::{SeqlineConfig, parse_event_stream};
use seqline_render::svg::render_svg;
use seqline_render::text::{DeterministicTextMeasurer, FixedTextMeasurer, TextMeasurer};
use seqline_render::{LayoutOptions, layout_events};
use serde::Serialize;
use std::io::Read;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Input(seqline_core::Error),
    Layout(seqline_render::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Input(err) => write!(f, "{err}"),
            CliError::Layout(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<seqline_core::Error> for CliError {
    fn from(value: seqline_core::Error) -> Self {
        Self::Input(value)
    }
}

impl From<seqline_render::Error> for CliError {
    fn from(value: seqline_render::Error) -> Self {
        Self::Layout(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Layout,
    Render,
}

#[derive(Debug, Clone, Copy, Default)]
enum TextMeasurerKind {
    #[default]
    Deterministic,
    Fixed,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    pretty: bool,
    text_measurer: TextMeasurerKind,
    config: Option<String>,
    overrides: Vec<String>,
    input: Option<String>,
    out: Option<String>,
}

fn usage() -> &'static str {
    "seqline\n\
\n\
USAGE:\n\
  seqline [layout] [--pretty] [--config <file>] [--set <key=value>]... [--text-measurer deterministic|fixed] [<path>|-]\n\
  seqline render [--config <file>] [--set <key=value>]... [--text-measurer deterministic|fixed] [--out <path>] [<path>|-]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', the event stream is read from stdin.\n\
  - Input is a JSON array of events or an object { \"config\": {...}, \"events\": [...] }.\n\
  - Config precedence: --config file, then the stream's inline config, then --set.\n\
  - layout prints the positioned drawables as JSON; render prints SVG (or writes --out).\n\
  - Set SEQLINE_LOG (e.g. SEQLINE_LOG=debug) to see layout tracing on stderr.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "layout" => args.command = Command::Layout,
            "render" => args.command = Command::Render,
            "--pretty" => args.pretty = true,
            "--text-measurer" => {
                let Some(kind) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.text_measurer = match kind.as_str() {
                    "deterministic" => TextMeasurerKind::Deterministic,
                    "fixed" => TextMeasurerKind::Fixed,
                    _ => return Err(CliError::Usage(usage())),
                };
            }
            "--config" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.config = Some(path.clone());
            }
            "--set" => {
                let Some(assignment) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.overrides.push(assignment.clone());
            }
            "--out" => {
                let Some(out) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out = Some(out.clone());
            }
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            "-" => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some("-".to_string());
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    println!();
    Ok(())
}

fn build_text_measurer(kind: TextMeasurerKind) -> Arc<dyn TextMeasurer + Send + Sync> {
    match kind {
        TextMeasurerKind::Deterministic => Arc::new(DeterministicTextMeasurer::default()),
        TextMeasurerKind::Fixed => Arc::new(FixedTextMeasurer::default()),
    }
}

fn write_text(text: &str, out: Option<&str>) -> Result<(), CliError> {
    match out {
        None => {
            print!("{text}");
            Ok(())
        }
        Some(path) => {
            std::fs::write(path, text)?;
            Ok(())
        }
    }
}

fn load_config(args: &Args, inline: Option<&serde_json::Value>) -> Result<SeqlineConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => SeqlineConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => SeqlineConfig::empty_object(),
    };
    if let Some(inline) = inline {
        config.deep_merge(inline);
    }
    for assignment in &args.overrides {
        config.apply_override(assignment)?;
    }
    Ok(config)
}

fn run(args: Args) -> Result<(), CliError> {
    let text = read_input(args.input.as_deref())?;
    let stream = parse_event_stream(&text)?;
    let config = load_config(&args, stream.config.as_ref())?;
    tracing::debug!(events = stream.events.len(), "event stream loaded");

    let options = LayoutOptions::default()
        .with_config(&config)
        .with_text_measurer(build_text_measurer(args.text_measurer));
    let layout = layout_events(&stream.events, &options)?;

    match args.command {
        Command::Layout => write_json(&layout, args.pretty),
        Command::Render => write_text(&render_svg(&layout), args.out.as_deref()),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("SEQLINE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() {
    init_tracing();

    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    match run(args) {
        Ok(()) => {}
        Err(CliError::Layout(err)) if err.is_semantic() => {
            eprintln!("{err}");
            std::process::exit(3);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
