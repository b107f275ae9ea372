use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;

use cardcode::card::render_card;
use cardcode::config::Config;
use cardcode::generator::{Code128Generator, QrGenerator};
use cardcode::orchestrator::{Controller, GeneratedCode, InputSnapshot, Phase, SizeInput};
use cardcode::projector::{counter, filter_non_empty, flatten};
use cardcode::qrcode::QrCode;
use cardcode::records::Record;
use cardcode::render::{matrix_svg, matrix_text, save_png};
use cardcode::resolver::{LabelOptions, MatrixOptions, Mode};
use cardcode::share::{share_url, ShareTarget};
use cardcode::token;

#[derive(Parser)]
#[command(name = "cardcode", version, about = "QR codes and barcodes that carry an info card")]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a QR code or CODE128 barcode
    Generate(GenerateArgs),
    /// Decode a card URL or token and print the card
    Card {
        /// Card URL or bare token
        input: String,
    },
    /// Print the card token and URL for the given fields
    Token {
        #[arg(long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
    },
    /// Print a messenger link pre-filled with the flattened text
    Share {
        #[arg(value_enum)]
        target: TargetArg,
        #[arg(long)]
        text: Option<String>,
        #[arg(long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// Free text, encoded as a record without a key
    #[arg(long)]
    text: Option<String>,
    #[arg(long = "field", value_name = "KEY=VALUE")]
    fields: Vec<String>,
    #[arg(long, value_enum, default_value = "matrix")]
    mode: ModeArg,
    /// Output size in pixels
    #[arg(long)]
    size: Option<String>,
    /// Encode a card URL instead of plain text
    #[arg(long)]
    card: bool,
    /// Draw the payload (or --label-text) under a barcode
    #[arg(long)]
    label: bool,
    #[arg(long)]
    label_text: Option<String>,
    /// Output file; `.svg` writes vector QR output. Defaults to qrcode.png / barcode.png
    #[arg(long)]
    out: Option<PathBuf>,
    /// Also print the QR code to the terminal
    #[arg(long)]
    print: bool,
    /// Report the input length against its limit
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ModeArg {
    Matrix,
    Linear,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum TargetArg {
    Telegram,
    Whatsapp,
}

impl From<TargetArg> for ShareTarget {
    fn from(t: TargetArg) -> Self {
        match t {
            TargetArg::Telegram => ShareTarget::Telegram,
            TargetArg::Whatsapp => ShareTarget::WhatsApp,
        }
    }
}

impl From<ModeArg> for Mode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Matrix => Mode::Matrix,
            ModeArg::Linear => Mode::Linear,
        }
    }
}

fn parse_fields(fields: &[String]) -> Result<Vec<Record>> {
    fields
        .iter()
        .map(|f| match f.split_once('=') {
            Some((k, v)) => Ok(Record::new(k, v)),
            None => bail!("field {f:?} is not KEY=VALUE"),
        })
        .collect()
}

// Free text goes first, as a record without a key.
fn input_records(text: Option<&str>, fields: &[String]) -> Result<Vec<Record>> {
    let mut records = parse_fields(fields)?;
    if let Some(text) = text {
        records.insert(0, Record::new("", text));
    }
    Ok(records)
}

// Rebuilds the symbol for vector and terminal output.
fn symbol_for(code: &GeneratedCode) -> Result<QrCode> {
    let ecc = code.ecc.context("published code is not a QR symbol")?;
    QrCode::encode_text(&code.payload, ecc).context("re-encoding QR symbol")
}

async fn generate(config: Config, args: GenerateArgs) -> Result<()> {
    let records = input_records(args.text.as_deref(), &args.fields)?;
    if args.verbose {
        let max = config.max_input_chars;
        eprintln!("input: {}", counter(&flatten(&records, max), max));
    }
    let mode = Mode::from(args.mode);
    let snapshot = InputSnapshot {
        records,
        mode,
        size: args.size.as_deref().map_or(SizeInput::NotANumber, SizeInput::parse),
        card_mode: args.card,
        label: LabelOptions::new(args.label, args.label_text.as_deref()),
    };

    let mut controller = Controller::new(config, Arc::new(QrGenerator), Arc::new(Code128Generator::new()));
    let view = controller.update(snapshot).await;
    let code = match view.phase {
        Phase::Fulfilled => view.image.context("fulfilled view without image")?,
        Phase::Failed => bail!(view.error.unwrap_or_else(|| "generation failed".into())),
        Phase::Idle | Phase::Pending => {
            eprintln!("nothing to encode");
            return Ok(());
        }
    };

    let out = args.out.unwrap_or_else(|| PathBuf::from(mode.file_name()));
    let is_svg = out.extension().is_some_and(|e| e.eq_ignore_ascii_case("svg"));
    if is_svg {
        if mode != Mode::Matrix {
            bail!("SVG output is only available for QR codes");
        }
        let qr = symbol_for(&code)?;
        let style = &controller.config().matrix;
        let options = MatrixOptions {
            pixel_size: view.size,
            quiet_margin: style.quiet_margin,
            ecc: qr.error_correction_level(),
            foreground: style.foreground.rgba(),
            background: style.background.rgba(),
        };
        write_file(&out, matrix_svg(&qr, &options).as_bytes())?;
    } else {
        save_png(&code.image, &out).with_context(|| format!("writing {}", out.display()))?;
    }
    info!(path = %out.display(), payload_chars = code.payload.chars().count(), "saved");
    println!("{}", out.display());

    if args.print && mode == Mode::Matrix {
        let qr = symbol_for(&code)?;
        print!("{}", matrix_text(&qr, 2));
    }
    Ok(())
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}

fn show_card(config: &Config, input: &str) {
    let input = input.trim();
    let records = if input.contains('?') || input.contains("://") {
        token::decode_url(input, &config.card_param)
    } else {
        token::decode(input)
    };
    match records {
        Some(records) => print!("{}", render_card(&records).to_text()),
        None => println!("No card found in the given input."),
    }
}

fn print_token(config: &Config, fields: &[String]) -> Result<()> {
    let records = filter_non_empty(&parse_fields(fields)?);
    let token = token::encode(&records);
    println!("{token}");
    println!("{}", token::card_url(&config.card_base_url, &config.card_param, &token));
    Ok(())
}

fn print_share(config: &Config, target: TargetArg, text: Option<&str>, fields: &[String]) -> Result<()> {
    let records = input_records(text, fields)?;
    let payload = flatten(&records, config.max_input_chars);
    if payload.trim().is_empty() {
        bail!("nothing to share");
    }
    println!("{}", share_url(target.into(), &payload));
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("loading config")?;

    match cli.command {
        Command::Generate(args) => generate(config, args).await?,
        Command::Card { input } => show_card(&config, &input),
        Command::Token { fields } => print_token(&config, &fields)?,
        Command::Share { target, text, fields } => print_share(&config, target, text.as_deref(), &fields)?,
    }
    Ok(())
}
