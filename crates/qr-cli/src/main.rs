mod script;
mod upload;

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use qr_spec::schema::{questionnaire_schema, response_schema, validation_result_schema};
use qr_spec::{
    EngineError, FormEngine, LiteralReferenceResolver, Questionnaire, Reference, Rejection,
    ResponseDocument, ValidationResult, build_outline, render_json, render_text, validate,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use script::{Collaborators, load_script};
use upload::LocalUploadResolver;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Questionnaire form engine CLI",
    long_about = "Fills questionnaires from answer scripts and flags, validates responses, and exports schemas"
)]
struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Cbor,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutlineFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SchemaKind {
    Questionnaire,
    Response,
    Validation,
}

#[derive(Subcommand)]
enum Command {
    /// Fill a questionnaire and emit the resulting response.
    Fill {
        /// Path to the questionnaire JSON.
        #[arg(long, value_name = "QUESTIONNAIRE")]
        questionnaire: PathBuf,
        /// Earlier response (JSON, or CBOR with a `.cbor` extension) to resume from.
        #[arg(long, value_name = "RESPONSE")]
        response: Option<PathBuf>,
        /// JSON array of answer operations, applied in order.
        #[arg(long, value_name = "SCRIPT")]
        script: Option<PathBuf>,
        /// Typed answer, applied after the script.
        #[arg(long = "set", value_name = "KEY=TEXT")]
        set: Vec<String>,
        /// Checkbox answer for a boolean item.
        #[arg(long = "check", value_name = "KEY=BOOL")]
        check: Vec<String>,
        /// Reference recorded as the response source, e.g. `Practitioner/123`.
        #[arg(long, value_name = "REF")]
        source: Option<String>,
        /// Directory that receives attached files (defaults to QR_UPLOAD_DIR or the system temp dir).
        #[arg(long, value_name = "DIR", env = "QR_UPLOAD_DIR")]
        upload_dir: Option<PathBuf>,
        /// Fail instead of emitting a response when validation finds problems.
        #[arg(long)]
        strict: bool,
        /// Emit an in-progress draft instead of a completed response.
        #[arg(long)]
        draft: bool,
        /// Encoding of the emitted response.
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        /// Write the response here instead of stdout.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Validate a response against its questionnaire.
    Validate {
        /// Path to the questionnaire JSON.
        #[arg(long, value_name = "QUESTIONNAIRE")]
        questionnaire: PathBuf,
        /// Path to the response (JSON, or CBOR with a `.cbor` extension).
        #[arg(long, value_name = "RESPONSE")]
        response: PathBuf,
        /// Print the validation result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the JSON Schema of a document type.
    Schema {
        #[arg(value_enum)]
        kind: SchemaKind,
    },
    /// Show every collectible item with its current state.
    Outline {
        /// Path to the questionnaire JSON.
        #[arg(long, value_name = "QUESTIONNAIRE")]
        questionnaire: PathBuf,
        /// Optional response whose answers are shown.
        #[arg(long, value_name = "RESPONSE")]
        response: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutlineFormat::Text)]
        format: OutlineFormat,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Command::Fill {
            questionnaire,
            response,
            script,
            set,
            check,
            source,
            upload_dir,
            strict,
            draft,
            format,
            out,
        } => run_fill(FillArgs {
            questionnaire,
            response,
            script,
            set,
            check,
            source,
            upload_dir,
            strict,
            draft,
            format,
            out,
        }),
        Command::Validate {
            questionnaire,
            response,
            json,
        } => run_validate(questionnaire, response, json),
        Command::Schema { kind } => run_schema(kind),
        Command::Outline {
            questionnaire,
            response,
            format,
        } => run_outline(questionnaire, response, format),
    }
}

fn setup_logging(verbosity: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

struct FillArgs {
    questionnaire: PathBuf,
    response: Option<PathBuf>,
    script: Option<PathBuf>,
    set: Vec<String>,
    check: Vec<String>,
    source: Option<String>,
    upload_dir: Option<PathBuf>,
    strict: bool,
    draft: bool,
    format: OutputFormat,
    out: Option<PathBuf>,
}

fn run_fill(args: FillArgs) -> CliResult<()> {
    let questionnaire = load_questionnaire(&args.questionnaire)?;
    let mut engine = match &args.response {
        Some(path) => FormEngine::with_response(questionnaire, &load_response(path)?),
        None => FormEngine::new(questionnaire),
    };
    if let Some(source) = &args.source {
        engine.set_source(Some(Reference::new(source.trim())));
    }

    let uploads = LocalUploadResolver::new(
        args.upload_dir
            .clone()
            .unwrap_or_else(|| env::temp_dir().join("qr-form-uploads")),
    );
    debug!(dir = %uploads.dir().display(), "upload directory");
    let collaborators = Collaborators {
        uploads: &uploads,
        references: &LiteralReferenceResolver,
    };

    let mut rejected = Vec::new();
    if let Some(path) = &args.script {
        let ops = load_script(path)?;
        rejected.extend(script::apply(&mut engine, ops, &collaborators)?);
    }
    for pair in &args.set {
        let (key, text) = split_pair(pair, "--set")?;
        record(engine.set_answer(key, text), &mut rejected)?;
    }
    for pair in &args.check {
        let (key, raw) = split_pair(pair, "--check")?;
        let checked = parse_flag(raw)
            .ok_or_else(|| format!("--check {}: expected true or false", pair))?;
        record(engine.set_checked(key, checked), &mut rejected)?;
    }

    for rejection in &rejected {
        eprintln!("Rejected: {}", rejection);
    }

    let result = engine.validation();
    if !result.valid {
        eprintln!("Validation result: invalid");
        describe_validation(&mut io::stderr(), &result)?;
        if args.strict {
            return Err("validation failed".into());
        }
    }

    let response = if args.draft {
        engine.draft()
    } else {
        engine.submit()
    };
    info!(items = response.item.len(), status = response.status.as_str(), "response ready");

    let bytes = match args.format {
        OutputFormat::Json => {
            let mut json = response.to_json_pretty()?.into_bytes();
            json.push(b'\n');
            json
        }
        OutputFormat::Cbor => response.to_cbor()?,
    };
    match &args.out {
        Some(path) => fs::write(path, bytes)?,
        None => io::stdout().write_all(&bytes)?,
    }
    Ok(())
}

/// Keeps rejected input as a report entry; anything else aborts.
fn record(outcome: Result<(), EngineError>, rejected: &mut Vec<Rejection>) -> CliResult<()> {
    match outcome {
        Ok(()) => Ok(()),
        Err(EngineError::Rejected(rejection)) => {
            rejected.push(rejection);
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn split_pair<'a>(pair: &'a str, flag: &str) -> CliResult<(&'a str, &'a str)> {
    pair.split_once('=')
        .map(|(key, value)| (key.trim(), value))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("{} {}: expected KEY=VALUE", flag, pair).into())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

fn run_validate(questionnaire_path: PathBuf, response_path: PathBuf, json: bool) -> CliResult<()> {
    let questionnaire = load_questionnaire(&questionnaire_path)?;
    let response = load_response(&response_path)?;

    if let (Some(expected), Some(claimed)) = (questionnaire.reference(), &response.questionnaire)
        && &expected != claimed
    {
        warn!(%expected, %claimed, "response names a different questionnaire");
    }

    let result = validate(&questionnaire, &response);
    let mut stdout = io::stdout();
    if json {
        writeln!(stdout, "{}", serde_json::to_string_pretty(&result)?)?;
    } else {
        writeln!(
            stdout,
            "Validation result: {}",
            if result.valid { "valid" } else { "invalid" }
        )?;
        describe_validation(&mut stdout, &result)?;
    }

    if result.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_validation(out: &mut impl Write, result: &ValidationResult) -> io::Result<()> {
    if !result.errors.is_empty() {
        writeln!(out, "Errors:")?;
        for error in &result.errors {
            writeln!(
                out,
                "  {} - {}",
                error.path.as_deref().unwrap_or("<unknown>"),
                error.message
            )?;
        }
    }
    if !result.missing_required.is_empty() {
        writeln!(
            out,
            "Missing required answers: {}",
            result.missing_required.join(", ")
        )?;
    }
    if !result.unknown_fields.is_empty() {
        writeln!(
            out,
            "Unknown answer items: {}",
            result.unknown_fields.join(", ")
        )?;
    }
    Ok(())
}

fn run_schema(kind: SchemaKind) -> CliResult<()> {
    let schema: Value = match kind {
        SchemaKind::Questionnaire => questionnaire_schema()?,
        SchemaKind::Response => response_schema()?,
        SchemaKind::Validation => validation_result_schema()?,
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn run_outline(
    questionnaire_path: PathBuf,
    response_path: Option<PathBuf>,
    format: OutlineFormat,
) -> CliResult<()> {
    let questionnaire = load_questionnaire(&questionnaire_path)?;
    let engine = match response_path {
        Some(path) => FormEngine::with_response(questionnaire, &load_response(&path)?),
        None => FormEngine::new(questionnaire),
    };
    let outline = build_outline(&engine);
    match format {
        OutlineFormat::Text => println!("{}", render_text(&outline)),
        OutlineFormat::Json => println!("{}", serde_json::to_string_pretty(&render_json(&outline))?),
    }
    Ok(())
}

fn load_questionnaire(path: &Path) -> CliResult<Questionnaire> {
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("cannot read questionnaire '{}': {}", path.display(), err))?;
    let questionnaire: Questionnaire = serde_json::from_str(&raw)
        .map_err(|err| format!("invalid questionnaire '{}': {}", path.display(), err))?;
    Ok(questionnaire)
}

fn load_response(path: &Path) -> CliResult<ResponseDocument> {
    let is_cbor = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("cbor"));
    let response = if is_cbor {
        ResponseDocument::from_cbor(&fs::read(path)?)?
    } else {
        serde_json::from_str(&fs::read_to_string(path)?)?
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_split_on_the_first_equals_sign() {
        assert_eq!(split_pair("q1=a=b", "--set").unwrap(), ("q1", "a=b"));
        assert_eq!(split_pair(" q1 =", "--set").unwrap(), ("q1", ""));
        assert!(split_pair("q1", "--set").is_err());
        assert!(split_pair("=value", "--set").is_err());
    }

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag("Yes"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn describe_lists_every_problem() {
        let result = ValidationResult {
            valid: false,
            errors: vec![qr_spec::ValidationError::at("q1", "bad", "invalid_integer")],
            missing_required: vec!["group/q2".into()],
            unknown_fields: vec!["extra".into()],
        };
        let mut out = Vec::new();
        describe_validation(&mut out, &result).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Errors:\n  /q1 - bad\nMissing required answers: group/q2\nUnknown answer items: extra\n"
        );
    }
}
