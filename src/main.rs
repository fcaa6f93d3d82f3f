mod debug_report;

use chrono::NaiveDate;
use ftp_listing::{
    Condition, Context, EnglishMessages, Grammar, ServerType, ServerTypeDef, autodetect, builtin_definitions,
    parse_listing,
};
use std::io::{self, IsTerminal, Read};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "FTP_LISTING_LOG";

fn main() {
    init_logging();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let code = match run(&config) {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(err) => {
            eprintln!("{err}");
            2
        }
    };
    std::process::exit(code);
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

enum Mode {
    Parse { input: Option<String> },
    CheckCondition(String),
    CheckRules(String),
}

struct CliConfig {
    mode: Mode,
    server_type: Option<String>,
    server_types: Option<String>,
    welcome: String,
    syst: String,
    ctx: Context,
    json: bool,
    color: bool,
}

fn run(config: &CliConfig) -> Result<bool, String> {
    let palette = debug_report::Palette::new(config.color);
    let defs = load_definitions(config.server_types.as_deref())?;

    match &config.mode {
        Mode::CheckCondition(source) => match Condition::compile(source) {
            Ok(_) => {
                debug_report::print_ok("condition compiles", &palette);
                Ok(true)
            }
            Err(err) => {
                debug_report::print_diagnostic(source, &err, &EnglishMessages, &palette);
                Ok(false)
            }
        },
        Mode::CheckRules(path) => {
            let source = std::fs::read_to_string(path).map_err(|err| format!("error: cannot read '{path}': {err}"))?;
            let def = select_definition(&defs, config.server_type.as_deref())?;
            match Grammar::compile(&source, &def.columns) {
                Ok(grammar) => {
                    debug_report::print_ok(&format!("{} rules compile", grammar.rules().len()), &palette);
                    Ok(true)
                }
                Err(err) => {
                    debug_report::print_diagnostic(&source, &err, &EnglishMessages, &palette);
                    Ok(false)
                }
            }
        }
        Mode::Parse { input } => {
            let listing = read_input(input.as_deref())?;
            let mut types = Vec::with_capacity(defs.len());
            for def in &defs {
                types.push(ServerType::compile(def).map_err(|err| format!("error: {err}"))?);
            }

            let forced = config.server_type.as_deref().filter(|_| config.welcome.is_empty() && config.syst.is_empty());
            let detection = match forced {
                Some(name) => {
                    let server_type = types
                        .iter()
                        .find(|t| t.name().eq_ignore_ascii_case(name))
                        .ok_or_else(|| format!("error: unknown server type '{name}'"))?;
                    match parse_listing(server_type, &listing, &config.ctx) {
                        Ok(parsed) => Some((server_type, parsed)),
                        Err(err) => {
                            debug_report::print_failure(&format!("{}: {err}", server_type.name()), &palette);
                            None
                        }
                    }
                }
                None => autodetect(
                    &types,
                    config.server_type.as_deref(),
                    &config.welcome,
                    &config.syst,
                    &listing,
                    &config.ctx,
                )
                .map_err(|err| format!("error: {err}"))?
                .map(|d| (d.server_type, d.listing)),
            };

            let Some((server_type, parsed)) = detection else {
                debug_report::print_failure("no server type parses the listing", &palette);
                return Ok(false);
            };
            if config.json {
                let text = serde_json::to_string_pretty(&parsed.items).map_err(|err| format!("error: {err}"))?;
                println!("{text}");
            } else {
                debug_report::print_listing(server_type, &parsed, &palette);
            }
            Ok(true)
        }
    }
}

fn load_definitions(path: Option<&str>) -> Result<Vec<ServerTypeDef>, String> {
    let Some(path) = path else {
        return Ok(builtin_definitions());
    };
    let text = std::fs::read_to_string(path).map_err(|err| format!("error: cannot read '{path}': {err}"))?;
    serde_json::from_str(&text).map_err(|err| format!("error: invalid server types in '{path}': {err}"))
}

fn select_definition<'a>(defs: &'a [ServerTypeDef], name: Option<&str>) -> Result<&'a ServerTypeDef, String> {
    match name {
        Some(name) => defs
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| format!("error: unknown server type '{name}'")),
        None => defs.first().ok_or_else(|| "error: no server types defined".to_string()),
    }
}

fn read_input(path: Option<&str>) -> Result<Vec<u8>, String> {
    match path {
        Some(path) => std::fs::read(path).map_err(|err| format!("error: cannot read '{path}': {err}")),
        None => {
            let mut buffer = Vec::new();
            io::stdin().read_to_end(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
            Ok(buffer)
        }
    }
}

fn parse_args() -> Result<CliConfig, String> {
    let mut input: Option<String> = None;
    let mut mode: Option<Mode> = None;
    let mut config = CliConfig {
        mode: Mode::Parse { input: None },
        server_type: None,
        server_types: None,
        welcome: String::new(),
        syst: String::new(),
        ctx: Context::default(),
        json: false,
        color: io::stdout().is_terminal(),
    };
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        let mut value = |name: &str| args.next().ok_or_else(|| format!("error: {name} expects a value"));
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("ftp-listing {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => config.color = true,
            "--no-color" => config.color = false,
            "--json" => config.json = true,
            "--incomplete" => config.ctx.listing_incomplete = true,
            "--server-type" => config.server_type = Some(value("--server-type")?),
            "--server-types" => config.server_types = Some(value("--server-types")?),
            "--welcome" => config.welcome = value("--welcome")?,
            "--syst" => config.syst = value("--syst")?,
            "--today" => {
                let text = value("--today")?;
                config.ctx.today = NaiveDate::parse_from_str(&text, "%Y-%m-%d")
                    .map_err(|_| format!("error: invalid --today '{text}' (expected YYYY-MM-DD)"))?;
            }
            "--check-condition" => {
                if mode.is_some() {
                    return Err("error: only one check mode may be given".to_string());
                }
                mode = Some(Mode::CheckCondition(value("--check-condition")?));
            }
            "--check-rules" => {
                if mode.is_some() {
                    return Err("error: only one check mode may be given".to_string());
                }
                mode = Some(Mode::CheckRules(value("--check-rules")?));
            }
            _ if arg.starts_with('-') && arg != "-" => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => {
                if input.is_some() {
                    return Err("error: input provided multiple times".to_string());
                }
                input = Some(arg);
            }
        }
    }

    config.mode = match (mode, input) {
        (Some(_), Some(_)) => return Err("error: a check mode takes no listing file".to_string()),
        (Some(mode), None) => mode,
        (None, input) => Mode::Parse { input: input.filter(|path| path != "-") },
    };
    Ok(config)
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "ftp-listing {version}

Parse raw FTP directory listings with rule-driven server types.

Usage:
  ftp-listing [OPTIONS] [FILE]
  ftp-listing --check-condition <text>
  ftp-listing [--server-type <name>] --check-rules <file>

Options:
  FILE                       Raw listing; reads stdin when omitted or '-'.
  --server-type <name>       Use this server type. Combined with --welcome or
                             --syst it is only tried first during autodetection.
  --welcome <text>           Server welcome banner used for autodetection.
  --syst <text>              SYST reply used for autodetection.
  --today <date>             Local date in YYYY-MM-DD. Default: today.
  --incomplete               The listing was cut off; skip a partial last entry.
  --server-types <file>      JSON array of server type definitions replacing
                             the built-in ones.
  --check-condition <text>   Only compile an autodetection condition.
  --check-rules <file>       Only compile listing rules against the columns of
                             the selected server type.
  --json                     Print items as JSON.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Environment:
  {log_env}            Log filter (e.g. debug, ftp_listing=trace). Default: warn.

Exit codes:
  0  Success.
  1  No server type parses the listing, or the checked text does not compile.
  2  Invalid arguments or unreadable input.
",
        version = env!("CARGO_PKG_VERSION"),
        log_env = LOG_ENV,
    )
}
