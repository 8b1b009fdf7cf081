mod debug_report;

use fieldclaim::{Record, assign_fields};
use std::io::{self, IsTerminal};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "FIELDCLAIM_LOG";

fn main() {
    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    init_logging();

    let record = Record::new(config.fields).with_hidden(config.hidden);
    match assign_fields(&record, &config.claims) {
        Ok(assignment) => debug_report::print_assignment(&record, &config.claims, &assignment, config.color),
        Err(err) => {
            debug_report::print_failure(&record, &config.claims, &err, config.color);
            std::process::exit(1);
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

struct CliConfig {
    fields: Vec<String>,
    hidden: Vec<String>,
    /// One whitespace-separated pattern list per claim, in registration order.
    claims: Vec<Vec<String>>,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut fields: Option<Vec<String>> = None;
    let mut hidden = Vec::new();
    let mut claims = Vec::new();
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("fieldclaim {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--fields" | "-f" => {
                let value = args.next().ok_or_else(|| "error: --fields expects a value".to_string())?;
                set_fields(&mut fields, &value)?;
            }
            "--hidden" => {
                let value = args.next().ok_or_else(|| "error: --hidden expects a value".to_string())?;
                hidden.extend(split_list(&value));
            }
            "--" => {
                claims.extend(args.by_ref().map(|a| split_claim(&a)));
                break;
            }
            _ if arg.starts_with("--fields=") => set_fields(&mut fields, arg.trim_start_matches("--fields="))?,
            _ if arg.starts_with("--hidden=") => hidden.extend(split_list(arg.trim_start_matches("--hidden="))),
            _ if arg.starts_with('-') => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => claims.push(split_claim(&arg)),
        }
    }

    let Some(fields) = fields else {
        return Err(format!("error: no fields provided\n\n{}", help_text()));
    };
    if claims.is_empty() {
        return Err(format!("error: no claims provided\n\n{}", help_text()));
    }

    Ok(CliConfig { fields, hidden, claims, color })
}

fn set_fields(fields: &mut Option<Vec<String>>, value: &str) -> Result<(), String> {
    if fields.is_some() {
        return Err("error: fields provided multiple times".to_string());
    }
    *fields = Some(split_list(value));
    Ok(())
}

fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

fn split_claim(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "fieldclaim {version}

Assign record fields to precedence-ranked claims and report the result.

Usage:
  fieldclaim --fields <a,b,c> [OPTIONS] [--] <claim>...

Each <claim> is one claim's whitespace-separated pattern list, in
registration order. An empty argument (\"\") is the catch-all.

Patterns:
  name       exact field name        name?    optional exact
  text*      name prefix             *field   name suffix
  text*?     optional prefix         *field?  optional suffix
  <name      fields before name      <=name   name and fields before it
  >name      fields after name       >=name   name and fields after it

Options:
  -f, --fields <list>        Comma-separated visible field names, in order.
  --hidden <list>            Comma-separated hidden field names.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Environment:
  {log_env}             Log filter (tracing EnvFilter syntax). Default: warn

Exit codes:
  0  Every field was assigned.
  1  Assignment failed.
  2  Invalid arguments.
",
        version = env!("CARGO_PKG_VERSION"),
        log_env = LOG_ENV,
    )
}
