//! check_topic_age
//!
//! Monitoring plugin. Prints one status line and exits with 0 (OK),
//! 1 (WARNING), 2 (CRITICAL) or 3 (UNKNOWN).

use clap::Parser;
use lastseen_check::{Status, Verdict};
use lastseen_cli::{classify_parse_error, setup_logging, CheckArgs, LogTarget, ParseOutcome};
use lastseen_core::{SystemClock, TimeProvider};
use std::process::ExitCode;
use tracing::Level;

fn main() -> ExitCode {
    let args = match CheckArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match classify_parse_error(e) {
            ParseOutcome::Informational(e) => {
                let _ = e.print();
                return ExitCode::SUCCESS;
            }
            ParseOutcome::Unknown(verdict) => return report(&verdict, false),
        },
    };

    if let Err(e) = setup_logging(Level::WARN, LogTarget::Stderr) {
        eprintln!("{}", e);
    }

    let verdict = args.to_check().run(&args.db_filename, SystemClock.now());
    report(&verdict, args.json)
}

fn report(verdict: &Verdict, json: bool) -> ExitCode {
    if json {
        match serde_json::to_string(verdict) {
            Ok(line) => println!("{}", line),
            Err(e) => {
                println!("{}", Verdict::unknown(format!("Cannot encode verdict: {}", e)));
                return exit_code(Status::Unknown);
            }
        }
    } else {
        println!("{}", verdict);
    }
    exit_code(verdict.status)
}

fn exit_code(status: Status) -> ExitCode {
    ExitCode::from(status.exit_code() as u8)
}
