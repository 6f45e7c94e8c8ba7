// Copyright 2020 Xavier Gillard
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use parmat::error::Error;
use parmat::writer::Format;
use parmat::{parser, Engine};

/// Evaluates a tree of matrix operations in parallel.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Path to the JSON tree description to evaluate.
    input: PathBuf,

    /// Number of worker threads. Defaults to the number of logical CPUs.
    #[arg(short = 't', long, default_value_t = num_cpus::get())]
    threads: usize,

    /// Write the result here instead of standard output.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format for the result matrix.
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Print the executor's worker report to standard error after evaluation.
    #[arg(short, long)]
    report: bool,

    /// Increase verbosity. May be repeated (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Error> {
    let mut root = parser::parse_file(&cli.input)?;
    let (result, report) = Engine::run(&mut root, cli.threads)?;

    match &cli.output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .map_err(|e| Error::IllegalState(format!("cannot create {}: {e}", path.display())))?;
            parmat::writer::write_to(&result, cli.format, file)?;
        }
        None => parmat::writer::write_to(&result, cli.format, std::io::stdout())?,
    }

    if cli.report {
        eprintln!("{report}");
    }
    Ok(())
}
