use std::env;
use std::fs;
use std::io::{self, Write};

use anyhow::Error;
use clap::{App, AppSettings, Arg};
use env_logger::{fmt, Builder, Target};
use flate2::read::MultiGzDecoder;
use log::{error, info};
use log::{Level, LevelFilter, Record};

use jamsat::{ProofFormat, Solver};

mod check;

fn main() {
    let exit_code = match main_with_err() {
        Err(err) => {
            error!("{}", err);
            1
        }
        Ok(exit_code) => exit_code,
    };
    std::process::exit(exit_code);
}

fn init_logging() {
    let format = |buf: &mut fmt::Formatter, record: &Record| {
        if record.level() == Level::Info {
            writeln!(buf, "c {}", record.args())
        } else {
            writeln!(buf, "c {}: {}", record.level(), record.args())
        }
    };

    let mut builder = Builder::new();
    builder
        .target(Target::Stdout)
        .format(format)
        .filter(None, LevelFilter::Info);

    if let Ok(ref env_var) = env::var("JAMSAT_LOG") {
        builder.parse_filters(env_var);
    }

    builder.init();
}

fn banner() {
    info!("This is jamsat {}", env!("JAMSAT_VERSION"));
    info!(
        "  {} build - {}",
        env!("JAMSAT_PROFILE"),
        env!("JAMSAT_RUSTC_VERSION")
    );
}

/// Open the input file (or stdin), transparently decompressing it if it's gzipped.
///
/// Gzip input is recognized by the `.gz` extension, matching how most SAT competition
/// benchmarks are distributed.
fn open_input(path: Option<&str>) -> Result<Box<dyn io::Read>, Error> {
    match path {
        Some(path) => {
            info!("Reading file '{}'", path);
            let file = fs::File::open(path)?;
            if path.ends_with(".gz") {
                Ok(Box::new(MultiGzDecoder::new(file)))
            } else {
                Ok(Box::new(file))
            }
        }
        None => {
            info!("Reading from stdin");
            Ok(Box::new(io::stdin()))
        }
    }
}

fn main_with_err() -> Result<i32, Error> {
    let matches = App::new("jamsat")
        .version(env!("JAMSAT_VERSION"))
        .setting(AppSettings::DisableHelpSubcommand)
        .setting(AppSettings::ArgsNegateSubcommands)
        .setting(AppSettings::VersionlessSubcommands)
        .arg_from_usage(
            "[INPUT] 'The input file to use (stdin if omitted), gzip-compressed if it ends in .gz'",
        )
        .arg_from_usage("[proof-file] --proof=[FILE] 'Write a proof to the specified file'")
        .arg(
            Arg::from_usage(
                "[proof-format] --proof-format=[FORMAT] 'Specify the proof format to use.'",
            )
            .possible_values(&["native", "drat", "binary-drat"])
            .default_value("native")
            .case_insensitive(true),
        )
        .subcommand(check::check_args())
        .get_matches();

    if let Some(matches) = matches.subcommand_matches("--check") {
        return check::check_main(matches);
    }

    init_logging();
    banner();

    let mut solver = Solver::new();

    let input = open_input(matches.value_of("INPUT"))?;

    if let Some(path) = matches.value_of("proof-file") {
        let proof_format_str = matches
            .value_of("proof-format")
            .unwrap()
            .to_ascii_lowercase();

        let proof_format = match &proof_format_str[..] {
            "drat" => ProofFormat::Drat,
            "binary-drat" => ProofFormat::BinaryDrat,
            "native" => ProofFormat::Native,
            _ => unreachable!(),
        };

        info!("Writing {} proof to file '{}'", proof_format_str, path);

        solver.write_proof(fs::File::create(path)?, proof_format);
    }

    solver.add_dimacs_cnf(input)?;

    let exit_code = match solver.solve() {
        Some(true) => {
            println!("s SATISFIABLE");
            print!("v");
            for l in solver.model().unwrap() {
                print!(" {}", l);
            }
            println!(" 0");
            10
        }
        Some(false) => {
            println!("s UNSATISFIABLE");
            20
        }
        None => {
            println!("s UNKNOWN");
            0
        }
    };

    solver.close_proof();

    Ok(exit_code)
}
