use std::fs;

use anyhow::Error;
use clap::{App, Arg, ArgMatches, SubCommand};

use jamsat_checker::Checker;

use super::{banner, init_logging, open_input};

mod transcript;

use transcript::Transcript;

pub fn check_args() -> App<'static, 'static> {
    SubCommand::with_name("--check")
        .arg_from_usage(
            "[INPUT] 'The input file to use (stdin if omitted), gzip-compressed if it ends in .gz'",
        )
        .arg_from_usage("<proof-file> --proof=[FILE] 'The proof file to check.'")
        .arg(Arg::from_usage(
            "--transcript 'Print a transcript of the proof as it is checked'",
        ))
}

pub fn check_main(matches: &ArgMatches) -> Result<i32, Error> {
    init_logging();
    banner();

    let mut checker = Checker::new();

    let mut transcript = Transcript::default();
    if matches.is_present("transcript") {
        checker.add_processor(&mut transcript);
    }

    let input = open_input(matches.value_of("INPUT"))?;

    checker.add_dimacs_cnf(input)?;

    let path = matches.value_of("proof-file").unwrap();

    log::info!("Checking proof file '{}'", path);

    match checker.check_proof(fs::File::open(path)?) {
        Ok(()) => println!("s VERIFIED"),
        Err(err) => {
            log::error!("{}", err);
            println!("s NOT VERIFIED");
            return Ok(1);
        }
    }

    Ok(0)
}
