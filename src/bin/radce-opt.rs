// Copyright (c) 2017-2021 Fabian Schuiki

//! A tool to prune dead code from IR assembly using value ranges.

#[macro_use]
extern crate clap;
#[macro_use]
extern crate log;

use anyhow::{anyhow, Context, Result};
use clap::Arg;
use radce::{
    analysis::RangeTable,
    assembly::{parse_module, Writer},
    ir::Module,
    opt::prelude::*,
    pass::RangeDeadCodeElim,
    verifier::Verifier,
};
use std::{
    fs::File,
    io::{BufWriter, Read, Write},
};

fn main() -> Result<()> {
    let matches = app_from_crate!()
        .about("Eliminates dead code from IR assembly based on value ranges.")
        .arg(
            Arg::with_name("verbosity")
                .short("v")
                .multiple(true)
                .help(HELP_VERBOSITY.lines().next().unwrap_or_default())
                .long_help(HELP_VERBOSITY),
        )
        .arg(
            Arg::with_name("input")
                .help("Assembly file to optimize; stdin if omitted"),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .help("File to write output to; stdout if omitted"),
        )
        .arg(
            Arg::with_name("time-passes")
                .short("t")
                .long("time")
                .help("Print execution time statistics"),
        )
        .arg(
            Arg::with_name("single-threaded")
                .short("s")
                .long("no-parallel")
                .help("Do not parallelize execution"),
        )
        .arg(
            Arg::with_name("iterations")
                .short("n")
                .long("iterations")
                .value_name("N")
                .takes_value(true)
                .default_value("1")
                .help("Run the pass up to N times, stopping early once nothing changes"),
        )
        .arg(
            Arg::with_name("no-verify")
                .long("no-verify")
                .help("Do not verify the module before and after optimization"),
        )
        .arg(
            Arg::with_name("strip-ranges")
                .long("strip-ranges")
                .help("Omit the range directives from the output"),
        )
        .get_matches();

    // Configure the logger.
    let verbose = std::cmp::max(1, matches.occurrences_of("verbosity") as usize) - 1;
    let quiet = !matches.is_present("verbosity");
    stderrlog::new()
        .module("radce")
        .module("radce_opt")
        .quiet(quiet)
        .verbosity(verbose)
        .init()
        .context("Failed to initialize logger")?;

    // Configure rayon to be single-threaded if requested.
    if matches.is_present("single-threaded") {
        info!("Limiting to one rayon worker thread");
        rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build_global()
            .context("Failed to configure rayon thread pool")?;
    }

    let iterations: usize = matches
        .value_of("iterations")
        .unwrap_or("1")
        .parse()
        .map_err(|e| anyhow!("Invalid number of iterations: {}", e))?;
    let verify = !matches.is_present("no-verify");

    // Prepare the time tracking.
    let mut times = vec![];
    let tinit = time::precise_time_ns();

    // Read the input.
    let t0 = time::precise_time_ns();
    let mut contents = String::new();
    match matches.value_of("input") {
        Some(path) => {
            debug!("Reading from `{}`", path);
            File::open(path)
                .with_context(|| format!("Failed to open input `{}`", path))?
                .read_to_string(&mut contents)
                .with_context(|| format!("Failed to read input `{}`", path))?;
        }
        None => {
            debug!("Reading from stdin");
            std::io::stdin()
                .read_to_string(&mut contents)
                .context("Failed to read stdin")?;
        }
    }
    let (mut module, ranges) = parse_module(&contents)?;
    let t1 = time::precise_time_ns();
    times.push(("parse".to_owned(), t1 - t0));

    if verify {
        let t0 = time::precise_time_ns();
        verify_module(&module).context("Input failed verification")?;
        let t1 = time::precise_time_ns();
        times.push(("verify".to_owned(), t1 - t0));
    }

    // Apply the pass until it reaches a fixed point or runs out of iterations.
    let ctx = PassContext::new(&ranges);
    for i in 0..iterations {
        let t0 = time::precise_time_ns();
        let changed = RangeDeadCodeElim::run_on_module(&ctx, &mut module);
        let t1 = time::precise_time_ns();
        times.push((format!("radce#{}", i), t1 - t0));
        if !changed {
            debug!("Reached fixed point after {} iterations", i + 1);
            break;
        }
    }

    if verify {
        let t0 = time::precise_time_ns();
        verify_module(&module).context("Verification failed after optimization")?;
        let t1 = time::precise_time_ns();
        times.push(("verify".to_owned(), t1 - t0));
    }

    // Write the output.
    let t0 = time::precise_time_ns();
    let no_ranges = RangeTable::new();
    let out_ranges = if matches.is_present("strip-ranges") {
        &no_ranges
    } else {
        &ranges
    };
    match matches.value_of("output") {
        Some(path) => {
            let output = File::create(path)
                .with_context(|| format!("Failed to create output `{}`", path))?;
            let mut output = BufWriter::with_capacity(1 << 20, output);
            Writer::new(&mut output).write_module_with_ranges(&module, out_ranges)?;
            output.flush()?;
        }
        None => {
            let stdout = std::io::stdout();
            Writer::new(stdout.lock()).write_module_with_ranges(&module, out_ranges)?;
        }
    }
    let t1 = time::precise_time_ns();
    times.push(("output".to_owned(), t1 - t0));

    // Final time stat.
    let tfinal = time::precise_time_ns();
    times.push(("total".to_owned(), tfinal - tinit));

    // Print execution time statistics if requested by the user.
    if matches.is_present("time-passes") {
        eprintln!("Execution Time Statistics:");
        for (mut name, ns) in times {
            name.push(':');
            eprintln!("  {:10}  {:8.3} ms", name, ns as f64 * 1.0e-6);
        }
    }

    info!("Used {} rayon worker threads", rayon::current_num_threads());
    Ok(())
}

fn verify_module(module: &Module) -> Result<()> {
    let mut verifier = Verifier::new();
    verifier.verify_module(module);
    verifier.finish().map_err(|errs| anyhow!("{}", errs))
}

static HELP_VERBOSITY: &str = "Increase message verbosity

This option can be specified multiple times to increase the level of verbosity \
in the output:

-v      Only print errors
-vv     Also print warnings
-vvv    Also print info messages
-vvvv   Also print debug messages
-vvvvv  Also print detailed tracing messages
";
