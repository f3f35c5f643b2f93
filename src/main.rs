//! Intcode driver.
//!
//! Runs an Intcode program file as a single program, as a feedback pipeline
//! of amplifiers, or as a network of nodes.
//!
//! # Usage
//! ```text
//! intcode <program_file> [OPTIONS]
//! ```
//!
//! # Options
//! - `-i, --input <n>`: Queue an input value (repeatable)
//! - `--ascii`: Render output as text and read input lines from stdin
//! - `--pipeline <p1,p2,..>`: Run a feedback pipeline with the given phases
//! - `--network <nodes>`: Run the networked runtime
//!
//! The log level is read from `INTCODE_LOG`.

use intcode::network::runtime::{NetworkOptions, NetworkRuntime};
use intcode::utils::log;
use intcode::virtual_machine::ascii::{AsciiConsole, AsciiPrinter};
use intcode::virtual_machine::io::OutputBuffer;
use intcode::virtual_machine::program::{Program, load_program_file, parse_program};
use intcode::virtual_machine::scheduler::Scheduler;
use intcode::virtual_machine::vm::{Exit, VM};
use intcode::virtual_machine::word::Word;
use intcode::{debug, error, info, warn};
use std::env;
use std::io::{self, BufReader};
use std::process;

/// Exit status of a program left waiting for input.
const EXIT_SUSPENDED: i32 = 2;

enum Mode {
    Single,
    Pipeline(Vec<Word>),
    Network(usize),
}

#[tokio::main]
async fn main() {
    log::init_from_env();
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let path = &args[1];
    let mut inputs: Vec<Word> = Vec::new();
    let mut ascii = false;
    let mut mode = Mode::Single;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "-i" | "--input" => {
                i += 1;
                let value = required(&args, i, "--input").parse::<Word>();
                match value {
                    Ok(value) => inputs.push(value),
                    Err(_) => {
                        eprintln!("Invalid input value: {}", args[i]);
                        process::exit(1);
                    }
                }
                i += 1;
            }
            "--ascii" => {
                ascii = true;
                i += 1;
            }
            "--pipeline" => {
                i += 1;
                match parse_program(required(&args, i, "--pipeline")) {
                    Ok(phases) if !phases.is_empty() => mode = Mode::Pipeline(phases),
                    _ => {
                        eprintln!("Invalid phase settings: {}", args[i]);
                        process::exit(1);
                    }
                }
                i += 1;
            }
            "--network" => {
                i += 1;
                match required(&args, i, "--network").parse::<usize>() {
                    Ok(nodes) => mode = Mode::Network(nodes),
                    Err(_) => {
                        eprintln!("Invalid node count: {}", args[i]);
                        process::exit(1);
                    }
                }
                i += 1;
            }
            "-h" | "--help" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other => {
                eprintln!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    let code = match load_program_file(path) {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    };
    info!("loaded {} cells from {}", code.len(), path);

    match mode {
        Mode::Single => run_single(code, inputs, ascii),
        Mode::Pipeline(phases) => run_pipeline(&code, &phases),
        Mode::Network(nodes) => run_network(&code, nodes).await,
    }
}

/// Returns `args[i]`, exiting with an error if `flag` is missing its argument.
fn required<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i) {
        Some(arg) => arg,
        None => {
            eprintln!("{flag} requires an argument");
            process::exit(1);
        }
    }
}

fn run_single(code: Vec<Word>, inputs: Vec<Word>, ascii: bool) {
    let buffer = OutputBuffer::new();
    let program = Program::from_code(code).with_inputs(inputs);
    let program = if ascii {
        program
            .with_output(AsciiPrinter::new(io::stdout()))
            .with_input_source(AsciiConsole::new(BufReader::new(io::stdin())).with_prompt())
    } else {
        program.with_output(buffer.clone())
    };

    let mut vm = VM::new(program);
    let exit = vm.run();
    for value in buffer.take() {
        println!("{value}");
    }

    match exit {
        Ok(Exit::Halted) => {
            info!("executed {} instructions", vm.profile().total());
            for (opcode, count) in vm.profile().iter() {
                debug!("  {:<5} {count}", opcode.mnemonic());
            }
            println!("result: {}", vm.result());
        }
        Ok(Exit::Suspended) | Ok(Exit::OutOfFuel) => {
            warn!(
                "program is waiting for input at position {}",
                vm.instruction_pointer()
            );
            process::exit(EXIT_SUSPENDED);
        }
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    }
}

fn run_pipeline(code: &[Word], phases: &[Word]) {
    let mut scheduler = Scheduler::pipeline(code, phases);
    match scheduler.run(0) {
        Ok(report) => {
            if let Some(value) = &report.last_output {
                println!("last output: {value}");
            }
            if !report.is_complete() {
                warn!("programs {:?} are waiting for input", report.deadlocked);
                process::exit(EXIT_SUSPENDED);
            }
        }
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    }
}

async fn run_network(code: &[Word], nodes: usize) {
    let runtime = NetworkRuntime::new(NetworkOptions {
        nodes,
        ..NetworkOptions::default()
    });
    match runtime.run(code).await {
        Ok(report) => {
            if let Some(y) = report.first_broadcast_y {
                println!("first broadcast y: {y}");
            }
            println!("repeated rescue y: {}", report.repeated_rescue_y);
        }
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    }
}

const USAGE: &str = "\
Intcode VM

USAGE:
    {program} <program_file> [OPTIONS]

ARGS:
    <program_file>    Comma-separated Intcode program

OPTIONS:
    -i, --input <n>          Queue an input value (repeatable)
    --ascii                  Print output as text, read input lines from stdin
    --pipeline <p1,p2,..>    Run a feedback pipeline with the given phase settings
    --network <nodes>        Run a network of <nodes> nodes until the rescue value repeats
    -h, --help               Print this help message

ENVIRONMENT:
    INTCODE_LOG    Minimum log level: debug, info, warn or error (default: info)

EXAMPLES:
    # Run a program with two inputs
    {program} day5.txt -i 1 -i 5

    # Amplifier feedback loop
    {program} day7.txt --pipeline 9,8,7,6,5

    # Text adventure
    {program} day25.txt --ascii
";

/// Prints usage information to stderr.
fn print_usage(program: &str) {
    eprintln!("{}", USAGE.replace("{program}", program));
}
