//! Intcode benchmark binary.
//!
//! Measures execution time for representative programs.
//! Run with: `cargo run --release --bin bench`

use std::time::{Duration, Instant};

use intcode::virtual_machine::program::Program;
use intcode::virtual_machine::scheduler::Scheduler;
use intcode::virtual_machine::vm::{Exit, VM};
use intcode::virtual_machine::word::{Word, words};

// ---------------------------------------------------------------------------
// Benchmark harness
// ---------------------------------------------------------------------------

struct BenchResult {
    name: &'static str,
    iterations: u64,
    total: Duration,
    /// Instructions executed per run (None to omit column).
    instructions: Option<u64>,
}

impl BenchResult {
    fn avg(&self) -> Duration {
        self.total / self.iterations as u32
    }

    fn print(&self) {
        let avg = self.avg();
        let ns_per_op = avg.as_nanos();
        let ns_per_instr = self
            .instructions
            .filter(|&n| n > 0)
            .map(|n| format!("{:>8.1}", ns_per_op as f64 / n as f64))
            .unwrap_or_else(|| "       -".to_string());
        let instructions = self
            .instructions
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<30} {:>7} iters {:>10.3} us/iter {:>12} instr  {} ns/instr",
            self.name,
            self.iterations,
            ns_per_op as f64 / 1000.0,
            instructions,
            ns_per_instr,
        );
    }
}

/// Runs `f` for at least `min_duration`, returning aggregated results.
/// `f` returns the number of instructions it executed, if known.
fn bench<F>(name: &'static str, min_duration: Duration, mut f: F) -> BenchResult
where
    F: FnMut() -> Option<u64>,
{
    // Warmup
    for _ in 0..5 {
        f();
    }

    let mut iterations = 0u64;
    let mut instructions = None;
    let start = Instant::now();
    while start.elapsed() < min_duration {
        instructions = f();
        iterations += 1;
    }
    let total = start.elapsed();

    BenchResult {
        name,
        iterations,
        total,
        instructions,
    }
}

/// Runs `code` to completion and returns the executed instruction count.
fn run_to_halt(code: &[i64]) -> Option<u64> {
    let mut vm = VM::new(Program::new(code));
    let exit = vm.run().expect("run");
    assert_eq!(exit, Exit::Halted);
    Some(vm.profile().total())
}

// ---------------------------------------------------------------------------
// Benchmark definitions
// ---------------------------------------------------------------------------

/// Decrements cell 8 until it reaches zero.
fn count_down(n: i64) -> Vec<i64> {
    vec![1001, 8, -1, 8, 1005, 8, 0, 99, n]
}

/// Multiply, add and compare in a loop of `n` iterations.
fn arithmetic_mix(n: i64) -> Vec<i64> {
    vec![
        1002, 31, 3, 32, // tmp = acc * 3
        1001, 32, 7, 31, // acc = tmp + 7
        1007, 31, 1000, 32, // tmp = acc < 1000
        1005, 32, 19, // keep acc while small
        1101, 0, 1, 31, // acc = 1
        1001, 30, -1, 30, // n -= 1
        1005, 30, 0, // loop
        99, 0, 0, 0, n, 1, 0,
    ]
}

/// Writes one cell per iteration through a sliding relative base.
fn relative_fill(n: i64) -> Vec<i64> {
    vec![
        21101, 7, 0, 100, // [rb + 100] = 7
        109, 1, // rb += 1
        1001, 20, -1, 20, // n -= 1
        1005, 20, 0, // loop
        99, 0, 0, 0, 0, 0, 0, n,
    ]
}

/// Triples cell 12 `n` times; the value leaves the `i64` range after 40 steps.
fn power_of_three(n: i64) -> Vec<i64> {
    vec![
        1002, 12, 3, 12, // acc *= 3
        1001, 13, -1, 13, // n -= 1
        1005, 13, 0, // loop
        99, 1, n,
    ]
}

const FEEDBACK_AMPLIFIER: [i64; 29] = [
    3, 26, 1001, 26, -4, 26, 3, 27, 1002, 27, 2, 27, 1, 27, 26, 27, 4, 27, 1001, 28, -1, 28, 1005,
    28, 6, 99, 0, 0, 5,
];

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    let min = Duration::from_secs(2);

    println!("Intcode Benchmarks (each runs for >= 2s)\n");
    println!(
        "  {:<30} {:>7}       {:>14} {:>18}  {:>10}",
        "benchmark", "iters", "avg time", "instr/run", "ns/instr"
    );
    println!("  {}", "-".repeat(88));

    // 1. Count down
    for &n in &[1_000i64, 100_000] {
        let name: &'static str = match n {
            1_000 => "count_down(1K)",
            100_000 => "count_down(100K)",
            _ => unreachable!(),
        };
        let code = count_down(n);
        bench(name, min, || run_to_halt(&code)).print();
    }

    // 2. Arithmetic mix (10K iterations)
    let code = arithmetic_mix(10_000);
    bench("arithmetic_mix(10K)", min, || run_to_halt(&code)).print();

    // 3. Relative-base writes (10K cells)
    let code = relative_fill(10_000);
    bench("relative_fill(10K)", min, || run_to_halt(&code)).print();

    // 4. Arbitrary-precision arithmetic (3^1000)
    let code = power_of_three(1_000);
    bench("power_of_three(1K)", min, || run_to_halt(&code)).print();

    // 5. Feedback pipeline through the scheduler
    let amplifier = words(&FEEDBACK_AMPLIFIER);
    let phases = words(&[9, 8, 7, 6, 5]);
    bench("feedback_pipeline(5)", min, || {
        let report = Scheduler::pipeline(&amplifier, &phases)
            .run(0)
            .expect("pipeline");
        assert_eq!(report.last_output, Some(Word::from(139629729)));
        None
    })
    .print();

    println!();
}
