// src/main.rs - Command-line driver for the Cuckoo Cycle solver

//! Solver entry point: parses arguments, derives SipHash keys per nonce,
//! and runs the solver over a nonce range.

use clap::{Parser, Subcommand};
use cuckoo_solver::cuckoo::{self, CuckooError, Params, SipKeys, SolverMode};
use cuckoo_solver::{init, Result, SolverError};

/// Process exit code when a solve aborts as overloaded
const EXIT_OVERLOADED: i32 = 2;

#[derive(Parser)]
#[command(name = "cuckoo-solver")]
#[command(about = "Multi-threaded Cuckoo Cycle proof-of-work solver")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a header over a nonce range
    Solve {
        /// Header hash (hex, 32 bytes)
        #[arg(
            long,
            default_value = "0000000000000000000000000000000000000000000000000000000000000000"
        )]
        header: String,
        /// Starting nonce
        #[arg(short, long, default_value = "0")]
        nonce: u32,
        /// Number of consecutive nonces to solve
        #[arg(short, long, default_value = "1")]
        range: u32,
        /// Worker threads per solve
        #[arg(short, long, default_value = "1")]
        threads: usize,
        /// Trim rounds (defaults from the partitioning)
        #[arg(short = 'm', long)]
        trims: Option<u32>,
        /// log2 of nodes per graph side
        #[arg(short, long, default_value = "27")]
        edge_bits: u32,
        /// Required cycle length
        #[arg(short, long, default_value = "42")]
        proof_size: usize,
        /// Trim partitioning bits
        #[arg(long, default_value = "0")]
        part_bits: u32,
        /// Maximum solutions recorded per solve
        #[arg(long, default_value = "8")]
        maxsols: usize,
        /// Skip trimming and use the direct node map (much more memory)
        #[arg(long)]
        direct: bool,
    },
    /// Show derived parameters and memory use for a graph size
    Info {
        /// log2 of nodes per graph side
        #[arg(short, long, default_value = "27")]
        edge_bits: u32,
        /// Trim partitioning bits
        #[arg(long, default_value = "0")]
        part_bits: u32,
        /// Required cycle length
        #[arg(short, long, default_value = "42")]
        proof_size: usize,
    },
}

fn main() -> Result<()> {
    init()?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Solve {
            header,
            nonce,
            range,
            threads,
            trims,
            edge_bits,
            proof_size,
            part_bits,
            maxsols,
            direct,
        } => run_solve(
            &header, nonce, range, threads, trims, edge_bits, proof_size, part_bits, maxsols,
            direct,
        ),
        Commands::Info {
            edge_bits,
            part_bits,
            proof_size,
        } => show_info(edge_bits, part_bits, proof_size),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_solve(
    header_hex: &str,
    nonce: u32,
    range: u32,
    threads: usize,
    trims: Option<u32>,
    edge_bits: u32,
    proof_size: usize,
    part_bits: u32,
    maxsols: usize,
    direct: bool,
) -> Result<()> {
    let header = parse_hex_hash(header_hex)?;
    let params = Params::new(edge_bits, proof_size)?.with_part_bits(part_bits)?;
    let mode = if direct {
        SolverMode::Direct
    } else {
        SolverMode::Trimming
    };
    let ntrims = trims.unwrap_or_else(|| params.default_trim_rounds());

    print!(
        "Looking for {}-cycle on cuckoo{}(\"{}\", {}",
        proof_size,
        edge_bits + 1,
        header_hex,
        nonce
    );
    if range > 1 {
        print!("-{}", nonce + range - 1);
    }
    println!(") with 50% edges, {} trims, {} threads", ntrims, threads);

    let mut total_solutions = 0usize;
    let mut overloaded_solves = 0u32;
    for r in 0..range {
        let keys = SipKeys::from_header_nonce(&header, nonce + r);
        println!("k0 {:x} k1 {:x}", keys.k0, keys.k1);
        match cuckoo::solve(keys, params, threads, trims, maxsols, mode) {
            Ok(solutions) => {
                for sol in &solutions {
                    print!("Solution");
                    for n in &sol.nonces {
                        print!(" {:x}", n);
                    }
                    println!();
                }
                total_solutions += solutions.len();
            }
            Err(CuckooError::Overloaded { live, capacity }) => {
                eprintln!(
                    "nonce {} overloaded: {} live edges against {} cuckoo slots",
                    nonce + r,
                    live,
                    capacity
                );
                overloaded_solves += 1;
            }
            Err(err) => return Err(SolverError::from(err)),
        }
    }
    println!("{} total solutions", total_solutions);
    if range > 0 && overloaded_solves == range {
        std::process::exit(EXIT_OVERLOADED);
    }
    Ok(())
}

fn show_info(edge_bits: u32, part_bits: u32, proof_size: usize) -> Result<()> {
    let params = Params::new(edge_bits, proof_size)?.with_part_bits(part_bits)?;

    println!("cuckoo{} parameters:", edge_bits + 1);
    println!("Nodes per side: {}", params.nnodes());
    println!("Candidate edges: {}", params.easiness);
    println!("Trim partitions: {}", params.parts());
    println!("Default trim rounds: {}", params.default_trim_rounds());
    println!(
        "Cuckoo hash: {} slots ({})",
        params.cuckoo_slots(),
        fmt_bytes(params.cuckoo_slots() * 8)
    );
    println!(
        "Memory: {} edge bits, {} node counters",
        fmt_bytes(u64::from(params.easiness) / 8),
        fmt_bytes(params.twice_words() * 4)
    );
    Ok(())
}

fn fmt_bytes(mut bytes: u64) -> String {
    let mut unit = 0usize;
    while bytes >= 1024 && unit < 4 {
        bytes >>= 10;
        unit += 1;
    }
    format!("{}{}B", bytes, [' ', 'K', 'M', 'G', 'T'][unit])
}

fn parse_hex_hash(hex_str: &str) -> Result<[u8; 32]> {
    let hex_str = hex_str.trim_start_matches("0x");
    let bytes = hex::decode(hex_str)?;
    bytes
        .try_into()
        .map_err(|_| SolverError::Config("header hash must be 32 bytes of hex".to_string()))
}
