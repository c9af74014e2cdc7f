use std::{
    fs,
    io::{self, IsTerminal, Read, Write},
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;
use nitro_lz::{is_compressed_bytes, Decoder};

/// Write the decompressed form of an LZ10/LZ11 file to stdout.
///
/// Input that doesn't look compressed is copied through unchanged.
#[derive(Parser)]
#[command(name = "lzexpand", version)]
struct Args {
    /// Write a trace of every decoded instruction to stderr.
    #[arg(short, long)]
    verbose: bool,

    /// File to expand (default: stdin).
    input: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let inp = match &args.input {
        Some(path) => fs::read(path)?,
        None => {
            let mut buf = Vec::new();
            io::stdin().lock().read_to_end(&mut buf)?;
            buf
        }
    };

    let outp = if is_compressed_bytes(&inp) {
        let mut stderr = io::stderr();
        let mut decoder = Decoder::for_bytes(&inp);
        if args.verbose {
            decoder.with_logging(&mut stderr);
        }
        decoder.decode()?
    } else {
        inp
    };

    let stdout = io::stdout();
    if stdout.is_terminal() {
        eprintln!("[elided]");
        return Ok(());
    }

    let mut outp_f = stdout.lock();
    outp_f.write_all(&outp)?;
    outp_f.flush()?;

    Ok(())
}
