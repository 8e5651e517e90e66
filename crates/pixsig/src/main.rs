#![forbid(unsafe_code)]

//! pixsig CLI: sign and verify XML messages.

use clap::{Parser, Subcommand};
use pixsig::{Error, SignerArgs, SignerConfig};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "pixsig",
    about = "XML-DSig signing and verification for Pix and ISO 20022 messages",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign an XML message
    Sign {
        /// Input XML file
        file: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        signer: SignerArgs,
    },

    /// Verify a signed XML message
    Verify {
        /// Input XML file
        file: PathBuf,

        #[command(flatten)]
        signer: SignerArgs,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Sign {
            file,
            output,
            signer,
        } => cmd_sign(file, output, &signer),
        Commands::Verify { file, signer } => cmd_verify(file, &signer),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

fn cmd_sign(file: PathBuf, output: Option<PathBuf>, args: &SignerArgs) -> Result<(), Error> {
    let xml = read_file(&file)?;
    let signer = SignerConfig::from_args(args)?.into_signer();
    let signed = signer.sign(&xml)?;
    write_output(output, signed.as_bytes())
}

fn cmd_verify(file: PathBuf, args: &SignerArgs) -> Result<(), Error> {
    let xml = read_file(&file)?;
    let signer = SignerConfig::from_args(args)?.into_signer();
    if signer.verify(&xml) {
        println!("OK");
        Ok(())
    } else {
        println!("INVALID");
        process::exit(1);
    }
}

// ── Utility functions ────────────────────────────────────────────────

fn read_file(path: &PathBuf) -> Result<String, Error> {
    std::fs::read_to_string(path).map_err(|e| Error::Other(format!("{}: {e}", path.display())))
}

fn write_output(path: Option<PathBuf>, data: &[u8]) -> Result<(), Error> {
    match path {
        Some(p) => {
            std::fs::write(&p, data).map_err(|e| Error::Other(format!("{}: {e}", p.display())))
        }
        None => {
            use std::io::Write;
            std::io::stdout()
                .write_all(data)
                .map_err(|e| Error::Other(format!("stdout: {e}")))
        }
    }
}
