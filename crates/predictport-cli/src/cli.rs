use clap::{Parser, Subcommand, ValueEnum};
use predictport_runtime::Convention;

#[derive(Parser, Debug)]
#[command(name = "predictportd", version, about = "Stream inference site runner")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a model's signature and, for the given outputs, the attributes they flatten into
    Inspect {
        /// Path to ONNX model file
        #[arg(long)]
        model_path: String,

        /// Device for inference (cpu or cuda:N)
        #[arg(long, default_value = "cpu")]
        device: String,

        /// Output names to derive the attribute schema for
        #[arg(long = "output")]
        outputs: Vec<String>,

        /// Log level (RUST_LOG)
        #[arg(long, default_value = "warn")]
        log: String,
    },

    /// Run events read from stdin (one JSON array per line) through a model
    Run {
        /// Path to ONNX model file, passed as parameter 1
        #[arg(long)]
        model_path: String,

        /// Stream attribute as name:type, in event order
        #[arg(long = "attr", required = true)]
        attrs: Vec<String>,

        /// Remaining positional parameters: 'text', an integer, or an attribute name
        #[arg(long = "param", allow_hyphen_values = true)]
        params: Vec<String>,

        #[arg(long, value_enum, default_value_t = ConventionArg::Signature)]
        convention: ConventionArg,

        /// Flush a chunk once it holds this many events
        #[arg(long, default_value_t = 64)]
        max_events: usize,

        /// Flush a chunk once its first event has waited this long
        #[arg(long, default_value_t = 5)]
        max_delay_ms: u64,

        #[arg(long, default_value_t = 1)]
        workers: u32,

        /// Device for inference (cpu or cuda:N)
        #[arg(long, default_value = "cpu")]
        device: String,

        /// Log level (RUST_LOG)
        #[arg(long, default_value = "info")]
        log: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ConventionArg {
    /// Counts given as parameters 2 and 3, native input values
    Explicit,
    /// Counts read from the model, string-encoded input values
    Signature,
}

impl From<ConventionArg> for Convention {
    fn from(arg: ConventionArg) -> Self {
        match arg {
            ConventionArg::Explicit => Convention::ExplicitCounts,
            ConventionArg::Signature => Convention::SignatureCounts,
        }
    }
}
