use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "shapeport", version, about = "Partial shape inspector")]
pub struct Cli {
    /// Log level (RUST_LOG)
    #[arg(long, global = true, default_value = "warn")]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a shape in its canonical `Shape : {...}` form
    Render {
        /// Shape literal, e.g. "{1,3,?,?}" or "?"
        shape: String,
    },
    /// Print rank, static/dynamic state and the foreign record bytes
    Inspect {
        /// Shape literal, e.g. "{1,3,?,?}" or "?"
        shape: String,
    },
    /// Convert a fully static shape
    ToStatic {
        /// Shape literal, e.g. "{1,3,224,224}"
        shape: String,
    },
}
