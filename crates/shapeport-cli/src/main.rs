mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use shapeport_core::{PartialShape, ShapeFactory, RECORD_SIZE};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    std::env::set_var("RUST_LOG", &cli.log);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let factory = ShapeFactory::default();
    tracing::debug!(allocator = factory.allocator_name(), "shapeport starting");

    match cli.command {
        Command::Render { shape } => {
            let shape = parse(&factory, &shape)?;
            println!("{}", shape.render()?);
        }
        Command::Inspect { shape } => {
            let shape = parse(&factory, &shape)?;
            inspect(&shape)?;
        }
        Command::ToStatic { shape } => {
            let shape = parse(&factory, &shape)?;
            let static_shape = shape
                .to_shape()
                .with_context(|| format!("cannot convert {}", shape.render().unwrap_or_default()))?;
            println!("{static_shape}");
        }
    }

    Ok(())
}

fn parse(factory: &ShapeFactory, raw: &str) -> Result<PartialShape> {
    factory
        .parse(raw)
        .with_context(|| format!("invalid shape literal {raw:?}"))
}

fn inspect(shape: &PartialShape) -> Result<()> {
    let rank = shape.rank()?;
    let raw = rank.to_raw();
    println!("{}", shape.render()?);
    println!("rank:    {rank} (min {}, max {})", raw.min, raw.max);
    println!(
        "kind:    {}",
        if shape.is_static()? { "static" } else { "dynamic" }
    );

    let bytes = shape.encode()?;
    for (i, record) in bytes.chunks(RECORD_SIZE).enumerate() {
        let label = if i == 0 {
            "rank".to_string()
        } else {
            format!("axis {}", i - 1)
        };
        let hex = record
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(" ");
        println!("{label:>8}: {hex}");
    }
    Ok(())
}
