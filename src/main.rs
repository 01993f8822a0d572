use std::path::PathBuf;

use error::SimulationError;
use render::RenderConfig;
use simulation::{run, PlotKind};

mod domain;
mod error;
mod model;
mod operators;
mod render;
mod simulation;
mod solver;

/// Default log10 conductivities: 10 S/m background, 100 S/m block.
const LOG_SIGMA_BACKGROUND: f64 = 1.0;
const LOG_SIGMA_BLOCK: f64 = 2.0;

const USAGE: &str = "usage: dcres-rs [conductivity|potential|current] [OUTPUT.png] \
[--background <log10 sigma>] [--block <log10 sigma>]";

#[derive(Debug, PartialEq)]
struct CliArgs {
    plot: Option<PlotKind>,
    output: Option<PathBuf>,
    background: f64,
    block: f64,
}

fn parse_args(raw: Vec<String>) -> Result<CliArgs, SimulationError> {
    let mut args = CliArgs {
        plot: None,
        output: None,
        background: LOG_SIGMA_BACKGROUND,
        block: LOG_SIGMA_BLOCK,
    };
    let mut positionals: Vec<String> = Vec::new();
    let mut iter = raw.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--background" => args.background = parse_flag_value("--background", iter.next())?,
            "--block" => args.block = parse_flag_value("--block", iter.next())?,
            other if other.starts_with("--") => {
                return Err(SimulationError::InvalidArgument(format!(
                    "unknown flag '{}'\n{}",
                    other, USAGE
                )));
            }
            _ => positionals.push(arg),
        }
    }
    if positionals.len() > 2 {
        return Err(SimulationError::InvalidArgument(format!(
            "too many arguments\n{}",
            USAGE
        )));
    }
    if let Some(name) = positionals.first() {
        args.plot = Some(name.parse()?);
    }
    if let Some(path) = positionals.get(1) {
        args.output = Some(PathBuf::from(path));
    }
    Ok(args)
}

fn parse_flag_value(flag: &str, value: Option<String>) -> Result<f64, SimulationError> {
    let value = value.ok_or_else(|| {
        SimulationError::InvalidArgument(format!("{} needs a value\n{}", flag, USAGE))
    })?;
    value
        .parse::<f64>()
        .map_err(|e| SimulationError::InvalidArgument(format!("{} {}: {}", flag, value, e)))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    if raw.iter().any(|a| a == "--help" || a == "-h") {
        println!("{}", USAGE);
        return Ok(());
    }
    let args = parse_args(raw)?;
    let config = RenderConfig::default();

    match args.plot {
        Some(plot) => {
            let output = args
                .output
                .unwrap_or_else(|| PathBuf::from(format!("dc_{}.png", plot.name())));
            run(args.background, args.block, plot, &config, &output)?;
            println!("wrote {}", output.display());
        }
        None => {
            // No view selected: render all three with the default model.
            for plot in [PlotKind::Conductivity, PlotKind::Potential, PlotKind::Current] {
                let output = PathBuf::from(format!("dc_{}.png", plot.name()));
                run(args.background, args.block, plot, &config, &output)?;
                println!("wrote {}", output.display());
            }
        }
    }
    Ok(())
}
