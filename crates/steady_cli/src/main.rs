//! steady CLI: stationary points and their stability for the built-in models.

mod models;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use steady_core::scan::{criteria, ParPoint, RootScanner, ScanList};
use steady_core::traits::{Parameterized, Vector, VectorFunction};

use models::{Bistable, SingleMode};

#[derive(Parser)]
#[command(name = "steady")]
#[command(about = "Scan stationary points of small dynamical systems over a parameter")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sweep one parameter and report the stationary points found.
    Scan(ScanArgs),

    /// Stationary points at fixed parameter values.
    Points(PointsArgs),
}

#[derive(Debug, Clone, Args)]
struct ScanArgs {
    #[arg(long, value_enum, default_value_t = ModelArg::SingleMode)]
    model: ModelArg,

    /// Parameter to sweep. Defaults to the model's natural control parameter.
    #[arg(long)]
    param: Option<String>,

    /// First parameter value.
    #[arg(long, allow_negative_numbers = true)]
    from: f64,

    /// Last parameter value.
    #[arg(long, allow_negative_numbers = true)]
    to: f64,

    /// Number of parameter values, including both ends.
    #[arg(long, default_value = "100")]
    samples: usize,

    /// Keep only points of this kind.
    #[arg(long, value_enum, default_value_t = SelectArg::All)]
    select: SelectArg,

    /// Relative tolerance when stitching points into branches.
    #[arg(long, default_value = "0.1")]
    accuracy: f64,

    /// Print one line per point instead of stitched branches.
    #[arg(long)]
    raw: bool,

    /// Print the selected points as JSON.
    #[arg(long, conflicts_with = "raw")]
    json: bool,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, Clone, Args)]
struct PointsArgs {
    #[arg(long, value_enum, default_value_t = ModelArg::SingleMode)]
    model: ModelArg,

    /// Parameter assignments, e.g. `--set current=3.5`.
    #[arg(long = "set", value_name = "NAME=VALUE")]
    assignments: Vec<String>,

    /// Print the points as JSON.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, Clone, Args)]
struct CommonArgs {
    /// Extra Newton start, comma separated (repeatable). Replaces the model defaults.
    #[arg(long = "start", value_name = "U0,U1,...", allow_hyphen_values = true)]
    starts: Vec<String>,

    /// Write to this file instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelArg {
    /// Single-mode laser, swept over `current`.
    SingleMode,
    /// `p - u + u^3`, swept over `p`.
    Bistable,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SelectArg {
    All,
    Stable,
    Unstable,
    Positive,
    Negative,
}

impl SelectArg {
    fn to_core<const N: usize>(self) -> fn(&ParPoint<N>) -> bool {
        match self {
            Self::All => criteria::all,
            Self::Stable => criteria::stable,
            Self::Unstable => criteria::unstable,
            Self::Positive => criteria::positive,
            Self::Negative => criteria::negative,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan(args) => match args.model {
            ModelArg::SingleMode => {
                run_scan(SingleMode::new(), "current", SingleMode::default_starts(), &args)
            }
            ModelArg::Bistable => run_scan(Bistable::new(), "p", Bistable::default_starts(), &args),
        },
        Commands::Points(args) => match args.model {
            ModelArg::SingleMode => {
                run_points(SingleMode::new(), SingleMode::default_starts(), &args)
            }
            ModelArg::Bistable => run_points(Bistable::new(), Bistable::default_starts(), &args),
        },
    }
}

// ── scan ───────────────────────────────────────────────────────────────

fn run_scan<F, const N: usize>(
    model: F,
    default_param: &str,
    default_starts: Vec<Vector<N>>,
    args: &ScanArgs,
) -> Result<()>
where
    F: VectorFunction<N> + Parameterized,
{
    let param = args.param.as_deref().unwrap_or(default_param);
    let starts = resolve_starts(&args.common.starts, default_starts)?;

    let mut starts = starts.into_iter();
    let first = match starts.next() {
        Some(first) => first,
        None => bail!("At least one start is required."),
    };
    let mut scanner = RootScanner::owned(model, param, first)?;
    for start in starts {
        scanner.add_start(start);
    }

    let roots = scanner.scan(args.from, args.to, args.samples)?;
    let selected = roots.select(args.select.to_core::<N>());
    tracing::info!(
        "{} of {} points kept by --select {:?}",
        selected.len(),
        roots.len(),
        args.select
    );

    let mut out = open_output(args.common.out.as_ref())?;
    if args.json {
        serde_json::to_writer_pretty(&mut out, &selected)?;
        writeln!(out)?;
    } else if args.raw {
        selected.print_raw(&mut out)?;
    } else {
        let pieces = selected.print_list(&mut out, args.accuracy)?;
        tracing::info!("{} distinct pieces", pieces);
    }
    out.flush()?;
    Ok(())
}

// ── points ─────────────────────────────────────────────────────────────

fn run_points<F, const N: usize>(
    mut model: F,
    default_starts: Vec<Vector<N>>,
    args: &PointsArgs,
) -> Result<()>
where
    F: VectorFunction<N> + Parameterized,
{
    for assignment in &args.assignments {
        let (name, value) = parse_assignment(assignment)?;
        model
            .set_parameter(name, value)
            .with_context(|| format!("Cannot set '{}'.", name))?;
    }

    let mut scanner = RootScanner::at_current(model);
    let starts = resolve_starts(&args.common.starts, default_starts)?;
    // at_current seeds the vector of ones; keep it alongside the requested starts.
    for start in starts {
        scanner.add_start(start);
    }
    let points = scanner.stationary_points();
    tracing::info!("{} stationary points", points.len());

    let mut out = open_output(args.common.out.as_ref())?;
    if args.json {
        serde_json::to_writer_pretty(&mut out, &points)?;
        writeln!(out)?;
    } else {
        let mut list = ScanList::new();
        for point in points {
            list.push(0.0, point);
        }
        list.print_raw(&mut out)?;
    }
    out.flush()?;
    Ok(())
}

// ── helpers ────────────────────────────────────────────────────────────

fn resolve_starts<const N: usize>(
    requested: &[String],
    defaults: Vec<Vector<N>>,
) -> Result<Vec<Vector<N>>> {
    if requested.is_empty() {
        return Ok(defaults);
    }
    requested.iter().map(|text| parse_start::<N>(text)).collect()
}

fn parse_start<const N: usize>(text: &str) -> Result<Vector<N>> {
    let values = text
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .with_context(|| format!("Invalid number '{}' in start '{}'.", part.trim(), text))
        })
        .collect::<Result<Vec<f64>>>()?;
    if values.len() != N {
        bail!(
            "Start '{}' has {} components, the model needs {}.",
            text,
            values.len(),
            N
        );
    }
    Ok(Vector::<N>::from_column_slice(&values))
}

fn parse_assignment(text: &str) -> Result<(&str, f64)> {
    let (name, value) = text
        .split_once('=')
        .with_context(|| format!("Expected NAME=VALUE, got '{}'.", text))?;
    let value = value
        .trim()
        .parse::<f64>()
        .with_context(|| format!("Invalid value in '{}'.", text))?;
    Ok((name.trim(), value))
}

fn open_output(path: Option<&PathBuf>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Cannot create {}.", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err:#}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn start_vectors_are_parsed_per_component() {
        let start = parse_start::<2>(" 1.5, -2").expect("valid start");
        assert_eq!(start, Vector::<2>::new(1.5, -2.0));
        assert_err_contains(parse_start::<2>("1.5"), "has 1 components, the model needs 2");
        assert_err_contains(parse_start::<1>("x"), "Invalid number 'x'");
    }

    #[test]
    fn assignments_split_on_equals() {
        assert_eq!(parse_assignment("current = 3.5").expect("valid"), ("current", 3.5));
        assert_err_contains(parse_assignment("current"), "Expected NAME=VALUE");
        assert_err_contains(parse_assignment("current=abc"), "Invalid value");
    }

    #[test]
    fn defaults_are_used_without_requested_starts() {
        let starts = resolve_starts::<1>(&[], Bistable::default_starts()).expect("defaults");
        assert_eq!(starts.len(), 3);
        let starts =
            resolve_starts::<1>(&["0.25".to_string()], Bistable::default_starts()).expect("one");
        assert_eq!(starts, vec![Vector::<1>::new(0.25)]);
    }

    #[test]
    fn cli_arguments_parse() {
        let cli = Cli::try_parse_from([
            "steady", "scan", "--model", "bistable", "--from", "-0.5", "--to", "0.5",
            "--select", "stable", "--start", "0.1",
        ])
        .expect("valid arguments");
        match cli.command {
            Commands::Scan(args) => {
                assert!(matches!(args.model, ModelArg::Bistable));
                assert!(matches!(args.select, SelectArg::Stable));
                assert_eq!(args.samples, 100);
                assert_eq!(args.common.starts, vec!["0.1".to_string()]);
            }
            Commands::Points(_) => panic!("expected scan"),
        }
    }
}
