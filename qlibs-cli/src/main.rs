//! `qlibs`: command-line front end for the qlibs building blocks.
//!
//! CSV and results go to stdout; logs go to stderr (`-v`, `-vv`, `-vvv` or `RUST_LOG`).

mod commands;
mod logging;

use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use qlibs_core::interp1::Interp1Method;
use qlibs_core::pid::PidGains;
use qlibs_sim::{FilterKind, SimConfig, StepConfig};

#[derive(Debug, Parser)]
#[command(name = "qlibs", version, about = "Numeric, control and checksum toolbox")]
struct Cli {
    /// Increase log verbosity (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Checksum text, hex bytes or a file with a named CRC preset.
    Crc(CrcArgs),
    /// Closed-loop PID step response on a continuous plant, printed as CSV.
    Step(StepArgs),
    /// Run a smoothing filter over numbers from the arguments or stdin.
    Smooth(SmoothArgs),
    /// Interpolate a 1-D table at the query points.
    Interp(InterpArgs),
    /// Q16.16 arithmetic: `<a> <op> <b>` or `fn <name> <a>`.
    Fp16(Fp16Args),
    /// Fuzzy tipping demo: tip percentage for service and food scores in 0..10.
    Tipper {
        #[arg(allow_hyphen_values = true)]
        service: f64,
        #[arg(allow_hyphen_values = true)]
        food: f64,
    },
}

#[derive(Debug, Args)]
struct CrcArgs {
    /// Preset name, e.g. `crc-32` or `crc-16-modbus`.
    #[arg(short, long, default_value = "crc-32")]
    preset: String,
    /// Treat TEXT as hex-encoded bytes.
    #[arg(long)]
    hex: bool,
    /// Read the bytes from a file instead of TEXT.
    #[arg(short, long, conflicts_with = "text")]
    file: Option<PathBuf>,
    /// List the available presets and exit.
    #[arg(long)]
    list: bool,
    text: Option<String>,
}

#[derive(Debug, Args)]
struct StepArgs {
    /// Numerator coefficients, highest power first.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, default_values_t = [1.0])]
    num: Vec<f64>,
    /// Denominator coefficients, highest power first (order 1..=8).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, default_values_t = [1.0, 1.0])]
    den: Vec<f64>,
    #[arg(long, default_value_t = 2.0)]
    kc: f64,
    #[arg(long, default_value_t = 1.0)]
    ki: f64,
    #[arg(long, default_value_t = 0.0)]
    kd: f64,
    #[arg(long, default_value_t = 0.01)]
    dt: f64,
    #[arg(long, default_value_t = 1000)]
    steps: usize,
    #[arg(long, default_value_t = 1.0, allow_hyphen_values = true)]
    setpoint: f64,
    /// Controller output limits `min,max`.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, default_values_t = [-100.0, 100.0])]
    limits: Vec<f64>,
    /// Uniform measurement noise amplitude.
    #[arg(long, default_value_t = 0.0)]
    noise: f64,
    #[arg(long)]
    seed: Option<u64>,
    /// Identify the plant and retune after N steps (0: estimate only).
    #[arg(long, value_name = "N")]
    auto_tune: Option<u32>,
}

impl StepArgs {
    fn to_config(&self) -> Result<StepConfig> {
        let [lo, hi] = self.limits[..] else {
            bail!("--limits takes exactly two values: min,max");
        };
        Ok(StepConfig {
            num: self.num.clone(),
            den: self.den.clone(),
            gains: PidGains { kc: self.kc, ki: self.ki, kd: self.kd },
            limits: (lo, hi),
            auto_tune: self.auto_tune,
            sim: SimConfig {
                dt: self.dt,
                steps: self.steps,
                setpoint: self.setpoint,
                noise: self.noise,
                seed: self.seed,
            },
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum FilterArg {
    Lpf1,
    Lpf2,
    Mwm1,
    #[value(alias = "mwm")]
    Mwm2,
    Mor1,
    Mor2,
    Gmwf,
    Expw,
    Klmn,
    Desf,
    Alnf,
}

impl From<FilterArg> for FilterKind {
    fn from(f: FilterArg) -> Self {
        match f {
            FilterArg::Lpf1 => Self::Lpf1,
            FilterArg::Lpf2 => Self::Lpf2,
            FilterArg::Mwm1 => Self::Mwm1,
            FilterArg::Mwm2 => Self::Mwm2,
            FilterArg::Mor1 => Self::Mor1,
            FilterArg::Mor2 => Self::Mor2,
            FilterArg::Gmwf => Self::Gmwf,
            FilterArg::Expw => Self::Expw,
            FilterArg::Klmn => Self::Klmn,
            FilterArg::Desf => Self::Desf,
            FilterArg::Alnf => Self::Alnf,
        }
    }
}

#[derive(Debug, Args)]
struct SmoothArgs {
    #[arg(short, long, value_enum, default_value_t = FilterArg::Lpf1)]
    filter: FilterArg,
    /// Samples; read from stdin when empty.
    #[arg(allow_hyphen_values = true)]
    values: Vec<f64>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum MethodArg {
    Next,
    Previous,
    Nearest,
    Linear,
    Sine,
    Cubic,
    Hermite,
    Spline,
    ConstrainedSpline,
}

impl From<MethodArg> for Interp1Method {
    fn from(m: MethodArg) -> Self {
        match m {
            MethodArg::Next => Self::Next,
            MethodArg::Previous => Self::Previous,
            MethodArg::Nearest => Self::Nearest,
            MethodArg::Linear => Self::Linear,
            MethodArg::Sine => Self::Sine,
            MethodArg::Cubic => Self::Cubic,
            MethodArg::Hermite => Self::Hermite,
            MethodArg::Spline => Self::Spline,
            MethodArg::ConstrainedSpline => Self::ConstrainedSpline,
        }
    }
}

#[derive(Debug, Args)]
struct InterpArgs {
    #[arg(short, long, value_enum, default_value_t = MethodArg::Linear)]
    method: MethodArg,
    /// Table abscissas, ascending, comma separated.
    #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    x: Vec<f64>,
    /// Table ordinates, comma separated.
    #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    y: Vec<f64>,
    #[arg(allow_hyphen_values = true, required = true)]
    query: Vec<f64>,
}

#[derive(Debug, Args)]
struct Fp16Args {
    /// First operand, or `fn` for a unary function.
    #[arg(allow_hyphen_values = true)]
    a: String,
    /// Operator (`+ - * / pow atan2`) or function name.
    #[arg(allow_hyphen_values = true)]
    op: String,
    /// Second operand, or the function argument.
    #[arg(allow_hyphen_values = true)]
    b: String,
}

fn read_stdin() -> Result<String> {
    let mut s = String::new();
    io::stdin().read_to_string(&mut s).context("reading stdin")?;
    Ok(s)
}

fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    match cli.command {
        Command::Crc(a) => {
            if a.list {
                return commands::list_presets(out);
            }
            let data = match (&a.file, &a.text) {
                (Some(path), _) => {
                    std::fs::read(path).with_context(|| format!("reading {}", path.display()))?
                }
                (None, Some(t)) if a.hex => commands::parse_hex(t)?,
                (None, Some(t)) => t.clone().into_bytes(),
                (None, None) if a.hex => commands::parse_hex(&read_stdin()?)?,
                (None, None) => {
                    let mut buf = Vec::new();
                    io::stdin().read_to_end(&mut buf).context("reading stdin")?;
                    buf
                }
            };
            commands::crc(out, &a.preset, &data)
        }
        Command::Step(a) => commands::step(out, &a.to_config()?),
        Command::Smooth(a) => {
            let data = if a.values.is_empty() { commands::parse_numbers(&read_stdin()?)? } else { a.values };
            commands::smooth(out, a.filter.into(), &data)
        }
        Command::Interp(a) => commands::interp(out, a.method.into(), &a.x, &a.y, &a.query),
        Command::Fp16(a) => {
            let r = if a.a == "fn" {
                commands::fp16_function(&a.op, &a.b)?
            } else {
                commands::fp16_binary(&a.a, &a.op, &a.b)?
            };
            commands::print_fp16(out, r)
        }
        Command::Tipper { service, food } => commands::tip(out, service, food),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    run(cli, &mut out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn exec(args: &[&str]) -> Result<String> {
        let cli = Cli::try_parse_from(args)?;
        let mut buf = Vec::new();
        run(cli, &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn crc_subcommand() {
        assert_eq!(exec(&["qlibs", "crc", "123456789"]).unwrap(), "0xCBF43926\n");
        assert_eq!(exec(&["qlibs", "crc", "-p", "crc-16-modbus", "--hex", "313233343536373839"]).unwrap(), "0x4B37\n");
    }

    #[test]
    fn step_subcommand_with_negative_values() {
        let s = exec(&["qlibs", "-v", "step", "--den", "1,3,2", "--steps", "3", "--setpoint", "-1"]).unwrap();
        assert_eq!(s.lines().count(), 4);
        assert!(exec(&["qlibs", "step", "--den", "1"]).is_err());
        assert!(exec(&["qlibs", "step", "--limits", "0,1,2"]).is_err());
    }

    #[test]
    fn other_subcommands() {
        assert_eq!(exec(&["qlibs", "smooth", "-f", "mwm", "2", "2"]).unwrap(), "2\n2\n");
        assert_eq!(exec(&["qlibs", "interp", "-x", "0,1,2,3", "-y", "0,2,4,6", "0.5"]).unwrap(), "0.5\t1\n");
        let value = |s: String| s.split('\t').next().unwrap().parse::<f64>().unwrap();
        assert!((value(exec(&["qlibs", "fp16", "fn", "sqrt", "9"]).unwrap()) - 3.0).abs() < 1e-3);
        assert!((value(exec(&["qlibs", "fp16", "-2", "*", "3"]).unwrap()) + 6.0).abs() < 1e-3);
        assert!(exec(&["qlibs", "tipper", "5", "5"]).is_ok());
    }
}
