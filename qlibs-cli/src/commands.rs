//! Subcommand bodies. Each one renders its result into a writer so the
//! binary prints to stdout and the tests capture a buffer.

use std::io::Write;

use anyhow::{anyhow, bail, Context, Result};
use qlibs_core::crc::{Preset, PRESETS};
use qlibs_core::fp16::Fp16;
use qlibs_core::interp1::{Interp1, Interp1Method};
use qlibs_sim::{make_filter, smooth_series, step_response, tipper, FilterKind, Sample, StepConfig};
use tracing::{debug, info};

// ----------------------------- crc -----------------------------

pub fn list_presets(out: &mut impl Write) -> Result<()> {
    for p in PRESETS {
        writeln!(out, "{:<22} {:>2} bits", p.name(), p.width())?;
    }
    Ok(())
}

/// Decode `"de ad be ef"` / `"DEADBEEF"` into bytes.
pub fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let digits: Vec<u8> = text.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        bail!("hex input has an odd number of digits");
    }
    digits
        .chunks(2)
        .map(|pair| {
            let s = std::str::from_utf8(pair).context("hex input is not ASCII")?;
            u8::from_str_radix(s, 16).with_context(|| format!("`{s}` is not a hex byte"))
        })
        .collect()
}

pub fn crc(out: &mut impl Write, preset: &str, data: &[u8]) -> Result<()> {
    let p = Preset::by_name(preset)
        .ok_or_else(|| anyhow!("unknown CRC preset `{preset}` (see `qlibs crc --list`)"))?;
    let digits = (p.width() / 4) as usize;
    let v = p.checksum(data);
    debug!(preset = p.name(), len = data.len(), "crc");
    writeln!(out, "0x{v:0digits$X}")?;
    Ok(())
}

// ----------------------------- step -----------------------------

pub fn write_csv(out: &mut impl Write, samples: &[Sample]) -> Result<()> {
    writeln!(out, "t,w,u,y")?;
    for s in samples {
        writeln!(out, "{:.6},{:.6},{:.6},{:.6}", s.t, s.w, s.u, s.y)?;
    }
    Ok(())
}

pub fn step(out: &mut impl Write, cfg: &StepConfig) -> Result<()> {
    let r = step_response(cfg).context("step response simulation failed")?;
    write_csv(out, &r.samples)?;
    if let Some(y) = r.final_output() {
        info!(final_output = y, overshoot = ?r.overshoot(), "step response done");
    }
    if let Some((k, tau)) = r.model {
        info!(k, tau, kc = r.gains.kc, ki = r.gains.ki, kd = r.gains.kd, "auto-tuning result");
    }
    Ok(())
}

// ----------------------------- smooth -----------------------------

/// Numbers separated by whitespace or commas.
pub fn parse_numbers(text: &str) -> Result<Vec<f64>> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<f64>().with_context(|| format!("`{t}` is not a number")))
        .collect()
}

pub fn smooth(out: &mut impl Write, kind: FilterKind, data: &[f64]) -> Result<()> {
    let mut f = make_filter(kind).with_context(|| format!("cannot build {kind:?} filter"))?;
    for y in smooth_series(f.as_mut(), data) {
        writeln!(out, "{y}")?;
    }
    Ok(())
}

// ----------------------------- interp -----------------------------

pub fn interp(out: &mut impl Write, method: Interp1Method, x: &[f64], y: &[f64], queries: &[f64]) -> Result<()> {
    let table = Interp1::new(x, y).context("invalid interpolation table")?.with_method(method);
    for &q in queries {
        writeln!(out, "{q}\t{}", table.get(q))?;
    }
    Ok(())
}

// ----------------------------- fp16 -----------------------------

fn fp16_operand(s: &str) -> Result<Fp16> {
    let v: f64 = s.parse().with_context(|| format!("`{s}` is not a number"))?;
    if !(Fp16::MIN.to_f64()..=Fp16::MAX.to_f64()).contains(&v) {
        bail!("{v} does not fit the Q16.16 range");
    }
    Ok(Fp16::from_f64(v))
}

pub fn fp16_binary(a: &str, op: &str, b: &str) -> Result<Fp16> {
    let (a, b) = (fp16_operand(a)?, fp16_operand(b)?);
    Ok(match op {
        "+" | "add" => a + b,
        "-" | "sub" => a - b,
        "*" | "x" | "mul" => a * b,
        "/" | "div" => a / b,
        "^" | "pow" => a.pow(b),
        "atan2" => Fp16::atan2(a, b),
        _ => bail!("unknown fp16 operator `{op}`"),
    })
}

pub fn fp16_function(name: &str, a: &str) -> Result<Fp16> {
    let a = fp16_operand(a)?;
    Ok(match name {
        "abs" => a.abs(),
        "sqrt" => a.sqrt(),
        "exp" => a.exp(),
        "log" | "ln" => a.log(),
        "log2" => a.log2(),
        "sin" => a.sin(),
        "cos" => a.cos(),
        "tan" => a.tan(),
        "asin" => a.asin(),
        "acos" => a.acos(),
        "atan" => a.atan(),
        "sinh" => a.sinh(),
        "cosh" => a.cosh(),
        "tanh" => a.tanh(),
        "rad2deg" => a.rad2deg(),
        "deg2rad" => a.deg2rad(),
        "wrap_to_pi" => a.wrap_to_pi(),
        "wrap_to_180" => a.wrap_to_180(),
        _ => bail!("unknown fp16 function `{name}`"),
    })
}

pub fn print_fp16(out: &mut impl Write, r: Fp16) -> Result<()> {
    if r.is_overflow() {
        writeln!(out, "overflow")?;
    } else {
        let mut buf = [0u8; 24];
        writeln!(out, "{}\t(raw 0x{:08X})", r.to_ascii(&mut buf, 5), r.raw())?;
    }
    Ok(())
}

// ----------------------------- tipper -----------------------------

pub fn tip(out: &mut impl Write, service: f64, food: f64) -> Result<()> {
    let t = tipper(service, food).context("fuzzy inference failed")?;
    writeln!(out, "{t:.4}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn crc_check_values() {
        assert_eq!(render(|o| crc(o, "crc-32", b"123456789")), "0xCBF43926\n");
        assert_eq!(render(|o| crc(o, "CRC_16_MODBUS", b"123456789")), "0x4B37\n");
        assert!(crc(&mut Vec::<u8>::new(), "crc-99", b"").is_err());
        assert!(render(|o| list_presets(o)).lines().count() == PRESETS.len());
    }

    #[test]
    fn hex_input() {
        assert_eq!(parse_hex("31 32\n33").unwrap(), b"123");
        assert_eq!(parse_hex("DEADbeef").unwrap(), [0xDE, 0xAD, 0xBE, 0xEF]);
        assert!(parse_hex("abc").is_err());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn number_lists() {
        assert_eq!(parse_numbers("1, 2.5\n-3 ").unwrap(), [1.0, 2.5, -3.0]);
        assert!(parse_numbers("1 two").is_err());
    }

    #[test]
    fn step_prints_csv() {
        let cfg = StepConfig {
            sim: qlibs_sim::SimConfig { steps: 5, ..Default::default() },
            ..StepConfig::default()
        };
        let s = render(|o| step(o, &cfg));
        let mut lines = s.lines();
        assert_eq!(lines.next(), Some("t,w,u,y"));
        assert_eq!(lines.count(), 5);
    }

    #[test]
    fn interp_and_smooth_outputs() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [0.0, 10.0, 20.0, 30.0];
        assert_eq!(render(|o| interp(o, Interp1Method::Linear, &x, &y, &[1.5])), "1.5\t15\n");
        assert!(interp(&mut Vec::<u8>::new(), Interp1Method::Linear, &x[..2], &y[..2], &[0.5]).is_err());
        let s = render(|o| smooth(o, FilterKind::Lpf1, &[1.0, 1.0, 1.0]));
        assert_eq!(s, "1\n1\n1\n");
    }

    #[test]
    fn fp16_expressions() {
        let close = |r: Fp16, want: f64| (r.to_f64() - want).abs() < 1e-3;
        assert!(close(fp16_binary("1.5", "*", "2").unwrap(), 3.0));
        assert!(close(fp16_binary("-7", "/", "2").unwrap(), -3.5));
        assert!(close(fp16_function("sqrt", "16").unwrap(), 4.0));
        assert!(fp16_binary("1", "%", "2").is_err());
        assert!(fp16_function("gamma", "1").is_err());
        assert!(fp16_operand("40000").is_err());
        let s = render(|o| print_fp16(o, Fp16::from_int(2)));
        assert!(s.starts_with("2.00000"), "{s}");
    }

    #[test]
    fn tipper_prints_tip() {
        let s = render(|o| tip(o, 5.0, 5.0));
        let t: f64 = s.trim().parse().unwrap();
        assert!((t - 15.0).abs() < 1e-3, "{s}");
    }
}
