//! Text import of motions: RVT spectra, compatible targets, and recorded time series.

use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::{
    CompatibleRvtMotion, FasMotion, InputUnits, ResponseSpectrum, RvtMotion, TimeSeriesFormat,
    TimeSeriesMotion,
};
use crate::prelude::{MotionError, MotionResult, MotionType};

/// Frequencies at or below this value are dropped from imported spectra.
const MIN_IMPORT_FREQ: f64 = 1e-4;

/// Motion read from an RVT text file; the first line names the kind.
#[derive(Debug)]
pub enum ImportedRvtMotion {
    Rvt(RvtMotion),
    Compatible(CompatibleRvtMotion),
}

fn parse_error(line: usize, message: impl Into<String>) -> MotionError {
    let message = message.into();
    warn!("import failed on line {}: {}", line, message);
    MotionError::Parse { line, message }
}

/// Second comma-separated field of a `key,value` line.
fn header_value(lines: &[&str], index: usize) -> MotionResult<String> {
    let line = lines
        .get(index)
        .ok_or_else(|| parse_error(index + 1, "unexpected end of header"))?;
    line.split(',')
        .nth(1)
        .map(|value| value.trim().to_string())
        .ok_or_else(|| parse_error(index + 1, format!("improperly formatted line: {}", line)))
}

fn parse_number(text: &str, line: usize, what: &str) -> MotionResult<f64> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| {
            parse_error(
                line,
                format!("unable to parse {} from '{}'", what, text.trim()),
            )
        })
}

/// Two-column rows until the first line with fewer than two fields.
fn read_pairs<'a>(
    lines: impl Iterator<Item = (usize, &'a str)>,
    names: (&str, &str),
) -> MotionResult<Vec<(f64, f64)>> {
    let mut rows = Vec::new();
    for (index, line) in lines {
        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() < 2 {
            break;
        }
        let x = parse_number(parts[0], index + 1, names.0)?;
        let y = parse_number(parts[1], index + 1, names.1)?;
        rows.push((x, y));
    }
    Ok(rows)
}

/// Parses an RVT motion text; spectral amplitudes are multiplied by `scale`.
///
/// Layout: a `kind,RvtMotion|CompatibleRvtMotion` line, then `name`,
/// `description`, `type` and `duration` lines as `key,value`.
/// `RvtMotion` continues with a column-header line and `freq,amp` rows,
/// `CompatibleRvtMotion` with `period,sa` rows.
pub fn parse_rvt_text(text: &str, scale: f64) -> MotionResult<ImportedRvtMotion> {
    let lines: Vec<&str> = text.lines().collect();
    let kind = header_value(&lines, 0)?;
    let name = header_value(&lines, 1)?;
    let description = header_value(&lines, 2)?;
    let type_text = header_value(&lines, 3)?;
    let motion_type = MotionType::parse(&type_text)
        .ok_or_else(|| parse_error(4, format!("unknown motion type '{}'", type_text)))?;
    let duration = parse_number(&header_value(&lines, 4)?, 5, "duration")?;

    match kind.as_str() {
        "RvtMotion" => {
            let rows = read_pairs(
                lines.iter().copied().enumerate().skip(6),
                ("frequency", "amplitude"),
            )?;
            let (freq, fas): (Vec<f64>, Vec<f64>) = rows
                .into_iter()
                .filter(|(f, _)| *f > MIN_IMPORT_FREQ)
                .map(|(f, a)| (f, scale * a))
                .unzip();
            let mut motion = RvtMotion::new()?;
            let base = motion.base_mut();
            base.set_name(name);
            base.set_description(description);
            base.set_motion_type(motion_type);
            base.set_duration(duration);
            base.set_spectrum(freq, fas)?;
            Ok(ImportedRvtMotion::Rvt(motion))
        }
        "CompatibleRvtMotion" => {
            let rows = read_pairs(
                lines.iter().copied().enumerate().skip(5),
                ("period", "spectral acceleration"),
            )?;
            let (period, sa): (Vec<f64>, Vec<f64>) =
                rows.into_iter().map(|(p, s)| (p, scale * s)).unzip();
            let mut motion = CompatibleRvtMotion::new()?;
            let damping = motion.target().damping();
            motion.set_target(ResponseSpectrum::with_values(period, sa, damping)?)?;
            motion.set_duration(duration);
            let base = motion.base_mut();
            base.set_name(name);
            base.set_description(description);
            base.set_motion_type(motion_type);
            Ok(ImportedRvtMotion::Compatible(motion))
        }
        other => Err(parse_error(1, format!("unrecognized motion kind '{}'", other))),
    }
}

pub fn read_rvt_text(path: impl AsRef<Path>, scale: f64) -> MotionResult<ImportedRvtMotion> {
    let text = fs::read_to_string(path.as_ref())?;
    parse_rvt_text(&text, scale)
}

/// Where the samples sit in a record file and how to read them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeSeriesLayout {
    pub format: TimeSeriesFormat,
    /// One-based column used by [`TimeSeriesFormat::Columns`].
    pub data_column: usize,
    /// One-based first data line.
    pub start_line: usize,
    /// One-based last data line; zero reads to the end.
    pub stop_line: usize,
    /// Expected sample count; zero accepts any count.
    pub point_count: usize,
    pub time_step: f64,
    pub units: InputUnits,
    pub scale: f64,
}

impl Default for TimeSeriesLayout {
    fn default() -> Self {
        Self {
            format: TimeSeriesFormat::Rows,
            data_column: 2,
            start_line: 5,
            stop_line: 0,
            point_count: 0,
            time_step: 0.0,
            units: InputUnits::Gravity,
            scale: 1.0,
        }
    }
}

fn numeric_tokens(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
}

/// Samples (g) read from `text` according to `layout`.
pub fn parse_samples(text: &str, layout: &TimeSeriesLayout) -> MotionResult<Vec<f64>> {
    if layout.start_line == 0 {
        return Err(MotionError::InvalidInput(
            "data lines are numbered from one".into(),
        ));
    }
    let factor = layout.units.factor() * layout.scale;
    let mut accel = Vec::new();
    let mut stop_reached = false;
    let mut count_reached = false;

    'lines: for (index, line) in text.lines().enumerate().skip(layout.start_line - 1) {
        let number = index + 1;
        if layout.stop_line > 0 && number > layout.stop_line {
            stop_reached = true;
            break;
        }
        match layout.format {
            TimeSeriesFormat::Rows => {
                for token in numeric_tokens(line) {
                    if layout.point_count > 0 && accel.len() >= layout.point_count {
                        count_reached = true;
                        break 'lines;
                    }
                    accel.push(factor * parse_number(token, number, "acceleration")?);
                }
            }
            TimeSeriesFormat::Columns => {
                if layout.point_count > 0 && accel.len() >= layout.point_count {
                    count_reached = true;
                    break;
                }
                let column = layout.data_column.saturating_sub(1);
                if let Some(token) = numeric_tokens(line).nth(column) {
                    accel.push(factor * parse_number(token, number, "acceleration")?);
                }
            }
        }
    }

    if count_reached {
        warn!("point count reached before end of data");
    }
    if layout.point_count > 0 && accel.len() != layout.point_count {
        if stop_reached {
            warn!(
                "read {} of {} points before the stop line",
                accel.len(),
                layout.point_count
            );
        } else {
            return Err(MotionError::InvalidInput(format!(
                "read {} points but expected {}",
                accel.len(),
                layout.point_count
            )));
        }
    }
    Ok(accel)
}

/// `"<folder>/<file>"` label of a record path.
fn record_name(path: &Path) -> String {
    let file = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match path
        .parent()
        .and_then(|parent| parent.file_name())
        .map(|dir| dir.to_string_lossy().into_owned())
    {
        Some(dir) => format!("{}/{}", dir, file),
        None => file,
    }
}

pub fn read_time_series(
    path: impl AsRef<Path>,
    layout: &TimeSeriesLayout,
) -> MotionResult<TimeSeriesMotion> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let accel = parse_samples(&text, layout)?;
    let mut motion = TimeSeriesMotion::new(record_name(path), layout.time_step, accel)?;
    motion.set_loaded_scale(layout.scale);
    Ok(motion)
}

/// Point count and time step from the fourth line of an AT2 file.
///
/// Accepts `8751    0.0040    NPTS, DT` and `NPTS=   7998, DT=   .0050 SEC,`.
fn parse_at2_counts(line: &str) -> Option<(usize, f64)> {
    if let Some(rest) = line.split("NPTS=").nth(1) {
        let count = rest.split(',').next()?.trim().parse().ok()?;
        let step = rest
            .split("DT=")
            .nth(1)?
            .split_whitespace()
            .next()?
            .trim_end_matches(',')
            .parse()
            .ok()?;
        return Some((count, step));
    }
    let (values, _) = line.split_once("NPTS, DT")?;
    let mut tokens = values.split_whitespace();
    let count = tokens.next()?.parse().ok()?;
    let step = tokens.next()?.parse().ok()?;
    Some((count, step))
}

/// Parses a PEER AT2 record with values in g, multiplied by `scale`.
pub fn parse_at2(name: impl Into<String>, text: &str, scale: f64) -> MotionResult<TimeSeriesMotion> {
    let lines: Vec<&str> = text.lines().take(4).collect();
    if lines.len() < 4 {
        return Err(parse_error(lines.len() + 1, "AT2 header is incomplete"));
    }
    let (point_count, time_step) = parse_at2_counts(lines[3])
        .ok_or_else(|| parse_error(4, format!("unrecognized header format: {}", lines[3])))?;
    if point_count < 2 {
        return Err(parse_error(4, format!("invalid point count {}", point_count)));
    }
    let layout = TimeSeriesLayout {
        point_count,
        time_step,
        scale,
        ..TimeSeriesLayout::default()
    };
    let accel = parse_samples(text, &layout)?;
    let mut motion = TimeSeriesMotion::new(name, time_step, accel)?;
    motion.set_description(lines[1].trim());
    motion.set_loaded_scale(scale);
    Ok(motion)
}

pub fn read_at2(path: impl AsRef<Path>, scale: f64) -> MotionResult<TimeSeriesMotion> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    parse_at2(record_name(path), &text, scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::Motion;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const RVT_TEXT: &str = "kind,RvtMotion\n\
name,Example\n\
description,Hand made\n\
type,Within\n\
duration,8.5\n\
Frequency (Hz),FAS (g-s)\n\
0.00001,9.0\n\
0.5,0.01\n\
1.0,0.02\n\
2.0,0.015\n\
\n\
trailing notes\n";

    #[test]
    fn rvt_text_reads_header_and_scaled_rows() {
        let motion = match parse_rvt_text(RVT_TEXT, 2.0).unwrap() {
            ImportedRvtMotion::Rvt(motion) => motion,
            other => panic!("unexpected {:?}", other),
        };
        let base = motion.base();
        assert_eq!(base.name(), "Example");
        assert_eq!(base.motion_type(), MotionType::Within);
        assert_eq!(base.duration(), 8.5);
        assert_eq!(base.freq(), &[0.5, 1.0, 2.0]);
        assert_eq!(base.fourier_acc(), &[0.02, 0.04, 0.03]);
    }

    #[test]
    fn malformed_rows_report_the_line() {
        let text = RVT_TEXT.replace("1.0,0.02", "1.0,abc");
        match parse_rvt_text(&text, 1.0) {
            Err(MotionError::Parse { line, .. }) => assert_eq!(line, 9),
            other => panic!("unexpected {:?}", other),
        }
        assert!(parse_rvt_text("kind,Unknown\na,b\nc,d\ne,f\ng,1\n", 1.0).is_err());
    }

    #[test]
    fn compatible_text_sets_target() {
        let text = "kind,CompatibleRvtMotion\nname,Target\ndescription,\ntype,0\nduration,6\n\
0.1,0.5\n0.2,0.8\n1.0,0.3\n";
        match parse_rvt_text(text, 1.0).unwrap() {
            ImportedRvtMotion::Compatible(motion) => {
                assert_eq!(motion.target().period(), &[0.1, 0.2, 1.0]);
                assert_eq!(motion.duration(), 6.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn at2_header_variants_are_recognized() {
        assert_eq!(
            parse_at2_counts("8751    0.0040    NPTS, DT"),
            Some((8751, 0.004))
        );
        assert_eq!(
            parse_at2_counts("NPTS=   7998, DT=   .0050 SEC,"),
            Some((7998, 0.005))
        );
        assert_eq!(parse_at2_counts("no counts here"), None);
    }

    #[test]
    fn at2_file_loads_record() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "PEER STRONG MOTION DATABASE RECORD\n\
Test event, station\n\
ACCELERATION TIME HISTORY IN UNITS OF G\n\
NPTS=   6, DT=   .0100 SEC,\n\
 0.1 -0.2  0.3\n\
 -0.05 0.0 0.02\n"
        )
        .unwrap();
        let mut motion = read_at2(file.path(), 2.0).unwrap();
        assert_eq!(motion.point_count(), 6);
        assert_eq!(motion.description(), "Test event, station");
        assert!((motion.time_step() - 0.01).abs() < 1e-15);
        motion.calculate().unwrap();
        assert!((motion.pga() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn column_layout_honours_units_and_stop_line() {
        let text = "time accel\n0.00 981\n0.01 -490.5\n0.02 98.1\n0.03 5000\n";
        let layout = TimeSeriesLayout {
            format: TimeSeriesFormat::Columns,
            data_column: 2,
            start_line: 2,
            stop_line: 4,
            point_count: 4,
            time_step: 0.01,
            units: InputUnits::CentimetersPerSecondSquared,
            scale: 1.0,
        };
        let accel = parse_samples(text, &layout).unwrap();
        assert_eq!(accel.len(), 3);
        assert!((accel[0] - 981.0 / 980.665).abs() < 1e-12);

        let strict = TimeSeriesLayout {
            stop_line: 0,
            point_count: 10,
            ..layout
        };
        assert!(parse_samples(text, &strict).is_err());
    }
}
