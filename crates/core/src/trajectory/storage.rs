//! Tab-delimited result files.
//!
//! The layout is a short `key=value` header closed by `endheader`, a row of
//! column names, and one row per sample:
//!
//! ```text
//! name=sliding_mass
//! num_states=2
//! num_controls=1
//! precision=17
//! endheader
//! time	position	speed	force
//! 0.0000000000000000e0	0.0000000000000000e0	...
//! ```
//!
//! Values are written with 17 significant digits, so reading a file back
//! reproduces every `f64` exactly.

use std::{
    fs,
    io::{self, BufRead, BufReader, Write},
    path::Path,
};

use thiserror::Error;

use super::{Sample, Trajectory};

const END_HEADER: &str = "endheader";
const PRECISION: usize = 17;

/// Errors raised while reading or writing a result file.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error")]
    Io(#[from] io::Error),

    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

impl StorageError {
    fn parse(line: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            line,
            reason: reason.into(),
        }
    }
}

/// Writes `trajectory` to the file at `path`, replacing any existing file.
///
/// # Errors
///
/// Returns [`StorageError::Io`] if the file cannot be created or written.
pub fn write(trajectory: &Trajectory, path: impl AsRef<Path>) -> Result<(), StorageError> {
    let mut file = io::BufWriter::new(fs::File::create(path)?);
    write_to(trajectory, &mut file)?;
    file.flush()?;
    Ok(())
}

/// Writes `trajectory` to any writer.
///
/// # Errors
///
/// Returns [`StorageError::Io`] if writing fails.
pub fn write_to<W: Write>(trajectory: &Trajectory, mut out: W) -> Result<(), StorageError> {
    writeln!(out, "name={}", trajectory.name())?;
    writeln!(out, "num_states={}", trajectory.state_names().len())?;
    writeln!(out, "num_controls={}", trajectory.control_names().len())?;
    writeln!(out, "precision={PRECISION}")?;
    writeln!(out, "{END_HEADER}")?;

    let columns: Vec<&str> = std::iter::once("time")
        .chain(trajectory.state_names().iter().map(String::as_str))
        .chain(trajectory.control_names().iter().map(String::as_str))
        .collect();
    writeln!(out, "{}", columns.join("\t"))?;

    for sample in trajectory.samples() {
        let row: Vec<String> = std::iter::once(sample.time)
            .chain(sample.state.iter().copied())
            .chain(sample.control.iter().copied())
            .map(|v| format!("{v:.16e}"))
            .collect();
        writeln!(out, "{}", row.join("\t"))?;
    }

    Ok(())
}

/// Reads a trajectory from the file at `path`.
///
/// # Errors
///
/// Returns [`StorageError::Io`] if the file cannot be read, or
/// [`StorageError::Parse`] if its contents are malformed.
pub fn read(path: impl AsRef<Path>) -> Result<Trajectory, StorageError> {
    read_from(BufReader::new(fs::File::open(path)?))
}

/// Reads a trajectory from any buffered reader.
///
/// # Errors
///
/// Returns [`StorageError::Io`] if reading fails, or [`StorageError::Parse`]
/// if the contents are malformed.
pub fn read_from<R: BufRead>(input: R) -> Result<Trajectory, StorageError> {
    let mut lines = input.lines().enumerate().map(|(i, l)| (i + 1, l));

    let mut name = String::new();
    let mut num_states = None;
    let mut num_controls = None;
    let mut last_line = 0;

    loop {
        let Some((line, text)) = lines.next() else {
            return Err(StorageError::parse(last_line, "missing endheader"));
        };
        let text = text?;
        last_line = line;
        let text = text.trim();
        if text == END_HEADER {
            break;
        }
        let Some((key, value)) = text.split_once('=') else {
            return Err(StorageError::parse(line, format!("expected key=value, found {text:?}")));
        };
        match key {
            "name" => name = value.to_string(),
            "num_states" => num_states = Some(parse_count(line, value)?),
            "num_controls" => num_controls = Some(parse_count(line, value)?),
            _ => {}
        }
    }

    let num_states = num_states.ok_or_else(|| StorageError::parse(last_line, "missing num_states"))?;
    let num_controls =
        num_controls.ok_or_else(|| StorageError::parse(last_line, "missing num_controls"))?;

    let Some((line, header)) = lines.next() else {
        return Err(StorageError::parse(last_line + 1, "missing column header"));
    };
    let header = header?;
    let columns: Vec<&str> = header.trim_end().split('\t').collect();
    let width = 1 + num_states + num_controls;
    if columns.len() != width || columns[0] != "time" {
        return Err(StorageError::parse(
            line,
            format!("expected time plus {} columns", width - 1),
        ));
    }
    let state_names = columns[1..=num_states].iter().map(ToString::to_string).collect();
    let control_names = columns[1 + num_states..].iter().map(ToString::to_string).collect();

    let mut samples = Vec::new();
    for (line, text) in lines {
        let text = text?;
        if text.trim().is_empty() {
            continue;
        }
        let values = text
            .trim_end()
            .split('\t')
            .map(|field| {
                field
                    .parse::<f64>()
                    .map_err(|_| StorageError::parse(line, format!("invalid number {field:?}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if values.len() != width {
            return Err(StorageError::parse(
                line,
                format!("expected {width} values, found {}", values.len()),
            ));
        }
        samples.push(Sample {
            time: values[0],
            state: values[1..=num_states].to_vec(),
            control: values[1 + num_states..].to_vec(),
        });
    }

    Trajectory::new(name, state_names, control_names, samples)
        .map_err(|reason| StorageError::parse(last_line, reason))
}

fn parse_count(line: usize, value: &str) -> Result<usize, StorageError> {
    value
        .trim()
        .parse()
        .map_err(|_| StorageError::parse(line, format!("invalid count {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trajectory() -> Trajectory {
        Trajectory::new(
            "sliding_mass",
            vec!["position".into(), "speed".into()],
            vec!["force".into()],
            vec![
                Sample {
                    time: 0.0,
                    state: vec![0.0, 0.0],
                    control: vec![50.0],
                },
                Sample {
                    time: 0.1 + 0.2,
                    state: vec![1.0 / 3.0, -2.5e-9],
                    control: vec![-50.0],
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn writes_header_and_rows() {
        let mut buffer = Vec::new();
        write_to(&sample_trajectory(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "name=sliding_mass");
        assert_eq!(lines[1], "num_states=2");
        assert_eq!(lines[2], "num_controls=1");
        assert_eq!(lines[4], "endheader");
        assert_eq!(lines[5], "time\tposition\tspeed\tforce");
        assert_eq!(lines.len(), 8);
    }

    #[test]
    fn values_survive_a_round_trip_exactly() {
        let original = sample_trajectory();
        let mut buffer = Vec::new();
        write_to(&original, &mut buffer).unwrap();

        let restored = read_from(buffer.as_slice()).unwrap();

        assert_eq!(restored, original);
    }

    #[test]
    fn malformed_rows_report_their_line() {
        let text = "name=x\nnum_states=1\nnum_controls=0\nendheader\ntime\tx\n0.0\t1.0\n1.0\toops\n";

        let error = read_from(text.as_bytes()).unwrap_err();

        assert!(matches!(error, StorageError::Parse { line: 7, .. }));
    }

    #[test]
    fn missing_endheader_is_an_error() {
        let error = read_from("name=x\nnum_states=1\n".as_bytes()).unwrap_err();

        assert!(matches!(error, StorageError::Parse { .. }));
    }
}
