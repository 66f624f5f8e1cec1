//! Single-stage commands: each one is a line filter.

use std::io::Write;
use std::path::PathBuf;

use citypulse_common::config::AppConfig;
use citypulse_processing_core::noise::RngNoise;
use citypulse_processing_core::normalize::normalize_dump;
use citypulse_processing_core::pipeline::sort_by_key;
use citypulse_processing_core::{RecordValidator, StreamFusion, ZoneMapper, ZoneReducer};

use super::io::{open_output, read_lines, read_to_string, write_lines, InputLines};

pub fn normalize(input: Option<PathBuf>, output: Option<PathBuf>) -> anyhow::Result<()> {
    let content = read_to_string(input.as_deref())?;
    let outcome = normalize_dump(&content);

    let mut out = open_output(output.as_deref())?;
    write_lines(out.as_mut(), &outcome.lines)?;

    tracing::info!(
        records = outcome.lines.len(),
        complete = outcome.error.is_none(),
        "normalize finished"
    );
    Ok(())
}

pub fn validate(
    config: &AppConfig,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    let noise = RngNoise::from_seed_option(seed.or(config.pipeline.noise_seed));
    let mut lines = InputLines::open(input.as_deref())?;
    let mut out = open_output(output.as_deref())?;

    let mut validator = RecordValidator::new(lines.by_ref(), noise);
    write_lines(out.as_mut(), validator.by_ref())?;
    let mut stats = validator.stats().clone();
    lines.count_invalid(&mut stats);
    stats.log_summary("validate");

    lines.finish()
}

pub fn fuse(input: Option<PathBuf>, output: Option<PathBuf>) -> anyhow::Result<()> {
    let mut lines = InputLines::open(input.as_deref())?;
    let mut out = open_output(output.as_deref())?;

    let mut fusion = StreamFusion::new(lines.by_ref());
    write_lines(out.as_mut(), fusion.by_ref())?;
    let mut stats = fusion.stats().clone();
    lines.count_invalid(&mut stats);
    stats.log_summary("fuse");

    lines.finish()
}

pub fn map(config: &AppConfig, input: Option<PathBuf>, output: Option<PathBuf>) -> anyhow::Result<()> {
    let zones = config.pipeline.zone_table();
    let mut lines = InputLines::open(input.as_deref())?;
    let mut out = open_output(output.as_deref())?;

    let mut mapper = ZoneMapper::new(lines.by_ref(), &zones);
    write_lines(out.as_mut(), mapper.by_ref())?;
    let mut stats = mapper.stats().clone();
    lines.count_invalid(&mut stats);
    stats.log_summary("map");

    lines.finish()
}

pub fn reduce(input: Option<PathBuf>, output: Option<PathBuf>) -> anyhow::Result<()> {
    let mut lines = InputLines::open(input.as_deref())?;
    let mut out = open_output(output.as_deref())?;

    let mut reducer = ZoneReducer::new(lines.by_ref());
    for result in reducer.by_ref() {
        let json = result
            .to_json_line()
            .map_err(|e| anyhow::anyhow!("Failed to serialize result: {e}"))?;
        writeln!(out, "{json}")?;
    }
    out.flush()?;
    let mut stats = reducer.stats().clone();
    lines.count_invalid(&mut stats);
    stats.log_summary("reduce");

    lines.finish()
}

pub fn sort(input: Option<PathBuf>, output: Option<PathBuf>) -> anyhow::Result<()> {
    let mut lines = read_lines(input.as_deref())?;
    sort_by_key(&mut lines);

    let mut out = open_output(output.as_deref())?;
    write_lines(out.as_mut(), &lines)?;
    tracing::info!(lines = lines.len(), "sort finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuse_skips_undecodable_lines_and_continues() {
        let dir = std::env::temp_dir().join("citypulse_test_cli_fuse_utf8");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("validated.txt");
        let output = dir.join("fused.txt");

        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"V1_100\tGPS|1,1\nV1_100\tEMI|1,1,1\n");
        bytes.extend_from_slice(b"V2_100\tGPS|\xff\xfe\n");
        bytes.extend_from_slice(b"V3_100\tGPS|3,3\nV3_100\tEMI|3,3,3\n");
        std::fs::write(&input, bytes).unwrap();

        fuse(Some(input), Some(output.clone())).unwrap();

        let fused = std::fs::read_to_string(&output).unwrap();
        assert_eq!(fused, "V1\t100\t1,1\t1,1,1\nV3\t100\t3,3\t3,3,3\n");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
