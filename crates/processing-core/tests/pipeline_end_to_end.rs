use std::path::PathBuf;

use citypulse_processing_core::pipeline::{partition_sorted, sort_by_key, Pipeline};
use citypulse_telemetry_model::stats::{
    serialize_results, CongestionLevel, NoiseLevel, PollutionLevel, ZoneStatsResult,
};
use citypulse_telemetry_model::zone::ZoneTable;

fn load_fixture_lines() -> Vec<String> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("telemetry")
        .join("raw.jsonl");

    let content = std::fs::read_to_string(path).expect("fixture should be readable");
    content
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .map(str::to_string)
        .collect()
}

fn pipeline() -> Pipeline {
    Pipeline::new(ZoneTable::casablanca(), Some(7))
}

fn find<'a>(results: &'a [ZoneStatsResult], zone: &str) -> &'a ZoneStatsResult {
    results
        .iter()
        .find(|r| r.zone == zone)
        .unwrap_or_else(|| panic!("no result for {zone}"))
}

#[test]
fn fixture_produces_one_result_per_zone_group() {
    let output = pipeline().run(load_fixture_lines());

    let keys: Vec<(&str, i64)> = output
        .results
        .iter()
        .map(|r| (r.zone.as_str(), r.timestamp))
        .collect();
    assert_eq!(keys, vec![("Anfa", 100), ("Autre", 160), ("Maarif", 100)]);

    let maarif = find(&output.results, "Maarif");
    assert_eq!(maarif.stats.vehicle_count, 2);
    assert_eq!(maarif.stats.avg_speed_kmh, 15.0);
    assert_eq!(maarif.stats.avg_co2, 600.0);
    assert_eq!(maarif.stats.avg_noise_db, 70.0);
    assert_eq!(maarif.stats.congestion_level, CongestionLevel::Dense);

    let anfa = find(&output.results, "Anfa");
    assert_eq!(anfa.stats.pollution_level, PollutionLevel::Toxic);
    assert_eq!(anfa.stats.noise_level, NoiseLevel::VeryHigh);
    assert_eq!(anfa.stats.congestion_level, CongestionLevel::VeryDense);
    assert_eq!(anfa.stats.avg_pmx, 60.0);

    let other = find(&output.results, "Autre");
    assert_eq!(other.stats.congestion_level, CongestionLevel::Fluid);
    assert_eq!(other.stats.pollution_level, PollutionLevel::Good);
    assert_eq!(other.stats.noise_level, NoiseLevel::Low);
}

#[test]
fn fixture_stage_counters() {
    let report = pipeline().run(load_fixture_lines()).report;

    assert_eq!(report.validation.records_in, 16);
    assert_eq!(report.validation.records_out, 12);
    assert_eq!(report.validation.out_of_range, 2);
    assert_eq!(report.validation.malformed, 1);
    assert_eq!(report.validation.unrecognized, 1);
    assert_eq!(report.validation.passthrough, 2);

    assert_eq!(report.fusion.records_out, 4);
    assert_eq!(report.fusion.unmatched, 2);
    assert_eq!(report.fusion.passthrough, 2);
    assert_eq!(report.fusion.order_violations, 0);

    assert_eq!(report.mapping.records_out, 4);
    assert_eq!(report.reduction.records_out, 3);
    assert_eq!(report.reduction.order_violations, 0);
}

#[test]
fn fixture_output_is_stable_json() {
    let output = pipeline().run(load_fixture_lines());
    let maarif = find(&output.results, "Maarif");

    assert_eq!(
        maarif.to_json_line().unwrap(),
        concat!(
            r#"{"zone":"Maarif","timestamp":100,"stats":{"avg_speed_kmh":15.0,"vehicle_count":2,"#,
            r#""congestion_level":"dense","avg_co2":600.0,"pollution_level":"Bon","#,
            r#""avg_noise_db":70.0,"noise_level":"Modéré","avg_co":0.0,"avg_nox":0.0,"avg_pmx":0.0}}"#
        )
    );
}

#[test]
fn rerun_is_byte_identical() {
    let first = serialize_results(&pipeline().run(load_fixture_lines()).results).unwrap();
    let second = serialize_results(&pipeline().run(load_fixture_lines()).results).unwrap();
    assert_eq!(first, second);
}

#[test]
fn partitioned_run_matches_single_worker() {
    let pipeline = pipeline();
    let single = pipeline.run(load_fixture_lines()).results;

    for workers in 1..=4 {
        let (mut validated, _) = pipeline.validate_all(load_fixture_lines());
        sort_by_key(&mut validated);
        let fused: Vec<String> = partition_sorted(validated, workers)
            .into_iter()
            .flat_map(|part| Pipeline::fuse_partition(part).0)
            .collect();

        let (mut mapped, _) = pipeline.map_all(fused);
        sort_by_key(&mut mapped);
        let results: Vec<ZoneStatsResult> = partition_sorted(mapped, workers)
            .into_iter()
            .flat_map(|part| Pipeline::reduce_partition(part).0)
            .collect();

        assert_eq!(results, single, "workers = {workers}");
    }
}
