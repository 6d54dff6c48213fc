//! CLI integration tests with real files on disk.
//!
//! Tests cover:
//! - Engine config loading and validation from INI files
//! - Series loading (JSON and CSV), read vs malformed errors
//! - `run`, `validate`, `info`, `filter`, `fetch` and `assets` end to end
//! - Exit codes by error family

mod common;

use clap::Parser;
use common::*;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use strategist::adapters::file_config_adapter::FileConfigAdapter;
use strategist::adapters::json_series_adapter::{read_series_file, write_series_file};
use strategist::adapters::json_strategy_adapter::write_strategy_file;
use strategist::cli::{self, Cli};
use strategist::domain::engine::EngineConfig;
use strategist::domain::error::StrategistError;
use strategist::domain::expression::Action;
use strategist::domain::filter::Filter;
use strategist::domain::strategy::Trigger;
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const VALID_INI: &str = r#"
[engine]
worker_threads = 2
record_variables = true

[logging]
level = warn
"#;

fn code(exit: ExitCode) -> String {
    format!("{:?}", exit)
}

fn invoke(args: &[&str]) -> String {
    let mut argv = vec!["strategist"];
    argv.extend_from_slice(args);
    code(cli::run(Cli::try_parse_from(argv).unwrap()))
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

/// A temp dir holding `strategy.json` and `prices.json`.
fn workspace() -> (TempDir, PathBuf, PathBuf) {
    let dir = TempDir::new().unwrap();
    let strategy = dir.path().join("strategy.json");
    let prices = dir.path().join("prices.json");
    write_strategy_file(&swept_strategy(), &strategy).unwrap();
    write_series_file(&wave(), &prices).unwrap();
    (dir, strategy, prices)
}

mod config_loading {
    use super::*;

    #[test]
    fn engine_config_from_file() {
        let file = write_temp_ini(VALID_INI);
        let adapter = cli::load_config(file.path()).unwrap();
        let config = EngineConfig::from_config(&adapter).unwrap();
        assert_eq!(
            config,
            EngineConfig {
                worker_threads: 2,
                record_variables: true,
            }
        );
    }

    #[test]
    fn engine_config_defaults() {
        let adapter = FileConfigAdapter::from_string("[logging]\nlevel = info\n").unwrap();
        assert_eq!(EngineConfig::from_config(&adapter).unwrap(), EngineConfig::default());
    }

    #[test]
    fn negative_threads_rejected() {
        let adapter = FileConfigAdapter::from_string("[engine]\nworker_threads = -1\n").unwrap();
        match EngineConfig::from_config(&adapter) {
            Err(StrategistError::ConfigInvalid { section, key, .. }) => {
                assert_eq!(section, "engine");
                assert_eq!(key, "worker_threads");
            }
            other => panic!("expected ConfigInvalid, got {:?}", other),
        }
    }

    #[test]
    fn unknown_log_level_rejected() {
        let adapter = FileConfigAdapter::from_string("[logging]\nlevel = chatty\n").unwrap();
        assert!(matches!(
            EngineConfig::from_config(&adapter),
            Err(StrategistError::ConfigInvalid { key, .. }) if key == "level"
        ));
    }

    #[test]
    fn missing_config_file_exits_with_config_code() {
        let (_dir, strategy, prices) = workspace();
        let result = invoke(&[
            "--config",
            "/nonexistent/strategist.ini",
            "run",
            "--strategy",
            path_str(&strategy),
            "--series",
            path_str(&prices),
        ]);
        assert_eq!(result, code(ExitCode::from(2)));
    }
}

mod series_loading {
    use super::*;

    #[test]
    fn csv_granularity_from_spacing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prices.csv");
        fs::write(&path, "timestamp,price\n0,1.0\n300,2.0\n600,3.0\n").unwrap();

        let series = cli::load_series(&path).unwrap();
        assert_eq!(series.len(), 3);
        assert!((series.granularity - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn json_series_round_trips() {
        let (_dir, _, prices) = workspace();
        assert_eq!(cli::load_series(&prices).unwrap(), wave());
    }

    #[test]
    fn read_and_malformed_are_distinct() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            cli::load_series(&dir.path().join("missing.json")),
            Err(StrategistError::SeriesFileRead { .. })
        ));

        let bad = dir.path().join("bad.json");
        fs::write(&bad, r#"{"Points": [{"X": "noon", "Y": 1}]}"#).unwrap();
        assert!(matches!(
            cli::load_series(&bad),
            Err(StrategistError::SeriesFileMalformed { .. })
        ));

        let bad_csv = dir.path().join("bad.csv");
        fs::write(&bad_csv, "timestamp,price\n0,1\nlater,2\n").unwrap();
        match cli::load_series(&bad_csv) {
            Err(StrategistError::SeriesFileMalformed { reason, .. }) => assert!(reason.contains("line 3")),
            other => panic!("expected malformed error, got {:?}", other),
        }
    }
}

mod commands {
    use super::*;

    #[test]
    fn run_writes_report() {
        let (dir, strategy, prices) = workspace();
        let report = dir.path().join("report.json");
        let config = write_temp_ini(VALID_INI);

        let result = invoke(&[
            "--config",
            path_str(config.path()),
            "run",
            "--strategy",
            path_str(&strategy),
            "--series",
            path_str(&prices),
            "--output",
            path_str(&report),
        ]);
        assert_eq!(result, code(ExitCode::SUCCESS));

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
        assert_eq!(json["Strategy"], "thresholds");
        assert_eq!(json["Runs"].as_array().unwrap().len(), 20);
        assert_eq!(json["BestParameters"].as_array().unwrap().len(), 2);
        assert!(json["VariableSnapshots"].is_array());
    }

    #[test]
    fn run_with_unwritable_report_exits_with_report_code() {
        let (dir, strategy, prices) = workspace();
        let report = dir.path().join("missing").join("report.json");
        let result = invoke(&[
            "run",
            "--strategy",
            path_str(&strategy),
            "--series",
            path_str(&prices),
            "-o",
            path_str(&report),
        ]);
        assert_eq!(result, code(ExitCode::from(5)));
    }

    #[test]
    fn validate_accepts_and_rejects() {
        let (dir, strategy, _) = workspace();
        assert_eq!(
            invoke(&["validate", "--strategy", path_str(&strategy)]),
            code(ExitCode::SUCCESS)
        );

        let mut broken = threshold_strategy(1.0, 2.0);
        broken
            .triggers
            .push(Trigger::new("ghost", price_below("nowhere"), Action::SellMax));
        let broken_path = dir.path().join("broken.json");
        write_strategy_file(&broken, &broken_path).unwrap();
        assert_eq!(
            invoke(&["validate", "--strategy", path_str(&broken_path)]),
            code(ExitCode::from(4))
        );

        assert_eq!(
            invoke(&["validate", "--strategy", path_str(&dir.path().join("none.json"))]),
            code(ExitCode::from(4))
        );
    }

    #[test]
    fn info_on_series() {
        let (dir, _, prices) = workspace();
        assert_eq!(invoke(&["info", "--series", path_str(&prices)]), code(ExitCode::SUCCESS));

        let empty = dir.path().join("empty.json");
        write_series_file(&strategist::domain::series::TimeSeries::new(60.0), &empty).unwrap();
        assert_eq!(invoke(&["info", "--series", path_str(&empty)]), code(ExitCode::from(3)));
    }

    #[test]
    fn filter_writes_filtered_series() {
        let (dir, _, prices) = workspace();
        let mut strategy = threshold_strategy(9.0, 15.0);
        strategy.filters = vec![Filter::Average { kernel_size: 3 }];
        let strategy_path = dir.path().join("smoothed.json");
        write_strategy_file(&strategy, &strategy_path).unwrap();
        let output = dir.path().join("filtered.json");

        let result = invoke(&[
            "filter",
            "--strategy",
            path_str(&strategy_path),
            "--series",
            path_str(&prices),
            "--output",
            path_str(&output),
        ]);
        assert_eq!(result, code(ExitCode::SUCCESS));

        let filtered = read_series_file(&output).unwrap();
        let expected = Filter::Average { kernel_size: 3 }.apply(&wave()).unwrap();
        assert_eq!(filtered, expected);
    }

    #[test]
    fn fetch_and_list_assets() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        fs::create_dir(&data).unwrap();
        write_series_file(&wave(), &data.join("BTC.json")).unwrap();
        fs::write(data.join("notes.txt"), "ignored").unwrap();
        let output = dir.path().join("btc.json");

        let result = invoke(&[
            "fetch",
            "--data-dir",
            path_str(&data),
            "--asset",
            "BTC",
            "--start",
            "1970-01-01",
            "--end",
            "1970-01-01",
            "--chunk-days",
            "1",
            "-o",
            path_str(&output),
        ]);
        assert_eq!(result, code(ExitCode::SUCCESS));
        assert_eq!(read_series_file(&output).unwrap().points(), wave().points());

        assert_eq!(
            invoke(&["assets", "--data-dir", path_str(&data)]),
            code(ExitCode::SUCCESS)
        );
    }

    #[test]
    fn fetch_rejects_reversed_dates_and_missing_assets() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.json");
        let reversed = invoke(&[
            "fetch",
            "--data-dir",
            path_str(dir.path()),
            "--asset",
            "BTC",
            "--start",
            "2024-02-01",
            "--end",
            "2024-01-01",
            "-o",
            path_str(&output),
        ]);
        assert_eq!(reversed, code(ExitCode::from(3)));

        let missing = invoke(&[
            "fetch",
            "--data-dir",
            path_str(dir.path()),
            "--format",
            "csv",
            "--asset",
            "ETH",
            "--start",
            "2024-01-01",
            "--end",
            "2024-01-02",
            "-o",
            path_str(&output),
        ]);
        assert_eq!(missing, code(ExitCode::from(3)));
        assert!(!output.exists());
    }

    #[test]
    fn fetch_rejects_unrepresentable_chunk() {
        let dir = TempDir::new().unwrap();
        write_series_file(&wave(), &dir.path().join("BTC.json")).unwrap();
        let output = dir.path().join("out.json");
        let result = invoke(&[
            "fetch",
            "--data-dir",
            path_str(dir.path()),
            "--asset",
            "BTC",
            "--start",
            "1970-01-01",
            "--end",
            "1970-01-01",
            "--chunk-days",
            "9223372036854775807",
            "-o",
            path_str(&output),
        ]);
        assert_eq!(result, code(ExitCode::from(3)));
        assert!(!output.exists());
    }
}
