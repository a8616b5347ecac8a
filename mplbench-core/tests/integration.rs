//! Integration tests for mplbench
//!
//! These tests drive the runner end to end from a config file, with the
//! benchmark process replaced by scripted output.

use mplbench_core::{
    HookLocation, HookRegistry, Measure, Metric, MetricValue, MockExecutor, Operation,
    RawSection, Runner, RunnerConfigFile, SweepPlan, process_section,
};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

const RUN_OUTPUT: &str = "\
Loading workload...
Starting test.
[OVERALL], RunTime(ms), 2034.0
[OVERALL], Throughput(ops/sec), 491.64208456243853
[READ], Operations, 512
[READ], AverageLatency(us), 1873.25
[READ], 95thPercentileLatency(us), 3100
[READ], Return=OK, 512
";

fn write_config(dir: &Path, section: &str, body: &str) -> std::path::PathBuf {
    let workload = dir.join("workloada");
    std::fs::write(&workload, "# core workload\nrecordcount=1000\nreadproportion=1.0\n").unwrap();

    let config = format!(
        "[DEFAULT]\nycsb_path = \"/opt/ycsb/bin/ycsb\"\n\
         workload_path = \"{}\"\noutput_dir = \"{}\"\n\n[\"{}\"]\n{}",
        workload.display(),
        dir.join("out").display(),
        section,
        body
    );
    let path = dir.join("mplbench.toml");
    std::fs::write(&path, config).unwrap();
    path
}

fn output_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir.join("out"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// One target, one trial, one MPL, clean_data on: load then run, one row
#[test]
fn test_single_step_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        "mysql",
        "trials = 1\nmin_mpl = 1\nmax_mpl = 1\ninc_mpl = 1\nclean_data = true\n",
    );

    let executor = Rc::new(MockExecutor::with_responses(vec![
        Ok("Loading workload...\n[INSERT], Operations, 1000\n".into()),
        Ok(RUN_OUTPUT.into()),
    ]));
    let cleanups = Rc::new(RefCell::new(0));
    let mut hooks = HookRegistry::new();
    let counter = Rc::clone(&cleanups);
    hooks.on(HookLocation::PostDb, move |_| *counter.borrow_mut() += 1);

    let mut runner = Runner::from_config(&config, Rc::clone(&executor), hooks).unwrap();
    runner.run().unwrap();

    let commands = executor.executed_commands();
    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0][1], "load");
    assert_eq!(commands[1][1], "run");
    assert_eq!(&commands[1][5..], &["-threads", "1", "-s"]);
    assert_eq!(*cleanups.borrow(), 1);

    let targets = runner.into_targets();
    let stats = targets[0].stats();
    assert_eq!(stats.len(), 1);
    let row = &stats.rows()[0];
    assert_eq!(row.mpl(), Some(1));
    assert_eq!(row.trial(), Some(1));
    assert_eq!(
        row.get(Metric::Op(Operation::Read, Measure::AverageLatency)),
        Some(MetricValue::Float(1873.25))
    );
    assert_eq!(row.get(Metric::Op(Operation::Update, Measure::AverageLatency)), None);

    let files = output_files(dir.path());
    for prefix in [
        "config-mysql-",
        "workload-mysql-",
        "workload-generated-mysql-",
        "log-mysql-",
        "raw-mysql-",
        "stats-mysql-",
    ] {
        assert!(
            files.iter().any(|f| f.starts_with(prefix)),
            "missing {prefix}* in {files:?}"
        );
    }
    assert!(!files.iter().any(|f| f.ends_with(".tmp")));
}

#[test]
fn test_multi_target_section_exports_per_target() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        "redis[a], sqlite, redis[b]",
        "trials = 2\nmin_mpl = 2\nmax_mpl = 4\ninc_mpl = 2\n",
    );

    let executor = Rc::new(MockExecutor::new());
    let mut runner =
        Runner::from_config(&config, Rc::clone(&executor), HookRegistry::new()).unwrap();
    assert_eq!(runner.targets().len(), 2);
    runner.run().unwrap();

    // 2 targets x 2 trials x {2, 4}, no load phase
    let mpls: Vec<&str> = executor
        .executed_commands()
        .iter()
        .map(|cmd| {
            assert_eq!(cmd[1], "run");
            if cmd[6] == "2" { "2" } else { "4" }
        })
        .collect();
    assert_eq!(mpls, vec!["2", "4", "2", "4", "2", "4", "2", "4"]);

    for target in runner.targets() {
        // Empty output still yields rows, with every metric unset
        assert_eq!(target.stats().len(), 4);
        assert!(target.stats().rows().iter().all(|r| r.is_empty()));
    }

    let files = output_files(dir.path());
    let json_exports: Vec<_> = files
        .iter()
        .filter(|f| f.starts_with("stats-") && f.ends_with(".json"))
        .collect();
    assert_eq!(json_exports.len(), 2);
    assert!(json_exports.iter().any(|f| f.starts_with("stats-redis-a-")));
    assert!(json_exports.iter().any(|f| f.starts_with("stats-redis-b-")));
}

#[test]
fn test_generated_workload_carries_extraneous_keys() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        "mongodb",
        "operationcount = 250\n\"mongodb.url\" = \"mongodb://localhost:27017/ycsb\"\n",
    );

    let mut runner =
        Runner::from_config(&config, MockExecutor::new(), HookRegistry::new()).unwrap();
    runner.run().unwrap();

    let generated = output_files(dir.path())
        .into_iter()
        .find(|f| f.starts_with("workload-generated-"))
        .unwrap();
    let contents = std::fs::read_to_string(dir.path().join("out").join(generated)).unwrap();
    assert_eq!(
        contents,
        "mongodb.url=mongodb://localhost:27017/ycsb\noperationcount=250\n\
         readproportion=1.0\nrecordcount=1000\n"
    );
}

#[test]
fn test_failed_run_keeps_exported_rows() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "cassandra", "max_mpl = 3\n");

    let executor = MockExecutor::with_responses(vec![
        Ok(RUN_OUTPUT.into()),
        Ok(RUN_OUTPUT.into()),
        Err("connection refused".into()),
    ]);
    let mut runner = Runner::from_config(&config, executor, HookRegistry::new()).unwrap();
    let err = runner.run().unwrap_err();
    assert!(err.to_string().contains("connection refused"));

    let json = output_files(dir.path())
        .into_iter()
        .find(|f| f.starts_with("stats-") && f.ends_with(".json"))
        .unwrap();
    let exported: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("out").join(json)).unwrap())
            .unwrap();
    let rows = exported["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["mpl"], 2);
    assert_eq!(rows[1]["read_ops"], 512);
}

#[test]
fn test_invalid_option_fails_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "mysql, postgresql", "max_mpl = \"many\"\n");
    let result = Runner::from_config(&config, MockExecutor::new(), HookRegistry::new());
    assert!(result.is_err());
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_plan_matches_executed_sweep() {
    let raw = RawSection::new(
        "voltdb",
        [
            ("workload_path", "w"),
            ("trials", "2"),
            ("min_mpl", "1"),
            ("max_mpl", "5"),
            ("inc_mpl", "2"),
        ],
    );
    let spec = process_section(&raw).unwrap().remove(0);
    let plan = SweepPlan::for_target(&spec);
    assert_eq!(plan.trials, vec![1, 2]);
    assert_eq!(plan.mpls, vec![1, 3, 5]);
    assert_eq!(plan.total_steps(), 6);
}

#[test]
fn test_default_config_plans() {
    let config = RunnerConfigFile::parse(&RunnerConfigFile::default_toml()).unwrap();
    let plans: Vec<_> = config
        .targets()
        .unwrap()
        .iter()
        .map(SweepPlan::for_target)
        .collect();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].mpls, vec![1, 5, 9, 13]);
    assert_eq!(plans[0].trials, vec![1, 2, 3]);
}
