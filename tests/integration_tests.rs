use anyhow::Result;
use cohort_cea::utils::validation::Validate;
use cohort_cea::{AnalysisEngine, CohortPipeline, Dominance, LocalStorage, ModelConfig};
use std::io::Read;
use std::path::Path;
use tempfile::TempDir;

fn model_toml(output_path: &str, extra_output: &str) -> String {
    format!(
        r#"
[model]
name = "sick-sicker"
description = "Three-state progression model"
version = "0.1.0"

[states]
names = ["Healthy", "Sick", "Dead"]
initial = [1.0, 0.0, 0.0]

[simulation]
n_cycles = 5
timing = "mid"

[discount]
costs = 0.03
qalys = 0.03

[analysis]
willingness_to_pay = 50000.0

[[strategies]]
name = "usual care"
transitions = [[0.80, 0.15, 0.05], [0.00, 0.70, 0.30], [0.00, 0.00, 1.00]]
costs = [500.0, 3000.0, 0.0]
utilities = [1.0, 0.5, 0.0]

[[strategies]]
name = "screening"
transitions = [[0.85, 0.10, 0.05], [0.00, 0.75, 0.25], [0.00, 0.00, 1.00]]
costs = [800.0, 3000.0, 0.0]
utilities = [1.0, 0.5, 0.0]

[output]
path = "{}"
formats = ["csv", "json"]
{}
"#,
        output_path, extra_output
    )
}

#[tokio::test]
async fn test_end_to_end_analysis_writes_files() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output_path = temp_dir.path().to_string_lossy().replace('\\', "/");

    let config = ModelConfig::from_toml_str(&model_toml(&output_path, ""))?;
    config.validate()?;

    let storage = LocalStorage::new(output_path.clone());
    let pipeline = CohortPipeline::new(storage, config)?;
    let engine = AnalysisEngine::new(pipeline);

    let result_path = engine.run().await?;
    assert_eq!(result_path, output_path);

    let dir = Path::new(&output_path);
    for file in [
        "trace_usual_care.csv",
        "trace_screening.csv",
        "outcomes.csv",
        "incremental.csv",
        "summary.json",
    ] {
        assert!(dir.join(file).exists(), "missing {}", file);
    }

    let trace = std::fs::read_to_string(dir.join("trace_screening.csv"))?;
    let mut lines = trace.lines();
    assert_eq!(lines.next(), Some("cycle,Healthy,Sick,Dead"));
    assert_eq!(lines.next(), Some("0,1,0,0"));
    assert_eq!(trace.lines().count(), 7);

    let outcomes = std::fs::read_to_string(dir.join("outcomes.csv"))?;
    assert!(outcomes.starts_with(
        "strategy,cycle,time,costs,qalys,discounted_costs,discounted_qalys\n"
    ));
    // 兩個策略各 5 個週期，加上標題
    assert_eq!(outcomes.lines().count(), 11);
    assert!(outcomes.contains("usual care,1,0.5,"));

    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("summary.json"))?)?;
    assert_eq!(summary["model"], "sick-sicker");
    assert_eq!(summary["n_cycles"], 5);
    // 未指定 reference 時使用第一個策略
    assert_eq!(summary["incremental"][0]["reference"], "usual care");
    assert_eq!(summary["incremental"][0]["comparator"], "screening");
    assert!(summary["generated_at"].is_string());

    Ok(())
}

#[tokio::test]
async fn test_bundle_output_contains_all_files() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output_path = temp_dir.path().to_string_lossy().replace('\\', "/");

    let config =
        ModelConfig::from_toml_str(&model_toml(&output_path, "bundle = \"results.zip\""))?;
    config.validate()?;

    let pipeline = CohortPipeline::new(LocalStorage::new(output_path.clone()), config)?;
    let result_path = AnalysisEngine::new(pipeline).run().await?;
    assert!(result_path.ends_with("results.zip"));

    let bundle = Path::new(&output_path).join("results.zip");
    assert!(bundle.exists());
    assert!(!Path::new(&output_path).join("summary.json").exists());

    let mut archive = zip::ZipArchive::new(std::fs::File::open(bundle)?)?;
    assert_eq!(archive.len(), 5);

    let mut summary = String::new();
    archive.by_name("summary.json")?.read_to_string(&mut summary)?;
    assert!(summary.contains("sick-sicker"));

    Ok(())
}

#[tokio::test]
async fn test_bundled_hiv_model_runs() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let model_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("models/hiv_combination.toml");

    let mut config = ModelConfig::from_file(&model_path)?;
    config.output.path = temp_dir.path().to_string_lossy().to_string();
    config.validate()?;

    let analysis = config.to_analysis()?;
    let result = analysis.run()?;

    let mono = &result.outcomes[0];
    assert_eq!(mono.strategy, "monotherapy");
    assert!((mono.total_costs - 44_613.85).abs() < 0.01);
    assert!((mono.total_qalys - 7.9792).abs() < 1e-4);

    let inc = &result.incremental[0];
    assert_eq!(inc.comparator, "combination");
    assert_eq!(inc.status, Dominance::Tradeoff);
    let icer = inc.icer.unwrap_or_default();
    assert!(icer > 0.0);
    assert!((icer - inc.incremental_costs / inc.incremental_qalys).abs() < 1e-9);

    for simulated in &result.simulations {
        assert_eq!(simulated.trace.n_cycles(), 20);
        for sum in simulated.trace.row_sums() {
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    Ok(())
}

#[tokio::test]
async fn test_invalid_model_is_rejected_before_running() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output_path = temp_dir.path().to_string_lossy().replace('\\', "/");

    let content = model_toml(&output_path, "").replace("n_cycles = 5", "n_cycles = 0");
    let config = ModelConfig::from_toml_str(&content)?;

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("simulation.n_cycles"));
    Ok(())
}
