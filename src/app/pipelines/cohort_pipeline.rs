use crate::core::cea::CohortAnalysis;
use crate::core::{AnalysisResult, ModelProvider, Pipeline, SimulatedStrategy, Storage};
use crate::domain::model::{IncrementalResult, MarkovTrace, StrategyOutcome};
use crate::utils::error::{CeaError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;
use zip::write::{SimpleFileOptions, ZipWriter};

pub const OUTCOMES_FILE: &str = "outcomes.csv";
pub const INCREMENTAL_FILE: &str = "incremental.csv";
pub const SUMMARY_FILE: &str = "summary.json";

/// Cohort 模型管道：模擬每個策略的 Markov trace、計算成本效益並輸出結果
pub struct CohortPipeline<S: Storage, C: ModelProvider> {
    storage: S,
    config: C,
    analysis: CohortAnalysis,
}

impl<S: Storage, C: ModelProvider> CohortPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Result<Self> {
        let analysis = config.build_analysis()?;
        Ok(Self {
            storage,
            config,
            analysis,
        })
    }

    fn wants(&self, format: &str) -> bool {
        self.config.output_formats().iter().any(|f| f == format)
    }
}

#[derive(Serialize)]
struct OutcomeRow<'a> {
    strategy: &'a str,
    cycle: usize,
    time: f64,
    costs: f64,
    qalys: f64,
    discounted_costs: f64,
    discounted_qalys: f64,
}

#[derive(Serialize)]
struct AnalysisSummary<'a> {
    model: &'a str,
    generated_at: DateTime<Utc>,
    n_cycles: usize,
    outcomes: Vec<StrategyTotals<'a>>,
    incremental: &'a [IncrementalResult],
}

#[derive(Serialize)]
struct StrategyTotals<'a> {
    strategy: &'a str,
    total_costs: f64,
    total_qalys: f64,
    undiscounted_costs: f64,
    undiscounted_qalys: f64,
}

/// 策略名稱轉成可用的檔名片段
///
/// Letters and digits (any script) are lowercased, everything else becomes `_`, so
/// "Drug A" and "drug_a" share a slug.
pub fn file_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else {
            slug.push('_');
        }
    }
    slug
}

pub fn trace_file_name(strategy: &str) -> String {
    format!("trace_{}.csv", file_slug(strategy))
}

/// One trace file name per strategy; two strategies that slug to the same file are
/// rejected instead of overwriting each other.
pub fn trace_file_names<'a, I>(strategies: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: HashMap<String, &str> = HashMap::new();
    let mut names = Vec::new();
    for strategy in strategies {
        let file_name = trace_file_name(strategy);
        if let Some(previous) = seen.insert(file_name.clone(), strategy) {
            return Err(CeaError::InvalidConfigValueError {
                field: "strategies.name".to_string(),
                value: strategy.to_string(),
                reason: format!(
                    "Trace file '{}' is already used by strategy '{}'",
                    file_name, previous
                ),
            });
        }
        names.push(file_name);
    }
    Ok(names)
}

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| CeaError::IoError(e.into_error()))
}

pub fn trace_to_csv(trace: &MarkovTrace) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["cycle".to_string()];
    header.extend(trace.column_labels());
    writer.write_record(&header)?;

    for (cycle, row) in trace.rows().enumerate() {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(cycle.to_string());
        record.extend(row.iter().map(|x| x.to_string()));
        writer.write_record(&record)?;
    }

    finish_csv(writer)
}

pub fn outcomes_to_csv(outcomes: &[StrategyOutcome]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    for outcome in outcomes {
        for i in 0..outcome.times.len() {
            writer.serialize(OutcomeRow {
                strategy: &outcome.strategy,
                cycle: i + 1,
                time: outcome.times[i],
                costs: outcome.cycle_costs[i],
                qalys: outcome.cycle_qalys[i],
                discounted_costs: outcome.discounted_costs[i],
                discounted_qalys: outcome.discounted_qalys[i],
            })?;
        }
    }

    finish_csv(writer)
}

pub fn incremental_to_csv(results: &[IncrementalResult]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for result in results {
        writer.serialize(result)?;
    }
    finish_csv(writer)
}

#[async_trait::async_trait]
impl<S: Storage, C: ModelProvider> Pipeline for CohortPipeline<S, C> {
    async fn simulate(&self) -> Result<Vec<SimulatedStrategy>> {
        tracing::info!(
            "🚀 Simulating '{}': {} strategies over {} cycles",
            self.config.model_name(),
            self.analysis.strategies.len(),
            self.analysis.n_cycles
        );

        let simulations = self.analysis.simulate()?;

        for simulated in &simulations {
            let drift = simulated
                .trace
                .row_sums()
                .iter()
                .map(|s| (s - 1.0).abs())
                .fold(0.0_f64, f64::max);
            tracing::debug!(
                "Strategy '{}' final occupancy {:?} (max row drift {:e})",
                simulated.strategy,
                simulated.trace.last(),
                drift
            );
        }

        Ok(simulations)
    }

    async fn evaluate(&self, simulations: Vec<SimulatedStrategy>) -> Result<AnalysisResult> {
        tracing::info!("🔧 Evaluating {} simulated strategies", simulations.len());

        let result = self.analysis.evaluate(simulations)?;

        for outcome in &result.outcomes {
            tracing::info!(
                "📊 {}: costs {:.2}, QALYs {:.4}",
                outcome.strategy,
                outcome.total_costs,
                outcome.total_qalys
            );
        }
        for inc in &result.incremental {
            match inc.icer {
                Some(icer) => tracing::info!(
                    "📈 {} vs {}: ICER {:.2} ({:?})",
                    inc.comparator,
                    inc.reference,
                    icer,
                    inc.status
                ),
                None => tracing::info!(
                    "📈 {} vs {}: no QALY difference ({:?})",
                    inc.comparator,
                    inc.reference,
                    inc.status
                ),
            }
        }

        Ok(result)
    }

    async fn load(&self, result: AnalysisResult) -> Result<String> {
        tracing::info!("💾 Writing analysis outputs");

        let mut files: Vec<(String, Vec<u8>)> = Vec::new();

        if self.wants("csv") {
            let trace_files =
                trace_file_names(result.simulations.iter().map(|s| s.strategy.as_str()))?;
            for (file_name, simulated) in trace_files.into_iter().zip(&result.simulations) {
                files.push((file_name, trace_to_csv(&simulated.trace)?));
            }
            files.push((OUTCOMES_FILE.to_string(), outcomes_to_csv(&result.outcomes)?));
            if !result.incremental.is_empty() {
                files.push((
                    INCREMENTAL_FILE.to_string(),
                    incremental_to_csv(&result.incremental)?,
                ));
            }
        }

        if self.wants("json") {
            let summary = AnalysisSummary {
                model: self.config.model_name(),
                generated_at: Utc::now(),
                n_cycles: self.analysis.n_cycles,
                outcomes: result
                    .outcomes
                    .iter()
                    .map(|o| StrategyTotals {
                        strategy: &o.strategy,
                        total_costs: o.total_costs,
                        total_qalys: o.total_qalys,
                        undiscounted_costs: o.undiscounted_costs,
                        undiscounted_qalys: o.undiscounted_qalys,
                    })
                    .collect(),
                incremental: &result.incremental,
            };
            files.push((
                SUMMARY_FILE.to_string(),
                serde_json::to_vec_pretty(&summary)?,
            ));
        }

        if files.is_empty() {
            tracing::warn!("No output formats selected, nothing written");
        }

        if let Some(bundle) = self.config.bundle_name() {
            tracing::debug!("Creating ZIP bundle with {} files", files.len());

            let zip_data = {
                let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
                for (name, data) in &files {
                    zip.start_file(name.as_str(), SimpleFileOptions::default())?;
                    zip.write_all(data)?;
                }
                let cursor = zip.finish()?;
                cursor.into_inner()
            };

            self.storage.write_file(bundle, &zip_data).await?;

            let output_path = format!("{}/{}", self.config.output_path(), bundle);
            tracing::info!("📦 Bundle saved: {}", output_path);
            return Ok(output_path);
        }

        for (name, data) in &files {
            self.storage.write_file(name, data).await?;
            tracing::debug!("Wrote {}", name);
        }

        tracing::info!(
            "📁 {} files saved to {}",
            files.len(),
            self.config.output_path()
        );
        Ok(self.config.output_path().to_string())
    }
}
