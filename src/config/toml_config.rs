use crate::app::pipelines::cohort_pipeline::trace_file_names;
use crate::core::cea::{CohortAnalysis, EvaluationSettings};
use crate::core::discount::Timing;
use crate::core::{ModelProvider, Strategy, TransitionMatrix};
use crate::utils::error::{CeaError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model: ModelInfo,
    pub states: StatesConfig,
    pub simulation: SimulationConfig,
    pub discount: Option<DiscountConfig>,
    pub analysis: Option<AnalysisConfig>,
    pub strategies: Vec<StrategyConfig>,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatesConfig {
    pub names: Vec<String>,
    pub initial: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub n_cycles: usize,
    pub timing: Option<Timing>,
    pub cycle_length: Option<f64>,
    pub strict_stochastic: Option<bool>,
    pub tolerance: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountConfig {
    pub costs: Option<f64>,
    pub qalys: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub reference: Option<String>,
    pub willingness_to_pay: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub name: String,
    pub description: Option<String>,
    pub transitions: Vec<Vec<f64>>,
    pub costs: Vec<f64>,
    pub utilities: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
    pub formats: Vec<String>,
    pub bundle: Option<String>,
}

impl ModelConfig {
    /// 從 TOML 檔案載入模型設定
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CeaError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析模型設定
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| CeaError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OUTPUT_DIR})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| CeaError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證模型設定的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("model.name", &self.model.name)?;

        // 狀態與初始分佈
        let n_states = self.states.names.len();
        validation::validate_positive_number("states.names", n_states, 1)?;
        validation::validate_unique_names(
            "states.names",
            self.states.names.iter().map(String::as_str),
        )?;
        validation::validate_length("states.initial", n_states, self.states.initial.len())?;
        validation::validate_probability_vector(
            "states.initial",
            &self.states.initial,
            self.tolerance(),
        )?;

        // 模擬參數
        validation::validate_positive_number("simulation.n_cycles", self.simulation.n_cycles, 1)?;
        let cycle_length = self.cycle_length();
        if !cycle_length.is_finite() || cycle_length <= 0.0 {
            return Err(CeaError::InvalidConfigValueError {
                field: "simulation.cycle_length".to_string(),
                value: cycle_length.to_string(),
                reason: "Cycle length must be a positive number of years".to_string(),
            });
        }
        validation::validate_range("simulation.tolerance", self.tolerance(), 0.0, 0.01)?;

        // 折現率
        validation::validate_discount_rate("discount.costs", self.cost_discount_rate())?;
        validation::validate_discount_rate("discount.qalys", self.qaly_discount_rate())?;

        // 策略
        if self.strategies.is_empty() {
            return Err(CeaError::MissingConfigError {
                field: "strategies".to_string(),
            });
        }
        validation::validate_unique_names(
            "strategies.name",
            self.strategies.iter().map(|s| s.name.as_str()),
        )?;
        trace_file_names(self.strategies.iter().map(|s| s.name.as_str()))?;
        for strategy in &self.strategies {
            self.validate_strategy(strategy, n_states)?;
        }

        if let Some(reference) = self.reference_strategy() {
            if !self.strategies.iter().any(|s| s.name == reference) {
                return Err(CeaError::InvalidConfigValueError {
                    field: "analysis.reference".to_string(),
                    value: reference.to_string(),
                    reason: "Reference must name one of the configured strategies".to_string(),
                });
            }
        }

        // 輸出設定
        validation::validate_path("output.path", &self.output.path)?;
        let valid_formats = ["csv", "json"];
        for format in &self.output.formats {
            if !valid_formats.contains(&format.as_str()) {
                return Err(CeaError::InvalidConfigValueError {
                    field: "output.formats".to_string(),
                    value: format.clone(),
                    reason: format!(
                        "Unsupported format. Valid formats: {}",
                        valid_formats.join(", ")
                    ),
                });
            }
        }
        if let Some(bundle) = &self.output.bundle {
            validation::validate_file_extensions("output.bundle", &[bundle.clone()], &["zip"])?;
        }

        Ok(())
    }

    fn validate_strategy(&self, strategy: &StrategyConfig, n_states: usize) -> Result<()> {
        let field = |name: &str| format!("strategies.{}.{}", strategy.name, name);

        validation::validate_non_empty_string("strategies.name", &strategy.name)?;
        validation::validate_length(&field("transitions"), n_states, strategy.transitions.len())?;
        for (i, row) in strategy.transitions.iter().enumerate() {
            validation::validate_length(&format!("{}[{}]", field("transitions"), i), n_states, row.len())?;
        }
        validation::validate_length(&field("costs"), n_states, strategy.costs.len())?;
        validation::validate_length(&field("utilities"), n_states, strategy.utilities.len())?;

        // 轉移矩陣不是列隨機矩陣時：預設只警告，strict 模式才拒絕
        let matrix = TransitionMatrix::new(strategy.transitions.clone())?;
        if !matrix.is_row_stochastic(self.tolerance()) {
            let deviations = matrix.row_sum_deviations();
            if self.strict_stochastic() {
                return Err(CeaError::InvalidConfigValueError {
                    field: field("transitions"),
                    value: format!("{:?}", deviations),
                    reason: "Every row must be non-negative and sum to 1".to_string(),
                });
            }
            tracing::warn!(
                "⚠️ Strategy '{}' has a transition matrix that is not row-stochastic (row sum deviations: {:?}); the trace will not sum to 1",
                strategy.name,
                deviations
            );
        }

        Ok(())
    }

    pub fn timing(&self) -> Timing {
        self.simulation.timing.unwrap_or_default()
    }

    pub fn cycle_length(&self) -> f64 {
        self.simulation.cycle_length.unwrap_or(1.0)
    }

    pub fn tolerance(&self) -> f64 {
        self.simulation.tolerance.unwrap_or(DEFAULT_TOLERANCE)
    }

    pub fn strict_stochastic(&self) -> bool {
        self.simulation.strict_stochastic.unwrap_or(false)
    }

    pub fn cost_discount_rate(&self) -> f64 {
        self.discount.as_ref().and_then(|d| d.costs).unwrap_or(0.0)
    }

    pub fn qaly_discount_rate(&self) -> f64 {
        self.discount.as_ref().and_then(|d| d.qalys).unwrap_or(0.0)
    }

    pub fn reference_strategy(&self) -> Option<&str> {
        self.analysis.as_ref().and_then(|a| a.reference.as_deref())
    }

    pub fn willingness_to_pay(&self) -> f64 {
        self.analysis
            .as_ref()
            .and_then(|a| a.willingness_to_pay)
            .unwrap_or(0.0)
    }

    pub fn evaluation_settings(&self) -> EvaluationSettings {
        EvaluationSettings {
            cost_rate: self.cost_discount_rate(),
            qaly_rate: self.qaly_discount_rate(),
            timing: self.timing(),
            cycle_length: self.cycle_length(),
        }
    }

    pub fn to_analysis(&self) -> Result<CohortAnalysis> {
        let strategies = self
            .strategies
            .iter()
            .map(|s| {
                let transitions = TransitionMatrix::new(s.transitions.clone())?
                    .with_state_names(self.states.names.clone())?;
                Ok(Strategy {
                    name: s.name.clone(),
                    transitions,
                    state_costs: s.costs.clone(),
                    state_utilities: s.utilities.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CohortAnalysis {
            initial: self.states.initial.clone(),
            n_cycles: self.simulation.n_cycles,
            settings: self.evaluation_settings(),
            strategies,
            reference: self.reference_strategy().map(str::to_string),
            willingness_to_pay: self.willingness_to_pay(),
        })
    }
}

impl ModelProvider for ModelConfig {
    fn model_name(&self) -> &str {
        &self.model.name
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn output_formats(&self) -> &[String] {
        &self.output.formats
    }

    fn bundle_name(&self) -> Option<&str> {
        self.output.bundle.as_deref()
    }

    fn build_analysis(&self) -> Result<CohortAnalysis> {
        self.to_analysis()
    }
}

impl Validate for ModelConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[model]
name = "hiv-combination"
description = "Monotherapy vs combination therapy"
version = "1.0.0"

[states]
names = ["A", "B", "C", "Death"]
initial = [1.0, 0.0, 0.0, 0.0]

[simulation]
n_cycles = 20
timing = "end"

[discount]
costs = 0.06
qalys = 0.0

[analysis]
reference = "monotherapy"
willingness_to_pay = 20000.0

[[strategies]]
name = "monotherapy"
transitions = [
    [0.721, 0.202, 0.067, 0.010],
    [0.000, 0.581, 0.407, 0.012],
    [0.000, 0.000, 0.750, 0.250],
    [0.000, 0.000, 0.000, 1.000],
]
costs = [5106.0, 6196.0, 11349.0, 0.0]
utilities = [1.0, 1.0, 1.0, 0.0]

[output]
path = "./output"
formats = ["csv", "json"]
"#;

    #[test]
    fn test_parse_basic_model_config() {
        let config = ModelConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.model.name, "hiv-combination");
        assert_eq!(config.states.names.len(), 4);
        assert_eq!(config.timing(), Timing::End);
        assert_eq!(config.cost_discount_rate(), 0.06);
        assert_eq!(config.reference_strategy(), Some("monotherapy"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_optional_sections_use_defaults() {
        let toml_content = r#"
[model]
name = "minimal"

[states]
names = ["Alive", "Dead"]
initial = [1.0, 0.0]

[simulation]
n_cycles = 5

[[strategies]]
name = "only"
transitions = [[0.9, 0.1], [0.0, 1.0]]
costs = [10.0, 0.0]
utilities = [0.8, 0.0]

[output]
path = "./output"
formats = ["csv"]
"#;
        let config = ModelConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.cost_discount_rate(), 0.0);
        assert_eq!(config.cycle_length(), 1.0);
        assert_eq!(config.willingness_to_pay(), 0.0);
        assert!(!config.strict_stochastic());

        let analysis = config.to_analysis().unwrap();
        assert_eq!(analysis.reference, None);
        assert_eq!(
            analysis.strategies[0].transitions.state_names().unwrap(),
            &["Alive".to_string(), "Dead".to_string()]
        );
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("COHORT_CEA_TEST_OUTPUT", "/tmp/cea-run");

        let content = BASIC.replace("\"./output\"", "\"${COHORT_CEA_TEST_OUTPUT}\"");
        let config = ModelConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.output.path, "/tmp/cea-run");

        std::env::remove_var("COHORT_CEA_TEST_OUTPUT");
    }

    #[test]
    fn test_dimension_errors_are_reported() {
        let content = BASIC.replace(
            "costs = [5106.0, 6196.0, 11349.0, 0.0]",
            "costs = [5106.0, 6196.0, 11349.0]",
        );
        let config = ModelConfig::from_toml_str(&content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(CeaError::DimensionMismatch {
                expected: 4,
                actual: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_reference_is_rejected() {
        let content = BASIC.replace("reference = \"monotherapy\"", "reference = \"placebo\"");
        let config = ModelConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_initial_vector_must_be_a_distribution() {
        let content = BASIC.replace("initial = [1.0, 0.0, 0.0, 0.0]", "initial = [0.5, 0.0, 0.0, 0.0]");
        let config = ModelConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_stochastic_matrix_is_only_rejected_in_strict_mode() {
        let content = BASIC.replace(
            "[0.000, 0.000, 0.750, 0.250]",
            "[0.000, 0.000, 0.750, 0.200]",
        );
        let config = ModelConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_ok());

        let strict = content.replace("timing = \"end\"", "timing = \"end\"\nstrict_stochastic = true");
        let config = ModelConfig::from_toml_str(&strict).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_output_settings() {
        let content = BASIC.replace("formats = [\"csv\", \"json\"]", "formats = [\"xlsx\"]");
        let config = ModelConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_err());

        let content = BASIC.replace(
            "formats = [\"csv\", \"json\"]",
            "formats = [\"csv\"]\nbundle = \"results.tar\"",
        );
        let config = ModelConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_err());
    }

    fn with_second_strategy(name: &str) -> String {
        format!(
            r#"{}
[[strategies]]
name = "{}"
transitions = [[0.9, 0.1, 0.0, 0.0], [0.0, 0.9, 0.1, 0.0], [0.0, 0.0, 0.9, 0.1], [0.0, 0.0, 0.0, 1.0]]
costs = [7000.0, 7000.0, 13000.0, 0.0]
utilities = [1.0, 1.0, 1.0, 0.0]
"#,
            BASIC, name
        )
    }

    #[test]
    fn test_strategies_sharing_a_trace_file_are_rejected() {
        let content = with_second_strategy("Monotherapy");
        let config = ModelConfig::from_toml_str(&content).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, CeaError::InvalidConfigValueError { ref field, .. } if field == "strategies.name"));
        assert!(err.to_string().contains("trace_monotherapy.csv"));

        let config = ModelConfig::from_toml_str(&with_second_strategy("mono therapy")).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_non_ascii_strategy_names_keep_distinct_trace_files() {
        let content = with_second_strategy("新藥").replace("\"monotherapy\"", "\"舊藥\"");
        let config = ModelConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_ok());

        let content = with_second_strategy("舊藥").replace("\"monotherapy\"", "\"舊藥 \"");
        let config = ModelConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = ModelConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.model.name, "hiv-combination");
        assert_eq!(config.strategies.len(), 1);
    }
}
