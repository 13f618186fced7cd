use clap::Parser;
use cohort_cea::utils::error::ErrorSeverity;
use cohort_cea::utils::{logger, validation::Validate};
use cohort_cea::{AnalysisEngine, CliConfig, CohortPipeline, LocalStorage, ModelConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliConfig::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting cohort-cea");
    tracing::debug!("CLI config: {:?}", args);

    if let Err(e) = args.validate() {
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("📁 Loading model from: {}", args.config);
    let mut config = match ModelConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load model file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 命令列覆蓋設定
    if let Some(cycles) = args.cycles {
        config.simulation.n_cycles = cycles;
        tracing::info!("🔧 Cycle count overridden to: {}", cycles);
    }
    if let Some(output) = &args.output {
        config.output.path = output.clone();
        tracing::info!("🔧 Output path overridden to: {}", output);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Model validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Model loaded and validated successfully");
    display_model_summary(&config, args.dry_run);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - no simulation will be run");
        return Ok(());
    }

    let storage = LocalStorage::new(config.output.path.clone());
    let pipeline = CohortPipeline::new(storage, config)?;
    let engine = AnalysisEngine::new(pipeline);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Analysis completed successfully!");
            println!("✅ Analysis completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Analysis failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

fn display_model_summary(config: &ModelConfig, dry_run: bool) {
    println!("📋 Model Summary:");
    println!(
        "  Model: {} v{}",
        config.model.name,
        config.model.version.as_deref().unwrap_or("0")
    );
    if let Some(description) = &config.model.description {
        println!("  Description: {}", description);
    }
    println!("  States: {}", config.states.names.join(", "));
    println!(
        "  Cycles: {} x {} years ({:?} of cycle)",
        config.simulation.n_cycles,
        config.cycle_length(),
        config.timing()
    );
    println!(
        "  Discount rates: costs {}, QALYs {}",
        config.cost_discount_rate(),
        config.qaly_discount_rate()
    );
    println!(
        "  Strategies: {}",
        config
            .strategies
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    if let Some(reference) = config.reference_strategy() {
        println!("  Reference: {}", reference);
    }
    println!("  Willingness to pay: {}", config.willingness_to_pay());
    println!("  Output: {} ({})", config.output.path, config.output.formats.join(", "));
    if let Some(bundle) = &config.output.bundle {
        println!("  Bundle: {}", bundle);
    }
    if dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }
    println!();
}
