//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use medclass_ml::MedclassConfig;
use medclass_ml::algorithms::NearestCentroidClassifier;
use medclass_ml::config::WORKSPACE_CONFIG_FILE;
use medclass_ml::data::{
    CsvSource, DatasetAnalysis, DatasetSource, LatestCsvSource, RawRecord, validate_table,
};
use medclass_ml::features::{FeatureExtractor, ProcessedCorpus};
use medclass_ml::training::{
    ClassifierFactory, EvaluationMetrics, FsArtifactStore, JobState, TrainableClassifier,
    TrainingJob, TrainingStatus,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    mut config: MedclassConfig,
    workspace: &Path,
) -> anyhow::Result<()> {
    match command {
        Commands::Train {
            data,
            classify,
            seed,
        } => {
            if let Some(seed) = seed {
                config.training.seed = seed;
            }
            handle_train(&config, workspace, data, classify).await
        }
        Commands::Analyze { data, export } => handle_analyze(&config, workspace, data, export).await,
        Commands::Preprocess { data, output } => {
            handle_preprocess(&config, workspace, data, output).await
        }
        Commands::Normalize { text } => {
            let chain = config.training_settings().normalizer();
            println!("{}", chain.normalize(&text));
            Ok(())
        }
        Commands::Config { action } => handle_config(action, &config, workspace),
    }
}

/// A file path loads that file; a directory (or nothing) loads its newest CSV.
fn resolve_source(
    config: &MedclassConfig,
    workspace: &Path,
    data: Option<PathBuf>,
) -> Arc<dyn DatasetSource> {
    let delimiter = config.data.delimiter;
    match data {
        Some(path) if path.is_file() => Arc::new(CsvSource::new(path, delimiter)),
        Some(dir) => Arc::new(LatestCsvSource::new(dir, delimiter)),
        None => Arc::new(LatestCsvSource::new(
            config.paths.resolve(workspace).datasets_dir,
            delimiter,
        )),
    }
}

fn ensure_valid(config: &MedclassConfig) -> anyhow::Result<()> {
    let problems = config.validate();
    if problems.is_empty() {
        return Ok(());
    }
    for problem in &problems {
        eprintln!("  {}", problem);
    }
    anyhow::bail!("Invalid configuration ({} problem(s))", problems.len())
}

async fn handle_train(
    config: &MedclassConfig,
    workspace: &Path,
    data: Option<PathBuf>,
    classify: Option<String>,
) -> anyhow::Result<()> {
    ensure_valid(config)?;
    let paths = config.paths.resolve(workspace);
    let params = config.centroid_params();
    NearestCentroidClassifier::new(params.clone())?;
    let factory: ClassifierFactory = Arc::new(move || {
        Box::new(NearestCentroidClassifier::new(params.clone()).unwrap_or_default())
            as Box<dyn TrainableClassifier>
    });
    let store = Arc::new(FsArtifactStore::new(&paths.models_dir, &paths.results_dir));

    let job = TrainingJob::new(
        resolve_source(config, workspace, data),
        factory,
        store.clone(),
        config.training_settings(),
    );

    let mut rx = job.subscribe();
    let run_id = job.start().await?;
    println!("Training run {} started", run_id);

    let mut printed = 0;
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = Arc::clone(&rx.borrow_and_update());
                for entry in status.logs.iter().skip(printed) {
                    println!("  [{:>3}%] {}", entry.progress, entry.step);
                }
                printed = status.logs.len();
                if status.run_id == Some(run_id) && status.state.is_terminal() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("  Stopping...");
                if let Err(e) = job.stop().await {
                    tracing::warn!(error = %e, "Stop request ignored");
                }
            }
        }
    }

    let status = job.wait().await;
    match status.state {
        JobState::Completed => {
            if let Some(metrics) = &status.metrics {
                print_metrics(metrics);
            }
            println!();
            println!("Model written to:   {}", store.model_path().display());
            println!("Metrics written to: {}", store.metrics_path().display());
        }
        JobState::Stopped => {
            println!("Training stopped at {}%", status.progress);
            return Ok(());
        }
        _ => return Err(run_error(&status)),
    }

    if let Some(title) = classify {
        let model = job
            .trained_model()
            .ok_or_else(|| anyhow::anyhow!("No trained model available"))?;
        let record = RawRecord {
            title: Some(title.clone()),
            ..Default::default()
        };
        for prediction in model.predict(&[record])? {
            println!();
            println!("\"{}\" -> {} ({:.1}%)", title, prediction.label, prediction.confidence * 100.0);
            for (class, p) in &prediction.probabilities {
                println!("  {:<30} {:>6.1}%", class, p * 100.0);
            }
        }
    }
    Ok(())
}

fn run_error(status: &TrainingStatus) -> anyhow::Error {
    anyhow::anyhow!(
        "Training failed at {}%: {}",
        status.progress,
        status.error.as_deref().unwrap_or("unknown error")
    )
}

fn print_metrics(metrics: &EvaluationMetrics) {
    println!();
    println!(
        "Evaluated on {} documents (trained on {})",
        metrics.test_samples, metrics.training_samples
    );
    println!("  Accuracy:  {:.3}", metrics.accuracy);
    println!(
        "  Precision: {:.3} weighted, {:.3} macro",
        metrics.precision, metrics.precision_macro
    );
    println!(
        "  Recall:    {:.3} weighted, {:.3} macro",
        metrics.recall, metrics.recall_macro
    );
    println!(
        "  F1:        {:.3} weighted, {:.3} macro",
        metrics.f1_score, metrics.f1_macro
    );
    println!();
    println!(
        "  {:<30} {:>9} {:>9} {:>9} {:>8}",
        "class", "precision", "recall", "f1", "support"
    );
    for report in &metrics.per_class {
        println!(
            "  {:<30} {:>9.3} {:>9.3} {:>9.3} {:>8}",
            report.class, report.precision, report.recall, report.f1_score, report.support
        );
    }
}

async fn handle_analyze(
    config: &MedclassConfig,
    workspace: &Path,
    data: Option<PathBuf>,
    export: Option<PathBuf>,
) -> anyhow::Result<()> {
    let source = resolve_source(config, workspace, data);
    let table = source.load().await?;
    let analysis = DatasetAnalysis::from_table(&table);

    println!("Records: {}", analysis.total_records);
    println!("Columns: {}", analysis.columns.join(", "));
    println!(
        "Single-label: {} ({:.1}%), multi-label: {} ({:.1}%), combinations: {}",
        analysis.labels.single_label_count,
        analysis.labels.single_label_percentage,
        analysis.labels.multi_label_count,
        analysis.labels.multi_label_percentage,
        analysis.labels.unique_combinations
    );
    println!("Labels:");
    for (label, share) in &analysis.label_distribution {
        println!("  {:<30} {:>6} ({:.1}%)", label, share.count, share.percentage);
    }
    println!(
        "Average length: title {:.1}, abstract {:.1} characters",
        analysis.text.avg_title_length, analysis.text.avg_abstract_length
    );
    println!("Duplicate rows: {}", analysis.quality.duplicate_rows);
    for (column, missing) in analysis.quality.missing_values.iter().filter(|(_, n)| **n > 0) {
        println!("  {} missing in '{}'", missing, column);
    }

    if let Some(path) = export {
        let path = workspace.join(path);
        analysis.export(&path)?;
        println!("Report written to {}", path.display());
    }
    Ok(())
}

async fn handle_preprocess(
    config: &MedclassConfig,
    workspace: &Path,
    data: Option<PathBuf>,
    output: PathBuf,
) -> anyhow::Result<()> {
    ensure_valid(config)?;
    let source = resolve_source(config, workspace, data);
    let table = source.load().await?;
    let documents = validate_table(&table)?;

    let settings = config.training_settings();
    let mut extractor = FeatureExtractor::new(settings.vectorizer.clone(), settings.label_order);
    let processed = ProcessedCorpus::build(&documents, &settings.normalizer(), &mut extractor)?;

    let output = workspace.join(output);
    processed.export(&output)?;
    println!(
        "Processed {} documents into {} text features and {} labels: {}",
        processed.len(),
        processed.features.text_width,
        processed.label_names.len(),
        output.display()
    );
    Ok(())
}

fn handle_config(
    action: ConfigAction,
    config: &MedclassConfig,
    workspace: &Path,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = workspace.join(WORKSPACE_CONFIG_FILE);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            let toml_str = toml::to_string_pretty(&MedclassConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!("Created default configuration at: {}", config_path.display());
            Ok(())
        }
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(config)?;
            println!("{}", toml_str);
            for problem in config.validate() {
                println!("# warning: {}", problem);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_valid_rejects_bad_ratio() {
        let mut config = MedclassConfig::default();
        assert!(ensure_valid(&config).is_ok());
        config.training.test_ratio = 0.0;
        assert!(ensure_valid(&config).is_err());
    }

    #[test]
    fn test_config_init_writes_loadable_file() {
        let dir = tempfile::tempdir().unwrap();
        handle_config(ConfigAction::Init, &MedclassConfig::default(), dir.path()).unwrap();

        let path = dir.path().join(WORKSPACE_CONFIG_FILE);
        assert!(path.exists());
        let loaded = medclass_ml::load_config(Some(dir.path()), None).unwrap();
        assert_eq!(loaded.paths, MedclassConfig::default().paths);
    }

    #[test]
    fn test_resolve_source_prefers_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("corpus.csv");
        std::fs::write(&file, "title;abstract;group\n").unwrap();
        let config = MedclassConfig::default();

        let source = resolve_source(&config, dir.path(), Some(file.clone()));
        assert_eq!(source.source_info().source_type, "csv");
        let source = resolve_source(&config, dir.path(), None);
        assert_eq!(source.source_info().source_type, "csv_dir");
    }
}
