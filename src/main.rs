use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use cardiotree_io::{ColumnRoles, ExperimentName, ResultWriter, TableReader};
use cardiotree_model::{Evaluator, ModelReport, ModelSelector, Objective};
use cardiotree_prep::{CleanConfig, CleanSummary, Cleaner, Partitioner, Sentinel, StratumSplit};
use cardiotree_tree::{DecisionTreeConfig, SplitCriterion};

#[derive(Parser)]
#[command(name = "cardiotree")]
#[command(about = "Decision-tree screening report for tabular heart-disease data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for partitioning and fold assignment
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for candidate scoring (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Loading and cleaning parameters.
#[derive(Args, Debug, Clone)]
struct PrepArgs {
    /// Outcome column
    #[arg(long, default_value = "num")]
    outcome: String,

    /// Outcome value mapped to class 0; every other value is class 1
    #[arg(long, default_value = "0")]
    baseline: String,

    /// Columns typed as categorical
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "sex,cp,fbs,restecg,exang,dataset,slope,thal"
    )]
    categorical: Vec<String>,

    /// Columns carried through but never used as features
    #[arg(long, value_delimiter = ',', default_value = "id")]
    ignore: Vec<String>,

    /// Numeric column whose sentinel value means "missing"
    #[arg(long, default_value = "chol")]
    sentinel_column: String,

    /// Sentinel value recoded to missing
    #[arg(long, default_value_t = 0.0)]
    sentinel_value: f64,

    /// Columns with a larger missing fraction are dropped
    #[arg(long, default_value_t = 0.30)]
    missing_threshold: f64,

    /// Fraction of each outcome stratum assigned to training
    #[arg(long, default_value_t = 0.80)]
    train_fraction: f64,

    /// Prune the test columns on their own missing fractions instead of
    /// keeping the training column set
    #[arg(long, default_value_t = false)]
    independent_pruning: bool,

    /// Field delimiter of the input file
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Cell values read as missing (defaults to "", "NA" and "?")
    #[arg(long, value_delimiter = ',')]
    missing_tokens: Option<Vec<String>>,
}

/// Model selection parameters.
#[derive(Args, Debug, Clone)]
struct SelectArgs {
    /// Complexity penalties to cross-validate
    #[arg(long, value_delimiter = ',', default_value = "0,0.0001,0.001,0.01,0.1,1")]
    cp_grid: Vec<f64>,

    /// Number of cross-validation folds
    #[arg(long, default_value_t = 5)]
    cv_folds: usize,

    /// Split quality criterion: "gini" or "entropy"
    #[arg(long, default_value = "gini")]
    criterion: String,

    /// Minimum rows in a node for a split to be tried
    #[arg(long, default_value_t = 20)]
    min_split: usize,

    /// Minimum rows in each child of a split
    #[arg(long, default_value_t = 7)]
    min_leaf: usize,

    /// Maximum tree depth
    #[arg(long, default_value_t = 30)]
    max_depth: usize,
}

/// Arguments of the `run` command.
#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Path to the input CSV file
    #[arg(long)]
    data: PathBuf,

    /// Experiment name for the JSON report (must match [a-zA-Z0-9_-]+)
    #[arg(long)]
    experiment: Option<String>,

    /// Output directory for the JSON report
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Print the report as JSON instead of text
    #[arg(long, default_value_t = false)]
    json: bool,

    #[command(flatten)]
    prep: PrepArgs,

    #[command(flatten)]
    select: SelectArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Partition, clean, select trees by accuracy and specificity, and report
    Run(RunArgs),
}

// --- report ---

#[derive(Debug, Serialize)]
struct RunReport {
    source: String,
    seed: u64,
    n_rows: usize,
    n_cols: usize,
    train_fraction: f64,
    criterion: SplitCriterion,
    strata: Vec<StratumSplit>,
    train_cleaning: CleanSummary,
    test_cleaning: CleanSummary,
    models: Vec<ModelReport>,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "cardiotree report: {}", self.source)?;
        writeln!(f, "{} rows, {} columns, seed {}", self.n_rows, self.n_cols, self.seed)?;
        writeln!(f)?;

        writeln!(f, "Partition (train fraction {:.2})", self.train_fraction)?;
        writeln!(f, "  {:<10} {:>6} {:>6} {:>6}", "stratum", "total", "train", "test")?;
        for s in &self.strata {
            writeln!(
                f,
                "  {:<10} {:>6} {:>6} {:>6}",
                s.label.as_deref().unwrap_or("NA"),
                s.total,
                s.train,
                s.total - s.train
            )?;
        }
        writeln!(f)?;

        writeln!(f, "Cleaning")?;
        for (side, summary) in [("train", &self.train_cleaning), ("test", &self.test_cleaning)] {
            writeln!(
                f,
                "  {side:<5}: {} -> {} rows, {} sentinel(s) recoded, classes {} / {}",
                summary.rows_in,
                summary.rows_out,
                summary.sentinels_recoded,
                summary.class_counts[0],
                summary.class_counts[1]
            )?;
            for d in &summary.dropped_columns {
                writeln!(
                    f,
                    "         dropped {} ({:.1}% missing)",
                    d.name,
                    d.missing_fraction * 100.0
                )?;
            }
        }
        writeln!(f, "  columns: {}", self.train_cleaning.kept_columns.join(", "))?;
        writeln!(f, "  split criterion: {:?}", self.criterion)?;

        for model in &self.models {
            writeln!(f)?;
            write!(f, "{model}")?;
        }
        Ok(())
    }
}

fn parse_criterion(s: &str) -> Result<SplitCriterion> {
    match s {
        "gini" => Ok(SplitCriterion::Gini),
        "entropy" => Ok(SplitCriterion::Entropy),
        other => anyhow::bail!("unknown split criterion: {other} (expected gini or entropy)"),
    }
}

/// Load, partition, clean, then select and evaluate once per objective.
fn run(args: &RunArgs, seed: u64) -> Result<RunReport> {
    let prep = &args.prep;
    let select = &args.select;
    let criterion = parse_criterion(&select.criterion)?;

    // 1. Load
    let roles = ColumnRoles::new(prep.outcome.clone())
        .with_categorical(prep.categorical.clone())
        .with_ignored(prep.ignore.clone());
    let delimiter =
        u8::try_from(prep.delimiter).context("delimiter must be a single-byte character")?;
    let mut reader = TableReader::new(&args.data)
        .with_roles(roles)
        .with_delimiter(delimiter);
    if let Some(tokens) = prep.missing_tokens.clone() {
        reader = reader.with_missing_tokens(tokens);
    }
    let table = reader.read().context("failed to read input CSV")?;
    info!(n_rows = table.n_rows(), n_cols = table.n_cols(), "dataset loaded");

    // 2. Partition by outcome stratum
    let partition = Partitioner::new(prep.train_fraction)?
        .with_seed(seed)
        .split(&table, &prep.outcome)
        .context("partitioning failed")?;

    // 3. Clean both sides
    let sentinel = Sentinel::new(prep.sentinel_column.clone(), prep.sentinel_value);
    let cleaner = Cleaner::new(
        CleanConfig::new(prep.outcome.clone())
            .with_baseline(prep.baseline.clone())
            .with_sentinels(vec![sentinel])
            .with_missing_threshold(prep.missing_threshold)
            .with_categorical(prep.categorical.clone()),
    )?;
    let (train, train_cleaning) = cleaner
        .clean_with_summary(&partition.train)
        .context("cleaning the training partition failed")?;

    let test_cleaner = if prep.independent_pruning {
        cleaner.clone()
    } else {
        cleaner.retaining(train.column_names())
    };
    let (test, test_cleaning) = test_cleaner
        .clean_with_summary(&partition.test)
        .context("cleaning the test partition failed")?;
    if train.column_names() != test.column_names() {
        warn!(
            train = ?train.column_names(),
            test = ?test.column_names(),
            "train and test partitions kept different columns"
        );
    }
    info!(train_rows = train.n_rows(), test_rows = test.n_rows(), "partitions cleaned");

    // 4. Select and evaluate once per objective
    let tree = DecisionTreeConfig::new()
        .with_criterion(criterion)
        .with_min_samples_split(select.min_split)
        .with_min_samples_leaf(select.min_leaf)
        .with_max_depth(select.max_depth);
    let selector = ModelSelector::new(select.cp_grid.clone(), select.cv_folds)?
        .with_seed(seed)
        .with_tree_config(tree);

    let mut models = Vec::with_capacity(2);
    for objective in [Objective::Accuracy, Objective::Specificity] {
        let selection = selector
            .select(&train, objective)
            .with_context(|| format!("model selection by {objective} failed"))?;
        let evaluation = Evaluator::new(&selection.model)
            .evaluate(&test)
            .with_context(|| format!("evaluating the {objective} model failed"))?;
        models.push(ModelReport::new(&selection, evaluation));
    }

    Ok(RunReport {
        source: args.data.display().to_string(),
        seed,
        n_rows: table.n_rows(),
        n_cols: table.n_cols(),
        train_fraction: prep.train_fraction,
        criterion,
        strata: partition.strata,
        train_cleaning,
        test_cleaning,
        models,
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Run(args) => {
            // Validate the experiment name before any work is done
            let writer = args
                .experiment
                .clone()
                .map(|name| ResultWriter::new(&args.output_dir, ExperimentName::new(name)?))
                .transpose()?;

            let report = run(&args, cli.seed)?;

            if let Some(writer) = writer {
                writer.write_report(&report).context("failed to write JSON report")?;
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{report}");
            }
        }
    }

    Ok(())
}
