//! headmark CLI - heading classifier training and outline extraction

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use headmark::{
    build_training_set, extract_directory_with, obtain_model, outline_file, train_from_csv,
    AssembleOptions, BatchReport, ClassifierMode, ForestOptions, HeadingModel, JsonFormat,
    PipelineOptions, RetrainPolicy, SequenceOptions, TrainOptions, TrainingSet,
};

#[derive(Parser)]
#[command(name = "headmark")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Train heading classifiers and extract PDF outlines", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a labeled training CSV from layout dumps and ground truth
    Dataset {
        /// Directory of *.layout.json files
        #[arg(short, long, value_name = "DIR")]
        layouts: PathBuf,

        /// Directory of ground-truth outlines (<stem>.json or <stem>.csv)
        #[arg(short, long, value_name = "DIR")]
        truth: PathBuf,

        /// Output CSV file
        #[arg(short, long, value_name = "FILE", default_value = "datasets/train.csv")]
        output: PathBuf,
    },

    /// Train a heading model from a training CSV
    Train {
        /// Training CSV
        #[arg(short, long, value_name = "FILE", default_value = "datasets/train.csv")]
        data: PathBuf,

        /// Where to save the model
        #[arg(short, long, value_name = "FILE", default_value = "models/headings.json")]
        model: PathBuf,

        #[command(flatten)]
        training: TrainingArgs,
    },

    /// Extract outlines for every layout dump in a directory
    Extract {
        /// Directory of *.layout.json files
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output directory for <stem>.json outlines
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Saved model
        #[arg(short, long, value_name = "FILE", default_value = "models/headings.json")]
        model: PathBuf,

        /// Training CSV used when the model has to be trained
        #[arg(short, long, value_name = "FILE", default_value = "datasets/train.csv")]
        data: PathBuf,

        /// Retrain even if a saved model exists
        #[arg(long, conflicts_with = "no_train")]
        retrain: bool,

        /// Never train; fail if the model is missing
        #[arg(long)]
        no_train: bool,

        /// Label whose first occurrence becomes the title
        #[arg(long, default_value = "H1", env = "HEADMARK_TITLE_LABEL")]
        title_label: String,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        #[command(flatten)]
        training: TrainingArgs,
    },

    /// Extract the outline of a single layout dump
    Outline {
        /// Layout dump (*.layout.json)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Saved model
        #[arg(short, long, value_name = "FILE", default_value = "models/headings.json")]
        model: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutlineFormat,

        /// Label whose first occurrence becomes the title
        #[arg(long, default_value = "H1", env = "HEADMARK_TITLE_LABEL")]
        title_label: String,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Show information about a saved model
    Inspect {
        /// Saved model
        #[arg(value_name = "FILE", default_value = "models/headings.json")]
        model: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

#[derive(clap::Args)]
struct TrainingArgs {
    /// Classifier to train
    #[arg(long, value_enum, default_value = "forest")]
    mode: ModeArg,

    /// Number of trees (forest)
    #[arg(long, default_value = "100")]
    trees: usize,

    /// Maximum tree depth (forest)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Training passes (sequence)
    #[arg(long, default_value = "100")]
    max_iterations: usize,

    /// Random seed
    #[arg(long, default_value = "42")]
    seed: u64,
}

impl TrainingArgs {
    fn options(&self) -> TrainOptions {
        let mut forest = ForestOptions::new()
            .with_trees(self.trees)
            .with_seed(self.seed);
        if let Some(depth) = self.max_depth {
            forest = forest.with_max_depth(depth);
        }
        let sequence = SequenceOptions::new()
            .with_max_iterations(self.max_iterations)
            .with_seed(self.seed);

        TrainOptions::new()
            .with_mode(self.mode.into())
            .with_forest(forest)
            .with_sequence(sequence)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    /// Random forest, one line at a time
    Forest,
    /// Sequence labeler over each page
    Sequence,
}

impl From<ModeArg> for ClassifierMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Forest => ClassifierMode::Independent,
            ModeArg::Sequence => ClassifierMode::Sequence,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutlineFormat {
    /// `{title, outline}` JSON
    Json,
    /// Indented plain text
    Text,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Dataset {
            layouts,
            truth,
            output,
        } => cmd_dataset(&layouts, &truth, &output),
        Commands::Train {
            data,
            model,
            training,
        } => cmd_train(&data, &model, &training),
        Commands::Extract {
            input,
            output,
            model,
            data,
            retrain,
            no_train,
            title_label,
            compact,
            training,
        } => {
            let policy = if retrain {
                RetrainPolicy::Always
            } else if no_train {
                RetrainPolicy::Never
            } else {
                RetrainPolicy::IfMissing
            };
            let options = PipelineOptions::new()
                .with_retrain(policy)
                .with_train_options(training.options())
                .with_assemble_options(AssembleOptions::new().with_title_label(title_label))
                .with_json_format(json_format(compact));
            cmd_extract(&input, &output, &model, &data, &options)
        }
        Commands::Outline {
            input,
            model,
            output,
            format,
            title_label,
            compact,
        } => cmd_outline(
            &input,
            &model,
            output.as_deref(),
            format,
            &title_label,
            compact,
        ),
        Commands::Inspect { model, json } => cmd_inspect(&model, json),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn json_format(compact: bool) -> JsonFormat {
    if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    }
}

fn print_skipped(report: &BatchReport) {
    if report.skipped.is_empty() {
        return;
    }
    println!("\n{}", "Skipped:".yellow().bold());
    for (i, skipped) in report.skipped.iter().enumerate() {
        let branch = if i + 1 == report.skipped.len() {
            "└─"
        } else {
            "├─"
        };
        println!(
            "  {} {} ({})",
            branch.dimmed(),
            skipped.document,
            skipped.reason.dimmed()
        );
    }
}

fn cmd_dataset(
    layouts: &Path,
    truth: &Path,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let (set, report) = build_training_set(layouts, truth)?;
    set.save(output)?;

    println!(
        "{} {} rows from {} documents",
        "Labeled".green().bold(),
        set.len(),
        report.processed.len()
    );
    for (label, count) in set.label_counts() {
        println!("  {}: {}", label.bold(), count);
    }
    print_skipped(&report);
    println!("{} {}", "Saved to".green(), output.display());

    Ok(())
}

fn cmd_train(
    data: &Path,
    model_path: &Path,
    training: &TrainingArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb.set_message(format!("Training {} model...", ClassifierMode::from(training.mode)));

    let model = train_from_csv(data, &training.options())?;
    model.save(model_path)?;
    pb.finish_with_message("Done!");

    // Report on the training data itself, as a sanity check
    let set = TrainingSet::load(data)?;
    let evaluation = model.evaluate(&set.examples())?;
    println!("\n{}", "Training Report".cyan().bold());
    println!("{}", "─".repeat(48).dimmed());
    println!("{}", evaluation);
    println!();
    println!("{} {}", "Saved to".green(), model_path.display());

    Ok(())
}

fn cmd_extract(
    input: &Path,
    output: &Path,
    model_path: &Path,
    data: &Path,
    options: &PipelineOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let model = obtain_model(model_path, data, options)?;

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {msg}")?
            .progress_chars("#>-"),
    );

    let result = extract_directory_with(input, output, &model, options, |position, total, stem| {
        pb.set_length(total as u64);
        pb.set_position(position as u64);
        pb.set_message(stem.to_string());
    });
    let report = match result {
        Ok(report) => report,
        Err(e) => {
            pb.abandon();
            return Err(e.into());
        }
    };
    pb.set_position(report.total() as u64);
    pb.finish_with_message("Done!");

    println!(
        "\n{} {} outlines written to {}",
        "Done!".green().bold(),
        report.processed.len(),
        output.display()
    );
    print_skipped(&report);

    Ok(())
}

fn cmd_outline(
    input: &Path,
    model_path: &Path,
    output: Option<&Path>,
    format: OutlineFormat,
    title_label: &str,
    compact: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let model = HeadingModel::load(model_path)?;
    let options = AssembleOptions::new().with_title_label(title_label);
    let outline = outline_file(input, &model, &options)?;

    let rendered = match format {
        OutlineFormat::Json => headmark::render::to_json(&outline, json_format(compact))?,
        OutlineFormat::Text => headmark::render::to_text(&outline),
    };

    if let Some(path) = output {
        fs::write(path, &rendered)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", rendered);
    }

    Ok(())
}

fn cmd_inspect(model_path: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let model = HeadingModel::load(model_path)?;
    let labels: Vec<&str> = model.labels().labels().iter().map(|l| l.as_str()).collect();

    if json {
        let info = serde_json::json!({
            "mode": model.mode(),
            "labels": labels,
            "schema": model.schema(),
            "examples": model.example_count(),
            "trained_at": model.trained_at(),
        });
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("{}", "Model Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), model_path.display());
    println!("{}: {}", "Mode".bold(), model.mode());
    println!("{}: {}", "Trained".bold(), model.trained_at().to_rfc3339());
    println!("{}: {}", "Examples".bold(), model.example_count());
    println!("{}: {}", "Labels".bold(), labels.join(", "));

    println!();
    println!("{}", "Feature Schema".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: v{}", "Version".bold(), model.schema().version);
    println!("{}: {}", "Features".bold(), model.schema().len());

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "headmark".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("PDF heading outline extraction tool");
    println!();
    println!("Library: headmark {}", headmark::version());
    println!("Repository: {}", "https://github.com/iyulab/headmark".dimmed());
    println!("License: MIT");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_extract() {
        let cli = Cli::try_parse_from([
            "headmark",
            "extract",
            "input",
            "output",
            "--no-train",
            "--mode",
            "sequence",
        ])
        .unwrap();

        match cli.command {
            Commands::Extract {
                no_train,
                retrain,
                training,
                ..
            } => {
                assert!(no_train);
                assert!(!retrain);
                assert_eq!(training.options().mode, ClassifierMode::Sequence);
            }
            _ => panic!("expected extract"),
        }
    }

    #[test]
    fn test_retrain_conflicts_with_no_train() {
        let result = Cli::try_parse_from([
            "headmark",
            "extract",
            "input",
            "output",
            "--retrain",
            "--no-train",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_training_args() {
        let cli = Cli::try_parse_from(["headmark", "train", "--trees", "10", "--seed", "7"]).unwrap();
        match cli.command {
            Commands::Train { training, .. } => {
                let options = training.options();
                assert_eq!(options.forest.n_trees, 10);
                assert_eq!(options.forest.seed, 7);
                assert_eq!(options.sequence.seed, 7);
            }
            _ => panic!("expected train"),
        }
    }
}
