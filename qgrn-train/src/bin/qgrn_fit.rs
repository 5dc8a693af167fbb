//! CLI for fitting a QuantumGRN to observed expression data.
//!
//! Usage: qgrn-fit train --problem problem.json [--theta-out theta.csv --sample 10]
//!        qgrn-fit config > config.json

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use qgrn_train::{
    LossMethod, NoProgress, Progress, ProblemFile, ProgressBarReporter, TrainingConfig,
    DEFAULT_SAMPLE,
};

#[derive(Parser, Debug)]
#[command(name = "qgrn-fit", about = "Fit QuantumGRN circuits to expression distributions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train the parameters described by a problem file.
    Train(TrainArgs),
    /// Print the default training configuration as JSON.
    Config,
}

#[derive(Parser, Debug)]
struct TrainArgs {
    /// Problem file (genes, edges, observed distribution, config).
    #[arg(long)]
    problem: PathBuf,

    /// Override the iteration budget.
    #[arg(long)]
    epochs: Option<usize>,

    /// Override the learning rate.
    #[arg(long)]
    learning_rate: Option<f64>,

    /// Override the loss method (kl-divergence or difference).
    #[arg(long)]
    method: Option<LossMethod>,

    /// Export the theta trajectory to this CSV file (enables capture).
    #[arg(long)]
    theta_out: Option<PathBuf>,

    /// Export every N-th epoch.
    #[arg(long, default_value_t = DEFAULT_SAMPLE)]
    sample: usize,

    /// Write the final parameters as JSON.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Disable the progress bar.
    #[arg(long)]
    quiet: bool,
}

fn train(args: TrainArgs) -> Result<()> {
    let mut problem = ProblemFile::from_json_file(&args.problem)
        .with_context(|| format!("reading problem file {}", args.problem.display()))?;

    let config = &mut problem.config;
    if let Some(epochs) = args.epochs {
        config.epochs = epochs;
    }
    if let Some(learning_rate) = args.learning_rate {
        config.learning_rate = learning_rate;
    }
    if let Some(method) = args.method {
        config.method = method;
    }
    if args.theta_out.is_some() {
        config.save_theta = true;
    }

    let mut model = problem.into_model()?;
    println!("{model}");

    let mut progress: Box<dyn Progress> = if args.quiet {
        Box::new(NoProgress)
    } else {
        Box::new(ProgressBarReporter::new(model.config().epochs))
    };
    let report = model.train_with_progress(progress.as_mut())?;

    println!(
        "{}: {} epochs, loss {:.6e}, error {:.6e}",
        report.state.message(),
        report.epochs_completed,
        report.final_loss,
        report.final_error
    );
    println!("{}", model.theta());

    if let Some(path) = &args.theta_out {
        let rows = model.export_training_theta(path, args.sample)?;
        println!("Wrote {rows} theta rows to {}", path.display());
    }
    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(model.theta())?;
        std::fs::write(path, json)
            .with_context(|| format!("writing parameters to {}", path.display()))?;
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Train(args) => train(args),
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&TrainingConfig::default())?);
            Ok(())
        }
    }
}
