use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use papernote::{
    config::Config,
    logging,
    processing::{Document, Pipeline, is_sentinel},
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "papernote",
    about = "Summarize and critique extracted paper text"
)]
struct Cli {
    /// What to produce.
    #[arg(value_enum)]
    task: Task,
    /// Extracted text of the paper (UTF-8).
    input: PathBuf,
    /// Write results here instead of stdout. With `both`, `.summary.txt` and `.critique.txt`
    /// suffixes are appended.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Print pipeline counters as JSON to stderr when done.
    #[arg(long)]
    metrics: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Task {
    Summarize,
    Critique,
    Both,
}

#[tokio::main]
async fn main() {
    logging::init_tracing();
    match run().await {
        Ok(true) => std::process::exit(2),
        Ok(false) => {}
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}

/// Returns whether any produced artifact was a failure sentinel.
async fn run() -> Result<bool> {
    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;
    let text = tokio::fs::read_to_string(&cli.input)
        .await
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let document = Document::new(text);
    let pipeline = Pipeline::from_config(config);

    let outputs: Vec<(&str, String)> = match cli.task {
        Task::Summarize => vec![("summary", pipeline.summarize(&document).await)],
        Task::Critique => vec![("critique", pipeline.critique(&document).await)],
        Task::Both => {
            let (summary, critique) = pipeline.run_both(&document).await;
            vec![("summary", summary), ("critique", critique)]
        }
    };

    let mut failed = false;
    for (label, output) in &outputs {
        if is_sentinel(output) {
            tracing::warn!(artifact = label, output = %output, "Pipeline returned a sentinel");
            failed = true;
        }
        match &cli.output {
            Some(path) => {
                let target = output_path(path, label, outputs.len() > 1);
                tokio::fs::write(&target, output)
                    .await
                    .with_context(|| format!("failed to write {}", target.display()))?;
                tracing::info!(artifact = label, path = %target.display(), "Wrote artifact");
            }
            None if outputs.len() > 1 => println!("<!-- {label} -->\n{output}\n"),
            None => println!("{output}"),
        }
    }

    if cli.metrics {
        let snapshot = serde_json::to_string(&pipeline.metrics_snapshot())?;
        eprintln!("{snapshot}");
    }
    Ok(failed)
}

fn output_path(base: &Path, label: &str, several: bool) -> PathBuf {
    if !several {
        return base.to_path_buf();
    }
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{label}.txt"));
    PathBuf::from(name)
}
