use archive_to_source::transform::CommandTransformer;
use archive_to_source::{
    default_threads, Options, Pipeline, RuleGroup, RuleSet, DEFAULT_SOURCE_EXTENSION,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_NAME: &str = "archive-to-source.log";

#[derive(Debug, Clone, Parser)]
#[command(version, about)]
struct Args {
    /// Root archive to read
    archive: PathBuf,
    /// Directory that receives extracted files, sources and the manifest
    destination: PathBuf,
    /// Pattern for plain file paths to extract. Repeatable.
    #[clap(long, value_name = "REGEX")]
    extract_include: Vec<String>,
    /// Pattern for plain file paths never to extract. Repeatable.
    #[clap(long, value_name = "REGEX")]
    extract_exclude: Vec<String>,
    /// Pattern for class names (`a.b.C`) to transform. Repeatable.
    #[clap(long, value_name = "REGEX")]
    transform_include: Vec<String>,
    /// Pattern for class names never to transform. Repeatable.
    #[clap(long, value_name = "REGEX")]
    transform_exclude: Vec<String>,
    /// Number of transformer workers
    #[clap(short, long, default_value_t = default_threads())]
    threads: NonZeroUsize,
    /// Recursion depth.
    /// How many levels of nested archives to open. Unlimited by default.
    #[clap(short, long)]
    depth: Option<NonZeroUsize>,
    /// Extension of the generated source files
    #[clap(long, default_value = DEFAULT_SOURCE_EXTENSION)]
    extension: String,
    /// Program invoked once per class as `<transformer> [args..] <file.class>`
    #[clap(long, default_value = "cfr")]
    transformer: String,
    /// Extra argument for the transformer program. Repeatable.
    #[clap(long = "transformer-arg", value_name = "ARG", allow_hyphen_values = true)]
    transformer_args: Vec<String>,
    /// Do not write a log file into the destination
    #[clap(long)]
    no_log_file: bool,
}

fn setup_tracing(args: &Args) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env()?;

    let (file_layer, guard) = if args.no_log_file {
        (None, None)
    } else {
        std::fs::create_dir_all(&args.destination)?;
        let appender = tracing_appender::rolling::never(&args.destination, LOG_FILE_NAME);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_ansi(false).with_writer(writer);
        (Some(layer), Some(guard))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .compact()
                .with_file(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .with(env_filter)
        .init();
    Ok(guard)
}

fn progress_bar() -> anyhow::Result<ProgressBar> {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}% {wide_msg}")?
            .progress_chars("#>-"),
    );
    Ok(bar)
}

fn rules(args: &Args) -> anyhow::Result<RuleSet> {
    Ok(RuleSet::new(
        RuleGroup::new(&args.extract_include, &args.extract_exclude)?,
        RuleGroup::new(&args.transform_include, &args.transform_exclude)?,
    ))
}

fn run(args: Args, bar: &ProgressBar) -> anyhow::Result<()> {
    let options = Options {
        threads: args.threads,
        max_depth: args.depth,
        source_extension: args.extension.clone(),
        ..Default::default()
    };
    let mut pipeline = Pipeline::new(rules(&args)?, options);
    let listener = bar.clone();
    pipeline.on_progress(move |percent, message| {
        listener.set_position(percent as u64);
        listener.set_message(message.to_string());
    });

    let transformer =
        CommandTransformer::new(&args.transformer).with_args(&args.transformer_args);
    let summary = pipeline.run(
        Path::new(&args.archive),
        Path::new(&args.destination),
        &transformer,
    )?;
    info!(
        manifest = %summary.manifest_path.display(),
        "Extracted {} files, transformed {} classes",
        summary.walk.extracted,
        summary.dispatch.transformed
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _guard = setup_tracing(&args)?;

    let bar = progress_bar()?;
    let result = run(args, &bar);
    bar.finish_and_clear();
    result
}
