use bazelgen_core::{BazelGenError, Transport};
use bazelgen_editor::{BuildFileEditor, Buildozer};
use bazelgen_generator::{generate, GenerateOptions, TemplateSet};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use tracing_appender::rolling;
use tracing_subscriber::Layer;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};


#[derive(Parser)]
#[command(name = "bazelgen", version, about = "BUILD.bazel generator for multi-language API proto trees")]
struct Cli {
    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate BUILD.bazel files for every API directory under --src
    Generate {
        /// Root of the API proto source tree (for example a googleapis checkout)
        #[arg(long)]
        src: PathBuf,

        /// Destination root for generated files, defaults to the value of --src
        #[arg(long)]
        dest: Option<PathBuf>,

        /// Rewrite all BUILD.bazel files from scratch instead of preserving
        /// manually changed values found in existing ones
        #[arg(long)]
        overwrite: bool,

        /// Transport to generate client libraries for; when given explicitly it
        /// also overrides a transport preserved from hand edits
        #[arg(long)]
        transport: Option<Transport>,

        /// Value written to rest_numeric_enums attributes on fresh generation
        /// (defaults to True)
        #[arg(long)]
        rest_numeric_enums: Option<String>,

        /// Path to the buildozer binary, required unless --overwrite is given
        #[arg(long)]
        buildozer: Option<PathBuf>,

        /// Replace the bundled template for versioned GAPIC directories
        #[arg(long)]
        gapic_template: Option<PathBuf>,

        /// Replace the bundled template for API root directories
        #[arg(long)]
        root_template: Option<PathBuf>,

        /// Replace the bundled template for proto-only directories
        #[arg(long)]
        raw_template: Option<PathBuf>,

        /// Summary output format
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,

        /// Stray tokens are ignored with a warning instead of aborting the run
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
        extra: Vec<String>,
    },
}

trait Runnable {
    fn run(self, use_color: bool) -> Result<()>;
}

impl Runnable for Commands {
    fn run(self, use_color: bool) -> Result<()> {
        let cmd_name = format!("{:?}", self);
        info!("▶ Starting command: {}", cmd_name);

        let result = match self {
            Commands::Generate {
                src,
                dest,
                overwrite,
                transport,
                rest_numeric_enums,
                buildozer,
                gapic_template,
                root_template,
                raw_template,
                format,
                extra,
            } => {
                debug!(
                    "Generate args: src={:?} dest={:?} overwrite={} transport={:?} rest_numeric_enums={:?} buildozer={:?} format={}",
                    src, dest, overwrite, transport, rest_numeric_enums, buildozer, format
                );

                for arg in &extra {
                    println!("WARNING: Ignoring unrecognized argument: {arg}");
                }

                let config = bazelgen_config::load_config()?;

                let transport_forced = transport.is_some();
                let transport = transport.or(config.transport).unwrap_or_default();
                let rest_numeric_enums = rest_numeric_enums
                    .or(config.rest_numeric_enums)
                    .unwrap_or_else(|| "True".to_string());
                let overwrite = overwrite
                    || config
                        .generate
                        .as_ref()
                        .and_then(|g| g.overwrite)
                        .unwrap_or(false);
                let buildozer = buildozer.or_else(|| config.buildozer.map(PathBuf::from));

                let src = rebase_on_workspace(src);
                let dest = rebase_on_workspace(
                    dest.or_else(|| {
                        config
                            .generate
                            .as_ref()
                            .and_then(|g| g.dest.clone())
                            .map(PathBuf::from)
                    })
                    .unwrap_or_else(|| src.clone()),
                );

                let mut templates = TemplateSet::default();
                let overrides = config.templates.unwrap_or_default();
                if let Some(path) = gapic_template.or_else(|| overrides.gapic.map(PathBuf::from)) {
                    templates.gapic = read_template(&path)?;
                }
                if let Some(path) = root_template.or_else(|| overrides.root.map(PathBuf::from)) {
                    templates.root = read_template(&path)?;
                }
                if let Some(path) = raw_template.or_else(|| overrides.raw.map(PathBuf::from)) {
                    templates.raw = read_template(&path)?;
                }

                if buildozer.is_none() && !overwrite {
                    eprintln!("This tool requires Buildozer tool to parse BUILD.bazel files.");
                    eprintln!("Please use --buildozer=/path/to/buildozer to point to Buildozer,");
                    eprintln!("or use --overwrite if you want to rewrite all BUILD.bazel files.");
                    return Err(BazelGenError::EditorRequired.into());
                }

                let opts = GenerateOptions {
                    src,
                    dest,
                    overwrite,
                    transport,
                    transport_forced,
                    rest_numeric_enums,
                    templates,
                };

                let mut dozer = buildozer.map(Buildozer::new);
                let summary = generate(
                    &opts,
                    dozer.as_mut().map(|d| d as &mut dyn BuildFileEditor),
                )?;

                match format.as_str() {
                    "json" => {
                        serde_json::to_writer(std::io::stdout().lock(), &summary)?;
                        println!();
                    }
                    "text" => {
                        if use_color {
                            use owo_colors::OwoColorize;
                            println!(
                                "✔ {} BUILD.bazel file(s) written, {} skipped, {} failed",
                                summary.written.green(),
                                summary.skipped.yellow(),
                                summary.failed.red()
                            );
                        } else {
                            println!(
                                "✔ {} BUILD.bazel file(s) written, {} skipped, {} failed",
                                summary.written, summary.skipped, summary.failed
                            );
                        }
                    }
                    _ => unreachable!(),
                }
                Ok(())
            }
        };

        match &result {
            Ok(_) => info!("✔ Finished command: {}", cmd_name),
            Err(e) => error!("✖ Command {} failed: {:?}", cmd_name, e),
        }

        result
    }
}

/// Under `bazel run` the process starts inside the runfiles tree; relative
/// paths are resolved against the workspace root Bazel reports instead.
fn rebase_on_workspace(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match std::env::var_os("BUILD_WORKSPACE_DIRECTORY") {
        Some(workspace) => PathBuf::from(workspace).join(path),
        None => path,
    }
}

fn read_template(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read template {}", path.display()))
}

fn init_tracing() {
    let file_appender = rolling::daily("logs", "bazelgen.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stdout)
        .with_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        );

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(file_writer)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}

fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();

    let use_color = !cli.no_color
        && std::io::stdout().is_terminal()
        && std::env::var_os("NO_COLOR").is_none();

    cli.cmd.run(use_color)
}
