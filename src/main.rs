use std::error::Error;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::{Parser, Subcommand};

use spectra_studio::agent::{BuilderAgent, VectorAgent};
use spectra_studio::bundler;
use spectra_studio::config::Config;
use spectra_studio::export::{self, Artifact};
use spectra_studio::services::{file_context, Attachment, ZIP_CONTEXT_MIME};
use spectra_studio::vfs::VirtualFile;

/// Parse and validate the JPG long-side target (512-20000 px)
fn parse_target_dim(s: &str) -> Result<u32, String> {
    let dim: u32 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid pixel size", s))?;
    if !(512..=20000).contains(&dim) {
        return Err(format!(
            "JPG target must be between 512 and 20000 pixels, got {}",
            dim
        ));
    }
    Ok(dim)
}

#[derive(Parser)]
#[command(
    name = "spectra-studio",
    version,
    about = "AI vector-art generation and app-scaffolding agents"
)]
struct Cli {
    /// Path to the config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full vector pipeline: generate, upscale, export SVG/EPS/JPG
    Vector {
        /// Subject to generate; empty falls back to the default concept
        #[arg(long, default_value = "")]
        prompt: String,

        /// Reference image to redraw as a vector
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Output directory for artifacts and metadata
        #[arg(long, default_value = "out")]
        out: PathBuf,

        /// Override the JPG long-side target from config
        #[arg(long, value_parser = parse_target_dim)]
        jpg_target: Option<u32>,
    },

    /// Run one build turn against the code generator
    Build {
        /// Instruction for the builder
        #[arg(long)]
        prompt: String,

        /// Seed the project from a ZIP archive before building
        #[arg(long)]
        import_zip: Option<PathBuf>,

        /// Attach a file (image, text, or ZIP project context)
        #[arg(long)]
        attach: Option<PathBuf>,

        /// Output directory for the updated project
        #[arg(long, default_value = "out")]
        out: PathBuf,

        /// Write the project as a single ZIP instead of individual files
        #[arg(long)]
        zip: bool,

        /// Also write the bundled preview document
        #[arg(long)]
        preview: bool,
    },

    /// Bundle a ZIP project into a single preview document, offline
    Bundle {
        /// Project archive to bundle
        #[arg(long)]
        archive: PathBuf,

        /// Output file; prints to stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // dotenv::dotenv() returns Err if .env doesn't exist, which is fine
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        log::error!("{e}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Vector {
            prompt,
            reference,
            out,
            jpg_target,
        } => run_vector(config, &prompt, reference, &out, jpg_target).await,
        Commands::Build {
            prompt,
            import_zip,
            attach,
            out,
            zip,
            preview,
        } => run_build(config, &prompt, import_zip, attach, &out, zip, preview).await,
        Commands::Bundle { archive, out } => run_bundle(&archive, out.as_deref()),
    }
}

async fn run_vector(
    mut config: Config,
    prompt: &str,
    reference: Option<PathBuf>,
    out: &Path,
    jpg_target: Option<u32>,
) -> Result<(), Box<dyn Error>> {
    if let Some(dim) = jpg_target {
        config.export.jpg_target_dim = dim;
    }

    let mut agent = VectorAgent::from_config(&config)?;
    let reference = reference.map(|path| attachment_from_path(&path)).transpose()?;

    let result = drive_vector(&mut agent, prompt, reference, out).await;

    for line in &agent.state().logs {
        println!("  {line}");
    }
    result
}

async fn drive_vector(
    agent: &mut VectorAgent,
    prompt: &str,
    reference: Option<Attachment>,
    out: &Path,
) -> Result<(), Box<dyn Error>> {
    agent.generate(prompt, reference).await?;

    let candidate_id = agent
        .state()
        .candidates
        .first()
        .map(|candidate| candidate.id.clone())
        .ok_or("no candidate to select")?;
    agent.select(&candidate_id).await?;

    std::fs::create_dir_all(out)?;
    for artifact in [
        agent.download_svg()?,
        agent.download_eps()?,
        agent.download_jpg()?,
    ] {
        write_artifact(out, &artifact)?;
    }

    if let Some(metadata) = &agent.state().metadata {
        let path = out.join("metadata.json");
        std::fs::write(&path, serde_json::to_string_pretty(metadata)?)?;
        log::info!("Wrote {}", path.display());
    }
    Ok(())
}

async fn run_build(
    config: Config,
    prompt: &str,
    import_zip: Option<PathBuf>,
    attach: Option<PathBuf>,
    out: &Path,
    as_zip: bool,
    preview: bool,
) -> Result<(), Box<dyn Error>> {
    let mut agent = BuilderAgent::from_config(&config)?;

    if let Some(path) = import_zip {
        let bytes = std::fs::read(&path)?;
        let name = file_name_of(&path);
        agent.import_zip(&name, &bytes)?;
        log::info!("Imported project from {}", path.display());
    }

    let attachment = attach.map(|path| attachment_from_path(&path)).transpose()?;
    let changed = agent.send(prompt, attachment).await?;

    if let Some(message) = agent.state().messages.last() {
        for step in &message.build_steps {
            println!("  {step}");
        }
        println!("{}", message.content);
    }
    if !changed.is_empty() {
        println!("Changed files: {}", changed.join(", "));
    }

    std::fs::create_dir_all(out)?;
    if as_zip {
        write_artifact(out, &agent.export_zip()?)?;
    } else {
        for file in agent.state().files.values() {
            write_virtual_file(out, file)?;
        }
    }

    if preview {
        match agent.preview() {
            Some(document) => {
                let path = out.join("preview.html");
                std::fs::write(&path, document)?;
                log::info!("Wrote {}", path.display());
            }
            None => log::warn!("Nothing renderable in the project; preview skipped"),
        }
    }
    Ok(())
}

fn run_bundle(archive: &Path, out: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let bytes = std::fs::read(archive)?;
    let files = export::unpack(&bytes)?;

    let document = bundler::assemble_preview(&files)
        .ok_or("archive contains no preview.html or index.html to bundle")?;

    match out {
        Some(path) => {
            std::fs::write(path, document)?;
            log::info!("Wrote {}", path.display());
        }
        None => println!("{document}"),
    }
    Ok(())
}

/// Build an attachment from a local file.
///
/// Images and PDFs attach as visual payloads. ZIP archives are unpacked and
/// serialized as project context text. Anything else attaches as plain text.
fn attachment_from_path(path: &Path) -> Result<Attachment, Box<dyn Error>> {
    let bytes = std::fs::read(path)?;
    let name = file_name_of(path);
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let attachment = match extension.as_str() {
        "png" => Attachment::new(name, "image/png", STANDARD.encode(&bytes)),
        "jpg" | "jpeg" => Attachment::new(name, "image/jpeg", STANDARD.encode(&bytes)),
        "webp" => Attachment::new(name, "image/webp", STANDARD.encode(&bytes)),
        "pdf" => Attachment::new(name, "application/pdf", STANDARD.encode(&bytes)),
        "zip" => {
            let files = export::unpack(&bytes)?;
            let context = file_context(&files);
            Attachment::new(name, ZIP_CONTEXT_MIME, STANDARD.encode(context))
        }
        _ => Attachment::new(name, "text/plain", STANDARD.encode(&bytes)),
    };
    Ok(attachment)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn write_artifact(dir: &Path, artifact: &Artifact) -> Result<(), Box<dyn Error>> {
    let path = dir.join(&artifact.file_name);
    std::fs::write(&path, &artifact.bytes)?;
    log::info!("Wrote {} ({})", path.display(), artifact.mime);
    Ok(())
}

fn write_virtual_file(dir: &Path, file: &VirtualFile) -> Result<(), Box<dyn Error>> {
    let path = dir.join(&file.name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if file.is_binary() {
        let payload = file
            .content
            .split_once(',')
            .map(|(_, payload)| payload)
            .ok_or_else(|| format!("malformed data URI in '{}'", file.name))?;
        std::fs::write(&path, STANDARD.decode(payload)?)?;
    } else {
        std::fs::write(&path, &file.content)?;
    }
    Ok(())
}
