//! Aria CLI - generate, render, and play short AI-composed pieces.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use aria::artifact::ArtifactStore;
use aria::compose::ComposerClient;
use aria::composition::MusicComposition;
use aria::config::GeneratorConfig;
use aria::cover::CoverClient;
use aria::playback;
use aria::render::{RenderConfig, Renderer};
use aria::workflow::Generator;
use aria::Result;

#[derive(Parser)]
#[command(name = "aria")]
#[command(about = "Generate short musical pieces and cover art from a style description", long_about = None)]
struct Cli {
    /// Verbose logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: compose, fetch a cover, render to WAV
    Generate {
        /// Free-text style description, e.g. "upbeat electronic"
        style: String,

        /// Directory the artifacts are written to
        #[arg(short, long, default_value = "out")]
        out: PathBuf,

        /// Play the rendered audio when done
        #[arg(long)]
        play: bool,

        /// Skip the cover request
        #[arg(long)]
        no_cover: bool,

        /// Render this composition JSON file instead of calling the
        /// text endpoint
        #[arg(long)]
        seed: Option<PathBuf>,
    },

    /// Request a composition and write it as JSON
    Compose {
        style: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Request a cover image only
    Cover {
        style: String,

        /// Output file (derived from the style if omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Render a stored composition JSON file to WAV
    Render {
        composition: PathBuf,

        /// Output WAV path
        #[arg(short, long, default_value = "out.wav")]
        out: PathBuf,

        /// Play the rendered audio when done
        #[arg(long)]
        play: bool,
    },

    /// Play a WAV file through the default output device
    Play { file: PathBuf },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("aria=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("aria=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Generate {
            style,
            out,
            play,
            no_cover,
            seed,
        } => {
            let mut config = GeneratorConfig::from_env();
            config.fetch_cover = !no_cover;
            let generator = Generator::new(config)?;

            let generation = match seed {
                Some(path) => {
                    let json = fs::read_to_string(path)?;
                    let composition: MusicComposition = serde_json::from_str(&json)
                        .map_err(|e| aria::Error::MalformedResponse(e.to_string()))?;
                    generator.generate_from(&style, composition).await?
                }
                None => generator.generate(&style).await?,
            };

            let mut store = ArtifactStore::new(&out)?;
            let artifacts = store.store(
                &generation.style,
                &generation.audio,
                generation.cover.as_ref(),
                &generation.composition,
            )?;

            let stats = generation.audio.stats;
            println!("Generated \"{}\"", generation.style);
            println!(
                "  {} bpm, {:.0}s, {} tracks, {} events ({} skipped)",
                generation.composition.bpm,
                generation.composition.duration,
                generation.composition.tracks.len(),
                stats.scheduled_events,
                stats.skipped_events,
            );
            println!("  peak {:.3}, rms {:.3}", stats.peak, stats.rms);
            println!("  audio:       {}", artifacts.audio.display());
            match &artifacts.cover {
                Some(path) => println!("  cover:       {}", path.display()),
                None => println!("  cover:       (none)"),
            }
            println!("  composition: {}", artifacts.composition.display());

            // hand the files over to the user; the store must not reclaim
            // them on exit
            store.persist();

            if play {
                playback::play_buffer(&generation.audio.samples, generation.audio.sample_rate)?;
            }
            Ok(())
        }

        Commands::Compose { style, out } => {
            let config = GeneratorConfig::from_env();
            let client = ComposerClient::new(&config)?;
            let composition = client.request(&style).await?;
            let json = serde_json::to_string_pretty(&composition)
                .map_err(|e| aria::Error::MalformedResponse(e.to_string()))?;
            match out {
                Some(path) => {
                    fs::write(&path, json)?;
                    println!("Wrote composition to {}", path.display());
                }
                None => println!("{json}"),
            }
            Ok(())
        }

        Commands::Cover { style, out } => {
            let config = GeneratorConfig::from_env();
            let client = CoverClient::new(&config)?;
            let image = client.request(&style).await?;
            let path = out.unwrap_or_else(|| {
                PathBuf::from(format!(
                    "{}_cover.{}",
                    aria::artifact::artifact_basename(&style),
                    image.extension()
                ))
            });
            fs::write(&path, &image.bytes)?;
            println!(
                "Wrote {} byte {} cover to {}",
                image.bytes.len(),
                image.content_type,
                path.display()
            );
            Ok(())
        }

        Commands::Render {
            composition,
            out,
            play,
        } => {
            let json = fs::read_to_string(&composition)?;
            let mut parsed: MusicComposition = serde_json::from_str(&json)
                .map_err(|e| aria::Error::MalformedResponse(e.to_string()))?;
            parsed.normalize();

            let audio = Renderer::new(RenderConfig::default()).render(&parsed)?;
            fs::write(&out, &audio.bytes)?;

            println!(
                "Rendered {:.1}s ({} events, peak {:.3}) to {}",
                audio.duration,
                audio.stats.scheduled_events,
                audio.stats.peak,
                out.display()
            );

            if play {
                playback::play_buffer(&audio.samples, audio.sample_rate)?;
            }
            Ok(())
        }

        Commands::Play { file } => playback::play_wav(&file),
    }
}
