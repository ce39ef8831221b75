//! imgedit CLI - generate and edit images through the backend

mod repl;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use imgedit_core::api::{ApiClient, GenerationResponse, ImageFile, ImageId};
use imgedit_core::chat::compose_prompt;
use imgedit_core::config::Config;
use imgedit_core::preprocess::prepare_upload;
use serde::Serialize;
use tracing::debug;

#[derive(Parser)]
#[command(name = "imgedit")]
#[command(author, version, about = "Generate and edit images with an AI backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload an image and print its URL and identifier
    Upload {
        /// Image file
        path: PathBuf,
        /// Resize and re-encode to the configured constraints first
        #[arg(short, long)]
        prepare: bool,
    },

    /// Generate from a description, optionally editing an uploaded image
    Generate {
        /// What to generate or change
        text: String,
        /// Identifier returned by `imgedit upload`
        #[arg(short, long, value_parser = parse_image_id)]
        image_id: Option<ImageId>,
        /// Treat the image as the context of an ongoing edit
        #[arg(short, long)]
        continuous: bool,
        /// Do not prepend the configured prompt prefix
        #[arg(long)]
        no_prefix: bool,
        /// Save the resulting image under this name
        #[arg(short, long)]
        save: Option<String>,
    },

    /// Generate from a text prompt only
    Text {
        prompt: String,
        #[arg(long)]
        no_prefix: bool,
        #[arg(short, long)]
        save: Option<String>,
    },

    /// Send an image together with a prompt
    Edit {
        /// Image file
        path: PathBuf,
        prompt: String,
        #[arg(short, long)]
        prepare: bool,
        #[arg(long)]
        no_prefix: bool,
        #[arg(short, long)]
        save: Option<String>,
    },

    /// Print the full URL for a backend image path
    Url { path: String },

    /// Download an image into the download directory
    Download {
        /// Image URL or backend path
        url: String,
        /// File name (defaults to generated-image.png)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Interactive editing session
    Chat {
        /// Start with this image attached
        #[arg(short, long)]
        image: Option<PathBuf>,
        /// Keep editing the latest result
        #[arg(short, long)]
        continuous: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// List all configuration values
    List,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Values in .env behave like exported variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_level = if cli.quiet { "imgedit=warn" } else { "imgedit=info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.parse()?),
        )
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        if let Some(hint) = e
            .downcast_ref::<imgedit_core::Error>()
            .and_then(|e| e.suggestion())
        {
            eprintln!("  Hint: {}", hint);
        }
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?.install();
    debug!(api = %config.api_base_url, images = %config.image_base_url, "Configuration loaded");

    let output = Output {
        format: cli.format,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Config { action } => cmd_config(config, action),

        Commands::Url { path } => {
            let client = ApiClient::from_config(config)?;
            println!("{}", client.full_image_url(&path));
            Ok(())
        }

        Commands::Upload { path, prepare } => {
            let client = ApiClient::from_config(config)?;
            cmd_upload(&client, config, &path, prepare, output).await
        }

        Commands::Generate {
            text,
            image_id,
            continuous,
            no_prefix,
            save,
        } => {
            let client = ApiClient::from_config(config)?;
            let prompt = prompt_for(config, &text, no_prefix);
            let response = client
                .generate_image(&prompt, image_id, continuous)
                .await?
                .into_result()?;
            report_generation(&client, response, save.as_deref(), output).await
        }

        Commands::Text {
            prompt,
            no_prefix,
            save,
        } => {
            let client = ApiClient::from_config(config)?;
            let prompt = prompt_for(config, &prompt, no_prefix);
            let response = client
                .generate_from_text(&prompt)
                .await?
                .into_data()
                .into_result()?;
            report_generation(&client, response, save.as_deref(), output).await
        }

        Commands::Edit {
            path,
            prompt,
            prepare,
            no_prefix,
            save,
        } => {
            let client = ApiClient::from_config(config)?;
            let file = load_image(config, &path, prepare).await?;
            let prompt = prompt_for(config, &prompt, no_prefix);
            let response = client
                .generate_from_image(file, &prompt)
                .await?
                .into_data()
                .into_result()?;
            report_generation(&client, response, save.as_deref(), output).await
        }

        Commands::Download { url, output: name } => {
            let client = ApiClient::from_config(config)?;
            let path = client.try_download_image(&url, name.as_deref()).await?;
            if !output.quiet {
                println!("Saved {}", path.display());
            }
            Ok(())
        }

        Commands::Chat { image, continuous } => {
            let client = ApiClient::from_config(config)?;
            repl::run(client, config, image, continuous).await
        }
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

#[derive(Clone, Copy)]
struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    fn json<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

// Numeric identifiers stay numbers on the wire
fn parse_image_id(s: &str) -> Result<ImageId, std::convert::Infallible> {
    s.parse()
}

fn prompt_for(config: &Config, text: &str, no_prefix: bool) -> String {
    if no_prefix {
        text.trim().to_string()
    } else {
        compose_prompt(&config.default_prompt_prefix, text)
    }
}

async fn load_image(config: &Config, path: &Path, prepare: bool) -> anyhow::Result<ImageFile> {
    let file = ImageFile::from_path(path).await?;
    if prepare {
        Ok(prepare_upload(&file, &config.image)?)
    } else {
        Ok(file)
    }
}

async fn cmd_upload(
    client: &ApiClient,
    config: &Config,
    path: &Path,
    prepare: bool,
    output: Output,
) -> anyhow::Result<()> {
    let file = load_image(config, path, prepare).await?;
    let response = client.upload_image(file).await?.into_result()?;

    if output.format == OutputFormat::Json {
        return output.json(&response);
    }

    let url = client.full_image_url(response.image_url().unwrap_or_default());
    if output.quiet {
        println!("{}", response.image_id().map(ToString::to_string).unwrap_or_default());
    } else {
        println!("Uploaded {}", path.display());
        if let Some(id) = response.image_id() {
            println!("  Image ID: {}", id);
        }
        if !url.is_empty() {
            println!("  URL: {}", url);
        }
    }
    Ok(())
}

async fn report_generation(
    client: &ApiClient,
    response: GenerationResponse,
    save: Option<&str>,
    output: Output,
) -> anyhow::Result<()> {
    let url = client.full_image_url(response.image_url().unwrap_or_default());

    let saved = match (save, url.is_empty()) {
        (Some(name), false) => Some(client.try_download_image(&url, Some(name)).await?),
        _ => None,
    };

    if output.format == OutputFormat::Json {
        #[derive(Serialize)]
        struct Report<'a> {
            #[serde(flatten)]
            response: &'a GenerationResponse,
            full_image_url: &'a str,
            saved_to: Option<String>,
        }
        return output.json(&Report {
            response: &response,
            full_image_url: &url,
            saved_to: saved.map(|p| p.display().to_string()),
        });
    }

    if output.quiet {
        println!("{}", url);
        return Ok(());
    }

    if let Some(text) = response.result().filter(|t| !t.trim().is_empty()) {
        println!("{}", text.trim());
    }
    if !url.is_empty() {
        println!("Image: {}", url);
    }
    if let Some(path) = saved {
        println!("Saved {}", path.display());
    }
    Ok(())
}

fn cmd_config(config: &Config, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::List => {
            let items = config.list()?;
            for (key, value) in items {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}
