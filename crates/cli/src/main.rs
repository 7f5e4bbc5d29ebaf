use anyhow::{Context, Result};
use arboard::Clipboard;
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tuus_imago_core::{
    config::Config,
    init,
    AiAdjustments, AiEffect, CropInstruction, ImageTransformations, NaturalCrop, PreviewRequest,
    TuusImago,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Override the CDN cloud name defined in .env
    #[arg(long, global = true)]
    cloud_name: Option<String>,

    /// Override the upload preset
    #[arg(long, global = true)]
    upload_preset: Option<String>,

    /// Override the signature endpoint URL
    #[arg(long, global = true)]
    signature_url: Option<String>,

    /// Override the destination folder
    #[arg(long, global = true)]
    folder: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open the editor window
    Edit {
        /// Photo to open on start
        file: Option<PathBuf>,
    },

    /// Upload a photo through the signed upload flow
    Upload {
        file: PathBuf,

        /// Natural-pixel crop as x,y,width,height
        #[arg(long)]
        crop: Option<NaturalCrop>,

        #[command(flatten)]
        transforms: TransformArgs,

        /// Copy the secure URL to clipboard
        #[arg(short, long, default_value_t = false)]
        copy: bool,
    },

    /// Compose a CDN transformation URL for an uploaded photo
    PreviewUrl {
        /// Secure URL returned by the upload
        url: String,

        /// Natural-pixel crop as x,y,width,height
        #[arg(long, conflicts_with = "auto_crop")]
        crop: Option<String>,

        /// Let the CDN choose the crop
        #[arg(long, default_value_t = false)]
        auto_crop: bool,

        #[command(flatten)]
        transforms: TransformArgs,

        /// AI effects to apply (repeatable)
        #[arg(long = "ai", value_enum)]
        ai: Vec<AiArg>,

        /// Named CDN transformation applied before the AI effects
        #[arg(long)]
        preset: Option<String>,

        /// Copy the URL to clipboard
        #[arg(short, long, default_value_t = false)]
        copy: bool,
    },

    /// Render the local preview of a photo to a file
    Render {
        file: PathBuf,

        /// Output image; the format follows the extension
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        transforms: TransformArgs,

        /// Also print the JPEG data URL
        #[arg(long, default_value_t = false)]
        data_url: bool,
    },
}

#[derive(Args, Debug, Default)]
struct TransformArgs {
    /// Rotation in degrees, normalized to [0, 360)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    rotate: i32,

    #[arg(long, default_value_t = false)]
    flip_horizontal: bool,

    #[arg(long, default_value_t = false)]
    flip_vertical: bool,

    /// -100 to 100
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    brightness: i32,

    /// -100 to 100
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    contrast: i32,

    /// 0 to 100
    #[arg(long, default_value_t = 0)]
    grayscale: i32,

    /// 0 to 10
    #[arg(long, default_value_t = 0.0)]
    blur: f32,
}

impl TransformArgs {
    fn to_transforms(&self) -> ImageTransformations {
        let mut t = ImageTransformations::default();
        t.rotate(self.rotate);
        if self.flip_horizontal {
            t.toggle_flip_horizontal();
        }
        if self.flip_vertical {
            t.toggle_flip_vertical();
        }
        t.set_brightness(self.brightness);
        t.set_contrast(self.contrast);
        t.set_grayscale(self.grayscale);
        t.set_blur(self.blur);
        t
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum AiArg {
    Enhance,
    RemoveBackground,
    Upscale,
    Restore,
}

impl From<AiArg> for AiEffect {
    fn from(arg: AiArg) -> Self {
        match arg {
            AiArg::Enhance => AiEffect::Enhance,
            AiArg::RemoveBackground => AiEffect::RemoveBackground,
            AiArg::Upscale => AiEffect::Upscale,
            AiArg::Restore => AiEffect::Restore,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup
    let _ = dotenvy::dotenv();
    init();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    // Load config and apply CLI overrides
    let config = load_config(&cli).context("Failed to load configuration")?;
    let app = TuusImago::with_config(config);

    match cli.command {
        Command::Edit { file } => {
            app.run_editor(file).context("Editor exited with an error")?;
        }
        Command::Upload {
            file,
            crop,
            transforms,
            copy,
        } => {
            let transforms = transforms.to_transforms();

            let bar = ProgressBar::new(100);
            bar.set_style(
                ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")?
                    .progress_chars("=> "),
            );
            bar.set_message(format!("Uploading {}", file.display()));

            let progress = bar.clone();
            let outcome = app
                .upload_file(&file, crop, &transforms, move |p| progress.set_position(u64::from(p)))
                .await;
            bar.finish_and_clear();

            let outcome = outcome.with_context(|| format!("Upload of {} failed", file.display()))?;
            println!("Uploaded {}", outcome.result.public_id);
            println!("{}", outcome.result.secure_url);
            if copy {
                copy_to_clipboard(&outcome.result.secure_url);
            }
        }
        Command::PreviewUrl {
            url,
            crop,
            auto_crop,
            transforms,
            ai,
            preset,
            copy,
        } => {
            let transforms = transforms.to_transforms();
            let mut adjustments = AiAdjustments::none();
            for effect in ai {
                let effect = AiEffect::from(effect);
                if !adjustments.get(effect) {
                    adjustments.toggle(effect);
                }
            }
            let preset = preset.or_else(|| app.config().ai_template.clone());

            let crop = match (&crop, auto_crop) {
                (_, true) => CropInstruction::Auto,
                (Some(coordinates), false) => CropInstruction::Manual(coordinates),
                (None, false) => CropInstruction::None,
            };
            let composed = PreviewRequest::new()
                .with_transforms(&transforms)
                .with_crop(crop)
                .with_ai(&adjustments)
                .with_ai_preset(preset.as_deref())
                .compose(&url);

            println!("{}", composed);
            if copy {
                copy_to_clipboard(&composed);
            }
        }
        Command::Render {
            file,
            output,
            transforms,
            data_url,
        } => {
            let rendered = app
                .render_file(&file, &transforms.to_transforms())
                .with_context(|| format!("Failed to render {}", file.display()))?;
            rendered
                .save(&output)
                .with_context(|| format!("Failed to save {}", output.display()))?;

            let (w, h) = rendered.size();
            println!("Wrote {}x{} preview to {}", w, h, output.display());
            if data_url {
                println!("{}", rendered.data_url);
            }
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    apply_overrides(cli, Config::load()?)
}

/// Applies CLI flags on top of the environment configuration.
fn apply_overrides(cli: &Cli, base: Config) -> Result<Config> {
    let mut builder = base.into_builder();
    if let Some(name) = &cli.cloud_name {
        builder = builder.with_cloud_name(name);
    }
    if let Some(preset) = &cli.upload_preset {
        builder = builder.with_upload_preset(preset);
    }
    if let Some(folder) = &cli.folder {
        builder = builder.with_folder(folder);
    }
    if let Some(url) = &cli.signature_url {
        builder = builder.with_signature_url(url);
    }
    Ok(builder.build()?)
}

/// Helper to copy text, reporting failures without aborting
fn copy_to_clipboard(text: &str) {
    match Clipboard::new() {
        Ok(mut clipboard) => {
            if let Err(e) = clipboard.set_text(text.to_string()) {
                eprintln!("Warning: Failed to copy to clipboard: {}", e);
            } else {
                println!("(Copied to clipboard)");
            }
        }
        Err(e) => eprintln!("Warning: Could not access clipboard: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &'static [(&'static str, &'static str)]) -> Config {
        Config::from_lookup(|key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })
        .unwrap()
    }

    #[test]
    fn prefixed_cloud_name_survives_overrides() {
        let cli = Cli::try_parse_from(["tuus-imago", "--folder", "shop", "upload", "a.jpg"]).unwrap();
        let config = apply_overrides(&cli, env(&[("VITE_CLOUDINARY_CLOUD_NAME", "demo")])).unwrap();
        assert_eq!(config.upload_folder, "shop");
        let message = config.upload_config_error().unwrap();
        assert!(message.contains("VITE_CLOUDINARY_CLOUD_NAME"), "{message}");
    }

    #[test]
    fn cloud_name_flag_overrides_environment() {
        let cli = Cli::try_parse_from(["tuus-imago", "--cloud-name", "flag", "edit"]).unwrap();
        let config = apply_overrides(&cli, env(&[("CLOUDINARY_CLOUD_NAME", "env")])).unwrap();
        assert_eq!(config.cloud_name, "flag");
        assert_eq!(config.upload_config_error(), None);
    }

    #[test]
    fn transform_args_clamp_and_normalize() {
        let args = TransformArgs {
            rotate: -90,
            flip_horizontal: true,
            brightness: 250,
            blur: 3.5,
            ..Default::default()
        };
        let t = args.to_transforms();
        assert_eq!(t.rotation, 270);
        assert!(t.flip_horizontal);
        assert!(!t.flip_vertical);
        assert_eq!(t.brightness, 100);
        assert_eq!(t.blur, 3.5);
    }

    #[test]
    fn upload_parses_crop_and_flags() {
        let cli = Cli::try_parse_from([
            "tuus-imago",
            "--cloud-name",
            "demo",
            "upload",
            "photo.jpg",
            "--crop",
            "10,20,300,300",
            "--rotate",
            "90",
        ])
        .unwrap();
        assert_eq!(cli.cloud_name.as_deref(), Some("demo"));
        match cli.command {
            Command::Upload { crop, transforms, .. } => {
                assert_eq!(crop, Some(NaturalCrop { x: 10, y: 20, width: 300, height: 300 }));
                assert_eq!(transforms.rotate, 90);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn preview_url_accepts_repeated_ai_effects() {
        let cli = Cli::try_parse_from([
            "tuus-imago",
            "preview-url",
            "https://res.cloudinary.com/demo/image/upload/v1/a.jpg",
            "--ai",
            "enhance",
            "--ai",
            "remove-background",
            "--auto-crop",
        ])
        .unwrap();
        match cli.command {
            Command::PreviewUrl { ai, auto_crop, .. } => {
                assert_eq!(ai.len(), 2);
                assert!(auto_crop);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn crop_and_auto_crop_conflict() {
        let result = Cli::try_parse_from([
            "tuus-imago",
            "preview-url",
            "https://x/upload/a.jpg",
            "--crop",
            "0,0,10,10",
            "--auto-crop",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_malformed_crop() {
        let result = Cli::try_parse_from(["tuus-imago", "upload", "a.jpg", "--crop", "1,2,3"]);
        assert!(result.is_err());
    }
}
