use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "turnabout",
    version,
    about = "Courtroom transcript extraction into per-chapter turn documents"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Inventory(InventoryArgs),
    Extract(ExtractArgs),
    Validate(ValidateArgs),
    Normalize(NormalizeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[arg(long, default_value = ".cache/turnabout")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub chapters_path: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(long, default_value = ".cache/turnabout")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub chapters_path: Option<PathBuf>,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long)]
    pub run_manifest_path: Option<PathBuf>,

    #[arg(long = "chapter")]
    pub chapters: Vec<String>,

    #[arg(long, default_value = ".mw-parser-output")]
    pub content_selector: String,

    #[arg(long, value_enum, default_value_t = TruncatedSectionPolicy::Keep)]
    pub truncated_sections: TruncatedSectionPolicy,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum TruncatedSectionPolicy {
    #[default]
    Keep,
    Discard,
}

impl TruncatedSectionPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Keep => "keep",
            Self::Discard => "discard",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[arg(long, default_value = ".cache/turnabout")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub parsed_dir: Option<PathBuf>,

    #[arg(long)]
    pub quality_report_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct NormalizeArgs {
    #[arg(long, default_value = ".cache/turnabout")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub parsed_dir: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}
