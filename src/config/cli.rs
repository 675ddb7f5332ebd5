use crate::config::toml_config::TomlConfig;
use crate::config::AppSettings;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "enrollment-sync")]
#[command(about = "Select formations, enroll in them and browse the catalogue")]
pub struct CliConfig {
    #[arg(long, global = true, help = "TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "API base URL, overrides the config file")]
    pub base_url: Option<String>,

    #[arg(long, global = true, help = "Directory holding the persisted selection")]
    pub storage_dir: Option<String>,

    #[arg(long, global = true, help = "Bearer token, instead of the token env variable")]
    pub token: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Manage the selection of formations to enroll in
    Select {
        #[command(subcommand)]
        action: SelectAction,
    },
    /// Manage the priced cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Enroll in every selected formation
    Submit,
    /// Query the formation catalogue
    Search(SearchArgs),
}

#[derive(Debug, Clone, Subcommand)]
pub enum SelectAction {
    Add { id: String },
    Remove { id: String },
    List,
    Clear,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CartAction {
    Add {
        id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        price: f64,
        #[arg(long)]
        quantity: Option<u32>,
    },
    Remove {
        id: String,
    },
    List,
    Clear,
}

#[derive(Debug, Clone, Args)]
pub struct SearchArgs {
    #[arg(long)]
    pub search: Option<String>,

    #[arg(long)]
    pub level: Option<String>,

    #[arg(long)]
    pub location: Option<String>,

    #[arg(long, default_value = "1")]
    pub page: u64,

    #[arg(long)]
    pub limit: Option<u64>,
}

impl CliConfig {
    /// Config file (if any), then flag overrides, then validation.
    pub fn resolve_settings(&self) -> Result<AppSettings> {
        let mut settings = match &self.config {
            Some(path) => TomlConfig::from_file(path)?.to_settings(),
            None => AppSettings::default(),
        };

        if let Some(base_url) = &self.base_url {
            settings.base_url = base_url.clone();
        }
        if let Some(storage_dir) = &self.storage_dir {
            settings.storage_dir = storage_dir.clone();
        }
        if let Command::Search(args) = &self.command {
            if let Some(limit) = args.limit {
                settings.page_size = limit;
            }
        }

        settings.validate()?;
        Ok(settings)
    }
}
