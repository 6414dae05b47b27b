use clap::{Parser, ValueEnum};
use std::{env, path::PathBuf, process::ExitCode};
use tracing::{error, info};

use tgm_tournament_engine::{
    build_metadata, config, init_tracing, load_config, load_preset_catalog, CompetitionKind,
    CompetitionMetadata, EngineResult, MetadataOptions,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    QualifierFinal,
    Tournament,
}

impl From<KindArg> for CompetitionKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::QualifierFinal => CompetitionKind::QualifierFinal,
            KindArg::Tournament => CompetitionKind::Tournament,
        }
    }
}

/// Prints the round and stage layout of a competition as JSON.
#[derive(Debug, Parser)]
#[command(name = "bracket-preview", version, about)]
struct Cli {
    /// Competition name shown in the output.
    #[arg(long, default_value = "Preview")]
    name: String,

    /// Number of registered players.
    #[arg(long)]
    players: Option<usize>,

    /// Preset name; picked by player count when omitted.
    #[arg(long)]
    preset: Option<String>,

    #[arg(long, value_enum, default_value_t = KindArg::Tournament)]
    kind: KindArg,

    /// Display-only competition with this many games.
    #[arg(long, conflicts_with_all = ["preset", "kind"])]
    manual: Option<usize>,

    /// Engine config file (defaults to ./engine.json).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn preview(cli: &Cli, config: &config::EngineConfig) -> EngineResult<CompetitionMetadata> {
    let catalog = load_preset_catalog(config)?;
    let options = match cli.manual {
        Some(num_games) => MetadataOptions::Manual { num_games },
        None => MetadataOptions::Preset {
            name: cli.preset.clone(),
            kind: cli.kind.into(),
        },
    };
    build_metadata(&cli.name, cli.players, &options, &catalog)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Ok(cwd) = env::current_dir() {
        config::load_env_file(&cwd);
    }
    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("bracket-preview: {e}");
            return ExitCode::FAILURE;
        }
    };
    let _guard = init_tracing(&config.log_dir, &config.log_filter);
    info!("bracket-preview starting");

    let rendered = preview(&cli, &config).and_then(|metadata| Ok(serde_json::to_string_pretty(&metadata)?));
    match rendered {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("preview failed: {e}");
            eprintln!("bracket-preview: {e}");
            ExitCode::FAILURE
        }
    }
}
