//! NBA Prediction CLI
//!
//! Player over/under and team matchup predictions from gradient-boosted trees.

use clap::{Parser, Subcommand};
use hoops::{Config, Result};

#[derive(Parser)]
#[command(name = "hoops")]
#[command(about = "NBA over/under and matchup prediction", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Train a model
    Train {
        #[command(subcommand)]
        action: TrainCommands,
    },
    /// Predict with a stored model
    Predict {
        #[command(subcommand)]
        action: PredictCommands,
    },
    /// Fetch a player's games, train the model and predict the next game
    OverUnder {
        /// Player name, full or partial
        player: String,
        /// Stat or sum of stats, e.g. PTS or PTS+REB+AST
        stat: String,
        /// Line to beat
        line: f64,
        /// Rolling window in games
        #[arg(long)]
        window: Option<usize>,
        /// Refetch data and retrain even if cached
        #[arg(long)]
        refresh: bool,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Simulate a single-elimination bracket
    Bracket {
        /// JSON file with first-round pairs, e.g. [["Boston Celtics", "New York Knicks"], ...]
        file: String,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Fetch a player's game logs for the configured seasons
    Player {
        name: String,
        #[arg(long)]
        refresh: bool,
    },
    /// Fetch the league team game log and season team averages
    Teams {
        #[arg(long)]
        refresh: bool,
    },
    /// Show database status
    Status,
}

#[derive(Subcommand)]
enum TrainCommands {
    /// Player over/under model
    OverUnder {
        player: String,
        stat: String,
        line: f64,
        #[arg(long)]
        window: Option<usize>,
        /// Retrain even if a model is stored
        #[arg(long)]
        refresh: bool,
    },
    /// Team matchup model
    Winner {
        #[arg(long)]
        refresh: bool,
    },
}

#[derive(Subcommand)]
enum PredictCommands {
    /// Probability that a player beats a line in the next game
    OverUnder {
        player: String,
        stat: String,
        line: f64,
        #[arg(long)]
        window: Option<usize>,
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Winner between two teams
    Winner {
        team1: String,
        team2: String,
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use table or json.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Data { action } => match action {
            DataCommands::Player { name, refresh } => commands::data_player(&config, &name, refresh),
            DataCommands::Teams { refresh } => commands::data_teams(&config, refresh),
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Train { action } => match action {
            TrainCommands::OverUnder {
                player,
                stat,
                line,
                window,
                refresh,
            } => commands::train_over_under(&config, &player, &stat, line, window, refresh),
            TrainCommands::Winner { refresh } => commands::train_winner(&config, refresh),
        },
        Commands::Predict { action } => match action {
            PredictCommands::OverUnder {
                player,
                stat,
                line,
                window,
                format,
            } => commands::predict_over_under(&config, &player, &stat, line, window, format),
            PredictCommands::Winner { team1, team2, format } => {
                commands::predict_winner(&config, &team1, &team2, format)
            }
        },
        Commands::OverUnder {
            player,
            stat,
            line,
            window,
            refresh,
            format,
        } => commands::over_under(&config, &player, &stat, line, window, refresh, format),
        Commands::Bracket { file, format } => commands::bracket(&config, &file, format),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use hoops::data::sources::NbaStatsClient;
    use hoops::data::{Database, FileArtifactStore};
    use hoops::features::StatExpr;
    use hoops::model::TrainedModel;
    use hoops::pipeline::Pipeline;
    use hoops::predict::{BracketResult, OverUnderPrediction};
    use std::time::Duration;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("data")?;
        std::fs::create_dir_all(&config.data.model_dir)?;
        println!("Created data/ and {}/ directories", config.data.model_dir);

        println!("\nNext steps:");
        println!("  1. Edit {} to customize seasons and the training grid", config_path);
        println!("  2. Run 'hoops data teams' to fetch team data");
        println!("  3. Run 'hoops train winner' to train the matchup model");
        println!("  4. Run 'hoops over-under \"Julius Randle\" PTS 20.5' for a player line");

        Ok(())
    }

    fn client(config: &Config) -> Result<NbaStatsClient> {
        NbaStatsClient::new(
            &config.fetch.season_type,
            Duration::from_secs(config.fetch.timeout_secs),
        )
    }

    fn with_pipeline<T>(
        config: &Config,
        run: impl FnOnce(&Pipeline<'_, FileArtifactStore>) -> Result<T>,
    ) -> Result<T> {
        let db = Database::open(&config.data.database_path)?;
        let store = FileArtifactStore::new(&config.data.model_dir);
        let pipeline = Pipeline::new(config, &db, &store);
        run(&pipeline)
    }

    pub fn data_player(config: &Config, name: &str, refresh: bool) -> Result<()> {
        let source = client(config)?;
        let player = with_pipeline(config, |p| p.sync_player(&source, name, refresh))?;
        println!("Stored game log for {} (id {})", player.full_name, player.id);
        Ok(())
    }

    pub fn data_teams(config: &Config, refresh: bool) -> Result<()> {
        let source = client(config)?;
        let sync = with_pipeline(config, |p| p.sync_teams(&source, refresh))?;
        println!("{} team game rows, {} teams", sync.games, sync.teams);
        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:          {}", config.data.database_path);
        println!("  Players:       {}", stats.player_count);
        println!("  Player games:  {}", stats.player_game_count);
        println!("  Team games:    {}", stats.team_game_count);
        println!("  Team seasons:  {}", stats.team_stats_count);
        if let Some(latest) = stats.latest_team_game {
            println!("  Latest game:   {}", latest);
        }

        Ok(())
    }

    fn print_model(model: &TrainedModel) {
        println!("\nModel: {}", model.name);
        println!("  Target:     {}", model.target.description);
        println!("  Parameters: {}", model.params());
        println!("  Rows:       {}", model.training_rows);
        if let Some(score) = model.cv_score {
            println!("  CV score:   {:.4}", score);
        }
        match &model.test_report {
            Some(report) => println!("\n{}", report),
            None => println!("  (single-class training data, no evaluation)"),
        }
    }

    pub fn train_over_under(
        config: &Config,
        player: &str,
        stat: &str,
        line: f64,
        window: Option<usize>,
        refresh: bool,
    ) -> Result<()> {
        let expr = StatExpr::parse(stat)?;
        let window = window.unwrap_or(config.features.window);
        let model = with_pipeline(config, |p| {
            let player = p.stored_player(player)?;
            p.train_over_under(&player, &expr, line, window, refresh)
        })?;
        print_model(&model);
        Ok(())
    }

    pub fn train_winner(config: &Config, refresh: bool) -> Result<()> {
        let model = with_pipeline(config, |p| p.train_winner(refresh))?;
        print_model(&model);
        Ok(())
    }

    fn print_over_under(prediction: &OverUnderPrediction, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Table => println!("\npredicted: {}", prediction),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(prediction)?),
        }
        Ok(())
    }

    pub fn predict_over_under(
        config: &Config,
        player: &str,
        stat: &str,
        line: f64,
        window: Option<usize>,
        format: OutputFormat,
    ) -> Result<()> {
        let expr = StatExpr::parse(stat)?;
        let prediction = with_pipeline(config, |p| {
            let player = p.stored_player(player)?;
            p.predict_over_under(&player, &expr, line, window)
        })?;
        print_over_under(&prediction, format)
    }

    pub fn predict_winner(config: &Config, team1: &str, team2: &str, format: OutputFormat) -> Result<()> {
        let prediction = with_pipeline(config, |p| p.predict_winner(team1, team2))?;
        match format {
            OutputFormat::Table => println!(
                "the predicted winner is: {} ({} win probability {:.2})",
                prediction.winner, prediction.team1, prediction.probability
            ),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&prediction)?),
        }
        Ok(())
    }

    pub fn over_under(
        config: &Config,
        player: &str,
        stat: &str,
        line: f64,
        window: Option<usize>,
        refresh: bool,
        format: OutputFormat,
    ) -> Result<()> {
        let expr = StatExpr::parse(stat)?;
        let window = window.unwrap_or(config.features.window);
        let source = client(config)?;

        let prediction = with_pipeline(config, |p| {
            let player = p.sync_player(&source, player, refresh)?;
            p.train_over_under(&player, &expr, line, window, refresh)?;
            p.predict_over_under(&player, &expr, line, Some(window))
        })?;
        print_over_under(&prediction, format)
    }

    pub fn bracket(config: &Config, file: &str, format: OutputFormat) -> Result<()> {
        let content = std::fs::read_to_string(file)?;
        let first_round: Vec<(String, String)> = serde_json::from_str(&content)?;
        let result = with_pipeline(config, |p| p.bracket(&first_round))?;

        match format {
            OutputFormat::Table => print_bracket(&result),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        }
        Ok(())
    }

    fn print_bracket(result: &BracketResult) {
        for round in &result.rounds {
            println!("\n--- {} ---", round.name);
            for game in &round.games {
                println!("{} vs. {} -> {} wins", game.team1, game.team2, game.winner);
            }
        }
        println!("\nThe predicted champion is: {}", result.champion);
    }
}
