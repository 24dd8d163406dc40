//! JSON tournament settings and their translation into a ready-to-spawn
//! [`TournamentBuilder`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::adjudicator::Adjudicator;
use crate::controller::{TournamentBuilder, TournamentConfig};
use crate::engine_config::EngineConfiguration;
use crate::error::TournamentError;
use crate::opening::{OpeningError, OpeningSuite};
use crate::output::{JsonLinesSink, LiveOutput, OutputMode};
use crate::player::{BookBinding, Player, PlayerBuilder, TimeControl, TimeControlParseError};
use crate::runner::LocalRunnerConfig;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid settings: {0}")]
    Invalid(String),
    #[error(transparent)]
    TimeControl(#[from] TimeControlParseError),
    #[error("Openings: {0}")]
    Openings(#[from] OpeningError),
    #[error(transparent)]
    Tournament(#[from] TournamentError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawAdjudication {
    pub move_number: i64,
    pub move_count: i64,
    pub score: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResignAdjudication {
    pub move_count: i64,
    pub score: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjudicationSettings {
    #[serde(default)]
    pub draw: Option<DrawAdjudication>,
    #[serde(default)]
    pub resign: Option<ResignAdjudication>,
    #[serde(default)]
    pub tablebase: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSettings {
    pub path: PathBuf,
    #[serde(default)]
    pub mode: OutputMode,
}

/// A tournament described as a JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentSettings {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_site")]
    pub site: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_date: Option<String>,
    #[serde(default = "default_variant")]
    pub variant: String,
    #[serde(default = "default_one")]
    pub games_per_encounter: u32,
    #[serde(default = "default_one")]
    pub round_multiplier: u32,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub start_delay_ms: u64,
    #[serde(default)]
    pub recover: bool,
    #[serde(default)]
    pub repeat_openings: bool,
    #[serde(default = "default_opening_depth")]
    pub opening_depth: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openings_file: Option<PathBuf>,
    /// Matches of the previous run to skip.
    #[serde(default)]
    pub resume: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_plies: Option<u32>,
    #[serde(default = "default_time_control")]
    pub time_control: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book: Option<BookBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_output: Option<OutputSettings>,
    #[serde(default)]
    pub adjudication: AdjudicationSettings,
    #[serde(default)]
    pub engines: Vec<EngineConfiguration>,
}

fn default_name() -> String {
    TournamentConfig::default().name
}

fn default_site() -> String {
    TournamentConfig::default().site
}

fn default_variant() -> String {
    chess::STANDARD_VARIANT.to_string()
}

fn default_one() -> u32 {
    1
}

fn default_concurrency() -> usize {
    1
}

fn default_opening_depth() -> usize {
    TournamentConfig::default().opening_depth
}

fn default_time_control() -> String {
    "inf".to_string()
}

impl TournamentSettings {
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reject settings that can't describe a runnable tournament.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.engines.len() < 2 {
            return Err(TournamentError::NotEnoughPlayers(self.engines.len()).into());
        }
        if self.games_per_encounter == 0 {
            return Err(invalid("gamesPerEncounter must be at least 1"));
        }
        if self.round_multiplier == 0 {
            return Err(invalid("roundMultiplier must be at least 1"));
        }
        if self.concurrency == 0 {
            return Err(invalid("concurrency must be at least 1"));
        }
        if !chess::Game::supports_variant(&self.variant) {
            return Err(invalid(format!("unsupported variant {}", self.variant)));
        }
        for engine in &self.engines {
            if engine.name.is_empty() {
                return Err(invalid("every engine needs a name"));
            }
            if !engine.supports_variant(&self.variant) {
                return Err(invalid(format!(
                    "engine {} does not support variant {}",
                    engine.name, self.variant
                )));
            }
        }
        let mut names: Vec<&str> = self.engines.iter().map(|e| e.name.as_str()).collect();
        names.sort_unstable();
        if names.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(invalid("engine names must be unique"));
        }
        self.time_control()?;
        self.adjudicator()?;
        Ok(())
    }

    pub fn time_control(&self) -> Result<TimeControl, SettingsError> {
        Ok(self.time_control.parse()?)
    }

    /// The adjudicator template every match receives a copy of.
    pub fn adjudicator(&self) -> Result<Adjudicator, SettingsError> {
        let mut adjudicator = Adjudicator::new();
        if let Some(draw) = &self.adjudication.draw {
            adjudicator.set_draw_threshold(
                count(draw.move_number, "draw moveNumber")?,
                count(draw.move_count, "draw moveCount")?,
                draw.score,
            )?;
        }
        if let Some(resign) = &self.adjudication.resign {
            adjudicator.set_resign_threshold(
                count(resign.move_count, "resign moveCount")?,
                resign.score,
            )?;
        }
        adjudicator.set_tablebase_adjudication(self.adjudication.tablebase);
        Ok(adjudicator)
    }

    pub fn tournament_config(&self) -> TournamentConfig {
        TournamentConfig {
            name: self.name.clone(),
            site: self.site.clone(),
            event_date: self.event_date.clone(),
            variant: self.variant.clone(),
            games_per_encounter: self.games_per_encounter,
            round_multiplier: self.round_multiplier,
            recover: self.recover,
            repeat_openings: self.repeat_openings,
            opening_depth: self.opening_depth,
            start_delay: Duration::from_millis(self.start_delay_ms),
            max_plies: self.max_plies,
        }
    }

    pub fn runner_config(&self) -> LocalRunnerConfig {
        LocalRunnerConfig {
            concurrency: self.concurrency,
            max_plies: self
                .max_plies
                .unwrap_or(LocalRunnerConfig::default().max_plies),
        }
    }

    /// Validate and assemble the tournament. Relative output paths are
    /// resolved against `output_dir`.
    pub fn builder(&self, output_dir: &Path) -> Result<TournamentBuilder, SettingsError> {
        self.validate()?;
        let time_control = self.time_control()?;

        let mut builder =
            TournamentBuilder::new(self.tournament_config()).adjudicator(self.adjudicator()?);
        for engine in &self.engines {
            let mut player = Player::new(PlayerBuilder::new(engine.clone()), time_control);
            if let Some(book) = &self.book {
                player = player.with_book(book.clone());
            }
            builder = builder.add_player(player);
        }

        if let Some(path) = &self.openings_file {
            builder = builder.openings(Box::new(OpeningSuite::from_file(path)?));
        }
        if let Some(output) = &self.output {
            let path = resolve(output_dir, &output.path);
            builder = builder
                .output(Box::new(JsonLinesSink::new(path.clone())), output.mode)
                .resume_from(path);
        }
        if let Some(live) = &self.live_output {
            let path = resolve(output_dir, &live.path);
            builder = builder.live_output(LiveOutput::new(path, live.mode));
        }
        Ok(builder)
    }
}

fn invalid(message: impl Into<String>) -> SettingsError {
    SettingsError::Invalid(message.into())
}

fn count(value: i64, what: &str) -> Result<u32, SettingsError> {
    u32::try_from(value)
        .map_err(|_| invalid(format!("{} must be a non-negative count, got {}", what, value)))
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
