//! Kiosk configuration, read from a [ron] file (`kiosk.ron` by default).
//!
//! Every field has a default, and a missing or broken file simply means the
//! defaults are used, so a fresh kiosk boots without any setup. Partial files
//! are fine too: whatever is left out keeps its default.

use log::{info, warn};
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, fmt, fs, io, path::Path, time::Duration};

/// Where the binaries look when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "kiosk.ron";

/// Something went wrong reading or writing a config file.
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read or written.
    IoError(io::Error),
    /// The file is not valid RON for a [KioskConfig].
    RonSpannedError(ron::de::SpannedError),
    /// The config could not be serialized.
    RonError(ron::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ConfigError as CE;
        let msg = match self {
            CE::IoError(error) => Cow::from(format!("io error: {}", error)),
            CE::RonSpannedError(error) => Cow::from(format!("invalid config: {}", error)),
            CE::RonError(error) => Cow::from(format!("ron error: {}", error)),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for ConfigError {}

impl From<io::Error> for ConfigError {
    fn from(value: io::Error) -> Self {
        Self::IoError(value)
    }
}

impl From<ron::de::SpannedError> for ConfigError {
    fn from(value: ron::de::SpannedError) -> Self {
        Self::RonSpannedError(value)
    }
}

impl From<ron::Error> for ConfigError {
    fn from(value: ron::Error) -> Self {
        Self::RonError(value)
    }
}

/// Everything the kiosk binaries can be told.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KioskConfig {
    /// The weighing screen.
    pub scale: ScaleConfig,
    /// The robot assistant flow.
    pub robot: RobotConfig,
    /// The recipe tablet flow.
    pub recipe: RecipeConfig,
}

/// Settings for the scale and its display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    /// Tare reference before the first target arrives.
    pub initial_offset: f64,
    /// Target before the first target arrives.
    pub initial_max_weight: f64,
    /// Raw reading assumed before the first one arrives.
    pub initial_reading: f64,
    /// Width of the full progress bar.
    pub bar_width: f64,
    /// Fractions of the target that get announced when crossed.
    pub watchers: Vec<f64>,
    /// Baud rate of the BLE-UART bridge.
    pub baud_rate: u32,
    /// Only offer devices whose name starts with this.
    pub name_prefix: Option<String>,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        ScaleConfig {
            initial_offset: 17000.0,
            initial_max_weight: 500.0,
            initial_reading: 17000.0,
            bar_width: 300.0,
            watchers: vec![0.6, 0.7, 0.8, 0.9, 1.0],
            baud_rate: 115200,
            name_prefix: None,
        }
    }
}

/// Settings for the robot flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    /// Seconds without input before going back to the video.
    pub inactivity_timeout_secs: u64,
    /// Delay between characters of the intro text.
    pub typewriter_millis: u64,
    /// What the robot says on the intro screen.
    pub intro_text: String,
    /// Status codes that raise the help overlay.
    pub help_codes: Vec<u16>,
    /// Status code that lowers it again.
    pub clear_code: u16,
    /// Status code the validate screen waits for.
    pub done_code: u16,
    /// Seconds the finished screen stays up.
    pub finished_hold_secs: u64,
}

impl Default for RobotConfig {
    fn default() -> Self {
        RobotConfig {
            inactivity_timeout_secs: 300,
            typewriter_millis: 40,
            intro_text: "Hi! I am the kitchen robot. Let's put your groceries away together."
                .to_owned(),
            help_codes: vec![1, 2],
            clear_code: 0,
            done_code: 3,
            finished_hold_secs: 10,
        }
    }
}

impl RobotConfig {
    /// [RobotConfig::inactivity_timeout_secs] as a [Duration].
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }

    /// [RobotConfig::typewriter_millis] as a [Duration].
    pub fn typewriter_delay(&self) -> Duration {
        Duration::from_millis(self.typewriter_millis)
    }

    /// [RobotConfig::finished_hold_secs] as a [Duration].
    pub fn finished_hold(&self) -> Duration {
        Duration::from_secs(self.finished_hold_secs)
    }
}

/// One line of a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    /// Display name, also what the scale shows.
    pub name: String,
    /// How much of it, in grams.
    pub grams: f64,
}

impl Ingredient {
    /// `grams` of `name`.
    pub fn new(name: impl Into<String>, grams: f64) -> Self {
        Ingredient {
            name: name.into(),
            grams,
        }
    }
}

/// The recipe shown by the recipe flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipeConfig {
    /// Name of the dish.
    pub name: String,
    /// Ingredients in the order they are added.
    pub ingredients: Vec<Ingredient>,
}

impl Default for RecipeConfig {
    fn default() -> Self {
        RecipeConfig {
            name: "Bread".to_owned(),
            ingredients: vec![
                Ingredient::new("Flour", 550.0),
                Ingredient::new("Water", 350.0),
                Ingredient::new("Salt", 10.0),
            ],
        }
    }
}

impl KioskConfig {
    /// Reads `path`, failing on any problem.
    pub fn try_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(ron::de::from_str(&contents)?)
    }

    /// Reads `path`, falling back to the defaults if it is missing or
    /// invalid.
    pub fn load_from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::try_from_path(path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Err(ConfigError::IoError(e)) if e.kind() == io::ErrorKind::NotFound => {
                info!("No config at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("Ignoring config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Writes the config to `path` as pretty RON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let contents = ron::ser::to_string_pretty(self, PrettyConfig::new())?;
        fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_kiosk() {
        let config = KioskConfig::default();
        assert_eq!(config.scale.initial_offset, 17000.0);
        assert_eq!(config.scale.initial_max_weight, 500.0);
        assert_eq!(config.scale.bar_width, 300.0);
        assert_eq!(config.scale.baud_rate, 115200);
        assert_eq!(config.robot.inactivity_timeout(), Duration::from_secs(300));
        assert_eq!(config.recipe.name, "Bread");
        assert_eq!(
            config.recipe.ingredients,
            vec![
                Ingredient::new("Flour", 550.0),
                Ingredient::new("Water", 350.0),
                Ingredient::new("Salt", 10.0),
            ]
        );
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = KioskConfig::load_from_path(dir.path().join("nope.ron"));
        assert_eq!(config, KioskConfig::default());
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kiosk.ron");
        fs::write(&path, "(scale: (bar_width: \"wide\"))").unwrap();

        assert!(matches!(
            KioskConfig::try_from_path(&path),
            Err(ConfigError::RonSpannedError(_))
        ));
        assert_eq!(KioskConfig::load_from_path(&path), KioskConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kiosk.ron");
        fs::write(
            &path,
            "(scale: (bar_width: 200.0, name_prefix: Some(\"Scale\")), robot: (done_code: 7))",
        )
        .unwrap();

        let config = KioskConfig::load_from_path(&path);
        assert_eq!(config.scale.bar_width, 200.0);
        assert_eq!(config.scale.name_prefix.as_deref(), Some("Scale"));
        assert_eq!(config.scale.initial_offset, 17000.0);
        assert_eq!(config.robot.done_code, 7);
        assert_eq!(config.robot.help_codes, vec![1, 2]);
        assert_eq!(config.recipe, RecipeConfig::default());
    }

    #[test]
    fn saved_config_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kiosk.ron");
        let mut config = KioskConfig::default();
        config.recipe.name = "Pizza".to_owned();
        config.recipe.ingredients.push(Ingredient::new("Yeast", 7.0));
        config.robot.help_codes = vec![5];

        config.save(&path).unwrap();
        assert_eq!(KioskConfig::try_from_path(&path).unwrap(), config);
    }
}
