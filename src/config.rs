use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::{Path, PathBuf};

use crate::datefmt::DateFormat;

/// Top-level configuration for the date-stamper tools.
///
/// Holds the stamp styling plus output behavior. The pipeline itself never
/// reads this — callers load a `Config` (or build one) and pass
/// [`Config::stamp`] into [`crate::pipeline::process_batch`] on every run.
///
/// # Loading
///
/// ```rust,no_run
/// use date_stamper::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.stamp.show_seconds = false;
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Text styling and placement for the burned-in stamp.
    pub stamp: StampStyle,
    /// Output behavior (destination directory, dry run).
    pub output: OutputConfig,
}

/// Stamp font size: automatic (scaled from image dimensions) or a fixed
/// pixel value.
///
/// Serialized as the string `"auto"` or a bare number, matching the
/// `fontSize` setting shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FontSize {
    Auto,
    Fixed(f32),
}

impl FontSize {
    /// Resolve to a concrete pixel size for an image of the given dimensions.
    ///
    /// Auto size is `max(12, 0.05 * min(width, height))`.
    pub fn resolve(&self, width: u32, height: u32) -> f32 {
        match self {
            FontSize::Auto => (width.min(height) as f32 * 0.05).max(12.0),
            FontSize::Fixed(px) => *px,
        }
    }
}

impl Serialize for FontSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FontSize::Auto => serializer.serialize_str("auto"),
            FontSize::Fixed(px) => serializer.serialize_f32(*px),
        }
    }
}

impl<'de> Deserialize<'de> for FontSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Num(f32),
            Text(String),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Num(px) => Ok(FontSize::Fixed(px)),
            Repr::Text(s) if s == "auto" => Ok(FontSize::Auto),
            Repr::Text(s) => Err(serde::de::Error::custom(format!(
                "fontSize must be \"auto\" or a number, got \"{s}\""
            ))),
        }
    }
}

/// Which corner of the image the stamp is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Position {
    BottomLeft,
    BottomRight,
    TopLeft,
    TopRight,
}

impl Position {
    /// Right-edge quadrants are right-aligned.
    pub fn is_right(&self) -> bool {
        matches!(self, Position::BottomRight | Position::TopRight)
    }

    /// Bottom quadrants place the text baseline near the bottom edge.
    pub fn is_bottom(&self) -> bool {
        matches!(self, Position::BottomLeft | Position::BottomRight)
    }
}

/// The selectable stamp font families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FontFamily {
    Arial,
    Roboto,
    #[serde(rename = "Open Sans")]
    OpenSans,
    Helvetica,
    #[serde(rename = "Times New Roman")]
    TimesNewRoman,
}

impl FontFamily {
    /// CSS-style font stack used to resolve the family against installed
    /// fonts, with a generic fallback so a stamp is still rendered when the
    /// named face is missing.
    pub fn font_stack(&self) -> &'static str {
        match self {
            FontFamily::Arial => "Arial, Liberation Sans, sans-serif",
            FontFamily::Roboto => "Roboto, sans-serif",
            FontFamily::OpenSans => "Open Sans, sans-serif",
            FontFamily::Helvetica => "Helvetica, Arial, sans-serif",
            FontFamily::TimesNewRoman => "Times New Roman, Liberation Serif, serif",
        }
    }
}

/// Styling and placement of the timestamp text.
///
/// Field names mirror the settings surface: `fontSize`, `textColor`,
/// `strokeColor`, `position`, `dateFormat`, `showSeconds`, `font`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StampStyle {
    /// `"auto"` or a fixed pixel size.
    pub font_size: FontSize,
    /// CSS color for the text fill (e.g. `"white"`, `"#ff8800"`).
    pub text_color: String,
    /// CSS color for the text outline, or `"none"` to disable stroking.
    pub stroke_color: String,
    /// Corner placement of the stamp.
    pub position: Position,
    /// Date portion pattern.
    pub date_format: DateFormat,
    /// Append `:SS` to the time portion.
    pub show_seconds: bool,
    /// Stamp font family.
    pub font: FontFamily,
    /// Optional path to a font file used instead of system font resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_file: Option<PathBuf>,
}

impl Default for StampStyle {
    fn default() -> Self {
        Self {
            font_size: FontSize::Auto,
            text_color: "white".to_string(),
            stroke_color: "black".to_string(),
            position: Position::BottomLeft,
            date_format: DateFormat::YearMonthDay,
            show_seconds: true,
            font: FontFamily::Arial,
            font_file: None,
        }
    }
}

/// Output behavior configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory stamped images are written to. Defaults to each source
    /// image's own directory.
    pub out_dir: Option<PathBuf>,
    /// If `true`, run the pipeline but write no files.
    pub dry_run: bool,
}

impl Config {
    /// Resolve the config file path — same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_size_serde_round_trip() {
        let auto: FontSize = serde_json::from_str("\"auto\"").unwrap();
        assert_eq!(auto, FontSize::Auto);
        let fixed: FontSize = serde_json::from_str("20").unwrap();
        assert_eq!(fixed, FontSize::Fixed(20.0));

        assert_eq!(serde_json::to_string(&FontSize::Auto).unwrap(), "\"auto\"");
        assert_eq!(
            serde_json::to_string(&FontSize::Fixed(20.0)).unwrap(),
            "20.0"
        );
    }

    #[test]
    fn font_size_rejects_other_strings() {
        assert!(serde_json::from_str::<FontSize>("\"big\"").is_err());
    }

    #[test]
    fn font_size_auto_resolution() {
        // 5% of the smaller dimension, floored at 12px.
        assert_eq!(FontSize::Auto.resolve(1000, 2000), 50.0);
        assert_eq!(FontSize::Auto.resolve(100, 100), 12.0);
        assert_eq!(FontSize::Fixed(33.0).resolve(1000, 1000), 33.0);
    }

    #[test]
    fn position_quadrants() {
        assert!(Position::BottomRight.is_right());
        assert!(Position::BottomRight.is_bottom());
        assert!(!Position::TopLeft.is_right());
        assert!(!Position::TopLeft.is_bottom());
    }

    #[test]
    fn style_serde_uses_settings_field_names() {
        let style = StampStyle::default();
        let json = serde_json::to_value(&style).unwrap();
        assert_eq!(json["fontSize"], "auto");
        assert_eq!(json["textColor"], "white");
        assert_eq!(json["strokeColor"], "black");
        assert_eq!(json["position"], "bottomLeft");
        assert_eq!(json["dateFormat"], "yyyy-MM-dd");
        assert_eq!(json["showSeconds"], true);
        assert_eq!(json["font"], "Arial");
    }

    #[test]
    fn style_parses_settings_json() {
        let json = r##"{
            "fontSize": 24,
            "textColor": "#ffcc00",
            "strokeColor": "none",
            "position": "topRight",
            "dateFormat": "dd/MM/yyyy",
            "showSeconds": false,
            "font": "Times New Roman"
        }"##;
        let style: StampStyle = serde_json::from_str(json).unwrap();
        assert_eq!(style.font_size, FontSize::Fixed(24.0));
        assert_eq!(style.position, Position::TopRight);
        assert_eq!(style.font, FontFamily::TimesNewRoman);
        assert!(!style.show_seconds);
    }

    #[test]
    fn config_save_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.stamp.position = Position::TopLeft;
        config.output.dry_run = true;
        config.save(Some(&path)).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.stamp.position, Position::TopLeft);
        assert!(loaded.output.dry_run);
    }

    #[test]
    fn config_load_missing_file_uses_defaults() {
        let config = Config::load(Some("/nonexistent/config.json".as_ref())).unwrap();
        assert_eq!(config.stamp.position, Position::BottomLeft);
    }
}
