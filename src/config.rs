use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::error_codes::{CodedError, CONFIG_INVALID};
use crate::platform::{Appearance, Platform, TimeFormat};
use crate::raster::MAX_SCALE;
use crate::script::ParseMode;
use crate::session::{DisplaySettings, Participant};

const DEFAULT_CONFIG_DIR_NAME: &str = "fakechat";
const DEFAULT_CONFIG_FILE_NAME: &str = "config.yaml";
const DEFAULT_SENDER_NAME: &str = "Alice";
const DEFAULT_RECEIVER_NAME: &str = "Bob";
const DEFAULT_SCALE: f32 = 2.0;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

/// On-disk shape. Every field is optional; `resolve_config` fills defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub sender: ParticipantFile,
    #[serde(default)]
    pub receiver: ParticipantFile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dark_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_format: Option<TimeFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    /// `None` when no file was found and built-in defaults are in use.
    pub config_path: Option<PathBuf>,
    pub sender: Participant,
    pub receiver: Participant,
    pub display: DisplaySettings,
    pub parse_mode: ParseMode,
    pub font: Option<PathBuf>,
    pub font_sha256: Option<String>,
    pub scale: f32,
    pub output_dir: PathBuf,
}

/// Values given on the command line. They win over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub sender_name: Option<String>,
    pub receiver_name: Option<String>,
    pub sender_photo: Option<PathBuf>,
    pub receiver_photo: Option<PathBuf>,
    pub platform: Option<Platform>,
    pub dark_mode: Option<bool>,
    pub mobile_mode: Option<bool>,
    pub time_format: Option<TimeFormat>,
    pub parse_mode: Option<ParseMode>,
    pub font: Option<PathBuf>,
    pub scale: Option<f32>,
    pub output_dir: Option<PathBuf>,
}

impl Config {
    pub fn apply(mut self, overrides: ConfigOverrides, launch_cwd: &Path) -> Result<Self> {
        if let Some(name) = overrides.sender_name {
            self.sender.name = name;
        }
        if let Some(name) = overrides.receiver_name {
            self.receiver.name = name;
        }
        if let Some(photo) = overrides.sender_photo {
            self.sender.photo = Some(resolve_against_base_path(&photo, launch_cwd)?);
        }
        if let Some(photo) = overrides.receiver_photo {
            self.receiver.photo = Some(resolve_against_base_path(&photo, launch_cwd)?);
        }
        if let Some(platform) = overrides.platform {
            self.display.platform = platform;
        }
        if let Some(dark) = overrides.dark_mode {
            self.display.appearance = Appearance::from_dark_mode(dark);
        }
        if let Some(mobile) = overrides.mobile_mode {
            self.display.mobile = mobile;
        }
        if let Some(time_format) = overrides.time_format {
            self.display.time_format = time_format;
        }
        if let Some(parse_mode) = overrides.parse_mode {
            self.parse_mode = parse_mode;
        }
        if let Some(font) = overrides.font {
            self.font = Some(resolve_against_base_path(&font, launch_cwd)?);
            // A pin in the file belongs to the file's font, not this one.
            self.font_sha256 = None;
        }
        if let Some(scale) = overrides.scale {
            self.scale = validate_scale(scale)?;
        }
        if let Some(dir) = overrides.output_dir {
            self.output_dir = resolve_against_base_path(&dir, launch_cwd)?;
        }
        tracing::debug!(
            platform = self.display.platform.slug(),
            mobile = self.display.mobile,
            scale = self.scale,
            "applied command-line overrides"
        );
        Ok(self)
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    let base = user_config_dir()?;
    Ok(base
        .join(DEFAULT_CONFIG_DIR_NAME)
        .join(DEFAULT_CONFIG_FILE_NAME))
}

pub fn resolve_config_path(config_override: Option<&Path>, launch_cwd: &Path) -> Result<PathBuf> {
    let raw = if let Some(path) = config_override {
        path.to_path_buf()
    } else {
        default_config_path()?
    };
    resolve_against_base_path(&raw, launch_cwd)
}

/// An explicitly named file must exist; the default location may be absent.
pub fn load_config(config_override: Option<&Path>, launch_cwd: &Path) -> Result<Config> {
    let config_path = resolve_config_path(config_override, launch_cwd)?;
    if !config_path.exists() {
        if config_override.is_some() {
            return Err(CodedError::usage(
                CONFIG_INVALID,
                format!("config file not found: {}", config_path.display()),
            )
            .into());
        }
        tracing::debug!(path = %config_path.display(), "no config file, using defaults");
        return resolve_config(ConfigFile::default(), None, launch_cwd);
    }

    let file = load_config_file(&config_path)?;
    resolve_config(file, Some(&config_path), launch_cwd)
}

pub fn load_config_file(config_path: &Path) -> Result<ConfigFile> {
    let config_text = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read config at {}", config_path.display()))?;
    if config_text.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    serde_yaml::from_str(&config_text).map_err(|error| {
        CodedError::input(
            CONFIG_INVALID,
            format!(
                "failed to parse config yaml at {}: {error}",
                config_path.display()
            ),
        )
        .into()
    })
}

pub fn save_config_file(config_path: &Path, file: &ConfigFile) -> Result<()> {
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let yaml = serde_yaml::to_string(file).context("failed to serialize config yaml")?;
    fs::write(config_path, yaml)
        .with_context(|| format!("failed to write config {}", config_path.display()))?;
    Ok(())
}

/// Relative paths in the file resolve against the file's directory; with no
/// file they resolve against `launch_cwd`.
pub fn resolve_config(
    file: ConfigFile,
    config_path: Option<&Path>,
    launch_cwd: &Path,
) -> Result<Config> {
    let base_dir = config_path
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| launch_cwd.to_path_buf());

    let sender = resolve_participant(file.sender, DEFAULT_SENDER_NAME, &base_dir)?;
    let receiver = resolve_participant(file.receiver, DEFAULT_RECEIVER_NAME, &base_dir)?;

    let display = DisplaySettings {
        platform: file.platform.unwrap_or_default(),
        appearance: Appearance::from_dark_mode(file.dark_mode.unwrap_or(false)),
        mobile: file.mobile_mode.unwrap_or(false),
        time_format: file.time_format.unwrap_or_default(),
    };

    let font = file
        .font
        .as_deref()
        .map(|value| resolve_string_path(value, &base_dir))
        .transpose()?;
    let output_dir = match file.output_dir.as_deref() {
        Some(value) => resolve_string_path(value, &base_dir)?,
        None => resolve_against_base_path(Path::new("."), launch_cwd)?,
    };

    Ok(Config {
        config_path: config_path.map(Path::to_path_buf),
        sender,
        receiver,
        display,
        parse_mode: file.parse_mode.unwrap_or_default(),
        font,
        font_sha256: file
            .font_sha256
            .map(|hash| hash.trim().to_ascii_lowercase())
            .filter(|hash| !hash.is_empty()),
        scale: validate_scale(file.scale.unwrap_or(DEFAULT_SCALE))?,
        output_dir,
    })
}

pub fn starter_config_file() -> ConfigFile {
    ConfigFile {
        sender: ParticipantFile {
            name: Some(DEFAULT_SENDER_NAME.to_owned()),
            photo: None,
        },
        receiver: ParticipantFile {
            name: Some(DEFAULT_RECEIVER_NAME.to_owned()),
            photo: None,
        },
        platform: Some(Platform::WhatsApp),
        dark_mode: Some(false),
        mobile_mode: Some(false),
        time_format: Some(TimeFormat::TwentyFourHour),
        parse_mode: Some(ParseMode::Carry),
        font: None,
        font_sha256: None,
        scale: Some(DEFAULT_SCALE),
        output_dir: Some(String::from("./exports")),
    }
}

pub fn write_starter_config(config_path: &Path, overwrite: bool) -> Result<ConfigFile> {
    if config_path.exists() && !overwrite {
        bail!(
            "config already exists at {} (use --force to overwrite or --config to choose another path)",
            config_path.display()
        );
    }
    let file = starter_config_file();
    save_config_file(config_path, &file)?;
    Ok(file)
}

fn resolve_participant(
    file: ParticipantFile,
    default_name: &str,
    base_dir: &Path,
) -> Result<Participant> {
    let photo = file
        .photo
        .as_deref()
        .map(|value| resolve_string_path(value, base_dir))
        .transpose()?;
    Ok(Participant {
        name: file.name.unwrap_or_else(|| default_name.to_owned()),
        photo,
    })
}

fn validate_scale(scale: f32) -> Result<f32> {
    if !scale.is_finite() || scale <= 0.0 || scale > MAX_SCALE {
        return Err(CodedError::usage(
            CONFIG_INVALID,
            format!("scale must be > 0 and <= {MAX_SCALE}, got {scale}"),
        )
        .with_details(serde_json::json!({ "scale": scale, "max": MAX_SCALE }))
        .into());
    }
    Ok(scale)
}

fn resolve_string_path(value: &str, base_dir: &Path) -> Result<PathBuf> {
    let expanded = expand_home(value)?;
    resolve_against_base_path(&expanded, base_dir)
}

fn resolve_against_base_path(path: &Path, base_dir: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    };
    let absolute = if joined.is_absolute() {
        joined
    } else {
        env::current_dir()
            .context("failed to resolve current directory")?
            .join(joined)
    };
    Ok(normalize_path(absolute))
}

fn expand_home(value: &str) -> Result<PathBuf> {
    if !value.starts_with('~') {
        return Ok(PathBuf::from(value));
    }

    let home = env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
        .ok_or_else(|| anyhow!("cannot resolve home directory for path '{value}'"))?;

    if value == "~" {
        return Ok(home);
    }

    if let Some(rest) = value.strip_prefix("~/").or_else(|| value.strip_prefix("~\\")) {
        return Ok(home.join(rest));
    }

    bail!("unsupported home path syntax: {value}")
}

fn normalize_path(path: PathBuf) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let _ = result.pop();
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

fn user_config_dir() -> Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        if let Some(path) = env::var_os("APPDATA") {
            return Ok(PathBuf::from(path));
        }
        if let Some(home) = env::var_os("USERPROFILE") {
            return Ok(PathBuf::from(home).join("AppData").join("Roaming"));
        }
        bail!("unable to resolve user config directory on Windows");
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = env::var_os("HOME") {
            return Ok(PathBuf::from(home)
                .join("Library")
                .join("Application Support"));
        }
        bail!("unable to resolve HOME for macOS config directory");
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        if let Some(path) = env::var_os("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(path));
        }
        if let Some(home) = env::var_os("HOME") {
            return Ok(PathBuf::from(home).join(".config"));
        }
        bail!("unable to resolve user config directory on unix");
    }
}
