//! Run settings: output file, GitHub target, schedule.
//!
//! Values are layered: command-line flags > environment variables >
//! `~/.config/autoshift/settings.toml` > built-in defaults. The CLI applies
//! flags on top of [`Settings::load`] through [`Settings::with_overrides`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::publish::GithubRepo;

pub const ENV_FILE: &str = "SHIFTCODESJSONPATH";
pub const ENV_USER: &str = "GITHUB_USER";
pub const ENV_REPO: &str = "GITHUB_REPO";
pub const ENV_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_SCHEDULE: &str = "SCHEDULE";

pub const DEFAULT_FILE: &str = "data/shiftcodes.json";
const DEFAULT_RETRIES: u32 = 2;

/// Canonical path to the settings file: `~/.config/autoshift/settings.toml`.
pub fn settings_path() -> PathBuf {
    let config = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config.join("autoshift").join("settings.toml")
}

/// TOML settings file format.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub output: OutputSection,
    #[serde(default)]
    pub github: GithubSection,
    #[serde(default)]
    pub scrape: ScrapeSection,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct OutputSection {
    pub file: Option<PathBuf>,
    pub permalink: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GithubSection {
    pub user: Option<String>,
    pub repo: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ScrapeSection {
    /// Minutes between runs.
    pub schedule: Option<u64>,
    pub sources_dir: Option<PathBuf>,
    pub retries: Option<u32>,
}

/// Read the settings file. Unreadable or malformed files are logged and
/// treated as absent.
pub fn load_settings_file(path: &Path) -> Option<SettingsFile> {
    let contents = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&contents) {
        Ok(file) => Some(file),
        Err(e) => {
            log::warn!("Ignoring malformed {}: {}", path.display(), e);
            None
        }
    }
}

/// Load the full settings file as a pretty-printed TOML string for display.
pub fn load_settings_string() -> Option<String> {
    let contents = std::fs::read_to_string(settings_path()).ok()?;
    let doc: toml::Value = contents.parse().ok()?;
    toml::to_string_pretty(&doc).ok()
}

/// Resolved settings for one invocation.
#[derive(Clone)]
pub struct Settings {
    pub file: PathBuf,
    pub permalink: Option<String>,
    pub github_user: Option<String>,
    pub github_repo: Option<String>,
    pub github_token: Option<String>,
    pub schedule: Option<u64>,
    pub sources_dir: Option<PathBuf>,
    pub retries: u32,
}

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub file: Option<PathBuf>,
    pub github_user: Option<String>,
    pub github_repo: Option<String>,
    pub github_token: Option<String>,
    pub schedule: Option<u64>,
    pub sources_dir: Option<PathBuf>,
}

impl Settings {
    /// Resolve from the process environment and the settings file.
    pub fn load() -> Self {
        Self::resolve(
            |var| std::env::var(var).ok(),
            load_settings_file(&settings_path()),
        )
    }

    /// Resolve from an arbitrary environment lookup and settings file.
    pub fn resolve(env: impl Fn(&str) -> Option<String>, file: Option<SettingsFile>) -> Self {
        let file = file.unwrap_or_default();
        let env = |var: &str| env(var).filter(|v| !v.trim().is_empty());

        let schedule = env(ENV_SCHEDULE)
            .and_then(|raw| match raw.trim().parse::<u64>() {
                Ok(minutes) => Some(minutes),
                Err(_) => {
                    log::warn!("Ignoring {ENV_SCHEDULE}={raw}: not a number of minutes");
                    None
                }
            })
            .or(file.scrape.schedule);

        Self {
            file: env(ENV_FILE)
                .map(PathBuf::from)
                .or(file.output.file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FILE)),
            permalink: file.output.permalink,
            github_user: env(ENV_USER).or(file.github.user),
            github_repo: env(ENV_REPO).or(file.github.repo),
            github_token: env(ENV_TOKEN).or(file.github.token),
            schedule,
            sources_dir: file.scrape.sources_dir,
            retries: file.scrape.retries.unwrap_or(DEFAULT_RETRIES),
        }
    }

    pub fn with_overrides(mut self, overrides: SettingsOverrides) -> Self {
        if let Some(file) = overrides.file {
            self.file = file;
        }
        if let Some(user) = overrides.github_user {
            self.github_user = Some(user);
        }
        if let Some(repo) = overrides.github_repo {
            self.github_repo = Some(repo);
        }
        if let Some(token) = overrides.github_token {
            self.github_token = Some(token);
        }
        if let Some(minutes) = overrides.schedule {
            self.schedule = Some(minutes);
        }
        if let Some(dir) = overrides.sources_dir {
            self.sources_dir = Some(dir);
        }
        self
    }

    /// The GitHub target, when owner, repository and token are all set.
    pub fn github(&self) -> Option<GithubRepo> {
        Some(GithubRepo {
            owner: self.github_user.clone()?,
            repo: self.github_repo.clone()?,
            token: self.github_token.clone()?,
        })
    }

    /// Basename of the output file, used as its path in the repository.
    pub fn file_name(&self) -> String {
        self.file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "shiftcodes.json".to_string())
    }

    /// Permalink written into records and file metadata.
    ///
    /// Defaults to the raw URL of the published file when a GitHub target
    /// is configured.
    pub fn permalink(&self) -> String {
        if let Some(permalink) = &self.permalink {
            return permalink.clone();
        }
        match (&self.github_user, &self.github_repo) {
            (Some(user), Some(repo)) => format!(
                "https://raw.githubusercontent.com/{user}/{repo}/main/{}",
                self.file_name()
            ),
            _ => String::new(),
        }
    }
}

/// Where a setting's value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingSource {
    /// Loaded from an environment variable.
    EnvVar(&'static str),
    /// Loaded from the settings file.
    SettingsFile,
    /// Hard-coded default value.
    Default,
    /// Not set anywhere.
    Missing,
}

impl std::fmt::Display for SettingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EnvVar(var) => write!(f, "env ${}", var),
            Self::SettingsFile => write!(f, "settings file"),
            Self::Default => write!(f, "default"),
            Self::Missing => write!(f, "not set"),
        }
    }
}

/// Provenance of each setting.
#[derive(Debug)]
pub struct SettingSources {
    pub file: SettingSource,
    pub permalink: SettingSource,
    pub github_user: SettingSource,
    pub github_repo: SettingSource,
    pub github_token: SettingSource,
    pub schedule: SettingSource,
    pub sources_dir: SettingSource,
}

/// Determine where each setting is coming from.
pub fn setting_sources() -> SettingSources {
    let file = load_settings_file(&settings_path()).unwrap_or_default();
    let from = |var: &'static str, in_file: bool, default: SettingSource| {
        if std::env::var(var).is_ok_and(|v| !v.trim().is_empty()) {
            SettingSource::EnvVar(var)
        } else if in_file {
            SettingSource::SettingsFile
        } else {
            default
        }
    };
    let file_only = |in_file: bool, default: SettingSource| {
        if in_file {
            SettingSource::SettingsFile
        } else {
            default
        }
    };

    SettingSources {
        file: from(ENV_FILE, file.output.file.is_some(), SettingSource::Default),
        permalink: file_only(file.output.permalink.is_some(), SettingSource::Default),
        github_user: from(ENV_USER, file.github.user.is_some(), SettingSource::Missing),
        github_repo: from(ENV_REPO, file.github.repo.is_some(), SettingSource::Missing),
        github_token: from(ENV_TOKEN, file.github.token.is_some(), SettingSource::Missing),
        schedule: from(ENV_SCHEDULE, file.scrape.schedule.is_some(), SettingSource::Missing),
        sources_dir: file_only(file.scrape.sources_dir.is_some(), SettingSource::Missing),
    }
}
