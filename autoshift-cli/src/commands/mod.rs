pub(crate) mod config;
pub(crate) mod mark_expired;
pub(crate) mod scrape;
pub(crate) mod sources;

use autoshift_lib::{GithubClient, Settings, SettingsOverrides};

use crate::cli_types::{FileArgs, GithubArgs};
use crate::error::CliError;

/// Settings with the shared file and GitHub flags applied.
pub(crate) fn settings_with(file: FileArgs, github: GithubArgs) -> Settings {
    Settings::load().with_overrides(SettingsOverrides {
        file: file.file,
        github_user: github.user,
        github_repo: github.repo,
        github_token: github.token,
        ..Default::default()
    })
}

/// GitHub client for the configured target, if owner, repo and token are all set.
pub(crate) fn github_client(settings: &Settings) -> Result<Option<GithubClient>, CliError> {
    if let Some(target) = settings.github() {
        return Ok(Some(GithubClient::new(target)?));
    }
    let partial = settings.github_user.is_some()
        || settings.github_repo.is_some()
        || settings.github_token.is_some();
    if partial {
        log::warn!("GitHub upload disabled: user, repo and token must all be set");
    } else {
        log::debug!("No GitHub target configured, writing locally only");
    }
    Ok(None)
}
