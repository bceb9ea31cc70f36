use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use autoshift_lib::Settings;
use autoshift_lib::settings::{SettingSource, load_settings_string, setting_sources, settings_path};

fn mask_value(s: &str) -> String {
    if s.chars().count() <= 4 {
        "****".to_string()
    } else {
        let head: String = s.chars().take(4).collect();
        format!("{head}****")
    }
}

/// Show resolved settings and where each one comes from.
pub(crate) fn run_config_show() {
    let path = settings_path();
    let sources = setting_sources();
    let settings = Settings::load();

    log::info!(
        "{}",
        "autoshift settings".if_supports_color(Stdout, |t| t.bold()),
    );
    log::info!("");
    let status = if path.exists() { "(exists)" } else { "(not found)" };
    log::info!(
        "  Settings file: {} {}",
        path.display().if_supports_color(Stdout, |t| t.cyan()),
        status.if_supports_color(Stdout, |t| t.dimmed()),
    );
    log::info!("");

    let fields: [(&str, &SettingSource, Option<String>); 7] = [
        ("file", &sources.file, Some(settings.file.display().to_string())),
        ("permalink", &sources.permalink, Some(settings.permalink()).filter(|p| !p.is_empty())),
        ("github user", &sources.github_user, settings.github_user.clone()),
        ("github repo", &sources.github_repo, settings.github_repo.clone()),
        ("github token", &sources.github_token, settings.github_token.as_deref().map(mask_value)),
        ("schedule", &sources.schedule, settings.schedule.map(|m| format!("every {m} minute(s)"))),
        ("sources dir", &sources.sources_dir, settings.sources_dir.as_ref().map(|d| d.display().to_string())),
    ];

    for (name, source, value) in &fields {
        let source_str = format!("({})", source);
        match value {
            Some(v) => log::info!(
                "  {:<14} {} {}",
                name,
                v,
                source_str.if_supports_color(Stdout, |t| t.dimmed()),
            ),
            None => log::info!(
                "  {:<14} {}",
                name,
                "not set".if_supports_color(Stdout, |t| t.yellow()),
            ),
        }
    }

    if let Some(contents) = load_settings_string() {
        log::debug!("Settings file contents:\n{contents}");
    }
}

/// Print the settings file path.
pub(crate) fn run_config_path() {
    println!("{}", settings_path().display());
}
