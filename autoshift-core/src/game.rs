use serde::{Deserialize, Serialize};

/// Canonical identifiers for every title that hands out SHiFT codes.
///
/// Source pages label games however they like ("Borderlands 4 SHiFT Codes",
/// "BL3", "Tiny Tina's Wonderlands"). This enum is the stable internal name
/// those labels are mapped onto, and it is what gets persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Game {
    Bl1,
    Bl2,
    Blps,
    Bl3,
    Bl4,
    Ttw,
}

/// All game variants in release order.
const ALL_GAMES: &[Game] = &[
    Game::Bl1,
    Game::Bl2,
    Game::Blps,
    Game::Bl3,
    Game::Ttw,
    Game::Bl4,
];

impl Game {
    /// Canonical short name used in the published file and on the CLI.
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::Bl1 => "bl1",
            Self::Bl2 => "bl2",
            Self::Blps => "blps",
            Self::Bl3 => "bl3",
            Self::Bl4 => "bl4",
            Self::Ttw => "ttw",
        }
    }

    /// Full display name for the game.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Bl1 => "Borderlands: Game of the Year Edition",
            Self::Bl2 => "Borderlands 2",
            Self::Blps => "Borderlands: The Pre-Sequel",
            Self::Bl3 => "Borderlands 3",
            Self::Bl4 => "Borderlands 4",
            Self::Ttw => "Tiny Tina's Wonderlands",
        }
    }

    /// All accepted labels for this game, already in normalized form
    /// (lowercase, punctuation folded to single spaces, apostrophes dropped).
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Bl1 => &[
                "bl1",
                "borderlands",
                "borderlands 1",
                "borderlands goty",
                "borderlands goty enhanced",
                "borderlands game of the year",
                "borderlands game of the year edition",
            ],
            Self::Bl2 => &["bl2", "borderlands 2", "borderlands ii"],
            Self::Blps => &[
                "blps",
                "bltps",
                "tps",
                "pre sequel",
                "borderlands the pre sequel",
                "borderlands pre sequel",
            ],
            Self::Bl3 => &["bl3", "borderlands 3", "borderlands iii"],
            Self::Bl4 => &["bl4", "borderlands 4", "borderlands iv"],
            Self::Ttw => &[
                "ttw",
                "wonderlands",
                "tiny tinas wonderlands",
                "tiny tina wonderlands",
            ],
        }
    }

    /// All game variants.
    pub fn all() -> &'static [Game] {
        ALL_GAMES
    }

    /// Map free-form page text (usually a heading) onto a game.
    ///
    /// Exact alias matches win. Otherwise the longest alias that appears as
    /// a whole-word run inside the label decides, so "Borderlands 4 SHiFT
    /// Codes" resolves to `Bl4` rather than to the bare "borderlands" alias.
    pub fn from_label(label: &str) -> Result<Self, GameParseError> {
        let normalized = normalize_label(label);
        if normalized.is_empty() {
            return Err(GameParseError(label.to_string()));
        }
        if let Ok(game) = normalized.parse::<Game>() {
            return Ok(game);
        }

        let padded = format!(" {normalized} ");
        let mut best: Option<(usize, Game)> = None;
        for &game in ALL_GAMES {
            for alias in game.aliases() {
                if padded.contains(&format!(" {alias} "))
                    && best.is_none_or(|(len, _)| alias.len() > len)
                {
                    best = Some((alias.len(), game));
                }
            }
        }
        best.map(|(_, game)| game)
            .ok_or_else(|| GameParseError(label.to_string()))
    }
}

/// Lowercase, drop apostrophes, and fold every other non-alphanumeric run
/// into a single space.
fn normalize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut pending_space = false;
    for ch in label.chars() {
        if ch == '\'' || ch == '\u{2019}' {
            continue;
        }
        if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    out
}

impl std::fmt::Display for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Error returned when a string cannot be mapped to a `Game`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameParseError(pub String);

impl std::fmt::Display for GameParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown game: '{}'", self.0)
    }
}

impl std::error::Error for GameParseError {}

impl std::str::FromStr for Game {
    type Err = GameParseError;

    /// Parse a game from any exact alias (case and punctuation insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_label(s);
        for &game in ALL_GAMES {
            if game.aliases().contains(&normalized.as_str()) {
                return Ok(game);
            }
        }
        Err(GameParseError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_round_trip() {
        for &game in Game::all() {
            let parsed: Game = game.short_name().parse().unwrap();
            assert_eq!(parsed, game, "round-trip failed for {:?}", game);
        }
    }

    #[test]
    fn short_name_is_first_alias() {
        for &game in Game::all() {
            assert_eq!(game.short_name(), game.aliases()[0]);
        }
    }

    #[test]
    fn headings_resolve_to_longest_alias() {
        let cases = [
            ("Borderlands 4 SHiFT Codes", Game::Bl4),
            ("All Borderlands 3 Shift Codes (Active)", Game::Bl3),
            ("Borderlands: The Pre-Sequel SHiFT Codes", Game::Blps),
            ("Tiny Tina’s Wonderlands SHiFT Codes", Game::Ttw),
            ("Tiny Tina's Wonderlands", Game::Ttw),
            ("Borderlands GOTY Enhanced", Game::Bl1),
            ("Borderlands 2", Game::Bl2),
            ("BL3", Game::Bl3),
        ];
        for (label, expected) in cases {
            assert_eq!(Game::from_label(label).unwrap(), expected, "label '{label}'");
        }
    }

    #[test]
    fn unrelated_heading_is_rejected() {
        assert!(Game::from_label("Recent Comments").is_err());
        assert!(Game::from_label("").is_err());
        assert!(Game::from_label("--").is_err());
    }

    #[test]
    fn exact_parse_does_not_do_substring_matching() {
        assert!("Borderlands 4 SHiFT Codes".parse::<Game>().is_err());
        assert_eq!("Borderlands-4".parse::<Game>().unwrap(), Game::Bl4);
    }

    #[test]
    fn serializes_as_short_name() {
        assert_eq!(serde_json::to_string(&Game::Blps).unwrap(), "\"blps\"");
        let game: Game = serde_json::from_str("\"ttw\"").unwrap();
        assert_eq!(game, Game::Ttw);
    }
}
