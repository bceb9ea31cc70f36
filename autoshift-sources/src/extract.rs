//! Turning a parsed page into raw code candidates.
//!
//! Regions (tables or lists) are located eagerly so a page that no longer
//! matches its configuration fails up front with [`SourceError::Format`].
//! Rows are then read lazily, one candidate per row.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::config::{Column, ColumnMap, Layout, Locator, SourceConfig};
use crate::error::SourceError;
use crate::hint::expired_hint;

/// One row as scraped, before any validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCandidate {
    pub source_id: String,
    pub source_url: String,
    pub game_label: String,
    pub code_text: String,
    pub reward_text: String,
    pub expires_text: String,
    pub archived_text: String,
    pub expired_hint: bool,
}

static TR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("static selector is valid"));

static CODE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[A-Z0-9]{5}(?:-[A-Z0-9]{5}){4}\b").expect("static regex is valid")
});
static PARENTHESIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^)]*)\)").expect("static regex is valid"));
// Each date runs until the other one starts, or a separator.
static ADDED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\badded(?:\s+on)?:?\s+(.+?)\s*(?:,\s*expir|[;)|\u{2013}\u{2014}]|$)")
        .expect("static regex is valid")
});
static EXPIRES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bexpir(?:es|ed|y|ation)(?:\s+on)?:?\s+(.+?)\s*(?:,\s*added|[;)|\u{2013}\u{2014}]|$)")
        .expect("static regex is valid")
});

/// Extract candidates from `doc` as described by `config`.
///
/// Fails with [`SourceError::Config`] when a configured game label is not a
/// known game, and with [`SourceError::Format`] when no configured section
/// matches anything on the page.
pub fn extract<'a>(
    doc: &'a Html,
    config: &'a SourceConfig,
) -> Result<impl Iterator<Item = RawCandidate> + 'a, SourceError> {
    config.validate()?;

    let regions = find_regions(doc, config.layout);
    let mut taken = HashSet::new();
    let mut plans = Vec::new();

    for section in &config.sections {
        let Some(locator) = section.locator() else {
            continue;
        };
        let mut matched = 0;
        for (i, region) in regions.iter().enumerate() {
            if !region.matches(locator, i) {
                continue;
            }
            matched += 1;
            // Two sections can point at the same region; read it once.
            if !taken.insert(i) {
                continue;
            }
            let game_label = section
                .game
                .clone()
                .or_else(|| region.heading.as_ref().map(|h| h.text.clone()))
                .unwrap_or_default();
            plans.push(Plan {
                element: region.element,
                game_label,
                columns: None,
            });
        }
        if matched == 0 {
            log::debug!("{}: nothing matches {locator}", config.id);
        }
    }

    let noun = match config.layout {
        Layout::Table => "table",
        Layout::List => "list",
    };
    if plans.is_empty() {
        return Err(SourceError::format(
            &config.id,
            format!(
                "no configured section matched any of the {} {noun}(s) on the page",
                regions.len()
            ),
        ));
    }

    if config.layout == Layout::Table {
        plans.retain_mut(|plan| match resolve_columns(plan.element, &config.columns) {
            Some(columns) => {
                plan.columns = Some(columns);
                true
            }
            None => {
                log::debug!("{}: skipping a table with no code column", config.id);
                false
            }
        });
        if plans.is_empty() {
            return Err(SourceError::format(
                &config.id,
                "matched tables have no recognizable code column",
            ));
        }
    }

    Ok(plans
        .into_iter()
        .flat_map(move |plan| plan.candidates(config)))
}

#[derive(Debug, Clone)]
struct Heading {
    text: String,
    id: Option<String>,
}

/// A table or list together with the heading that precedes it.
struct Region<'a> {
    element: ElementRef<'a>,
    heading: Option<Heading>,
}

impl Region<'_> {
    fn matches(&self, locator: Locator<'_>, position: usize) -> bool {
        match locator {
            Locator::Index(i) => i == position,
            Locator::Heading(needle) => self
                .heading
                .as_ref()
                .is_some_and(|h| h.text.to_lowercase().contains(&needle.to_lowercase())),
            Locator::HeadingId(id) => self
                .heading
                .as_ref()
                .and_then(|h| h.id.as_deref())
                .is_some_and(|h| h == id),
        }
    }
}

/// Walk the document in order, remembering the latest heading, and collect
/// every outermost table (or list).
fn find_regions(doc: &Html, layout: Layout) -> Vec<Region<'_>> {
    let containers: &[&str] = match layout {
        Layout::Table => &["table"],
        Layout::List => &["ul", "ol"],
    };

    let mut regions = Vec::new();
    let mut heading: Option<Heading> = None;
    for node in doc.root_element().descendants() {
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };
        let name = el.value().name();
        if matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6") {
            let id = el.value().id().map(str::to_string).or_else(|| {
                el.descendants()
                    .filter_map(ElementRef::wrap)
                    .find_map(|child| child.value().id().map(str::to_string))
            });
            heading = Some(Heading {
                text: element_text(el),
                id,
            });
        } else if containers.contains(&name) && !nested_in(el, containers) {
            regions.push(Region {
                element: el,
                heading: heading.clone(),
            });
        }
    }
    regions
}

fn nested_in(el: ElementRef<'_>, containers: &[&str]) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| containers.contains(&a.value().name()))
}

/// Text content with whitespace (including `&nbsp;`) collapsed.
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|c| matches!(c.value().name(), "td" | "th"))
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    code: usize,
    reward: Option<usize>,
    expires: Option<usize>,
    archived: Option<usize>,
    /// Position of the header among the table's rows.
    header_row: Option<usize>,
}

/// Map configured fields onto column positions using the table's header row.
///
/// The header is the first row containing `<th>` cells, or failing that the
/// first row if it names the code column.
fn resolve_columns(table: ElementRef<'_>, map: &ColumnMap) -> Option<Columns> {
    let rows: Vec<_> = table.select(&TR).collect();
    let header_row = rows
        .iter()
        .position(|row| cells(*row).iter().any(|c| c.value().name() == "th"))
        .or_else(|| {
            rows.first()
                .filter(|row| header_position(&header_texts(**row), &map.code).is_some())
                .map(|_| 0)
        });
    let texts = header_row
        .map(|i| header_texts(rows[i]))
        .unwrap_or_default();

    let position = |column: &Column| header_position(&texts, column).or(column.index);
    Some(Columns {
        code: position(&map.code)?,
        reward: position(&map.reward),
        expires: position(&map.expires),
        archived: position(&map.archived),
        header_row,
    })
}

fn header_texts(row: ElementRef<'_>) -> Vec<String> {
    cells(row)
        .into_iter()
        .map(|c| element_text(c).to_lowercase())
        .collect()
}

/// Aliases are tried in order, so an earlier alias wins over a later one
/// even if the later one appears further left.
fn header_position(texts: &[String], column: &Column) -> Option<usize> {
    column.headers.iter().find_map(|alias| {
        let alias = alias.to_lowercase();
        texts.iter().position(|text| text.contains(&alias))
    })
}

/// A located region ready to be read.
struct Plan<'a> {
    element: ElementRef<'a>,
    game_label: String,
    columns: Option<Columns>,
}

impl<'a> Plan<'a> {
    fn candidates(self, config: &'a SourceConfig) -> Box<dyn Iterator<Item = RawCandidate> + 'a> {
        let Plan {
            element,
            game_label,
            columns,
        } = self;
        match columns {
            Some(columns) => Box::new(
                element
                    .select(&TR)
                    .enumerate()
                    .filter(move |(i, _)| Some(*i) != columns.header_row)
                    .filter_map(move |(_, row)| table_row(row, columns, &game_label, config)),
            ),
            None => Box::new(
                element
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|el| el.value().name() == "li")
                    .filter_map(move |item| list_item(item, &game_label, config)),
            ),
        }
    }
}

fn table_row(
    row: ElementRef<'_>,
    columns: Columns,
    game_label: &str,
    config: &SourceConfig,
) -> Option<RawCandidate> {
    let cells = cells(row);
    if cells.iter().all(|c| c.value().name() == "th") {
        return None;
    }
    let text_at = |index: Option<usize>| {
        index
            .and_then(|i| cells.get(i))
            .map(|c| element_text(*c))
            .unwrap_or_default()
    };

    let code_text = text_at(Some(columns.code));
    if code_text.is_empty() {
        log::debug!(
            "{}: skipping row with {} cell(s) and no code",
            config.id,
            cells.len()
        );
        return None;
    }

    Some(RawCandidate {
        source_id: config.id.clone(),
        source_url: config.url.clone(),
        game_label: game_label.to_string(),
        code_text,
        reward_text: text_at(columns.reward),
        expires_text: text_at(columns.expires),
        archived_text: text_at(columns.archived),
        expired_hint: expired_hint(row, config.expired_hint),
    })
}

fn list_item(item: ElementRef<'_>, game_label: &str, config: &SourceConfig) -> Option<RawCandidate> {
    let text = element_text(item);
    let Some(code) = CODE_TOKEN.find(&text) else {
        log::debug!("{}: no code in list item '{text}'", config.id);
        return None;
    };
    let rest = &text[code.end()..];
    let capture = |re: &Regex, haystack: &str| {
        re.captures(haystack)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().trim_end_matches([',', '.']).trim().to_string())
            .unwrap_or_default()
    };

    Some(RawCandidate {
        source_id: config.id.clone(),
        source_url: config.url.clone(),
        game_label: game_label.to_string(),
        code_text: code.as_str().to_string(),
        reward_text: capture(&PARENTHESIZED, rest),
        expires_text: capture(&EXPIRES, rest),
        archived_text: capture(&ADDED, rest),
        expired_hint: expired_hint(item, config.expired_hint),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HintStrategy, Section};

    fn table_source(sections: Vec<Section>) -> SourceConfig {
        SourceConfig {
            id: "test".into(),
            url: "https://example.com/codes".into(),
            attribution: None,
            layout: Layout::Table,
            sections,
            columns: ColumnMap::default(),
            expired_hint: HintStrategy::Strikethrough,
        }
    }

    fn heading(text: &str, game: Option<&str>) -> Section {
        Section {
            heading: Some(text.into()),
            game: game.map(str::to_string),
            ..Default::default()
        }
    }

    const PAGE: &str = r#"
<html><body>
<h2>Borderlands 4 SHiFT Codes</h2>
<table>
  <thead><tr><th>Reward</th><th>Expire Date</th><th>SHiFT Code</th></tr></thead>
  <tbody>
    <tr><td>1 Golden Key</td><td>Sep 30, 2025</td><td>J9XBB-KK9T3-CRTBW-BBT3T-KTBTW</td></tr>
    <tr><td>3 Golden Keys</td><td>Unknown</td><td><s>T9RBJ-XZHTB-6RTJW-BTB3T-RFJ3S</s></td></tr>
    <tr><td colspan="3">Ad</td></tr>
  </tbody>
</table>
<h2>Recent Comments</h2>
<table><tr><td>nothing</td></tr></table>
</body></html>"#;

    #[test]
    fn reads_rows_by_header_name() {
        let doc = Html::parse_document(PAGE);
        let source = table_source(vec![heading("shift codes", Some("bl4"))]);
        let rows: Vec<_> = extract(&doc, &source).unwrap().collect();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].code_text, "J9XBB-KK9T3-CRTBW-BBT3T-KTBTW");
        assert_eq!(rows[0].reward_text, "1 Golden Key");
        assert_eq!(rows[0].expires_text, "Sep 30, 2025");
        assert_eq!(rows[0].archived_text, "");
        assert_eq!(rows[0].game_label, "bl4");
        assert!(!rows[0].expired_hint);
        assert!(rows[1].expired_hint);
        assert_eq!(rows[1].source_url, "https://example.com/codes");
    }

    #[test]
    fn heading_text_is_passed_through_without_configured_game() {
        let doc = Html::parse_document(PAGE);
        let source = table_source(vec![heading("shift codes", None)]);
        let rows: Vec<_> = extract(&doc, &source).unwrap().collect();
        assert_eq!(rows[0].game_label, "Borderlands 4 SHiFT Codes");
    }

    #[test]
    fn overlapping_sections_read_a_region_once() {
        let doc = Html::parse_document(PAGE);
        let source = table_source(vec![
            heading("shift codes", Some("bl4")),
            heading("borderlands 4", Some("bl4")),
        ]);
        assert_eq!(extract(&doc, &source).unwrap().count(), 2);
    }

    #[test]
    fn index_locator_with_fallback_columns() {
        let html = r#"<table>
            <tr><td>A</td><td>ABCDE-FGHJK-LMNPQ-RSTVW-XYZ12</td><td>Skin</td></tr>
        </table>"#;
        let doc = Html::parse_document(html);
        let mut source = table_source(vec![Section {
            index: Some(0),
            game: Some("ttw".into()),
            ..Default::default()
        }]);
        source.columns.code = Column {
            headers: vec![],
            index: Some(1),
        };
        source.columns.reward = Column {
            headers: vec![],
            index: Some(2),
        };
        let rows: Vec<_> = extract(&doc, &source).unwrap().collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].code_text, "ABCDE-FGHJK-LMNPQ-RSTVW-XYZ12");
        assert_eq!(rows[0].reward_text, "Skin");
    }

    #[test]
    fn page_without_tables_is_a_format_error() {
        let doc = Html::parse_document("<html><body><p>Maintenance</p></body></html>");
        let source = table_source(vec![heading("shift codes", Some("bl4"))]);
        let err = extract(&doc, &source).err().unwrap();
        assert!(err.is_format(), "{err}");
    }

    #[test]
    fn table_without_code_column_is_a_format_error() {
        let html = "<h2>SHiFT Codes</h2><table><tr><th>Reward</th></tr><tr><td>Key</td></tr></table>";
        let doc = Html::parse_document(html);
        let source = table_source(vec![heading("shift codes", Some("bl4"))]);
        assert!(extract(&doc, &source).err().unwrap().is_format());
    }

    #[test]
    fn bad_game_label_fails_before_reading() {
        let doc = Html::parse_document(PAGE);
        let source = table_source(vec![heading("shift codes", Some("Destiny 2"))]);
        assert!(matches!(
            extract(&doc, &source).err(),
            Some(SourceError::Config { .. })
        ));
    }

    #[test]
    fn list_items_yield_code_reward_and_dates() {
        let html = r#"
<h2 id="all-borderlands-4-shift-codes">All Borderlands 4 SHiFT codes</h2>
<ul>
  <li><strong>J9XBB-KK9T3-CRTBW-BBT3T-KTBTW</strong> (1 Golden Key) — added Sept. 22</li>
  <li>invalid-format (Not a Key)</li>
  <li>T9RBJ-XZHTB-6RTJW-BTB3T-RFJ3S (3 Golden Keys) — added Sept. 23; expires Oct. 1, 2025</li>
</ul>"#;
        let doc = Html::parse_document(html);
        let source = SourceConfig {
            layout: Layout::List,
            expired_hint: HintStrategy::None,
            ..table_source(vec![Section {
                heading_id: Some("all-borderlands-4-shift-codes".into()),
                game: Some("bl4".into()),
                ..Default::default()
            }])
        };
        let rows: Vec<_> = extract(&doc, &source).unwrap().collect();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].code_text, "J9XBB-KK9T3-CRTBW-BBT3T-KTBTW");
        assert_eq!(rows[0].reward_text, "1 Golden Key");
        assert_eq!(rows[0].archived_text, "Sept. 22");
        assert_eq!(rows[0].expires_text, "");
        assert_eq!(rows[1].archived_text, "Sept. 23");
        assert_eq!(rows[1].expires_text, "Oct. 1, 2025");
    }

    #[test]
    fn comma_joined_dates_are_split() {
        let html = r#"
<h2 id="all-borderlands-4-shift-codes">All Borderlands 4 SHiFT codes</h2>
<ul>
  <li>J9XBB-KK9T3-CRTBW-BBT3T-KTBTW (1 Golden Key), added Sept. 22, expires Oct. 1, 2025</li>
  <li>T9RBJ-XZHTB-6RTJW-BTB3T-RFJ3S (3 Golden Keys), expires Oct. 4, 2025, added Sept. 23</li>
</ul>"#;
        let doc = Html::parse_document(html);
        let source = SourceConfig {
            layout: Layout::List,
            expired_hint: HintStrategy::None,
            ..table_source(vec![Section {
                heading_id: Some("all-borderlands-4-shift-codes".into()),
                game: Some("bl4".into()),
                ..Default::default()
            }])
        };
        let rows: Vec<_> = extract(&doc, &source).unwrap().collect();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].reward_text, "1 Golden Key");
        assert_eq!(rows[0].archived_text, "Sept. 22");
        assert_eq!(rows[0].expires_text, "Oct. 1, 2025");
        assert_eq!(rows[1].expires_text, "Oct. 4, 2025");
        assert_eq!(rows[1].archived_text, "Sept. 23");
    }

    #[test]
    fn missing_list_heading_is_a_format_error() {
        let doc = Html::parse_document("<h2>Something else</h2><ul><li>x</li></ul>");
        let source = SourceConfig {
            layout: Layout::List,
            ..table_source(vec![Section {
                heading_id: Some("all-borderlands-4-shift-codes".into()),
                ..Default::default()
            }])
        };
        assert!(extract(&doc, &source).err().unwrap().is_format());
    }
}
