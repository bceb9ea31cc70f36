//! Visual expiry cues.

use scraper::ElementRef;

use crate::config::HintStrategy;

/// Whether the row carries a visual "this code is dead" cue.
pub fn expired_hint(row: ElementRef<'_>, strategy: HintStrategy) -> bool {
    match strategy {
        HintStrategy::Strikethrough => is_struck_through(row),
        HintStrategy::None => false,
    }
}

/// `<s>`, `<del>`, `<strike>`, or an inline `line-through` style anywhere
/// in the element, the element itself included.
fn is_struck_through(row: ElementRef<'_>) -> bool {
    row.descendants().filter_map(ElementRef::wrap).any(|el| {
        let value = el.value();
        matches!(value.name(), "s" | "del" | "strike")
            || value
                .attr("style")
                .is_some_and(|style| style.to_ascii_lowercase().contains("line-through"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn first_row(html: &str) -> Html {
        Html::parse_document(html)
    }

    fn check(html: &str, strategy: HintStrategy) -> bool {
        let doc = first_row(html);
        let selector = Selector::parse("tr").unwrap();
        let row = doc.select(&selector).next().unwrap();
        expired_hint(row, strategy)
    }

    #[test]
    fn strike_tags_mark_expired() {
        for tag in ["s", "del", "strike"] {
            let html = format!("<table><tr><td><{tag}>ABCDE</{tag}></td></tr></table>");
            assert!(check(&html, HintStrategy::Strikethrough), "<{tag}>");
        }
    }

    #[test]
    fn inline_style_marks_expired() {
        let html = r#"<table><tr style="color: grey; TEXT-DECORATION: Line-Through"><td>X</td></tr></table>"#;
        assert!(check(html, HintStrategy::Strikethrough));
    }

    #[test]
    fn plain_row_and_disabled_strategy() {
        assert!(!check("<table><tr><td>ABCDE</td></tr></table>", HintStrategy::Strikethrough));
        assert!(!check("<table><tr><td><s>ABCDE</s></td></tr></table>", HintStrategy::None));
    }
}
