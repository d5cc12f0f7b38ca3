//! Pulling recordings out of a rendered listing page.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};

use crate::error::InteractionError;
use crate::recording::{RawRecording, collapse_whitespace};
use crate::settings::SelectorLists;

/// Turns a listing page into raw recordings.
///
/// Swappable so page-layout heuristics can change without touching the
/// session or the orchestrator.
pub trait ExtractionStrategy: Send + Sync {
    fn extract(&self, html: &str) -> Vec<RawRecording>;
}

/// Selector lists tried in priority order; the first selector with a match wins.
///
/// Selectors are validated up front and re-parsed per page.
#[derive(Debug, Clone, Default)]
pub struct SelectorCascade {
    lists: SelectorLists,
}

impl SelectorCascade {
    pub fn new(lists: SelectorLists) -> Result<Self, InteractionError> {
        for selector in lists
            .items
            .iter()
            .chain(&lists.title)
            .chain(&lists.date)
            .chain(&lists.summary)
        {
            Selector::parse(selector).map_err(|e| InteractionError::Selector {
                selector: selector.clone(),
                message: e.to_string(),
            })?;
        }
        Ok(Self { lists })
    }

    pub fn lists(&self) -> &SelectorLists {
        &self.lists
    }
}

fn parse_all(list: &[String]) -> Vec<Selector> {
    list.iter().filter_map(|s| Selector::parse(s).ok()).collect()
}

/// Text of the first element matched by the first selector that matches.
fn first_text(scope: ElementRef<'_>, cascade: &[Selector]) -> Option<String> {
    cascade.iter().find_map(|selector| {
        scope
            .select(selector)
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .find(|text| !text.is_empty())
    })
}

fn attr(element: ElementRef<'_>, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl ExtractionStrategy for SelectorCascade {
    fn extract(&self, html: &str) -> Vec<RawRecording> {
        let document = Html::parse_document(html);
        let items = parse_all(&self.lists.items);
        let title = parse_all(&self.lists.title);
        let date = parse_all(&self.lists.date);
        let summary = parse_all(&self.lists.summary);

        let Some(matched) = items
            .iter()
            .map(|selector| document.select(selector).collect::<Vec<_>>())
            .find(|found| !found.is_empty())
        else {
            tracing::debug!("No recording items matched on page");
            return Vec::new();
        };

        // Document order puts ancestors first; skip anything nested in a taken item.
        let mut taken = HashSet::new();
        let mut results = Vec::new();
        for element in matched {
            if element.ancestors().any(|a| taken.contains(&a.id())) {
                continue;
            }
            taken.insert(element.id());

            let raw = RawRecording {
                source_id: attr(element, "data-id").or_else(|| attr(element, "id")),
                title: first_text(element, &title),
                date: first_text(element, &date),
                summary: first_text(element, &summary),
            };
            if raw.is_empty() {
                continue;
            }
            results.push(raw);
        }

        tracing::debug!(count = results.len(), "Extracted recording items");
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
          <ul>
            <li class="file-item" data-id="rec-1">
              <h3 class="file-title">Standup</h3>
              <span class="date">2024-01-01</span>
              <p class="summary">Discussed   the
                 roadmap</p>
            </li>
            <li class="file-item" id="rec-2">
              <div class="name">1:1</div>
              <time>2024-01-02</time>
            </li>
            <li class="file-item"><span class="file-icon"></span></li>
          </ul>
        </body></html>
    "#;

    #[test]
    fn test_extracts_items_in_document_order() {
        let found = SelectorCascade::default().extract(LISTING);
        assert_eq!(found.len(), 2);

        assert_eq!(found[0].source_id.as_deref(), Some("rec-1"));
        assert_eq!(found[0].title.as_deref(), Some("Standup"));
        assert_eq!(found[0].date.as_deref(), Some("2024-01-01"));
        assert_eq!(found[0].summary.as_deref(), Some("Discussed the roadmap"));

        assert_eq!(found[1].source_id.as_deref(), Some("rec-2"));
        assert_eq!(found[1].title.as_deref(), Some("1:1"));
        assert_eq!(found[1].date.as_deref(), Some("2024-01-02"));
        assert_eq!(found[1].summary, None);
    }

    #[test]
    fn test_higher_priority_selector_wins() {
        let html = r#"
            <div class="recording-item" data-id="a"><span class="title">A</span></div>
            <div class="note-item" data-id="b"><span class="title">B</span></div>
        "#;
        let found = SelectorCascade::default().extract(html);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].source_id.as_deref(), Some("a"));
    }

    #[test]
    fn test_title_cascade_prefers_earlier_selector() {
        let html = r#"
            <div data-recording data-id="x">
              <h4>Fallback heading</h4>
              <span class="recording-title">Real title</span>
            </div>
        "#;
        let found = SelectorCascade::default().extract(html);
        assert_eq!(found[0].title.as_deref(), Some("Real title"));
    }

    #[test]
    fn test_nested_matches_are_ignored() {
        let html = r#"
            <div class="recording-card" data-id="outer">
              <div class="recording-meta"><span class="title">Outer</span></div>
            </div>
        "#;
        let found = SelectorCascade::default().extract(html);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].source_id.as_deref(), Some("outer"));
    }

    #[test]
    fn test_no_items_yields_empty() {
        let found = SelectorCascade::default().extract("<html><body><p>Nothing</p></body></html>");
        assert!(found.is_empty());
    }

    #[test]
    fn test_custom_lists_are_used() {
        let lists = SelectorLists {
            items: vec!["article.memo".to_string()],
            title: vec!["header".to_string()],
            date: vec!["[data-when]".to_string()],
            summary: vec!["section".to_string()],
        };
        let html = r#"
            <article class="memo" data-id="m1">
              <header>Memo</header><b data-when>Jan 5, 2024</b><section>Body</section>
            </article>
        "#;
        let found = SelectorCascade::new(lists).unwrap().extract(html);
        assert_eq!(
            found,
            vec![RawRecording {
                source_id: Some("m1".to_string()),
                title: Some("Memo".to_string()),
                date: Some("Jan 5, 2024".to_string()),
                summary: Some("Body".to_string()),
            }]
        );
    }

    #[test]
    fn test_invalid_selector_is_rejected() {
        let lists = SelectorLists {
            items: vec!["[[".to_string()],
            ..SelectorLists::default()
        };
        let err = SelectorCascade::new(lists).unwrap_err();
        assert!(matches!(err, InteractionError::Selector { selector, .. } if selector == "[["));
    }

    #[test]
    fn test_default_lists_all_parse() {
        assert!(SelectorCascade::new(SelectorLists::default()).is_ok());
    }
}
