//! Heuristic extraction of obligation records from a results page.
//!
//! The results markup changes without notice, so nothing here depends on one
//! exact layout. Each field is read through an ordered list of selectors and
//! the first one that yields something wins:
//!
//! 1. Split the page into cards (first card selector with any match; else
//!    one card per heading; the whole page if it has no headings)
//! 2. Per card: title, regulator, explicit level label, first usable link
//! 3. Drop cards with no title, regulator or link
//! 4. Infer a level when the card carries no label
//! 5. Deduplicate

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use tracing::debug;
use url::Url;

use crate::error::{ConfigError, ConfigResult};
use crate::pipeline::dedupe::dedupe;
use crate::pipeline::group::is_council_name;
use crate::types::config::{MarkupPatterns, DEFAULT_SITE_ORIGIN};
use crate::types::record::ObligationRecord;

/// [`MarkupPatterns`] with every selector parsed.
#[derive(Debug, Clone)]
pub struct CompiledPatterns {
    cards: Vec<Selector>,
    titles: Vec<Selector>,
    regulators: Vec<Selector>,
    levels: Vec<Selector>,
    links: Vec<Selector>,
}

impl CompiledPatterns {
    pub fn compile(patterns: &MarkupPatterns) -> ConfigResult<Self> {
        Ok(Self {
            cards: compile_all(&patterns.cards)?,
            titles: compile_all(&patterns.titles)?,
            regulators: compile_all(&patterns.regulators)?,
            levels: compile_all(&patterns.levels)?,
            links: compile_all(&patterns.links)?,
        })
    }
}

fn compile_all(selectors: &[String]) -> ConfigResult<Vec<Selector>> {
    selectors
        .iter()
        .map(|s| {
            Selector::parse(s).map_err(|e| ConfigError::InvalidSelector {
                selector: s.clone(),
                reason: format!("{:?}", e),
            })
        })
        .collect()
}

/// Turns results pages into obligation records.
#[derive(Debug, Clone)]
pub struct Extractor {
    patterns: CompiledPatterns,
    origin: Url,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(&MarkupPatterns::default(), DEFAULT_SITE_ORIGIN)
            .expect("default markup patterns are valid")
    }
}

impl Extractor {
    /// Create an extractor for a site.
    ///
    /// `site_origin` is the base that site-relative links are resolved against.
    pub fn new(patterns: &MarkupPatterns, site_origin: &str) -> ConfigResult<Self> {
        let origin = Url::parse(site_origin).map_err(|e| ConfigError::InvalidOrigin {
            origin: site_origin.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            patterns: CompiledPatterns::compile(patterns)?,
            origin,
        })
    }

    /// Extract deduplicated records from a results page.
    ///
    /// Every record carries `activity` and `postcode` from the query that
    /// produced the page.
    pub fn extract(&self, markup: &str, activity: &str, postcode: &str) -> Vec<ObligationRecord> {
        let document = Html::parse_document(markup);
        let root = document.root_element();

        let cards = self
            .patterns
            .cards
            .iter()
            .map(|selector| root.select(selector).collect::<Vec<_>>())
            .find(|found| !found.is_empty())
            .unwrap_or_else(|| {
                let cards = self.heading_cards(root);
                if cards.is_empty() {
                    vec![root]
                } else {
                    cards
                }
            });

        let card_count = cards.len();
        let records: Vec<ObligationRecord> = cards
            .into_iter()
            .filter_map(|card| self.extract_card(card, activity, postcode))
            .collect();

        debug!(
            activity = %activity,
            cards = card_count,
            records = records.len(),
            "Extracted records from results page"
        );

        dedupe(records)
    }

    fn extract_card(
        &self,
        card: ElementRef<'_>,
        activity: &str,
        postcode: &str,
    ) -> Option<ObligationRecord> {
        let title = first_text(card, &self.patterns.titles);
        let regulator = first_text(card, &self.patterns.regulators);
        let level = first_text(card, &self.patterns.levels).or_else(|| {
            infer_level(regulator.as_deref(), title.as_deref()).map(str::to_string)
        });

        let record = ObligationRecord {
            level,
            regulator,
            obligation: title,
            source_url: self.first_link(card),
            activity: activity.to_string(),
            postcode: postcode.to_string(),
        };
        record.is_identifiable().then_some(record)
    }

    /// Split a page with no recognised card wrapper on its headings.
    ///
    /// A heading's card is its largest enclosing element holding no other
    /// heading. Each title selector proposes a split; the one whose cards
    /// carry the most regulators wins, then the one with the most cards, so a
    /// lone page banner never outranks a list of results. Empty when the page
    /// has no headings at all.
    fn heading_cards<'a>(&self, root: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        let mut headings: Vec<ElementRef<'a>> = Vec::new();
        for heading in self.patterns.titles.iter().flat_map(|s| root.select(s)) {
            if !headings.contains(&heading) {
                headings.push(heading);
            }
        }
        // Titles nested inside another title (a link in an h3) are not headings
        let outermost: Vec<ElementRef<'a>> = headings
            .iter()
            .copied()
            .filter(|h| {
                !h.ancestors()
                    .filter_map(ElementRef::wrap)
                    .any(|a| headings.contains(&a))
            })
            .collect();

        let mut best: Option<((usize, usize), Vec<ElementRef<'a>>)> = None;
        for selector in &self.patterns.titles {
            let mut cards: Vec<ElementRef<'a>> = Vec::new();
            for heading in root.select(selector) {
                let card = enclosing_card(heading, &outermost);
                if !cards.contains(&card) {
                    cards.push(card);
                }
            }
            if cards.is_empty() {
                continue;
            }

            let with_regulator = cards
                .iter()
                .filter(|card| first_text(**card, &self.patterns.regulators).is_some())
                .count();
            let score = (with_regulator, cards.len());
            if best.as_ref().map_or(true, |(top, _)| score > *top) {
                best = Some((score, cards));
            }
        }

        best.map(|(_, cards)| cards).unwrap_or_default()
    }

    fn first_link(&self, card: ElementRef<'_>) -> Option<String> {
        self.patterns.links.iter().find_map(|selector| {
            card.select(selector)
                .filter_map(|a| a.value().attr("href"))
                .find_map(|href| self.absolutize(href))
        })
    }

    /// Resolve an href against the site origin, skipping non-page links.
    fn absolutize(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
        {
            return None;
        }
        self.origin.join(href).ok().map(|url| url.to_string())
    }
}

/// Widen `heading` while the parent holds no other heading.
fn enclosing_card<'a>(heading: ElementRef<'a>, headings: &[ElementRef<'a>]) -> ElementRef<'a> {
    let mut card = heading;
    while let Some(parent) = card.parent().and_then(ElementRef::wrap) {
        let held = parent
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|element| headings.contains(element))
            .count();
        if held > 1 {
            break;
        }
        card = parent;
    }
    card
}

/// Cleaned text of the first element matched by the first selector that
/// matches anything with text.
fn first_text(scope: ElementRef<'_>, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|selector| {
        scope
            .select(selector)
            .map(element_text)
            .find(|text| !text.is_empty())
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"))
}

/// Strip tags, decode common entities and collapse whitespace.
pub fn clean_text(raw: &str) -> String {
    let stripped = tag_pattern().replace_all(raw, " ");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Guess a level for a card that carries no explicit label.
///
/// Council-style regulator names mean `local`; otherwise the title is checked
/// for "state", then "commonwealth"/"federal". This can misclassify (a title
/// can say "state" in an unrelated sense); the guess is not authoritative.
pub fn infer_level(regulator: Option<&str>, title: Option<&str>) -> Option<&'static str> {
    if regulator.is_some_and(is_council_name) {
        return Some("local");
    }
    let title = title?.to_lowercase();
    if title.contains("state") {
        Some("state")
    } else if title.contains("commonwealth") || title.contains("federal") {
        Some("federal")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(markup: &str) -> Vec<ObligationRecord> {
        Extractor::default().extract(markup, "Cafe", "3066")
    }

    #[test]
    fn test_single_card_with_relative_link() {
        let markup = r#"
            <div class="result-card">
                <h3>Food business registration</h3>
                <span class="regulator">Department of Health</span>
                <a href="/x">Details</a>
            </div>
        "#;

        let records = extract(markup);

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.obligation.as_deref(), Some("Food business registration"));
        assert_eq!(record.regulator.as_deref(), Some("Department of Health"));
        assert_eq!(
            record.source_url.as_deref(),
            Some("https://ablis.business.gov.au/x")
        );
        assert_eq!(record.level, None);
        assert_eq!(record.activity, "Cafe");
        assert_eq!(record.postcode, "3066");
    }

    #[test]
    fn test_bare_fragment_is_one_segment() {
        let markup = r#"<h3>Food business registration</h3>
            <span class="regulator">Department of Health</span>
            <a href="/x">Details</a>"#;

        let records = extract(markup);

        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].source_url.as_deref(),
            Some("https://ablis.business.gov.au/x")
        );
    }

    #[test]
    fn test_unrecognised_cards_split_on_headings() {
        let markup = r#"<!DOCTYPE html>
            <html><body>
              <header>
                <h2>Find licences for your business</h2>
                <nav><a href="/about">About</a></nav>
              </header>
              <main>
                <div class="obl-row">
                  <h3>Food Act registration</h3>
                  <span class="regulator-name">City of Yarra</span>
                  <a href="/licence/food-act">More</a>
                </div>
                <div class="obl-row">
                  <h3>Liquor licence</h3>
                  <span class="regulator-name">Liquor Control Victoria</span>
                  <a href="/licence/liquor">More</a>
                </div>
              </main>
            </body></html>"#;

        let records = extract(markup);

        let titles: Vec<_> = records.iter().filter_map(|r| r.obligation.as_deref()).collect();
        assert_eq!(titles, vec!["Food Act registration", "Liquor licence"]);
        assert_eq!(
            records[0].source_url.as_deref(),
            Some("https://ablis.business.gov.au/licence/food-act")
        );
        assert_eq!(records[0].level.as_deref(), Some("local"));
        assert_eq!(
            records[1].regulator.as_deref(),
            Some("Liquor Control Victoria")
        );
        assert!(records
            .iter()
            .all(|r| r.source_url.as_deref() != Some("https://ablis.business.gov.au/about")));
    }

    #[test]
    fn test_explicit_level_label_wins() {
        let markup = r#"
            <article class="result">
                <h2>Liquor licence</h2>
                <div class="agency-name">Liquor &amp; Gaming NSW</div>
                <span class="jurisdiction-level">State / Territory</span>
            </article>
        "#;

        let records = extract(markup);

        assert_eq!(records[0].level.as_deref(), Some("State / Territory"));
        assert_eq!(records[0].regulator.as_deref(), Some("Liquor & Gaming NSW"));
    }

    #[test]
    fn test_council_regulator_infers_local() {
        let markup = r#"
            <div class="card">
                <h3>Footpath trading permit</h3>
                <p class="regulator">Yarra City Council</p>
            </div>
        "#;

        assert_eq!(extract(markup)[0].level.as_deref(), Some("local"));
    }

    #[test]
    fn test_title_keywords_infer_state_then_federal() {
        assert_eq!(infer_level(None, Some("State food licence")), Some("state"));
        assert_eq!(
            infer_level(Some("ATO"), Some("Commonwealth ABN registration")),
            Some("federal")
        );
        assert_eq!(infer_level(None, Some("Federal excise")), Some("federal"));
        assert_eq!(infer_level(Some("Shire of Broome"), Some("State licence")), Some("local"));
        assert_eq!(infer_level(None, None), None);
    }

    #[test]
    fn test_title_with_unrelated_state_is_accepted_misclassification() {
        // "statement" contains "state"; the heuristic classifies it as state.
        assert_eq!(
            infer_level(Some("ASIC"), Some("Annual statement lodgement")),
            Some("state")
        );
    }

    #[test]
    fn test_noise_cards_discarded() {
        let markup = r#"
            <div class="card"><p>Sponsored</p></div>
            <div class="card"><h3>Business name registration</h3></div>
        "#;

        let records = extract(markup);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].obligation.as_deref(), Some("Business name registration"));
    }

    #[test]
    fn test_first_matching_card_selector_wins() {
        let markup = r#"
            <li class="search-result"><h3>A</h3></li>
            <li class="search-result"><h3>B</h3></li>
            <article class="promo"><h3>Promo</h3></article>
        "#;

        let titles: Vec<_> = extract(markup)
            .into_iter()
            .filter_map(|r| r.obligation)
            .collect();

        // "article.result" and "div.result-card" miss, "li.search-result" hits
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[test]
    fn test_skips_unusable_links() {
        let markup = r##"
            <div class="card">
                <h3>Permit</h3>
                <a href="#top">Top</a>
                <a href="javascript:void(0)">Share</a>
                <a href="https://www.vic.gov.au/permit">Apply</a>
            </div>
        "##;

        assert_eq!(
            extract(markup)[0].source_url.as_deref(),
            Some("https://www.vic.gov.au/permit")
        );
    }

    #[test]
    fn test_duplicate_cards_collapse() {
        let markup = r#"
            <div class="card"><h3>Permit</h3><a href="/p">x</a></div>
            <div class="card"><h3>Permit</h3><a href="/p">y</a></div>
        "#;

        assert_eq!(extract(markup).len(), 1);
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Food \n\t <b>business</b>&nbsp;licence "), "Food business licence");
        assert_eq!(clean_text("   "), "");
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let patterns = MarkupPatterns {
            cards: vec!["div[".to_string()],
            ..Default::default()
        };
        let result = Extractor::new(&patterns, DEFAULT_SITE_ORIGIN);
        assert!(matches!(result, Err(ConfigError::InvalidSelector { .. })));
    }

    #[test]
    fn test_invalid_origin_rejected() {
        let result = Extractor::new(&MarkupPatterns::default(), "not a url");
        assert!(matches!(result, Err(ConfigError::InvalidOrigin { .. })));
    }

    #[test]
    fn test_substitute_patterns() {
        let patterns = MarkupPatterns {
            cards: vec!["section.obligation".to_string()],
            titles: vec!["b.name".to_string()],
            regulators: vec!["i.by".to_string()],
            levels: vec!["u.tier".to_string()],
            links: vec!["a[href]".to_string()],
        };
        let extractor = Extractor::new(&patterns, "https://search.test").unwrap();
        let markup = r#"<section class="obligation"><b class="name">Waste permit</b>
            <i class="by">EPA</i><u class="tier">state</u><a href="waste">go</a></section>"#;

        let records = extractor.extract(markup, "Recycling", "5000");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level.as_deref(), Some("state"));
        assert_eq!(records[0].source_url.as_deref(), Some("https://search.test/waste"));
    }
}
