use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

use super::probe;
use crate::browser::{BrowserError, Page};
use crate::clock::Clock;
use crate::models::{CommentRecord, CommentSource};

/// Candidate comment containers, most specific first
pub const COMMENT_SELECTORS: &[&str] = &[
    ".sm-comments .sm-comment",
    ".comments .comment",
    ".sm-user-ui-comments .sm-user-ui-comment",
    r#"[class*="comment"]"#,
    r#"[id*="comment"]"#,
    ".sm-comment",
    ".sm-comments",
    r#"div[class*="user"]"#,
    r#"div[class*="message"]"#,
    r#"span[class*="comment"]"#,
    r#"p[class*="comment"]"#,
];

/// Page-text lines this short are never treated as comments
const MIN_LINE_LEN: usize = 10;

/// How the reviewer's name is looked for in text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Full name or any name part as a whole word, ignoring case
    #[default]
    WholeWord,
    /// Full name or any name part anywhere, ignoring case
    Substring,
}

/// Decides whether a piece of text mentions the reviewer
#[derive(Debug, Clone)]
pub struct ReviewerMatcher {
    name: String,
    /// `None` when no name is configured; matches nothing
    pattern: Option<Regex>,
}

impl ReviewerMatcher {
    pub fn new(name: &str, mode: MatchMode) -> Result<Self, regex::Error> {
        let name = name.split_whitespace().collect::<Vec<_>>().join(" ");

        let mut variants = vec![name.to_lowercase()];
        for part in name.split(' ') {
            let part = part.to_lowercase();
            if !variants.contains(&part) {
                variants.push(part);
            }
        }
        variants.retain(|v| !v.is_empty());

        let alternatives = variants
            .iter()
            .map(|v| regex::escape(v))
            .collect::<Vec<_>>()
            .join("|");

        let pattern = if alternatives.is_empty() {
            None
        } else {
            Some(match mode {
                MatchMode::WholeWord => Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives))?,
                MatchMode::Substring => Regex::new(&format!(r"(?i)(?:{})", alternatives))?,
            })
        };

        Ok(Self { name, pattern })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self, text: &str) -> bool {
        self.pattern.as_ref().is_some_and(|p| p.is_match(text))
    }
}

/// Finds the reviewer's comments on the current lightbox view
pub struct CommentExtractor {
    matcher: ReviewerMatcher,
    selectors: Vec<String>,
    settle: Duration,
}

impl CommentExtractor {
    pub fn new(matcher: ReviewerMatcher) -> Self {
        Self {
            matcher,
            selectors: COMMENT_SELECTORS.iter().map(|s| s.to_string()).collect(),
            settle: Duration::ZERO,
        }
    }

    /// Wait this long before reading, for the comment panel to load
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_selectors(mut self, selectors: Vec<String>) -> Self {
        self.selectors = selectors;
        self
    }

    pub fn matcher(&self) -> &ReviewerMatcher {
        &self.matcher
    }

    pub fn selectors(&self) -> &[String] {
        &self.selectors
    }

    pub fn extract<P, C>(&self, page: &P, clock: &C) -> Result<Vec<CommentRecord>, BrowserError>
    where
        P: Page + ?Sized,
        C: Clock + ?Sized,
    {
        clock.sleep(self.settle);

        let page_text = page.body_text()?;
        if !self.matcher.matches(&page_text) {
            log::debug!("    No comments from {} found", self.matcher.name());
            return Ok(Vec::new());
        }
        log::info!("    Found a mention of {}", self.matcher.name());

        let comments = match probe::first_match(page, self.selectors.as_slice(), |el| self.matcher.matches(&el.text)) {
            Some(hit) => {
                log::info!(
                    "    Found {} comment element(s) using selector: {}",
                    hit.elements.len(),
                    hit.selector
                );
                let source = CommentSource::Selector(hit.selector.to_string());
                self.records(hit.elements.iter().map(|el| el.text.as_str()), source)
            }
            None => {
                log::debug!("    Searching page text for comments...");
                self.records(self.matching_lines(&page_text), CommentSource::TextSearch)
            }
        };

        log::info!("    Found {} comment(s) from {}", comments.len(), self.matcher.name());
        Ok(comments)
    }

    /// Page-text lines long enough to be a comment that mention the reviewer
    pub fn matching_lines<'t>(&self, text: &'t str) -> Vec<&'t str> {
        text.lines()
            .map(str::trim)
            .filter(|line| line.chars().count() > MIN_LINE_LEN && self.matcher.matches(line))
            .collect()
    }

    fn records<'t, I>(&self, texts: I, source: CommentSource) -> Vec<CommentRecord>
    where
        I: IntoIterator<Item = &'t str>,
    {
        let mut seen = HashSet::new();
        texts
            .into_iter()
            .map(str::trim)
            .filter(|text| !text.is_empty() && seen.insert(text.to_string()))
            .map(|text| CommentRecord {
                author: self.matcher.name().to_string(),
                text: text.to_string(),
                timestamp: None,
                source: source.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{Snapshot, SnapshotPage};
    use crate::clock::ManualClock;

    fn matcher(mode: MatchMode) -> ReviewerMatcher {
        ReviewerMatcher::new("Clair Polleti", mode).unwrap()
    }

    fn page(body: &str) -> SnapshotPage {
        SnapshotPage::new(vec![Snapshot::new(
            "https://example.smugmug.com/g/i-abc",
            format!("<html><body>{}</body></html>", body),
        )])
    }

    #[test]
    fn test_matcher_variants() {
        let m = matcher(MatchMode::WholeWord);
        assert!(m.matches("Clair Polleti said: great shot"));
        assert!(m.matches("clair: this one"));
        assert!(m.matches("POLLETI"));
        assert!(!m.matches("Claire loved the light"));
        assert!(!m.matches("nothing here"));
    }

    #[test]
    fn test_substring_mode_is_looser() {
        let m = matcher(MatchMode::Substring);
        assert!(m.matches("Claire loved the light"));
        assert!(!m.matches("nothing here"));
    }

    #[test]
    fn test_empty_name_matches_nothing() {
        let m = ReviewerMatcher::new("   ", MatchMode::Substring).unwrap();
        assert!(!m.matches("anything at all"));
    }

    #[test]
    fn test_structured_extraction() {
        let page = page(
            r#"<div class="sm-comments">
                 <div class="sm-comment">Clair Polleti said: great shot</div>
                 <div class="sm-comment">Someone else: meh</div>
               </div>"#,
        );
        let extractor = CommentExtractor::new(matcher(MatchMode::WholeWord));
        let comments = extractor.extract(&page, &ManualClock::new()).unwrap();

        assert_eq!(comments.len(), 1);
        assert!(comments[0].text.contains("great shot"));
        assert_eq!(comments[0].author, "Clair Polleti");
        assert_eq!(
            comments[0].source,
            CommentSource::Selector(".sm-comments .sm-comment".to_string())
        );
    }

    #[test]
    fn test_no_mention_means_no_comments() {
        let page = page(r#"<div class="sm-comment">Lovely colours in this one</div>"#);
        let extractor = CommentExtractor::new(matcher(MatchMode::WholeWord));
        assert!(extractor.extract(&page, &ManualClock::new()).unwrap().is_empty());
    }

    #[test]
    fn test_text_fallback_keeps_long_lines() {
        let page = page("<p>Clair</p><p>Clair Polleti: print this large</p><p>other text</p>");
        let extractor = CommentExtractor::new(matcher(MatchMode::WholeWord));
        let comments = extractor.extract(&page, &ManualClock::new()).unwrap();

        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].text, "Clair Polleti: print this large");
        assert_eq!(comments[0].source, CommentSource::TextSearch);
    }

    #[test]
    fn test_duplicate_texts_recorded_once() {
        let page = page(
            r#"<div class="comment-wrap"><span class="comment-body">Clair Polleti: yes</span></div>
               <span class="comment-body">Clair Polleti: yes</span>"#,
        );
        let extractor = CommentExtractor::new(matcher(MatchMode::WholeWord))
            .with_selectors(vec![r#"span[class*="comment"]"#.to_string()]);
        let comments = extractor.extract(&page, &ManualClock::new()).unwrap();
        assert_eq!(comments.len(), 1);
    }

    #[test]
    fn test_settle_goes_through_clock() {
        let page = page("<p>nothing</p>");
        let clock = ManualClock::new();
        let extractor =
            CommentExtractor::new(matcher(MatchMode::WholeWord)).with_settle(Duration::from_secs(3));
        extractor.extract(&page, &clock).unwrap();
        assert_eq!(clock.elapsed(), Duration::from_secs(3));
    }
}
