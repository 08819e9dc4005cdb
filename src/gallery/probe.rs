//! Ranked selector probing.
//!
//! Page structure on the gallery host is guessed, not known, so every lookup
//! is a list of selectors tried in order. A selector that fails to run (bad
//! syntax for the backend, script error) counts as a miss.

use crate::browser::{ElementInfo, Page};

/// Elements kept from the first selector that produced any
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeHit<'s> {
    pub selector: &'s str,
    pub elements: Vec<ElementInfo>,
}

/// Try `selectors` in order and return the first one with at least one
/// element passing `keep`, along with all of its elements that pass.
pub fn first_match<'s, P, S, F>(page: &P, selectors: &'s [S], mut keep: F) -> Option<ProbeHit<'s>>
where
    P: Page + ?Sized,
    S: AsRef<str>,
    F: FnMut(&ElementInfo) -> bool,
{
    for selector in selectors {
        let selector = selector.as_ref();
        let elements = match page.query_all(selector) {
            Ok(elements) => elements,
            Err(e) => {
                log::debug!("Probe {} failed: {}", selector, e);
                continue;
            }
        };

        let kept: Vec<ElementInfo> = elements.into_iter().filter(|el| keep(el)).collect();
        if !kept.is_empty() {
            return Some(ProbeHit {
                selector,
                elements: kept,
            });
        }
    }
    None
}

/// First selector matching anything at all
pub fn first_present<'s, P, S>(page: &P, selectors: &'s [S]) -> Option<&'s str>
where
    P: Page + ?Sized,
    S: AsRef<str>,
{
    first_match(page, selectors, |_| true).map(|hit| hit.selector)
}

/// Element count per selector, for diagnostics
pub fn survey<P, S>(page: &P, selectors: &[S]) -> Vec<(String, Option<usize>)>
where
    P: Page + ?Sized,
    S: AsRef<str>,
{
    selectors
        .iter()
        .map(|s| (s.as_ref().to_string(), page.count(s.as_ref()).ok()))
        .collect()
}
