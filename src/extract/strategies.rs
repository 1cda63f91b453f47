//! Extraction strategies
//!
//! Each strategy is one independent heuristic over a parsed document. The
//! engine runs them in order, most specific first.

use crate::extract::patterns::{combined_pairs, has_both_labels, pass_values, prepare, user_values};
use crate::extract::validate::{is_valid_password, is_valid_username};
use crate::extract::{Confidence, ExtractedCredential, Extraction};
use scraper::{ElementRef, Html, Selector};

/// One extraction heuristic
pub trait ExtractionStrategy: Send + Sync {
    /// Short name used in logs and on extracted credentials
    fn name(&self) -> &'static str;

    /// Runs the heuristic against a parsed document
    fn try_extract(&self, document: &Html) -> Extraction;

    /// Fallback strategies only run when every earlier strategy found nothing,
    /// and never contribute unpaired usernames
    fn is_fallback(&self) -> bool {
        false
    }
}

/// Elements whose text holds both a USER and a PASS label
///
/// Only the innermost such elements are used, so one credential block is not
/// read again through each of its ancestors.
pub struct LabeledPairStrategy;

impl ExtractionStrategy for LabeledPairStrategy {
    fn name(&self) -> &'static str {
        "labeled_pair"
    }

    fn try_extract(&self, document: &Html) -> Extraction {
        let mut out = Extraction::default();

        for element in innermost(document, |e| has_both_labels(&element_text(e))) {
            let text = element_text(element);
            let users = user_values(&text);
            let passes = pass_values(&text);

            for (i, user) in users.iter().enumerate() {
                let pass = passes.get(i).filter(|p| is_valid_password(p));
                match pass {
                    Some(pass) if is_valid_username(user) => out.credentials.push(
                        ExtractedCredential::new(user, pass, Confidence::Labeled, self.name()),
                    ),
                    None if is_valid_username(user) => out.unpaired_usernames.push(user.clone()),
                    _ => {}
                }
            }
        }

        out
    }
}

/// The page builder's text holder blocks
pub struct ContainerClassStrategy {
    selectors: Vec<Selector>,
}

impl ContainerClassStrategy {
    pub fn new(selectors: Vec<Selector>) -> Self {
        Self { selectors }
    }
}

impl ExtractionStrategy for ContainerClassStrategy {
    fn name(&self) -> &'static str {
        "container_class"
    }

    fn try_extract(&self, document: &Html) -> Extraction {
        let mut out = Extraction::default();

        for selector in &self.selectors {
            for element in document.select(selector) {
                out.absorb(pair_scope(&prepare(&element.html()), self.name()));
            }
        }

        out
    }
}

/// Elements labeled with a literal `LOGIN`
///
/// The credential text is often injected next to a LOGIN button rather than
/// inside it, so the scope is the element, its parent, and a few siblings
/// following the parent.
pub struct LoginControlStrategy {
    lookahead: usize,
}

impl LoginControlStrategy {
    pub fn new(lookahead: usize) -> Self {
        Self { lookahead }
    }

    fn scope(&self, element: ElementRef<'_>) -> String {
        let mut scope = element.html();

        if let Some(parent) = element.parent().and_then(ElementRef::wrap) {
            scope.push('\n');
            scope.push_str(&parent.html());

            parent
                .next_siblings()
                .filter_map(ElementRef::wrap)
                .take(self.lookahead)
                .for_each(|sibling| {
                    scope.push('\n');
                    scope.push_str(&sibling.html());
                });
        }

        prepare(&scope)
    }
}

impl ExtractionStrategy for LoginControlStrategy {
    fn name(&self) -> &'static str {
        "login_control"
    }

    fn try_extract(&self, document: &Html) -> Extraction {
        let mut out = Extraction::default();

        for element in innermost(document, |e| e.html().contains("LOGIN")) {
            out.absorb(pair_scope(&self.scope(element), self.name()));
        }

        out
    }
}

/// Combined pattern over the whole markup and its visible text
pub struct DocumentFallbackStrategy;

impl ExtractionStrategy for DocumentFallbackStrategy {
    fn name(&self) -> &'static str {
        "document_fallback"
    }

    fn try_extract(&self, document: &Html) -> Extraction {
        let markup = prepare(&document.root_element().html());
        let text = element_text(document.root_element());

        let credentials = combined_pairs(&markup)
            .into_iter()
            .chain(combined_pairs(&text))
            .filter(|(user, pass)| is_valid_username(user) && is_valid_password(pass))
            .map(|(user, pass)| ExtractedCredential::new(&user, &pass, Confidence::Labeled, self.name()))
            .collect();

        Extraction {
            credentials,
            unpaired_usernames: Vec::new(),
        }
    }

    fn is_fallback(&self) -> bool {
        true
    }
}

/// Combined pattern first; positional pairing of separate lists otherwise
fn pair_scope(scope: &str, strategy: &'static str) -> Extraction {
    let combined: Vec<ExtractedCredential> = combined_pairs(scope)
        .into_iter()
        .filter(|(user, pass)| is_valid_username(user) && is_valid_password(pass))
        .map(|(user, pass)| ExtractedCredential::new(&user, &pass, Confidence::Labeled, strategy))
        .collect();

    if !combined.is_empty() {
        return Extraction {
            credentials: combined,
            unpaired_usernames: Vec::new(),
        };
    }

    let users: Vec<String> = user_values(scope)
        .into_iter()
        .filter(|u| is_valid_username(u))
        .collect();
    let passes: Vec<String> = pass_values(scope)
        .into_iter()
        .filter(|p| is_valid_password(p))
        .collect();

    pair_positionally(users, passes, strategy)
}

/// Pairs index i with index i; with unequal counts every value of the longer
/// list is paired with the first value of the shorter one
fn pair_positionally(users: Vec<String>, passes: Vec<String>, strategy: &'static str) -> Extraction {
    if passes.is_empty() {
        return Extraction {
            credentials: Vec::new(),
            unpaired_usernames: users,
        };
    }
    if users.is_empty() {
        return Extraction::default();
    }

    let credentials = if users.len() == passes.len() {
        users
            .iter()
            .zip(&passes)
            .map(|(u, p)| ExtractedCredential::new(u, p, Confidence::Positional, strategy))
            .collect()
    } else if users.len() > passes.len() {
        users
            .iter()
            .map(|u| ExtractedCredential::new(u, &passes[0], Confidence::Mismatched, strategy))
            .collect()
    } else {
        passes
            .iter()
            .map(|p| ExtractedCredential::new(&users[0], p, Confidence::Mismatched, strategy))
            .collect()
    };

    Extraction {
        credentials,
        unpaired_usernames: Vec::new(),
    }
}

/// Visible text of an element, one line per text node
fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join("\n")
}

/// Elements matching `predicate` none of whose child elements match it
///
/// `predicate` must be monotone: if an element matches, so does its parent.
fn innermost<'a, F>(document: &'a Html, predicate: F) -> Vec<ElementRef<'a>>
where
    F: Fn(ElementRef<'a>) -> bool,
{
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| !matches!(e.value().name(), "script" | "style" | "head"))
        .filter(|e| predicate(*e))
        .filter(|e| !e.children().filter_map(ElementRef::wrap).any(|c| predicate(c)))
        .collect()
}
