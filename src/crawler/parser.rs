//! HTML parser for search result pages and listing detail pages
//!
//! This module handles extracting:
//! - Listing stubs from a page of search results
//! - Description, meta, apply URL and logo URL from a detail page

use crate::description::Fragment;
use crate::listing::Listing;
use chrono::NaiveDate;
use scraper::{ElementRef, Html, Node, Selector};
use thiserror::Error;

/// Errors raised while reading a fetched page
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Missing {element} in {context}")]
    MissingElement {
        element: &'static str,
        context: String,
    },

    #[error("Invalid {field} '{value}' in {context}")]
    InvalidValue {
        field: &'static str,
        value: String,
        context: String,
    },
}

/// Listing stubs extracted from one search page
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    /// Number of result items on the page, well-formed or not
    pub item_count: usize,

    pub stubs: Vec<Listing>,
}

impl SearchPage {
    /// An empty page means the search has no more results
    pub fn is_end_of_results(&self) -> bool {
        self.item_count == 0
    }
}

/// Fields read from a listing's detail page
#[derive(Debug, Clone)]
pub struct DetailPage {
    /// Contents of the description container
    pub description: Fragment,

    /// Digits of the applicant caption
    pub applicants: String,

    /// Relative posting age, e.g. "2 days"
    pub posted_ago: String,

    /// External apply URL, when the page carries one
    pub apply_url: Option<String>,

    pub logo_url: Option<String>,
}

impl DetailPage {
    /// Formats the listing's meta line
    pub fn meta(&self) -> String {
        format!("{} applicants - {}", self.applicants, self.posted_ago)
    }
}

/// Parses a page of search results
///
/// Every `<li>` is a result card. Cards missing any required field are
/// skipped with a warning; they still count towards `item_count` so a page
/// of broken cards is not mistaken for the end of results.
pub fn parse_search_page(document: &Html) -> SearchPage {
    let Ok(item_selector) = Selector::parse("li") else {
        return SearchPage::default();
    };

    let mut page = SearchPage::default();
    for item in document.select(&item_selector) {
        page.item_count += 1;
        match parse_search_card(item) {
            Ok(stub) => page.stubs.push(stub),
            Err(e) => tracing::warn!("Skipping search result: {}", e),
        }
    }

    page
}

fn parse_search_card(card: ElementRef<'_>) -> Result<Listing, ParseError> {
    const CONTEXT: &str = "search result card";

    let urn = select_first(card, "div.base-card")
        .and_then(|base| base.value().attr("data-entity-urn"))
        .ok_or_else(|| missing("data-entity-urn", CONTEXT))?;
    let raw_id = urn.rsplit(':').next().unwrap_or(urn);
    let id = raw_id
        .trim()
        .parse::<i64>()
        .map_err(|_| invalid("listing id", urn, CONTEXT))?;

    let context = format!("search result card {}", id);
    let title = required_text(card, ".base-search-card__title", "title", &context)?;
    let company = required_text(card, ".base-search-card__subtitle", "company", &context)?;
    let location = required_text(card, ".job-search-card__location", "location", &context)?;

    let datetime = select_first(card, "time")
        .and_then(|time| time.value().attr("datetime"))
        .ok_or_else(|| missing("posting date", &context))?;
    let date_created = NaiveDate::parse_from_str(datetime.trim(), "%Y-%m-%d")
        .map_err(|_| invalid("posting date", datetime, &context))?;

    Ok(Listing::stub(id, title, company, location, date_created))
}

/// Parses a listing's detail page
///
/// The description container, the applicant caption and the posting age are
/// required. The apply URL and logo are optional.
pub fn parse_detail_page(document: &Html, listing_id: i64) -> Result<DetailPage, ParseError> {
    let context = format!("detail page of {}", listing_id);
    let root = document.root_element();

    let container = select_first(root, ".description__text.description__text--rich")
        .ok_or_else(|| missing("description container", &context))?;
    let body = select_first(container, "div")
        .ok_or_else(|| missing("description body", &context))?;
    let description = Fragment::from_element(body);

    let applicants = select_first(root, ".num-applicants__caption")
        .ok_or_else(|| missing("applicant count", &context))?
        .text()
        .flat_map(str::chars)
        .filter(char::is_ascii_digit)
        .collect();

    let posted = select_first(root, ".posted-time-ago__text")
        .ok_or_else(|| missing("posting age", &context))?
        .text()
        .collect::<String>();
    let posted = posted.trim();
    let posted_ago = posted
        .strip_suffix("ago")
        .map(str::trim_end)
        .unwrap_or(posted)
        .to_string();

    let apply_url = select_first(root, "#applyUrl").and_then(embedded_url);

    let logo_url = select_first(root, ".artdeco-entity-image")
        .and_then(|image| image.value().attr("data-delayed-url"))
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string);

    Ok(DetailPage {
        description,
        applicants,
        posted_ago,
        apply_url,
        logo_url,
    })
}

/// Reads the quoted URL the site embeds in a comment (or text) node
fn embedded_url(element: ElementRef<'_>) -> Option<String> {
    element
        .children()
        .find_map(|child| match child.value() {
            Node::Comment(comment) => Some(comment.to_string()),
            Node::Text(text) if !text.trim().is_empty() => Some(text.to_string()),
            _ => None,
        })
        .map(|raw| raw.trim().trim_matches('"').to_string())
        .filter(|url| !url.is_empty())
}

fn select_first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    scope.select(&selector).next()
}

fn required_text(
    scope: ElementRef<'_>,
    css: &str,
    element: &'static str,
    context: &str,
) -> Result<String, ParseError> {
    let found = select_first(scope, css).ok_or_else(|| missing(element, context))?;
    Ok(stripped_text(found))
}

/// Joins the element's text pieces, each trimmed, skipping blank ones
fn stripped_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn missing(element: &'static str, context: &str) -> ParseError {
    ParseError::MissingElement {
        element,
        context: context.to_string(),
    }
}

fn invalid(field: &'static str, value: &str, context: &str) -> ParseError {
    ParseError::InvalidValue {
        field,
        value: value.to_string(),
        context: context.to_string(),
    }
}
