use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shape of the paginated API: where items and links live, and which query
/// parameter selects a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub page_param: String,
    pub items_field: String,
    pub links_field: String,
    /// Fewer links than this means the result fits on one page.
    pub min_links: usize,
    /// Highest page number ever requested; larger announcements are truncated.
    pub max_pages: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_param: "pagina".into(),
            items_field: "dados".into(),
            links_field: "links".into(),
            min_links: 2,
            max_pages: 10_000,
        }
    }
}

impl PaginationConfig {
    /// Last page number announced by a first-page body, or `None` when the
    /// body describes a single page (no links, too few links, unparsable href).
    pub fn last_page(&self, body: &Value) -> Option<u32> {
        let links = body.get(&self.links_field)?.as_array()?;
        if links.is_empty() || links.len() < self.min_links {
            return None;
        }
        let href = links.last()?.get("href")?.as_str()?;
        page_from_href(href, &self.page_param)
    }

    /// Take the item array out of a page body. Missing or non-array yields nothing.
    pub fn take_items(&self, body: &mut Value) -> Vec<Value> {
        match body.get_mut(&self.items_field).map(Value::take) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        }
    }
}

/// Numeric value right after `&<param>=` (or `?<param>=`), up to the next `&`.
pub fn page_from_href(href: &str, param: &str) -> Option<u32> {
    let rest = ["&", "?"].iter().find_map(|sep| {
        let marker = format!("{}{}=", sep, param);
        href.find(&marker).map(|idx| &href[idx + marker.len()..])
    })?;
    let value = rest.split('&').next()?;
    value.trim().parse::<u32>().ok()
}
