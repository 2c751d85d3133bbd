use regex::Regex;
use std::sync::LazyLock;

/// Links to Hacker News item pages, with or without a scheme.
static HN_ITEM_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"((http|https)://)?news\.ycombinator\.com/item\?id=[0-9]+")
        .expect("HN link pattern is valid")
});

/// Yield every Hacker News item link in `text`, left to right.
pub fn find_links(text: &str) -> impl Iterator<Item = &str> {
    HN_ITEM_LINK.find_iter(text).map(|m| m.as_str())
}

/// Extract the item id from a matched link: whatever follows the last `=`.
pub fn item_id(link: &str) -> Option<&str> {
    let (_, id) = link.rsplit_once('=')?;
    Some(id)
}

/// Ids of every linked item in `text`, in the order they appear.
pub fn candidate_ids(text: &str) -> Vec<String> {
    find_links(text)
        .filter_map(item_id)
        .map(str::to_string)
        .collect()
}
