//! Vergabe freier Standardnamen und Nummern für neu erzeugte Entities.

use regex::Regex;
use std::collections::HashSet;

/// Liefert `<prefix>_<n>` mit dem kleinsten `n`, das unter `taken` noch frei ist.
pub fn next_free_name<'a>(prefix: &str, taken: impl IntoIterator<Item = &'a str>) -> String {
    let Ok(pattern) = Regex::new(&format!(r"^{}_(\d+)$", regex::escape(prefix))) else {
        return format!("{prefix}_0");
    };
    let used: HashSet<u32> = taken
        .into_iter()
        .filter_map(|name| pattern.captures(name))
        .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
        .collect();
    format!("{prefix}_{}", first_free_number(used, 0))
}

/// Kleinste Zahl ab `start`, die nicht in `taken` vorkommt.
pub fn first_free_number(taken: impl IntoIterator<Item = u32>, start: u32) -> u32 {
    let used: HashSet<u32> = taken.into_iter().collect();
    (start..=u32::MAX)
        .find(|n| !used.contains(n))
        .unwrap_or(u32::MAX)
}
