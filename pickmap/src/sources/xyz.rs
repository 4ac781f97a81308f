use std::sync::LazyLock;

use super::{Attribution, TileSource, fill_template};
use crate::TileId;
use crate::tile_grid::TileGrid;

static GRID: LazyLock<TileGrid> = LazyLock::new(TileGrid::web_mercator);

/// Any service following the `{z}/{x}/{y}` convention on the Web Mercator grid.
///
/// Besides `{z}`, `{x}` and `{y}`, the template may contain `{-y}` for services counting rows from
/// the bottom (TMS), and a single range like `{a-c}` or `{1-4}` which is expanded into several
/// URLs, used in turn for neighbouring tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xyz {
    urls: Vec<String>,
    attribution: Option<String>,
}

impl Xyz {
    pub fn new(template: &str, attribution: Option<String>) -> Self {
        Self {
            urls: expand_range(template),
            attribution,
        }
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }
}

impl TileSource for Xyz {
    fn tile_url(&self, tile_id: TileId) -> String {
        let index = (tile_id.x as usize + tile_id.y as usize) % self.urls.len().max(1);
        let Some(template) = self.urls.get(index) else {
            return String::new();
        };

        let rows = 1u64 << tile_id.zoom;
        fill_template(template, |key| match key {
            "z" => Some(tile_id.zoom.to_string()),
            "x" => Some(tile_id.x.to_string()),
            "y" => Some(tile_id.y.to_string()),
            "-y" => Some((rows.saturating_sub(1) - u64::from(tile_id.y).min(rows - 1)).to_string()),
            _ => None,
        })
    }

    fn attribution(&self) -> Attribution {
        Attribution::new(self.attribution.clone().unwrap_or_default(), None)
    }

    fn tile_grid(&self) -> &TileGrid {
        &GRID
    }
}

/// Expand the first `{a-c}` (or `{1-4}`) range of the template into a list of URLs.
fn expand_range(template: &str) -> Vec<String> {
    let range = template
        .match_indices('{')
        .filter_map(|(start, _)| {
            let end = start + template[start..].find('}')?;
            let (first, last) = template[start + 1..end].split_once('-')?;
            (!first.is_empty() && !last.is_empty()).then_some((start, end, first, last))
        })
        .next();

    let Some((start, end, first, last)) = range else {
        return vec![template.to_owned()];
    };

    let (prefix, suffix) = (&template[..start], &template[end + 1..]);

    let values: Vec<String> = match (first.parse::<u32>(), last.parse::<u32>()) {
        (Ok(first), Ok(last)) if first <= last => (first..=last).map(|v| v.to_string()).collect(),
        _ => {
            let mut first_chars = first.chars();
            let mut last_chars = last.chars();
            match (
                first_chars.next(),
                first_chars.next(),
                last_chars.next(),
                last_chars.next(),
            ) {
                (Some(first), None, Some(last), None) if first <= last => {
                    (first..=last).map(String::from).collect()
                }
                _ => return vec![template.to_owned()],
            }
        }
    };

    values
        .into_iter()
        .map(|value| format!("{prefix}{value}{suffix}"))
        .collect()
}
