//! Block clustering: grouping lines into candidate offers.
//!
//! Flyer layouts place the lines of one product in a consistent x-column;
//! prices break the visual rhythm and mark block ends, and column jumps
//! mark new blocks even without an intervening price. The clusterer walks
//! the page's non-skip lines with a `(current_start, current_x)` state and
//! closes the running block on either signal.

use crate::geometry::Rect;
use crate::layout::{Line, Page};
use crate::prices::PriceAnchor;
use crate::profile::RetailerProfile;
use std::collections::BTreeSet;

/// Lines past a block's end that a price anchor may still be attached from.
/// Tolerates prices typeset just below their product.
const PRICE_LOOKAHEAD_LINES: usize = 2;

/// A contiguous group of lines treated as one candidate offer.
#[derive(Debug, Clone)]
pub struct OfferBlock {
    /// 1-based page number
    pub page: u32,
    /// Index of the first member line
    pub start: usize,
    /// Index of the last member line
    pub end: usize,
    /// Member lines, in order (skip lines included; they are filtered again
    /// during name merging)
    pub lines: Vec<Line>,
    /// Representative left edge of the block's column, in points
    pub column_x: f32,
    /// Union of the member lines' bounding boxes
    pub bbox: Rect,
    /// The attached price, if any anchor fell within the block's range
    pub price: Option<PriceAnchor>,
}

impl OfferBlock {
    /// Texts of the member lines.
    pub fn line_texts(&self) -> Vec<&str> {
        self.lines.iter().map(|l| l.text.as_str()).collect()
    }
}

/// Cluster a page's lines into offer blocks.
///
/// `is_skip` classifies lines that never start or merge into a block
/// (marketing prose, footers, instructions); `anchors` are the page's
/// price anchors in layout order.
pub fn cluster_blocks<F>(
    page: &Page,
    profile: &RetailerProfile,
    is_skip: F,
    anchors: &[PriceAnchor],
) -> Vec<OfferBlock>
where
    F: Fn(&str) -> bool,
{
    let anchor_lines: BTreeSet<usize> = anchors.iter().map(|a| a.line_index).collect();

    let mut blocks: Vec<OfferBlock> = Vec::new();
    let mut current_start: Option<usize> = None;
    let mut current_x: f32 = 0.0;

    let close = |start: usize, end: usize, column_x: f32, blocks: &mut Vec<OfferBlock>| {
        let lines: Vec<Line> = page
            .lines
            .iter()
            .filter(|l| l.index >= start && l.index <= end)
            .cloned()
            .collect();
        if lines.is_empty() {
            return;
        }
        let bbox = lines
            .iter()
            .map(|l| l.bbox)
            .reduce(|acc, b| acc.union(&b))
            .unwrap();
        let price = anchors
            .iter()
            .find(|a| a.line_index >= start && a.line_index <= end + PRICE_LOOKAHEAD_LINES)
            .cloned();
        blocks.push(OfferBlock {
            page: page.number,
            start,
            end,
            lines,
            column_x,
            bbox,
            price,
        });
    };

    for line in &page.lines {
        if line.text.is_empty() || is_skip(&line.text) {
            continue;
        }
        let i = line.index;

        let start_new = match current_start {
            None => true,
            Some(_) if (line.x_pt - current_x).abs() >= profile.column_tolerance_pt => true,
            Some(_) if i > 0 && anchor_lines.contains(&(i - 1)) => true,
            Some(_) => false,
        };

        if start_new {
            if let Some(start) = current_start {
                close(start, i.saturating_sub(1), current_x, &mut blocks);
            }
            current_start = Some(i);
            current_x = line.x_pt;
        }
    }

    if let Some(start) = current_start {
        if let Some(last) = page.lines.last() {
            close(start, last.index, current_x, &mut blocks);
        }
    }

    log::debug!("page {}: {} offer blocks", page.number, blocks.len());
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prices::PriceOrigin;
    use crate::profile::NETTO;

    fn line(text: &str, index: usize, x_pt: f32) -> Line {
        Line {
            text: text.to_string(),
            x_pt,
            index,
            bbox: Rect::new(x_pt / 1000.0, index as f32 * 0.02, 0.2, 0.02),
            page: 1,
        }
    }

    fn page(lines: Vec<Line>) -> Page {
        Page {
            number: 1,
            width_pt: 1000.0,
            height_pt: 1000.0,
            spans: Vec::new(),
            lines,
        }
    }

    fn anchor(value: f64, line_index: usize) -> PriceAnchor {
        PriceAnchor {
            value,
            page: 1,
            line_index,
            x: 0.0,
            origin: PriceOrigin::LargeFontNumeric,
        }
    }

    fn no_skip(_: &str) -> bool {
        false
    }

    #[test]
    fn test_single_block_with_attached_price() {
        let p = page(vec![
            line("MÆLK øko 1 L", 0, 100.0),
            line("Arla Lærkevang", 1, 100.0),
            line("15.-", 2, 100.0),
        ]);
        let anchors = vec![anchor(15.0, 2)];
        let blocks = cluster_blocks(&p, &NETTO, no_skip, &anchors);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].start, 0);
        assert_eq!(blocks[0].end, 2);
        assert_eq!(blocks[0].price.as_ref().unwrap().value, 15.0);
    }

    #[test]
    fn test_column_jump_splits_without_price() {
        let p = page(vec![
            line("Kyllingebryst", 0, 120.0),
            line("Økologiske æbler", 1, 550.0),
        ]);
        let blocks = cluster_blocks(&p, &NETTO, no_skip, &[]);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].lines[0].text, "Kyllingebryst");
        assert_eq!(blocks[1].lines[0].text, "Økologiske æbler");
    }

    #[test]
    fn test_column_tolerance_boundary() {
        // 49.9pt of drift stays in the column; 50.0pt opens a new block.
        let p = page(vec![line("Smør", 0, 100.0), line("Lurpak", 1, 149.9)]);
        assert_eq!(cluster_blocks(&p, &NETTO, no_skip, &[]).len(), 1);

        let p = page(vec![line("Smør", 0, 100.0), line("Lurpak", 1, 150.0)]);
        assert_eq!(cluster_blocks(&p, &NETTO, no_skip, &[]).len(), 2);
    }

    #[test]
    fn test_price_line_terminates_block() {
        let p = page(vec![
            line("Tuborg Classic", 0, 100.0),
            line("25.-", 1, 100.0),
            line("Faxe Kondi", 2, 100.0),
            line("12.-", 3, 100.0),
        ]);
        let anchors = vec![anchor(25.0, 1), anchor(12.0, 3)];
        let blocks = cluster_blocks(&p, &NETTO, no_skip, &anchors);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].price.as_ref().unwrap().value, 25.0);
        assert_eq!(blocks[1].price.as_ref().unwrap().value, 12.0);
        assert_eq!(blocks[1].start, 2);
    }

    #[test]
    fn test_price_lookahead_attaches_below_block() {
        // Column jump closes the block before its price line; the two-line
        // lookahead still attaches the anchor.
        let p = page(vec![
            line("Hakket oksekød", 0, 100.0),
            line("29", 1, 100.0),
            line("Rugbrød", 2, 400.0),
        ]);
        let anchors = vec![anchor(29.95, 1)];
        let blocks = cluster_blocks(&p, &NETTO, no_skip, &anchors);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].price.as_ref().unwrap().value, 29.95);
    }

    #[test]
    fn test_skip_lines_never_open_blocks() {
        let p = page(vec![
            line("Gælder kun i uge 42", 0, 100.0),
            line("Arla Skyr", 1, 100.0),
        ]);
        let blocks = cluster_blocks(&p, &NETTO, |t| t.starts_with("Gælder"), &[]);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].start, 1);
    }

    #[test]
    fn test_empty_page_yields_no_blocks() {
        let p = page(vec![]);
        assert!(cluster_blocks(&p, &NETTO, no_skip, &[]).is_empty());
    }
}
