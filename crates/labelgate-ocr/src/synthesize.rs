//! Word-token synthesis for line-only providers.
//!
//! When a provider reports no word geometry, tokens are derived by splitting
//! each line on whitespace and mapping character offsets to x-coordinates
//! proportionally across the line box. The final token's right edge snaps to
//! the line's right edge so the row is fully covered.

use labelgate_kernel::{BoundingBox, OcrLine, OcrToken};

pub fn split_tokens_from_line(line: &OcrLine, line_index: usize) -> Vec<OcrToken> {
    let chars: Vec<char> = line.text.chars().collect();
    let mut matches: Vec<(usize, usize)> = Vec::new();
    let mut start: Option<usize> = None;
    for (index, ch) in chars.iter().enumerate() {
        if ch.is_whitespace() {
            if let Some(begin) = start.take() {
                matches.push((begin, index));
            }
        } else if start.is_none() {
            start = Some(index);
        }
    }
    if let Some(begin) = start {
        matches.push((begin, chars.len()));
    }

    if matches.is_empty() {
        return Vec::new();
    }

    let line_width = line.bbox.width();
    let line_units = chars.len().max(1) as f64;
    let match_count = matches.len();

    matches
        .iter()
        .enumerate()
        .map(|(token_index, &(begin, end))| {
            let mut x0 = line.bbox.x0 + line_width * (begin as f64 / line_units);
            let mut x1 = line.bbox.x0 + line_width * (end as f64 / line_units);
            if token_index == match_count - 1 {
                x1 = line.bbox.x1;
            }

            x0 = x0.clamp(line.bbox.x0, line.bbox.x1);
            x1 = x1.max(x0).min(line.bbox.x1);

            OcrToken {
                text: chars[begin..end].iter().collect(),
                confidence: line.confidence,
                bbox: BoundingBox::new(x0, line.bbox.y0, x1, line.bbox.y1),
                line_id: Some(format!("line_{line_index}")),
            }
        })
        .collect()
}
