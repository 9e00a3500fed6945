//! Token counting and budgeting.
//!
//! Counts use the `o200k_base` encoding (GPT-4o). The encoder is built on
//! first use and shared by the whole process.

use std::sync::OnceLock;

use tiktoken_rs::{o200k_base, CoreBPE};

use crate::error::{Error, Result};

/// Result of fitting items into a budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Budgeted {
    /// Length of the accepted prefix
    pub count: usize,
    /// Tokens used by the accepted prefix
    pub tokens: usize,
}

fn tokenizer() -> Result<&'static CoreBPE> {
    static TOKENIZER: OnceLock<std::result::Result<CoreBPE, String>> = OnceLock::new();
    TOKENIZER
        .get_or_init(|| o200k_base().map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| Error::Tokenizer(e.clone()))
}

/// Number of tokens in `text`.
pub fn count_tokens(text: &str) -> Result<usize> {
    if text.is_empty() {
        return Ok(0);
    }
    Ok(tokenizer()?.encode_ordinary(text).len())
}

/// Accept the longest prefix of `items` whose token total stays within
/// `max_tokens`. The first item that does not fit ends the scan; later,
/// smaller items are not considered.
pub fn fit_within_budget<S: AsRef<str>>(items: &[S], max_tokens: usize) -> Result<Budgeted> {
    let costs = items
        .iter()
        .map(|item| count_tokens(item.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    Ok(fit_costs(&costs, max_tokens))
}

fn fit_costs(costs: &[usize], max_tokens: usize) -> Budgeted {
    let mut budgeted = Budgeted::default();
    for &cost in costs {
        if budgeted.tokens + cost > max_tokens {
            break;
        }
        budgeted.count += 1;
        budgeted.tokens += cost;
    }
    budgeted
}

/// A header plus budgeted blocks, rendered.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Rendered {
    pub markdown: String,
    pub count: usize,
    pub token_count: usize,
}

/// Render `header` followed by the longest prefix of `blocks` (joined by
/// `separator`) whose rendered token count is at most `max_tokens`.
///
/// Header and separators are charged up front to estimate the prefix. The
/// estimate is then corrected against the rendered text in both directions,
/// since tokens can merge across the joins.
pub(crate) fn render_within_budget(
    header: &str,
    blocks: &[String],
    separator: &str,
    max_tokens: usize,
) -> Result<Rendered> {
    let header_tokens = count_tokens(header)?;
    if blocks.is_empty() || header_tokens >= max_tokens {
        return Ok(Rendered::default());
    }

    let separator_tokens = count_tokens(separator)?;
    let mut costs = Vec::with_capacity(blocks.len());
    for (i, block) in blocks.iter().enumerate() {
        let joint = if i == 0 { 0 } else { separator_tokens };
        costs.push(count_tokens(block)? + joint);
    }

    let render = |count: usize| -> Result<(String, usize)> {
        let markdown = format!("{}{}", header, blocks[..count].join(separator));
        let token_count = count_tokens(&markdown)?;
        Ok((markdown, token_count))
    };

    let mut included = fit_costs(&costs, max_tokens - header_tokens).count;
    let mut best = None;
    while included > 0 {
        let (markdown, token_count) = render(included)?;
        if token_count <= max_tokens {
            best = Some((markdown, token_count));
            break;
        }
        included -= 1;
    }
    while included < blocks.len() {
        let (markdown, token_count) = render(included + 1)?;
        if token_count > max_tokens {
            break;
        }
        included += 1;
        best = Some((markdown, token_count));
    }

    Ok(match best {
        Some((markdown, token_count)) => Rendered {
            markdown,
            count: included,
            token_count,
        },
        None => Rendered::default(),
    })
}
