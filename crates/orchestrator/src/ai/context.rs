// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic context serialization for the AI Pipeline.

use crate::hunt::{HuntModule, Observation};

const PER_STEP_BUDGET_BYTES: usize = 8 * 1024;
const GLOBAL_BUDGET_BYTES: usize = 64 * 1024;
const MIN_BLOCK_BYTES: usize = 64;

/// Serialize module metadata plus each step's clipped observation into one
/// context string, bounded first per-step and then globally. When the
/// per-step clip still leaves the total over budget, the largest remaining
/// block is trimmed next, last step first (LIFO), until the whole thing
/// fits.
pub fn build_context(module: &HuntModule, observations: &[Observation]) -> String {
    let header = format!("module: {}\nname: {}\ndescription: {}\n\n", module.id, module.name, module.description);

    let mut blocks: Vec<String> = observations.iter().map(render_step_block).collect();

    let mut total: usize = header.len() + blocks.iter().map(String::len).sum::<usize>();
    let budget = GLOBAL_BUDGET_BYTES.saturating_sub(header.len());

    while total.saturating_sub(header.len()) > budget {
        let Some((idx, len)) =
            blocks.iter().enumerate().rev().max_by_key(|(_, b)| b.len()).map(|(i, b)| (i, b.len()))
        else {
            break;
        };
        if len <= MIN_BLOCK_BYTES {
            break;
        }
        total -= len;
        let keep = blocks[idx].char_indices().map(|(i, _)| i).take(MIN_BLOCK_BYTES).last().unwrap_or(0);
        blocks[idx].truncate(keep);
        blocks[idx].push_str("\n...[trimmed to fit context budget]\n");
        total += blocks[idx].len();
    }

    let mut out = header;
    for block in blocks {
        out.push_str(&block);
    }
    out
}

fn render_step_block(obs: &Observation) -> String {
    let stdout = clip(&obs.stdout, PER_STEP_BUDGET_BYTES);
    let stderr = clip(&obs.stderr, PER_STEP_BUDGET_BYTES / 4);
    format!(
        "## step {}\ncommand: {}\nexit: {:?}\nstdout:\n{}\nstderr:\n{}\n\n",
        obs.step_id, obs.command_as_sent, obs.exit, stdout, stderr
    )
}

fn clip(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let cut = text.char_indices().map(|(i, _)| i).take_while(|&i| i <= max_bytes).last().unwrap_or(0);
    format!("{}\n...[truncated]", &text[..cut])
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
