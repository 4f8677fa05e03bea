//! Finding identity. Resolves the open question in `DESIGN.md`: the
//! fingerprint must be stable across repeat detections of the same
//! underlying issue but must not incorporate volatile fields (timestamps,
//! counts, raw command output).

use sha2::{Digest, Sha256};

use crate::records::{FindingDraft, FindingKind};

const SEP: &str = "\u{1f}";

/// `sha256(kind | title | sorted(evidence))`, hex-encoded.
pub fn compute(draft: &FindingDraft) -> String {
    let mut evidence = draft.evidence.clone();
    evidence.sort();

    let mut parts = vec![draft.kind.as_str().to_owned(), draft.title.clone()];
    parts.extend(evidence);
    let joined = parts.join(SEP);

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    let digest = hasher.finalize();
    hex_encode(&digest)
}

/// Evidence subset for a `detection` finding: the originating step and a
/// truncated command, per the resolved open question in `DESIGN.md`.
pub fn detection_evidence(step_id: &str, command: &str) -> Vec<String> {
    let truncated: String = command.chars().take(200).collect();
    vec![format!("step:{step_id}"), format!("cmd:{truncated}")]
}

/// Evidence subset for an `ai_report` finding: just the module id, so the
/// same module re-run against the same asset escalates rather than
/// duplicating.
pub fn ai_report_evidence(module_id: &str) -> Vec<String> {
    vec![format!("module:{module_id}")]
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0f) as usize] as char);
    }
    out
}

#[cfg(test)]
#[path = "fingerprint_tests.rs"]
mod tests;
