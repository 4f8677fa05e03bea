// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hunt-module file parser: YAML front-matter followed by one
//! `## <step-id>` section per step with labeled fields.

use std::fmt;

use super::{HuntModule, SeverityHint, Step};
use crate::domain::AssetOs;

#[derive(Debug, Clone)]
pub struct ParseError(pub String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hunt module parse error: {}", self.0)
    }
}

impl std::error::Error for ParseError {}

#[derive(serde::Deserialize)]
struct FrontMatter {
    id: String,
    name: String,
    description: String,
    os_types: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
    severity_hint: SeverityHint,
}

/// Parse a hunt-module spec document into a [`HuntModule`].
///
/// Expected shape:
/// ```text
/// ---
/// id: linux_network
/// name: Linux network recon
/// description: ...
/// os_types: [linux]
/// tags: [network]
/// severity_hint: medium
/// ---
/// ## check_listening_ports
/// description: List listening sockets
/// command: ss -tlnpu
/// timeout: 10
/// requires_sudo: false
/// ```
pub fn parse_module(source: &str) -> Result<HuntModule, ParseError> {
    let (front_matter_src, body) = split_front_matter(source)?;

    let front: FrontMatter =
        serde_yaml::from_str(front_matter_src).map_err(|e| ParseError(format!("front-matter: {e}")))?;

    let os_types = front
        .os_types
        .iter()
        .map(|s| AssetOs::parse(s).ok_or_else(|| ParseError(format!("unknown os_type: {s}"))))
        .collect::<Result<Vec<_>, _>>()?;

    let steps = parse_steps(body)?;
    if steps.is_empty() {
        return Err(ParseError("module has no steps".into()));
    }

    Ok(HuntModule {
        id: front.id,
        name: front.name,
        description: front.description,
        os_types,
        tags: front.tags,
        severity_hint: front.severity_hint,
        steps,
    })
}

fn split_front_matter(source: &str) -> Result<(&str, &str), ParseError> {
    let rest = source.trim_start();
    let rest = rest.strip_prefix("---").ok_or_else(|| ParseError("missing front-matter delimiter".into()))?;
    let end = rest.find("\n---").ok_or_else(|| ParseError("unterminated front-matter".into()))?;
    let front = &rest[..end];
    let body = &rest[end + 4..];
    Ok((front, body.trim_start_matches('\n')))
}

fn parse_steps(body: &str) -> Result<Vec<Step>, ParseError> {
    let mut steps = Vec::new();
    let mut current_id: Option<String> = None;
    let mut fields: Vec<(String, String)> = Vec::new();

    for line in body.lines() {
        if let Some(id) = line.strip_prefix("## ") {
            if let Some(prev_id) = current_id.take() {
                steps.push(build_step(prev_id, std::mem::take(&mut fields))?);
            }
            current_id = Some(id.trim().to_string());
            continue;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some((key, value)) = trimmed.split_once(':') else { continue };
        fields.push((key.trim().to_string(), value.trim().to_string()));
    }
    if let Some(id) = current_id.take() {
        steps.push(build_step(id, fields)?);
    }

    Ok(steps)
}

fn build_step(id: String, fields: Vec<(String, String)>) -> Result<Step, ParseError> {
    let mut description = None;
    let mut command = None;
    let mut timeout_secs = 30u64;
    let mut requires_sudo = false;

    for (key, value) in fields {
        match key.as_str() {
            "description" => description = Some(value),
            "command" => command = Some(value),
            "timeout" => {
                timeout_secs =
                    value.parse().map_err(|_| ParseError(format!("step {id}: invalid timeout {value:?}")))?
            }
            "requires_sudo" => {
                requires_sudo =
                    value.parse().map_err(|_| ParseError(format!("step {id}: invalid requires_sudo {value:?}")))?
            }
            other => return Err(ParseError(format!("step {id}: unknown field {other:?}"))),
        }
    }

    Ok(Step {
        id: id.clone(),
        description: description.ok_or_else(|| ParseError(format!("step {id}: missing description")))?,
        command: command.ok_or_else(|| ParseError(format!("step {id}: missing command")))?,
        timeout_secs,
        requires_sudo,
    })
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
