//! Text repairer: turns near-JSON model output into strictly parseable JSON text.
//!
//! The passes are deterministic and ordered:
//!   1. drop code-fence markers and any prose around the outermost brackets,
//!   2. frame the payload as the outermost array, falling back to one or more
//!      top-level objects,
//!   3. when objects are concatenated, split them on brace depth and keep only the
//!      ones that parse on their own,
//!   4. textual fixes (trailing commas, missing `},{` separators, control chars),
//!   5. a final parse; failing text is never returned.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::error::RepairError;
use crate::util::sample;

const SAMPLE_CHARS: usize = 200;
const FENCE: &str = "```";

fn trailing_comma_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r",\s*([}\]])").expect("trailing comma pattern"))
}

fn adjacent_objects_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"\}\s*\{").expect("adjacent objects pattern"))
}

fn control_chars_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  // Tab, LF and CR are whitespace in JSON and stay.
  RE.get_or_init(|| Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]").expect("control char pattern"))
}

/// Coerce raw model output into a JSON array (as text).
///
/// The outermost `[...]` is preferred; objects are framed only when no array
/// parses. A single bare object comes back wrapped as a one-element array, so
/// callers always decode a list.
pub fn repair(raw: &str) -> Result<String, RepairError> {
  let unfenced = raw.replace(FENCE, "");
  let body = trim_to_structure(&unfenced)
    .ok_or_else(|| repair_error("no JSON structure found in response", raw))?;

  let array = frame_array(body);
  if let Ok(framed) = &array {
    if framed.holds_objects {
      return Ok(framed.json.clone());
    }
  }

  // Array framing failed, or only found scalars (the options list of a bare object).
  match (array, frame_objects(body)) {
    (_, Ok(objects)) => Ok(objects),
    (Ok(framed), Err(_)) => Ok(framed.json),
    (Err(array_reason), Err(object_reason)) => {
      debug!(target: "ingest", %array_reason, %object_reason, "Repair framing failed");
      let reason = if body.contains('[') { array_reason } else { object_reason };
      Err(repair_error(&reason, raw))
    }
  }
}

/// Single-object variant used when scoring answers: strip fences, take the
/// outermost `{...}`, drop trailing commas and control characters.
pub fn repair_object(raw: &str) -> Result<String, RepairError> {
  let unfenced = raw.replace(FENCE, "");
  let span = object_span(&unfenced)
    .ok_or_else(|| repair_error("no JSON object found in response", raw))?;

  let cleaned = control_chars_re().replace_all(span, "");
  let cleaned = trailing_comma_re().replace_all(&cleaned, "$1");
  match serde_json::from_str::<Value>(&cleaned) {
    Ok(v) if v.is_object() => Ok(cleaned.trim().to_string()),
    Ok(_) => Err(repair_error("repaired text is not a JSON object", raw)),
    Err(e) => Err(repair_error(&format!("invalid JSON after cleaning: {e}"), raw)),
  }
}

/// Textual repairs applied to any candidate span.
pub fn fix_common_issues(json: &str) -> String {
  let out = control_chars_re().replace_all(json, "");
  let out = trailing_comma_re().replace_all(&out, "$1");
  let out = adjacent_objects_re().replace_all(&out, "},{");
  out.into_owned()
}

struct FramedArray {
  json: String,
  holds_objects: bool,
}

fn frame_array(body: &str) -> Result<FramedArray, String> {
  let start = body.find('[').ok_or("no array found")?;
  let end = body.rfind(']').ok_or("no array found")?;
  if start >= end {
    return Err("unbalanced array framing".into());
  }

  let fixed = fix_common_issues(&body[start..=end]);
  let parsed: Value = serde_json::from_str(&fixed).map_err(|e| format!("invalid JSON after cleaning: {e}"))?;
  let holds_objects = parsed.as_array().is_some_and(|items| items.iter().any(Value::is_object));
  Ok(FramedArray { json: fixed.trim().to_string(), holds_objects })
}

fn frame_objects(body: &str) -> Result<String, String> {
  let span = object_span(body).ok_or("no JSON object found")?;

  let fragments = split_top_level_objects(span);
  let total = fragments.len();
  let survivors: Vec<String> = fragments
    .into_iter()
    .filter_map(|frag| {
      let fixed = fix_common_issues(frag);
      match serde_json::from_str::<Value>(&fixed) {
        Ok(v) if v.is_object() => Some(fixed.trim().to_string()),
        _ => None,
      }
    })
    .collect();

  if survivors.is_empty() {
    return Err(format!("none of {total} object(s) could be parsed"));
  }
  if survivors.len() < total {
    debug!(target: "ingest", kept = survivors.len(), total, "Discarded malformed objects");
  }

  let assembled = fix_common_issues(&format!("[{}]", survivors.join(",")));
  serde_json::from_str::<Value>(&assembled).map_err(|e| format!("invalid JSON after reassembly: {e}"))?;
  Ok(assembled)
}

/// Slice from the first `[`/`{` to the last `]`/`}`.
fn trim_to_structure(text: &str) -> Option<&str> {
  let start = text.find(|c: char| c == '[' || c == '{')?;
  let end = text.rfind(|c: char| c == ']' || c == '}')?;
  (start < end).then(|| &text[start..=end])
}

fn object_span(text: &str) -> Option<&str> {
  let start = text.find('{')?;
  let end = text.rfind('}')?;
  (start < end).then(|| &text[start..=end])
}

/// Brace-depth scan over `span`, returning each self-contained top-level object.
/// Braces inside string literals do not count; text between objects is skipped.
fn split_top_level_objects(span: &str) -> Vec<&str> {
  let mut out = Vec::new();
  let mut depth = 0usize;
  let mut start = None;
  let mut in_string = false;
  let mut escaped = false;

  for (i, ch) in span.char_indices() {
    if in_string {
      if escaped {
        escaped = false;
      } else if ch == '\\' {
        escaped = true;
      } else if ch == '"' {
        in_string = false;
      }
      continue;
    }
    match ch {
      '"' if depth > 0 => in_string = true,
      '{' => {
        if depth == 0 {
          start = Some(i);
        }
        depth += 1;
      }
      '}' if depth > 0 => {
        depth -= 1;
        if depth == 0 {
          if let Some(s) = start.take() {
            out.push(&span[s..=i]);
          }
        }
      }
      _ => {}
    }
  }
  out
}

fn repair_error(reason: &str, raw: &str) -> RepairError {
  RepairError { reason: reason.to_string(), sample: sample(raw, SAMPLE_CHARS) }
}
