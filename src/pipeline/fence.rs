//! Markdown-fence stripping for model replies.
//!
//! Vision models are asked for bare JSON but routinely wrap it in a
//! ` ```json … ``` ` fence anyway, sometimes an untagged one. Rather than
//! fight that in the prompt, the parser accepts all three shapes.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").unwrap());

static RE_ANY_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```\s*(.*?)\s*```").unwrap());

/// Extract the JSON payload from a model reply.
///
/// Preference order: a ` ```json ` fence, then any fence, then the trimmed
/// reply as-is. Only the first fence is considered; models that emit several
/// put the answer first and commentary after.
pub fn fenced_payload(reply: &str) -> &str {
    if let Some(caps) = RE_JSON_FENCE.captures(reply) {
        return caps.get(1).map_or("", |m| m.as_str());
    }
    if let Some(caps) = RE_ANY_FENCE.captures(reply) {
        return caps.get(1).map_or("", |m| m.as_str());
    }
    reply.trim()
}
