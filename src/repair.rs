use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

// ── Record types ────────────────────────────────────────────────────────────

/// The six keys a candidate object must carry before it becomes an [`AdText`].
pub const REQUIRED_KEYS: &[&str] =
    &["product", "audience", "tone", "description", "features", "scene"];

/// Target audience — models produce either a single string or a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

/// Structured ad copy recovered from a model response. Built exactly once per
/// repair call and never partially filled — every field is populated, either
/// from the response or from the fallback record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdText {
    pub product: String,
    pub audience: Audience,
    pub tone: String,
    pub description: String,
    pub features: Vec<String>,
    pub scene: String,
}

impl AdText {
    /// Build a record from a parsed candidate. `None` unless the candidate is
    /// an object carrying all six required keys. Value types are coerced
    /// leniently — the strategies already carry the format burden.
    fn from_value(value: &Value) -> Option<AdText> {
        let obj = value.as_object()?;
        if !REQUIRED_KEYS.iter().all(|k| obj.contains_key(*k)) {
            return None;
        }
        Some(AdText {
            product: coerce_string(&obj["product"]),
            audience: coerce_audience(&obj["audience"]),
            tone: coerce_string(&obj["tone"]),
            description: coerce_string(&obj["description"]),
            features: coerce_string_list(&obj["features"]),
            scene: coerce_string(&obj["scene"]),
        })
    }
}

fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn coerce_string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(coerce_string).collect(),
        other => vec![coerce_string(other)],
    }
}

fn coerce_audience(value: &Value) -> Audience {
    match value {
        Value::Array(items) => Audience::Many(items.iter().map(coerce_string).collect()),
        other => Audience::One(coerce_string(other)),
    }
}

// ── Strategy chain ──────────────────────────────────────────────────────────

/// One link in the repair chain, ordered cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStrategy {
    DirectParse,
    ExtractBraced,
    RelaxedRewrite,
    RegexFixups,
    LiteralEval,
    FieldScrape,
    Fallback,
}

impl RepairStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepairStrategy::DirectParse => "direct_parse",
            RepairStrategy::ExtractBraced => "extract_braced",
            RepairStrategy::RelaxedRewrite => "relaxed_rewrite",
            RepairStrategy::RegexFixups => "regex_fixups",
            RepairStrategy::LiteralEval => "literal_eval",
            RepairStrategy::FieldScrape => "field_scrape",
            RepairStrategy::Fallback => "fallback",
        }
    }
}

type StrategyFn = fn(&str, &str) -> Option<Value>;

/// Repair a raw model response into a complete [`AdText`].
///
/// Total over its input: any string in, a fully populated record out, never an
/// error. Each strategy converts its own failures to `None`; only exhaustion
/// of the whole chain reaches the deterministic fallback, which cannot fail.
pub fn repair(raw: &str) -> AdText {
    repair_traced(raw).0
}

/// Like [`repair`], also reporting which strategy produced the record.
pub fn repair_traced(raw: &str) -> (AdText, RepairStrategy) {
    let content = unwrap_envelope(raw);

    const CHAIN: &[(RepairStrategy, StrategyFn)] = &[
        (RepairStrategy::DirectParse, direct_parse),
        (RepairStrategy::ExtractBraced, extract_braced),
        (RepairStrategy::RelaxedRewrite, relaxed_rewrite),
        (RepairStrategy::RegexFixups, regex_fixups),
        (RepairStrategy::LiteralEval, literal_eval),
        (RepairStrategy::FieldScrape, field_scrape),
    ];

    for (strategy, run) in CHAIN {
        if let Some(candidate) = run(raw, &content) {
            if let Some(record) = AdText::from_value(&candidate) {
                debug!("Repair via {} ({} chars in)", strategy.as_str(), raw.len());
                return (record, *strategy);
            }
        }
        debug!("Strategy {} did not apply", strategy.as_str());
    }

    warn!(
        "All repair strategies exhausted ({} chars in); using fallback record",
        raw.len()
    );
    (fallback_record(&content), RepairStrategy::Fallback)
}

/// Generation APIs wrap the model text in a JSON envelope with a `"response"`
/// string field. Peel one layer if present; otherwise the raw text stands.
fn unwrap_envelope(raw: &str) -> String {
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(raw) {
        if let Some(Value::String(inner)) = obj.get("response") {
            return inner.clone();
        }
    }
    raw.to_string()
}

// ── Strategy 1: direct parse ────────────────────────────────────────────────

fn direct_parse(raw: &str, _content: &str) -> Option<Value> {
    let outer: Value = serde_json::from_str(raw).ok()?;
    if let Value::Object(ref obj) = outer {
        if let Some(Value::String(inner)) = obj.get("response") {
            return serde_json::from_str(inner).ok();
        }
    }
    Some(outer)
}

// ── Strategy 2: brace-depth extraction ──────────────────────────────────────

/// Slice from the first `{` to its depth-matched `}`. Braces inside string
/// literals are counted like any other — a known best-effort scan, kept
/// simple on purpose; the later strategies catch what it misses.
fn braced_slice(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let mut depth: i32 = 0;
    for (idx, ch) in content[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&content[start..start + idx + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn extract_braced(_raw: &str, content: &str) -> Option<Value> {
    serde_json::from_str(braced_slice(content)?).ok()
}

// ── Strategy 3: relaxed rewrite ─────────────────────────────────────────────

/// Rewrite almost-JSON into strict JSON: smart quotes to ASCII, single-quoted
/// strings to double-quoted with escaping, bare keys and bare word values
/// quoted, Python literals mapped, trailing commas dropped. A string-aware
/// character walk, not regex — quoted content passes through untouched.
fn relax_json(input: &str) -> String {
    let chars: Vec<char> = ascii_quotes(input).chars().collect();
    let mut out = String::with_capacity(input.len() + 16);
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            // Double-quoted string: copy verbatim, honoring escapes.
            '"' => {
                out.push('"');
                i += 1;
                while i < chars.len() {
                    let c = chars[i];
                    out.push(c);
                    i += 1;
                    if c == '\\' {
                        if i < chars.len() {
                            out.push(chars[i]);
                            i += 1;
                        }
                        continue;
                    }
                    if c == '"' {
                        break;
                    }
                }
            }
            // Single-quoted string: convert to double-quoted.
            '\'' => {
                out.push('"');
                i += 1;
                while i < chars.len() {
                    let c = chars[i];
                    if c == '\\' && i + 1 < chars.len() {
                        let next = chars[i + 1];
                        if next == '\'' {
                            out.push('\'');
                        } else {
                            out.push('\\');
                            out.push(next);
                        }
                        i += 2;
                        continue;
                    }
                    if c == '\'' {
                        i += 1;
                        break;
                    }
                    if c == '"' {
                        out.push('\\');
                    }
                    out.push(c);
                    i += 1;
                }
                out.push('"');
            }
            // Trailing comma: drop it when the next significant char closes
            // a scope.
            ',' => {
                let mut j = i + 1;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if !(j < chars.len() && (chars[j] == '}' || chars[j] == ']')) {
                    out.push(',');
                }
                i += 1;
            }
            // Bare identifier: a key gets quoted, literals get mapped, and a
            // bare word value gets quoted as a string.
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let mut j = i;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                let is_key = j < chars.len() && chars[j] == ':';
                match (is_key, word.as_str()) {
                    (false, "true") | (false, "True") => out.push_str("true"),
                    (false, "false") | (false, "False") => out.push_str("false"),
                    (false, "null") | (false, "None") => out.push_str("null"),
                    _ => {
                        out.push('"');
                        out.push_str(&word);
                        out.push('"');
                    }
                }
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }

    out
}

fn relaxed_rewrite(_raw: &str, content: &str) -> Option<Value> {
    let slice = braced_slice(content).unwrap_or(content);
    serde_json::from_str(&relax_json(slice)).ok()
}

fn ascii_quotes(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{201c}' | '\u{201d}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect()
}

// ── Strategy 4: regex fix-ups ───────────────────────────────────────────────

static TRAILING_COMMAS: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r",\s*([}\]])").ok());
static BARE_KEYS: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(\w+)\s*:").ok());
static SINGLE_QUOTED: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"'([^']*)'").ok());

/// Blunter than the rewrite above: fixed regex passes applied in order, no
/// string awareness. Runs only after the string-aware strategies failed, so
/// collateral damage inside values is an accepted trade.
fn regex_fixups(_raw: &str, content: &str) -> Option<Value> {
    let trailing = TRAILING_COMMAS.as_ref()?;
    let bare = BARE_KEYS.as_ref()?;
    let single = SINGLE_QUOTED.as_ref()?;

    let mut fixed = trailing.replace_all(content, "${1}").into_owned();
    fixed = fixed
        .chars()
        .filter(|c| *c as u32 >= 0x20 || matches!(c, '\n' | '\t'))
        .collect();
    fixed = ascii_quotes(&fixed);
    fixed = bare.replace_all(&fixed, "\"${1}\":").into_owned();
    fixed = single.replace_all(&fixed, "\"${1}\"").into_owned();

    serde_json::from_str(&fixed).ok()
}

// ── Strategy 5: literal evaluation ──────────────────────────────────────────

/// Evaluate the outermost `{...}` span as a data literal instead of strict
/// JSON: single- or double-quoted strings, `True`/`False`/`None`, trailing
/// commas. Rejects anything that does not evaluate to a mapping.
fn literal_eval(_raw: &str, content: &str) -> Option<Value> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }
    // `find`/`rfind` return byte offsets of ASCII braces, so slicing is safe.
    let value = LiteralParser::new(&content[start..=end]).parse()?;
    value.is_object().then_some(value)
}

struct LiteralParser {
    chars: Vec<char>,
    pos: usize,
}

impl LiteralParser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn parse(mut self) -> Option<Value> {
        self.skip_ws();
        let value = self.value()?;
        self.skip_ws();
        (self.pos == self.chars.len()).then_some(value)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn value(&mut self) -> Option<Value> {
        match self.peek()? {
            '{' => self.dict(),
            '[' => self.list(),
            '\'' | '"' => self.string().map(Value::String),
            c if c == '-' || c.is_ascii_digit() => self.number(),
            _ => self.word(),
        }
    }

    fn dict(&mut self) -> Option<Value> {
        self.bump(); // '{'
        let mut map = Map::new();
        loop {
            self.skip_ws();
            if self.peek()? == '}' {
                self.bump();
                return Some(Value::Object(map));
            }
            let key = self.string()?;
            self.skip_ws();
            if self.bump()? != ':' {
                return None;
            }
            self.skip_ws();
            let value = self.value()?;
            map.insert(key, value);
            self.skip_ws();
            match self.peek()? {
                ',' => {
                    self.bump();
                }
                '}' => {}
                _ => return None,
            }
        }
    }

    fn list(&mut self) -> Option<Value> {
        self.bump(); // '['
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek()? == ']' {
                self.bump();
                return Some(Value::Array(items));
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.peek()? {
                ',' => {
                    self.bump();
                }
                ']' => {}
                _ => return None,
            }
        }
    }

    fn string(&mut self) -> Option<String> {
        let quote = self.bump()?;
        if quote != '\'' && quote != '"' {
            return None;
        }
        let mut out = String::new();
        loop {
            let c = self.bump()?;
            if c == quote {
                return Some(out);
            }
            if c == '\\' {
                match self.bump()? {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    other => out.push(other),
                }
            } else {
                out.push(c);
            }
        }
    }

    fn number(&mut self) -> Option<Value> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'))
        {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if let Ok(n) = text.parse::<i64>() {
            return Some(Value::from(n));
        }
        let f = text.parse::<f64>().ok()?;
        serde_json::Number::from_f64(f).map(Value::Number)
    }

    fn word(&mut self) -> Option<Value> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        match text.as_str() {
            "true" | "True" => Some(Value::Bool(true)),
            "false" | "False" => Some(Value::Bool(false)),
            "null" | "None" => Some(Value::Null),
            _ => None,
        }
    }
}

// ── Strategy 6: field-by-field extraction ───────────────────────────────────

static STRING_FIELD_RES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    ["product", "tone", "description", "scene"]
        .iter()
        .filter_map(|key| {
            Regex::new(&format!(r#""{}"\s*:\s*"([^"]*)""#, key))
                .ok()
                .map(|re| (*key, re))
        })
        .collect()
});
static AUDIENCE_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#""audience"\s*:\s*(?:"([^"]*)"|(\[[^\]]*\]))"#).ok());
static FEATURES_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#""features"\s*:\s*(\[[^\]]*\])"#).ok());

/// Salvage whatever structure survives: search for each field independently
/// and assemble a record from the matches. Only a full set of six counts.
fn field_scrape(_raw: &str, content: &str) -> Option<Value> {
    let mut map = Map::new();

    for (key, re) in STRING_FIELD_RES.iter() {
        if let Some(caps) = re.captures(content) {
            map.insert((*key).to_string(), Value::String(caps[1].to_string()));
        }
    }

    if let Some(re) = AUDIENCE_RE.as_ref() {
        if let Some(caps) = re.captures(content) {
            if let Some(single) = caps.get(1) {
                map.insert("audience".into(), Value::String(single.as_str().to_string()));
            } else if let Some(listed) = caps.get(2) {
                map.insert("audience".into(), parse_bracket_list(listed.as_str()));
            }
        }
    }

    if let Some(re) = FEATURES_RE.as_ref() {
        if let Some(caps) = re.captures(content) {
            map.insert("features".into(), parse_bracket_list(&caps[1]));
        }
    }

    REQUIRED_KEYS
        .iter()
        .all(|k| map.contains_key(*k))
        .then_some(Value::Object(map))
}

/// Parse a `[...]` group as JSON, falling back to a comma split with quote
/// trimming when the group itself is malformed.
fn parse_bracket_list(group: &str) -> Value {
    if let Ok(v @ Value::Array(_)) = serde_json::from_str::<Value>(group) {
        return v;
    }
    let inner = group.trim_start_matches('[').trim_end_matches(']');
    let items: Vec<Value> = inner
        .split(',')
        .map(|s| Value::String(s.trim().trim_matches(&['"', '\''][..]).to_string()))
        .filter(|v| v.as_str().is_some_and(|s| !s.is_empty()))
        .collect();
    Value::Array(items)
}

// ── Strategy 7: deterministic fallback ──────────────────────────────────────

pub const FALLBACK_PRODUCT: &str = "Unknown Product";
pub const FALLBACK_EMPTY_DESCRIPTION: &str = "Unable to generate description";

/// Fixed placeholder record — pure construction, cannot fail. The description
/// keeps the first 200 characters of the input so downstream logs retain a
/// trace of what the model actually said.
fn fallback_record(content: &str) -> AdText {
    let trimmed = content.trim();
    let description = if trimmed.is_empty() {
        FALLBACK_EMPTY_DESCRIPTION.to_string()
    } else {
        trimmed.chars().take(200).collect()
    };
    AdText {
        product: FALLBACK_PRODUCT.to_string(),
        audience: Audience::One("general".to_string()),
        tone: "neutral".to_string(),
        description,
        features: vec!["feature not available".to_string()],
        scene: "A simple product scene".to_string(),
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{"product":"Widget","audience":"teens","tone":"fun","description":"Great","features":["a"],"scene":"a room"}"#;

    fn widget() -> AdText {
        AdText {
            product: "Widget".into(),
            audience: Audience::One("teens".into()),
            tone: "fun".into(),
            description: "Great".into(),
            features: vec!["a".into()],
            scene: "a room".into(),
        }
    }

    #[test]
    fn valid_input_parses_directly_and_verbatim() {
        let (record, strategy) = repair_traced(VALID);
        assert_eq!(strategy, RepairStrategy::DirectParse);
        assert_eq!(record, widget());
    }

    #[test]
    fn total_over_arbitrary_input() {
        for input in [
            "",
            "not json at all",
            "{\"product\": \"only one key\"}",
            "\u{0}\u{1}\u{7f}binary\u{fffd}garbage",
            "{}",
            "[1, 2, 3]",
            "{\"response\": 42}",
        ] {
            let record = repair(input);
            assert!(!record.product.is_empty());
            assert!(!record.features.is_empty());
            assert!(!record.scene.is_empty());
        }
    }

    #[test]
    fn double_encoded_envelope_unwraps() {
        // The generation API wraps the model text in a "response" field and
        // the model escaped its own JSON inside it.
        let input = r#"{"response": "{\"product\":\"Widget\",\"audience\":\"teens\",\"tone\":\"fun\",\"description\":\"Great\",\"features\":[\"a\"],\"scene\":\"a room\"}"}"#;
        let (record, strategy) = repair_traced(input);
        assert_eq!(strategy, RepairStrategy::DirectParse);
        assert_eq!(record.product, "Widget");
        assert_eq!(record, widget());
    }

    #[test]
    fn unquoted_keys_and_trailing_commas_recover() {
        let input = r#"{product: "Widget", audience: "teens", tone: "fun", description: "Great", features: ["a",], scene: "a room",}"#;
        let (record, strategy) = repair_traced(input);
        assert!(strategy <= RepairStrategy::RegexFixups, "fell through to {:?}", strategy);
        assert_eq!(record, widget());
    }

    #[test]
    fn trailing_comma_only_never_reaches_fallback() {
        let input = r#"{"product":"Widget","audience":"teens","tone":"fun","description":"Great","features":["a"],"scene":"a room",}"#;
        let (record, strategy) = repair_traced(input);
        assert!(strategy <= RepairStrategy::RegexFixups);
        assert_ne!(record.product, FALLBACK_PRODUCT);
        assert_ne!(record.description, FALLBACK_EMPTY_DESCRIPTION);
        assert_eq!(record, widget());
    }

    #[test]
    fn garbage_yields_fallback_record() {
        let (record, strategy) = repair_traced("not json at all");
        assert_eq!(strategy, RepairStrategy::Fallback);
        assert_eq!(record.product, FALLBACK_PRODUCT);
        assert_eq!(record.description, "not json at all");
        assert!(record.description.chars().count() <= 200);
    }

    #[test]
    fn fallback_description_truncates_to_200_chars() {
        let long = "x".repeat(500);
        let record = repair(&long);
        assert_eq!(record.product, FALLBACK_PRODUCT);
        assert_eq!(record.description.chars().count(), 200);
    }

    #[test]
    fn empty_input_uses_fixed_description() {
        let record = repair("");
        assert_eq!(record.description, FALLBACK_EMPTY_DESCRIPTION);
    }

    #[test]
    fn json_embedded_in_prose_extracts() {
        let input = format!("Sure! Here is your ad:\n{}\nHope you like it.", VALID);
        let (record, strategy) = repair_traced(&input);
        assert_eq!(strategy, RepairStrategy::ExtractBraced);
        assert_eq!(record, widget());
    }

    #[test]
    fn prose_inside_envelope_extracts() {
        let input = serde_json::json!({
            "response": format!("Of course. {} Let me know!", VALID)
        })
        .to_string();
        let (record, strategy) = repair_traced(&input);
        assert_eq!(strategy, RepairStrategy::ExtractBraced);
        assert_eq!(record, widget());
    }

    #[test]
    fn smart_quotes_recover() {
        let input = "{\u{201c}product\u{201d}: \u{201c}Widget\u{201d}, \u{201c}audience\u{201d}: \u{201c}teens\u{201d}, \u{201c}tone\u{201d}: \u{201c}fun\u{201d}, \u{201c}description\u{201d}: \u{201c}Great\u{201d}, \u{201c}features\u{201d}: [\u{201c}a\u{201d}], \u{201c}scene\u{201d}: \u{201c}a room\u{201d}}";
        let (record, strategy) = repair_traced(input);
        assert_ne!(strategy, RepairStrategy::Fallback);
        assert_eq!(record, widget());
    }

    #[test]
    fn truncated_json_salvages_field_by_field() {
        // Truncated after the last value, closing brace lost: brace
        // extraction, rewriting, and the literal parser all fail; per-field
        // regexes still find everything.
        let input = r#"{"product": "Widget", "audience": "teens", "tone": "fun", "description": "Great", "features": ["a"], "scene": "a room""#;
        let (record, strategy) = repair_traced(input);
        assert_eq!(strategy, RepairStrategy::FieldScrape);
        assert_eq!(record.product, "Widget");
        assert_eq!(record.features, vec!["a".to_string()]);
        assert_eq!(record.scene, "a room");
    }

    #[test]
    fn audience_array_is_preserved() {
        let input = r#"{"product":"Cam","audience":["photographers","tech lovers"],"tone":"excited","description":"d","features":["HD"],"scene":"s"}"#;
        let record = repair(input);
        assert_eq!(
            record.audience,
            Audience::Many(vec!["photographers".into(), "tech lovers".into()])
        );
    }

    #[test]
    fn scalar_features_coerce_to_list() {
        let input = r#"{"product":"P","audience":"a","tone":"t","description":"d","features":"just one","scene":"s"}"#;
        let record = repair(input);
        assert_eq!(record.features, vec!["just one".to_string()]);
    }

    #[test]
    fn literal_parser_handles_python_style_dicts() {
        let value = LiteralParser::new(
            "{'product': 'Widget', 'ok': True, 'nothing': None, 'features': ['a', 'b',],}",
        )
        .parse()
        .unwrap();
        assert_eq!(value["product"], "Widget");
        assert_eq!(value["ok"], true);
        assert_eq!(value["nothing"], Value::Null);
        assert_eq!(value["features"], serde_json::json!(["a", "b"]));
    }

    #[test]
    fn literal_parser_rejects_junk() {
        assert!(LiteralParser::new("{'unterminated': 'value").parse().is_none());
        assert!(LiteralParser::new("{'k' 'v'}").parse().is_none());
        assert!(LiteralParser::new("").parse().is_none());
    }

    #[test]
    fn literal_eval_rejects_non_mapping() {
        assert!(literal_eval("", "[1, 2, 3]").is_none());
    }

    #[test]
    fn braced_slice_matches_depth() {
        assert_eq!(braced_slice(r#"x {"a": {"b": 1}} y"#), Some(r#"{"a": {"b": 1}}"#));
        assert_eq!(braced_slice("no braces"), None);
        assert_eq!(braced_slice("{unclosed"), None);
    }

    #[test]
    fn relax_json_rewrites_to_strict() {
        let relaxed = relax_json("{key: 'va\"lue', list: [1, 2,], done: True,}");
        let value: Value = serde_json::from_str(&relaxed).unwrap();
        assert_eq!(value["key"], "va\"lue");
        assert_eq!(value["list"], serde_json::json!([1, 2]));
        assert_eq!(value["done"], true);
    }
}
