//! Tool parameters: schema, typed values and pre-flight validation.
//!
//! Callers may supply parameters already typed ([`PageRange`], [`CropBox`],
//! keyword lists) or as raw text, as the CLI does with `-p pages=3-7`.
//! [`resolve`] checks both against the tool's [`ParamSpec`]s and renders the
//! exact text each multipart field carries on the wire:
//!
//! | Kind | Wire form |
//! |------|-----------|
//! | page range | `from-to` |
//! | page list / order | `1,3,5-7` |
//! | crop box | `[x0,y0,x1,y1]` |
//! | keywords | `alpha,beta` |

use crate::error::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Comma-separated pages and ranges, e.g. `1,3,5-7`.
static PAGE_LIST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\d+\s*(?:-\s*\d+\s*)?(?:,\s*\d+\s*(?:-\s*\d+\s*)?)*$")
        .expect("page list regex")
});

// ── Typed values ─────────────────────────────────────────────────────────────

/// Inclusive, 1-indexed page range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub from: u32,
    pub to: u32,
}

impl PageRange {
    pub fn new(from: u32, to: u32) -> Self {
        Self { from, to }
    }

    /// `1 ≤ from ≤ to`, and `to ≤ page_count` when the count is known.
    pub fn validate(&self, page_count: Option<u32>) -> Result<(), ValidationError> {
        if self.from == 0 || self.to == 0 {
            return Err(ValidationError::PageZero);
        }
        if self.from > self.to {
            return Err(ValidationError::InvalidPageRange {
                from: self.from,
                to: self.to,
            });
        }
        if let Some(total) = page_count {
            if self.to > total {
                return Err(ValidationError::PageOutOfRange {
                    page: self.to,
                    total,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

impl FromStr for PageRange {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidParameter {
            name: "pages".into(),
            reason: format!("expected FROM-TO, got '{s}'"),
        };
        let s = s.trim();
        let (from, to) = match s.split_once('-') {
            Some((a, b)) => (a, b),
            None => (s, s),
        };
        let from = from.trim().parse().map_err(|_| invalid())?;
        let to = to.trim().parse().map_err(|_| invalid())?;
        Ok(Self { from, to })
    }
}

/// Crop rectangle in PDF points: lower-left `(x0, y0)`, upper-right `(x1, y1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl CropBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let coords = [self.x0, self.y0, self.x1, self.y1];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(ValidationError::InvalidCropBox {
                reason: "coordinates must be finite numbers".into(),
            });
        }
        if coords.iter().any(|c| *c < 0.0) {
            return Err(ValidationError::InvalidCropBox {
                reason: "coordinates must not be negative".into(),
            });
        }
        if self.x1 <= self.x0 || self.y1 <= self.y0 {
            return Err(ValidationError::InvalidCropBox {
                reason: "x1 must be > x0 and y1 must be > y0".into(),
            });
        }
        Ok(())
    }
}

impl Default for CropBox {
    fn default() -> Self {
        Self::new(0.0, 0.0, 500.0, 700.0)
    }
}

impl fmt::Display for CropBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{},{},{}]", self.x0, self.y0, self.x1, self.y1)
    }
}

impl FromStr for CropBox {
    type Err = ValidationError;

    /// Accepts `[x0,y0,x1,y1]` or the bare `x0,y0,x1,y1`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidCropBox {
            reason: format!("expected [x0,y0,x1,y1], got '{s}'"),
        };
        let inner = s.trim().trim_start_matches('[').trim_end_matches(']');
        let nums = inner
            .split(',')
            .map(|n| n.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| invalid())?;
        match nums.as_slice() {
            [x0, y0, x1, y1] => Ok(Self::new(*x0, *y0, *x1, *y1)),
            _ => Err(invalid()),
        }
    }
}

/// A parameter value as supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Raw text, parsed against the spec's kind during validation.
    Text(String),
    PageRange(PageRange),
    CropBox(CropBox),
    Keywords(Vec<String>),
    Integer(i64),
    Json(serde_json::Value),
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Text(s)
    }
}

impl From<PageRange> for ParamValue {
    fn from(r: PageRange) -> Self {
        ParamValue::PageRange(r)
    }
}

impl From<CropBox> for ParamValue {
    fn from(b: CropBox) -> Self {
        ParamValue::CropBox(b)
    }
}

impl From<serde_json::Value> for ParamValue {
    fn from(v: serde_json::Value) -> Self {
        ParamValue::Json(v)
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        ParamValue::Integer(n)
    }
}

/// Parameters for one submission, keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    values: BTreeMap<String, ParamValue>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set any field.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn password(self, password: impl Into<String>) -> Self {
        self.set("password", password.into())
    }

    pub fn page_range(self, from: u32, to: u32) -> Self {
        self.set("pages", PageRange::new(from, to))
    }

    pub fn crop_box(self, b: CropBox) -> Self {
        self.set("cropBox", b)
    }

    pub fn keywords<I, S>(self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words = words.into_iter().map(Into::into).collect();
        self.set("keywords", ParamValue::Keywords(words))
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse `key=value` pairs, as given on the command line.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut params = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (k, v) = pair
                .split_once('=')
                .ok_or_else(|| ValidationError::InvalidParameter {
                    name: pair.to_string(),
                    reason: "expected KEY=VALUE".into(),
                })?;
            params.insert(k.trim(), v);
        }
        Ok(params)
    }
}

// ── Schema ───────────────────────────────────────────────────────────────────

/// How a parameter is parsed and checked.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    /// Free text.
    Text,
    /// Free text that must never be logged.
    Secret,
    /// Single `from-to` range, checked against the known page count.
    PageRange,
    /// `1,3,5-7`: pages and ranges, checked against the known page count.
    PageList,
    /// `[x0,y0,x1,y1]`.
    CropBox,
    /// Comma-separated keywords.
    Keywords,
    /// Integer within inclusive bounds.
    Integer { min: i64, max: i64 },
    /// One of a fixed set of strings.
    Choice(Vec<String>),
    /// Absolute http(s) URL.
    Url,
    /// JSON object, sent in compact form.
    JsonObject,
}

/// When a parameter must be present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Required,
    Optional,
    /// Required only when the named file slot has a selection.
    WithSlot(String),
}

/// One form field of a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub requirement: Requirement,
    /// Sent when the caller supplies nothing.
    pub default: Option<String>,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            requirement: Requirement::Required,
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            requirement: Requirement::Optional,
            ..Self::required(name, kind)
        }
    }

    pub fn with_slot(name: impl Into<String>, kind: ParamKind, slot: impl Into<String>) -> Self {
        Self {
            requirement: Requirement::WithSlot(slot.into()),
            ..Self::required(name, kind)
        }
    }

    pub fn default_value(mut self, v: impl Into<String>) -> Self {
        self.default = Some(v.into());
        self
    }

    pub fn is_secret(&self) -> bool {
        matches!(self.kind, ParamKind::Secret)
    }

    fn is_required(&self, filled_slots: &BTreeSet<&str>) -> bool {
        match &self.requirement {
            Requirement::Required => true,
            Requirement::Optional => false,
            Requirement::WithSlot(slot) => filled_slots.contains(slot.as_str()),
        }
    }

    /// Validate one value and render its wire text.
    fn render(&self, value: &ParamValue, page_count: Option<u32>) -> Result<String, ValidationError> {
        let invalid = |reason: String| ValidationError::InvalidParameter {
            name: self.name.clone(),
            reason,
        };
        match (&self.kind, value) {
            (ParamKind::PageRange, ParamValue::PageRange(r)) => {
                r.validate(page_count)?;
                Ok(r.to_string())
            }
            (ParamKind::PageRange, ParamValue::Text(s)) => {
                let r: PageRange = s.parse()?;
                r.validate(page_count)?;
                Ok(r.to_string())
            }
            (ParamKind::PageList, ParamValue::PageRange(r)) => {
                r.validate(page_count)?;
                Ok(r.to_string())
            }
            (ParamKind::PageList, ParamValue::Text(s)) => render_page_list(&self.name, s, page_count),
            (ParamKind::CropBox, ParamValue::CropBox(b)) => {
                b.validate()?;
                Ok(b.to_string())
            }
            (ParamKind::CropBox, ParamValue::Text(s)) => {
                let b: CropBox = s.parse()?;
                b.validate()?;
                Ok(b.to_string())
            }
            (ParamKind::Keywords, ParamValue::Keywords(words)) => self.render_keywords(words.iter().map(String::as_str)),
            (ParamKind::Keywords, ParamValue::Text(s)) => self.render_keywords(s.split(',')),
            (ParamKind::Integer { min, max }, value) => {
                let n = match value {
                    ParamValue::Integer(n) => *n,
                    ParamValue::Text(s) => s
                        .trim()
                        .parse::<i64>()
                        .map_err(|_| invalid(format!("'{s}' is not an integer")))?,
                    other => return Err(invalid(format!("expected an integer, got {other:?}"))),
                };
                if n < *min || n > *max {
                    return Err(invalid(format!("must be between {min} and {max}, got {n}")));
                }
                Ok(n.to_string())
            }
            (ParamKind::Choice(options), ParamValue::Text(s)) => {
                let s = s.trim();
                if options.iter().any(|o| o == s) {
                    Ok(s.to_string())
                } else {
                    Err(invalid(format!("must be one of {}", options.join(", "))))
                }
            }
            (ParamKind::Choice(options), ParamValue::Integer(n)) => {
                let s = n.to_string();
                if options.contains(&s) {
                    Ok(s)
                } else {
                    Err(invalid(format!("must be one of {}", options.join(", "))))
                }
            }
            (ParamKind::Url, ParamValue::Text(s)) => {
                let s = s.trim();
                match reqwest::Url::parse(s) {
                    Ok(u) if matches!(u.scheme(), "http" | "https") => Ok(s.to_string()),
                    _ => Err(invalid(format!("'{s}' is not an http(s) URL"))),
                }
            }
            (ParamKind::JsonObject, ParamValue::Json(v)) => render_json_object(v).map_err(invalid),
            (ParamKind::JsonObject, ParamValue::Text(s)) => {
                let v: serde_json::Value =
                    serde_json::from_str(s).map_err(|e| invalid(format!("not valid JSON: {e}")))?;
                render_json_object(&v).map_err(invalid)
            }
            (ParamKind::Text | ParamKind::Secret, ParamValue::Text(s)) => {
                if s.trim().is_empty() {
                    Err(ValidationError::MissingParameter {
                        name: self.name.clone(),
                    })
                } else {
                    Ok(s.clone())
                }
            }
            (kind, other) => Err(invalid(format!("{other:?} does not fit a {kind:?} parameter"))),
        }
    }

    fn render_keywords<'a>(&self, words: impl Iterator<Item = &'a str>) -> Result<String, ValidationError> {
        let words: Vec<&str> = words.map(str::trim).filter(|w| !w.is_empty()).collect();
        if words.is_empty() {
            return Err(ValidationError::MissingParameter {
                name: self.name.clone(),
            });
        }
        Ok(words.join(","))
    }
}

fn render_json_object(v: &serde_json::Value) -> Result<String, String> {
    if v.is_object() {
        Ok(v.to_string())
    } else {
        Err(format!("expected a JSON object, got {v}"))
    }
}

fn render_page_list(name: &str, s: &str, page_count: Option<u32>) -> Result<String, ValidationError> {
    if !PAGE_LIST_RE.is_match(s) {
        return Err(ValidationError::InvalidParameter {
            name: name.to_string(),
            reason: format!("expected pages like 1,3,5-7, got '{s}'"),
        });
    }
    let mut parts = Vec::new();
    for entry in s.split(',') {
        let range: PageRange = entry.parse()?;
        range.validate(page_count)?;
        parts.push(if range.from == range.to {
            range.from.to_string()
        } else {
            range.to_string()
        });
    }
    Ok(parts.join(","))
}

/// Validate `params` against `specs` and produce the form fields to send.
///
/// * `page_count` — known page count of the primary input, if fetched.
/// * `filled_slots` — file slots that hold a selection, for
///   [`Requirement::WithSlot`].
/// * `one_of` — groups of which at least one field must be supplied.
///
/// Parameters that no spec names are ignored rather than forwarded.
pub fn resolve(
    specs: &[ParamSpec],
    one_of: &[Vec<String>],
    params: &Parameters,
    page_count: Option<u32>,
    filled_slots: &BTreeSet<&str>,
) -> Result<Vec<(String, String)>, ValidationError> {
    let mut fields = Vec::with_capacity(specs.len());
    for spec in specs {
        let supplied = params.get(&spec.name).filter(|v| !is_blank(v));
        match (supplied, &spec.default) {
            (Some(value), _) => fields.push((spec.name.clone(), spec.render(value, page_count)?)),
            (None, Some(default)) => fields.push((spec.name.clone(), default.clone())),
            (None, None) if spec.is_required(filled_slots) => {
                return Err(ValidationError::MissingParameter {
                    name: spec.name.clone(),
                })
            }
            (None, None) => {}
        }
    }

    for group in one_of {
        let satisfied = group
            .iter()
            .any(|name| fields.iter().any(|(field, _)| field == name));
        if !satisfied {
            return Err(ValidationError::MissingOneOf {
                fields: group.clone(),
            });
        }
    }

    Ok(fields)
}

fn is_blank(v: &ParamValue) -> bool {
    match v {
        ParamValue::Text(s) => s.trim().is_empty(),
        ParamValue::Keywords(words) => words.iter().all(|w| w.trim().is_empty()),
        ParamValue::Json(v) => v.is_null(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_slots() -> BTreeSet<&'static str> {
        BTreeSet::new()
    }

    #[test]
    fn inverted_page_range_is_rejected() {
        let err = PageRange::new(5, 3).validate(Some(10)).unwrap_err();
        assert_eq!(err, ValidationError::InvalidPageRange { from: 5, to: 3 });
    }

    #[test]
    fn page_range_beyond_document_is_rejected() {
        let err = PageRange::new(3, 11).validate(Some(10)).unwrap_err();
        assert_eq!(err, ValidationError::PageOutOfRange { page: 11, total: 10 });
        assert!(PageRange::new(3, 11).validate(None).is_ok());
    }

    #[test]
    fn page_zero_is_rejected() {
        assert_eq!(PageRange::new(0, 3).validate(None), Err(ValidationError::PageZero));
    }

    #[test]
    fn page_range_parses_single_page() {
        assert_eq!("4".parse::<PageRange>().unwrap(), PageRange::new(4, 4));
        assert_eq!(" 2 - 9 ".parse::<PageRange>().unwrap(), PageRange::new(2, 9));
        assert!("two-nine".parse::<PageRange>().is_err());
    }

    #[test]
    fn crop_box_wire_form_and_checks() {
        let b = CropBox::new(72.0, 72.0, 500.0, 700.5);
        assert_eq!(b.to_string(), "[72,72,500,700.5]");
        assert_eq!("[72,72,500,700.5]".parse::<CropBox>().unwrap(), b);

        let inverted = CropBox::new(100.0, 0.0, 100.0, 50.0);
        assert!(matches!(
            inverted.validate(),
            Err(ValidationError::InvalidCropBox { .. })
        ));
        assert!("[1,2,3]".parse::<CropBox>().is_err());
    }

    #[test]
    fn page_list_normalises_and_checks_bounds() {
        let spec = ParamSpec::required("pages", ParamKind::PageList);
        let params = Parameters::new().set("pages", " 1, 3 ,5-7");
        let out = resolve(&[spec.clone()], &[], &params, Some(10), &no_slots()).unwrap();
        assert_eq!(out, vec![("pages".to_string(), "1,3,5-7".to_string())]);

        let params = Parameters::new().set("pages", "1,12");
        assert!(matches!(
            resolve(&[spec.clone()], &[], &params, Some(10), &no_slots()),
            Err(ValidationError::PageOutOfRange { page: 12, total: 10 })
        ));

        let params = Parameters::new().set("pages", "1;2");
        assert!(matches!(
            resolve(&[spec], &[], &params, None, &no_slots()),
            Err(ValidationError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn blank_required_password_is_missing() {
        let spec = ParamSpec::required("password", ParamKind::Secret);
        let params = Parameters::new().password("   ");
        assert_eq!(
            resolve(&[spec], &[], &params, None, &no_slots()),
            Err(ValidationError::MissingParameter {
                name: "password".into()
            })
        );
    }

    #[test]
    fn keywords_are_trimmed_and_joined() {
        let spec = ParamSpec::required("keywords", ParamKind::Keywords);
        let params = Parameters::new().keywords(["secret ", "", " invoice"]);
        let out = resolve(&[spec.clone()], &[], &params, None, &no_slots()).unwrap();
        assert_eq!(out[0].1, "secret,invoice");

        let params = Parameters::new().set("keywords", " , ");
        assert!(resolve(&[spec], &[], &params, None, &no_slots()).is_err());
    }

    #[test]
    fn integer_bounds_and_choices() {
        let size = ParamSpec::optional("font_size", ParamKind::Integer { min: 6, max: 72 });
        let angle = ParamSpec::required(
            "angle",
            ParamKind::Choice(vec!["90".into(), "180".into(), "270".into()]),
        );
        let ok = Parameters::new().set("font_size", 12i64).set("angle", "180");
        let out = resolve(&[size.clone(), angle.clone()], &[], &ok, None, &no_slots()).unwrap();
        assert_eq!(out, vec![("font_size".into(), "12".into()), ("angle".into(), "180".into())]);

        let bad = Parameters::new().set("font_size", "200").set("angle", "45");
        assert!(resolve(&[size, angle], &[], &bad, None, &no_slots()).is_err());
    }

    #[test]
    fn defaults_fill_missing_optional_fields() {
        let spec = ParamSpec::optional("position", ParamKind::Text).default_value("bottom-right");
        let out = resolve(&[spec], &[], &Parameters::new(), None, &no_slots()).unwrap();
        assert_eq!(out, vec![("position".into(), "bottom-right".into())]);
    }

    #[test]
    fn slot_dependent_requirement() {
        let spec = ParamSpec::with_slot("password", ParamKind::Secret, "cert");
        assert!(resolve(&[spec.clone()], &[], &Parameters::new(), None, &no_slots()).is_ok());

        let filled: BTreeSet<&str> = ["file", "cert"].into_iter().collect();
        assert!(matches!(
            resolve(&[spec], &[], &Parameters::new(), None, &filled),
            Err(ValidationError::MissingParameter { .. })
        ));
    }

    #[test]
    fn one_of_group_requires_an_alternative() {
        let specs = vec![
            ParamSpec::optional("url", ParamKind::Url),
            ParamSpec::optional("html", ParamKind::Text),
        ];
        let group = vec![vec!["url".to_string(), "html".to_string()]];
        assert!(matches!(
            resolve(&specs, &group, &Parameters::new(), None, &no_slots()),
            Err(ValidationError::MissingOneOf { .. })
        ));
        let params = Parameters::new().set("html", "<h1>Hi</h1>");
        let out = resolve(&specs, &group, &params, None, &no_slots()).unwrap();
        assert_eq!(out, vec![("html".into(), "<h1>Hi</h1>".into())]);

        let params = Parameters::new().set("url", "file:///etc/passwd");
        assert!(resolve(&specs, &group, &params, None, &no_slots()).is_err());
    }

    #[test]
    fn pairs_parse_from_command_line() {
        let p = Parameters::from_pairs(["pages=1-3", "password=a=b"]).unwrap();
        assert_eq!(p.get("pages"), Some(&ParamValue::Text("1-3".into())));
        assert_eq!(p.get("password"), Some(&ParamValue::Text("a=b".into())));
        assert!(Parameters::from_pairs(["novalue"]).is_err());
    }

    #[test]
    fn json_object_is_sent_compact() {
        let spec = ParamSpec::required("options", ParamKind::JsonObject);
        let params = Parameters::new().set("options", serde_json::json!({"rotate": 90}));
        let out = resolve(&[spec.clone()], &[], &params, None, &no_slots()).unwrap();
        assert_eq!(out, vec![("options".into(), r#"{"rotate":90}"#.into())]);

        let text = Parameters::new().set("options", r#"{ "addText": "Draft" }"#);
        let out = resolve(&[spec.clone()], &[], &text, None, &no_slots()).unwrap();
        assert_eq!(out[0].1, r#"{"addText":"Draft"}"#);

        for bad in ["[1,2]", "{not json"] {
            let params = Parameters::new().set("options", bad);
            assert!(matches!(
                resolve(&[spec.clone()], &[], &params, None, &no_slots()),
                Err(ValidationError::InvalidParameter { .. })
            ));
        }
    }
}
