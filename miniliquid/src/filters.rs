//! Filter functions.
//!
//! Filters post-process the value of an expression.  They are applied with
//! the pipe syntax and can take arguments after a colon, separated by
//! commas.  Arguments are expressions themselves:
//!
//! ```liquid
//! {{ page.title | default: site.title | replace: "Tile", "Stone" }}
//! ```
//!
//! Filters never fail.  A filter that does not know what to do with a value
//! hands it back unchanged, and so does a filter name that does not exist.
//!
//! The following filters are built in:
//!
//! - [`default`]
//! - [`relative_url`]
//! - [`replace`]
//! - [`join`]
//! - [`jsonify`]
//! - [`date`]
//! - [`sort`]
//! - [`reverse`]
//! - [`size`]
use std::borrow::Cow;
use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

use crate::context::Context;
use crate::value::Value;

/// Applies a filter by name.
pub(crate) fn apply(ctx: &Context, name: &str, value: Value, args: &[Value]) -> Value {
    match name {
        "default" => default(value, args.first().cloned()),
        "relative_url" => relative_url(&value, &ctx.lookup("site.baseurl")),
        "replace" => replace(&value, args.first(), args.get(1)),
        "join" => join(value, args.first()),
        "jsonify" => jsonify(&value),
        "date" => date(&value, args.first()),
        "sort" => sort(value, args.first()),
        "reverse" => reverse(value),
        "size" => size(&value),
        _ => {
            tracing::trace!(filter = name, "unknown filter, value passed through");
            value
        }
    }
}

/// Substitutes blank values.
///
/// If the value is `nil`, an empty string or an empty collection the
/// argument is returned instead (`nil` if there is none).  Every other
/// value, including `false` and `0`, passes through.
///
/// ```liquid
/// <title>{{ page.title | default: "Untitled" }}</title>
/// ```
pub fn default(value: Value, fallback: Option<Value>) -> Value {
    if value.is_blank() {
        fallback.unwrap_or_default()
    } else {
        value
    }
}

/// Prefixes a path with the site's base URL.
///
/// Absolute `http://` and `https://` URLs are returned as they are.  Other
/// paths get a leading slash if they lack one and are joined to `baseurl`
/// (which loses a trailing slash).  Runs of slashes are collapsed, except
/// right after a colon.  Inside templates `baseurl` is `site.baseurl`.
///
/// ```liquid
/// <link rel="stylesheet" href="{{ "assets/main.css" | relative_url }}">
/// ```
pub fn relative_url(value: &Value, baseurl: &Value) -> Value {
    let path = value.to_str();
    if path.starts_with("http://") || path.starts_with("https://") {
        return Value::String(path.into_owned());
    }
    let baseurl = baseurl.to_str();
    let mut joined = String::from(baseurl.strip_suffix('/').unwrap_or(&*baseurl));
    if !path.starts_with('/') {
        joined.push('/');
    }
    joined.push_str(&path);
    Value::String(collapse_slashes(&joined))
}

fn collapse_slashes(s: &str) -> String {
    let mut rv = String::with_capacity(s.len());
    let mut prev = None;
    let mut in_run = false;
    for c in s.chars() {
        if c == '/' {
            if in_run {
                continue;
            }
            in_run = prev != Some(':');
        } else {
            in_run = false;
        }
        rv.push(c);
        prev = Some(c);
    }
    rv
}

/// Replaces all occurrences of the first argument with the second.
///
/// The value and both arguments are converted into strings, missing
/// arguments are empty strings.
///
/// ```liquid
/// {{ "bath tile" | replace: "tile", "Tile" }} -> bath Tile
/// ```
pub fn replace(value: &Value, from: Option<&Value>, to: Option<&Value>) -> Value {
    let from = from.map_or(Cow::Borrowed(""), Value::to_str);
    let to = to.map_or(Cow::Borrowed(""), Value::to_str);
    Value::String(value.to_str().replace(&*from, &to))
}

/// Joins the items of a list with a separator.
///
/// The value is first turned into a list (see [`Value::into_list`]).  The
/// separator defaults to `", "`, a separator that evaluates to `nil` joins
/// without anything in between.
///
/// ```liquid
/// {{ page.tags | join: " / " }}
/// ```
pub fn join(value: Value, separator: Option<&Value>) -> Value {
    let separator = separator.map_or(Cow::Borrowed(", "), Value::to_str);
    let mut rv = String::new();
    for (idx, item) in value.into_list().into_iter().enumerate() {
        if idx > 0 {
            rv.push_str(&separator);
        }
        rv.push_str(&item.to_str());
    }
    Value::String(rv)
}

/// Serializes the value to JSON.
///
/// ```liquid
/// <script>const tags = {{ page.tags | jsonify }};</script>
/// ```
pub fn jsonify(value: &Value) -> Value {
    Value::String(serde_json::to_string(value).unwrap_or_else(|_| "null".into()))
}

/// Formats a point in time with a strftime pattern.
///
/// Strings are parsed as RFC 3339, RFC 2822, `YYYY-MM-DD HH:MM[:SS[.fff]]`
/// with an optional `±zzzz` offset (also with `T` or `/` separators), or
/// as a plain date like `2024-03-05`, `2024/03/05`, `March 5, 2024` or
/// `5 March 2024` (start of day).  Numbers are unix timestamps.  Times without an
/// offset are UTC.  Anything that cannot be understood is the current time.
///
/// Without a pattern the timestamp is returned in RFC 3339 form.  Pattern
/// directives chrono does not know are dropped.
///
/// ```liquid
/// <time>{{ page.date | date: "%B %d, %Y" }}</time>
/// ```
pub fn date(value: &Value, format: Option<&Value>) -> Value {
    let time = to_timestamp(value).unwrap_or_else(|| Utc::now().fixed_offset());
    let format = format.map_or(Cow::Borrowed(""), Value::to_str);
    if format.is_empty() {
        return Value::String(time.to_rfc3339());
    }
    let items: Vec<Item<'_>> = StrftimeItems::new(&format)
        .filter(|item| !matches!(item, Item::Error))
        .collect();
    let mut rv = String::new();
    match write!(rv, "{}", time.format_with_items(items.iter())) {
        Ok(()) => Value::String(rv),
        Err(_) => Value::String(time.to_rfc3339()),
    }
}

fn to_timestamp(value: &Value) -> Option<DateTime<FixedOffset>> {
    match *value {
        Value::String(ref s) => parse_timestamp(s),
        Value::Int(secs) => DateTime::<Utc>::from_timestamp(secs, 0).map(|x| x.fixed_offset()),
        Value::Float(secs) if secs.is_finite() => {
            let whole = secs.floor();
            let nanos = ((secs - whole) * 1e9) as u32;
            DateTime::<Utc>::from_timestamp(whole as i64, nanos).map(|x| x.fixed_offset())
        }
        _ => None,
    }
}

// timestamps with an explicit offset
const OFFSET_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M %z",
    "%Y/%m/%d %H:%M:%S %z",
];

// timestamps without an offset, taken as UTC
const NAIVE_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

// plain dates, taken as the start of the day
const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%B %d, %Y", "%d %B %Y", "%B %d %Y"];

fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Ok(rv) = DateTime::parse_from_rfc3339(s) {
        return Some(rv);
    }
    if let Ok(rv) = DateTime::parse_from_rfc2822(s) {
        return Some(rv);
    }
    if let Some(rv) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
    {
        return Some(rv);
    }
    if let Some(rv) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(rv.and_utc().fixed_offset());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|x| x.and_hms_opt(0, 0, 0))
        .map(|x| x.and_utc().fixed_offset())
}

/// Sorts a list of maps by a key.
///
/// The sort is stable.  Items missing the key sort first.  Without a key,
/// or if the value is not a sequence, the value is returned unchanged.
///
/// ```liquid
/// {% assign projects = site.projects | sort: "date" %}
/// ```
pub fn sort(value: Value, key: Option<&Value>) -> Value {
    let key = match key {
        Some(key) if !key.is_none() => key.to_str(),
        _ => return value,
    };
    match value {
        Value::Seq(mut items) => {
            items.sort_by(|a, b| sort_key(a, &key).cmp(&sort_key(b, &key)));
            Value::Seq(items)
        }
        other => other,
    }
}

fn sort_key<'v>(item: &'v Value, key: &str) -> Cow<'v, Value> {
    item.get_attr(key).unwrap_or(Cow::Owned(Value::None))
}

/// Reverses a sequence or the characters of a string.
///
/// ```liquid
/// {% for post in site.posts | reverse %}…{% endfor %}
/// ```
pub fn reverse(value: Value) -> Value {
    match value {
        Value::Seq(mut items) => {
            items.reverse();
            Value::Seq(items)
        }
        Value::String(s) => Value::String(s.chars().rev().collect()),
        other => other,
    }
}

/// Returns the number of characters, items or entries, `0` otherwise.
///
/// ```liquid
/// {{ page.tags | size }} tags
/// ```
pub fn size(value: &Value) -> Value {
    Value::from(value.len().unwrap_or(0))
}
