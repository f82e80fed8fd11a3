//! Built-in rules.
//!
//! Rule names, options and default messages follow the usual validate.js
//! conventions so schemas written for it keep working. Every rule except
//! `presence` lets `null` through.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::registry::RuleContext;

/// Signature shared by every built-in rule.
pub(crate) type BuiltinRule = fn(&Value, &Value, &RuleContext<'_>) -> Vec<String>;

/// Looks up a built-in rule by name.
pub(crate) fn builtin(name: &str) -> Option<BuiltinRule> {
	let rule: BuiltinRule = match name {
		"presence" => presence,
		"length" => length,
		"equality" => equality,
		"format" => format,
		"numericality" => numericality,
		"inclusion" => inclusion,
		"exclusion" => exclusion,
		"email" => email,
		_ => return None,
	};
	Some(rule)
}

/// Returns `false` for options that switch a rule off.
pub(crate) fn is_enabled(options: &Value) -> bool {
	!matches!(options, Value::Null | Value::Bool(false))
}

/// Custom `message` option, with a leading `^` stripped.
fn custom_message(options: &Value, value: &Value) -> Option<String> {
	let message = options.get("message")?.as_str()?;
	let message = message.strip_prefix('^').unwrap_or(message);
	Some(message.replace("%{value}", &display(value)))
}

fn fail(options: &Value, value: &Value, default: impl FnOnce() -> String) -> Vec<String> {
	vec![custom_message(options, value).unwrap_or_else(default)]
}

fn display(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

/// `confirmPassword` → `confirm password`, `first_name` → `first name`.
fn prettify(name: &str) -> String {
	let mut out = String::with_capacity(name.len() + 4);
	let mut prev_lower = false;
	for ch in name.chars() {
		if ch == '_' || ch == '-' {
			out.push(' ');
			prev_lower = false;
		} else if ch.is_uppercase() && prev_lower {
			out.push(' ');
			out.extend(ch.to_lowercase());
			prev_lower = false;
		} else {
			out.extend(ch.to_lowercase());
			prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
		}
	}
	out
}

fn is_empty(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::String(s) => s.trim().is_empty(),
		Value::Array(items) => items.is_empty(),
		Value::Object(map) => map.is_empty(),
		Value::Bool(_) | Value::Number(_) => false,
	}
}

fn presence(value: &Value, options: &Value, _: &RuleContext<'_>) -> Vec<String> {
	let allow_empty = options.get("allowEmpty").and_then(Value::as_bool).unwrap_or(true);
	let missing = if allow_empty { value.is_null() } else { is_empty(value) };
	if missing { fail(options, value, || "can't be blank".into()) } else { Vec::new() }
}

fn length(value: &Value, options: &Value, _: &RuleContext<'_>) -> Vec<String> {
	let len = match value {
		Value::Null => return Vec::new(),
		Value::String(s) => s.chars().count(),
		Value::Array(items) => items.len(),
		_ => return fail(options, value, || "has an incorrect length".into()),
	};
	let bound = |key: &str| options.get(key).and_then(Value::as_u64).and_then(|n| usize::try_from(n).ok());

	let mut errors = Vec::new();
	if let Some(is) = bound("is")
		&& len != is
	{
		errors.push(format!("is the wrong length (should be {is} characters)"));
	}
	if let Some(min) = bound("minimum")
		&& len < min
	{
		errors.push(format!("is too short (minimum is {min} characters)"));
	}
	if let Some(max) = bound("maximum")
		&& len > max
	{
		errors.push(format!("is too long (maximum is {max} characters)"));
	}
	if errors.is_empty() {
		return errors;
	}
	custom_message(options, value).map_or(errors, |message| vec![message])
}

fn equality(value: &Value, options: &Value, cx: &RuleContext<'_>) -> Vec<String> {
	if value.is_null() {
		return Vec::new();
	}
	let attribute = match options {
		Value::String(name) => name.as_str(),
		_ => match options.get("attribute").and_then(Value::as_str) {
			Some(name) => name,
			None => return Vec::new(),
		},
	};
	let other = cx.sibling(attribute).unwrap_or(&Value::Null);
	if value == other {
		Vec::new()
	} else {
		fail(options, value, || format!("is not equal to {}", prettify(attribute)))
	}
}

fn format(value: &Value, options: &Value, _: &RuleContext<'_>) -> Vec<String> {
	if value.is_null() {
		return Vec::new();
	}
	let (pattern, flags) = match options {
		Value::String(pattern) => (pattern.as_str(), ""),
		_ => match options.get("pattern").and_then(Value::as_str) {
			Some(pattern) => (pattern, options.get("flags").and_then(Value::as_str).unwrap_or("")),
			None => return Vec::new(),
		},
	};
	let inline: String = flags.chars().filter(|c| matches!(c, 'i' | 'm' | 's')).collect();
	let prefix = if inline.is_empty() { String::new() } else { format!("(?{inline})") };
	let matched = match Regex::new(&format!("{prefix}^(?:{pattern})$")) {
		Ok(re) => value.as_str().is_some_and(|s| re.is_match(s)),
		Err(err) => {
			tracing::warn!(pattern, error = %err, "validation.format.bad_pattern");
			return Vec::new();
		}
	};
	if matched { Vec::new() } else { fail(options, value, || "is invalid".into()) }
}

fn numericality(value: &Value, options: &Value, _: &RuleContext<'_>) -> Vec<String> {
	let number = match value {
		Value::Null => return Vec::new(),
		Value::Number(n) => n.as_f64(),
		Value::String(s) if !s.trim().is_empty() => s.trim().parse::<f64>().ok(),
		_ => None,
	};
	let Some(number) = number.filter(|n| n.is_finite()) else {
		return fail(options, value, || "is not a number".into());
	};

	let mut errors = Vec::new();
	if options.get("onlyInteger").and_then(Value::as_bool).unwrap_or(false) && number.fract() != 0.0 {
		return fail(options, value, || "must be an integer".into());
	}
	let checks: [(&str, &str, fn(f64, f64) -> bool); 5] = [
		("greaterThan", "greater than", |n, c| n > c),
		("greaterThanOrEqualTo", "greater than or equal to", |n, c| n >= c),
		("equalTo", "equal to", |n, c| n == c),
		("lessThan", "less than", |n, c| n < c),
		("lessThanOrEqualTo", "less than or equal to", |n, c| n <= c),
	];
	for (key, label, holds) in checks {
		if let Some(count) = options.get(key).and_then(Value::as_f64)
			&& !holds(number, count)
		{
			errors.push(format!("must be {label} {}", display(&options[key])));
		}
	}
	if options.get("odd").and_then(Value::as_bool).unwrap_or(false) && number % 2.0 != 1.0 && number % 2.0 != -1.0 {
		errors.push("must be odd".into());
	}
	if options.get("even").and_then(Value::as_bool).unwrap_or(false) && number % 2.0 != 0.0 {
		errors.push("must be even".into());
	}
	if errors.is_empty() {
		return errors;
	}
	custom_message(options, value).map_or(errors, |message| vec![message])
}

fn within(options: &Value) -> &[Value] {
	match options {
		Value::Array(items) => items,
		_ => options.get("within").and_then(Value::as_array).map_or(&[][..], Vec::as_slice),
	}
}

fn inclusion(value: &Value, options: &Value, _: &RuleContext<'_>) -> Vec<String> {
	if value.is_null() || within(options).contains(value) {
		return Vec::new();
	}
	fail(options, value, || format!("{} is not included in the list", display(value)))
}

fn exclusion(value: &Value, options: &Value, _: &RuleContext<'_>) -> Vec<String> {
	if value.is_null() || !within(options).contains(value) {
		return Vec::new();
	}
	fail(options, value, || format!("{} is restricted", display(value)))
}

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r"(?i)^[a-z0-9\x{7F}-\x{FFFF}!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9\x{7F}-\x{FFFF}!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z]{2,}$",
	)
	.expect("email pattern compiles")
});

fn email(value: &Value, options: &Value, _: &RuleContext<'_>) -> Vec<String> {
	match value {
		Value::Null => Vec::new(),
		Value::String(s) if EMAIL.is_match(s) => Vec::new(),
		_ => fail(options, value, || "is not a valid email".into()),
	}
}
