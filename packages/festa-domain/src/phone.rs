/// Strips formatting characters from a phone number, keeping digits and a
/// single leading `+`. Returns `None` when the input contains anything other
/// than digits and the accepted separators, or when the digit count falls
/// outside the mobile range.
pub fn normalize(raw: &str) -> Option<String> {
	let trimmed = raw.trim();
	let (plus, rest) = match trimmed.strip_prefix('+') {
		Some(rest) => (true, rest),
		None => (false, trimmed),
	};
	let mut digits = String::with_capacity(rest.len());

	for c in rest.chars() {
		match c {
			'0'..='9' => digits.push(c),
			' ' | '-' | '.' | '(' | ')' => {},
			_ => return None,
		}
	}

	if !(7..=15).contains(&digits.len()) {
		return None;
	}
	if plus {
		return Some(format!("+{digits}"));
	}

	Some(digits)
}

pub fn is_mobile(raw: &str) -> bool {
	normalize(raw).is_some()
}

/// Two numbers match when their normalized digit sequences are equal,
/// ignoring an international prefix on either side.
pub fn matches(a: &str, b: &str) -> bool {
	match (normalize(a), normalize(b)) {
		(Some(a), Some(b)) =>
			a.trim_start_matches('+') == b.trim_start_matches('+'),
		_ => false,
	}
}
