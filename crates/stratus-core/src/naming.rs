//! Exposition-name normalization.

/// Split camel case at lower/digit→upper transitions and lowercase the
/// result: `RequestCount` → `request_count`, `ConsumedLCUs` → `consumed_lcus`.
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_ascii_uppercase() && prev_lower {
            out.push('_');
        }
        prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        out.push(c.to_ascii_lowercase());
    }
    out
}

/// Replace every character outside `[A-Za-z0-9:_]` with `_` and collapse
/// runs of underscores. Idempotent.
pub fn safe_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == ':' || c == '_' {
            if c == '_' && out.ends_with('_') {
                continue;
            }
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out
}
