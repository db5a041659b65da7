//! Zone-name helpers. Zone names travel through the prober as lowercase
//! ASCII strings that always end in the root label.

use hickory_proto::rr::Name;

/// Lowercase and append the root label when it is missing. The empty string
/// and `"."` both normalize to the root.
pub fn normalize(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    if lower.is_empty() || lower == "." {
        return ".".to_string();
    }
    if lower.ends_with('.') {
        lower
    } else {
        format!("{}.", lower)
    }
}

/// Name of the enclosing zone: the leftmost label removed. The root has no
/// parent.
pub fn parent(name: &str) -> Option<String> {
    let name = normalize(name);
    if name == "." {
        return None;
    }
    match name.split_once('.') {
        Some((_, "")) => Some(".".to_string()),
        Some((_, rest)) => Some(rest.to_string()),
        None => None,
    }
}

/// The leftmost label of an owner name, as text. NSEC3 owners carry the
/// base32hex hash here.
pub fn first_label(name: &Name) -> Option<String> {
    let label = name.iter().next()?;
    std::str::from_utf8(label).ok().map(|s| s.to_string())
}
