//! 记录名称处理：相对名称 <-> 绝对名称
//!
//! Callers use names relative to the zone apex; the service uses absolute
//! names. Both directions keep the zone's trailing dot as given.

/// Apex marker used for names equal to the zone itself.
pub const APEX: &str = "@";

fn trim_dot(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

/// 将完整域名转换为相对名称
/// 如: "www.example.org." + "example.org." -> "www"
/// 如: "example.org." + "example.org." -> "@"
///
/// Names outside the zone are returned unchanged.
pub fn relative_name(full_name: &str, zone: &str) -> String {
    let full = trim_dot(full_name);
    let zone = trim_dot(zone);

    if full.eq_ignore_ascii_case(zone) {
        return APEX.to_string();
    }

    let cut = full.len().checked_sub(zone.len() + 1);
    match cut {
        Some(cut)
            if full.is_char_boundary(cut)
                && full[cut..].starts_with('.')
                && full[cut + 1..].eq_ignore_ascii_case(zone) =>
        {
            full[..cut].to_string()
        }
        _ => full_name.to_string(),
    }
}

/// 将相对名称转换为完整域名
/// 如: "www" + "example.org." -> "www.example.org."
/// 如: "@" + "example.org." -> "example.org."
///
/// Names that already end with a dot are treated as absolute.
pub fn absolute_name(name: &str, zone: &str) -> String {
    if name.is_empty() || name == APEX {
        zone.to_string()
    } else if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.{zone}")
    }
}
