use rand::{distributions::Alphanumeric, Rng};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn cookie(name: &str, value: &str, secure: bool) -> String {
    let secure = if secure { " Secure;" } else { "" };
    format!("{name}={value}; HttpOnly; Max-Age=86400;{secure} Path=/; SameSite=Strict")
}

pub fn clear_cookie(name: &str, secure: bool) -> String {
    let secure = if secure { " Secure;" } else { "" };
    format!("{name}=; HttpOnly; Max-Age=0;{secure} Path=/; SameSite=Strict")
}

/// Random lowercase alphanumeric key, used for invitation links.
pub fn random_key(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect()
}

pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut dash = false;
    for c in title.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            dash = false;
        } else if !slug.is_empty() && !dash {
            slug.push('-');
            dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("quiz");
    }
    slug
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn percentage(part: i64, whole: i64) -> String {
    if whole == 0 {
        return "0%".to_string();
    }
    let value = 100.0 * part as f64 / whole as f64;
    format!("{}%", (value * 100.0).round() / 100.0)
}
