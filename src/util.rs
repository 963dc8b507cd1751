use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Deterministic pseudo-random pair in [-1, 1] derived from an identifier.
/// The same entity id always maps to the same pair, which keeps layout
/// seeding reproducible across runs and cache buckets.
pub fn stable_pair(id: &str) -> (f32, f32) {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();

    let x = ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    let y = (((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}

pub fn ellipsize(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }

    let kept = text
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    format!("{kept}\u{2026}")
}

/// Two-decimal display formatting. Importance and weight are unbounded
/// above 1.0, so no clamping here.
pub fn format_fraction(value: f32) -> String {
    format!("{value:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_pair_is_deterministic_and_bounded() {
        let (x1, y1) = stable_pair("acme-corp");
        let (x2, y2) = stable_pair("acme-corp");
        assert_eq!((x1, y1), (x2, y2));
        assert!((-1.0..=1.0).contains(&x1));
        assert!((-1.0..=1.0).contains(&y1));

        let other = stable_pair("other-entity");
        assert_ne!((x1, y1), other);
    }

    #[test]
    fn format_fraction_does_not_clamp_large_values() {
        assert_eq!(format_fraction(0.5), "0.50");
        assert_eq!(format_fraction(2.35), "2.35");
        assert_eq!(format_fraction(12.0), "12.00");
    }

    #[test]
    fn ellipsize_truncates_long_names() {
        assert_eq!(ellipsize("short", 10), "short");
        assert_eq!(ellipsize("exactly-ten", 11), "exactly-ten");
        let cut = ellipsize("a very long entity display name", 8);
        assert_eq!(cut.chars().count(), 8);
        assert!(cut.ends_with('\u{2026}'));
    }
}
