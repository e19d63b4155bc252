//! Team name similarity.
//!
//! The two feeds spell clubs differently ("Flamengo" vs "CR Flamengo",
//! "Wolverhampton Wanderers" vs "Wolves"), so names are compared with a
//! longest-common-subsequence ratio after a light normalization pass.

/// Similarity of two team names in `[0.0, 1.0]`.
///
/// `2 * lcs(a, b) / (len(a) + len(b))` over the normalized, lowercased
/// characters. Symmetric, and `1.0` for identical names.
pub fn score(a: &str, b: &str) -> f64 {
    let a: Vec<char> = normalize_name(a).chars().collect();
    let b: Vec<char> = normalize_name(b).chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    if a == b {
        return 1.0;
    }

    2.0 * lcs_len(&a, &b) as f64 / total as f64
}

/// Normalize a team name for comparison:
/// - lowercase
/// - remove parenthetical suffixes (e.g. "(RJ)")
/// - normalize quotes/dashes
/// - collapse whitespace
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut paren_depth: u32 = 0;

    for ch in name.chars() {
        match ch {
            '(' => {
                paren_depth += 1;
                continue;
            }
            ')' => {
                paren_depth = paren_depth.saturating_sub(1);
                continue;
            }
            _ if paren_depth > 0 => continue,

            '’' | '‘' => out.push('\''),

            '–' | '—' | '-' => out.push(' '),

            // "St." vs "St"
            '.' => continue,

            _ => out.extend(ch.to_lowercase()),
        }
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    // Iterate over the shorter side so the row buffers stay small.
    let (outer, inner) = if a.len() >= b.len() { (a, b) } else { (b, a) };

    let mut prev = vec![0usize; inner.len() + 1];
    let mut curr = vec![0usize; inner.len() + 1];

    for &x in outer {
        for (j, &y) in inner.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[inner.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_names_score_one() {
        assert_eq!(score("Flamengo", "Flamengo"), 1.0);
        assert_eq!(score("", ""), 1.0);
        assert_eq!(score("São Paulo", "SÃO PAULO"), 1.0);
    }

    #[test]
    fn test_score_is_symmetric() {
        let pairs = [
            ("Flamengo", "CR Flamengo"),
            ("Vasco da Gama", "CR Vasco da Gama"),
            ("Man United", "Manchester United"),
            ("Wolves", "Wolverhampton Wanderers"),
            ("", "Arsenal"),
            ("Atlético Mineiro", "Atletico-MG"),
        ];
        for (a, b) in pairs {
            assert_eq!(score(a, b), score(b, a), "{a} / {b}");
        }
    }

    #[test]
    fn test_prefixed_club_names_are_close() {
        // 2 * 8 / (8 + 11)
        let s = score("Flamengo", "CR Flamengo");
        assert!((s - 16.0 / 19.0).abs() < 1e-12);
        assert!(score("Vasco da Gama", "CR Vasco da Gama") > 0.85);
    }

    #[test]
    fn test_unrelated_names_score_low() {
        assert!(score("Arsenal", "Botafogo") < 0.5);
        assert_eq!(score("abc", "xyz"), 0.0);
        assert_eq!(score("", "Arsenal"), 0.0);
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Athletico-PR (Brazil) "), "athletico pr");
        assert_eq!(normalize_name("St. Pauli"), "st pauli");
        assert_eq!(normalize_name("Nott’m Forest"), "nott'm forest");
    }

    #[test]
    fn test_score_within_unit_interval() {
        for (a, b) in [("a", "ab"), ("Bahia", "EC Bahia"), ("Grêmio", "Gremio")] {
            let s = score(a, b);
            assert!((0.0..=1.0).contains(&s));
        }
    }
}
