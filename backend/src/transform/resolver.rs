//! Column resolver: find which source column feeds each target column.
//!
//! Matching runs in strict priority order and stops at the first hit:
//!
//! 1. **Alias**: a known alias (declaration order) contained in a source
//!    column name (column order). Whitespace is ignored, case is folded.
//! 2. **Substring**: the target name itself contained in a source column name.
//! 3. **Similarity**: the source column with the highest Ratcliff/Obershelp
//!    ratio against the target name, accepted when it reaches the floor.
//!
//! Target columns are resolved independently: nothing stops two target
//! columns from claiming the same source column.

use std::collections::HashMap;

use crate::config::Template;
use crate::models::{MatchMethod, Resolution, ResolvedMapping};

/// Drop whitespace and lower-case, for containment checks.
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Resolve one target column against the source column names.
pub fn resolve(template: &Template, field: &str, columns: &[&str]) -> Resolution {
    let normalized: Vec<String> = columns.iter().map(|c| normalize(c)).collect();

    for alias in template.aliases_for(field) {
        let alias = normalize(alias);
        if let Some(i) = normalized.iter().position(|c| c.contains(&alias)) {
            return resolved(columns[i], MatchMethod::Alias);
        }
    }

    let target = normalize(field);
    if let Some(i) = normalized.iter().position(|c| c.contains(&target)) {
        return resolved(columns[i], MatchMethod::Substring);
    }

    let target = field.to_lowercase();
    let mut best: Option<(usize, f64)> = None;
    for (i, column) in columns.iter().enumerate() {
        let score = similarity(&target, &column.to_lowercase());
        // strictly greater: the first column reaching the maximum wins
        if score > best.map_or(0.0, |(_, s)| s) {
            best = Some((i, score));
        }
    }

    match best {
        Some((i, score)) if score >= template.similarity_floor => {
            resolved(columns[i], MatchMethod::Similarity(score))
        }
        _ => Resolution::Unresolved,
    }
}

/// Resolve every looked-up target column, in schema order.
pub fn resolve_all(template: &Template, columns: &[&str]) -> ResolvedMapping {
    ResolvedMapping {
        entries: template
            .mapped_fields()
            .map(|field| (field.to_string(), resolve(template, field, columns)))
            .collect(),
    }
}

fn resolved(column: &str, method: MatchMethod) -> Resolution {
    Resolution::Resolved { column: column.to_string(), method }
}

// =============================================================================
// Ratcliff/Obershelp similarity
// =============================================================================

/// Similarity ratio in `[0, 1]`: `2 * M / (len(a) + len(b))`, where `M` is
/// the number of characters in the matching blocks found by repeatedly taking
/// the longest common substring and recursing on both sides of it.
///
/// Lengths are counted in characters, not bytes.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matches = BlockMatcher::new(&a, &b).matching_characters();
    2.0 * matches as f64 / total as f64
}

struct BlockMatcher<'a> {
    a: &'a [char],
    b: &'a [char],
    /// Positions of each character in `b`, ascending
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> BlockMatcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, c) in b.iter().enumerate() {
            b2j.entry(*c).or_default().push(j);
        }

        // Very common characters of long sequences are ignored as anchors
        if b.len() >= 200 {
            let limit = b.len() / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= limit);
        }

        Self { a, b, b2j }
    }

    /// Longest block `a[i..i+k] == b[j..j+k]` inside the given bounds,
    /// earliest in `a` (then in `b`) on ties.
    fn longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
        let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0);
        let mut j2len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut next: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j.checked_sub(1).and_then(|p| j2len.get(&p)).copied().unwrap_or(0) + 1;
                    next.insert(j, k);
                    if k > bestsize {
                        besti = i + 1 - k;
                        bestj = j + 1 - k;
                        bestsize = k;
                    }
                }
            }
            j2len = next;
        }

        // Grow over anchors dropped from b2j
        while besti > alo && bestj > blo && self.a[besti - 1] == self.b[bestj - 1] {
            besti -= 1;
            bestj -= 1;
            bestsize += 1;
        }
        while besti + bestsize < ahi
            && bestj + bestsize < bhi
            && self.a[besti + bestsize] == self.b[bestj + bestsize]
        {
            bestsize += 1;
        }

        (besti, bestj, bestsize)
    }

    fn matching_characters(&self) -> usize {
        let mut total = 0;
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, k) = self.longest_match(alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            total += k;
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }

        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldAliases;

    fn template() -> Template {
        Template::default()
    }

    fn column_of(resolution: &Resolution) -> Option<&str> {
        resolution.column()
    }

    #[test]
    fn test_alias_priority() {
        let t = template();
        let columns = ["수취인", "전화번호"];

        let name = resolve(&t, "수령자명", &columns);
        assert_eq!(
            name,
            Resolution::Resolved { column: "수취인".into(), method: MatchMethod::Alias }
        );

        let phone = resolve(&t, "휴대전화", &columns);
        assert_eq!(
            phone,
            Resolution::Resolved { column: "전화번호".into(), method: MatchMethod::Alias }
        );
    }

    #[test]
    fn test_alias_order_beats_column_order() {
        // "수취인이름" is declared before "이름", so the second column wins
        let t = template();
        let r = resolve(&t, "수령자명", &["고객 이름", "수취인 이름"]);
        assert_eq!(column_of(&r), Some("수취인 이름"));
    }

    #[test]
    fn test_alias_ignores_whitespace_and_case() {
        let t = template();
        let r = resolve(&t, "우편번호", &["Zip Code"]);
        assert_eq!(column_of(&r), Some("Zip Code"));

        let r = resolve(&t, "개인통관부호(조건부필수)", &["pccc 번호"]);
        assert_eq!(column_of(&r), Some("pccc 번호"));
    }

    #[test]
    fn test_substring_fallback() {
        let t = template();
        let r = resolve(&t, "수령자명", &["주문번호", "수령자명 (필수)"]);
        assert_eq!(
            r,
            Resolution::Resolved { column: "수령자명 (필수)".into(), method: MatchMethod::Substring }
        );
    }

    #[test]
    fn test_similarity_fallback() {
        let t = template();
        let r = resolve(&t, "배송상세주소", &["주소"]);
        assert_eq!(
            r,
            Resolution::Resolved { column: "주소".into(), method: MatchMethod::Similarity(0.5) }
        );
    }

    #[test]
    fn test_similarity_floor() {
        // best score is 4/11 < 0.4
        let t = template();
        let r = resolve(&t, "우편번호", &["수취인전화번호"]);
        assert_eq!(r, Resolution::Unresolved);
    }

    #[test]
    fn test_similarity_tie_keeps_first() {
        let mut t = template();
        t.aliases = vec![FieldAliases { field: "abc".into(), aliases: vec![] }];
        let r = resolve(&t, "abc", &["abx", "aby"]);
        assert_eq!(column_of(&r), Some("abx"));
    }

    #[test]
    fn test_no_columns_is_unresolved() {
        assert_eq!(resolve(&template(), "수량", &[]), Resolution::Unresolved);
    }

    #[test]
    fn test_same_column_claimed_twice() {
        let t = template();
        let mapping = resolve_all(&t, &["수취인주소"]);
        assert_eq!(mapping.source_for("수령자명"), Some("수취인주소"));
        assert_eq!(mapping.source_for("배송지주소"), Some("수취인주소"));
    }

    #[test]
    fn test_resolve_all_skips_id_and_constant() {
        let t = template();
        let mapping = resolve_all(&t, &["쇼핑몰명", "번호"]);
        assert_eq!(mapping.entries.len(), 11);
        assert!(mapping.get("번호").is_none());
        assert!(mapping.get("쇼핑몰명(조건부필수)").is_none());
    }

    #[test]
    fn test_resolve_all_keeps_schema_order() {
        let t = template();
        let mapping = resolve_all(&t, &["수량", "이름"]);
        let fields: Vec<&str> = mapping.entries.iter().map(|(f, _)| f.as_str()).collect();
        let expected: Vec<&str> = t.mapped_fields().collect();
        assert_eq!(fields, expected);
        assert_eq!(mapping.source_for("수량"), Some("수량"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(" Zip\tCode "), "zipcode");
        assert_eq!(normalize("수취인 이름"), "수취인이름");
    }

    #[test]
    fn test_similarity_values() {
        assert_eq!(similarity("abcd", "bcde"), 0.75);
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("abc", ""), 0.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
        assert_eq!(similarity("배송상세주소", "주소"), 0.5);
    }

    #[test]
    fn test_similarity_counts_all_blocks() {
        // "ab" and "cd" match on both sides of the middle
        assert_eq!(similarity("abXcd", "abYcd"), 0.8);
    }
}
