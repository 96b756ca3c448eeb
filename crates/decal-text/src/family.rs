//! CSS family lists to canonical catalog families.

/// Family every resolution terminates at.
pub const DEFAULT_FAMILY: &str = "Inter";
/// Fallback family retried for any CJK-cluster request before giving up.
pub const CJK_FALLBACK_FAMILY: &str = "Noto Sans JP";

struct Alias {
    css: &'static str,
    canonical: &'static str,
    cjk: bool,
}

const fn alias(css: &'static str, canonical: &'static str) -> Alias {
    Alias { css, canonical, cjk: false }
}

const fn cjk(css: &'static str, canonical: &'static str) -> Alias {
    Alias { css, canonical, cjk: true }
}

/// Lowercased CSS spellings of families worth mapping precisely. Anything
/// not listed falls through to [`DEFAULT_FAMILY`].
const ALIASES: &[Alias] = &[
    // Web fonts.
    alias("inter", "Inter"),
    alias("roboto", "Roboto"),
    alias("open sans", "Open Sans"),
    alias("lato", "Lato"),
    alias("montserrat", "Montserrat"),
    alias("oswald", "Oswald"),
    alias("source sans pro", "Source Sans Pro"),
    alias("raleway", "Raleway"),
    alias("poppins", "Poppins"),
    alias("noto sans", "Noto Sans"),
    alias("ubuntu", "Ubuntu"),
    alias("merriweather", "Merriweather"),
    alias("playfair display", "Playfair Display"),
    alias("nunito", "Nunito"),
    alias("work sans", "Work Sans"),
    alias("rubik", "Rubik"),
    alias("fira sans", "Fira Sans"),
    alias("pt sans", "PT Sans"),
    alias("dm sans", "DM Sans"),
    alias("manrope", "Manrope"),
    alias("roboto mono", "Roboto Mono"),
    // System stacks and generic keywords.
    alias("system-ui", "Inter"),
    alias("-apple-system", "Inter"),
    alias("blinkmacsystemfont", "Inter"),
    alias("ui-sans-serif", "Inter"),
    alias("sans-serif", "Inter"),
    alias("ui-serif", "Georgia"),
    alias("serif", "Georgia"),
    alias("ui-monospace", "Roboto Mono"),
    alias("monospace", "Roboto Mono"),
    alias("segoe ui", "Segoe UI"),
    // Classic installed families.
    alias("arial", "Arial"),
    alias("helvetica", "Helvetica"),
    alias("helvetica neue", "Helvetica Neue"),
    alias("georgia", "Georgia"),
    alias("times", "Times New Roman"),
    alias("times new roman", "Times New Roman"),
    alias("courier", "Courier New"),
    alias("courier new", "Courier New"),
    alias("verdana", "Verdana"),
    alias("tahoma", "Tahoma"),
    alias("trebuchet ms", "Trebuchet MS"),
    // CJK cluster: these retry against the CJK fallback before defaulting.
    cjk("noto sans jp", "Noto Sans JP"),
    cjk("noto sans cjk jp", "Noto Sans JP"),
    cjk("noto sans kr", "Noto Sans KR"),
    cjk("noto sans sc", "Noto Sans SC"),
    cjk("noto sans tc", "Noto Sans TC"),
    cjk("hiragino kaku gothic pro", "Hiragino Kaku Gothic Pro"),
    cjk("hiragino sans", "Hiragino Sans"),
    cjk("yu gothic", "Yu Gothic"),
    cjk("meiryo", "Meiryo"),
    cjk("ms gothic", "MS Gothic"),
    cjk("ms pgothic", "MS PGothic"),
    cjk("microsoft yahei", "Microsoft YaHei"),
    cjk("malgun gothic", "Malgun Gothic"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedFamily {
    pub name: &'static str,
    pub cjk: bool,
}

/// Picks the first entry of a comma-separated CSS family list that the alias
/// table knows, after stripping quotes and case.
pub fn resolve_family(family_list: &str) -> ResolvedFamily {
    for raw in family_list.split(',') {
        let name = raw.trim().trim_matches(['"', '\'']).trim().to_ascii_lowercase();
        if name.is_empty() {
            continue;
        }
        if let Some(entry) = ALIASES.iter().find(|entry| entry.css == name) {
            return ResolvedFamily { name: entry.canonical, cjk: entry.cjk };
        }
    }
    ResolvedFamily { name: DEFAULT_FAMILY, cjk: false }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_known_entry_wins() {
        let resolved = resolve_family("\"Comic Sans MS\", 'Open Sans', Arial");
        assert_eq!(resolved.name, "Open Sans");
        assert!(!resolved.cjk);
    }

    #[test]
    fn unknown_lists_fall_back_to_the_default() {
        assert_eq!(resolve_family("Papyrus, Chalkduster").name, DEFAULT_FAMILY);
        assert_eq!(resolve_family("").name, DEFAULT_FAMILY);
    }

    #[test]
    fn generic_keywords_map_to_concrete_families() {
        assert_eq!(resolve_family("sans-serif").name, "Inter");
        assert_eq!(resolve_family("monospace").name, "Roboto Mono");
        assert_eq!(resolve_family("serif").name, "Georgia");
    }

    #[test]
    fn cjk_families_carry_the_cluster_flag() {
        let resolved = resolve_family("'Yu Gothic', sans-serif");
        assert_eq!(resolved.name, "Yu Gothic");
        assert!(resolved.cjk);
    }

    #[test]
    fn matching_ignores_case_and_quotes() {
        assert_eq!(resolve_family("ROBOTO").name, "Roboto");
        assert_eq!(resolve_family("  'Helvetica Neue'  ").name, "Helvetica Neue");
    }
}
