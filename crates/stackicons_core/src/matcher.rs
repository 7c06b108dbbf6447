use crate::fallback::FallbackTable;
use crate::model::Item;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionKind {
    /// Target already carried an icon and was left alone.
    Kept,
    /// One name contains the other, case-folded.
    Containment,
    /// Names equal once whitespace is removed and case folded.
    Normalized,
    Table,
    Default,
}

impl ResolutionKind {
    pub const ALL: [ResolutionKind; 5] = [
        Self::Kept,
        Self::Containment,
        Self::Normalized,
        Self::Table,
        Self::Default,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kept => "kept",
            Self::Containment => "containment",
            Self::Normalized => "normalized",
            Self::Table => "table",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconMatch<'a> {
    pub kind: ResolutionKind,
    pub source_name: &'a str,
    pub icon: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIcon {
    pub icon: String,
    pub kind: ResolutionKind,
    pub matched_source: Option<String>,
}

/// Find a source item whose name matches `target_name`.
///
/// Containment is tried over the whole source list first; the normalized
/// equality pass only runs when no source name contains, or is contained in,
/// the target. Within a pass the first hit in source order wins. Source items
/// without an icon are never candidates.
pub fn match_icon<'a>(target_name: &str, source_items: &'a [Item]) -> Option<IconMatch<'a>> {
    let target_folded = target_name.to_lowercase();
    let candidates = || {
        source_items
            .iter()
            .filter_map(|item| item.icon().map(|icon| (item.name.as_str(), icon)))
    };

    if !target_folded.trim().is_empty() {
        let contained = candidates().find(|(name, _)| {
            let folded = name.to_lowercase();
            !folded.trim().is_empty()
                && (target_folded.contains(&folded) || folded.contains(&target_folded))
        });
        if let Some((source_name, icon)) = contained {
            return Some(IconMatch {
                kind: ResolutionKind::Containment,
                source_name,
                icon,
            });
        }
    }

    let target_compact = compact(target_name);
    if target_compact.is_empty() {
        return None;
    }
    candidates()
        .find(|(name, _)| compact(name) == target_compact)
        .map(|(source_name, icon)| IconMatch {
            kind: ResolutionKind::Normalized,
            source_name,
            icon,
        })
}

/// Resolve an icon for a target name: source match, then table, then default.
pub fn resolve(target_name: &str, source_items: &[Item], table: &FallbackTable) -> ResolvedIcon {
    if let Some(found) = match_icon(target_name, source_items) {
        return ResolvedIcon {
            icon: found.icon.to_string(),
            kind: found.kind,
            matched_source: Some(found.source_name.to_string()),
        };
    }
    if let Some(icon) = table.lookup(target_name) {
        return ResolvedIcon {
            icon: icon.to_string(),
            kind: ResolutionKind::Table,
            matched_source: None,
        };
    }
    ResolvedIcon {
        icon: table.default_icon().to_string(),
        kind: ResolutionKind::Default,
        matched_source: None,
    }
}

pub fn resolve_icon(target_name: &str, source_items: &[Item], table: &FallbackTable) -> String {
    resolve(target_name, source_items, table).icon
}

fn compact(name: &str) -> String {
    name.chars()
        .filter(|ch| !ch.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
