//! Template-driven, collision-free file name planning.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::RenameError;
use crate::models::record::ExtractionRecord;

/// A placeholder recognized in naming templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateToken {
    Company,
    Date,
    Total,
    /// Optional: dropped from the name when the identifier is absent.
    Identifier,
}

impl TemplateToken {
    fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "company" => Some(Self::Company),
            "date" => Some(Self::Date),
            "total" => Some(Self::Total),
            "identifier" | "id" => Some(Self::Identifier),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Date => "date",
            Self::Total => "total",
            Self::Identifier => "identifier",
        }
    }

    pub fn is_required(&self) -> bool {
        !matches!(self, Self::Identifier)
    }
}

impl fmt::Display for TemplateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.as_str())
    }
}

/// What the planner decided for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Disposition {
    Apply,
    SkipMissingData { missing: Vec<TemplateToken> },
    ConflictResolvedWithSuffix { suffix: u32 },
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Apply => "apply",
            Disposition::SkipMissingData { .. } => "skip-missing-data",
            Disposition::ConflictResolvedWithSuffix { .. } => "conflict-resolved-with-suffix",
        }
    }
}

/// Proposed new name for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenamePlan {
    pub original: PathBuf,
    /// File name only, no directory. `None` when data is missing.
    pub proposed: Option<String>,
    pub disposition: Disposition,
}

impl RenamePlan {
    /// Target path of the plan inside `dir`.
    pub fn target(&self, dir: &Path) -> Option<PathBuf> {
        self.proposed.as_ref().map(|name| dir.join(name))
    }
}

#[derive(Debug, PartialEq)]
enum Piece<'a> {
    Literal(&'a str),
    Token(TemplateToken),
}

/// Split a template into literals and known tokens. Unknown `{...}` groups
/// stay literal.
fn parse_template(template: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|c| open + c) else {
            break;
        };
        match TemplateToken::parse(&rest[open + 1..close]) {
            Some(token) => {
                if open > 0 {
                    pieces.push(Piece::Literal(&rest[..open]));
                }
                pieces.push(Piece::Token(token));
            }
            None => pieces.push(Piece::Literal(&rest[..=close])),
        }
        rest = &rest[close + 1..];
    }

    if !rest.is_empty() {
        pieces.push(Piece::Literal(rest));
    }
    pieces
}

/// Upper-cased name with every run of characters other than alphanumerics
/// and `-` folded into one `-`.
pub fn sanitize_company(name: &str) -> String {
    sanitize(&name.to_uppercase())
}

fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        let c = if c.is_alphanumeric() { c } else { '-' };
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }
    out.trim_matches('-').to_string()
}

/// Path separators and control characters are never allowed in a file name.
fn clean_literal(text: &str) -> String {
    text.chars()
        .map(|c| if matches!(c, '/' | '\\') || c.is_control() { '-' } else { c })
        .collect()
}

fn render_token(record: &ExtractionRecord, token: TemplateToken) -> Option<String> {
    let value = match token {
        TemplateToken::Company => record.company().value().map(|c| sanitize_company(c)),
        TemplateToken::Date => record.date().value().map(|d| d.format("%Y-%m-%d").to_string()),
        TemplateToken::Total => record.total().value().map(|t| format!("{:.2}", t)),
        TemplateToken::Identifier => record.identifier().value().map(|id| sanitize(id)),
    };
    value.filter(|v| !v.is_empty())
}

/// Compute the new name for `original` from `record` and `template`,
/// avoiding every name in `listing`.
///
/// Deterministic: the same inputs always give the same plan.
pub fn plan_rename(
    record: &ExtractionRecord,
    template: &str,
    original: &Path,
    listing: &BTreeSet<String>,
) -> RenamePlan {
    let pieces = parse_template(template);

    let mut missing: Vec<TemplateToken> = pieces
        .iter()
        .filter_map(|piece| match piece {
            Piece::Token(token)
                if token.is_required() && render_token(record, *token).is_none() =>
            {
                Some(*token)
            }
            _ => None,
        })
        .collect();
    missing.sort();
    missing.dedup();

    if !missing.is_empty() {
        warn!(
            "Skipping rename of {}: missing {}",
            original.display(),
            missing.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ")
        );
        return RenamePlan {
            original: original.to_path_buf(),
            proposed: None,
            disposition: Disposition::SkipMissingData { missing },
        };
    }

    let mut rendered = String::new();
    for piece in &pieces {
        match piece {
            Piece::Literal(text) => rendered.push_str(&clean_literal(text)),
            Piece::Token(token) => {
                if let Some(value) = render_token(record, *token) {
                    rendered.push_str(&value);
                } else {
                    // Optional token: drop the separator left dangling before it.
                    if rendered.ends_with(['_', '-', ' ', '.']) {
                        rendered.pop();
                    }
                }
            }
        }
    }

    let (stem, extension) = split_extension(&rendered, &pieces, original);
    let stem = stem.trim_matches(['_', '-', ' ', '.']);
    let base = format!("{}{}", stem, extension);

    let original_name = original
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !listing.contains(&base) || original_name == base {
        debug!("Planned {} -> {}", original.display(), base);
        return RenamePlan {
            original: original.to_path_buf(),
            proposed: Some(base),
            disposition: Disposition::Apply,
        };
    }

    let (suffix, name) = (1u32..)
        .map(|n| (n, format!("{}_{}{}", stem, n, extension)))
        .find(|(_, name)| *name == original_name || !listing.contains(name))
        .unwrap_or_else(|| (0, base.clone()));

    info!("Name {} taken, using {} for {}", base, name, original.display());
    RenamePlan {
        original: original.to_path_buf(),
        proposed: Some(name),
        disposition: Disposition::ConflictResolvedWithSuffix { suffix },
    }
}

/// Split the rendered name into stem and extension. A template whose
/// trailing literal carries a `.ext` keeps it; otherwise the original
/// file's extension is used, lower-cased.
fn split_extension(rendered: &str, pieces: &[Piece<'_>], original: &Path) -> (String, String) {
    let template_ext = match pieces.last() {
        Some(Piece::Literal(text)) => {
            let text = clean_literal(text);
            text.rfind('.').map(|dot| text.len() - dot)
        }
        _ => None,
    };

    if let Some(len) = template_ext.filter(|&len| len > 1) {
        let split = rendered.len() - len;
        return (
            rendered[..split].to_string(),
            rendered[split..].to_ascii_lowercase(),
        );
    }

    let extension = original
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default();
    (rendered.to_string(), extension)
}

/// Plans many files into one directory against an in-memory listing, so
/// two plans never claim the same name.
#[derive(Debug, Clone)]
pub struct RenameSession {
    template: String,
    listing: BTreeSet<String>,
}

impl RenameSession {
    pub fn new(template: impl Into<String>, listing: BTreeSet<String>) -> Self {
        Self {
            template: template.into(),
            listing,
        }
    }

    /// Snapshot the file names currently in `dir`.
    pub fn from_dir(template: impl Into<String>, dir: &Path) -> std::io::Result<Self> {
        let mut listing = BTreeSet::new();
        for entry in std::fs::read_dir(dir)? {
            listing.insert(entry?.file_name().to_string_lossy().into_owned());
        }
        Ok(Self::new(template, listing))
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn listing(&self) -> &BTreeSet<String> {
        &self.listing
    }

    /// Plan one file and reserve its proposed name.
    pub fn plan(&mut self, record: &ExtractionRecord, original: &Path) -> RenamePlan {
        let plan = plan_rename(record, &self.template, original, &self.listing);
        if let Some(name) = &plan.proposed {
            self.listing.insert(name.clone());
        }
        plan
    }
}

/// Rename `plan.original` to its proposed name inside `dir`, refusing to
/// overwrite an existing file. Returns the new path.
pub fn apply_plan(plan: &RenamePlan, dir: &Path) -> Result<PathBuf, RenameError> {
    let target = plan
        .target(dir)
        .ok_or_else(|| RenameError::NothingToApply(plan.original.clone()))?;

    if target == plan.original {
        return Ok(target);
    }
    if target.exists() {
        return Err(RenameError::TargetExists(target));
    }

    std::fs::rename(&plan.original, &target).map_err(|source| RenameError::Io {
        from: plan.original.clone(),
        to: target.clone(),
        source,
    })?;

    info!("Renamed {} -> {}", plan.original.display(), target.display());
    Ok(target)
}
