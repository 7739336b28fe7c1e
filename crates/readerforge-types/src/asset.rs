//! Asset specs: tagged records specific to each asset kind (spec.md §3).

use serde::{Deserialize, Serialize};

use crate::ids::ContentHash;

/// The four (well, five counting `eq`) asset token types used in beat
/// suggestions and scaffold placement markers (`{{type:name}}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Eq,
    Plot,
    Diagram,
    Widget,
    Chem,
}

impl AssetKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Plot => "plot",
            Self::Diagram => "diagram",
            Self::Widget => "widget",
            Self::Chem => "chem",
        }
    }

    /// Parse the `type:name` token grammar from spec.md §4.8 (G2):
    /// `^(eq|plot|diagram|widget|chem):[a-z0-9_-]+$`.
    #[must_use]
    pub fn parse_token(token: &str) -> Option<(Self, String)> {
        let (kind, name) = token.split_once(':')?;
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            return None;
        }
        let kind = match kind {
            "eq" => Self::Eq,
            "plot" => Self::Plot,
            "diagram" => Self::Diagram,
            "widget" => Self::Widget,
            "chem" => Self::Chem,
            _ => return None,
        };
        Some((kind, name.to_string()))
    }
}

/// Visual style applied when rendering a plot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotStyle {
    pub stroke_color: String,
    pub stroke_width: f64,
    pub fill: Option<String>,
    pub grid: bool,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            stroke_color: "#1f2937".to_string(),
            stroke_width: 2.0,
            fill: None,
            grid: true,
        }
    }
}

/// A single point-sampled function plot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotSpec {
    pub name: String,
    /// Expression sampled over `x_range`, restricted to the G5 allow-list.
    pub expression: String,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub sample_count: u32,
    pub style: PlotStyle,
    pub content_hash: Option<ContentHash>,
}

/// A single node in a diagram.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagramNode {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub label: Option<String>,
}

/// A directed arrow between two diagram nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagramArrow {
    pub from: String,
    pub to: String,
    pub label: Option<String>,
}

/// A node-and-arrow diagram placed on a fixed-grid canvas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagramSpec {
    pub name: String,
    pub grid_size: f64,
    pub nodes: Vec<DiagramNode>,
    pub arrows: Vec<DiagramArrow>,
    pub required_node_ids: Vec<String>,
    pub content_hash: Option<ContentHash>,
}

/// A chemistry structure spec carrying a SMILES string plus an optional
/// caption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChemistrySpec {
    pub name: String,
    pub smiles: String,
    pub caption: Option<String>,
    pub content_hash: Option<ContentHash>,
}

/// An interactive widget reference. readerforge does not render widgets
/// itself (out of scope); it carries a name and a declarative config blob
/// for the external front end to interpret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetSpec {
    pub name: String,
    pub widget_type: String,
    pub config: serde_json::Value,
    pub content_hash: Option<ContentHash>,
}

/// Tagged union over every asset kind's concrete spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AssetSpec {
    Plot(PlotSpec),
    Diagram(DiagramSpec),
    Chem(ChemistrySpec),
    Widget(WidgetSpec),
}

impl AssetSpec {
    #[must_use]
    pub const fn kind(&self) -> AssetKind {
        match self {
            Self::Plot(_) => AssetKind::Plot,
            Self::Diagram(_) => AssetKind::Diagram,
            Self::Chem(_) => AssetKind::Chem,
            Self::Widget(_) => AssetKind::Widget,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Plot(s) => &s.name,
            Self::Diagram(s) => &s.name,
            Self::Chem(s) => &s.name,
            Self::Widget(s) => &s.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_tokens() {
        assert_eq!(
            AssetKind::parse_token("plot:projectile_motion"),
            Some((AssetKind::Plot, "projectile_motion".to_string()))
        );
        assert_eq!(
            AssetKind::parse_token("chem:ethanol-1"),
            Some((AssetKind::Chem, "ethanol-1".to_string()))
        );
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert_eq!(AssetKind::parse_token("Plot:Foo"), None);
        assert_eq!(AssetKind::parse_token("bogus:x"), None);
        assert_eq!(AssetKind::parse_token("plot:"), None);
        assert_eq!(AssetKind::parse_token("noseparator"), None);
    }
}
