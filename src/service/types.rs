use serde::{Deserialize, Serialize};

use crate::Element;

/// The naming service's answer for a builder graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamingResult {
    pub systematic_name: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub common_name: Option<String>,
    #[serde(default)]
    pub explanation: String,
}

/// The prediction service's answer for a reactants/conditions pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionResult {
    pub equation: String,
    #[serde(default)]
    pub products: Vec<String>,
    #[serde(default)]
    pub mechanism_steps: Vec<String>,
    #[serde(default)]
    pub vsepr_info: String,
    #[serde(default)]
    pub product_structure: MoleculeStructure,
}

/// A 3D structure as returned by the model. Atoms reference each other by `id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoleculeStructure {
    #[serde(default)]
    pub atoms: Vec<Atom3D>,
    #[serde(default)]
    pub bonds: Vec<Bond3D>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom3D {
    pub id: i64,
    pub element: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Atom3D {
    /// The atom's own colour if the model supplied one, else the CPK colour of its element.
    pub fn display_color(&self) -> &str {
        match &self.color {
            Some(color) if !color.trim().is_empty() => color,
            _ => Element::from_symbol(&self.element)
                .map(|e| e.color())
                .unwrap_or("#CCCCCC"),
        }
    }

    pub fn display_radius(&self) -> f64 {
        Element::from_symbol(&self.element)
            .map(|e| e.radius())
            .unwrap_or(0.8)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bond3D {
    pub source: i64,
    pub target: i64,
    #[serde(default = "single")]
    pub order: u8,
}

fn single() -> u8 {
    1
}

impl MoleculeStructure {
    pub fn atom(&self, id: i64) -> Option<&Atom3D> {
        self.atoms.iter().find(|a| a.id == id)
    }

    /// Bonds whose endpoints both exist, paired with those endpoints.
    pub fn resolved_bonds(&self) -> impl Iterator<Item = (&Bond3D, &Atom3D, &Atom3D)> {
        self.bonds
            .iter()
            .filter_map(|bond| Some((bond, self.atom(bond.source)?, self.atom(bond.target)?)))
    }
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}
