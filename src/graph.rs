use std::collections::HashMap;
use std::io::Write;

use petgraph::graph::{NodeIndex, UnGraph};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};

use super::*;

/// An element marker placed on the 2D canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    pub id: AtomId,
    pub element: Element,
    pub x: f64,
    pub y: f64,
    /// Carried for the renderer; nothing mutates it yet.
    pub charge: i32,
}

impl Atom {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// An edge between two distinct atoms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bond {
    pub id: BondId,
    pub source: AtomId,
    pub target: AtomId,
    pub order: BondOrder,
}

impl Bond {
    /// Does this bond join `a` and `b`, in either direction?
    pub fn connects(&self, a: AtomId, b: AtomId) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }

    pub fn touches(&self, atom: AtomId) -> bool {
        self.source == atom || self.target == atom
    }
}

/// The atoms and bonds drawn by the structure builder.
///
/// Both collections keep insertion order, which is also the order the renderer
/// paints them in and the order they are serialized in.
///
/// Invariants maintained by every mutator:
/// - every bond's endpoints are present in `atoms`
/// - no bond joins an atom to itself
/// - at most one bond joins any unordered pair of atoms
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoleculeGraph {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
}

impl MoleculeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.iter().find(|a| a.id == id)
    }

    pub fn bond(&self, id: BondId) -> Option<&Bond> {
        self.bonds.iter().find(|b| b.id == id)
    }

    /// Find the atom hit by a click at `point`.
    ///
    /// An atom is hit when its center is strictly closer than [`HIT_RADIUS`].
    /// Of several hit atoms the nearest wins; exact ties go to the atom that
    /// was placed first.
    pub fn hit_test(&self, point: Point) -> Option<&Atom> {
        self.atoms
            .iter()
            .map(|atom| (atom, atom.position().distance(&point)))
            .filter(|(_, distance)| *distance < HIT_RADIUS)
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(atom, _)| atom)
    }

    /// Find the bond joining `a` and `b` regardless of which one was the source.
    pub fn bond_between(&self, a: AtomId, b: AtomId) -> Option<&Bond> {
        self.bonds.iter().find(|bond| bond.connects(a, b))
    }

    pub fn add_atom(&mut self, id: AtomId, element: Element, at: Point) -> &Atom {
        self.atoms.push(Atom {
            id,
            element,
            x: at.x,
            y: at.y,
            charge: 0,
        });
        &self.atoms[self.atoms.len() - 1]
    }

    /// Add a single bond between two existing, distinct, unconnected atoms.
    ///
    /// Returns `false` and leaves the graph untouched if any of those conditions fails.
    pub fn add_bond(&mut self, id: BondId, source: AtomId, target: AtomId) -> bool {
        if source == target
            || self.atom(source).is_none()
            || self.atom(target).is_none()
            || self.bond_between(source, target).is_some()
        {
            return false;
        }
        self.bonds.push(Bond {
            id,
            source,
            target,
            order: BondOrder::Single,
        });
        true
    }

    /// Advance a bond's order along 1 -> 2 -> 3 -> 1, returning the new order.
    pub fn cycle_bond_order(&mut self, id: BondId) -> Option<BondOrder> {
        let bond = self.bonds.iter_mut().find(|b| b.id == id)?;
        bond.order = bond.order.cycle();
        Some(bond.order)
    }

    /// Remove an atom together with every bond incident to it.
    ///
    /// Returns the ids of the removed bonds in their original order, or `None`
    /// if the atom does not exist.
    pub fn remove_atom(&mut self, id: AtomId) -> Option<Vec<BondId>> {
        let index = self.atoms.iter().position(|a| a.id == id)?;
        self.atoms.remove(index);

        let mut removed = vec![];
        self.bonds.retain(|bond| {
            if bond.touches(id) {
                removed.push(bond.id);
                false
            } else {
                true
            }
        });
        Some(removed)
    }

    pub fn move_atom(&mut self, id: AtomId, to: Point) -> bool {
        match self.atoms.iter_mut().find(|a| a.id == id) {
            Some(atom) => {
                atom.x = to.x;
                atom.y = to.y;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.atoms.clear();
        self.bonds.clear();
    }

    /// The element/connectivity view handed to the naming service.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            atoms: self.atoms.iter().map(|a| (a.id, a.element)).collect(),
            bonds: self
                .bonds
                .iter()
                .map(|b| (b.source, b.target, b.order))
                .collect(),
        }
    }

    /// Convert to a petgraph graph. Node indices follow atom insertion order.
    pub fn to_petgraph(&self) -> UnGraph<Element, BondOrder> {
        let mut graph = UnGraph::with_capacity(self.atoms.len(), self.bonds.len());
        let mut nodes: HashMap<AtomId, NodeIndex> = HashMap::new();
        for atom in &self.atoms {
            nodes.insert(atom.id, graph.add_node(atom.element));
        }
        for bond in &self.bonds {
            // Endpoints always exist, the graph invariant guarantees it.
            if let (Some(&a), Some(&b)) = (nodes.get(&bond.source), nodes.get(&bond.target)) {
                graph.add_edge(a, b, bond.order);
            }
        }
        graph
    }

    /// Number of disconnected pieces on the canvas.
    pub fn fragment_count(&self) -> usize {
        petgraph::algo::connected_components(&self.to_petgraph())
    }

    /// Write the atom table (`id,element,x,y,charge`) and the bond table
    /// (`id,source,target,order`) as CSV.
    pub fn write_csv<A: Write, B: Write>(&self, atoms: A, bonds: B) -> csv::Result<()> {
        let mut wtr = csv::Writer::from_writer(atoms);
        wtr.write_record(["id", "element", "x", "y", "charge"])?;
        for atom in &self.atoms {
            wtr.write_record([
                atom.id.to_string(),
                atom.element.to_string(),
                atom.x.to_string(),
                atom.y.to_string(),
                atom.charge.to_string(),
            ])?;
        }
        wtr.flush()?;

        let mut wtr = csv::Writer::from_writer(bonds);
        wtr.write_record(["id", "source", "target", "order"])?;
        for bond in &self.bonds {
            wtr.write_record([
                bond.id.to_string(),
                bond.source.to_string(),
                bond.target.to_string(),
                bond.order.as_u8().to_string(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// What the naming service sees: an id -> element mapping and the bond triples.
///
/// Serializes as
/// `{"atoms": {"a1": "C", ...}, "bonds": [{"source": "a1", "target": "a2", "order": 1}, ...]}`
/// with atoms kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphSnapshot {
    pub atoms: Vec<(AtomId, Element)>,
    pub bonds: Vec<(AtomId, AtomId, BondOrder)>,
}

impl GraphSnapshot {
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn to_json(&self) -> String {
        // Serializing plain strings and integers cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

struct AtomMap<'a>(&'a [(AtomId, Element)]);

impl Serialize for AtomMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, element) in self.0 {
            map.serialize_entry(id, element)?;
        }
        map.end()
    }
}

#[derive(Serialize)]
struct BondTriple {
    source: AtomId,
    target: AtomId,
    order: BondOrder,
}

impl Serialize for GraphSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let bonds: Vec<BondTriple> = self
            .bonds
            .iter()
            .map(|&(source, target, order)| BondTriple {
                source,
                target,
                order,
            })
            .collect();
        let mut state = serializer.serialize_struct("GraphSnapshot", 2)?;
        state.serialize_field("atoms", &AtomMap(&self.atoms))?;
        state.serialize_field("bonds", &bonds)?;
        state.end()
    }
}
