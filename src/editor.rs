use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use tracing::*;

use super::*;

/// What the next canvas click means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// Select the clicked atom.
    Move,
    /// Pick two atoms to connect, or to cycle the order of the bond between them.
    Bond,
    /// Remove the clicked atom and its bonds.
    Delete,
    /// Place a new atom of this element.
    Place(Element),
}

impl Default for Tool {
    fn default() -> Self {
        Tool::Place(Element::C)
    }
}

impl Display for Tool {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Tool::Move => write!(f, "move"),
            Tool::Bond => write!(f, "bond"),
            Tool::Delete => write!(f, "delete"),
            Tool::Place(element) => write!(f, "{element}"),
        }
    }
}

impl FromStr for Tool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "move" => Ok(Tool::Move),
            "bond" => Ok(Tool::Bond),
            "delete" => Ok(Tool::Delete),
            symbol => Element::from_symbol(symbol)
                .map(Tool::Place)
                .ok_or_else(|| format!("Unknown tool: {symbol}")),
        }
    }
}

/// Everything the editor can report after a state change.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    AtomPlaced(AtomId),
    /// An element was placed on top of an existing atom; nothing changed.
    PlacementBlocked(AtomId),
    Selected(Option<AtomId>),
    AtomDeleted { atom: AtomId, bonds: Vec<BondId> },
    NothingToDelete,
    BondStarted(AtomId),
    BondCreated(BondId),
    BondCycled { bond: BondId, order: BondOrder },
    BondCancelled,
    /// The pending endpoint was clicked again; no bond is made.
    SameAtomClicked(AtomId),
    AtomMoved(AtomId),
    ToolChanged(Tool),
    Cleared,
    AnalysisStarted,
    AnalysisFinished,
}

impl EditorEvent {
    /// Did this event change atoms or bonds?
    pub fn mutates_graph(&self) -> bool {
        matches!(
            self,
            EditorEvent::AtomPlaced(_)
                | EditorEvent::AtomDeleted { .. }
                | EditorEvent::BondCreated(_)
                | EditorEvent::BondCycled { .. }
                | EditorEvent::AtomMoved(_)
                | EditorEvent::Cleared
        )
    }
}

type Subscriber = Box<dyn FnMut(&EditorEvent) + Send>;

/// The structure builder's 2D graph editor.
///
/// All interaction goes through explicit methods; a UI layer either inspects
/// the returned [`EditorEvent`] or registers a subscriber with
/// [`GraphEditor::subscribe`].
pub struct GraphEditor {
    graph: MoleculeGraph,
    tool: Tool,
    pending: Option<AtomId>,
    selected: Option<AtomId>,
    ids: Box<dyn IdAllocator + Send>,
    subscribers: Vec<Subscriber>,
    analysis: RequestSlot<NamingResult>,
}

impl Default for GraphEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for GraphEditor {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        f.debug_struct("GraphEditor")
            .field("graph", &self.graph)
            .field("tool", &self.tool)
            .field("pending", &self.pending)
            .field("selected", &self.selected)
            .field("analysis", &self.analysis)
            .finish()
    }
}

impl GraphEditor {
    pub fn new() -> Self {
        Self::with_ids(SequentialIds::new())
    }

    pub fn with_ids(ids: impl IdAllocator + Send + 'static) -> Self {
        Self {
            graph: MoleculeGraph::new(),
            tool: Tool::default(),
            pending: None,
            selected: None,
            ids: Box::new(ids),
            subscribers: vec![],
            analysis: RequestSlot::new(),
        }
    }

    pub fn graph(&self) -> &MoleculeGraph {
        &self.graph
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// The first endpoint of a bond being drawn.
    pub fn pending(&self) -> Option<AtomId> {
        self.pending
    }

    pub fn selected(&self) -> Option<AtomId> {
        self.selected
    }

    /// The atom the renderer should highlight.
    pub fn highlighted(&self) -> Option<AtomId> {
        self.pending.or(self.selected)
    }

    pub fn analysis(&self) -> &RequestSlot<NamingResult> {
        &self.analysis
    }

    /// Register a callback invoked after every state change.
    pub fn subscribe(&mut self, callback: impl FnMut(&EditorEvent) + Send + 'static) {
        self.subscribers.push(Box::new(callback));
    }

    fn emit(&mut self, event: EditorEvent) -> EditorEvent {
        trace!("Editor event: {:?}", event);
        for subscriber in self.subscribers.iter_mut() {
            subscriber(&event);
        }
        event
    }

    pub fn set_tool(&mut self, tool: Tool) -> EditorEvent {
        if tool != Tool::Bond {
            self.pending = None;
        }
        if tool != Tool::Move {
            self.selected = None;
        }
        self.tool = tool;
        debug!("Tool changed to {}", tool);
        self.emit(EditorEvent::ToolChanged(tool))
    }

    /// Apply a click with the active tool.
    pub fn click(&mut self, point: Point) -> EditorEvent {
        self.handle_click(point, self.tool)
    }

    /// Interpret a click at `point` with `tool`, switching to that tool first if needed.
    pub fn handle_click(&mut self, point: Point, tool: Tool) -> EditorEvent {
        if tool != self.tool {
            self.set_tool(tool);
        }
        let hit = self.graph.hit_test(point).map(|atom| atom.id);

        let event = match tool {
            Tool::Move => {
                self.selected = hit;
                EditorEvent::Selected(hit)
            }
            Tool::Delete => match hit {
                Some(atom) => self.delete_atom(atom),
                None => EditorEvent::NothingToDelete,
            },
            Tool::Bond => self.bond_click(hit),
            Tool::Place(element) => match hit {
                Some(existing) => EditorEvent::PlacementBlocked(existing),
                None => {
                    let id = self.ids.next_atom_id();
                    self.graph.add_atom(id, element, point);
                    debug!("Placed {} atom {} at ({}, {})", element, id, point.x, point.y);
                    EditorEvent::AtomPlaced(id)
                }
            },
        };
        self.emit(event)
    }

    fn bond_click(&mut self, hit: Option<AtomId>) -> EditorEvent {
        let Some(atom) = hit else {
            self.pending = None;
            return EditorEvent::BondCancelled;
        };
        let Some(first) = self.pending else {
            self.pending = Some(atom);
            return EditorEvent::BondStarted(atom);
        };
        if first == atom {
            return EditorEvent::SameAtomClicked(atom);
        }

        // One bond action per two-click gesture.
        self.pending = None;
        if let Some(bond) = self.graph.bond_between(first, atom).map(|b| b.id) {
            match self.graph.cycle_bond_order(bond) {
                Some(order) => {
                    debug!("Bond {} between {} and {} is now order {}", bond, first, atom, order.as_u8());
                    EditorEvent::BondCycled { bond, order }
                }
                None => EditorEvent::BondCancelled,
            }
        } else {
            let bond = self.ids.next_bond_id();
            if self.graph.add_bond(bond, first, atom) {
                debug!("Bonded {} to {} as {}", first, atom, bond);
                EditorEvent::BondCreated(bond)
            } else {
                // The pending atom vanished underneath us; treat as a cancelled gesture.
                warn!("Could not bond {} to {}", first, atom);
                EditorEvent::BondCancelled
            }
        }
    }

    fn delete_atom(&mut self, atom: AtomId) -> EditorEvent {
        let bonds = self.graph.remove_atom(atom).unwrap_or_default();
        if self.selected == Some(atom) {
            self.selected = None;
        }
        if self.pending == Some(atom) {
            self.pending = None;
        }
        debug!("Deleted atom {} and {} bond(s)", atom, bonds.len());
        EditorEvent::AtomDeleted { atom, bonds }
    }

    /// Reposition an atom (the drag half of the move tool).
    ///
    /// Returns `false` if the atom does not exist.
    pub fn move_atom(&mut self, atom: AtomId, to: Point) -> bool {
        if !self.graph.move_atom(atom, to) {
            return false;
        }
        self.emit(EditorEvent::AtomMoved(atom));
        true
    }

    /// Remove every atom and bond and discard the displayed analysis.
    pub fn clear(&mut self) -> EditorEvent {
        self.graph.clear();
        self.pending = None;
        self.selected = None;
        self.analysis.reset();
        info!("Canvas cleared");
        self.emit(EditorEvent::Cleared)
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        self.graph.snapshot()
    }

    /// Start a naming request for the current graph, superseding any earlier one.
    ///
    /// Returns `None` on an empty canvas; there is nothing to name.
    pub fn begin_analysis(&mut self) -> Option<(Ticket, GraphSnapshot)> {
        if self.graph.is_empty() {
            return None;
        }
        let ticket = self.analysis.begin();
        self.emit(EditorEvent::AnalysisStarted);
        Some((ticket, self.graph.snapshot()))
    }

    /// Show the outcome of a naming request if it is still the latest one.
    pub fn finish_analysis<E: Display>(&mut self, ticket: Ticket, result: Result<NamingResult, E>) -> bool {
        if !self.analysis.complete(ticket, result) {
            return false;
        }
        self.emit(EditorEvent::AnalysisFinished);
        true
    }
}
