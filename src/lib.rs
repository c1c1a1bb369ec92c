use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

mod ids;
pub use ids::*;

mod graph;
pub use graph::*;

mod editor;
pub use editor::*;

mod request;
pub use request::*;

mod lab;
pub use lab::*;

pub mod service;
pub use service::{ChemistryService, NamingResult, ReactionResult, ServiceError};

mod i18n;
pub use i18n::*;

mod config;
pub use config::*;

pub mod script;

mod visualize;
pub use visualize::*;

pub mod web;

/// A click lands on an atom iff it is strictly closer than this to the atom's center.
pub const HIT_RADIUS: f64 = 20.0;

/// The elements offered by the structure builder's palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Element {
    H,
    C,
    N,
    O,
    F,
    Na,
    Cl,
    S,
    P,
    Br,
    I,
}

lazy_static! {
    static ref SYMBOLS: HashMap<&'static str, Element> =
        Element::ALL.iter().map(|e| (e.symbol(), *e)).collect();
}

impl Element {
    /// Palette order.
    pub const ALL: [Element; 11] = [
        Element::H,
        Element::C,
        Element::N,
        Element::O,
        Element::F,
        Element::Na,
        Element::Cl,
        Element::S,
        Element::P,
        Element::Br,
        Element::I,
    ];

    pub fn symbol(&self) -> &'static str {
        use Element::*;
        match self {
            H => "H",
            C => "C",
            N => "N",
            O => "O",
            F => "F",
            Na => "Na",
            Cl => "Cl",
            S => "S",
            P => "P",
            Br => "Br",
            I => "I",
        }
    }

    /// Look up an element by its (case sensitive) symbol.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        SYMBOLS.get(symbol).copied()
    }

    /// CPK colour used by both the 2D canvas and the 3D viewer.
    pub fn color(&self) -> &'static str {
        use Element::*;
        match self {
            H => "#FFFFFF",
            C => "#909090",
            N => "#3050F8",
            O => "#FF0D0D",
            F => "#90E050",
            Na => "#AB5CF2",
            Cl => "#1FF01F",
            S => "#FFFF30",
            P => "#FF8000",
            Br => "#A62929",
            I => "#940094",
        }
    }

    /// Display radius in the 3D viewer (arbitrary units, not covalent radii).
    pub fn radius(&self) -> f64 {
        use Element::*;
        match self {
            H => 0.3,
            C | N | O => 0.7,
            F => 0.6,
            Na => 1.5,
            Cl | S | P => 1.0,
            Br => 1.1,
            I => 1.3,
        }
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Element {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Element::from_symbol(s).ok_or_else(|| format!("Unknown element symbol: {s}"))
    }
}

/// Multiplicity of a bond. Serialized as the integer 1, 2 or 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum BondOrder {
    Single = 1,
    Double = 2,
    Triple = 3,
}

impl BondOrder {
    /// The next order in the 1 -> 2 -> 3 -> 1 cycle, i.e. `(order mod 3) + 1`.
    pub fn cycle(self) -> Self {
        match self {
            BondOrder::Single => BondOrder::Double,
            BondOrder::Double => BondOrder::Triple,
            BondOrder::Triple => BondOrder::Single,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl From<BondOrder> for u8 {
    fn from(order: BondOrder) -> u8 {
        order.as_u8()
    }
}

impl TryFrom<u8> for BondOrder {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(BondOrder::Single),
            2 => Ok(BondOrder::Double),
            3 => Ok(BondOrder::Triple),
            n => Err(format!("Invalid bond order {n}, expected 1, 2 or 3")),
        }
    }
}

/// A position on the 2D canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Neither coordinate is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point::new(x, y)
    }
}

/// Install a `tracing` subscriber at the given level ("trace", "debug", "info", ...).
///
/// Unknown levels fall back to `info`. Calling this more than once is harmless;
/// only the first subscriber is installed.
pub fn init_logging(level: &str) {
    let level = level.parse::<tracing::Level>().unwrap_or(tracing::Level::INFO);
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}
