use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use petgraph::visit::EdgeRef;
use thiserror::Error;
use tracing::*;

use crate::service::MoleculeStructure;
use crate::{BondOrder, GraphEditor, MoleculeGraph};

pub const CANVAS_WIDTH: u32 = 800;
pub const CANVAS_HEIGHT: u32 = 500;

const HIGHLIGHT: &str = "#3b82f6";

/// Escape text for use inside SVG/HTML content and attribute values.
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn bond_label(order: BondOrder) -> Option<&'static str> {
    match order {
        BondOrder::Single => None,
        BondOrder::Double => Some("="),
        BondOrder::Triple => Some("≡"),
    }
}

/// Draw the builder canvas. Bonds go underneath atoms; the highlighted atom
/// and its bonds are drawn in blue.
pub fn render_canvas_svg(editor: &GraphEditor, width: u32, height: u32) -> String {
    let graph = editor.graph();
    let highlighted = editor.highlighted();
    let mut svg = format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}" font-family="sans-serif">
<rect width="100%" height="100%" fill="#f8fafc"/>
"##
    );

    for bond in graph.bonds() {
        let (Some(source), Some(target)) = (graph.atom(bond.source), graph.atom(bond.target)) else {
            continue;
        };
        let lit = highlighted.is_some_and(|id| bond.touches(id));
        let order = bond.order.as_u8() as u32;
        let main_width = if bond.order == BondOrder::Single { 2 } else { order * 2 };
        svg.push_str(&format!(
            r#"<g id="{id}"><line x1="{x1}" y1="{y1}" x2="{x2}" y2="{y2}" stroke="{halo}" stroke-width="{halo_width}" opacity="0.3"/><line x1="{x1}" y1="{y1}" x2="{x2}" y2="{y2}" stroke="{main}" stroke-width="{main_width}"/>"#,
            id = bond.id,
            x1 = source.x,
            y1 = source.y,
            x2 = target.x,
            y2 = target.y,
            halo = if lit { HIGHLIGHT } else { "#94a3b8" },
            halo_width = order * 3 + 2,
            main = if lit { HIGHLIGHT } else { "#64748b" },
        ));
        if let Some(label) = bond_label(bond.order) {
            svg.push_str(&format!(
                r##"<text x="{}" y="{}" dy="-5" text-anchor="middle" font-size="10" fill="#64748b">{label}</text>"##,
                (source.x + target.x) / 2.0,
                (source.y + target.y) / 2.0,
            ));
        }
        svg.push_str("</g>\n");
    }

    for atom in graph.atoms() {
        let lit = highlighted == Some(atom.id);
        svg.push_str(&format!(
            r##"<g id="{id}" transform="translate({x}, {y})"><circle r="18" fill="white" stroke="{stroke}" stroke-width="{stroke_width}"/><circle r="14" fill="{color}" opacity="0.2"/><text dy="5" text-anchor="middle" font-weight="bold" fill="#1e293b">{symbol}</text></g>
"##,
            id = atom.id,
            x = atom.x,
            y = atom.y,
            stroke = if lit { HIGHLIGHT } else { "#cbd5e1" },
            stroke_width = if lit { 3 } else { 1 },
            color = atom.element.color(),
            symbol = atom.element,
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

/// Draw a 3D structure turned `angle` degrees about the vertical axis,
/// orthographically projected and painted back to front.
pub fn render_structure_svg(structure: &MoleculeStructure, angle: f64, width: u32, height: u32) -> String {
    let (sin, cos) = angle.to_radians().sin_cos();
    let rotated: Vec<(i64, f64, f64, f64)> = structure
        .atoms
        .iter()
        .map(|a| (a.id, a.x * cos + a.z * sin, a.y, -a.x * sin + a.z * cos))
        .collect();

    // Scale on the rotation-invariant extent so the molecule does not pulse as it turns.
    let extent = structure
        .atoms
        .iter()
        .map(|a| a.x.hypot(a.z).max(a.y.abs()) + a.display_radius())
        .fold(1.0, f64::max);
    let scale = 0.45 * width.min(height) as f64 / extent;
    let (cx, cy) = (width as f64 / 2.0, height as f64 / 2.0);
    let project = |id: i64| -> Option<(f64, f64)> {
        rotated
            .iter()
            .find(|(atom, ..)| *atom == id)
            .map(|&(_, x, y, _)| (cx + x * scale, cy - y * scale))
    };

    let mut svg = format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">
<rect width="100%" height="100%" fill="#0f172a"/>
"##
    );

    for bond in &structure.bonds {
        let (Some((x1, y1)), Some((x2, y2))) = (project(bond.source), project(bond.target)) else {
            continue;
        };
        let length = (x2 - x1).hypot(y2 - y1);
        if length == 0.0 {
            continue;
        }
        // Unit normal in screen space, for parallel strokes.
        let (nx, ny) = (-(y2 - y1) / length, (x2 - x1) / length);
        let separation = 0.15 * scale;
        let offsets: &[f64] = match bond.order {
            2 => &[-0.5, 0.5],
            3 => &[-1.0, 0.0, 1.0],
            _ => &[0.0],
        };
        for k in offsets {
            let (dx, dy) = (nx * separation * k, ny * separation * k);
            svg.push_str(&format!(
                r##"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="#cccccc" stroke-width="{:.2}" stroke-linecap="round"/>
"##,
                x1 + dx,
                y1 + dy,
                x2 + dx,
                y2 + dy,
                (0.08 * scale).max(1.0),
            ));
        }
    }

    let mut order: Vec<usize> = (0..structure.atoms.len()).collect();
    order.sort_by(|&a, &b| rotated[a].3.total_cmp(&rotated[b].3));
    for index in order {
        let atom = &structure.atoms[index];
        let (_, x, y, _) = rotated[index];
        svg.push_str(&format!(
            r##"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" fill="{}" stroke="#1e293b" stroke-width="1"><title>{}</title></circle>
"##,
            cx + x * scale,
            cy - y * scale,
            atom.display_radius() * 0.4 * scale,
            escape_xml(atom.display_color()),
            escape_xml(&atom.element),
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

/// Generate a Graphviz DOT description of the graph. Double and triple bonds
/// are drawn as parallel edges.
pub fn generate_dot(graph: &MoleculeGraph) -> String {
    let molecule = graph.to_petgraph();
    let mut dot = String::from("graph Molecule {\n    layout=neato;\n");

    for node in molecule.node_indices() {
        let element = molecule[node];
        dot.push_str(&format!(
            "    {} [label=\"{}\", shape=circle, style=filled, fillcolor=\"{}\"];\n",
            node.index(),
            element,
            element.color()
        ));
    }

    for edge in molecule.edge_references() {
        for _ in 0..edge.weight().as_u8() {
            dot.push_str(&format!(
                "    {} -- {} [penwidth=2];\n",
                edge.source().index(),
                edge.target().index()
            ));
        }
    }

    dot.push_str("}\n");
    dot
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to run Graphviz 'dot': {0}")]
    Launch(#[source] io::Error),
    #[error("Graphviz 'dot' exited with {0}")]
    Graphviz(ExitStatus),
}

/// Write the graph to `dot_path` and, given a `png` path, render that file
/// with the Graphviz `dot` command.
pub fn export_dot(graph: &MoleculeGraph, dot_path: &Path, png: Option<&Path>) -> Result<(), ExportError> {
    fs::write(dot_path, generate_dot(graph)).map_err(|source| ExportError::Write {
        path: dot_path.to_path_buf(),
        source,
    })?;
    info!("DOT file saved to {}", dot_path.display());

    let Some(png) = png else {
        return Ok(());
    };
    let status = Command::new("dot")
        .arg("-Tpng")
        .arg(dot_path)
        .arg("-o")
        .arg(png)
        .status()
        .map_err(ExportError::Launch)?;
    if !status.success() {
        return Err(ExportError::Graphviz(status));
    }
    info!("Rendered {}", png.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{Atom3D, Bond3D};
    use crate::{Element, Point, Tool};

    fn carbon_monoxide() -> GraphEditor {
        let mut editor = GraphEditor::new();
        editor.handle_click(Point::new(100.0, 100.0), Tool::Place(Element::C));
        editor.handle_click(Point::new(160.0, 100.0), Tool::Place(Element::O));
        editor.handle_click(Point::new(100.0, 100.0), Tool::Bond);
        editor.handle_click(Point::new(160.0, 100.0), Tool::Bond);
        editor.handle_click(Point::new(100.0, 100.0), Tool::Bond);
        editor.handle_click(Point::new(160.0, 100.0), Tool::Bond);
        editor
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
    }

    #[test]
    fn test_canvas_svg() {
        let editor = carbon_monoxide();
        let svg = render_canvas_svg(&editor, CANVAS_WIDTH, CANVAS_HEIGHT);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"<g id="a1" transform="translate(100, 100)">"#));
        assert!(svg.contains(">O</text>"));
        // Double bond: halo 2*3+2, main 2*2, and the "=" label.
        assert!(svg.contains(r#"stroke-width="8" opacity="0.3""#));
        assert!(svg.contains(r##"stroke="#64748b" stroke-width="4""##));
        assert!(svg.contains(">=</text>"));
        assert!(!svg.contains(HIGHLIGHT));
    }

    #[test]
    fn test_canvas_highlights_pending_atom() {
        let mut editor = carbon_monoxide();
        editor.handle_click(Point::new(100.0, 100.0), Tool::Bond);
        let svg = render_canvas_svg(&editor, CANVAS_WIDTH, CANVAS_HEIGHT);
        assert!(svg.contains(r##"stroke="#3b82f6" stroke-width="3""##));
    }

    #[test]
    fn test_generate_dot() {
        let editor = carbon_monoxide();
        let dot = generate_dot(editor.graph());
        assert!(dot.contains("0 [label=\"C\""));
        assert!(dot.contains("1 [label=\"O\""));
        assert_eq!(dot.matches("0 -- 1").count(), 2);
    }

    #[test]
    fn test_export_dot() {
        let editor = carbon_monoxide();
        let dir = std::env::temp_dir().join(format!("chemlab-export-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let dot_path = dir.join("co.dot");

        export_dot(editor.graph(), &dot_path, None).unwrap();
        assert_eq!(fs::read_to_string(&dot_path).unwrap(), generate_dot(editor.graph()));

        // Whether or not Graphviz is installed, a PNG in a missing directory fails.
        let png = dir.join("missing").join("co.png");
        assert!(matches!(
            export_dot(editor.graph(), &dot_path, Some(&png)),
            Err(ExportError::Launch(_)) | Err(ExportError::Graphviz(_))
        ));

        let unwritable = dir.join("missing").join("co.dot");
        assert!(matches!(
            export_dot(editor.graph(), &unwritable, None),
            Err(ExportError::Write { .. })
        ));
        fs::remove_dir_all(&dir).unwrap();
    }

    fn water() -> MoleculeStructure {
        let atom = |id, element: &str, x, y| Atom3D {
            id,
            element: element.to_string(),
            x,
            y,
            z: 0.0,
            color: None,
        };
        MoleculeStructure {
            atoms: vec![atom(0, "O", 0.0, 0.0), atom(1, "H", 0.76, 0.59), atom(2, "H", -0.76, 0.59)],
            bonds: vec![
                Bond3D { source: 0, target: 1, order: 1 },
                Bond3D { source: 0, target: 2, order: 1 },
                Bond3D { source: 0, target: 9, order: 1 },
            ],
        }
    }

    #[test]
    fn test_structure_svg() {
        let svg = render_structure_svg(&water(), 0.0, 400, 400);
        assert_eq!(svg.matches("<circle").count(), 3);
        // The bond to the missing atom 9 is skipped.
        assert_eq!(svg.matches("<line").count(), 2);
        assert!(svg.contains("#FF0D0D"));

        // A quarter turn puts the hydrogens on the depth axis, on top of the oxygen.
        let turned = render_structure_svg(&water(), 90.0, 400, 400);
        assert_eq!(turned.matches("<circle").count(), 3);
    }

    #[test]
    fn test_structure_svg_depth_order() {
        let mut structure = water();
        structure.atoms[1].z = -2.0;
        structure.atoms[2].z = 2.0;
        let svg = render_structure_svg(&structure, 0.0, 400, 400);
        let back = svg.find("<title>H</title>").unwrap();
        let oxygen = svg.find("<title>O</title>").unwrap();
        let front = svg.rfind("<title>H</title>").unwrap();
        assert!(back < oxygen && oxygen < front);
    }
}
