//! A tiny line-based language for driving the graph editor without a pointer.
//!
//! ```text
//! # ethanal
//! tool C
//! click 100 100
//! click 140 100
//! tool O
//! click 180 100
//! tool bond
//! click 100 100
//! click 140 100
//! drag a3 180 120
//! ```

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit1, space0, space1},
    combinator::{all_consuming, map, map_res, opt, recognize, value, verify},
    error::{convert_error, VerboseError},
    number::complete::double,
    sequence::{pair, preceded, terminated, tuple},
    IResult,
};
use thiserror::Error;
use tracing::*;

use crate::{AtomId, EditorEvent, GraphEditor, Point, Tool};

type Res<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Tool(Tool),
    Click(Point),
    Drag(AtomId, Point),
    Clear,
}

#[derive(Error, Debug, PartialEq)]
pub enum ScriptError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("line {line}: no atom {id} to drag")]
    UnknownAtom { line: usize, id: AtomId },
}

/// A parsed command with the (1-based) line it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub number: usize,
    pub command: Command,
}

fn parse_tool(input: &str) -> Res<'_, Tool> {
    map_res(
        take_while1(|c: char| c.is_ascii_alphabetic()),
        |name: &str| name.parse::<Tool>(),
    )(input)
}

/// A finite coordinate; `double` alone would also take `nan` and `inf`.
fn parse_coordinate(input: &str) -> Res<'_, f64> {
    verify(double, |value: &f64| value.is_finite())(input)
}

fn parse_point(input: &str) -> Res<'_, Point> {
    map(
        tuple((parse_coordinate, preceded(space1, parse_coordinate))),
        |(x, y)| Point::new(x, y),
    )(input)
}

fn parse_atom_id(input: &str) -> Res<'_, AtomId> {
    map_res(recognize(pair(char('a'), digit1)), |id: &str| id.parse::<AtomId>())(input)
}

fn parse_command(input: &str) -> Res<'_, Command> {
    alt((
        map(preceded(pair(tag("tool"), space1), parse_tool), Command::Tool),
        map(preceded(pair(tag("click"), space1), parse_point), Command::Click),
        map(
            preceded(
                pair(tag("drag"), space1),
                pair(terminated(parse_atom_id, space1), parse_point),
            ),
            |(id, to)| Command::Drag(id, to),
        ),
        value(Command::Clear, tag("clear")),
    ))(input)
}

/// Parse one line; `None` for blank lines and comments.
fn parse_line(input: &str) -> Res<'_, Option<Command>> {
    let comment = preceded(char('#'), nom::combinator::rest);
    all_consuming(terminated(
        preceded(space0, opt(parse_command)),
        pair(space0, opt(comment)),
    ))(input)
}

/// Parse a whole script.
pub fn parse_script(source: &str) -> Result<Vec<Line>, ScriptError> {
    let mut lines = vec![];
    for (index, text) in source.lines().enumerate() {
        let number = index + 1;
        match parse_line(text) {
            Ok((_, Some(command))) => lines.push(Line { number, command }),
            Ok((_, None)) => {}
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                return Err(ScriptError::Syntax {
                    line: number,
                    message: convert_error(text, e),
                })
            }
            Err(nom::Err::Incomplete(_)) => {
                return Err(ScriptError::Syntax {
                    line: number,
                    message: "incomplete command".to_string(),
                })
            }
        }
    }
    Ok(lines)
}

/// Apply parsed commands to an editor, returning the event of every command.
pub fn run_script(editor: &mut GraphEditor, lines: &[Line]) -> Result<Vec<EditorEvent>, ScriptError> {
    let mut events = vec![];
    for line in lines {
        let event = match &line.command {
            Command::Tool(tool) => editor.set_tool(*tool),
            Command::Click(point) => editor.click(*point),
            Command::Drag(id, to) => {
                if !editor.move_atom(*id, *to) {
                    return Err(ScriptError::UnknownAtom {
                        line: line.number,
                        id: *id,
                    });
                }
                EditorEvent::AtomMoved(*id)
            }
            Command::Clear => editor.clear(),
        };
        debug!("line {}: {:?}", line.number, event);
        events.push(event);
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BondOrder, Element};

    #[test]
    fn test_parse_commands() {
        let lines = parse_script(
            "# header\n\
             tool Cl\n\
             \n\
             click 10 -20.5   # trailing comment\n\
             drag a12 1e2 3\n\
             clear\n",
        )
        .unwrap();
        let commands: Vec<_> = lines.iter().map(|l| (l.number, l.command.clone())).collect();
        assert_eq!(
            commands,
            vec![
                (2, Command::Tool(Tool::Place(Element::Cl))),
                (4, Command::Click(Point::new(10.0, -20.5))),
                (5, Command::Drag(AtomId::new(12), Point::new(100.0, 3.0))),
                (6, Command::Clear),
            ]
        );
    }

    #[test]
    fn test_syntax_errors_report_line() {
        match parse_script("tool C\nclick 1\n") {
            Err(ScriptError::Syntax { line, .. }) => assert_eq!(line, 2),
            other => panic!("Expected a syntax error, got {:?}", other),
        }
        match parse_script("tool Xx") {
            Err(ScriptError::Syntax { line, .. }) => assert_eq!(line, 1),
            other => panic!("Expected a syntax error, got {:?}", other),
        }
        assert!(parse_script("clear now").is_err());
    }

    #[test]
    fn test_non_finite_coordinates_rejected() {
        for line in ["click nan 10", "click 10 inf", "click -inf 0", "drag a1 NaN 3"] {
            assert!(
                matches!(parse_script(line), Err(ScriptError::Syntax { line: 1, .. })),
                "{line} should not parse"
            );
        }
    }

    #[test]
    fn test_run_carbon_monoxide_script() {
        let script = "\
            tool C\n\
            click 100 100\n\
            tool O\n\
            click 140 100\n\
            tool bond\n\
            click 100 100\n\
            click 140 100\n\
            click 100 100\n\
            click 140 100\n\
            click 100 100\n\
            click 140 100\n";
        let lines = parse_script(script).unwrap();
        let mut editor = GraphEditor::new();
        let events = run_script(&mut editor, &lines).unwrap();
        assert_eq!(events.len(), 11);
        assert_eq!(editor.graph().bond_count(), 1);
        assert_eq!(editor.graph().bonds()[0].order, BondOrder::Triple);
    }

    #[test]
    fn test_drag_unknown_atom() {
        let lines = parse_script("drag a4 0 0").unwrap();
        let mut editor = GraphEditor::new();
        assert_eq!(
            run_script(&mut editor, &lines),
            Err(ScriptError::UnknownAtom {
                line: 1,
                id: AtomId::new(4)
            })
        );
    }
}
