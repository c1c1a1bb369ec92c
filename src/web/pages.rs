use crate::{
    escape_xml, instructions, tr, tr_with, Element, Language, RequestState, Tool, CANVAS_HEIGHT,
    CANVAS_WIDTH,
};

use super::Workspace;

const GLOBAL_STYLES: &str = r#"
body {
		font-family: 'Helvetica Neue', Helvetica, Arial, sans-serif;
		background: #f5f7fa;
		color: #333;
		margin: 20px;
		padding: 0;
}
nav {
		display: flex;
		gap: 20px;
		align-items: center;
		max-width: 1000px;
		margin: 0 auto;
}
nav .title {
		font-size: 1.4rem;
		font-weight: bold;
		margin-right: auto;
}
.container {
		max-width: 1000px;
		margin: 30px auto;
		background: #ffffff;
		padding: 30px;
		border-radius: 8px;
		box-shadow: 0 2px 10px rgba(0, 0, 0, 0.1);
}
.palette {
		display: flex;
		flex-wrap: wrap;
		gap: 8px;
		margin-bottom: 15px;
}
.palette form {
		display: inline;
}
button, input[type="submit"] {
		padding: 8px 14px;
		background-color: #e2e8f0;
		color: #1e293b;
		border: none;
		border-radius: 4px;
		font-size: 1rem;
		cursor: pointer;
}
button.active, input[type="submit"].primary {
		background-color: #3b82f6;
		color: #fff;
}
button:disabled {
		opacity: 0.5;
		cursor: not-allowed;
}
input[type="text"], textarea {
		width: 100%;
		padding: 10px;
		font-size: 1rem;
		border: 1px solid #ccc;
		border-radius: 4px;
		box-sizing: border-box;
}
input[type="image"] {
		border: 1px solid #ddd;
		border-radius: 4px;
		cursor: crosshair;
}
a {
		color: #007BFF;
		text-decoration: none;
		font-weight: bold;
}
a:hover {
		text-decoration: underline;
}
.alert {
		padding: 15px;
		background-color: #f44336;
		color: white;
		margin: 20px 0;
		border-radius: 4px;
}
.muted {
		color: #64748b;
}
"#;

/// Seconds each mechanism step stays on screen during playback.
const PLAYBACK_INTERVAL_SECS: u32 = 2;

/// `head` is extra markup for the document head, such as a refresh directive.
fn layout(language: Language, back: &str, head: &str, body: &str) -> String {
    format!(
        r#"
		<!DOCTYPE html>
		<html lang="{code}">
			<head>
				<meta charset="utf-8">
				{head}
				<title>{title}</title>
				<style>
					{GLOBAL_STYLES}
				</style>
			</head>
			<body>
				<nav>
					<span class="title">{title}</span>
					<a href="/lab">{reaction}</a>
					<a href="/builder">{builder}</a>
					<form action="/language" method="post">
						<input type="hidden" name="back" value="{back}">
						<input type="hidden" name="lang" value="{other}">
						<button type="submit">{other_name}</button>
					</form>
				</nav>
				<div class="container">
					{body}
				</div>
			</body>
		</html>
		"#,
        code = language.code(),
        title = tr(language, "appTitle"),
        reaction = tr(language, "navReaction"),
        builder = tr(language, "navBuilder"),
        back = escape_xml(back),
        other = language.toggled().code(),
        other_name = tr(language.toggled(), "languageName"),
    )
}

pub fn landing(language: Language) -> String {
    let body = format!(
        r#"
					<h1>{title}</h1>
					<p><a href="/lab">{reaction}</a></p>
					<p><a href="/builder">{builder}</a></p>
		"#,
        title = tr(language, "appTitle"),
        reaction = tr(language, "navReaction"),
        builder = tr(language, "navBuilder"),
    );
    layout(language, "/", "", &body)
}

fn tool_button(language: Language, tool: Tool, active: Tool) -> String {
    let label = match tool {
        Tool::Place(element) => element.symbol().to_string(),
        other => tr(language, &format!("toolsTooltip.{other}")).to_string(),
    };
    format!(
        r#"<form action="/builder/tool" method="post"><input type="hidden" name="tool" value="{tool}"><button type="submit" title="{label}"{class}>{label}</button></form>"#,
        class = if tool == active { r#" class="active""# } else { "" },
    )
}

pub fn builder(workspace: &Workspace) -> String {
    let language = workspace.language;
    let editor = &workspace.editor;
    let graph = editor.graph();

    let mut tools = String::new();
    for tool in [Tool::Move, Tool::Bond, Tool::Delete] {
        tools.push_str(&tool_button(language, tool, editor.tool()));
    }
    tools.push_str(&format!(
        r#"<form action="/builder/clear" method="post"><button type="submit">{}</button></form>"#,
        tr(language, "toolsTooltip.clear")
    ));

    let mut elements = String::new();
    for element in Element::ALL {
        elements.push_str(&tool_button(language, Tool::Place(element), editor.tool()));
    }

    let steps: String = instructions(language)
        .iter()
        .map(|line| format!("<li>{}</li>", escape_xml(line)))
        .collect();

    let stats = format!(
        "{} · {}",
        tr_with(
            language,
            "canvasStats",
            &[
                ("atoms", graph.atom_count().to_string()),
                ("bonds", graph.bond_count().to_string()),
            ],
        ),
        tr_with(
            language,
            "fragments",
            &[("count", graph.fragment_count().to_string())],
        )
    );

    let analysis = match editor.analysis().state() {
        RequestState::Idle => format!(r#"<p class="muted">{}</p>"#, tr(language, "buildMoleculeInfo")),
        RequestState::Pending => format!(r#"<p class="muted">{}</p>"#, tr(language, "analyzingBtn")),
        RequestState::Failed(_) => format!(r#"<div class="alert">{}</div>"#, tr(language, "failedToName")),
        RequestState::Ready(result) => {
            let common = result
                .common_name
                .as_deref()
                .map(|name| {
                    format!(
                        "<p><strong>{}:</strong> {}</p>",
                        tr(language, "commonNameLabel"),
                        escape_xml(name)
                    )
                })
                .unwrap_or_default();
            format!(
                r#"<p><strong>{}:</strong> {}</p>{common}<h3>{}</h3><p>{}</p>"#,
                tr(language, "systematicNameLabel"),
                escape_xml(&result.systematic_name),
                tr(language, "ruleLogic"),
                escape_xml(&result.explanation).replace('\n', "<br>"),
            )
        }
    };

    let body = format!(
        r#"
					<h2>{tools_title}</h2>
					<div class="palette">{tools}</div>
					<h2>{elements_title}</h2>
					<div class="palette">{elements}</div>
					<form action="/builder/click" method="post">
						<input type="image" name="canvas" src="/builder/canvas.svg?v={version}" width="{width}" height="{height}" alt="canvas">
					</form>
					<p class="muted">{stats}</p>
					<form action="/builder/analyze" method="post">
						<button type="submit" class="active"{disabled}>{analyze}</button>
					</form>
					{analysis}
					<h3>{instructions_title}</h3>
					<ol>{steps}</ol>
		"#,
        tools_title = tr(language, "tools"),
        elements_title = tr(language, "elements"),
        version = workspace.version(),
        width = CANVAS_WIDTH,
        height = CANVAS_HEIGHT,
        disabled = if graph.is_empty() { " disabled" } else { "" },
        analyze = tr(language, "analyzeBtn"),
        instructions_title = tr(language, "instructionsTitle"),
    );
    layout(language, "/builder", "", &body)
}

pub fn lab(workspace: &Workspace, angle: f64) -> String {
    let language = workspace.language;
    let lab = &workspace.lab;

    let result = match lab.prediction().state() {
        RequestState::Idle => format!(
            r#"<h2>{}</h2><p class="muted">{}</p>"#,
            tr(language, "readyToSimulate"),
            tr(language, "enterReactants")
        ),
        RequestState::Pending => format!(r#"<p class="muted">{}</p>"#, tr(language, "analyzingBtn")),
        RequestState::Failed(_) => format!(r#"<div class="alert">{}</div>"#, tr(language, "failedToAnalyze")),
        RequestState::Ready(result) => {
            let products: String = result
                .products
                .iter()
                .map(|p| format!("<li>{}</li>", escape_xml(p)))
                .collect();
            let mechanism = match lab.current_step() {
                Some((index, text)) => format!(
                    r#"
					<h3>{title}</h3>
					<p><strong>{step} {n}/{total}</strong></p>
					<p>{text}</p>
					<div class="palette">
						<form action="/lab/step" method="post"><input type="hidden" name="direction" value="first"><button type="submit">{first}</button></form>
						<form action="/lab/step" method="post"><input type="hidden" name="direction" value="previous"><button type="submit"{at_first}>{previous}</button></form>
						<form action="/lab/step" method="post"><input type="hidden" name="direction" value="next"><button type="submit"{at_last}>{next}</button></form>
						<form action="/lab/step" method="post"><input type="hidden" name="direction" value="play"><button type="submit" class="{playing}">{play}</button></form>
					</div>
		"#,
                    title = tr(language, "mechanism"),
                    step = tr(language, "step"),
                    n = index + 1,
                    total = lab.step_count(),
                    text = escape_xml(text),
                    first = tr(language, "firstStep"),
                    previous = tr(language, "previousStep"),
                    next = tr(language, "nextStep"),
                    at_first = if index == 0 { " disabled" } else { "" },
                    at_last = if lab.at_last_step() { " disabled" } else { "" },
                    playing = if lab.is_playing() { "active" } else { "" },
                    play = tr(language, if lab.is_playing() { "pause" } else { "play" }),
                ),
                None => String::new(),
            };
            format!(
                r#"
					<h2>{result_title}</h2>
					<p><strong>{equation}</strong></p>
					<h3>{products_title}</h3>
					<ul>{products}</ul>
					<h3>{geometry}</h3>
					<p>{vsepr}</p>
					<h3>{structure}</h3>
					<img src="/lab/structure.svg?angle={angle}" width="400" height="400" alt="structure">
					<p><a href="/lab?angle={left}">⟲</a> <a href="/lab?angle={right}">⟳</a></p>
					{mechanism}
		"#,
                result_title = tr(language, "reactionResult"),
                equation = escape_xml(&result.equation),
                products_title = tr(language, "productsIdentified"),
                geometry = tr(language, "geometry"),
                vsepr = escape_xml(&result.vsepr_info),
                structure = tr(language, "productStructure"),
                left = (angle - 30.0).rem_euclid(360.0),
                right = (angle + 30.0).rem_euclid(360.0),
            )
        }
    };

    let body = format!(
        r#"
					<h2>{setup}</h2>
					<form action="/lab/predict" method="post">
						<label for="reactants">{reactants_label}</label>
						<textarea id="reactants" name="reactants" rows="2" placeholder="{reactants_hint}" required>{reactants}</textarea>
						<label for="conditions">{conditions_label}</label>
						<input type="text" id="conditions" name="conditions" placeholder="{conditions_hint}" value="{conditions}">
						<input type="submit" class="primary" value="{predict}">
					</form>
					{result}
		"#,
        setup = tr(language, "reactionSetup"),
        reactants_label = tr(language, "reactants"),
        reactants_hint = escape_xml(tr(language, "placeholderReactants")),
        reactants = escape_xml(lab.reactants()),
        conditions_label = tr(language, "conditions"),
        conditions_hint = escape_xml(tr(language, "placeholderConditions")),
        conditions = escape_xml(lab.conditions()),
        predict = tr(language, "predictBtn"),
    );
    let refresh = if lab.is_playing() {
        format!(
            r#"<meta http-equiv="refresh" content="{PLAYBACK_INTERVAL_SECS};url=/lab/tick?angle={angle}">"#
        )
    } else {
        String::new()
    };
    layout(language, "/lab", &refresh, &body)
}
