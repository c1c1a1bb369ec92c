use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chemlab::script::{parse_script, run_script};
use chemlab::service::{ChemistryService, HttpTransport};
use chemlab::*;
use tracing::*;

const USAGE: &str =
    "Usage: builder-script <script> [--svg FILE] [--dot FILE] [--png FILE] [--csv PREFIX] [--name]";

#[derive(Debug, Default)]
struct Options {
    script: String,
    svg: Option<String>,
    dot: Option<String>,
    png: Option<String>,
    csv: Option<String>,
    name: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Options> {
    let mut options = Options::default();
    let mut script = None;
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| args.next().with_context(|| format!("{flag} needs a value\n{USAGE}"));
        match arg.as_str() {
            "--svg" => options.svg = Some(value("--svg")?),
            "--dot" => options.dot = Some(value("--dot")?),
            "--png" => options.png = Some(value("--png")?),
            "--csv" => options.csv = Some(value("--csv")?),
            "--name" => options.name = true,
            "-h" | "--help" => bail!(USAGE),
            flag if flag.starts_with("--") => bail!("Unknown option {flag}\n{USAGE}"),
            path if script.is_none() => script = Some(path.to_string()),
            extra => bail!("Unexpected argument {extra}\n{USAGE}"),
        }
    }
    options.script = script.context(USAGE)?;
    Ok(options)
}

impl Options {
    /// Where the DOT file goes. Rendering a PNG needs one, so without `--dot`
    /// it sits next to the image.
    fn dot_path(&self) -> Option<PathBuf> {
        match (&self.dot, &self.png) {
            (Some(dot), _) => Some(PathBuf::from(dot)),
            (None, Some(png)) => Some(Path::new(png).with_extension("dot")),
            (None, None) => None,
        }
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    init_logging(&std::env::var("CHEMLAB_LOG").unwrap_or_else(|_| "warn".to_string()));
    let options = parse_args(std::env::args().skip(1))?;

    let source = fs::read_to_string(&options.script)
        .with_context(|| format!("Failed to read {}", options.script))?;
    let lines = parse_script(&source)?;
    let mut editor = GraphEditor::new();
    let events = run_script(&mut editor, &lines)?;
    info!("Ran {} commands from {}", events.len(), options.script);

    println!("{}", editor.snapshot().to_json());

    if let Some(path) = &options.svg {
        fs::write(path, render_canvas_svg(&editor, CANVAS_WIDTH, CANVAS_HEIGHT))
            .with_context(|| format!("Failed to write {path}"))?;
    }
    if let Some(dot) = options.dot_path() {
        export_dot(editor.graph(), &dot, options.png.as_deref().map(Path::new))?;
    }
    if let Some(prefix) = &options.csv {
        let atoms = File::create(format!("{prefix}-atoms.csv"))?;
        let bonds = File::create(format!("{prefix}-bonds.csv"))?;
        editor
            .graph()
            .write_csv(atoms, bonds)
            .context("Failed to write CSV tables")?;
    }

    if options.name {
        let config = Config::from_env()?;
        let Some((ticket, snapshot)) = editor.begin_analysis() else {
            bail!("Nothing to name: the canvas is empty");
        };
        let service = ChemistryService::new(HttpTransport::new(&config));
        let result = service.name_structure(&snapshot, config.language).await;
        editor.finish_analysis(ticket, result);
        match editor.analysis().state() {
            RequestState::Ready(naming) => {
                println!("{}", naming.systematic_name);
                if let Some(common) = &naming.common_name {
                    println!("{common}");
                }
                println!("{}", naming.explanation);
            }
            RequestState::Failed(message) => bail!("{}: {message}", tr(config.language, "failedToName")),
            _ => {}
        }
    }

    Ok(())
}
