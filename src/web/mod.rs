//! The browser front end: server-rendered pages, SVG canvases and form posts.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use actix_web::{error, http::header, web, HttpResponse};
use serde::Deserialize;
use tracing::*;

use crate::service::ChemistryService;
use crate::{
    render_canvas_svg, render_structure_svg, GraphEditor, Language, Point, ReactionLab, Tool,
    CANVAS_HEIGHT, CANVAS_WIDTH,
};

mod pages;

/// Everything one user sees: the builder, the lab and the chosen language.
pub struct Workspace {
    pub editor: GraphEditor,
    pub lab: ReactionLab,
    pub language: Language,
    version: Arc<AtomicU64>,
}

impl Workspace {
    pub fn new(language: Language) -> Self {
        let mut editor = GraphEditor::new();
        let version = Arc::new(AtomicU64::new(0));
        let counter = version.clone();
        editor.subscribe(move |event| {
            if event.mutates_graph() {
                counter.fetch_add(1, Ordering::Relaxed);
            }
        });
        Self {
            editor,
            lab: ReactionLab::new(),
            language,
            version,
        }
    }

    /// Bumped on every graph change; used to bust the canvas image cache.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Relaxed)
    }
}

pub type SharedWorkspace = web::Data<Mutex<Workspace>>;

fn lock(state: &SharedWorkspace) -> Result<MutexGuard<'_, Workspace>, actix_web::Error> {
    state.lock().map_err(|e| {
        error!("Workspace lock poisoned: {}", e);
        error::ErrorInternalServerError("workspace unavailable")
    })
}

fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok().content_type("text/html; charset=utf-8").body(body)
}

fn svg(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("image/svg+xml")
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .body(body)
}

#[derive(Deserialize)]
struct ToolForm {
    tool: String,
}

/// Coordinates posted by the canvas `<input type="image" name="canvas">`.
#[derive(Deserialize)]
struct ClickForm {
    #[serde(rename = "canvas.x")]
    x: f64,
    #[serde(rename = "canvas.y")]
    y: f64,
}

#[derive(Deserialize)]
struct PredictForm {
    reactants: String,
    #[serde(default)]
    conditions: String,
}

#[derive(Deserialize)]
struct StepForm {
    direction: String,
}

#[derive(Deserialize)]
struct LanguageForm {
    lang: Option<String>,
    back: Option<String>,
}

#[derive(Deserialize)]
struct AngleQuery {
    #[serde(default)]
    angle: f64,
}

async fn index(state: SharedWorkspace) -> actix_web::Result<HttpResponse> {
    let language = lock(&state)?.language;
    Ok(html(pages::landing(language)))
}

async fn builder_page(state: SharedWorkspace) -> actix_web::Result<HttpResponse> {
    let workspace = lock(&state)?;
    Ok(html(pages::builder(&workspace)))
}

async fn set_tool(state: SharedWorkspace, form: web::Form<ToolForm>) -> actix_web::Result<HttpResponse> {
    let tool: Tool = form.tool.parse().map_err(error::ErrorBadRequest)?;
    lock(&state)?.editor.set_tool(tool);
    Ok(see_other("/builder"))
}

async fn click(state: SharedWorkspace, form: web::Form<ClickForm>) -> actix_web::Result<HttpResponse> {
    let point = Point::new(form.x, form.y);
    if !point.is_finite() {
        return Err(error::ErrorBadRequest("canvas coordinates must be finite numbers"));
    }
    let event = lock(&state)?.editor.click(point);
    debug!("Click at ({}, {}): {:?}", form.x, form.y, event);
    Ok(see_other("/builder"))
}

async fn clear(state: SharedWorkspace) -> actix_web::Result<HttpResponse> {
    lock(&state)?.editor.clear();
    Ok(see_other("/builder"))
}

async fn analyze(
    state: SharedWorkspace,
    service: web::Data<ChemistryService>,
) -> actix_web::Result<HttpResponse> {
    let (language, started) = {
        let mut workspace = lock(&state)?;
        let language = workspace.language;
        (language, workspace.editor.begin_analysis())
    };
    let Some((ticket, snapshot)) = started else {
        return Ok(see_other("/builder"));
    };

    let result = service.name_structure(&snapshot, language).await;

    if !lock(&state)?.editor.finish_analysis(ticket, result) {
        info!("Discarded a naming result for a superseded canvas");
    }
    Ok(see_other("/builder"))
}

async fn canvas_svg(state: SharedWorkspace) -> actix_web::Result<HttpResponse> {
    let workspace = lock(&state)?;
    Ok(svg(render_canvas_svg(&workspace.editor, CANVAS_WIDTH, CANVAS_HEIGHT)))
}

async fn snapshot_json(state: SharedWorkspace) -> actix_web::Result<HttpResponse> {
    let snapshot = lock(&state)?.editor.snapshot();
    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .body(snapshot.to_json()))
}

async fn lab_page(state: SharedWorkspace, query: web::Query<AngleQuery>) -> actix_web::Result<HttpResponse> {
    let workspace = lock(&state)?;
    Ok(html(pages::lab(&workspace, query.angle)))
}

async fn predict(
    state: SharedWorkspace,
    service: web::Data<ChemistryService>,
    form: web::Form<PredictForm>,
) -> actix_web::Result<HttpResponse> {
    let (language, ticket) = {
        let mut workspace = lock(&state)?;
        let language = workspace.language;
        (language, workspace.lab.begin_prediction(&form.reactants, &form.conditions))
    };
    let Some(ticket) = ticket else {
        return Ok(see_other("/lab"));
    };

    let result = service
        .predict_reaction(form.reactants.trim(), form.conditions.trim(), language)
        .await;

    if !lock(&state)?.lab.finish_prediction(ticket, result) {
        info!("Discarded a superseded reaction prediction");
    }
    Ok(see_other("/lab"))
}

async fn step(state: SharedWorkspace, form: web::Form<StepForm>) -> actix_web::Result<HttpResponse> {
    let mut workspace = lock(&state)?;
    match form.direction.as_str() {
        "next" => workspace.lab.next_step(),
        "previous" => workspace.lab.previous_step(),
        "first" => workspace.lab.rewind(),
        "play" => workspace.lab.toggle_playback(),
        other => return Err(error::ErrorBadRequest(format!("Unknown step direction: {other}"))),
    }
    Ok(see_other("/lab"))
}

/// Playback beat, requested by the lab page's refresh directive while playing.
async fn tick(state: SharedWorkspace, query: web::Query<AngleQuery>) -> actix_web::Result<HttpResponse> {
    lock(&state)?.lab.tick();
    Ok(see_other(&format!("/lab?angle={}", query.angle)))
}

async fn structure_svg(
    state: SharedWorkspace,
    query: web::Query<AngleQuery>,
) -> actix_web::Result<HttpResponse> {
    let workspace = lock(&state)?;
    let Some(result) = workspace.lab.prediction().result() else {
        return Ok(HttpResponse::NotFound().finish());
    };
    Ok(svg(render_structure_svg(&result.product_structure, query.angle, 400, 400)))
}

async fn set_language(state: SharedWorkspace, form: web::Form<LanguageForm>) -> actix_web::Result<HttpResponse> {
    let mut workspace = lock(&state)?;
    workspace.language = match &form.lang {
        Some(code) => code.parse().map_err(error::ErrorBadRequest)?,
        None => workspace.language.toggled(),
    };
    info!("Language set to {}", workspace.language);

    // Only redirect within this site.
    let back = form
        .back
        .as_deref()
        .filter(|path| path.starts_with('/') && !path.starts_with("//"))
        .unwrap_or("/");
    Ok(see_other(back))
}

/// Register every route. The app must carry a [`SharedWorkspace`] and a
/// `web::Data<ChemistryService>`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/builder", web::get().to(builder_page))
        .route("/builder/tool", web::post().to(set_tool))
        .route("/builder/click", web::post().to(click))
        .route("/builder/clear", web::post().to(clear))
        .route("/builder/analyze", web::post().to(analyze))
        .route("/builder/canvas.svg", web::get().to(canvas_svg))
        .route("/builder/snapshot.json", web::get().to(snapshot_json))
        .route("/lab", web::get().to(lab_page))
        .route("/lab/predict", web::post().to(predict))
        .route("/lab/step", web::post().to(step))
        .route("/lab/tick", web::get().to(tick))
        .route("/lab/structure.svg", web::get().to(structure_svg))
        .route("/language", web::post().to(set_language));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{ServiceError, Transport};
    use actix_web::{test, App};
    use futures::future::LocalBoxFuture;

    /// Answers every prompt with the same reply, or fails if there is none.
    struct CannedTransport(Option<&'static str>);

    impl Transport for CannedTransport {
        fn complete<'a>(&'a self, _prompt: String) -> LocalBoxFuture<'a, Result<String, ServiceError>> {
            let reply = self
                .0
                .map(str::to_string)
                .ok_or_else(|| ServiceError::Transport("offline".to_string()));
            Box::pin(async move { reply })
        }
    }

    const NAMING_REPLY: &str =
        r#"{"systematicName": "methanol", "commonName": "wood alcohol", "explanation": "One carbon with OH."}"#;

    const REACTION_REPLY: &str = r#"{
        "equation": "HCl + NaOH -> NaCl + H2O",
        "products": ["NaCl", "H2O"],
        "mechanismSteps": ["Proton transfer", "Ion pairing"],
        "vseprInfo": "Bent",
        "productStructure": {
            "atoms": [{"id": 1, "element": "O", "x": 0, "y": 0, "z": 0}],
            "bonds": []
        }
    }"#;

    fn state(language: Language) -> SharedWorkspace {
        web::Data::new(Mutex::new(Workspace::new(language)))
    }

    macro_rules! app {
        ($state:expr, $reply:expr) => {
            test::init_service(
                App::new()
                    .app_data($state.clone())
                    .app_data(web::Data::new(ChemistryService::new(CannedTransport($reply))))
                    .configure(configure),
            )
            .await
        };
    }

    fn click_at(x: &str, y: &str) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/builder/click")
            .set_form([("canvas.x", x), ("canvas.y", y)])
    }

    fn tool(name: &str) -> test::TestRequest {
        test::TestRequest::post().uri("/builder/tool").set_form([("tool", name)])
    }

    #[actix_web::test]
    async fn test_build_and_name_methanol() {
        crate::init_logging("debug");
        let state = state(Language::En);
        let app = app!(state, Some(NAMING_REPLY));

        let response = test::call_service(&app, click_at("100", "100").to_request()).await;
        assert_eq!(response.status(), 303);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/builder");
        test::call_service(&app, tool("O").to_request()).await;
        test::call_service(&app, click_at("150", "100").to_request()).await;
        test::call_service(&app, tool("bond").to_request()).await;
        test::call_service(&app, click_at("100", "100").to_request()).await;
        test::call_service(&app, click_at("150", "100").to_request()).await;

        let json = test::call_and_read_body(
            &app,
            test::TestRequest::get().uri("/builder/snapshot.json").to_request(),
        )
        .await;
        assert_eq!(
            String::from_utf8(json.to_vec()).unwrap(),
            r#"{"atoms":{"a1":"C","a2":"O"},"bonds":[{"source":"a1","target":"a2","order":1}]}"#
        );

        let response = test::call_service(
            &app,
            test::TestRequest::post().uri("/builder/analyze").to_request(),
        )
        .await;
        assert_eq!(response.status(), 303);

        let page = test::call_and_read_body(&app, test::TestRequest::get().uri("/builder").to_request()).await;
        let page = String::from_utf8(page.to_vec()).unwrap();
        assert!(page.contains("methanol"));
        assert!(page.contains("wood alcohol"));
        assert!(page.contains("Canvas: 2 atoms, 1 bonds"));
    }

    #[actix_web::test]
    async fn test_failed_naming_leaves_graph() {
        let state = state(Language::En);
        let app = app!(state, None);

        test::call_service(&app, click_at("100", "100").to_request()).await;
        test::call_service(&app, test::TestRequest::post().uri("/builder/analyze").to_request()).await;

        let workspace = state.lock().unwrap();
        assert_eq!(workspace.editor.graph().atom_count(), 1);
        assert!(workspace.editor.analysis().error().is_some());
        let page = pages::builder(&workspace);
        assert!(page.contains("Could not name molecule. Try again."));
    }

    #[actix_web::test]
    async fn test_analyze_empty_canvas_is_noop() {
        let state = state(Language::En);
        let app = app!(state, Some(NAMING_REPLY));
        test::call_service(&app, test::TestRequest::post().uri("/builder/analyze").to_request()).await;
        assert!(!state.lock().unwrap().editor.analysis().is_pending());
        assert!(state.lock().unwrap().editor.analysis().result().is_none());
    }

    #[actix_web::test]
    async fn test_canvas_svg_and_version() {
        let state = state(Language::Zh);
        let app = app!(state, None);
        test::call_service(&app, click_at("40", "60").to_request()).await;
        // Blocked placement does not change the graph.
        test::call_service(&app, click_at("45", "60").to_request()).await;
        assert_eq!(state.lock().unwrap().version(), 1);

        let response = test::call_service(
            &app,
            test::TestRequest::get().uri("/builder/canvas.svg").to_request(),
        )
        .await;
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/svg+xml"
        );
        let body = test::read_body(response).await;
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains(r#"translate(40, 60)"#));
    }

    #[actix_web::test]
    async fn test_non_finite_click_is_rejected() {
        let state = state(Language::En);
        let app = app!(state, None);
        for (x, y) in [("NaN", "inf"), ("10", "-inf"), ("NaN", "10")] {
            let response = test::call_service(&app, click_at(x, y).to_request()).await;
            assert_eq!(response.status(), 400);
        }
        assert!(state.lock().unwrap().editor.graph().is_empty());
    }

    #[actix_web::test]
    async fn test_bad_tool_is_rejected() {
        let state = state(Language::En);
        let app = app!(state, None);
        let response = test::call_service(&app, tool("Xe").to_request()).await;
        assert_eq!(response.status(), 400);
    }

    #[actix_web::test]
    async fn test_reaction_lab_flow() {
        let state = state(Language::En);
        let app = app!(state, Some(REACTION_REPLY));

        let response = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/lab/predict")
                .set_form([("reactants", "HCl + NaOH"), ("conditions", "")])
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), 303);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/lab");

        let step = |direction: &'static str| {
            test::TestRequest::post()
                .uri("/lab/step")
                .set_form([("direction", direction)])
                .to_request()
        };
        test::call_service(&app, step("next")).await;
        test::call_service(&app, step("next")).await;
        assert_eq!(
            state.lock().unwrap().lab.current_step(),
            Some((1, "Ion pairing"))
        );

        let page = test::call_and_read_body(&app, test::TestRequest::get().uri("/lab").to_request()).await;
        let page = String::from_utf8(page.to_vec()).unwrap();
        assert!(page.contains("HCl + NaOH -&gt; NaCl + H2O"));
        assert!(page.contains("Step 2/2"));

        let response = test::call_service(
            &app,
            test::TestRequest::get().uri("/lab/structure.svg?angle=45").to_request(),
        )
        .await;
        assert!(response.status().is_success());
    }

    #[actix_web::test]
    async fn test_lab_autoplay() {
        let state = state(Language::En);
        let app = app!(state, Some(REACTION_REPLY));
        test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/lab/predict")
                .set_form([("reactants", "HCl + NaOH")])
                .to_request(),
        )
        .await;

        let read_lab = || test::TestRequest::get().uri("/lab").to_request();
        let page = String::from_utf8(test::call_and_read_body(&app, read_lab()).await.to_vec()).unwrap();
        assert!(!page.contains("http-equiv=\"refresh\""));
        assert!(page.contains(">Play<"));

        let play = test::TestRequest::post()
            .uri("/lab/step")
            .set_form([("direction", "play")])
            .to_request();
        assert_eq!(test::call_service(&app, play).await.status(), 303);
        let page = String::from_utf8(test::call_and_read_body(&app, read_lab()).await.to_vec()).unwrap();
        assert!(page.contains(r#"content="2;url=/lab/tick?angle=0""#));
        assert!(page.contains(">Pause<"));

        let tick = || test::TestRequest::get().uri("/lab/tick?angle=30").to_request();
        let response = test::call_service(&app, tick()).await;
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/lab?angle=30");
        assert_eq!(state.lock().unwrap().lab.current_step().map(|(i, _)| i), Some(1));

        // The beat after the last step ends playback.
        test::call_service(&app, tick()).await;
        assert!(!state.lock().unwrap().lab.is_playing());
        let page = String::from_utf8(test::call_and_read_body(&app, read_lab()).await.to_vec()).unwrap();
        assert!(!page.contains("http-equiv=\"refresh\""));
    }

    #[actix_web::test]
    async fn test_structure_svg_without_prediction() {
        let state = state(Language::En);
        let app = app!(state, None);
        let response = test::call_service(
            &app,
            test::TestRequest::get().uri("/lab/structure.svg").to_request(),
        )
        .await;
        assert_eq!(response.status(), 404);
    }

    #[actix_web::test]
    async fn test_language_toggle() {
        let state = state(Language::Zh);
        let app = app!(state, None);

        let response = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/language")
                .set_form([("back", "/lab")])
                .to_request(),
        )
        .await;
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/lab");
        assert_eq!(state.lock().unwrap().language, Language::En);

        let response = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/language")
                .set_form([("lang", "zh"), ("back", "//evil.example")])
                .to_request(),
        )
        .await;
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
        assert_eq!(state.lock().unwrap().language, Language::Zh);

        let page = test::call_and_read_body(&app, test::TestRequest::get().uri("/").to_request()).await;
        let page = String::from_utf8(page.to_vec()).unwrap();
        assert!(page.contains("化学AI专家"));
    }
}
