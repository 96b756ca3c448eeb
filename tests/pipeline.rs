//! End-to-end runs: markup rendered by the static page, extracted into IR,
//! pushed through the wire form, and rebuilt on a recording canvas.

use anyhow::Result;
use decal_canvas::{Paint, RecordingCanvas, SceneKind, reconstruct};
use decal_css::Rgba;
use decal_engine::StaticPage;
use decal_extract::{ExtractOptions, extract};
use decal_ir::schema::{validate_message_value, validate_reply, validate_request};
use decal_ir::{ImportReply, ImportRequest, IrNode};
use decal_text::FontId;

type TestResult = Result<()>;

const VIEWPORT: (f32, f32) = (1280.0, 800.0);

fn extract_at(html: &str, viewport: (f32, f32)) -> Result<IrNode> {
    let mut page = StaticPage::from_html(html, viewport)?;
    Ok(extract(&mut page, &ExtractOptions::default())?)
}

fn extract_ir(html: &str) -> Result<IrNode> {
    extract_at(html, VIEWPORT)
}

fn canvas() -> RecordingCanvas {
    RecordingCanvas::new(VIEWPORT.0, VIEWPORT.1)
}

#[test]
fn solid_div_imports_as_one_filled_container() -> TestResult {
    let html = r#"<html><body style="margin: 0">
        <div style="background: #ff0000; width: 100px; height: 50px"></div>
    </body></html>"#;

    let tree = extract_ir(html)?;
    assert_eq!(tree.children.len(), 1);
    let div = &tree.children[0];
    assert_eq!(div.rect.w, 100.0);
    assert_eq!(div.rect.h, 50.0);
    let color = div.style.background_color.as_ref().unwrap();
    assert_eq!(color.css_string(), "rgb(255, 0, 0)");

    // Render width must not leak into the element's own geometry.
    let narrow = extract_at(html, (400.0, 300.0))?;
    assert_eq!(narrow.children[0], *div);

    let mut canvas = canvas();
    let report = reconstruct(&mut canvas, &tree)?;
    assert_eq!(report.stats.frames, 2);
    assert_eq!(report.stats.texts, 0);
    let child = canvas.node(canvas.node(report.root).children[0]);
    assert_eq!(child.kind, SceneKind::Frame);
    assert_eq!(child.rect.w, 100.0);
    assert_eq!(child.rect.h, 50.0);
    assert_eq!(child.fill, Some(Paint::Solid { color: Rgba::from_u8(255, 0, 0) }));
    Ok(())
}

#[test]
fn inline_markup_merges_into_segmented_text() -> TestResult {
    let tree = extract_ir(
        r#"<html><body style="margin: 0">
            <p style="margin: 0">Hello <strong>World</strong></p>
        </body></html>"#,
    )?;
    let p = &tree.children[0];
    assert_eq!(p.text, "Hello World");
    assert!(p.children.is_empty());
    assert_eq!(p.text_segments.len(), 2);
    assert_eq!(p.text_segments[0].text, "Hello ");
    assert!(!p.text_segments[0].bold);
    assert_eq!(p.text_segments[1].text, "World");
    assert!(p.text_segments[1].bold);

    let mut canvas = canvas();
    let report = reconstruct(&mut canvas, &tree)?;
    assert_eq!(report.stats.texts, 1);
    let node = canvas.node(canvas.node(report.root).children[0]);
    assert_eq!(node.kind, SceneKind::Text);
    let text = node.text.as_ref().unwrap();
    assert_eq!(text.content, "Hello World");
    // Only the bold run needs a ranged override.
    assert_eq!(text.spans.len(), 1);
    assert_eq!(text.spans[0].start, 6);
    assert_eq!(text.spans[0].end, 11);
    assert_eq!(text.spans[0].font, FontId::new("Inter", "Bold"));
    Ok(())
}

#[test]
fn gradient_background_stays_a_gradient() -> TestResult {
    let tree = extract_ir(
        r#"<html><body style="margin: 0">
            <div style="background: linear-gradient(90deg, #000, #fff); width: 120px; height: 40px"></div>
        </body></html>"#,
    )?;
    let div = &tree.children[0];
    assert!(div.style.background_image.as_deref().unwrap().starts_with("linear-gradient"));

    let mut canvas = canvas();
    let report = reconstruct(&mut canvas, &tree)?;
    let child = canvas.node(canvas.node(report.root).children[0]);
    let Some(Paint::Linear { gradient }) = &child.fill else {
        panic!("expected a gradient fill, got {:?}", child.fill);
    };
    assert_eq!(gradient.stops.len(), 2);
    assert_eq!(gradient.stops[0].position, 0.0);
    assert_eq!(gradient.stops[0].color, Rgba::from_u8(0, 0, 0));
    assert_eq!(gradient.stops[1].position, 1.0);
    assert_eq!(gradient.stops[1].color, Rgba::from_u8(255, 255, 255));

    // 90deg runs left to right across the unit square.
    let (x0, y0) = gradient.transform.start();
    let (x1, y1) = gradient.transform.end();
    assert!(x0.abs() < 1e-3 && (x1 - 1.0).abs() < 1e-3, "axis: {x0},{y0} -> {x1},{y1}");
    assert!((y0 - y1).abs() < 1e-3);
    Ok(())
}

#[test]
fn symbol_references_inline_with_scale() -> TestResult {
    let tree = extract_ir(
        r##"<html><body style="margin: 0">
            <svg xmlns="http://www.w3.org/2000/svg" width="20" height="20">
                <use href="#star" width="20" height="20"></use>
            </svg>
            <svg width="0" height="0"><symbol id="star" viewBox="0 0 10 10">
                <path d="M0 0h10v10z"></path>
            </symbol></svg>
        </body></html>"##,
    )?;
    // The zero-sized sprite sheet is pruned; only the reference survives.
    assert_eq!(tree.children.len(), 1);
    let svg = &tree.children[0];
    assert_eq!(svg.kind, "svg");
    let markup = svg.svg_markup.as_deref().unwrap();
    assert!(markup.contains("scale(2,2)"), "markup: {markup}");
    assert!(markup.contains("M0 0h10v10z"));
    assert!(!markup.contains("<use"));

    let mut canvas = canvas();
    let report = reconstruct(&mut canvas, &tree)?;
    let node = canvas.node(canvas.node(report.root).children[0]);
    assert_eq!(node.kind, SceneKind::Vector);
    assert!(node.svg.as_deref().unwrap().contains("scale(2,2)"));
    Ok(())
}

#[test]
fn wire_request_round_trips_and_validates() -> TestResult {
    let tree = extract_ir(
        r#"<html><body style="margin: 0">
            <div style="background: rgb(0, 128, 255); width: 60px; height: 30px">
                <p style="margin: 0">Hi</p>
            </div>
        </body></html>"#,
    )?;

    let request = ImportRequest::new(tree);
    validate_request(&request)?;

    let wire = serde_json::to_string(&request)?;
    let value: serde_json::Value = serde_json::from_str(&wire)?;
    validate_message_value(&value)?;
    assert_eq!(value["type"], "import-dom");
    assert_eq!(value["data"]["children"][0]["style"]["backgroundColor"], "rgb(0, 128, 255)");

    let back: ImportRequest = serde_json::from_str(&wire)?;
    assert_eq!(back, request);
    Ok(())
}

#[test]
fn reply_counts_preserve_the_ir_node_count() -> TestResult {
    let tree = extract_ir(
        r#"<html><body style="margin: 0">
            <div style="width: 200px; height: 100px; background: rgb(240, 240, 240)">
                <p style="margin: 0">Caption</p>
            </div>
            <svg width="40" height="20"><circle cx="10" cy="10" r="5"></circle></svg>
            <img src="logo.png" width="40" height="30">
        </body></html>"#,
    )?;
    assert_eq!(tree.count(), 5);

    let mut canvas = canvas();
    let report = reconstruct(&mut canvas, &tree)?;
    assert_eq!(report.stats.frames + report.stats.texts, tree.count());

    let reply = ImportReply::done(report.stats.frames as u32, report.stats.texts as u32);
    validate_reply(&reply)?;
    let value = serde_json::to_value(&reply)?;
    assert_eq!(value["type"], "import-done");
    assert_eq!(value["frameCount"], 4);
    assert_eq!(value["textCount"], 1);
    Ok(())
}

#[test]
fn root_failure_produces_an_error_reply() -> TestResult {
    let mut page = StaticPage::from_html("<html><body></body></html>", VIEWPORT)?;
    let error = extract(&mut page, &ExtractOptions::default())
        .err()
        .map(|e| e.to_string())
        .unwrap();

    let reply = ImportReply::error(format!("extract failed: {error}"));
    validate_reply(&reply)?;
    let value = serde_json::to_value(&reply)?;
    assert_eq!(value["type"], "import-error");
    assert!(value["error"].as_str().unwrap().starts_with("extract failed"));
    Ok(())
}

#[test]
fn document_background_reaches_the_canvas_root() -> TestResult {
    let tree = extract_ir(
        r#"<html style="background: rgb(24, 24, 32)"><body style="margin: 0">
            <p style="margin: 0">Night</p>
        </body></html>"#,
    )?;
    assert_eq!(tree.style.background_color, Some(Rgba::from_u8(24, 24, 32)));

    let mut canvas = canvas();
    let report = reconstruct(&mut canvas, &tree)?;
    let root = canvas.node(report.root);
    assert_eq!(root.fill, Some(Paint::Solid { color: Rgba::from_u8(24, 24, 32) }));

    let dump = canvas.scene_json(report.root)?;
    let scene: serde_json::Value = serde_json::from_str(&dump)?;
    assert_eq!(scene["children"][0]["kind"], "text");
    Ok(())
}
