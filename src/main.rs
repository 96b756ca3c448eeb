//! Pipeline driver: renders an HTML file with the in-process static page,
//! extracts the IR, crosses the serialization boundary, rebuilds the tree on
//! a recording canvas, and prints the reply message. `--ir` and `--scene`
//! additionally dump the wire request and the rebuilt scene as JSON.

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use url::Url;

use decal_canvas::{BuildOptions, RecordingCanvas, TreeBuilder, default_catalog};
use decal_config::DecalConfig;
use decal_css::parse_color;
use decal_engine::StaticPage;
use decal_extract::{ExtractOptions, extract};
use decal_ir::schema::{validate_reply, validate_request};
use decal_ir::{ImportReply, ImportRequest};
use decal_text::SystemCatalog;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() -> Result<()> {
    init_tracing();

    let mut args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        eprintln!("Usage: decal <input.html> [--ir] [--scene] [--viewport WxH]");
        bail!("missing <input.html>");
    }

    let input = PathBuf::from(args.remove(0));
    if !input.exists() {
        bail!("input file not found: {}", input.display());
    }

    let mut config = DecalConfig::load();
    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--ir" => {
                config.output.ir = true;
                i += 1;
            }
            "--scene" => {
                config.output.scene = true;
                i += 1;
            }
            "--viewport" => {
                if i + 1 >= args.len() {
                    bail!("--viewport expects WxH, e.g. 1280x800");
                }
                let (w, h) = parse_viewport(&args[i + 1])?;
                config.viewport.width = w;
                config.viewport.height = h;
                i += 2;
            }
            other => bail!("unknown flag: {other}"),
        }
    }

    let html = fs::read_to_string(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;

    let viewport = (config.viewport.width, config.viewport.height);
    let mut page =
        StaticPage::from_html(&html, viewport).context("failed to render input markup")?;

    let extract_options = extract_options(&config)?;
    let tree = match extract(&mut page, &extract_options) {
        Ok(tree) => tree,
        Err(error) => return fail(&format!("extract failed: {error}")),
    };

    let request = ImportRequest::new(tree);
    validate_request(&request)?;
    if config.output.ir {
        print_json(&request, config.output.pretty)?;
    }

    // The IR crosses the boundary as JSON; parse the wire form back the way
    // the canvas side receives it.
    let wire = serde_json::to_string(&request).context("failed to serialize request")?;
    let request: ImportRequest =
        serde_json::from_str(&wire).context("failed to parse wire request")?;

    let mut canvas = build_canvas(&config);
    let builder = TreeBuilder::with_options(&mut canvas, build_options(&config)?);
    let report = match builder.build(request.data()) {
        Ok(report) => report,
        Err(error) => return fail(&format!("reconstruct failed: {error}")),
    };

    if config.output.scene {
        print_json(&canvas.scene(report.root), config.output.pretty)?;
    }

    let reply = ImportReply::done(report.stats.frames as u32, report.stats.texts as u32);
    validate_reply(&reply)?;
    print_json(&reply, config.output.pretty)?;
    info!(frames = report.stats.frames, texts = report.stats.texts, "import finished");
    Ok(())
}

/// Emits the failure reply on stdout, then surfaces the error to the shell.
fn fail(message: &str) -> Result<()> {
    let reply = ImportReply::error(message);
    validate_reply(&reply)?;
    println!("{}", serde_json::to_string(&reply)?);
    bail!("{message}");
}

fn parse_viewport(value: &str) -> Result<(f32, f32)> {
    let Some((w, h)) = value.split_once(['x', 'X']) else {
        bail!("--viewport expects WxH, e.g. 1280x800");
    };
    let w: f32 = w.trim().parse().with_context(|| format!("bad viewport width: {w}"))?;
    let h: f32 = h.trim().parse().with_context(|| format!("bad viewport height: {h}"))?;
    if w <= 0.0 || h <= 0.0 {
        bail!("viewport dimensions must be positive");
    }
    Ok((w, h))
}

fn extract_options(config: &DecalConfig) -> Result<ExtractOptions> {
    let base_url = match config.extract.base_url.as_deref() {
        Some(raw) => {
            Some(Url::parse(raw).with_context(|| format!("bad extract.base_url: {raw}"))?)
        }
        None => None,
    };
    Ok(ExtractOptions { base_url, settle_passes: config.extract.settle_passes })
}

fn build_options(config: &DecalConfig) -> Result<BuildOptions> {
    let mut options = BuildOptions::default();
    if let Some(raw) = config.output.placeholder_fill.as_deref() {
        match parse_color(raw) {
            Some(color) => options.placeholder_fill = color,
            None => bail!("unparseable output.placeholder_fill: {raw}"),
        }
    }
    Ok(options)
}

fn build_canvas(config: &DecalConfig) -> RecordingCanvas {
    let (w, h) = (config.viewport.width, config.viewport.height);
    if config.fonts.use_system {
        return RecordingCanvas::with_catalog(w, h, SystemCatalog::from_system());
    }
    let mut catalog = default_catalog();
    for family in &config.fonts.families {
        for style in ["Regular", "Medium", "SemiBold", "Bold", "Italic", "Bold Italic"] {
            catalog.add(family, style);
        }
    }
    RecordingCanvas::with_catalog(w, h, catalog)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{text}");
    Ok(())
}
