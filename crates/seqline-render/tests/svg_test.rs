use seqline_core::{SeqlineConfig, parse_event_stream};
use seqline_render::layout_stream;
use seqline_render::svg::render_svg;
use seqline_render::text::DeterministicTextMeasurer;
use std::path::PathBuf;
use std::sync::Arc;

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

fn render_fixture(name: &str) -> String {
    let path = workspace_root().join("fixtures").join("events").join(name);
    let text = std::fs::read_to_string(&path).expect("fixture");
    let stream = parse_event_stream(&text).expect("event stream");
    let layout = layout_stream(
        &stream,
        &SeqlineConfig::default(),
        Arc::new(DeterministicTextMeasurer::default()),
    )
    .expect("layout");
    render_svg(&layout)
}

#[test]
fn basic_fixture_renders_well_formed_svg() {
    let svg = render_fixture("basic.json");
    let doc = roxmltree::Document::parse(&svg).expect("well-formed svg");
    let root = doc.root_element();
    assert_eq!(root.tag_name().name(), "svg");

    let width: f64 = root.attribute("width").unwrap().parse().unwrap();
    let height: f64 = root.attribute("height").unwrap().parse().unwrap();
    assert!(width > 0.0 && height > 0.0);

    let count = |tag: &str| doc.descendants().filter(|n| n.has_tag_name(tag)).count();
    assert!(count("polyline") >= 3, "loop arrow and fragment tabs");
    assert!(count("polygon") >= 1, "closed arrow heads");
    assert!(count("line") > 0);
    assert!(count("text") > 0);
}

#[test]
fn labels_are_escaped() {
    let svg = render_fixture("basic.json");
    let doc = roxmltree::Document::parse(&svg).expect("well-formed svg");
    let texts: Vec<String> = doc
        .descendants()
        .filter(|n| n.has_tag_name("tspan"))
        .filter_map(|n| n.text().map(str::to_string))
        .collect();
    assert!(texts.iter().any(|t| t == "[retries < 3]"));
    assert!(texts.iter().any(|t| t == "login(name)"));
}

#[test]
fn every_element_stays_inside_the_viewbox() {
    let svg = render_fixture("basic.json");
    let doc = roxmltree::Document::parse(&svg).expect("well-formed svg");
    let root = doc.root_element();
    let width: f64 = root.attribute("width").unwrap().parse().unwrap();
    let height: f64 = root.attribute("height").unwrap().parse().unwrap();

    for node in doc.descendants().filter(|n| n.has_tag_name("line")) {
        for (x, y) in [("x1", "y1"), ("x2", "y2")] {
            let x: f64 = node.attribute(x).unwrap().parse().unwrap();
            let y: f64 = node.attribute(y).unwrap().parse().unwrap();
            assert!((0.0..=width).contains(&x), "x {x} outside 0..{width}");
            assert!((0.0..=height).contains(&y), "y {y} outside 0..{height}");
        }
    }
}
