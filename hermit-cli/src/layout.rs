//! Generate an HTML/SVG picture of the ZX Spectrum membrane.
//! The top panel is the keyboard as it looks; the bottom panel is the 8x5
//! matrix as it is wired, with the GPIO pin of every row and column.

use hermit_drivers::config::MembraneConfig;
use hermit_keymap::{is_modifier_cell, lookup, position, InputKey, COLS, ROWS};

/// Key unit size in SVG pixels.
const U: f64 = 54.0;
/// Gap between keys.
const GAP: f64 = 4.0;
/// Step: key + gap.
const S: f64 = U + GAP;
/// Key corner radius.
const R: f64 = 4.0;
/// Margin around the SVG content.
const MARGIN: f64 = 20.0;
/// Room for a panel title.
const TITLE: f64 = 40.0;

/// The four physical rows of the 48K keyboard, left to right.
const PHYSICAL: [[InputKey; 10]; 4] = {
    use InputKey as K;
    [
        [K::N1, K::N2, K::N3, K::N4, K::N5, K::N6, K::N7, K::N8, K::N9, K::N0],
        [K::Q, K::W, K::E, K::R, K::T, K::Y, K::U, K::I, K::O, K::P],
        [K::A, K::S, K::D, K::F, K::G, K::H, K::J, K::K, K::L, K::Enter],
        [K::CapsShift, K::Z, K::X, K::C, K::V, K::B, K::N, K::M, K::SymbolShift, K::Space],
    ]
};

/// Horizontal offset of each physical row, in key steps.
const STAGGER: [f64; 4] = [0.0, 0.5, 0.75, 0.0];

/// Shorter labels for the few keys whose names do not fit.
fn short_label(key: InputKey) -> &'static str {
    match key {
        InputKey::CapsShift => "CAPS",
        InputKey::SymbolShift => "SYM",
        InputKey::Enter => "ENT",
        InputKey::Space => "SPC",
        other => other.display_name(),
    }
}

fn key_class(key: InputKey) -> &'static str {
    if key.is_modifier() {
        "key modifier"
    } else {
        "key"
    }
}

fn render_key(svg: &mut String, x: f64, y: f64, key: InputKey, note: &str) {
    let label = short_label(key);
    let font_class = if label.len() > 3 { " small" } else { "" };
    svg.push_str(&format!(
        r#"<rect x="{x}" y="{y}" width="{U}" height="{U}" rx="{R}" class="{}"/>"#,
        key_class(key),
    ));
    svg.push_str(&format!(
        r#"<text x="{}" y="{}" class="label{font_class}">{}</text>"#,
        x + U / 2.0,
        y + U / 2.0 - 4.0,
        html_escape(label),
    ));
    svg.push_str(&format!(
        r#"<text x="{}" y="{}" class="note">{}</text>"#,
        x + U / 2.0,
        y + U - 8.0,
        html_escape(note),
    ));
}

/// The keyboard as seen from above. Each key is annotated with its matrix cell.
fn render_physical(y_offset: f64) -> String {
    let mut svg = format!(r#"<g transform="translate({MARGIN}, {y_offset})">"#);
    svg.push_str(r#"<text x="0" y="-10" class="panel-title">Keyboard</text>"#);

    for (row, keys) in PHYSICAL.iter().enumerate() {
        for (i, &key) in keys.iter().enumerate() {
            let x = (i as f64 + STAGGER[row]) * S;
            let y = row as f64 * S;
            let note = match position(key) {
                Some((r, c)) => format!("r{r} c{c}"),
                None => String::new(),
            };
            render_key(&mut svg, x, y, key, &note);
        }
    }

    svg.push_str("</g>");
    svg
}

/// The matrix as wired: rows down, columns across, pins in the margins.
fn render_matrix(config: &MembraneConfig, y_offset: f64) -> String {
    let mut svg = format!(r#"<g transform="translate({MARGIN}, {y_offset})">"#);
    svg.push_str(r#"<text x="0" y="-10" class="panel-title">Matrix</text>"#);

    let left = 1.5 * S;
    for (col, pin) in config.col_pins.iter().enumerate() {
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" class="pin">col {col} / GPIO {pin}</text>"#,
            left + col as f64 * S + U / 2.0,
            10.0,
        ));
    }

    for (row, pin) in config.row_pins.iter().enumerate() {
        let y = 24.0 + row as f64 * S;
        svg.push_str(&format!(
            r#"<text x="0" y="{}" class="pin row">row {row} / GPIO {pin}</text>"#,
            y + U / 2.0,
        ));
        for col in 0..COLS {
            let key = lookup(row, col);
            let note = if is_modifier_cell(row, col) {
                "scanned first"
            } else {
                ""
            };
            render_key(&mut svg, left + col as f64 * S, y, key, note);
        }
    }

    svg.push_str("</g>");
    svg
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Generate the complete HTML document with inline SVG.
pub fn generate_html(config: &MembraneConfig) -> String {
    let physical_h = PHYSICAL.len() as f64 * S;
    let matrix_h = 24.0 + ROWS as f64 * S;
    let total_width = (10.0 + STAGGER[2]) * S + 2.0 * MARGIN;
    let total_height = physical_h + matrix_h + 2.0 * TITLE + 2.0 * MARGIN;

    let mut html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>ZX Spectrum Membrane</title>
<style>
  body {{
    background: #1a1a1a;
    color: #eee;
    font-family: system-ui, -apple-system, sans-serif;
    display: flex;
    justify-content: center;
    padding: 2em;
  }}
  svg {{
    filter: drop-shadow(0 2px 8px rgba(0,0,0,0.3));
  }}
  .key {{
    fill: #2b2b2b;
    stroke: #555;
    stroke-width: 1.5;
  }}
  .key:hover {{
    fill: #3a3a3a;
    stroke: #d8232a;
  }}
  .key.modifier {{
    fill: #2b2b2b;
    stroke: #f6d20b;
    stroke-width: 2;
  }}
  .label {{
    fill: #eee;
    font-family: "JetBrains Mono", "Fira Code", monospace;
    font-size: 13px;
    text-anchor: middle;
    dominant-baseline: middle;
    pointer-events: none;
  }}
  .label.small {{
    font-size: 10px;
  }}
  .note {{
    fill: #8a8a8a;
    font-size: 8px;
    text-anchor: middle;
    pointer-events: none;
  }}
  .pin {{
    fill: #6cb4e4;
    font-size: 9px;
    text-anchor: middle;
  }}
  .pin.row {{
    text-anchor: start;
    dominant-baseline: middle;
  }}
  .panel-title {{
    fill: #d8232a;
    font-size: 16px;
    font-weight: bold;
  }}
</style>
</head>
<body>
<svg width="{total_width}" height="{total_height}" xmlns="http://www.w3.org/2000/svg">
"#
    );

    html.push_str(&render_physical(MARGIN + TITLE));
    html.push('\n');
    html.push_str(&render_matrix(config, MARGIN + 2.0 * TITLE + physical_h));
    html.push('\n');

    html.push_str("</svg>\n</body>\n</html>\n");
    html
}
