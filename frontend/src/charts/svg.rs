//! Serializes a [`Frame`] to SVG markup.

use std::f64::consts::{PI, TAU};

use crate::charts::{Frame, Primitive};

const XML_PROLOG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const SVG_NS: &str = "http://www.w3.org/2000/svg";

pub fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Two decimals at most, without trailing zeros
fn num(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let fixed = format!("{:.2}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

fn polar(cx: f64, cy: f64, radius: f64, angle: f64) -> (String, String) {
    (num(cx + radius * angle.cos()), num(cy + radius * angle.sin()))
}

/// Path data for an annular sector; empty when the sweep is zero
pub fn sector_path(cx: f64, cy: f64, inner_radius: f64, outer_radius: f64, start: f64, end: f64) -> String {
    let sweep = (end - start).clamp(0.0, TAU);
    if sweep <= 0.0 || outer_radius <= 0.0 {
        return String::new();
    }

    if sweep >= TAU - 1e-6 {
        // a single arc cannot close on itself; draw two halves
        let ring = |r: f64, clockwise: u8| {
            format!(
                "M {} {} A {r} {r} 0 1 {cw} {} {} A {r} {r} 0 1 {cw} {} {} Z",
                num(cx + r),
                num(cy),
                num(cx - r),
                num(cy),
                num(cx + r),
                num(cy),
                r = num(r),
                cw = clockwise,
            )
        };
        let mut path = ring(outer_radius, 1);
        if inner_radius > 0.0 {
            path.push(' ');
            path.push_str(&ring(inner_radius, 0));
        }
        return path;
    }

    let large_arc = u8::from(sweep > PI);
    let (x0, y0) = polar(cx, cy, outer_radius, start);
    let (x1, y1) = polar(cx, cy, outer_radius, end);
    let r = num(outer_radius);

    if inner_radius > 0.0 {
        let (ix1, iy1) = polar(cx, cy, inner_radius, end);
        let (ix0, iy0) = polar(cx, cy, inner_radius, start);
        let ir = num(inner_radius);
        format!(
            "M {x0} {y0} A {r} {r} 0 {large_arc} 1 {x1} {y1} L {ix1} {iy1} A {ir} {ir} 0 {large_arc} 0 {ix0} {iy0} Z"
        )
    } else {
        format!(
            "M {} {} L {x0} {y0} A {r} {r} 0 {large_arc} 1 {x1} {y1} Z",
            num(cx),
            num(cy)
        )
    }
}

fn render_primitive(primitive: &Primitive, out: &mut String) {
    match primitive {
        Primitive::Rect {
            x,
            y,
            width,
            height,
            fill,
            class,
        } => out.push_str(&format!(
            r#"<rect class="{}" x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
            class,
            num(*x),
            num(*y),
            num(*width),
            num(*height),
            escape_xml(fill)
        )),
        Primitive::Sector {
            cx,
            cy,
            inner_radius,
            outer_radius,
            start_angle,
            end_angle,
            fill,
            key,
        } => {
            let d = sector_path(*cx, *cy, *inner_radius, *outer_radius, *start_angle, *end_angle);
            if !d.is_empty() {
                out.push_str(&format!(
                    r#"<path class="slice" data-key="{}" d="{}" fill="{}" fill-rule="evenodd"/>"#,
                    escape_xml(key),
                    d,
                    escape_xml(fill)
                ));
            }
        }
        Primitive::Polyline {
            points,
            stroke,
            stroke_width,
            key,
        } => {
            let points = points
                .iter()
                .map(|(x, y)| format!("{},{}", num(*x), num(*y)))
                .collect::<Vec<_>>()
                .join(" ");
            out.push_str(&format!(
                r#"<polyline class="series" data-key="{}" points="{}" fill="none" stroke="{}" stroke-width="{}"/>"#,
                escape_xml(key),
                points,
                escape_xml(stroke),
                num(*stroke_width)
            ));
        }
        Primitive::Line {
            x1,
            y1,
            x2,
            y2,
            stroke,
            dashed,
            class,
        } => {
            let dash = if *dashed { r#" stroke-dasharray="4 4""# } else { "" };
            out.push_str(&format!(
                r#"<line class="{}" x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}"{}/>"#,
                class,
                num(*x1),
                num(*y1),
                num(*x2),
                num(*y2),
                escape_xml(stroke),
                dash
            ));
        }
        Primitive::Circle { cx, cy, r, fill } => out.push_str(&format!(
            r#"<circle cx="{}" cy="{}" r="{}" fill="{}"/>"#,
            num(*cx),
            num(*cy),
            num(*r),
            escape_xml(fill)
        )),
        Primitive::Text {
            x,
            y,
            content,
            anchor,
            class,
        } => out.push_str(&format!(
            r#"<text class="{}" x="{}" y="{}" text-anchor="{}">{}</text>"#,
            class,
            num(*x),
            num(*y),
            anchor.as_str(),
            escape_xml(content)
        )),
    }
}

/// Inline `<svg>` element for embedding in the page
pub fn render_svg(frame: &Frame, title: Option<&str>) -> String {
    let mut out = format!(
        r#"<svg xmlns="{}" width="{}" height="{}" viewBox="0 0 {} {}">"#,
        SVG_NS,
        num(frame.width),
        num(frame.height),
        num(frame.width),
        num(frame.height)
    );
    if let Some(title) = title {
        out.push_str(&format!("<title>{}</title>", escape_xml(title)));
    }
    for primitive in &frame.primitives {
        render_primitive(primitive, &mut out);
    }
    out.push_str("</svg>");
    out
}

/// Standalone SVG file contents
pub fn render_document(frame: &Frame, title: Option<&str>) -> String {
    format!("{}\n{}", XML_PROLOG, render_svg(frame, title))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::TextAnchor;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn frame(primitives: Vec<Primitive>) -> Frame {
        Frame {
            width: 100.0,
            height: 50.0,
            primitives,
        }
    }

    #[test_case(1.0, "1")]
    #[test_case(1.5, "1.5")]
    #[test_case(1.256, "1.26")]
    #[test_case(-0.001, "0")]
    #[test_case(f64::NAN, "0")]
    fn test_num(value: f64, expected: &str) {
        assert_eq!(num(value), expected);
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml(r#"<a & "b">'"#), "&lt;a &amp; &quot;b&quot;&gt;&#39;");
    }

    #[test]
    fn test_document_has_prolog_and_escaped_text() {
        let doc = render_document(
            &frame(vec![Primitive::Text {
                x: 10.0,
                y: 20.0,
                content: "Wins <today>".to_string(),
                anchor: TextAnchor::Middle,
                class: "x-label",
            }]),
            Some("Usage & wins"),
        );
        assert!(doc.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<svg "));
        assert!(doc.contains("<title>Usage &amp; wins</title>"));
        assert!(doc.contains(
            r#"<text class="x-label" x="10" y="20" text-anchor="middle">Wins &lt;today&gt;</text>"#
        ));
        assert!(doc.ends_with("</svg>"));
    }

    #[test]
    fn test_polyline_and_dashed_line() {
        let svg = render_svg(
            &frame(vec![
                Primitive::Polyline {
                    points: vec![(0.0, 10.0), (50.5, 0.25)],
                    stroke: "#3B82F6".to_string(),
                    stroke_width: 2.0,
                    key: "k1".to_string(),
                },
                Primitive::Line {
                    x1: 0.0,
                    y1: 5.0,
                    x2: 100.0,
                    y2: 5.0,
                    stroke: "#E5E7EB".to_string(),
                    dashed: true,
                    class: "grid-line",
                },
            ]),
            None,
        );
        assert!(svg.contains(r#"points="0,10 50.5,0.25""#));
        assert!(svg.contains(r#"stroke-dasharray="4 4""#));
        assert!(!svg.contains("<title>"));
    }

    #[test]
    fn test_sector_paths() {
        assert_eq!(sector_path(50.0, 50.0, 0.0, 10.0, 0.0, 0.0), "");
        assert_eq!(
            sector_path(50.0, 50.0, 0.0, 10.0, 0.0, PI / 2.0),
            "M 50 50 L 60 50 A 10 10 0 0 1 50 60 Z"
        );
        let donut = sector_path(50.0, 50.0, 5.0, 10.0, 0.0, PI / 2.0);
        assert_eq!(donut, "M 60 50 A 10 10 0 0 1 50 60 L 50 55 A 5 5 0 0 0 55 50 Z");

        let full = sector_path(50.0, 50.0, 0.0, 10.0, 0.0, TAU);
        assert_eq!(full, "M 60 50 A 10 10 0 1 1 40 50 A 10 10 0 1 1 60 50 Z");
    }
}
