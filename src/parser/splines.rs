//! FontForge `SplineSet` outlines.
//!
//! A spline set is a list of segment lines, each holding one, or for curves
//! three, coordinate pairs followed by a one-letter segment type and a point
//! flags word. Contours arrive here as raw segments and are turned into
//! point lists in a second pass, once the owning layer tells us whether the
//! outlines are cubic or quadratic.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::SfdError;
use crate::glyph::Glyph;
use crate::shape::NodeType;

use super::{section, utf7};

static SEGMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // Safe because the regex is valid
    Regex::new(r"\s([lmc])\s").unwrap()
});

const FORCE_OPEN: u32 = 0x400;
const INTERPOLATE: u32 = 0x80;

/// One segment line, split into its coordinate pairs, type letter and flags.
pub(super) struct RawSegment {
    pub(super) points: Vec<(f64, f64)>,
    pub(super) kind: char,
    flags: String,
    text: String,
}

/// A contour as written in the file, before point types are resolved.
pub(super) struct RawContour {
    pub(super) segments: Vec<RawSegment>,
    pub(super) name: Option<String>,
}

fn malformed(text: &str) -> SfdError {
    SfdError::MalformedRecord {
        key: "SplineSet".to_string(),
        text: text.to_string(),
    }
}

fn parse_segment(line: &str) -> Result<RawSegment, SfdError> {
    let mut matches = SEGMENT_RE.captures_iter(line);
    let caps = match (matches.next(), matches.next()) {
        (Some(caps), None) => caps,
        _ => return Err(malformed(line)),
    };
    let splitter = caps.get(0).ok_or_else(|| malformed(line))?;
    let kind = caps
        .get(1)
        .and_then(|m| m.as_str().chars().next())
        .ok_or_else(|| malformed(line))?;
    let mut coordinates = Vec::new();
    for token in line[..splitter.start()].split_whitespace() {
        let value = token.parse::<f64>().map_err(|_| malformed(line))?;
        coordinates.push(value);
    }
    if coordinates.is_empty() || coordinates.len() % 2 != 0 {
        return Err(malformed(line));
    }
    Ok(RawSegment {
        points: coordinates.chunks_exact(2).map(|c| (c[0], c[1])).collect(),
        kind,
        flags: line[splitter.end()..].trim().to_string(),
        text: line.to_string(),
    })
}

/// Collects the contours of one spline set. Embedded `Spiro` sections
/// duplicate the spline data and are dropped; a trailing `Named` line
/// attaches a name to the contour it follows.
pub(super) fn parse_spline_set(data: &[String]) -> Result<Vec<RawContour>, SfdError> {
    let mut contours: Vec<RawContour> = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let line = data[i].as_str();
        i += 1;
        if line == "Spiro" {
            let (_, next) = section(data, i, "EndSpiro", None)?;
            i = next;
            continue;
        }
        if line.starts_with("Named") {
            let name = match line.split_once(": ") {
                Some((_, name)) => utf7::decode_utf7(name),
                None => return Err(malformed(line)),
            };
            match contours.last_mut() {
                Some(contour) => contour.name = Some(name),
                None => return Err(malformed(line)),
            }
            continue;
        }
        let segment = parse_segment(line)?;
        let wanted = if segment.kind == 'c' { 3 } else { 1 };
        if segment.points.len() != wanted {
            return Err(malformed(line));
        }
        if segment.kind == 'm' {
            contours.push(RawContour {
                segments: vec![segment],
                name: None,
            });
        } else {
            match contours.last_mut() {
                Some(contour) => contour.segments.push(segment),
                None => return Err(malformed(line)),
            }
        }
    }
    Ok(contours)
}

fn flag_bits(segment: &RawSegment) -> Result<u32, SfdError> {
    let head = match segment.flags.split_once(',') {
        Some((head, _)) => head,
        None => segment.flags.as_str(),
    };
    let head = match head.split_once('x') {
        Some((head, _)) => head,
        None => head,
    };
    head.parse().map_err(|_| malformed(&segment.text))
}

/// Resolves raw contours into glyph outlines through the point pen.
///
/// A contour whose last point coincides with its first is closed by
/// replacing the initial move with the final point, unless any of its
/// segments carries the force-open flag. Quadratic curve segments repeat
/// their incoming point and may be flagged as interpolated, in which case
/// every remaining point is an off-curve and the on-curve points are
/// implied.
pub(super) fn draw_contours(
    glyph: &mut Glyph,
    contours: Vec<RawContour>,
    quadratic: bool,
) -> Result<(), SfdError> {
    let mut pen = glyph.point_pen();
    for contour in contours {
        let mut force_open = false;
        let mut nodes: Vec<(f64, f64, NodeType, bool)> = Vec::new();
        for segment in contour.segments {
            let flag = flag_bits(&segment)?;
            if flag & FORCE_OPEN != 0 {
                force_open = true;
            }
            let smooth = (flag & 0x3) != 1;
            let mut points = segment.points;
            match segment.kind {
                'm' => nodes.push((points[0].0, points[0].1, NodeType::Move, smooth)),
                'l' => nodes.push((points[0].0, points[0].1, NodeType::Line, smooth)),
                _ => {
                    if quadratic {
                        if points[0] != points[1] {
                            return Err(malformed(&segment.text));
                        }
                        points.remove(0);
                        if flag & INTERPOLATE != 0 {
                            for (x, y) in points {
                                nodes.push((x, y, NodeType::OffCurve, false));
                            }
                            continue;
                        }
                    }
                    let curve = if quadratic {
                        NodeType::QCurve
                    } else {
                        NodeType::Curve
                    };
                    let last = points.len() - 1;
                    for (x, y) in &points[..last] {
                        nodes.push((*x, *y, NodeType::OffCurve, false));
                    }
                    nodes.push((points[last].0, points[last].1, curve, smooth));
                }
            }
        }
        if !force_open && nodes.len() > 1 {
            let first = nodes[0];
            let last = nodes[nodes.len() - 1];
            if (first.0, first.1) == (last.0, last.1) {
                nodes[0] = last;
                nodes.pop();
            }
        }
        pen.begin_path();
        for (x, y, nodetype, smooth) in nodes {
            pen.add_point(x, y, nodetype, smooth);
        }
        pen.end_path();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn lines(text: &[&str]) -> Vec<String> {
        text.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn closed_square_collapses_wraparound_point() {
        let data = lines(&[
            "100 100 m 1",
            " 100 300 l 1",
            " 300 300 l 1",
            " 300 100 l 1",
            " 100 100 l 1",
        ]);
        let contours = parse_spline_set(&data).unwrap();
        let mut glyph = Glyph::new("square");
        draw_contours(&mut glyph, contours, false).unwrap();
        assert_eq!(glyph.contours.len(), 1);
        let contour = &glyph.contours[0];
        assert!(contour.closed);
        assert_eq!(contour.nodes.len(), 4);
        assert_eq!(contour.nodes[0].nodetype, NodeType::Line);
        assert_eq!((contour.nodes[0].x, contour.nodes[0].y), (100.0, 100.0));
    }

    #[test]
    fn force_open_flag_keeps_coincident_endpoints() {
        let data = lines(&[
            "100 100 m 1025",
            " 100 300 l 1",
            " 300 300 l 1",
            " 100 100 l 1",
        ]);
        let contours = parse_spline_set(&data).unwrap();
        let mut glyph = Glyph::new("angle");
        draw_contours(&mut glyph, contours, false).unwrap();
        let contour = &glyph.contours[0];
        assert!(!contour.closed);
        assert_eq!(contour.nodes.len(), 4);
        assert_eq!(contour.nodes[0].nodetype, NodeType::Move);
    }

    #[test]
    fn cubic_contour_rounds_trip_through_pen() {
        let data = lines(&[
            "0 0 m 1",
            " 0 100 100 100 100 0 c 1",
            " 100 -100 0 -100 0 0 c 1",
        ]);
        let contours = parse_spline_set(&data).unwrap();
        let mut glyph = Glyph::new("blob");
        draw_contours(&mut glyph, contours, false).unwrap();
        let contour = &glyph.contours[0];
        assert!(contour.closed);
        assert_eq!(contour.nodes.len(), 6);
        assert_eq!(contour.nodes[0].nodetype, NodeType::Curve);
        assert_eq!(contour.nodes[1].nodetype, NodeType::OffCurve);
        assert_eq!(contour.nodes[3].nodetype, NodeType::Curve);
    }

    #[test]
    fn quadratic_segments_repeat_their_start() {
        let data = lines(&["0 0 m 1", " 0 0 50 100 100 0 c 1"]);
        let contours = parse_spline_set(&data).unwrap();
        let mut glyph = Glyph::new("quad");
        draw_contours(&mut glyph, contours, true).unwrap();
        let contour = &glyph.contours[0];
        assert!(!contour.closed);
        assert_eq!(contour.nodes.len(), 3);
        assert_eq!(contour.nodes[1].nodetype, NodeType::OffCurve);
        assert_eq!(contour.nodes[2].nodetype, NodeType::QCurve);

        let bad = lines(&["0 0 m 1", " 5 5 50 100 100 0 c 1"]);
        let contours = parse_spline_set(&bad).unwrap();
        let mut glyph = Glyph::new("quad.bad");
        assert!(matches!(
            draw_contours(&mut glyph, contours, true),
            Err(SfdError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn interpolated_quadratic_points_stay_off_curve() {
        let data = lines(&["0 0 m 1", " 50 50 50 50 100 0 c 128"]);
        let contours = parse_spline_set(&data).unwrap();
        let mut glyph = Glyph::new("interp");
        draw_contours(&mut glyph, contours, true).unwrap();
        let contour = &glyph.contours[0];
        assert_eq!(contour.nodes.len(), 3);
        assert_eq!(contour.nodes[1].nodetype, NodeType::OffCurve);
        assert_eq!(contour.nodes[2].nodetype, NodeType::OffCurve);
    }

    #[test]
    fn named_line_labels_the_previous_contour() {
        let data = lines(&["0 0 m 1", " 0 100 l 1", "Named: \"ascender\""]);
        let contours = parse_spline_set(&data).unwrap();
        assert_eq!(contours[0].name.as_deref(), Some("ascender"));
    }

    #[test]
    fn spiro_section_is_dropped_without_losing_lines() {
        let data = lines(&[
            "100 100 m 1",
            "Spiro",
            "100 100 o",
            "EndSpiro",
            " 100 300 l 1",
        ]);
        let contours = parse_spline_set(&data).unwrap();
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].segments.len(), 2);
    }

    #[test]
    fn multiple_segments_on_one_line_rejected() {
        let data = lines(&["0 0 m 1 5 5 l 1"]);
        assert!(matches!(
            parse_spline_set(&data),
            Err(SfdError::MalformedRecord { .. })
        ));
    }
}
