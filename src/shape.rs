use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::SfdError;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum NodeType {
    Move,
    Line,
    OffCurve,
    Curve,
    QCurve,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub x: f64,
    pub y: f64,
    pub nodetype: NodeType,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub smooth: bool,
}

impl Node {
    pub fn to_kurbo(&self) -> kurbo::Point {
        kurbo::Point::new(self.x, self.y)
    }
}

/// A component reference in a glyph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    /// The referenced glyph name
    pub reference: SmolStr,
    /// The transformation applied to the component
    pub transform: kurbo::Affine,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// A contour in a glyph outline
pub struct Contour {
    /// A list of nodes in the contour
    pub nodes: Vec<Node>,
    /// Whether the contour is closed
    pub closed: bool,
}

impl Contour {
    /// Converts the `Contour` to a [`kurbo::BezPath`].
    // Stolen completely from norad
    pub fn to_kurbo(&self) -> Result<kurbo::BezPath, SfdError> {
        let mut path = kurbo::BezPath::new();
        let mut offs = std::collections::VecDeque::new();
        let rotate = if self.closed {
            self.nodes
                .iter()
                .rev()
                .position(|pt| pt.nodetype != NodeType::OffCurve)
                .map(|idx| self.nodes.len() - 1 - idx)
                .unwrap_or(0)
        } else {
            0
        };
        let mut nodes = self
            .nodes
            .iter()
            .cycle()
            .skip(rotate)
            .take(self.nodes.len());
        // We do this because all kurbo paths (even closed ones)
        // must start with a move_to (otherwise get_segs doesn't work)
        if let Some(start) = nodes.next() {
            path.move_to(start.to_kurbo());
        }
        for pt in nodes {
            let kurbo_point = pt.to_kurbo();
            match pt.nodetype {
                NodeType::Move => path.move_to(kurbo_point),
                NodeType::Line => path.line_to(kurbo_point),
                NodeType::OffCurve => offs.push_back(kurbo_point),
                NodeType::Curve => {
                    match offs.make_contiguous() {
                        [] => return Err(SfdError::BadContour),
                        [p1] => path.quad_to(*p1, kurbo_point),
                        [p1, p2] => path.curve_to(*p1, *p2, kurbo_point),
                        _ => return Err(SfdError::BadContour),
                    };
                    offs.clear();
                }
                NodeType::QCurve => {
                    while let Some(pt) = offs.pop_front() {
                        if let Some(next) = offs.front() {
                            let implied_point = pt.midpoint(*next);
                            path.quad_to(pt, implied_point);
                        } else {
                            path.quad_to(pt, kurbo_point);
                        }
                    }
                    offs.clear();
                }
            }
        }
        if self.closed {
            path.close_path()
        }
        Ok(path)
    }
}

/// A pen which builds contours point by point
///
/// Follows the UFO point-pen convention: a contour whose first point is a
/// `Move` is open, anything else is closed.
///
/// ```rust
/// use sfdlib::{NodeType, PointPen};
/// let mut contours = Vec::new();
/// let mut pen = PointPen::new(&mut contours);
/// pen.begin_path();
/// pen.add_point(0.0, 0.0, NodeType::Line, false);
/// pen.add_point(100.0, 0.0, NodeType::Line, false);
/// pen.add_point(100.0, 100.0, NodeType::Line, false);
/// pen.end_path();
/// assert_eq!(contours.len(), 1);
/// assert!(contours[0].closed);
/// ```
#[derive(Debug)]
pub struct PointPen<'a> {
    contours: &'a mut Vec<Contour>,
    current: Option<Contour>,
}

impl<'a> PointPen<'a> {
    /// Create a new PointPen writing into a contour list
    pub fn new(contours: &'a mut Vec<Contour>) -> Self {
        Self {
            contours,
            current: None,
        }
    }

    /// Start a new contour
    pub fn begin_path(&mut self) {
        self.current = Some(Contour::default());
    }

    /// Add a point to the current contour
    pub fn add_point(&mut self, x: f64, y: f64, nodetype: NodeType, smooth: bool) {
        if self.current.is_none() {
            self.current = Some(Contour::default());
        }
        if let Some(contour) = self.current.as_mut() {
            contour.nodes.push(Node {
                x,
                y,
                nodetype,
                smooth,
            });
        }
    }

    /// Finish the current contour and attach it to the glyph
    pub fn end_path(&mut self) {
        if let Some(mut contour) = self.current.take() {
            if contour.nodes.is_empty() {
                return;
            }
            contour.closed = !matches!(
                contour.nodes.first().map(|n| n.nodetype),
                Some(NodeType::Move)
            );
            self.contours.push(contour);
        }
    }
}
