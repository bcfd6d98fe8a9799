//! Recording drawing context handed to corner repaints.
//!
//! The host owns the real rasterizer; what a repaint produces here is the
//! vector path it would emit, recorded as an inspectable op list.

use crate::color::Rgba;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Over,
    Source,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathOp {
    SetOperator(Operator),
    MoveTo {
        x: f64,
        y: f64,
    },
    /// Circular arc around `(cx, cy)`, angles in radians.
    Arc {
        cx: f64,
        cy: f64,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
    },
    LineTo {
        x: f64,
        y: f64,
    },
    ClosePath,
    Fill(Rgba),
}

#[derive(Debug, Default)]
pub struct Painter {
    ops: Vec<PathOp>,
}

impl Painter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_operator(&mut self, operator: Operator) {
        self.ops.push(PathOp::SetOperator(operator));
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        self.ops.push(PathOp::MoveTo { x, y });
    }

    pub fn arc(&mut self, cx: f64, cy: f64, radius: f64, start_angle: f64, end_angle: f64) {
        self.ops.push(PathOp::Arc {
            cx,
            cy,
            radius,
            start_angle,
            end_angle,
        });
    }

    pub fn line_to(&mut self, x: f64, y: f64) {
        self.ops.push(PathOp::LineTo { x, y });
    }

    pub fn close_path(&mut self) {
        self.ops.push(PathOp::ClosePath);
    }

    pub fn fill(&mut self, color: Rgba) {
        self.ops.push(PathOp::Fill(color));
    }

    pub fn ops(&self) -> &[PathOp] {
        &self.ops
    }

    /// The compositing operator in effect, `Over` until a repaint picks
    /// another one.
    pub fn operator(&self) -> Operator {
        self.ops
            .iter()
            .rev()
            .find_map(|op| match op {
                PathOp::SetOperator(operator) => Some(*operator),
                _ => None,
            })
            .unwrap_or(Operator::Over)
    }

    /// The fill color of the last completed path, if any.
    pub fn fill_color(&self) -> Option<Rgba> {
        self.ops.iter().rev().find_map(|op| match op {
            PathOp::Fill(color) => Some(*color),
            _ => None,
        })
    }

    pub fn arcs(&self) -> impl Iterator<Item = &PathOp> {
        self.ops
            .iter()
            .filter(|op| matches!(op, PathOp::Arc { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_records_ops_in_order() {
        let mut painter = Painter::new();
        painter.set_operator(Operator::Source);
        painter.move_to(0.0, 0.0);
        painter.arc(8.0, 8.0, 8.0, PI, 3.0 * PI / 2.0);
        painter.line_to(8.0, 0.0);
        painter.close_path();
        painter.fill(Rgba::BLACK);

        assert_eq!(painter.ops().len(), 6);
        assert_eq!(painter.ops()[0], PathOp::SetOperator(Operator::Source));
        assert_eq!(painter.fill_color(), Some(Rgba::BLACK));
        assert_eq!(painter.arcs().count(), 1);
    }

    #[test]
    fn test_operator_defaults_to_over() {
        let mut painter = Painter::new();
        assert_eq!(painter.operator(), Operator::Over);

        painter.set_operator(Operator::Source);
        assert_eq!(painter.operator(), Operator::Source);
    }
}
