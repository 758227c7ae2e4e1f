//! A pluggable hook for Lottie's optional JS-like expressions. Expressions
//! override a keyframe-interpolated value at evaluation time; when no
//! evaluator is installed, evaluation falls through to the plain keyframed
//! result, so absence of this module changes nothing.

use crate::geom::Point;

/// What an expression may read about the property it's attached to and the
/// layer/composition around it.
#[derive(Debug, Clone, Copy)]
pub struct ExpressionContext<'a> {
    pub time: f32,
    pub frame: f32,
    pub frame_rate: f32,
    pub layer_name: Option<&'a str>,
}

/// A scalar/vector/color an expression can return, matching the property
/// kinds expressions are allowed to override.
#[derive(Debug, Clone, Copy)]
pub enum ExpressionValue {
    Scalar(f32),
    Vector(Point),
    Color([u8; 4]),
}

/// Implemented by a sandboxed evaluator for the small expression subset this
/// crate supports (`linear`, `ease`, `wiggle`, `loopIn`/`loopOut`,
/// `valueAtTime`, `velocityAtTime`, `clamp`, arithmetic helpers). Absent by
/// default: a composition with expression strings but no installed
/// `Evaluator` simply ignores them.
pub trait Evaluator: std::fmt::Debug {
    fn evaluate(&self, source: &str, ctx: ExpressionContext, current: ExpressionValue) -> Option<ExpressionValue>;
}

/// Evaluates `expr` against `source` if an evaluator is installed, otherwise
/// returns `current` unchanged.
pub fn resolve(
    evaluator: Option<&dyn Evaluator>,
    source: Option<&str>,
    ctx: ExpressionContext,
    current: ExpressionValue,
) -> ExpressionValue {
    match (evaluator, source) {
        (Some(ev), Some(src)) => ev.evaluate(src, ctx, current).unwrap_or(current),
        _ => current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct DoubleEverything;
    impl Evaluator for DoubleEverything {
        fn evaluate(&self, _source: &str, _ctx: ExpressionContext, current: ExpressionValue) -> Option<ExpressionValue> {
            match current {
                ExpressionValue::Scalar(v) => Some(ExpressionValue::Scalar(v * 2.0)),
                other => Some(other),
            }
        }
    }

    #[test]
    fn absent_evaluator_passes_value_through() {
        let ctx = ExpressionContext { time: 0.0, frame: 0.0, frame_rate: 30.0, layer_name: None };
        let out = resolve(None, Some("value*2"), ctx, ExpressionValue::Scalar(5.0));
        assert!(matches!(out, ExpressionValue::Scalar(v) if v == 5.0));
    }

    #[test]
    fn installed_evaluator_overrides_value() {
        let ctx = ExpressionContext { time: 0.0, frame: 0.0, frame_rate: 30.0, layer_name: None };
        let out = resolve(Some(&DoubleEverything), Some("value*2"), ctx, ExpressionValue::Scalar(5.0));
        assert!(matches!(out, ExpressionValue::Scalar(v) if v == 10.0));
    }
}
