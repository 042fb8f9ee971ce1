pub mod expression_evaluator;
pub mod traits;

pub use expression_evaluator::ExpressionEvaluator;
pub use traits::ExpressionContext;
