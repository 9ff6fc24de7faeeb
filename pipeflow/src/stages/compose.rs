//! Composable stage values.
//!
//! The free functions in this module's parent spawn a stage immediately.
//! The types here describe a stage without running it, so pipelines can be
//! assembled first and attached to an input later:
//!
//! ```rust,ignore
//! let pipeline = compose!(
//!     MapStage::new(|v: i32| v * 2),
//!     MapStage::new(|v: i32| v + 1),
//!     MapStage::new(|v: i32| v * 2),
//! );
//! let out = pipeline.attach(&ctx, generate(&ctx, vec![1, 2, 3, 4])?)?;
//! ```

use super::{filter, map, take, try_map, StageContext};
use crate::errors::Result;
use crate::sequence::Sequence;

/// A stage that can be attached to an input sequence.
pub trait Stage<In>: Send {
    /// The type of values this stage produces.
    type Out;

    /// Spawns the stage on `input`, returning its output sequence.
    fn attach(self, ctx: &StageContext, input: Sequence<In>) -> Result<Sequence<Self::Out>>;

    /// Chains `next` after this stage.
    fn then<S>(self, next: S) -> Chain<Self, S>
    where
        Self: Sized,
        S: Stage<Self::Out>,
    {
        Chain { first: self, second: next }
    }
}

/// Two stages run back to back.
#[derive(Debug, Clone)]
pub struct Chain<A, B> {
    first: A,
    second: B,
}

impl<In, A, B> Stage<In> for Chain<A, B>
where
    A: Stage<In>,
    B: Stage<A::Out>,
{
    type Out = B::Out;

    fn attach(self, ctx: &StageContext, input: Sequence<In>) -> Result<Sequence<Self::Out>> {
        let middle = self.first.attach(ctx, input)?;
        self.second.attach(ctx, middle)
    }
}

/// Chains any number of stages left to right.
#[macro_export]
macro_rules! compose {
    ($stage:expr $(,)?) => {
        $stage
    };
    ($first:expr, $($rest:expr),+ $(,)?) => {
        $crate::stages::Stage::then($first, $crate::compose!($($rest),+))
    };
}

/// A [`map`] stage.
#[derive(Debug, Clone)]
pub struct MapStage<F>(F);

impl<F> MapStage<F> {
    /// Wraps a transform function.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<T, U, F> Stage<T> for MapStage<F>
where
    T: Send + 'static,
    U: Send + 'static,
    F: FnMut(T) -> U + Send + 'static,
{
    type Out = U;

    fn attach(self, ctx: &StageContext, input: Sequence<T>) -> Result<Sequence<U>> {
        map(ctx, input, self.0)
    }
}

/// A [`try_map`] stage.
#[derive(Debug, Clone)]
pub struct TryMapStage<F>(F);

impl<F> TryMapStage<F> {
    /// Wraps a fallible transform function.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<T, U, E, F> Stage<T> for TryMapStage<F>
where
    T: Send + 'static,
    U: Send + 'static,
    E: std::fmt::Display + Send + 'static,
    F: FnMut(T) -> std::result::Result<U, E> + Send + 'static,
{
    type Out = std::result::Result<U, E>;

    fn attach(self, ctx: &StageContext, input: Sequence<T>) -> Result<Sequence<Self::Out>> {
        try_map(ctx, input, self.0)
    }
}

/// A [`filter`] stage.
#[derive(Debug, Clone)]
pub struct FilterStage<F>(F);

impl<F> FilterStage<F> {
    /// Wraps a predicate.
    pub fn new(predicate: F) -> Self {
        Self(predicate)
    }
}

impl<T, F> Stage<T> for FilterStage<F>
where
    T: Send + 'static,
    F: FnMut(&T) -> bool + Send + 'static,
{
    type Out = T;

    fn attach(self, ctx: &StageContext, input: Sequence<T>) -> Result<Sequence<T>> {
        filter(ctx, input, self.0)
    }
}

/// A [`take`] stage.
#[derive(Debug, Clone, Copy)]
pub struct TakeStage(usize);

impl TakeStage {
    /// Takes the first `count` values.
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self(count)
    }
}

impl<T: Send + 'static> Stage<T> for TakeStage {
    type Out = T;

    fn attach(self, ctx: &StageContext, input: Sequence<T>) -> Result<Sequence<T>> {
        take(ctx, input, self.0)
    }
}
