use bytemuck::Pod;
use std::marker::PhantomData;

/// One step of a record pipeline: consumes `In`, pushes zero or more `Out`.
pub trait Stage<In: Pod + Send, Out: Pod + Send> {
    fn process<C>(&mut self, data: &In, collector: &mut C)
    where
        C: OutputCollector<Out>;
}

pub trait OutputCollector<T> {
    fn push(&mut self, item: &T);
}

impl<T, F> OutputCollector<T> for F
where
    F: FnMut(&T),
{
    #[inline(always)]
    fn push(&mut self, item: &T) {
        (self)(item);
    }
}

/// Closures returning `Option` act as filter/map stages.
impl<F, In, Out> Stage<In, Out> for F
where
    F: FnMut(&In) -> Option<Out>,
    In: Pod + Send,
    Out: Pod + Send,
{
    #[inline(always)]
    fn process<C>(&mut self, data: &In, collector: &mut C)
    where
        C: OutputCollector<Out>,
    {
        if let Some(out) = (self)(data) {
            collector.push(&out);
        }
    }
}

pub struct Pipeline<S1, S2, In, Mid, Out> {
    s1: S1,
    s2: S2,
    _phantom: PhantomData<(In, Mid, Out)>,
}

impl<S1, S2, In, Mid, Out> Pipeline<S1, S2, In, Mid, Out> {
    /// Downstream stage, e.g. to flush a stateful tail after the input ends.
    pub fn second(&mut self) -> &mut S2 {
        &mut self.s2
    }
}

impl<In, Mid, Out, S1, S2> Stage<In, Out> for Pipeline<S1, S2, In, Mid, Out>
where
    In: Pod + Send,
    Mid: Pod + Send,
    Out: Pod + Send,
    S1: Stage<In, Mid>,
    S2: Stage<Mid, Out>,
{
    #[inline(always)]
    fn process<C>(&mut self, data: &In, collector: &mut C)
    where
        C: OutputCollector<Out>,
    {
        let s2 = &mut self.s2;
        self.s1.process(data, &mut |mid: &Mid| {
            s2.process(mid, collector);
        });
    }
}

pub trait StageExt<In: Pod + Send, Mid: Pod + Send>: Stage<In, Mid> {
    #[inline(always)]
    fn pipe<Out: Pod + Send, S2: Stage<Mid, Out>>(self, s2: S2) -> Pipeline<Self, S2, In, Mid, Out>
    where
        Self: Sized,
    {
        Pipeline {
            s1: self,
            s2,
            _phantom: PhantomData,
        }
    }
}

impl<S, In, Mid> StageExt<In, Mid> for S
where
    In: Pod + Send,
    Mid: Pod + Send,
    S: Stage<In, Mid>,
{
}

#[macro_export]
macro_rules! pipe {
    ($s1:expr) => { $s1 };
    ($s1:expr, $($rest:expr),+ $(,)?) => {
        {
            use $crate::StageExt;
            $s1.pipe($crate::pipe!($($rest),+))
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Field, HistoryLog};
    use crate::timed::TimedLog;

    #[test]
    fn test_pipe_closures() {
        let mut p = pipe![
            |t: &TimedLog| t.log.is_present(Field::Temperature).then_some(*t),
            |t: &TimedLog| Some(t.timestamp_nanos),
        ];

        let with_temp = TimedLog::new(7, HistoryLog::empty().with_float(Field::Temperature, 1.0));
        let without = TimedLog::new(8, HistoryLog::empty());

        let mut out = Vec::new();
        p.process(&with_temp, &mut |x: &i64| out.push(*x));
        p.process(&without, &mut |x: &i64| out.push(*x));
        assert_eq!(out, vec![7]);
    }

    #[test]
    fn test_pipe_one_to_many() {
        struct Duplicate;
        impl Stage<i64, i64> for Duplicate {
            fn process<C>(&mut self, data: &i64, collector: &mut C)
            where
                C: OutputCollector<i64>,
            {
                collector.push(data);
                collector.push(data);
            }
        }

        let mut p = pipe![|x: &u32| Some(*x as i64), Duplicate, |x: &i64| Some(*x as u8)];

        let mut out = Vec::new();
        p.process(&10u32, &mut |x: &u8| out.push(*x));
        assert_eq!(out, vec![10u8, 10u8]);
    }
}
