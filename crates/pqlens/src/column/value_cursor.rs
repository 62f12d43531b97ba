use std::sync::Arc;
use std::vec;

use crate::value::{ScalarValue, Value};

/// Result of advancing a [`ValueCursor`].
#[derive(Debug, Clone, PartialEq)]
pub enum ValueNext {
    Value(Value),
    EndOfPage,
}

/// Forward only cursor over the values of a single data page.
///
/// Levels are read in lock step. A level pair whose definition level is below
/// the column maximum is emitted as a null without consuming a decoded value.
#[derive(Debug)]
pub struct ValueCursor {
    values: vec::IntoIter<ScalarValue>,
    repetition_levels: Option<Arc<[i16]>>,
    definition_levels: Option<Arc<[i16]>>,
    max_def_level: i16,
    num_values: usize,
    /// Index of the next level pair.
    idx: usize,
}

impl ValueCursor {
    pub(crate) fn new(
        values: Vec<ScalarValue>,
        repetition_levels: Option<Arc<[i16]>>,
        definition_levels: Option<Arc<[i16]>>,
        max_def_level: i16,
        num_values: usize,
    ) -> Self {
        ValueCursor {
            values: values.into_iter(),
            repetition_levels,
            definition_levels,
            max_def_level,
            num_values,
            idx: 0,
        }
    }

    /// Number of level pairs not yet returned.
    pub fn remaining(&self) -> usize {
        self.num_values - self.idx
    }

    pub fn next_value(&mut self) -> ValueNext {
        if self.idx >= self.num_values {
            return ValueNext::EndOfPage;
        }

        let rep = level_at(&self.repetition_levels, self.idx);
        let def = match &self.definition_levels {
            Some(levels) => levels[self.idx],
            None => self.max_def_level,
        };
        self.idx += 1;

        let value = if def < self.max_def_level {
            None
        } else {
            match self.values.next() {
                Some(v) => Some(v),
                None => {
                    // Level streams and decoded values disagree. The page
                    // checks this before building the cursor, so just stop.
                    self.idx = self.num_values;
                    return ValueNext::EndOfPage;
                }
            }
        };

        ValueNext::Value(Value {
            value,
            repetition_level: rep,
            definition_level: def,
        })
    }
}

fn level_at(levels: &Option<Arc<[i16]>>, idx: usize) -> i16 {
    levels.as_ref().map(|l| l[idx]).unwrap_or(0)
}

impl Iterator for ValueCursor {
    type Item = Value;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_value() {
            ValueNext::Value(v) => Some(v),
            ValueNext::EndOfPage => None,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining()))
    }
}
