// SPDX-License-Identifier: MIT

//! Selector resolution against live field values

use super::types::{KeyFn, Selector, SelectorEntry};
use crate::flow::condition::evaluate;
use crate::flow::state::FieldSource;

/// Where resolution currently stands
enum Cursor<'a, C> {
    Entries(&'a [SelectorEntry<C>]),
    Key(&'a str),
    Function(&'a KeyFn<C>),
    Miss,
}

impl<'a, C> From<&'a Selector<C>> for Cursor<'a, C> {
    fn from(selector: &'a Selector<C>) -> Self {
        match selector {
            Selector::Key(k) => Cursor::Key(k),
            Selector::Function(f) => Cursor::Function(f),
            Selector::Sequence(entries) => Cursor::Entries(entries),
        }
    }
}

/// Resolve a selector to a single key
///
/// Sequences are scanned in order. A bare key or function ends the scan and
/// becomes the result; a matching condition hands over to its `key`, which
/// may itself be a sequence. Entries after the first hit are never looked at.
/// Returns `None` when a sequence runs out without a hit.
pub fn resolve<C, S>(selector: &Selector<C>, source: &S, ctx: &C) -> Option<String>
where
    S: FieldSource + ?Sized,
{
    let mut cursor = Cursor::from(selector);

    while let Cursor::Entries(entries) = cursor {
        cursor = Cursor::Miss;

        for entry in entries {
            match entry {
                SelectorEntry::Key(k) => {
                    cursor = Cursor::Key(k);
                    break;
                }
                SelectorEntry::Function(f) => {
                    cursor = Cursor::Function(f);
                    break;
                }
                SelectorEntry::Condition(condition) => {
                    let current = source.field(&condition.field);
                    if evaluate(condition, current.as_ref(), ctx) {
                        log::debug!("Condition on '{}' matched", condition.field);
                        cursor = condition
                            .outcome
                            .as_ref()
                            .map_or(Cursor::Miss, Cursor::from);
                        break;
                    }
                }
            }
        }
    }

    match cursor {
        Cursor::Key(k) => Some(k.to_string()),
        Cursor::Function(f) => f.call(ctx),
        Cursor::Entries(_) | Cursor::Miss => None,
    }
}
