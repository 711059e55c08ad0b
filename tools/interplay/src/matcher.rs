//! Described predicates over recorded values.
//!
//! A [`Matcher`] pairs a boolean predicate with the text used to render it in
//! failure messages. Literals, tuples of matchers and matchers themselves all
//! convert through [`IntoMatcher`], so `pattern.expect((1, any()), &recorder)`
//! reads the way the interaction was recorded.

use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

pub struct Matcher<V> {
    description: String,
    predicate: Arc<dyn Fn(&V) -> bool + Send + Sync>,
}

impl<V> Matcher<V> {
    pub fn new<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&V) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn matches(&self, value: &V) -> bool {
        (self.predicate)(value)
    }
}

impl<V> Clone for Matcher<V> {
    fn clone(&self) -> Self {
        Self {
            description: self.description.clone(),
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<V> fmt::Display for Matcher<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

impl<V> Debug for Matcher<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Matcher").field(&self.description).finish()
    }
}

/// Conversion into a [`Matcher`].
pub trait IntoMatcher {
    type Value: 'static;

    fn into_matcher(self) -> Matcher<Self::Value>;
}

impl<V: 'static> IntoMatcher for Matcher<V> {
    type Value = V;

    fn into_matcher(self) -> Matcher<V> {
        self
    }
}

/// Matches whatever `predicate` accepts; renders as `<func>`.
pub fn matches<V, F>(predicate: F) -> Matcher<V>
where
    V: 'static,
    F: Fn(&V) -> bool + Send + Sync + 'static,
{
    Matcher::new("<func>", predicate)
}

/// Matches anything; renders as `_`.
pub fn any<V: 'static>() -> Matcher<V> {
    Matcher::new("_", |_: &V| true)
}

pub fn not<M: IntoMatcher>(matcher: M) -> Matcher<M::Value> {
    let inner = matcher.into_matcher();
    Matcher::new(format!("not({inner})"), move |value: &M::Value| {
        !inner.matches(value)
    })
}

pub fn none<T: 'static>() -> Matcher<Option<T>> {
    Matcher::new("None", |value: &Option<T>| value.is_none())
}

pub fn some<M: IntoMatcher>(matcher: M) -> Matcher<Option<M::Value>> {
    let inner = matcher.into_matcher();
    Matcher::new(inner.description().to_string(), move |value: &Option<M::Value>| {
        value.as_ref().is_some_and(|v| inner.matches(v))
    })
}

/// Matches values equal to `expected`; renders as its `Debug` form.
pub fn equals<V>(expected: V) -> Matcher<V>
where
    V: PartialEq + Debug + Send + Sync + 'static,
{
    Matcher::new(format!("{expected:?}"), move |actual: &V| *actual == expected)
}

/// Matches a sequence element by element. Lengths must agree.
pub fn elements<M, I>(items: I) -> Matcher<Vec<M::Value>>
where
    M: IntoMatcher,
    I: IntoIterator<Item = M>,
{
    let matchers = items
        .into_iter()
        .map(IntoMatcher::into_matcher)
        .collect::<Vec<_>>();
    let description = format!(
        "[{}]",
        matchers
            .iter()
            .map(Matcher::description)
            .collect::<Vec<_>>()
            .join(", ")
    );
    Matcher::new(description, move |actual: &Vec<M::Value>| {
        actual.len() == matchers.len()
            && matchers.iter().zip(actual).all(|(m, v)| m.matches(v))
    })
}

/// Matches a map with exactly the given keys whose values match.
pub fn entries<K, M, I>(items: I) -> Matcher<BTreeMap<K, M::Value>>
where
    K: Ord + Debug + Send + Sync + 'static,
    M: IntoMatcher,
    I: IntoIterator<Item = (K, M)>,
{
    let matchers = items
        .into_iter()
        .map(|(key, m)| (key, m.into_matcher()))
        .collect::<BTreeMap<_, _>>();
    let description = format!(
        "{{{}}}",
        matchers
            .iter()
            .map(|(key, m)| format!("{key:?}: {m}"))
            .collect::<Vec<_>>()
            .join(", ")
    );
    Matcher::new(description, move |actual: &BTreeMap<K, M::Value>| {
        actual.len() == matchers.len()
            && matchers
                .iter()
                .all(|(key, m)| actual.get(key).is_some_and(|v| m.matches(v)))
    })
}

macro_rules! literal_matchers {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoMatcher for $ty {
                type Value = $ty;

                fn into_matcher(self) -> Matcher<$ty> {
                    equals(self)
                }
            }
        )*
    };
}

literal_matchers!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char, String,
    &'static str, (),
);

macro_rules! tuple_matchers {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: IntoMatcher),+> IntoMatcher for ($($name,)+) {
            type Value = ($(<$name as IntoMatcher>::Value,)+);

            fn into_matcher(self) -> Matcher<Self::Value> {
                let matchers = ($(self.$idx.into_matcher(),)+);
                let description = format!(
                    "({})",
                    [$(matchers.$idx.description()),+].join(", ")
                );
                Matcher::new(description, move |actual: &Self::Value| {
                    true $(&& matchers.$idx.matches(&actual.$idx))+
                })
            }
        }
    };
}

tuple_matchers!(A: 0, B: 1);
tuple_matchers!(A: 0, B: 1, C: 2);
tuple_matchers!(A: 0, B: 1, C: 2, D: 3);
tuple_matchers!(A: 0, B: 1, C: 2, D: 3, E: 4);
