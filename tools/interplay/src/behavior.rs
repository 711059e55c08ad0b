//! Stubbed collaborator that answers invocations from matcher-based reactions.
//!
//! Every invocation is recorded before it is answered, so a [`Behavior`] can
//! take part in pattern verification through [`Behavior::recorder`]. An
//! invocation no reaction matches fails immediately with
//! [`BehaviorError::UnexpectedInteraction`].

use crate::errors::BehaviorError;
use crate::matcher::{IntoMatcher, Matcher};
use crate::recorder::Recorder;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReactionHandle(u64);

struct Reaction<V, R> {
    handle: ReactionHandle,
    matcher: Matcher<V>,
    handler: Arc<dyn Fn(&V) -> R + Send + Sync>,
}

struct Reactions<V, R> {
    next_handle: u64,
    items: Vec<Reaction<V, R>>,
}

pub struct Behavior<V, R> {
    reactions: Mutex<Reactions<V, R>>,
    recorder: Arc<Recorder<V>>,
}

impl<V, R> Behavior<V, R>
where
    V: Debug + Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::with_recorder(Arc::new(Recorder::new()))
    }

    pub fn with_recorder(recorder: Arc<Recorder<V>>) -> Self {
        Self {
            reactions: Mutex::new(Reactions {
                next_handle: 0,
                items: Vec::new(),
            }),
            recorder,
        }
    }

    pub fn recorder(&self) -> &Arc<Recorder<V>> {
        &self.recorder
    }

    /// Answers invocations matching `matcher` with `handler`. Reactions are
    /// tried in the order they were added.
    pub fn on<M, F>(&self, matcher: M, handler: F) -> ReactionHandle
    where
        M: IntoMatcher<Value = V>,
        F: Fn(&V) -> R + Send + Sync + 'static,
    {
        let matcher = matcher.into_matcher();
        let mut reactions = self.reactions.lock().expect("reactions lock");
        reactions.next_handle += 1;
        let handle = ReactionHandle(reactions.next_handle);
        reactions.items.push(Reaction {
            handle,
            matcher,
            handler: Arc::new(handler),
        });
        handle
    }

    pub fn on_return<M>(&self, matcher: M, value: R) -> ReactionHandle
    where
        M: IntoMatcher<Value = V>,
        R: Clone + Send + Sync + 'static,
    {
        self.on(matcher, move |_| value.clone())
    }

    pub fn remove(&self, handle: ReactionHandle) -> bool {
        let mut reactions = self.reactions.lock().expect("reactions lock");
        let before = reactions.items.len();
        reactions.items.retain(|r| r.handle != handle);
        reactions.items.len() != before
    }

    #[track_caller]
    pub fn invoke(&self, value: V) -> Result<R, BehaviorError<V>> {
        self.recorder.record(value.clone());
        // The handler runs outside the lock so it may reconfigure this behavior.
        let handler = self
            .reactions
            .lock()
            .expect("reactions lock")
            .items
            .iter()
            .find(|r| r.matcher.matches(&value))
            .map(|r| Arc::clone(&r.handler));
        match handler {
            Some(handler) => Ok(handler(&value)),
            None => Err(BehaviorError::UnexpectedInteraction(value)),
        }
    }
}

impl<V, R> Default for Behavior<V, R>
where
    V: Debug + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
