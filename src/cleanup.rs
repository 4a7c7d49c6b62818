// src/cleanup.rs

use crate::error::{Error, Result};
use tracing::debug;

type Action<'a> = Box<dyn FnOnce() -> Result<()> + 'a>;

/// Ordered best-effort cleanup. Every step runs even when an earlier one
/// failed; the first error is returned once all of them have been attempted.
#[derive(Default)]
pub struct CleanupCascade<'a> {
    steps: Vec<(&'static str, Action<'a>)>,
}

impl<'a> CleanupCascade<'a> {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn step<F>(mut self, name: &'static str, action: F) -> Self
    where
        F: FnOnce() -> Result<()> + 'a,
    {
        self.steps.push((name, Box::new(action)));
        self
    }

    pub fn run(self) -> Result<()> {
        let mut first: Option<Error> = None;
        for (name, action) in self.steps {
            if let Err(e) = action() {
                debug!("Cleanup step '{}' failed: {}", name, e);
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn every_step_runs_and_first_error_wins() {
        let log = RefCell::new(Vec::new());

        let result = CleanupCascade::new()
            .step("one", || {
                log.borrow_mut().push(1);
                Err(Error::visitor("first"))
            })
            .step("two", || {
                log.borrow_mut().push(2);
                Ok(())
            })
            .step("three", || {
                log.borrow_mut().push(3);
                Err(Error::visitor("third"))
            })
            .run();

        assert_eq!(*log.borrow(), vec![1, 2, 3]);
        match result {
            Err(Error::Visitor(msg)) => assert_eq!(msg, "first"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn empty_and_clean_cascades_succeed() {
        assert!(CleanupCascade::new().run().is_ok());
        assert!(CleanupCascade::new().step("noop", || Ok(())).run().is_ok());
    }
}
