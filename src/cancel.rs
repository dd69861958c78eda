// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use crate::error::{Error, Result};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cooperative cancellation token
///
/// Clones share the same flag, so a token handed to a background download can
/// be cancelled from the thread that started it. Nothing is interrupted
/// mid-step: operations poll the token between I/O steps.
#[derive(Clone, Debug, Default)]
pub struct Cancellable(Arc<AtomicBool>);

impl Cancellable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Fails with `Error::Cancelled` if a token is given and was cancelled
    pub fn check(token: Option<&Cancellable>) -> Result<()> {
        match token {
            Some(token) if token.is_cancelled() => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::Cancellable;
    use crate::error::Error;

    #[test]
    fn clones_share_state() {
        let token = Cancellable::new();
        let other = token.clone();
        assert!(Cancellable::check(Some(&other)).is_ok());
        assert!(Cancellable::check(None).is_ok());

        token.cancel();
        assert!(other.is_cancelled());
        assert!(matches!(
            Cancellable::check(Some(&other)),
            Err(Error::Cancelled)
        ));
    }
}
