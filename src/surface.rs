/// Tracks the output target currently bound to a native decoder.
///
/// Rebinding is pushed to the native side only when the target identity
/// changes, including the transition to `None` on teardown.
#[derive(Debug)]
pub struct SurfaceBinding<S> {
    bound: Option<S>,
    native_binds: usize,
}

impl<S> Default for SurfaceBinding<S> {
    fn default() -> Self {
        Self {
            bound: None,
            native_binds: 0,
        }
    }
}

impl<S: Clone + PartialEq> SurfaceBinding<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&S> {
        self.bound.as_ref()
    }

    /// Number of native bind calls issued so far.
    pub fn native_binds(&self) -> usize {
        self.native_binds
    }

    /// Returns `true` when `bind` was invoked.
    pub fn set_target<F>(&mut self, target: Option<S>, bind: F) -> bool
    where
        F: FnOnce(Option<&S>),
    {
        if self.bound == target {
            return false;
        }
        bind(target.as_ref());
        self.bound = target;
        self.native_binds += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_target_twice_binds_once() {
        let mut binding = SurfaceBinding::new();
        let mut calls = Vec::new();
        assert!(binding.set_target(Some(7u32), |t| calls.push(t.copied())));
        assert!(!binding.set_target(Some(7u32), |t| calls.push(t.copied())));
        assert_eq!(calls, vec![Some(7)]);
        assert_eq!(binding.native_binds(), 1);
        assert_eq!(binding.current(), Some(&7));
    }

    #[test]
    fn unbinding_an_unbound_target_is_a_noop() {
        let mut binding = SurfaceBinding::<u32>::new();
        let mut calls = 0;
        assert!(!binding.set_target(None, |_| calls += 1));
        assert_eq!(calls, 0);
    }

    #[test]
    fn switching_and_clearing_targets_reach_native() {
        let mut binding = SurfaceBinding::new();
        let mut calls = Vec::new();
        binding.set_target(Some(1u32), |t| calls.push(t.copied()));
        binding.set_target(Some(2u32), |t| calls.push(t.copied()));
        binding.set_target(None, |t| calls.push(t.copied()));
        binding.set_target(None, |t| calls.push(t.copied()));
        assert_eq!(calls, vec![Some(1), Some(2), None]);
        assert!(binding.current().is_none());
    }
}
