//! Lifecycle Hooks
//!
//! Callbacks registered by location name and fired by the runner around every
//! run, target, trial and MPL boundary. Locations are matched
//! case-insensitively; a location with no registered hooks is a no-op.

use crate::target::Target;
use std::collections::HashMap;
use std::fmt;

/// Points in the sweep at which hooks are dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookLocation {
    /// Before the first target
    PreRun,
    /// After the last target
    PostRun,
    /// Before a target's sweep
    PreDb,
    /// After a target's sweep and cleanup
    PostDb,
    /// Before each trial
    PreTrial,
    /// After each trial
    PostTrial,
    /// Before each candidate MPL value, including the first one past `max_mpl`
    PreMpl,
    /// After each executed MPL step
    PostMpl,
}

impl HookLocation {
    /// Uppercase location name used as the registry key
    pub fn as_str(self) -> &'static str {
        match self {
            HookLocation::PreRun => "PRE_RUN",
            HookLocation::PostRun => "POST_RUN",
            HookLocation::PreDb => "PRE_DB",
            HookLocation::PostDb => "POST_DB",
            HookLocation::PreTrial => "PRE_TRIAL",
            HookLocation::PostTrial => "POST_TRIAL",
            HookLocation::PreMpl => "PRE_MPL",
            HookLocation::PostMpl => "POST_MPL",
        }
    }
}

impl fmt::Display for HookLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Positional arguments passed to the hooks of a location
#[derive(Clone, Copy)]
pub enum HookArgs<'a> {
    /// `PRE_RUN`, `POST_RUN`
    Run,
    /// `PRE_DB(target)`, `POST_DB(target)`
    Target(&'a dyn Target),
    /// `PRE_TRIAL(trial, target)`, `POST_TRIAL(trial, target)`
    Trial {
        /// 1-based trial number
        trial: u32,
        /// Target being swept
        target: &'a dyn Target,
    },
    /// `PRE_MPL(mpl, trial, target)`, `POST_MPL(mpl, trial, target)`
    Mpl {
        /// MPL value
        mpl: u32,
        /// 1-based trial number
        trial: u32,
        /// Target being swept
        target: &'a dyn Target,
    },
}

impl<'a> HookArgs<'a> {
    /// Target the event concerns, if any
    pub fn target(&self) -> Option<&'a dyn Target> {
        match *self {
            HookArgs::Run => None,
            HookArgs::Target(target)
            | HookArgs::Trial { target, .. }
            | HookArgs::Mpl { target, .. } => Some(target),
        }
    }

    /// Trial number, for trial and MPL events
    pub fn trial(&self) -> Option<u32> {
        match *self {
            HookArgs::Trial { trial, .. } | HookArgs::Mpl { trial, .. } => Some(trial),
            _ => None,
        }
    }

    /// MPL value, for MPL events
    pub fn mpl(&self) -> Option<u32> {
        match *self {
            HookArgs::Mpl { mpl, .. } => Some(mpl),
            _ => None,
        }
    }
}

impl fmt::Debug for HookArgs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("HookArgs");
        if let Some(mpl) = self.mpl() {
            s.field("mpl", &mpl);
        }
        if let Some(trial) = self.trial() {
            s.field("trial", &trial);
        }
        if let Some(target) = self.target() {
            s.field("target", &target.name());
        }
        s.finish()
    }
}

/// A hook callback. Return values are not collected.
pub type Hook = Box<dyn Fn(&HookArgs<'_>)>;

/// Dispatches lifecycle events to whatever is listening
pub trait HookDispatch {
    /// Invoke every hook registered at `location` with `args`
    fn dispatch(&self, location: &str, args: &HookArgs<'_>);
}

/// Hook table mapping uppercase location names to ordered callbacks
#[derive(Default)]
pub struct HookRegistry {
    hooks: HashMap<String, Vec<Hook>>,
}

impl HookRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook at a location (by name, case-insensitive)
    pub fn register<F>(&mut self, location: &str, hook: F) -> &mut Self
    where
        F: Fn(&HookArgs<'_>) + 'static,
    {
        self.hooks
            .entry(location.to_uppercase())
            .or_default()
            .push(Box::new(hook));
        self
    }

    /// Append a hook at a known location
    pub fn on<F>(&mut self, location: HookLocation, hook: F) -> &mut Self
    where
        F: Fn(&HookArgs<'_>) + 'static,
    {
        self.register(location.as_str(), hook)
    }

    /// Number of hooks registered at a location
    pub fn count(&self, location: &str) -> usize {
        self.hooks
            .get(&location.to_uppercase())
            .map_or(0, Vec::len)
    }
}

impl HookDispatch for HookRegistry {
    fn dispatch(&self, location: &str, args: &HookArgs<'_>) {
        let Some(hooks) = self.hooks.get(&location.to_uppercase()) else {
            return;
        };
        tracing::trace!(location, count = hooks.len(), "dispatching hooks");
        for hook in hooks {
            hook(args);
        }
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> = self
            .hooks
            .iter()
            .map(|(location, hooks)| (location.as_str(), hooks.len()))
            .collect();
        f.debug_struct("HookRegistry").field("hooks", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_hooks_run_in_registration_order() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut registry = HookRegistry::new();

        let first = Rc::clone(&calls);
        registry.register("PRE_RUN", move |_| first.borrow_mut().push("first"));
        let second = Rc::clone(&calls);
        registry.register("pre_run", move |_| second.borrow_mut().push("second"));

        registry.dispatch("Pre_Run", &HookArgs::Run);
        assert_eq!(*calls.borrow(), vec!["first", "second"]);
        assert_eq!(registry.count("PRE_RUN"), 2);
    }

    #[test]
    fn test_unregistered_location_is_noop() {
        let calls = Rc::new(RefCell::new(0));
        let mut registry = HookRegistry::new();
        let counter = Rc::clone(&calls);
        registry.on(HookLocation::PostRun, move |_| *counter.borrow_mut() += 1);

        registry.dispatch("PRE_RUN", &HookArgs::Run);
        registry.dispatch("NOT_A_LOCATION", &HookArgs::Run);
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn test_location_names() {
        assert_eq!(HookLocation::PreMpl.as_str(), "PRE_MPL");
        assert_eq!(HookLocation::PostDb.to_string(), "POST_DB");
    }

    #[test]
    fn test_run_args_have_no_coordinates() {
        let args = HookArgs::Run;
        assert!(args.target().is_none());
        assert_eq!(args.trial(), None);
        assert_eq!(args.mpl(), None);
    }
}
