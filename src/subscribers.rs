//! Event subscribers for account changes.
//!
//! At startup the service attempts to load a YAML manifest declaring
//! subscribers ("when a user's data changes, do X"). The manifest is
//! optional: a missing file means an empty registry, while a present
//! but unreadable or malformed file is a configuration defect and
//! aborts startup. Code can additionally register hook objects, which
//! is what tests and embedding applications use.

use std::fmt;
use std::io;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Failure to load the subscriber manifest.
#[derive(Debug, Error)]
pub enum SubscriberLoadError {
    #[error("failed to read subscriber manifest: {0}")]
    Io(#[from] io::Error),
    #[error("malformed subscriber manifest: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// The kinds of events subscribers can be declared for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    UserUpdated,
}

/// A concrete event dispatched through the registry.
#[derive(Clone, Debug)]
pub enum UserEvent {
    Updated { id: i32, username: String },
}

impl UserEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            UserEvent::Updated { .. } => EventKind::UserUpdated,
        }
    }
}

/// Built-in actions a manifest entry can request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum Action {
    Log,
}

/// One declared subscriber: run `action` whenever `event` fires.
#[derive(Debug, Deserialize)]
struct SubscriberSpec {
    event: EventKind,
    action: Action,
}

/// A hook registered from code rather than the manifest.
pub trait UserEventSubscriber: Send + Sync {
    fn handle(&self, event: &UserEvent);
}

/// Registry of declared and programmatic event subscribers.
#[derive(Default)]
pub struct SubscriberRegistry {
    specs: Vec<SubscriberSpec>,
    hooks: Vec<Box<dyn UserEventSubscriber>>,
}

impl SubscriberRegistry {
    /// Load the manifest at `path`. A missing file yields an empty
    /// registry; any other read or parse failure is returned to the
    /// caller, which is expected to fail startup.
    pub fn load_optional(path: &Path) -> Result<Self, SubscriberLoadError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let specs: Vec<SubscriberSpec> = serde_yaml::from_str(&text)?;
        Ok(Self {
            specs,
            hooks: Vec::new(),
        })
    }

    /// Register a hook object.
    pub fn register(&mut self, hook: Box<dyn UserEventSubscriber>) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.specs.len() + self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty() && self.hooks.is_empty()
    }

    /// Dispatch an event to every matching declared subscriber and to
    /// all registered hooks.
    pub fn notify(&self, event: &UserEvent) {
        for spec in self.specs.iter().filter(|s| s.event == event.kind()) {
            match spec.action {
                Action::Log => match event {
                    UserEvent::Updated { id, username } => {
                        info!("user {} updated, username now '{}'", id, username);
                    }
                },
            }
        }

        for hook in &self.hooks {
            hook.handle(event);
        }
    }
}

impl fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("specs", &self.specs)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    struct Counting(Arc<AtomicUsize>);

    impl UserEventSubscriber for Counting {
        fn handle(&self, _event: &UserEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_missing_manifest_yields_empty_registry() {
        let registry =
            SubscriberRegistry::load_optional(Path::new("no/such/manifest.yaml")).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_malformed_manifest_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not: [valid, subscriber, entries").unwrap();

        let result = SubscriberRegistry::load_optional(file.path());
        assert!(matches!(result, Err(SubscriberLoadError::Parse(_))));
    }

    #[test]
    fn test_manifest_entries_are_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "- event: user-updated").unwrap();
        writeln!(file, "  action: log").unwrap();

        let registry = SubscriberRegistry::load_optional(file.path()).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_hooks_receive_matching_events() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut registry = SubscriberRegistry::default();
        registry.register(Box::new(Counting(count.clone())));

        registry.notify(&UserEvent::Updated {
            id: 1,
            username: "alice".to_string(),
        });

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
