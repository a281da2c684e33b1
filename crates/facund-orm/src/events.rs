//! Model lifecycle events.
//!
//! Persistence operations surround their storage write with a fixed event
//! sequence: inserts run `saving`, `creating`, the write, `created`, `saved`;
//! updates run `saving`, `updating`, the write, `updated`, `saved`; deletes
//! run `deleting`, the removal, `deleted`. Callbacks for the *-ing events may
//! halt the operation before the write; the past-tense events are
//! notifications only.

use crate::record::Record;
use facund_hooks::{HookOutcome, HookSet};
use std::fmt;

/// One point in a record's persistence lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelEvent {
	Saving,
	Creating,
	Created,
	Saved,
	Updating,
	Updated,
	Deleting,
	Deleted,
}

impl ModelEvent {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Saving => "saving",
			Self::Creating => "creating",
			Self::Created => "created",
			Self::Saved => "saved",
			Self::Updating => "updating",
			Self::Updated => "updated",
			Self::Deleting => "deleting",
			Self::Deleted => "deleted",
		}
	}

	/// Whether callbacks for this event may veto the operation.
	pub fn can_halt(self) -> bool {
		matches!(
			self,
			Self::Saving | Self::Creating | Self::Updating | Self::Deleting
		)
	}
}

impl fmt::Display for ModelEvent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// The ordered callback sets a model carries, one per lifecycle event.
#[derive(Debug, Default)]
pub struct LifecycleHooks {
	saving: HookSet<Record>,
	creating: HookSet<Record>,
	created: HookSet<Record>,
	saved: HookSet<Record>,
	updating: HookSet<Record>,
	updated: HookSet<Record>,
	deleting: HookSet<Record>,
	deleted: HookSet<Record>,
}

impl LifecycleHooks {
	pub fn new() -> Self {
		Self::default()
	}

	fn set(&self, event: ModelEvent) -> &HookSet<Record> {
		match event {
			ModelEvent::Saving => &self.saving,
			ModelEvent::Creating => &self.creating,
			ModelEvent::Created => &self.created,
			ModelEvent::Saved => &self.saved,
			ModelEvent::Updating => &self.updating,
			ModelEvent::Updated => &self.updated,
			ModelEvent::Deleting => &self.deleting,
			ModelEvent::Deleted => &self.deleted,
		}
	}

	fn set_mut(&mut self, event: ModelEvent) -> &mut HookSet<Record> {
		match event {
			ModelEvent::Saving => &mut self.saving,
			ModelEvent::Creating => &mut self.creating,
			ModelEvent::Created => &mut self.created,
			ModelEvent::Saved => &mut self.saved,
			ModelEvent::Updating => &mut self.updating,
			ModelEvent::Updated => &mut self.updated,
			ModelEvent::Deleting => &mut self.deleting,
			ModelEvent::Deleted => &mut self.deleted,
		}
	}

	/// Registers a callback that may halt the operation.
	pub fn register<F>(&mut self, event: ModelEvent, hook: F)
	where
		F: Fn(&mut Record) -> HookOutcome + Send + Sync + 'static,
	{
		self.set_mut(event).register(hook);
	}

	/// Registers a callback that only observes the record.
	pub fn observe<F>(&mut self, event: ModelEvent, hook: F)
	where
		F: Fn(&mut Record) + Send + Sync + 'static,
	{
		self.set_mut(event).observe(hook);
	}

	/// Runs the callbacks registered for `event` in order.
	pub fn fire(&self, event: ModelEvent, record: &mut Record) -> HookOutcome {
		self.set(event).run(record)
	}

	pub fn registered(&self, event: ModelEvent) -> usize {
		self.set(event).len()
	}
}
