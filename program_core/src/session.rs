//! Editing session lifecycle.
//!
//! `Uninitialized → Hydrating → Editing → Saving → Saved | SaveFailed`
//!
//! A session hydrates a stored program (or the default skeleton), hands
//! out the [`ProgramEditor`] for mutations and performs the save as one
//! step: normalize, then upsert. `SaveFailed` is transient: the session
//! drops straight back to `Editing` with the error kept in
//! [`EditSession::last_error`]. The working structure is untouched, so the
//! save can simply be retried.

use crate::editor::{EditorSettings, ProgramEditor};
use crate::ids::IdGenerator;
use crate::serializer::{build_payload, hydrate, ProgramPayload, StoredProgram};
use crate::store::ProgramStore;
use crate::superset::non_contiguous_groups;
use crate::Result;

/// Where an editing session is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Hydrating,
    Editing,
    Saving,
    Saved,
    SaveFailed,
}

/// One program being edited by one user
pub struct EditSession<G: IdGenerator> {
    program_id: Option<String>,
    editor: ProgramEditor<G>,
    state: SessionState,
    last_error: Option<String>,
    /// Ids were generated on load and are not in storage yet
    unsaved_ids: bool,
}

impl<G: IdGenerator> EditSession<G> {
    /// Hydrate a stored program, or start a new one when `source` is `None`
    pub fn open(source: Option<StoredProgram>, mut ids: G, settings: EditorSettings) -> Self {
        let mut state = SessionState::Uninitialized;
        tracing::debug!("Session state: {:?}", state);

        state = transition(state, SessionState::Hydrating);
        let hydrated = hydrate(source, &mut ids, &settings);
        let unsaved_ids = hydrated.needs_persist();
        let program_id = hydrated.id;
        let editor = ProgramEditor::new(hydrated.structure, settings, ids);

        state = transition(state, SessionState::Editing);
        Self {
            program_id,
            editor,
            state,
            last_error: None,
            unsaved_ids,
        }
    }

    /// Load `id` from the store and open it; an unknown id is an error
    pub fn open_from_store(
        store: &dyn ProgramStore,
        id: &str,
        ids: G,
        settings: EditorSettings,
    ) -> Result<Self> {
        let stored = store
            .load(id)?
            .ok_or_else(|| crate::Error::not_found("program", id))?;
        let mut session = Self::open(Some(stored), ids, settings);
        // Older documents may lack an embedded id; the store key is authoritative
        session.program_id = Some(id.to_string());
        Ok(session)
    }

    /// Like [`open_from_store`](Self::open_from_store), but writes back any
    /// ids generated during the load so later loads see the same ids
    ///
    /// A failed write-back is logged and leaves the session usable; the
    /// ids then last only as long as this session.
    pub fn open_persisted(
        store: &mut dyn ProgramStore,
        id: &str,
        ids: G,
        settings: EditorSettings,
    ) -> Result<Self> {
        let mut session = Self::open_from_store(&*store, id, ids, settings)?;
        if session.unsaved_ids {
            tracing::info!("Persisting ids backfilled while loading program {}", id);
            if let Err(e) = session.save(store) {
                tracing::warn!("Could not persist backfilled ids for {}: {}", id, e);
            }
        }
        Ok(session)
    }

    /// True while ids generated on load exist only in memory
    pub fn has_unsaved_ids(&self) -> bool {
        self.unsaved_ids
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Store id, once the program has been saved or was loaded
    pub fn program_id(&self) -> Option<&str> {
        self.program_id.as_deref()
    }

    /// Message of the most recent failed save, cleared by the next success
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn editor(&self) -> &ProgramEditor<G> {
        &self.editor
    }

    /// Mutable access for structural edits; puts the session back in `Editing`
    pub fn editor_mut(&mut self) -> &mut ProgramEditor<G> {
        if self.state != SessionState::Editing {
            self.state = transition(self.state, SessionState::Editing);
        }
        &mut self.editor
    }

    /// The payload a save would send right now
    pub fn payload(&self) -> Result<ProgramPayload> {
        build_payload(self.program_id.as_deref(), self.editor.structure())
    }

    /// Normalize and persist the program; returns its store id
    ///
    /// On failure the session passes through `SaveFailed` back to `Editing`,
    /// keeps the message in `last_error` and returns the error to the
    /// caller; the working structure is unchanged and the save can be
    /// retried straight away.
    pub fn save(&mut self, store: &mut dyn ProgramStore) -> Result<String> {
        self.state = transition(self.state, SessionState::Saving);

        for cycle in &self.editor.structure().cycles {
            for day in &cycle.days {
                for group in non_contiguous_groups(day) {
                    tracing::warn!(
                        "Superset {} in '{}' / '{}' has non-adjacent members",
                        group,
                        cycle.name,
                        day.name
                    );
                }
            }
        }

        match self.payload().and_then(|payload| store.upsert(&payload)) {
            Ok(id) => {
                tracing::info!("Saved program '{}' as {}", self.editor.structure().name, id);
                self.program_id = Some(id.clone());
                self.last_error = None;
                self.unsaved_ids = false;
                self.state = transition(self.state, SessionState::Saved);
                Ok(id)
            }
            Err(e) => {
                tracing::warn!("Saving program failed: {}", e);
                self.last_error = Some(e.to_string());
                self.state = transition(self.state, SessionState::SaveFailed);
                self.state = transition(self.state, SessionState::Editing);
                Err(e)
            }
        }
    }
}

fn transition(from: SessionState, to: SessionState) -> SessionState {
    tracing::debug!("Session state: {:?} -> {:?}", from, to);
    to
}
