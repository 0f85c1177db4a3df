//! services/client/src/ui/individuals.rs
//!
//! Headless model of the family members page: search, the add/edit form, and the
//! per-card edit and delete actions. All data lives in the record store; the page only
//! keeps what the user is typing.

use chrono::NaiveDate;
use family_tree_core::domain::{Individual, IndividualId, IndividualPatch, Sex};
use tracing::debug;
use uuid::Uuid;

use crate::stores::SyncOutcome;
use crate::ui::state::AppState;

//=========================================================================================
// The Member Form
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Add,
    Edit(IndividualId),
}

/// What the user has typed into the add/edit form. Blank text means "not given".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberForm {
    pub gedcom_id: String,
    pub given_names: String,
    pub surname: String,
    pub sex: Option<Sex>,
    pub birth_date: Option<NaiveDate>,
    pub birth_place: String,
    pub death_date: Option<NaiveDate>,
    pub death_place: String,
    pub note: String,
}

impl MemberForm {
    pub fn from_individual(individual: &Individual) -> Self {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        Self {
            gedcom_id: individual.gedcom_id.clone(),
            given_names: text(&individual.given_names),
            surname: text(&individual.surname),
            sex: individual.sex,
            birth_date: individual.birth_date,
            birth_place: text(&individual.birth_place),
            death_date: individual.death_date,
            death_place: text(&individual.death_place),
            note: text(&individual.note),
        }
    }

    fn missing_field(&self) -> Option<&'static str> {
        if self.given_names.trim().is_empty() && self.surname.trim().is_empty() {
            Some("Enter a given name or a surname")
        } else {
            None
        }
    }

    pub fn to_patch(&self) -> IndividualPatch {
        IndividualPatch {
            gedcom_id: given(&self.gedcom_id),
            given_names: given(&self.given_names),
            surname: given(&self.surname),
            sex: self.sex,
            birth_date: self.birth_date,
            birth_place: given(&self.birth_place),
            death_date: self.death_date,
            death_place: given(&self.death_place),
            note: given(&self.note),
        }
    }
}

fn given(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// A fresh GEDCOM cross-reference id, e.g. `@I3F9A0C12@`.
fn generate_gedcom_id() -> String {
    let simple = Uuid::new_v4().simple().to_string();
    format!("@I{}@", simple[..8].to_uppercase())
}

//=========================================================================================
// The Page
//=========================================================================================

pub struct IndividualsPage {
    app: AppState,
    pub search_term: String,
    form: Option<(FormMode, MemberForm)>,
    form_error: Option<String>,
}

impl IndividualsPage {
    pub fn new(app: AppState) -> Self {
        Self {
            app,
            search_term: String::new(),
            form: None,
            form_error: None,
        }
    }

    fn token(&self) -> Option<String> {
        self.app.credentials.token()
    }

    /// Loads the list for the signed-in user. `None` when nobody is signed in.
    pub async fn load(&self) -> Option<SyncOutcome<usize>> {
        let token = self.token()?;
        Some(self.app.records.fetch_individuals(&token).await)
    }

    /// The cards to show: every record whose surname or given names contain the
    /// search term, ignoring case.
    pub fn visible(&self) -> Vec<Individual> {
        self.app
            .records
            .snapshot()
            .individuals()
            .iter()
            .filter(|individual| individual.matches_search(&self.search_term))
            .cloned()
            .collect()
    }

    pub fn is_loading(&self) -> bool {
        self.app.records.snapshot().is_loading()
    }

    /// The banner text, if the last operation failed.
    pub fn error(&self) -> Option<String> {
        self.app.records.snapshot().error().map(str::to_string)
    }

    pub fn dismiss_error(&self) {
        self.app.records.set_error(None);
    }

    //-------------------------------------------------------------------------------------
    // Form handling
    //-------------------------------------------------------------------------------------

    /// The "Add Member" button: opens an empty form, or closes whatever form is open.
    pub fn toggle_add_form(&mut self) {
        self.form = match self.form {
            Some(_) => None,
            None => Some((FormMode::Add, MemberForm::default())),
        };
        self.form_error = None;
    }

    /// The card's "Edit" button: selects the record and opens the form pre-filled.
    pub fn edit(&mut self, individual: &Individual) {
        self.app.records.select_individual(Some(individual.clone()));
        self.form = Some((
            FormMode::Edit(individual.id.clone()),
            MemberForm::from_individual(individual),
        ));
        self.form_error = None;
    }

    pub fn form_mode(&self) -> Option<&FormMode> {
        self.form.as_ref().map(|(mode, _)| mode)
    }

    pub fn form(&self) -> Option<&MemberForm> {
        self.form.as_ref().map(|(_, form)| form)
    }

    pub fn form_mut(&mut self) -> Option<&mut MemberForm> {
        self.form.as_mut().map(|(_, form)| form)
    }

    pub fn form_error(&self) -> Option<&str> {
        self.form_error.as_deref()
    }

    pub fn cancel_form(&mut self) {
        self.form = None;
        self.form_error = None;
    }

    /// Sends the open form to the server: a create in add mode, an update in edit mode.
    ///
    /// The form closes only once the store has applied the server's answer; otherwise it
    /// stays open with its contents so the user can retry.
    pub async fn submit_form(&mut self) -> Option<SyncOutcome<Individual>> {
        let (mode, form) = self.form.clone()?;
        if let Some(message) = form.missing_field() {
            self.form_error = Some(message.to_string());
            return None;
        }
        let Some(token) = self.token() else {
            self.form_error = Some("Not logged in".to_string());
            return None;
        };
        self.form_error = None;

        let mut patch = form.to_patch();
        let outcome = match &mode {
            FormMode::Add => {
                if patch.gedcom_id.is_none() {
                    patch.gedcom_id = Some(generate_gedcom_id());
                }
                self.app.records.create_individual(&token, &patch).await
            }
            FormMode::Edit(id) => self.app.records.update_individual(&token, id, &patch).await,
        };

        if outcome.is_applied() {
            debug!("Member form submitted ({:?})", mode);
            self.form = None;
        }
        Some(outcome)
    }

    /// The card's "Delete" button. Confirmation is up to the caller.
    pub async fn delete(&self, id: &IndividualId) -> Option<SyncOutcome<()>> {
        let token = self.token()?;
        Some(self.app.records.delete_individual(&token, id).await)
    }
}
