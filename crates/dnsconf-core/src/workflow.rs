//! Client-side configuration workflow
//!
//! Mirrors the four presentation stages a caller walks through:
//!
//! ```text
//! Form ──submit──▶ Preview ──confirm──▶ Applying ──▶ Result
//!   ▲                 │
//!   └──────back───────┘
//! ```
//!
//! The workflow owns no DNS logic: `submit` is a dry run and `confirm` is
//! an apply. `cancel` releases a registration made on the user's behalf
//! during `submit` so abandoned flows do not leave ownership claims behind.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::orchestrator::Orchestrator;
use crate::types::{ApplyResult, DryRunResult, ProviderKind, normalize_domain};

/// Presentation stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStage {
    Form,
    Preview,
    Applying,
    Result,
}

/// What the user entered on the form
#[derive(Debug, Clone)]
pub struct DomainForm {
    pub project_id: String,
    pub domain: String,
    pub provider: ProviderKind,
    pub credentials: Credentials,
    /// Existing registration, if the domain was added earlier
    pub domain_id: Option<String>,
}

/// One user's pass through the configuration flow
#[derive(Debug)]
pub struct ConfigurationWorkflow {
    orchestrator: Arc<Orchestrator>,
    stage: WorkflowStage,
    form: Option<DomainForm>,
    preview: Option<DryRunResult>,
    result: Option<ApplyResult>,
    /// Registration created by `submit`, owned by this workflow until apply
    created: Option<Registration>,
}

#[derive(Debug, Clone)]
struct Registration {
    project_id: String,
    domain: String,
    domain_id: String,
}

impl ConfigurationWorkflow {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            stage: WorkflowStage::Form,
            form: None,
            preview: None,
            result: None,
            created: None,
        }
    }

    pub fn stage(&self) -> WorkflowStage {
        self.stage
    }

    pub fn preview(&self) -> Option<&DryRunResult> {
        self.preview.as_ref()
    }

    pub fn result(&self) -> Option<&ApplyResult> {
        self.result.as_ref()
    }

    /// Run the dry run for `form` and move to Preview
    pub async fn submit(&mut self, mut form: DomainForm) -> Result<&DryRunResult> {
        if self.stage != WorkflowStage::Form {
            return Err(Error::invalid_input(format!(
                "Cannot submit the form from the {:?} stage",
                self.stage
            )));
        }

        if form.domain_id.is_none() {
            form.domain_id = self.reusable_registration(&form).await;
        }

        let preview = self
            .orchestrator
            .dry_run(
                &form.project_id,
                &form.domain,
                form.provider,
                &form.credentials,
                form.domain_id.as_deref(),
            )
            .await?;

        if form.domain_id.is_none() {
            self.created = Some(Registration {
                project_id: form.project_id.clone(),
                domain: preview.domain.clone(),
                domain_id: preview.domain_id.clone(),
            });
        }

        form.domain_id = Some(preview.domain_id.clone());
        self.form = Some(form);
        self.stage = WorkflowStage::Preview;
        Ok(self.preview.insert(preview))
    }

    /// Return from Preview to the form
    pub fn back(&mut self) {
        if self.stage == WorkflowStage::Preview {
            self.preview = None;
            self.stage = WorkflowStage::Form;
        }
    }

    /// Apply the previewed plan and move to Result
    pub async fn confirm(&mut self) -> Result<&ApplyResult> {
        let form = match (&self.stage, &self.form) {
            (WorkflowStage::Preview, Some(form)) => form.clone(),
            _ => {
                return Err(Error::invalid_input(format!(
                    "Nothing to apply from the {:?} stage",
                    self.stage
                )));
            }
        };
        let domain_id = form
            .domain_id
            .clone()
            .ok_or_else(|| Error::internal("Preview without a domain registration"))?;

        self.stage = WorkflowStage::Applying;
        let outcome = self
            .orchestrator
            .apply(
                &form.project_id,
                &form.domain,
                form.provider,
                &form.credentials,
                &domain_id,
            )
            .await;

        match outcome {
            Ok(result) => {
                // From here on the registration belongs to the configured domain
                self.created = None;
                self.stage = WorkflowStage::Result;
                Ok(self.result.insert(result))
            }
            Err(e) => {
                self.stage = WorkflowStage::Preview;
                Err(e)
            }
        }
    }

    /// Abandon the flow
    ///
    /// Best effort: a failed release is logged, never returned. Returns
    /// whether a registration was removed. No-op once the flow has reached
    /// Result.
    pub async fn cancel(&mut self) -> bool {
        if self.stage == WorkflowStage::Result {
            debug!("Cancel after result; nothing to release");
            return false;
        }

        let released = match self.created.take() {
            Some(registration) => self.release(&registration).await,
            None => false,
        };

        self.stage = WorkflowStage::Form;
        self.form = None;
        self.preview = None;
        released
    }

    /// Keep the registration from an earlier submit if the user resubmits
    /// the same domain; release it otherwise
    async fn reusable_registration(&mut self, form: &DomainForm) -> Option<String> {
        let registration = self.created.take()?;
        if registration.project_id == form.project_id
            && registration.domain == normalize_domain(&form.domain)
        {
            let id = registration.domain_id.clone();
            self.created = Some(registration);
            return Some(id);
        }

        self.release(&registration).await;
        None
    }

    async fn release(&self, registration: &Registration) -> bool {
        match self
            .orchestrator
            .release_domain(&registration.project_id, &registration.domain_id)
            .await
        {
            Ok(released) => released,
            Err(e) => {
                warn!(
                    domain_id = %registration.domain_id,
                    "Failed to release domain registration: {}",
                    e
                );
                false
            }
        }
    }
}
